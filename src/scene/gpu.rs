use crate::error::GpuError;
use glam::{Mat4, Vec3, Vec4};
use smol_str::SmolStr;
use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

/// Update-frequency hint for a GPU buffer, fixed when the buffer is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vectors,
    Indexes,
}

/// Per-vertex attributes a mesh can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexAttr {
    Position,
    Normal,
    TexCoord,
    Color,
}

impl VertexAttr {
    pub const fn components(self) -> usize {
        match self {
            Self::Position | Self::Normal => 3,
            Self::TexCoord => 2,
            Self::Color => 4,
        }
    }
}

/// Where one attribute lives inside a vectors buffer, in `f32` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrPlacement {
    pub attr: VertexAttr,
    /// Offset of the first element.
    pub start: usize,
    /// Distance between consecutive elements.
    pub stride: usize,
}

/// Layout of a vectors buffer as uploaded: `len` elements per attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub len: usize,
    pub attrs: Vec<AttrPlacement>,
}

impl VertexLayout {
    pub fn placement(&self, attr: VertexAttr) -> Option<AttrPlacement> {
        self.attrs.iter().copied().find(|p| p.attr == attr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    F32,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
            Self::Mat4 => "mat4x4<f32>",
        }
    }

    /// Size in a uniform block; scalars and vectors take one 16 byte slot.
    pub const fn block_size(self) -> usize {
        match self {
            Self::Mat4 => 64,
            _ => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub const fn ty(&self) -> UniformType {
        match self {
            Self::F32(_) => UniformType::F32,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
            Self::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Writes the value padded to its block size.
    pub fn write_to(&self, out: &mut [f32]) {
        let src: Vec<f32> = match self {
            Self::F32(v) => vec![*v],
            Self::Vec3(v) => v.to_array().to_vec(),
            Self::Vec4(v) => v.to_array().to_vec(),
            Self::Mat4(m) => m.to_cols_array().to_vec(),
        };
        for (dst, v) in out.iter_mut().zip(src) {
            *dst = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: SmolStr,
    pub ty: UniformType,
}

impl UniformDecl {
    pub fn new(name: &str, ty: UniformType) -> Self {
        Self {
            name: SmolStr::new(name),
            ty,
        }
    }
}

/// Byte offsets of each declared uniform inside a packed block.
pub(crate) fn uniform_offsets(uniforms: &[UniformDecl]) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(uniforms.len());
    let mut at = 0;
    for u in uniforms {
        offsets.push(at);
        at += u.ty.block_size();
    }
    (offsets, at)
}

/// Rejects WGSL text that lacks the two entry points every program needs.
pub(crate) fn check_entry_points(program: &str, wgsl: &str) -> Result<(), GpuError> {
    for entry in ["vs_main", "fs_main"] {
        if !wgsl.contains(&format!("fn {entry}")) {
            return Err(GpuError::ShaderCompile {
                program: SmolStr::new(program),
                message: format!("missing entry point `{entry}`"),
            });
        }
    }
    Ok(())
}

/// The graphics API the mesh pipeline talks to. All calls happen on the
/// thread that owns the render context.
pub trait GpuBackend {
    /// Compiles a WGSL program with entry points `vs_main` and `fs_main` and
    /// one uniform block laid out from `uniforms`.
    fn compile_program(&mut self, name: &str, wgsl: &str, uniforms: &[UniformDecl]) -> Result<ProgramId, GpuError>;
    fn use_program(&mut self, program: ProgramId) -> Result<(), GpuError>;
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) -> Result<(), GpuError>;

    fn create_buffer(&mut self, kind: BufferKind, usage: BufferUsage) -> BufferId;
    fn delete_buffer(&mut self, buffer: BufferId);
    fn upload_vectors(&mut self, buffer: BufferId, layout: &VertexLayout, data: &[f32]) -> Result<(), GpuError>;
    fn upload_indexes(&mut self, buffer: BufferId, data: &[u32]) -> Result<(), GpuError>;
    /// Makes the pair current for the following draw calls.
    fn bind(&mut self, vectors: BufferId, indexes: BufferId) -> Result<(), GpuError>;
    fn draw_triangles_indexed(&mut self, start: u32, count: u32) -> Result<(), GpuError>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// What mesh operations see of the scene: the backend and whether its
/// context is current.
pub struct GpuContext<'a> {
    pub gpu: &'a mut dyn GpuBackend,
    pub active: bool,
}

impl<'a> GpuContext<'a> {
    pub fn new(gpu: &'a mut dyn GpuBackend, active: bool) -> Self {
        Self { gpu, active }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_offsets_pad_to_slots() {
        let decls = [
            UniformDecl::new("mvp", UniformType::Mat4),
            UniformDecl::new("alpha", UniformType::F32),
            UniformDecl::new("light", UniformType::Vec3),
        ];
        let (offsets, size) = uniform_offsets(&decls);
        assert_eq!(offsets, vec![0, 64, 80]);
        assert_eq!(size, 96);
    }

    #[test]
    fn vec3_writes_three_of_four_floats() {
        let mut out = [9.0f32; 4];
        UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)).write_to(&mut out);
        assert_eq!(out, [1.0, 2.0, 3.0, 9.0]);
    }
}
