use super::gpu::{
    check_entry_points, BufferId, BufferKind, BufferUsage, GpuBackend, ProgramId, UniformDecl, UniformValue, VertexLayout,
};
use crate::error::GpuError;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::any::Any;

/// Every call a [`HeadlessGpu`] saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    Compile { program: ProgramId, name: SmolStr },
    UseProgram(ProgramId),
    SetUniform { program: ProgramId, name: SmolStr, value: UniformValue },
    CreateBuffer { buffer: BufferId, kind: BufferKind, usage: BufferUsage },
    DeleteBuffer(BufferId),
    UploadVectors { buffer: BufferId, len: usize, floats: usize },
    UploadIndexes { buffer: BufferId, count: usize },
    Bind { vectors: BufferId, indexes: BufferId },
    Draw { start: u32, count: u32 },
}

/// GPU-side state of one buffer as last uploaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessBuffer {
    pub kind: Option<BufferKind>,
    pub usage: BufferUsage,
    pub layout: VertexLayout,
    pub floats: Vec<f32>,
    pub indexes: Vec<u32>,
}

impl HeadlessBuffer {
    /// Element count: vertices for a vectors buffer, indices otherwise.
    pub fn len(&self) -> usize {
        match self.kind {
            Some(BufferKind::Indexes) => self.indexes.len(),
            _ => self.layout.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct HeadlessProgram {
    name: SmolStr,
    uniforms: Vec<UniformDecl>,
}

/// A backend with no device. It checks calls the way a driver would and
/// records them, which makes the mesh pipeline testable anywhere.
#[derive(Default)]
pub struct HeadlessGpu {
    calls: Vec<GpuCall>,
    programs: Vec<HeadlessProgram>,
    buffers: FxHashMap<BufferId, HeadlessBuffer>,
    next_buffer: u32,
    current: Option<ProgramId>,
    bound: Option<(BufferId, BufferId)>,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn buffer(&self, id: BufferId) -> Option<&HeadlessBuffer> {
        self.buffers.get(&id)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn draw_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, GpuCall::Draw { .. })).count()
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current
    }

    fn buffer_of(&mut self, id: BufferId, kind: BufferKind) -> Result<&mut HeadlessBuffer, GpuError> {
        self.buffers
            .get_mut(&id)
            .filter(|b| b.kind == Some(kind))
            .ok_or(GpuError::UnknownBuffer)
    }
}

impl GpuBackend for HeadlessGpu {
    fn compile_program(&mut self, name: &str, wgsl: &str, uniforms: &[UniformDecl]) -> Result<ProgramId, GpuError> {
        check_entry_points(name, wgsl)?;
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(HeadlessProgram {
            name: SmolStr::new(name),
            uniforms: uniforms.to_vec(),
        });
        self.calls.push(GpuCall::Compile {
            program: id,
            name: SmolStr::new(name),
        });
        Ok(id)
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
        if self.programs.get(program.0 as usize).is_none() {
            return Err(GpuError::UnknownProgram);
        }
        self.current = Some(program);
        self.calls.push(GpuCall::UseProgram(program));
        Ok(())
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) -> Result<(), GpuError> {
        let prog = self.programs.get(program.0 as usize).ok_or(GpuError::UnknownProgram)?;
        let decl = prog
            .uniforms
            .iter()
            .find(|u| u.name == name)
            .ok_or_else(|| GpuError::UnknownUniform {
                program: prog.name.clone(),
                uniform: SmolStr::new(name),
            })?;
        if decl.ty != value.ty() {
            return Err(GpuError::UniformType {
                uniform: decl.name.clone(),
                expected: decl.ty.name(),
            });
        }
        self.calls.push(GpuCall::SetUniform {
            program,
            name: SmolStr::new(name),
            value,
        });
        Ok(())
    }

    fn create_buffer(&mut self, kind: BufferKind, usage: BufferUsage) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(
            id,
            HeadlessBuffer {
                kind: Some(kind),
                usage,
                ..Default::default()
            },
        );
        self.calls.push(GpuCall::CreateBuffer { buffer: id, kind, usage });
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_some() {
            if self.bound.is_some_and(|(v, i)| v == buffer || i == buffer) {
                self.bound = None;
            }
            self.calls.push(GpuCall::DeleteBuffer(buffer));
        }
    }

    fn upload_vectors(&mut self, buffer: BufferId, layout: &VertexLayout, data: &[f32]) -> Result<(), GpuError> {
        let buf = self.buffer_of(buffer, BufferKind::Vectors)?;
        buf.layout = layout.clone();
        buf.floats.clear();
        buf.floats.extend_from_slice(data);
        self.calls.push(GpuCall::UploadVectors {
            buffer,
            len: layout.len,
            floats: data.len(),
        });
        Ok(())
    }

    fn upload_indexes(&mut self, buffer: BufferId, data: &[u32]) -> Result<(), GpuError> {
        let buf = self.buffer_of(buffer, BufferKind::Indexes)?;
        buf.indexes.clear();
        buf.indexes.extend_from_slice(data);
        self.calls.push(GpuCall::UploadIndexes {
            buffer,
            count: data.len(),
        });
        Ok(())
    }

    fn bind(&mut self, vectors: BufferId, indexes: BufferId) -> Result<(), GpuError> {
        self.buffer_of(vectors, BufferKind::Vectors)?;
        self.buffer_of(indexes, BufferKind::Indexes)?;
        self.bound = Some((vectors, indexes));
        self.calls.push(GpuCall::Bind { vectors, indexes });
        Ok(())
    }

    fn draw_triangles_indexed(&mut self, start: u32, count: u32) -> Result<(), GpuError> {
        if self.bound.is_none() {
            return Err(GpuError::NothingBound);
        }
        self.calls.push(GpuCall::Draw { start, count });
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::UniformType;
    use glam::Vec4;

    #[test]
    fn uniform_checks_name_and_type() {
        let mut gpu = HeadlessGpu::new();
        let prog = gpu
            .compile_program(
                "flat",
                "fn vs_main() {} fn fs_main() {}",
                &[UniformDecl::new("color", UniformType::Vec4)],
            )
            .unwrap();
        assert!(gpu.set_uniform(prog, "color", UniformValue::Vec4(Vec4::ONE)).is_ok());
        assert!(matches!(
            gpu.set_uniform(prog, "colour", UniformValue::Vec4(Vec4::ONE)),
            Err(GpuError::UnknownUniform { .. })
        ));
        assert_eq!(
            gpu.set_uniform(prog, "color", UniformValue::F32(1.0)),
            Err(GpuError::UniformType {
                uniform: SmolStr::new("color"),
                expected: "vec4<f32>"
            })
        );
    }

    #[test]
    fn missing_entry_point_fails_compile() {
        let mut gpu = HeadlessGpu::new();
        let err = gpu.compile_program("bad", "fn vs_main() {}", &[]);
        assert!(matches!(err, Err(GpuError::ShaderCompile { .. })));
    }

    #[test]
    fn draw_needs_bound_buffers() {
        let mut gpu = HeadlessGpu::new();
        assert_eq!(gpu.draw_triangles_indexed(0, 3), Err(GpuError::NothingBound));
        let v = gpu.create_buffer(BufferKind::Vectors, BufferUsage::Dynamic);
        let i = gpu.create_buffer(BufferKind::Indexes, BufferUsage::Static);
        assert_eq!(gpu.bind(i, v), Err(GpuError::UnknownBuffer));
        gpu.bind(v, i).unwrap();
        gpu.draw_triangles_indexed(0, 3).unwrap();
        assert_eq!(gpu.draw_count(), 1);
    }
}
