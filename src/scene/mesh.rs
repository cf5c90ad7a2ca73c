use super::buffer::BufferMgr;
use super::gpu::{BufferUsage, GpuContext, VertexAttr};
use crate::error::{MeshError, ShapeInvalid};
use glam::Vec3;
use smol_str::SmolStr;
use std::any::Any;

/// Axis-aligned bounds of a mesh's vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for MeshBBox {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

impl MeshBBox {
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Indexed triangle geometry and the buffers it is drawn from.
///
/// `vertex`, `norm` and `tex` are interleaved on upload; `color` is optional
/// and goes after them. Arrays may change freely until `make_vectors`; after
/// that only same-length updates through `set_*_data` are cheap.
#[derive(Debug, Clone, Default)]
pub struct MeshBase {
    pub name: SmolStr,
    /// Frequently updated; picks the buffer usage hint when first made.
    pub dynamic: bool,
    /// Some vertex colors are translucent.
    pub trans: bool,
    pub vertex: Vec<f32>,
    pub norm: Vec<f32>,
    pub tex: Vec<f32>,
    pub index: Vec<u32>,
    pub color: Vec<f32>,
    pub bbox: MeshBBox,
    buff: Option<BufferMgr>,
}

impl MeshBase {
    pub fn new(name: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            ..Default::default()
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertex.len() / 3
    }

    pub fn has_color(&self) -> bool {
        !self.color.is_empty()
    }

    pub fn is_transparent(&self) -> bool {
        self.has_color() && self.trans
    }

    pub fn buffers(&self) -> Option<&BufferMgr> {
        self.buff.as_ref()
    }

    pub fn is_made(&self) -> bool {
        self.buff.is_some()
    }

    /// Clears the geometry. The GPU buffers are kept for the next make.
    pub fn reset(&mut self) {
        self.vertex.clear();
        self.norm.clear();
        self.tex.clear();
        self.index.clear();
        self.color.clear();
    }

    pub fn validate(&self) -> Result<(), ShapeInvalid> {
        let res = self.check_lengths();
        if let Err(err) = &res {
            log::warn!(target: "trellis::mesh", "{err}");
        }
        res
    }

    fn check_lengths(&self) -> Result<(), ShapeInvalid> {
        let vertices = self.num_vertices();
        if vertices == 0 {
            return Err(ShapeInvalid::NoVertices { mesh: self.name.clone() });
        }
        let normals = self.norm.len() / 3;
        if normals != vertices {
            return Err(ShapeInvalid::NormalCount {
                mesh: self.name.clone(),
                normals,
                vertices,
            });
        }
        let texcoords = self.tex.len() / 2;
        if texcoords != vertices {
            return Err(ShapeInvalid::TexCoordCount {
                mesh: self.name.clone(),
                texcoords,
                vertices,
            });
        }
        let colors = self.color.len() / 4;
        if colors != 0 && colors != vertices {
            return Err(ShapeInvalid::ColorCount {
                mesh: self.name.clone(),
                colors,
                vertices,
            });
        }
        Ok(())
    }

    /// Packs the arrays into the mesh's buffers, creating them on first use.
    /// The attribute layout is rebuilt only when the number of attributes
    /// changes, that is when color is added or dropped.
    pub fn make_vectors(&mut self, ctx: &mut GpuContext<'_>) -> Result<(), MeshError> {
        if !ctx.active {
            return Err(MeshError::ContextInactive(self.name.clone()));
        }
        self.validate()?;
        let usage = if self.dynamic {
            BufferUsage::Dynamic
        } else {
            BufferUsage::Static
        };
        let has_color = self.has_color();
        let nvec = if has_color { 4 } else { 3 };
        let len = self.num_vertices();
        let buff = self.buff.get_or_insert_with(|| BufferMgr::new(ctx.gpu, usage));

        let vb = buff.vectors_mut();
        if vb.num_vectors() != nvec {
            vb.delete_all_vectors();
            vb.add_vectors(VertexAttr::Position, true);
            vb.add_vectors(VertexAttr::Normal, true);
            vb.add_vectors(VertexAttr::TexCoord, true);
            if has_color {
                vb.add_vectors(VertexAttr::Color, false);
            }
        }
        vb.set_len(len);
        vb.set_vec_data(VertexAttr::Position, &self.vertex);
        vb.set_vec_data(VertexAttr::Normal, &self.norm);
        vb.set_vec_data(VertexAttr::TexCoord, &self.tex);
        if has_color {
            vb.set_vec_data(VertexAttr::Color, &self.color);
        }
        buff.indexes_mut().set(&self.index);
        log::trace!(target: "trellis::mesh", "{}: made {} vertices, {} indexes", self.name, len, self.index.len());
        Ok(())
    }

    /// Copies the current vertices into the buffer without changing its
    /// length. After a vertex count change use `make_vectors` instead.
    pub fn set_vtx_data(&mut self) -> Result<(), MeshError> {
        self.set_data(VertexAttr::Position)
    }

    pub fn set_norm_data(&mut self) -> Result<(), MeshError> {
        self.set_data(VertexAttr::Normal)
    }

    /// Only meaningful for meshes made with per-vertex color.
    pub fn set_color_data(&mut self) -> Result<(), MeshError> {
        self.set_data(VertexAttr::Color)
    }

    fn set_data(&mut self, attr: VertexAttr) -> Result<(), MeshError> {
        let Some(buff) = self.buff.as_mut() else {
            return Err(MeshError::NotMade(self.name.clone()));
        };
        let src = match attr {
            VertexAttr::Position => &self.vertex,
            VertexAttr::Normal => &self.norm,
            VertexAttr::TexCoord => &self.tex,
            VertexAttr::Color => &self.color,
        };
        buff.vectors_mut().set_vec_data(attr, src);
        Ok(())
    }

    /// Binds the buffers, making them first if needed.
    pub fn activate(&mut self, ctx: &mut GpuContext<'_>) -> Result<(), MeshError> {
        if self.buff.is_none() {
            self.make_vectors(ctx)?;
        }
        let buff = self.made(ctx)?;
        buff.activate(ctx.gpu)?;
        Ok(())
    }

    pub fn transfer_all(&self, ctx: &mut GpuContext<'_>) -> Result<(), MeshError> {
        self.made(ctx)?.transfer_all(ctx.gpu)?;
        Ok(())
    }

    pub fn transfer_vectors(&self, ctx: &mut GpuContext<'_>) -> Result<(), MeshError> {
        self.made(ctx)?.transfer_vectors(ctx.gpu)?;
        Ok(())
    }

    pub fn transfer_indexes(&self, ctx: &mut GpuContext<'_>) -> Result<(), MeshError> {
        self.made(ctx)?.transfer_indexes(ctx.gpu)?;
        Ok(())
    }

    /// Draws every index as triangles. `activate` must have run just before.
    pub fn render3d(&self, ctx: &mut GpuContext<'_>) -> Result<(), MeshError> {
        let buff = self.made(ctx)?;
        ctx.gpu.draw_triangles_indexed(0, buff.indexes().len() as u32)?;
        Ok(())
    }

    fn made(&self, ctx: &GpuContext<'_>) -> Result<&BufferMgr, MeshError> {
        if !ctx.active {
            return Err(MeshError::ContextInactive(self.name.clone()));
        }
        self.buff.as_ref().ok_or_else(|| MeshError::NotMade(self.name.clone()))
    }

    /// Frees the GPU buffers; the next activate makes them again.
    pub fn delete_buffers(&mut self, ctx: &mut GpuContext<'_>) {
        if let Some(buff) = self.buff.take() {
            buff.delete(ctx.gpu);
        }
    }

    /// Per-vertex normals as the area-weighted sum of the adjacent face
    /// normals.
    pub fn compute_norms(&mut self) {
        let n = self.num_vertices();
        let mut acc = vec![Vec3::ZERO; n];
        let vtx = |i: usize| Vec3::from_slice(&self.vertex[i * 3..i * 3 + 3]);
        for tri in self.index.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= n || b >= n || c >= n {
                continue;
            }
            // unnormalized, so length is twice the area
            let face = (vtx(b) - vtx(a)).cross(vtx(c) - vtx(a));
            acc[a] += face;
            acc[b] += face;
            acc[c] += face;
        }
        self.norm = acc.into_iter().flat_map(|v| v.normalize_or_zero().to_array()).collect();
    }

    pub fn compute_bbox(&mut self) -> MeshBBox {
        let mut pts = self.vertex.chunks_exact(3).map(Vec3::from_slice);
        let bbox = match pts.next() {
            Some(first) => pts.fold(MeshBBox { min: first, max: first }, |b, p| MeshBBox {
                min: b.min.min(p),
                max: b.max.max(p),
            }),
            None => MeshBBox::default(),
        };
        self.bbox = bbox;
        bbox
    }
}

/// A shape a scene can draw. `make` only builds CPU-side arrays, so it may
/// run on any thread; `update` runs with the render context current.
pub trait Mesh: Send {
    fn base(&self) -> &MeshBase;
    fn base_mut(&mut self) -> &mut MeshBase;

    fn name(&self) -> &str {
        &self.base().name
    }

    /// Rebuilds the geometry from the mesh's own parameters.
    fn make(&mut self) {}

    /// Pushes per-frame changes of a dynamic mesh to the GPU.
    fn update(&mut self, _ctx: &mut GpuContext<'_>) -> Result<(), MeshError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Geometry supplied directly by the caller.
#[derive(Debug, Clone, Default)]
pub struct GenericMesh {
    pub base: MeshBase,
}

impl GenericMesh {
    pub fn new(name: &str) -> Self {
        Self {
            base: MeshBase::new(name),
        }
    }
}

impl Mesh for GenericMesh {
    fn base(&self) -> &MeshBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeshBase {
        &mut self.base
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
    use crate::scene::{GpuCall, HeadlessGpu};

    fn triangle(name: &str) -> MeshBase {
        let mut m = MeshBase::new(name);
        m.vertex = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        m.norm = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        m.tex = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        m.index = vec![0, 1, 2];
        m
    }

    #[test]
    fn validate_reports_each_mismatch() {
        let mut m = MeshBase::new("empty");
        assert!(matches!(m.validate(), Err(ShapeInvalid::NoVertices { .. })));

        m = triangle("t");
        assert!(m.validate().is_ok());
        m.norm.truncate(6);
        assert_eq!(
            m.validate(),
            Err(ShapeInvalid::NormalCount {
                mesh: SmolStr::new("t"),
                normals: 2,
                vertices: 3
            })
        );

        m = triangle("t");
        m.tex.push(0.5);
        m.tex.push(0.5);
        assert!(matches!(m.validate(), Err(ShapeInvalid::TexCoordCount { texcoords: 4, .. })));

        m = triangle("t");
        m.color = vec![1.0; 8];
        assert!(matches!(m.validate(), Err(ShapeInvalid::ColorCount { colors: 2, .. })));
        m.color = vec![1.0; 12];
        assert!(m.validate().is_ok());
    }

    #[test]
    fn make_vectors_needs_active_context() {
        let mut gpu = HeadlessGpu::new();
        let mut m = triangle("t");
        let mut ctx = GpuContext::new(&mut gpu, false);
        assert_eq!(m.make_vectors(&mut ctx), Err(MeshError::ContextInactive(SmolStr::new("t"))));
        assert!(!m.is_made());
    }

    #[test]
    fn invalid_mesh_is_never_made() {
        crate::test_log::init();
        let mut gpu = HeadlessGpu::new();
        let mut m = triangle("untextured");
        m.tex.clear();
        let mut ctx = GpuContext::new(&mut gpu, true);
        assert!(matches!(m.make_vectors(&mut ctx), Err(MeshError::ShapeInvalid(_))));
        assert!(!m.is_made());
        assert_eq!(gpu.buffer_count(), 0);
        assert!(crate::test_log::logged(
            "trellis::mesh",
            "mesh `untextured` number of texcoords: 0 != vertices: 3"
        ));
    }

    #[test]
    fn dynamic_flag_sets_usage_once() {
        let mut gpu = HeadlessGpu::new();
        let mut m = triangle("t");
        m.dynamic = true;
        let mut ctx = GpuContext::new(&mut gpu, true);
        m.make_vectors(&mut ctx).unwrap();
        m.dynamic = false;
        m.make_vectors(&mut ctx).unwrap();
        assert_eq!(
            m.buffers().map(|b| b.vectors().usage()),
            Some(BufferUsage::Dynamic)
        );
        let created = gpu
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::CreateBuffer { .. }))
            .count();
        assert_eq!(created, 2);
    }

    #[test]
    fn adding_color_relayouts_buffer() {
        let mut gpu = HeadlessGpu::new();
        let mut m = triangle("t");
        let mut ctx = GpuContext::new(&mut gpu, true);
        m.make_vectors(&mut ctx).unwrap();
        assert_eq!(m.buffers().map(|b| b.vectors().num_vectors()), Some(3));
        m.color = vec![1.0, 0.0, 0.0, 1.0].repeat(3);
        m.make_vectors(&mut ctx).unwrap();
        let vb = m.buffers().map(|b| b.vectors().clone());
        assert_eq!(vb.as_ref().map(|v| v.num_vectors()), Some(4));
        assert_eq!(vb.map(|v| v.vec_data(VertexAttr::Color)), Some(m.color.clone()));
    }

    #[test]
    fn set_vtx_data_after_count_change_keeps_gpu_len() {
        let mut gpu = HeadlessGpu::new();
        let mut m = triangle("t");
        m.dynamic = true;
        {
            let mut ctx = GpuContext::new(&mut gpu, true);
            m.activate(&mut ctx).unwrap();
            m.transfer_all(&mut ctx).unwrap();
        }
        let vid = m.buffers().map(|b| b.vectors().id());

        // caller grows the mesh but skips make_vectors
        m.vertex.extend_from_slice(&[5.0, 5.0, 5.0]);
        m.vertex[0] = -1.0;
        m.set_vtx_data().unwrap();
        {
            let mut ctx = GpuContext::new(&mut gpu, true);
            m.transfer_vectors(&mut ctx).unwrap();
        }
        let buf = vid.and_then(|id| gpu.buffer(id));
        assert_eq!(buf.map(|b| b.len()), Some(3));
        assert_eq!(buf.map(|b| b.floats[0]), Some(-1.0));
        assert!(!buf.is_some_and(|b| b.floats.contains(&5.0)));
    }

    #[test]
    fn set_data_before_make_fails() {
        let mut m = triangle("t");
        assert_eq!(m.set_norm_data(), Err(MeshError::NotMade(SmolStr::new("t"))));
    }

    #[test]
    fn render3d_draws_all_indexes() {
        let mut gpu = HeadlessGpu::new();
        let mut m = triangle("t");
        let mut ctx = GpuContext::new(&mut gpu, true);
        m.activate(&mut ctx).unwrap();
        m.transfer_all(&mut ctx).unwrap();
        m.render3d(&mut ctx).unwrap();
        assert_eq!(gpu.calls().last(), Some(&GpuCall::Draw { start: 0, count: 3 }));
    }

    #[test]
    fn norms_follow_winding() {
        let mut m = triangle("t");
        m.norm.clear();
        m.compute_norms();
        assert_eq!(m.norm, vec![0.0, 0.0, 1.0].repeat(3));
        let bbox = m.compute_bbox();
        assert_eq!(bbox.max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(bbox.center(), Vec3::new(0.5, 0.5, 0.0));
    }
}
