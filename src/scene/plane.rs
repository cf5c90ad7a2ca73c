use super::gpu::GpuContext;
use super::mesh::{Mesh, MeshBase};
use crate::error::MeshError;
use glam::{Vec3, Vec4};
use std::any::Any;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    /// The axis orthogonal to both `a` and `b`.
    pub fn other(a: Axis, b: Axis) -> Axis {
        match (a, b) {
            (Axis::X, Axis::Z) | (Axis::Z, Axis::X) => Axis::Y,
            (Axis::Y, Axis::Z) | (Axis::Z, Axis::Y) => Axis::X,
            _ => Axis::Z,
        }
    }

    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// A regular grid on the plane spanned by `waxis` and `haxis`, `zoff` along
/// the remaining axis. A negative direction grows the grid towards lower
/// coordinates from `off + size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneSpec {
    pub waxis: Axis,
    pub haxis: Axis,
    pub wdir: i32,
    pub hdir: i32,
    pub width: f32,
    pub height: f32,
    pub woff: f32,
    pub hoff: f32,
    pub zoff: f32,
    pub wsegs: usize,
    pub hsegs: usize,
    pub color: Option<Vec4>,
}

impl Default for PlaneSpec {
    fn default() -> Self {
        Self {
            waxis: Axis::X,
            haxis: Axis::Y,
            wdir: 1,
            hdir: 1,
            width: 1.0,
            height: 1.0,
            woff: 0.0,
            hoff: 0.0,
            zoff: 0.0,
            wsegs: 1,
            hsegs: 1,
            color: None,
        }
    }
}

impl PlaneSpec {
    fn segs(&self) -> (usize, usize) {
        (self.wsegs.max(1), self.hsegs.max(1))
    }

    /// Grid positions row by row, `hsegs + 1` rows of `wsegs + 1`.
    fn positions(&self) -> impl Iterator<Item = (usize, usize, Vec3)> + '_ {
        let (wsegs, hsegs) = self.segs();
        let w = Axis::other(self.waxis, self.haxis);
        let seg_w = self.width / wsegs as f32;
        let seg_h = self.height / hsegs as f32;
        let woff = if self.wdir < 0 { self.width + self.woff } else { self.woff };
        let hoff = if self.hdir < 0 { self.height + self.hoff } else { self.hoff };
        (0..=hsegs).flat_map(move |iy| {
            (0..=wsegs).map(move |ix| {
                let mut v = [0.0f32; 3];
                v[self.waxis.index()] = ix as f32 * seg_w * self.wdir as f32 + woff;
                v[self.haxis.index()] = iy as f32 * seg_h * self.hdir as f32 + hoff;
                v[w.index()] = self.zoff;
                (ix, iy, Vec3::from_array(v))
            })
        })
    }
}

/// Vertices in one plane of `wsegs` by `hsegs` segments, each at least 1.
pub fn plane_size(wsegs: usize, hsegs: usize) -> usize {
    (wsegs.max(1) + 1) * (hsegs.max(1) + 1)
}

impl MeshBase {
    /// Appends a plane grid with its normals, texcoords, indexes and, when the
    /// spec has one, a uniform color.
    pub fn add_plane(&mut self, spec: &PlaneSpec) {
        let start = self.num_vertices() as u32;
        let (wsegs, hsegs) = spec.segs();
        let mut norm = [0.0f32; 3];
        norm[Axis::other(spec.waxis, spec.haxis).index()] = if spec.zoff > 0.0 { 1.0 } else { -1.0 };

        for (ix, iy, v) in spec.positions() {
            self.vertex.extend_from_slice(&v.to_array());
            self.norm.extend_from_slice(&norm);
            self.tex.push(ix as f32 / wsegs as f32);
            self.tex.push(1.0 - iy as f32 / hsegs as f32);
            if let Some(c) = spec.color {
                self.color.extend_from_slice(&c.to_array());
            }
        }

        let row = wsegs as u32 + 1;
        for iy in 0..hsegs as u32 {
            for ix in 0..wsegs as u32 {
                let a = start + ix + row * iy;
                let b = start + ix + row * (iy + 1);
                let c = start + ix + 1 + row * (iy + 1);
                let d = start + ix + 1 + row * iy;
                self.index.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }

    /// Rewrites the positions (and colors, if the spec has one) of a plane
    /// already added at vertex index `start`. Normals, texcoords and indexes
    /// are left alone. Vertices past the end of the arrays are skipped.
    pub fn set_plane_vtx(&mut self, start: usize, spec: &PlaneSpec) {
        for (i, (_, _, v)) in spec.positions().enumerate() {
            let at = (start + i) * 3;
            if let Some(dst) = self.vertex.get_mut(at..at + 3) {
                dst.copy_from_slice(&v.to_array());
            }
            if let Some(c) = spec.color {
                let at = (start + i) * 4;
                if let Some(dst) = self.color.get_mut(at..at + 4) {
                    dst.copy_from_slice(&c.to_array());
                }
            }
        }
    }
}

/// A single plane. With `dynamic` set, `reshape` moves the vertices in place
/// and the next `update` pushes just the vertex data.
#[derive(Debug, Clone)]
pub struct PlaneMesh {
    pub base: MeshBase,
    spec: PlaneSpec,
    pending: bool,
}

impl PlaneMesh {
    pub fn new(name: &str, spec: PlaneSpec) -> Self {
        let mut mesh = Self {
            base: MeshBase::new(name),
            spec,
            pending: false,
        };
        mesh.make();
        mesh
    }

    pub fn spec(&self) -> &PlaneSpec {
        &self.spec
    }

    /// Same-topology change. A different segment count needs `set_spec`.
    pub fn reshape(&mut self, width: f32, height: f32, zoff: f32) {
        self.spec.width = width;
        self.spec.height = height;
        self.spec.zoff = zoff;
        self.base.set_plane_vtx(0, &self.spec);
        self.base.compute_bbox();
        self.pending = true;
    }

    /// Replaces the whole plane; the mesh must be made again.
    pub fn set_spec(&mut self, spec: PlaneSpec) {
        self.spec = spec;
        self.make();
    }
}

impl Mesh for PlaneMesh {
    fn base(&self) -> &MeshBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut MeshBase {
        &mut self.base
    }

    fn make(&mut self) {
        self.base.reset();
        self.base.add_plane(&self.spec);
        self.base.compute_bbox();
        self.pending = false;
    }

    fn update(&mut self, ctx: &mut GpuContext<'_>) -> Result<(), MeshError> {
        if !self.pending || !self.base.is_made() {
            return Ok(());
        }
        self.base.set_vtx_data()?;
        if self.spec.color.is_some() {
            self.base.set_color_data()?;
        }
        self.base.transfer_vectors(ctx)?;
        self.pending = false;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
