use super::gpu::{GpuBackend, GpuContext, ProgramId, UniformDecl, UniformType, UniformValue, VertexAttr};
use super::mesh::Mesh;
use crate::error::{GpuError, MeshError};
use glam::{Mat4, Vec3, Vec4};
use smol_str::SmolStr;

/// Source of the program every scene draws with.
pub const MESH_SHADER: &str = include_str!("mesh.wgsl");

/// A vertex input of the mesh program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDesc {
    pub name: &'static str,
    pub attr: VertexAttr,
    pub location: u32,
}

pub const MESH_VECTORS: [VectorDesc; 4] = [
    VectorDesc {
        name: "pos",
        attr: VertexAttr::Position,
        location: 0,
    },
    VectorDesc {
        name: "norm",
        attr: VertexAttr::Normal,
        location: 1,
    },
    VectorDesc {
        name: "uv",
        attr: VertexAttr::TexCoord,
        location: 2,
    },
    VectorDesc {
        name: "color",
        attr: VertexAttr::Color,
        location: 3,
    },
];

pub fn mesh_uniforms() -> Vec<UniformDecl> {
    vec![
        UniformDecl::new("mvp", UniformType::Mat4),
        UniformDecl::new("model", UniformType::Mat4),
        UniformDecl::new("base_color", UniformType::Vec4),
        UniformDecl::new("light_dir", UniformType::Vec3),
    ]
}

/// Named meshes drawn with one program. GPU work only happens while the
/// scene's render context is marked active.
pub struct Scene {
    name: SmolStr,
    active: bool,
    meshes: Vec<Box<dyn Mesh>>,
    program: Option<ProgramId>,
    pub view_proj: Mat4,
    pub base_color: Vec4,
    pub light_dir: Vec3,
}

impl Scene {
    pub fn new(name: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            active: false,
            meshes: Vec::new(),
            program: None,
            view_proj: Mat4::IDENTITY,
            base_color: Vec4::ONE,
            light_dir: Vec3::new(0.0, 0.0, -1.0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Marks whether this thread currently holds the scene's render context.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn vectors(&self) -> &'static [VectorDesc] {
        &MESH_VECTORS
    }

    pub fn vector(&self, attr: VertexAttr) -> Option<&'static VectorDesc> {
        MESH_VECTORS.iter().find(|v| v.attr == attr)
    }

    /// Adds `mesh`, replacing any mesh of the same name. Returns the old one.
    pub fn add_mesh(&mut self, mesh: impl Mesh + 'static) -> Option<Box<dyn Mesh>> {
        let mesh: Box<dyn Mesh> = Box::new(mesh);
        match self.meshes.iter().position(|m| m.name() == mesh.name()) {
            Some(i) => Some(std::mem::replace(&mut self.meshes[i], mesh)),
            None => {
                self.meshes.push(mesh);
                None
            }
        }
    }

    /// Removes the mesh and frees its GPU buffers.
    pub fn remove_mesh(&mut self, name: &str, gpu: &mut dyn GpuBackend) -> Option<Box<dyn Mesh>> {
        let i = self.meshes.iter().position(|m| m.name() == name)?;
        let mut mesh = self.meshes.remove(i);
        mesh.base_mut().delete_buffers(&mut GpuContext::new(gpu, self.active));
        Some(mesh)
    }

    pub fn mesh_names(&self) -> impl Iterator<Item = &str> {
        self.meshes.iter().map(|m| m.name())
    }

    pub fn mesh(&self, name: &str) -> Option<&dyn Mesh> {
        self.meshes.iter().find(|m| m.name() == name).map(|m| m.as_ref())
    }

    pub fn mesh_mut(&mut self, name: &str) -> Option<&mut (dyn Mesh + 'static)> {
        self.meshes.iter_mut().find(|m| m.name() == name).map(|m| m.as_mut())
    }

    pub fn mesh_as<T: Mesh + 'static>(&self, name: &str) -> Option<&T> {
        self.mesh(name).and_then(|m| m.as_any().downcast_ref::<T>())
    }

    pub fn mesh_as_mut<T: Mesh + 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.mesh_mut(name).and_then(|m| m.as_any_mut().downcast_mut::<T>())
    }

    /// Runs every mesh's `make` in parallel. Only CPU arrays are touched, so
    /// no context is needed.
    pub fn make_meshes(&mut self) {
        std::thread::scope(|s| {
            for mesh in self.meshes.iter_mut() {
                s.spawn(move || mesh.make());
            }
        });
    }

    /// Uploads a mesh whose element counts changed since it was last made.
    pub fn rebuild_mesh(&mut self, name: &str, gpu: &mut dyn GpuBackend) -> Result<(), MeshError> {
        let active = self.active;
        let Some(mesh) = self.mesh_mut(name) else {
            return Ok(());
        };
        let mut ctx = GpuContext::new(gpu, active);
        mesh.base_mut().make_vectors(&mut ctx)?;
        mesh.base().transfer_all(&mut ctx)
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    fn ensure_program(&mut self, gpu: &mut dyn GpuBackend) -> Result<ProgramId, GpuError> {
        if let Some(program) = self.program {
            return Ok(program);
        }
        let program = gpu.compile_program(&self.name, MESH_SHADER, &mesh_uniforms())?;
        self.program = Some(program);
        Ok(program)
    }

    /// Draws every mesh: update, activate (making it on first use), transfer
    /// when new, then render. A mesh that fails is logged and skipped.
    /// Returns how many meshes were drawn.
    pub fn render(&mut self, gpu: &mut dyn GpuBackend) -> Result<usize, MeshError> {
        if !self.active {
            return Err(MeshError::ContextInactive(self.name.clone()));
        }
        let program = self.ensure_program(gpu)?;
        gpu.use_program(program)?;
        gpu.set_uniform(program, "mvp", UniformValue::Mat4(self.view_proj))?;
        gpu.set_uniform(program, "model", UniformValue::Mat4(Mat4::IDENTITY))?;
        gpu.set_uniform(program, "base_color", UniformValue::Vec4(self.base_color))?;
        gpu.set_uniform(program, "light_dir", UniformValue::Vec3(self.light_dir))?;

        let mut drawn = 0;
        let mut ctx = GpuContext::new(gpu, true);
        for mesh in self.meshes.iter_mut() {
            match draw_mesh(mesh.as_mut(), &mut ctx) {
                Ok(()) => drawn += 1,
                // validation already logged the reason
                Err(MeshError::ShapeInvalid(_)) => {}
                Err(err) => log::warn!(target: "trellis::mesh", "{}: {err}", self.name),
            }
        }
        Ok(drawn)
    }
}

fn draw_mesh(mesh: &mut dyn Mesh, ctx: &mut GpuContext<'_>) -> Result<(), MeshError> {
    mesh.update(ctx)?;
    let fresh = !mesh.base().is_made();
    let base = mesh.base_mut();
    base.activate(ctx)?;
    if fresh {
        base.transfer_all(ctx)?;
    }
    base.render3d(ctx)
}
