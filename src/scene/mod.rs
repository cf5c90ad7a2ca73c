mod buffer;
mod gpu;
mod headless;
mod mesh;
mod plane;
#[allow(clippy::module_inception)]
mod scene;
mod wgpu_backend;

pub use buffer::*;
pub use gpu::*;
pub use headless::*;
pub use mesh::*;
pub use plane::*;
pub use scene::*;
pub use wgpu_backend::*;
