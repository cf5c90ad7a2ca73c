mod base_component;
pub mod components;
mod surface;

pub use base_component::*;
pub use components::*;
pub use surface::*;
