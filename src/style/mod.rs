mod color;
mod computed_style;
mod parsed_style;
mod resolver;
mod units;

pub use color::*;
pub use computed_style::*;
pub use parsed_style::*;
pub use resolver::*;
pub use units::*;
