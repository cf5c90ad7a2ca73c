mod button;
mod frame;
mod icon;
mod label;
mod space;
mod viewport;

pub use button::*;
pub use frame::*;
pub use icon::*;
pub use label::*;
pub use space::*;
pub use viewport::*;

use crate::style::{Props, TypeProps, TypeRegistry, Unit, Value};

/// Type defaults for the built-in widgets.
pub fn builtin_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register("Viewport", TypeProps::new(Props::new()));
    registry.register("Frame", TypeProps::new(Props::new()));
    registry.register(
        "Label",
        TypeProps::new(Props::new().with("padding", Value::px(2.0))),
    );
    registry.register(
        "Icon",
        TypeProps::new(
            Props::new()
                .with("width", Value::new(1.0, Unit::Em))
                .with("height", Value::new(1.0, Unit::Em)),
        ),
    );
    registry.register(
        "Space",
        TypeProps::new(Props::new().with("width", Value::new(1.0, Unit::Em))),
    );
    registry.register(
        "Button",
        TypeProps::new(
            Props::new()
                .with("border-width", Value::px(1.0))
                .with("border-radius", Value::px(4.0))
                .with("border-color", "#808080")
                .with("padding", Value::px(4.0))
                .with("margin", Value::px(2.0))
                .with("background-color", "#f0f0f0")
                .with("align-vert", "center")
                .with("box-shadow.h-offset", Value::px(2.0))
                .with("box-shadow.v-offset", Value::px(2.0))
                .with("box-shadow.color", "#00000040"),
        )
        .with_sub(":hover", Props::new().with("background-color", "#e0e0e0"))
        .with_sub(":selected", Props::new().with("background-color", "#c0d8f0"))
        .with_sub(":inactive", Props::new().with("color", "#808080"))
        .with_sub(
            "#icon",
            Props::new()
                .with("width", Value::new(1.5, Unit::Em))
                .with("height", Value::new(1.5, Unit::Em))
                .with("fill", "#404040"),
        )
        .with_sub("#label", Props::new().with("padding", Value::ZERO)),
    );
    registry
}
