use glam::IVec2;
use std::any::Any;

mod core;
mod events;
mod layout;
mod node;
mod parts;
mod rerender;
mod tree;
mod widget_base;

pub use self::core::*;
pub use layout::*;
pub use node::*;
pub use parts::*;
pub use tree::*;

pub trait Initializable {
    /// Binds the node to its render surface and connects its event handlers.
    fn init(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.init_widget_base(key);
    }
}

pub trait Styleable {
    fn style(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.style_widget_base(key);
    }
}

pub trait Sizeable {
    /// Bottom-up: children and parts have already been sized.
    fn size(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.size_widget_base(key);
    }
}

pub trait Layoutable {
    /// Top-down: the container already set `alloc_pos_rel` and `alloc_size`.
    fn layout(&mut self, tree: &mut WidgetTree, key: NodeKey, par_bbox: BBox) {
        tree.layout_widget_base(key, par_bbox, true);
        tree.layout_children(key);
    }
}

pub trait Renderable {
    fn render(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.render_widget_base(key);
    }
}

pub trait Movable {
    fn move_by(&mut self, tree: &mut WidgetTree, key: NodeKey, delta: IVec2, par_bbox: BBox) {
        tree.move_widget_base(key, delta, par_bbox);
        tree.move_children(key, delta);
    }
}

/// Behaviour of one node kind. Every pass has a default that delegates to the
/// shared base implementation on [`WidgetTree`]; widgets override only the
/// steps they customize.
pub trait Widget: Initializable + Styleable + Sizeable + Layoutable + Renderable + Movable + Any {
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Implements [`Widget`] with the given type name, using the pass impls
/// already in scope for the type.
#[macro_export]
macro_rules! impl_widget {
    ($ty:ty, $name:literal) => {
        impl $crate::view::Widget for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }
    };
}
