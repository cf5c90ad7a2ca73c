use crate::view::{
    BBox, Initializable, LayoutDirection, Layoutable, Movable, NodeFlags, NodeKey, Renderable, Sizeable, Styleable,
    WidgetTree,
};

/// Root of a render surface. Always sized to the surface; children are
/// stacked at their `x`/`y` offsets.
#[derive(Debug, Default)]
pub struct Viewport;

impl Viewport {
    pub fn new() -> Self {
        Self
    }

    fn fill_surface(tree: &mut WidgetTree, key: NodeKey) {
        let size = tree.surface_size();
        if let Some(node) = tree.node_mut(key) {
            node.layout.alloc_size = size;
            node.layout.alloc_pos_rel = glam::Vec2::ZERO;
        }
    }
}

impl Initializable for Viewport {
    fn init(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        if let Some(node) = tree.node_mut(key) {
            node.flags.insert(NodeFlags::VIEWPORT);
        }
        tree.init_widget_base(key);
    }
}

impl Styleable for Viewport {}

impl Sizeable for Viewport {
    fn size(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.size_widget_base(key);
        Self::fill_surface(tree, key);
    }
}

impl Layoutable for Viewport {
    fn layout(&mut self, tree: &mut WidgetTree, key: NodeKey, par_bbox: BBox) {
        Self::fill_surface(tree, key);
        tree.layout_widget_base(key, par_bbox, true);
        tree.allocate_children(key, LayoutDirection::Stacked);
        tree.layout_children(key);
    }
}

impl Renderable for Viewport {
    fn render(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        if tree.push_bounds(key) {
            tree.render_std_box(key);
            tree.render_children(key);
            tree.pop_bounds(key);
        }
    }
}

impl Movable for Viewport {}

crate::impl_widget!(Viewport, "Viewport");
