use crate::view::{
    BBox, Initializable, LayoutDirection, Layoutable, Movable, NodeKey, Renderable, Sizeable, Styleable, WidgetTree,
};

/// Plain container laying its children out along `dir`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Frame {
    pub dir: LayoutDirection,
}

impl Frame {
    pub fn new(dir: LayoutDirection) -> Self {
        Self { dir }
    }

    pub fn row() -> Self {
        Self::new(LayoutDirection::Row)
    }

    pub fn column() -> Self {
        Self::new(LayoutDirection::Column)
    }

    pub fn stacked() -> Self {
        Self::new(LayoutDirection::Stacked)
    }
}

impl Initializable for Frame {}
impl Styleable for Frame {}

impl Sizeable for Frame {
    fn size(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.size_widget_base(key);
        tree.gather_children_sizes(key, self.dir);
    }
}

impl Layoutable for Frame {
    fn layout(&mut self, tree: &mut WidgetTree, key: NodeKey, par_bbox: BBox) {
        tree.layout_widget_base(key, par_bbox, true);
        tree.allocate_children(key, self.dir);
        tree.layout_children(key);
    }
}

impl Renderable for Frame {
    fn render(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        if tree.push_bounds(key) {
            tree.render_std_box(key);
            tree.render_children(key);
            tree.pop_bounds(key);
        }
    }
}

impl Movable for Frame {}

crate::impl_widget!(Frame, "Frame");

#[cfg(test)]
mod tests {
    use super::Frame;
    use crate::style::Value;
    use crate::view::{Label, RecordingSurface, Viewport, WidgetTree};

    #[test]
    fn column_stacks_children_in_order() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 200));
        let root = tree.set_root(Viewport::new(), "root");
        let col = tree.add_child(root, Frame::column(), "col");
        let a = tree.add_child(col, Label::new("a"), "a");
        let b = tree.add_child(col, Label::new("b"), "b");
        tree.render();
        let (pa, sa) = tree.node(a).map(|n| (n.layout.alloc_pos, n.layout.alloc_size)).unwrap_or_default();
        let pb = tree.node(b).map(|n| n.layout.alloc_pos).unwrap_or_default();
        assert_eq!(pb.y, pa.y + sa.y);
        assert_eq!(pb.x, pa.x);
    }

    #[test]
    fn stacked_children_use_offsets() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 200));
        let root = tree.set_root(Viewport::new(), "root");
        let st = tree.add_child(root, Frame::stacked(), "st");
        tree.set_fixed_width(st, Value::px(100.0));
        tree.set_fixed_height(st, Value::px(100.0));
        let a = tree.add_child(st, Label::new("a"), "a");
        tree.set_prop(a, "x", Value::px(10.0));
        tree.set_prop(a, "y", Value::px(20.0));
        tree.render();
        let pos = tree.node(a).map(|n| n.layout.alloc_pos).unwrap_or_default();
        assert_eq!((pos.x, pos.y), (10.0, 20.0));
    }
}
