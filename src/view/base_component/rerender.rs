use super::{NodeFlags, NodeKey, WidgetTree};
use glam::Vec2;

impl WidgetTree {
    /// Flags the subtree at `key` to run every pass again before its next paint.
    pub fn mark_full_rerender(&mut self, key: NodeKey) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.flags.insert(NodeFlags::FULL_RERENDER);
        }
    }

    pub fn clear_full_rerender_tree(&mut self, key: NodeKey) {
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(k) {
                node.flags.remove(NodeFlags::FULL_RERENDER);
                stack.extend(node.parts);
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Init, style, size, layout and render of one subtree. The allocation the
    /// subtree root got from its container is kept, so siblings are not
    /// disturbed.
    pub fn re_render_tree(&mut self, key: NodeKey) {
        let Some(saved) = self.nodes.get(key).map(|n| n.layout) else {
            return;
        };
        let has_parent = self.parent(key).is_some();
        self.init_tree(key);
        self.style_tree(key);
        self.size_tree(key);
        if has_parent && let Some(node) = self.nodes.get_mut(key) {
            node.layout.alloc_pos_rel = saved.alloc_pos_rel;
            node.layout.alloc_pos = saved.alloc_pos;
            node.layout.alloc_pos_orig = saved.alloc_pos_orig;
            if saved.alloc_size != Vec2::ZERO {
                node.layout.alloc_size = saved.alloc_size;
            }
        }
        self.clear_full_rerender_tree(key);
        self.layout_tree(key);
        self.render_node(key);
    }

    /// Re-renders only the topmost dirty subtrees. Returns how many ran.
    pub fn update_dirty(&mut self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut dirty = Vec::new();
        let mut stack = vec![root];
        while let Some(k) = stack.pop() {
            let Some(node) = self.nodes.get(k) else {
                continue;
            };
            if node.needs_full_rerender() {
                dirty.push(k);
                continue;
            }
            stack.extend(node.parts);
            stack.extend(node.children.iter().rev().copied());
        }
        for &key in &dirty {
            if self.config.trace.render {
                log::debug!(target: "trellis::render", "{}: dirty subtree", self.path(key));
            }
            self.re_render_tree(key);
        }
        dirty.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{TraceConfig, TreeConfig};
    use crate::style::Value;
    use crate::view::{DrawCommand, Frame, Label, RecordingSurface, Viewport, WidgetTree};

    #[test]
    fn first_render_clears_every_flag() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let frame = tree.add_child(root, Frame::column(), "frame");
        let label = tree.add_child(frame, Label::new("a"), "a");
        tree.render();
        for key in [root, frame, label] {
            assert!(!tree.node(key).is_some_and(|n| n.needs_full_rerender()));
        }
        assert_eq!(tree.update_dirty(), 0);
    }

    #[test]
    fn dirty_sibling_rerenders_alone() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let frame = tree.add_child(root, Frame::column(), "frame");
        let a = tree.add_child(frame, Label::new("first"), "a");
        let b = tree.add_child(frame, Label::new("second"), "b");
        tree.render();
        let a_layout = tree.node(a).map(|n| n.layout);
        let b_pos = tree.node(b).map(|n| n.layout.alloc_pos);

        if let Some(s) = tree.surface_as_mut::<RecordingSurface>() {
            s.clear();
        }
        tree.set_prop(b, "color", "#ff0000");
        assert!(tree.node(b).is_some_and(|n| n.needs_full_rerender()));
        assert!(!tree.node(frame).is_some_and(|n| n.needs_full_rerender()));
        assert_eq!(tree.update_dirty(), 1);

        assert_eq!(tree.node(a).map(|n| n.layout), a_layout);
        assert_eq!(tree.node(b).map(|n| n.layout.alloc_pos), b_pos);
        let texts: Vec<String> = tree
            .surface_as::<RecordingSurface>()
            .map(|s| {
                s.commands()
                    .iter()
                    .filter_map(|c| match c {
                        DrawCommand::Text { text, .. } => Some(text.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(texts, ["second"]);
    }

    #[test]
    fn layout_prop_dirties_parent() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let frame = tree.add_child(root, Frame::row(), "frame");
        tree.set_prop(frame, "width", Value::px(150.0));
        let a = tree.add_child(frame, Label::new("x"), "a");
        tree.render();
        tree.set_prop(a, "width", Value::px(80.0));
        assert!(tree.node(frame).is_some_and(|n| n.needs_full_rerender()));
        tree.render();
        assert!(tree.node(a).is_some_and(|n| n.layout.alloc_size.x >= 80.0));
    }

    #[test]
    fn dirty_trace_follows_render_toggle() {
        crate::test_log::init();
        for (render, name) in [(false, "quiet_dirty_label"), (true, "traced_dirty_label")] {
            let config = TreeConfig {
                trace: TraceConfig {
                    render,
                    ..TraceConfig::off()
                },
                ..TreeConfig::default()
            };
            let mut tree = WidgetTree::with_config(Box::new(RecordingSurface::new(200, 100)), config);
            let root = tree.set_root(Viewport::new(), "root");
            let label = tree.add_child(root, Label::new("x"), name);
            tree.render();
            tree.set_prop(label, "color", "#ff0000");
            assert_eq!(tree.update_dirty(), 1);
            let line = format!("/root/{name}: dirty subtree");
            assert_eq!(crate::test_log::logged("trellis::render", &line), render);
        }
    }
}
