use super::{BBox, LifecycleState, NodeFlags, NodeKey, WidgetTree};
use crate::style::{Color, PropValue, Props, StyleRequest, StyleSheet, Value, affects_layout};
use crate::view::Paint;
use glam::{IVec2, Vec2};
use smol_str::SmolStr;

impl WidgetTree {
    /// Binds the node to the nearest viewport at or above it and connects its
    /// handlers so it can receive events before its first paint.
    pub fn init_widget_base(&mut self, key: NodeKey) {
        let mut viewport = self.root;
        let mut cur = Some(key);
        while let Some(k) = cur {
            let Some(node) = self.nodes.get(k) else {
                break;
            };
            if node.flags.contains(NodeFlags::VIEWPORT) {
                viewport = Some(k);
                break;
            }
            cur = node.parent;
        }
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.viewport = viewport.or(Some(key));
        node.style.resolved = false;
        node.state = LifecycleState::Initialized;
        self.connect_to_viewport(key);
    }

    /// Resolves the node's style snapshot and loads its layout constraints.
    pub fn style_widget_base(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let parent = node.parent.and_then(|p| self.nodes.get(p));
        let mut sheets: Vec<&StyleSheet> = Vec::new();
        let mut cur = Some(node);
        while let Some(n) = cur {
            if !n.css.is_empty() {
                sheets.push(&n.css);
            }
            cur = n.parent.and_then(|p| self.nodes.get(p));
        }
        sheets.reverse();
        let req = StyleRequest {
            type_name: node.type_name,
            state: node.state_selector(),
            name: &node.name,
            class: &node.class,
            parent: parent.map(|p| &p.style),
            props: &node.props,
            css: &sheets,
            part_default: node.def_style.as_deref(),
        };
        let mut style = self.resolver.resolve(&req);
        let vp = self.surface_size();
        let el = parent.map(|p| p.layout.alloc_size).unwrap_or(vp);
        style.set_unit_context(vp.to_array(), el.to_array());
        if self.config.trace.style {
            log::debug!(
                target: "trellis::style",
                "{}: {}{} font {} color {:?} box {}",
                self.path(key),
                req.type_name,
                req.state,
                style.unit_ctx.font_size,
                style.color,
                style.box_space(),
            );
        }

        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.layout.set_from_style(&style.layout);
        node.flags.set(NodeFlags::INACTIVE, style.inactive);
        node.style = style;
        node.state = LifecycleState::Styled;
    }

    /// Reloads constraints from the style; content-sized widgets add their own
    /// size afterwards.
    pub fn size_widget_base(&mut self, key: NodeKey) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.layout.set_from_style(&node.style.layout);
        }
    }

    /// Positions the node from its parent and the offset its container gave
    /// it, records the move baseline and computes its bboxes.
    pub fn layout_widget_base(&mut self, key: NodeKey, par_bbox: BBox, init_style: bool) {
        let vp = self.surface_size();
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let parent = node
            .parent
            .and_then(|p| self.nodes.get(p))
            .map(|p| (p.layout.alloc_pos, p.layout.alloc_size));
        let part_root = node.flags.contains(NodeFlags::PART_ROOT);

        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        if !part_root {
            let parent_pos = parent.map(|p| p.0).unwrap_or(Vec2::ZERO);
            node.layout.alloc_pos = parent_pos + node.layout.alloc_pos_rel;
        }
        node.layout.alloc_pos_orig = node.layout.alloc_pos;
        if init_style {
            let el = parent.map(|p| p.1).unwrap_or(vp);
            node.style.set_unit_context(vp.to_array(), el.to_array());
        }
        node.bbox = BBox::from_pos_size(node.layout.alloc_pos, node.layout.alloc_size);
        self.compute_bbox_base(key, par_bbox, IVec2::ZERO);

        if self.config.trace.layout
            && let Some(node) = self.nodes.get(key)
        {
            log::debug!(
                target: "trellis::layout",
                "{}: pos {} size {} vp {:?}",
                self.path(key),
                node.layout.alloc_pos,
                node.layout.alloc_size,
                node.vp_bbox,
            );
        }
    }

    /// Derives the moved, clipped and window bboxes from the layout-time bbox.
    pub fn compute_bbox_base(&mut self, key: NodeKey, par_bbox: BBox, delta: IVec2) {
        let window_pos = self.window_pos();
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.obj_bbox = node.bbox.translate(delta);
        node.vp_bbox = if node.is_overlay() {
            node.obj_bbox
        } else {
            par_bbox.intersect(&node.obj_bbox)
        };
        node.win_bbox = node.vp_bbox.translate(window_pos);
    }

    /// Enters the node's clip region. Returns false, after dropping the
    /// subtree's event bindings, when there is nothing to paint.
    pub fn push_bounds(&mut self, key: NodeKey) -> bool {
        let surface_bounds = self.surface.bounds();
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        node.flags.remove(NodeFlags::FULL_RERENDER);
        let bounds = if node.is_overlay() {
            surface_bounds
        } else if node.vp_bbox.is_empty() || !node.style.is_displayed() {
            self.disconnect_subtree_events(key);
            return false;
        } else {
            node.vp_bbox
        };
        self.surface.push_bounds(bounds);
        if !self.is_connected(key) {
            self.connect_to_viewport(key);
        }
        if self.config.trace.render {
            log::debug!(target: "trellis::render", "{}: bounds {:?}", self.path(key), bounds);
        }
        true
    }

    pub fn pop_bounds(&mut self, key: NodeKey) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.state = LifecycleState::Rendered;
        }
        self.surface.pop_bounds();
    }

    pub fn render_widget_base(&mut self, key: NodeKey) {
        if self.push_bounds(key) {
            self.render_children(key);
            self.pop_bounds(key);
        }
    }

    /// Moves the node to its layout position plus `delta`; sizes are untouched.
    pub fn move_widget_base(&mut self, key: NodeKey, delta: IVec2, par_bbox: BBox) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.layout.alloc_pos = node.layout.alloc_pos_orig + delta.as_vec2();
        self.compute_bbox_base(key, par_bbox, delta);
    }

    /// Shadow, background and border of the node's box, inset by its margin.
    pub fn render_std_box(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let st = &node.style;
        let margin = st.layout.margin.dots;
        let pos = node.obj_bbox.min.as_vec2() + Vec2::splat(margin);
        let size = node.obj_bbox.size().as_vec2() - Vec2::splat(2.0 * margin);
        if size.x <= 0.0 || size.y <= 0.0 {
            return;
        }
        let opacity = st.opacity;
        let radius = st.border.radius.dots;
        let shadow = st.shadow.has_shadow().then(|| {
            let offset = Vec2::new(st.shadow.h_offset.dots, st.shadow.v_offset.dots);
            let spread = st.shadow.spread.dots;
            (
                pos + offset - Vec2::splat(spread),
                size + Vec2::splat(2.0 * spread),
                st.shadow.color.with_opacity(opacity),
            )
        });
        let background = st.font.bg_color.with_opacity(opacity);
        let mut strokes = Vec::with_capacity(2);
        for (border, outside) in [(&st.border, false), (&st.outline, true)] {
            let width = border.width.dots;
            if !border.style.is_drawn() || width <= 0.0 || border.color.is_none() {
                continue;
            }
            let half = Vec2::splat(width * 0.5);
            let (p, s) = if outside {
                (pos - half, size + 2.0 * half)
            } else {
                (pos + half, size - 2.0 * half)
            };
            strokes.push((p, s, border.radius.dots, width, border.color.with_opacity(opacity)));
        }

        let surface = self.surface.as_mut();
        if let Some((spos, ssize, color)) = shadow
            && !color.is_none()
        {
            surface.fill_rect(
                spos,
                ssize,
                radius,
                Paint::Gradient {
                    from: color,
                    to: Color::TRANSPARENT,
                },
            );
        }
        if !background.is_none() {
            surface.fill_rect(pos, size, radius, Paint::Solid(background));
        }
        for (p, s, r, w, color) in strokes {
            surface.stroke_rect(p, s, r, w, Paint::Solid(color));
        }
    }

    /// Sets an instance property. Layout properties invalidate the parent so
    /// siblings are re-allocated; others only the node itself.
    pub fn set_prop(&mut self, key: NodeKey, prop: &str, value: impl Into<PropValue>) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.props.set(prop, value);
        let target = if affects_layout(prop) {
            node.parent.unwrap_or(key)
        } else {
            key
        };
        self.mark_full_rerender(target);
    }

    pub fn set_props(&mut self, key: NodeKey, props: &Props) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.props.extend(props);
        let target = node.parent.unwrap_or(key);
        self.mark_full_rerender(target);
    }

    /// Instance properties under a part selector such as `#icon`.
    pub fn set_sub_prop(&mut self, key: NodeKey, selector: &str, prop: &str, value: impl Into<PropValue>) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.sub_props.entry(SmolStr::new(selector)).or_default().set(prop, value);
        self.mark_full_rerender(key);
    }

    pub fn remove_sub_prop(&mut self, key: NodeKey, selector: &str, prop: &str) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        if let Some(sub) = node.sub_props.get_mut(selector)
            && sub.remove(prop).is_some()
        {
            self.mark_full_rerender(key);
        }
    }

    pub fn set_class(&mut self, key: NodeKey, class: &str) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.class = SmolStr::new(class);
        let target = node.parent.unwrap_or(key);
        self.mark_full_rerender(target);
    }

    pub fn add_css(&mut self, key: NodeKey, selector: &str, props: Props) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.css.push((SmolStr::new(selector), props));
        self.mark_full_rerender(key);
    }

    pub fn set_tooltip(&mut self, key: NodeKey, tooltip: Option<&str>) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.tooltip = tooltip.map(str::to_string);
        }
    }

    pub fn set_min_pref_width(&mut self, key: NodeKey, val: Value) {
        self.set_prop(key, "min-width", val);
        self.set_prop(key, "width", val);
    }

    pub fn set_min_pref_height(&mut self, key: NodeKey, val: Value) {
        self.set_prop(key, "min-height", val);
        self.set_prop(key, "height", val);
    }

    /// Preferred width `val`, growing into any extra room.
    pub fn set_stretch_max_width(&mut self, key: NodeKey, val: Value) {
        self.set_prop(key, "width", val);
        self.set_prop(key, "max-width", Value::px(-1.0));
    }

    pub fn set_stretch_max_height(&mut self, key: NodeKey, val: Value) {
        self.set_prop(key, "height", val);
        self.set_prop(key, "max-height", Value::px(-1.0));
    }

    pub fn set_fixed_width(&mut self, key: NodeKey, val: Value) {
        self.set_prop(key, "width", val);
        self.set_prop(key, "min-width", val);
        self.set_prop(key, "max-width", val);
    }

    pub fn set_fixed_height(&mut self, key: NodeKey, val: Value) {
        self.set_prop(key, "height", val);
        self.set_prop(key, "min-height", val);
        self.set_prop(key, "max-height", val);
    }
}

#[cfg(test)]
mod tests {
    use crate::style::{Props, Value};
    use crate::view::{
        BBox, Button, DrawCommand, Frame, Label, NodeFlags, Paint, RecordingSurface, Viewport, WidgetTree,
    };
    use glam::{IVec2, Vec2};

    fn tree_with_frame(width: f32) -> (WidgetTree, crate::view::NodeKey) {
        let mut tree = WidgetTree::new(RecordingSurface::new(400, 300));
        let root = tree.set_root(Viewport::new(), "root");
        let frame = tree.add_child(root, Frame::row(), "frame");
        tree.set_props(
            frame,
            &Props::new()
                .with("width", Value::px(width))
                .with("padding", Value::px(5.0))
                .with("border-width", Value::ZERO)
                .with("margin", Value::ZERO),
        );
        (tree, frame)
    }

    #[test]
    fn stretch_child_fills_parent_minus_box_space() {
        let (mut tree, frame) = tree_with_frame(200.0);
        let child = tree.add_child(frame, Frame::row(), "child");
        tree.set_stretch_max_width(child, Value::px(50.0));
        tree.render();
        let alloc = tree.node(child).map(|n| n.layout.alloc_size).unwrap_or_default();
        assert_eq!(alloc.x, 190.0);
        assert_eq!(tree.node(frame).map(|n| n.layout.alloc_size.x), Some(200.0));
    }

    #[test]
    fn layout_is_deterministic() {
        let (mut tree, frame) = tree_with_frame(120.0);
        let label = tree.add_child(frame, Label::new("hello"), "label");
        tree.render();
        let first = tree.node(label).map(|n| (n.layout, n.bbox, n.vp_bbox));
        let par_bbox = tree.children_bbox(frame);
        tree.layout_node(label, par_bbox);
        let second = tree.node(label).map(|n| (n.layout, n.bbox, n.vp_bbox));
        assert_eq!(first, second);
    }

    #[test]
    fn move_shifts_subtree_without_resizing() {
        let (mut tree, frame) = tree_with_frame(200.0);
        let label = tree.add_child(frame, Label::new("moved"), "label");
        tree.render();
        let before = tree.node(label).map(|n| n.layout).unwrap_or_default();
        let frame_size = tree.node(frame).map(|n| n.layout.alloc_size);

        let delta = IVec2::new(7, 3);
        let par_bbox = tree.surface().bounds();
        tree.move_node(frame, delta, par_bbox);

        let frame_node = tree.node(frame).map(|n| n.layout).unwrap_or_default();
        assert_eq!(frame_node.alloc_pos, frame_node.alloc_pos_orig + delta.as_vec2());
        assert_eq!(Some(frame_node.alloc_size), frame_size);
        let after = tree.node(label).map(|n| n.layout).unwrap_or_default();
        assert_eq!(after.alloc_pos - before.alloc_pos, Vec2::new(7.0, 3.0));
        assert_eq!(after.alloc_size, before.alloc_size);
        assert_eq!(after.delta(), Vec2::new(7.0, 3.0));
    }

    #[test]
    fn empty_bbox_gets_no_paint_and_no_bindings() {
        let (mut tree, frame) = tree_with_frame(200.0);
        let hidden = tree.add_child(frame, Button::new("hidden"), "hidden");
        tree.set_prop(hidden, "max-width", Value::dot(0.001));
        tree.set_prop(hidden, "background-color", "#ff0000");
        tree.set_tooltip(hidden, Some("tip"));
        tree.render();

        let node = tree.node(hidden).map(|n| n.vp_bbox).unwrap_or(BBox::from_xywh(0, 0, 1, 1));
        assert!(node.is_empty());
        assert_eq!(tree.active_bindings(hidden), 0);
        let surface = tree.surface_as::<RecordingSurface>();
        let painted_text = surface
            .map(|s| {
                s.commands()
                    .iter()
                    .any(|c| matches!(c, DrawCommand::Text { text, .. } if text == "hidden"))
            })
            .unwrap_or(true);
        assert!(!painted_text);
        assert_eq!(surface.map(|s| s.depth()), Some(0));
    }

    #[test]
    fn std_box_draws_background_and_border() {
        let (mut tree, frame) = tree_with_frame(100.0);
        tree.set_prop(frame, "background-color", "#336699");
        tree.set_prop(frame, "border-width", Value::px(2.0));
        tree.set_prop(frame, "border-color", "#000000");
        tree.render();
        let surface = tree.surface_as::<RecordingSurface>();
        let cmds: Vec<DrawCommand> = surface.map(|s| s.paint_commands().cloned().collect()).unwrap_or_default();
        assert!(cmds.iter().any(|c| matches!(c, DrawCommand::Fill { paint: Paint::Solid(_), .. })));
        assert!(cmds.iter().any(|c| matches!(c, DrawCommand::Stroke { width, .. } if *width == 2.0)));
    }

    #[test]
    fn overlay_clips_to_surface_despite_empty_bbox() {
        let (mut tree, frame) = tree_with_frame(200.0);
        let popup = tree.add_child(frame, Frame::column(), "popup");
        tree.set_prop(popup, "max-width", Value::dot(0.001));
        tree.render();
        assert!(tree.node(popup).is_some_and(|n| n.vp_bbox.is_empty()));

        if let Some(node) = tree.node_mut(popup) {
            node.flags.insert(NodeFlags::OVERLAY);
        }
        if let Some(s) = tree.surface_as_mut::<RecordingSurface>() {
            s.clear();
        }
        let full = tree.surface().bounds();
        assert!(tree.push_bounds(popup));
        tree.pop_bounds(popup);
        let cmds = tree.surface_as::<RecordingSurface>().map(|s| s.commands().to_vec());
        assert_eq!(cmds, Some(vec![DrawCommand::PushBounds(full), DrawCommand::PopBounds]));
    }

    #[test]
    fn inactive_follows_resolved_style() {
        let (mut tree, frame) = tree_with_frame(200.0);
        if let Some(t) = tree.registry_mut().get_mut("Frame") {
            t.sub_mut(".off").set("inactive", true);
        }
        tree.set_class(frame, "off");
        tree.render();
        assert!(tree.node(frame).is_some_and(|n| n.is_inactive()));

        tree.set_class(frame, "");
        tree.render();
        assert!(!tree.node(frame).is_some_and(|n| n.is_inactive()));
    }
}
