use super::events::TooltipState;
use super::{BBox, LifecycleState, NodeFlags, Widget, WidgetNode};
use crate::config::TreeConfig;
use crate::style::{StyleCache, StyleResolver, TypeRegistry};
use crate::ui::EventKind;
use crate::view::RenderSurface;
use crate::view::components::builtin_registry;
use glam::{IVec2, Vec2};
use rustc_hash::FxHashMap;
use slotmap::{SecondaryMap, SlotMap, new_key_type};

new_key_type! {
    pub struct NodeKey;
}

/// Arena of widget nodes plus the per-session context every pass needs: the
/// style resolver, the render surface and the active event bindings.
pub struct WidgetTree {
    pub(super) nodes: SlotMap<NodeKey, WidgetNode>,
    widgets: SecondaryMap<NodeKey, Box<dyn Widget>>,
    pub(super) root: Option<NodeKey>,
    pub(crate) resolver: StyleResolver,
    pub(crate) config: TreeConfig,
    pub(super) surface: Box<dyn RenderSurface>,
    pub(crate) bindings: FxHashMap<EventKind, Vec<NodeKey>>,
    pub(crate) focus: Option<NodeKey>,
    pub(crate) tooltip: Option<TooltipState>,
    pub(crate) hovered: Option<NodeKey>,
    window_pos: IVec2,
}

impl WidgetTree {
    pub fn new(surface: impl RenderSurface) -> Self {
        Self::with_config(Box::new(surface), TreeConfig::default())
    }

    pub fn with_config(surface: Box<dyn RenderSurface>, config: TreeConfig) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            widgets: SecondaryMap::new(),
            root: None,
            resolver: StyleResolver::new(builtin_registry(), config.rebuild_default_styles),
            config,
            surface,
            bindings: FxHashMap::default(),
            focus: None,
            tooltip: None,
            hovered: None,
            window_pos: IVec2::ZERO,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.resolver.registry
    }

    pub fn style_cache(&self) -> &StyleCache {
        &self.resolver.cache
    }

    pub fn set_rebuild_default_styles(&mut self, rebuild: bool) {
        self.config.rebuild_default_styles = rebuild;
        self.resolver.cache.rebuild_defaults = rebuild;
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn RenderSurface {
        self.surface.as_mut()
    }

    pub fn surface_as<T: RenderSurface>(&self) -> Option<&T> {
        self.surface.as_any().downcast_ref::<T>()
    }

    pub fn surface_as_mut<T: RenderSurface>(&mut self) -> Option<&mut T> {
        self.surface.as_any_mut().downcast_mut::<T>()
    }

    pub fn surface_size(&self) -> Vec2 {
        self.surface.size().as_vec2()
    }

    /// Offset of the surface inside the window; window bboxes include it.
    pub fn window_pos(&self) -> IVec2 {
        self.window_pos
    }

    pub fn set_window_pos(&mut self, pos: IVec2) {
        self.window_pos = pos;
        if let Some(root) = self.root {
            self.mark_full_rerender(root);
        }
    }

    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    /// Replaces the whole tree with a new root.
    pub fn set_root(&mut self, widget: impl Widget, name: &str) -> NodeKey {
        if let Some(old) = self.root.take() {
            self.remove(old);
        }
        let key = self.insert_node(None, None, Box::new(widget), name, false);
        if let Some(node) = self.nodes.get_mut(key) {
            node.flags.insert(NodeFlags::FULL_RERENDER);
        }
        self.root = Some(key);
        key
    }

    pub fn add_child(&mut self, parent: NodeKey, widget: impl Widget, name: &str) -> NodeKey {
        self.insert_node(Some(parent), None, Box::new(widget), name, true)
    }

    pub fn insert_child(&mut self, parent: NodeKey, index: usize, widget: impl Widget, name: &str) -> NodeKey {
        self.insert_node(Some(parent), Some(index), Box::new(widget), name, true)
    }

    pub(crate) fn insert_node(
        &mut self,
        parent: Option<NodeKey>,
        index: Option<usize>,
        widget: Box<dyn Widget>,
        name: &str,
        mark_parent: bool,
    ) -> NodeKey {
        let mut node = WidgetNode::new(widget.type_name(), name);
        node.parent = parent.filter(|p| self.nodes.contains_key(*p));
        let key = self.nodes.insert(node);
        self.widgets.insert(key, widget);
        if let Some(parent) = parent
            && let Some(p) = self.nodes.get_mut(parent)
        {
            let at = index.unwrap_or(p.children.len()).min(p.children.len());
            p.children.insert(at, key);
            if mark_parent {
                p.flags.insert(NodeFlags::FULL_RERENDER);
            }
        }
        key
    }

    /// Removes `key` with its children and parts, and marks the parent for a
    /// full re-render.
    pub fn remove(&mut self, key: NodeKey) {
        let Some(parent) = self.nodes.get(key).map(|n| n.parent) else {
            return;
        };
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            p.children.retain(|&c| c != key);
            if p.parts == Some(key) {
                p.parts = None;
            }
            p.flags.insert(NodeFlags::FULL_RERENDER);
        }
        if self.root == Some(key) {
            self.root = None;
        }
        self.destroy_subtree(key);
        if let Some(tip) = self.tooltip
            && !self.nodes.contains_key(tip.owner)
        {
            self.dismiss_tooltip();
        }
    }

    fn destroy_subtree(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.remove(key) else {
            return;
        };
        self.widgets.remove(key);
        for keys in self.bindings.values_mut() {
            keys.retain(|&k| k != key);
        }
        if self.focus == Some(key) {
            self.focus = None;
        }
        if self.hovered == Some(key) {
            self.hovered = None;
        }
        if self.tooltip.is_some_and(|t| t.popup == key) {
            self.tooltip = None;
        }
        for child in node.parts.into_iter().chain(node.children) {
            self.destroy_subtree(child);
        }
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, key: NodeKey) -> Option<&WidgetNode> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut WidgetNode> {
        self.nodes.get_mut(key)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|n| n.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_by_name(&self, key: NodeKey, name: &str) -> Option<NodeKey> {
        self.children(key)
            .iter()
            .copied()
            .find(|&c| self.nodes.get(c).is_some_and(|n| n.name == name))
    }

    pub fn widget<T: Widget>(&self, key: NodeKey) -> Option<&T> {
        self.widgets.get(key).and_then(|w| w.as_any().downcast_ref::<T>())
    }

    pub fn widget_mut<T: Widget>(&mut self, key: NodeKey) -> Option<&mut T> {
        self.widgets
            .get_mut(key)
            .and_then(|w| w.as_any_mut().downcast_mut::<T>())
    }

    /// `/root/frame/label` style path, for traces.
    pub fn path(&self, key: NodeKey) -> String {
        let mut names = Vec::new();
        let mut cur = Some(key);
        while let Some(k) = cur {
            let Some(node) = self.nodes.get(k) else {
                break;
            };
            names.push(node.name.as_str());
            cur = node.parent;
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Runs `f` with the node's widget taken out of the tree so it can mutate
    /// the tree freely. The widget is put back unless `f` removed the node.
    pub(crate) fn with_widget<R>(
        &mut self,
        key: NodeKey,
        f: impl FnOnce(&mut dyn Widget, &mut WidgetTree) -> R,
    ) -> Option<R> {
        let mut widget = self.widgets.remove(key)?;
        let out = f(widget.as_mut(), self);
        if self.nodes.contains_key(key) {
            self.widgets.insert(key, widget);
        }
        Some(out)
    }

    fn subtree_order(&self, key: NodeKey) -> Vec<NodeKey> {
        self.nodes
            .get(key)
            .map(|n| n.parts.into_iter().chain(n.children.iter().copied()).collect())
            .unwrap_or_default()
    }

    pub fn init_node(&mut self, key: NodeKey) {
        self.with_widget(key, |w, tree| w.init(tree, key));
    }

    /// Runs init first when the node is not bound to a surface yet.
    pub fn style_node(&mut self, key: NodeKey) {
        if self.nodes.get(key).is_some_and(|n| !n.is_bound()) {
            self.init_node(key);
        }
        self.with_widget(key, |w, tree| w.style(tree, key));
    }

    pub fn size_node(&mut self, key: NodeKey) {
        self.with_widget(key, |w, tree| w.size(tree, key));
        if let Some(node) = self.nodes.get_mut(key) {
            node.layout.update_sizes();
            node.state = LifecycleState::Sized;
        }
    }

    /// Runs init and style first when the node is not bound to a surface yet.
    pub fn layout_node(&mut self, key: NodeKey, par_bbox: BBox) {
        if self.nodes.get(key).is_some_and(|n| !n.is_bound()) {
            self.init_node(key);
            self.style_node(key);
        }
        self.with_widget(key, |w, tree| w.layout(tree, key, par_bbox));
        if let Some(node) = self.nodes.get_mut(key) {
            node.state = LifecycleState::LaidOut;
        }
    }

    /// Paints the node, or re-runs every pass over its subtree first when it
    /// is marked for a full re-render.
    pub fn render_node(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        if node.needs_full_rerender() {
            if self.config.trace.render {
                log::debug!(target: "trellis::render", "{}: full re-render at {:?}", self.path(key), node.vp_bbox);
            }
            self.re_render_tree(key);
            return;
        }
        self.with_widget(key, |w, tree| w.render(tree, key));
    }

    pub fn move_node(&mut self, key: NodeKey, delta: IVec2, par_bbox: BBox) {
        self.with_widget(key, |w, tree| w.move_by(tree, key, delta, par_bbox));
    }

    /// Pre-order init of `key`, its parts and children.
    pub fn init_tree(&mut self, key: NodeKey) {
        self.init_node(key);
        for child in self.subtree_order(key) {
            self.init_tree(child);
        }
    }

    /// Pre-order; parts created while styling a node are styled in the same walk.
    pub fn style_tree(&mut self, key: NodeKey) {
        self.style_node(key);
        for child in self.subtree_order(key) {
            self.style_tree(child);
        }
    }

    /// Post-order, so containers see their children's sizes.
    pub fn size_tree(&mut self, key: NodeKey) {
        for child in self.subtree_order(key) {
            self.size_tree(child);
        }
        self.size_node(key);
    }

    /// Lays out `key` inside its parent's content area (the whole surface for
    /// the root); each widget recurses into its own children.
    pub fn layout_tree(&mut self, key: NodeKey) {
        let par_bbox = match self.parent(key) {
            Some(parent) => self.children_bbox(parent),
            None => self.surface.bounds(),
        };
        self.layout_node(key, par_bbox);
    }

    pub fn render_tree(&mut self, key: NodeKey) {
        self.render_node(key);
    }

    /// Re-applies the current move delta of `key` to its whole subtree.
    pub fn move_tree(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let delta = node.layout.delta().as_ivec2();
        let par_bbox = match node.parent {
            Some(p) => self.children_bbox(p),
            None => self.surface.bounds(),
        };
        self.move_node(key, delta, par_bbox);
    }

    pub fn layout_children(&mut self, key: NodeKey) {
        let par_bbox = self.children_bbox(key);
        for child in self.children(key).to_vec() {
            if self.nodes.get(child).is_some_and(|n| n.style.is_displayed()) {
                self.layout_node(child, par_bbox);
            }
        }
    }

    /// Children paint in list order, so later children draw on top.
    pub fn render_children(&mut self, key: NodeKey) {
        for child in self.children(key).to_vec() {
            self.render_node(child);
        }
    }

    pub fn move_children(&mut self, key: NodeKey, delta: IVec2) {
        let par_bbox = self.children_bbox(key);
        for child in self.children(key).to_vec() {
            self.move_node(child, delta, par_bbox);
        }
    }

    /// Complete pass over the tree: anything marked dirty is rebuilt and the
    /// whole tree is painted.
    pub fn render(&mut self) {
        if let Some(root) = self.root {
            self.render_node(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::view::{Frame, Label, LifecycleState, NodeFlags, RecordingSurface, Viewport, WidgetTree};
    use glam::{IVec2, Vec2};

    #[test]
    fn remove_cascades_and_marks_parent() {
        let mut tree = WidgetTree::new(RecordingSurface::new(100, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let frame = tree.add_child(root, Frame::column(), "frame");
        let label = tree.add_child(frame, Label::new("hi"), "label");
        tree.render();
        assert!(!tree.node(root).is_some_and(|n| n.needs_full_rerender()));

        tree.remove(frame);
        assert!(!tree.contains(frame));
        assert!(!tree.contains(label));
        assert!(tree.children(root).is_empty());
        assert!(tree.node(root).is_some_and(|n| n.flags.contains(NodeFlags::FULL_RERENDER)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn insert_child_keeps_order() {
        let mut tree = WidgetTree::new(RecordingSurface::new(100, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let a = tree.add_child(root, Label::new("a"), "a");
        let c = tree.add_child(root, Label::new("c"), "c");
        let b = tree.insert_child(root, 1, Label::new("b"), "b");
        assert_eq!(tree.children(root), &[a, b, c]);
        assert_eq!(tree.child_by_name(root, "c"), Some(c));
        assert_eq!(tree.path(b), "/root/b");
    }

    #[test]
    fn unbound_node_heals_before_style_and_layout() {
        let mut tree = WidgetTree::new(RecordingSurface::new(100, 100));
        let root = tree.set_root(Viewport::new(), "root");
        tree.render();

        let styled = tree.add_child(root, Label::new("late"), "late");
        assert!(!tree.node(styled).is_some_and(|n| n.is_bound()));
        tree.style_node(styled);
        let node = tree.node(styled);
        assert!(node.is_some_and(|n| n.is_bound() && n.style.resolved));
        assert_eq!(node.map(|n| n.state), Some(LifecycleState::Styled));

        let laid_out = tree.add_child(root, Label::new("later"), "later");
        let bounds = tree.surface().bounds();
        tree.layout_node(laid_out, bounds);
        let node = tree.node(laid_out);
        assert!(node.is_some_and(|n| n.is_bound() && n.style.resolved));
        assert_eq!(node.map(|n| n.state), Some(LifecycleState::LaidOut));
    }

    #[test]
    fn move_tree_reapplies_current_delta() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 200));
        let root = tree.set_root(Viewport::new(), "root");
        let frame = tree.add_child(root, Frame::column(), "frame");
        let label = tree.add_child(frame, Label::new("x"), "label");
        tree.render();
        let label_orig = tree.node(label).map(|n| n.layout.alloc_pos).unwrap_or_default();

        let bounds = tree.surface().bounds();
        tree.move_node(frame, IVec2::new(5, 4), bounds);
        tree.move_tree(frame);
        let frame_layout = tree.node(frame).map(|n| n.layout).unwrap_or_default();
        assert_eq!(frame_layout.delta(), Vec2::new(5.0, 4.0));
        let label_pos = tree.node(label).map(|n| n.layout.alloc_pos).unwrap_or_default();
        assert_eq!(label_pos - label_orig, Vec2::new(5.0, 4.0));

        tree.move_tree(root);
        assert_eq!(tree.node(frame).map(|n| n.layout.delta()), Some(Vec2::ZERO));
        assert_eq!(tree.node(label).map(|n| n.layout.alloc_pos), Some(label_orig));
    }
}
