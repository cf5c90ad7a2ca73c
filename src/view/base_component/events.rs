use super::{NodeFlags, NodeKey, WidgetTree};
use crate::style::{Props, Value};
use crate::ui::{
    EventData, EventHandler, EventKind, EventQueue, EventSource, InputEvent, MouseAction, MouseButton, SignalObserver,
    WidgetSignal,
};
use crate::view::{Frame, Label};
use glam::IVec2;

/// The popup currently shown for a hovered widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TooltipState {
    pub owner: NodeKey,
    pub popup: NodeKey,
}

const TOOLTIP_BG: &str = "#ffffe0";

impl WidgetTree {
    /// Registers `handler` for `kind`, replacing any earlier one. It starts
    /// receiving events once the node is connected to its viewport.
    pub fn connect_event(&mut self, key: NodeKey, kind: EventKind, handler: EventHandler) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.set_handler(kind, handler);
            node.flags.remove(NodeFlags::CONNECTED);
        }
    }

    /// Makes the node's handlers active. Reconnecting moves the node to the
    /// end of each list, so the list follows paint order.
    pub fn connect_to_viewport(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.flags.insert(NodeFlags::CONNECTED);
        for (kind, _) in &node.handlers {
            let keys = self.bindings.entry(*kind).or_default();
            keys.retain(|&k| k != key);
            keys.push(key);
        }
    }

    pub fn is_connected(&self, key: NodeKey) -> bool {
        self.nodes.get(key).is_some_and(|n| n.flags.contains(NodeFlags::CONNECTED))
    }

    pub fn disconnect_all_events(&mut self, key: NodeKey) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.flags.remove(NodeFlags::CONNECTED);
        }
        for keys in self.bindings.values_mut() {
            keys.retain(|&k| k != key);
        }
    }

    /// Drops bindings for the node, its parts and all descendants.
    pub fn disconnect_subtree_events(&mut self, key: NodeKey) {
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            self.disconnect_all_events(k);
            if let Some(node) = self.nodes.get(k) {
                stack.extend(node.parts);
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Number of event kinds the node currently receives.
    pub fn active_bindings(&self, key: NodeKey) -> usize {
        self.bindings.values().filter(|keys| keys.contains(&key)).count()
    }

    /// Delivers one event. Positional events go to connected nodes under the
    /// pointer, topmost first, until one marks the event processed; others go
    /// to the focused node. Returns whether the event was processed.
    pub fn dispatch_event(&mut self, mut event: InputEvent) -> bool {
        let kind = event.kind();
        let Some(pos) = event.pos() else {
            if let Some(focus) = self.focus
                && let Some(handler) = self.nodes.get(focus).and_then(|n| n.handler(kind))
            {
                handler.call(self, focus, &mut event);
            }
            return event.is_processed();
        };

        if matches!(kind, EventKind::MouseMove | EventKind::Hover) {
            self.hover_leave(pos);
        }
        let targets = self.bindings.get(&kind).cloned().unwrap_or_default();
        for key in targets.into_iter().rev() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            if !node.style.pointer_events || node.is_inactive() || !node.win_bbox.contains(pos) {
                continue;
            }
            let Some(handler) = node.handler(kind) else {
                continue;
            };
            if self.config.trace.events {
                log::debug!(target: "trellis::event", "{:?} at {} -> {}", kind, pos, self.path(key));
            }
            handler.call(self, key, &mut event);
            if event.is_processed() {
                break;
            }
        }
        event.is_processed()
    }

    /// Drains the queue on the calling thread. Returns how many events were
    /// processed by some widget.
    pub fn process_events(&mut self, queue: &EventQueue) -> usize {
        queue
            .drain()
            .into_iter()
            .map(|event| self.dispatch_event(event))
            .filter(|&processed| processed)
            .count()
    }

    /// Lets `source` queue what it has received, then processes the queue.
    pub fn pump_events(&mut self, source: &mut dyn EventSource, queue: &EventQueue) -> usize {
        source.pump(&queue.sender());
        self.process_events(queue)
    }

    pub fn focus(&self) -> Option<NodeKey> {
        self.focus
    }

    /// Moves keyboard focus, telling both nodes through their focus handlers.
    pub fn set_focus(&mut self, key: Option<NodeKey>) {
        if self.focus == key {
            return;
        }
        if let Some(old) = self.focus.take() {
            if let Some(node) = self.nodes.get_mut(old) {
                node.flags.remove(NodeFlags::FOCUSED);
            }
            self.send_focus(old, false);
        }
        let Some(new) = key.filter(|k| self.nodes.contains_key(*k)) else {
            return;
        };
        self.focus = Some(new);
        if let Some(node) = self.nodes.get_mut(new) {
            node.flags.insert(NodeFlags::FOCUSED);
        }
        self.send_focus(new, true);
        self.emit_signal(new, WidgetSignal::Focused);
    }

    fn send_focus(&mut self, key: NodeKey, gained: bool) {
        if let Some(handler) = self.nodes.get(key).and_then(|n| n.handler(EventKind::Focus)) {
            let mut event = InputEvent::new(EventData::Focus { gained });
            handler.call(self, key, &mut event);
        }
    }

    pub fn on_signal(&mut self, key: NodeKey, observer: SignalObserver) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.observers.push(observer);
        }
    }

    pub fn set_context_menu(&mut self, key: NodeKey, callback: Option<SignalObserver>) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.context_menu = callback;
        }
    }

    /// Calls every observer of the node in registration order.
    pub fn emit_signal(&mut self, key: NodeKey, signal: WidgetSignal) {
        let observers = self.nodes.get(key).map(|n| n.observers.clone()).unwrap_or_default();
        for observer in observers {
            observer.call(self, key, signal);
        }
    }

    /// Selection changes the style state, so the node is re-rendered.
    pub fn set_selected(&mut self, key: NodeKey, selected: bool) {
        self.set_state_flag(key, NodeFlags::SELECTED, selected);
    }

    /// Hovering selects the `:hover` default, so the node is re-rendered.
    /// At most one node is hovered at a time.
    pub fn set_hovered(&mut self, key: NodeKey, hovered: bool) {
        if hovered {
            if let Some(old) = self.hovered.filter(|&old| old != key) {
                self.set_state_flag(old, NodeFlags::HOVERED, false);
            }
            self.hovered = Some(key);
        } else if self.hovered == Some(key) {
            self.hovered = None;
        }
        self.set_state_flag(key, NodeFlags::HOVERED, hovered);
    }

    pub fn hovered(&self) -> Option<NodeKey> {
        self.hovered
    }

    /// Un-hovers the hovered node and drops the tooltip once the pointer is
    /// outside their owner's window bbox.
    fn hover_leave(&mut self, pos: IVec2) {
        let outside = |tree: &Self, key: NodeKey| tree.nodes.get(key).is_none_or(|n| !n.win_bbox.contains(pos));
        if let Some(key) = self.hovered
            && outside(self, key)
        {
            self.set_hovered(key, false);
        }
        if let Some(tip) = self.tooltip
            && outside(self, tip.owner)
        {
            self.dismiss_tooltip();
        }
    }

    pub fn set_inactive(&mut self, key: NodeKey, inactive: bool) {
        self.set_prop(key, "inactive", inactive);
        self.set_state_flag(key, NodeFlags::INACTIVE, inactive);
    }

    fn set_state_flag(&mut self, key: NodeKey, flag: NodeFlags, on: bool) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        if node.flags.contains(flag) != on {
            node.flags.set(flag, on);
            self.mark_full_rerender(key);
        }
    }

    /// Standard mouse wiring: left press toggles selection, right release
    /// opens the context menu and pointer motion sets the hover state.
    pub fn widget_mouse_events(&mut self, key: NodeKey) {
        let handler = EventHandler::new(|tree, key, event| {
            let EventData::MouseButton { button, action, .. } = event.data else {
                return;
            };
            match (button, action) {
                (MouseButton::Left, MouseAction::Press) => {
                    let selected = tree.node(key).is_some_and(|n| n.is_selected());
                    tree.set_selected(key, !selected);
                    tree.emit_signal(key, WidgetSignal::Selected);
                    event.set_processed();
                }
                (MouseButton::Right, MouseAction::Release) => {
                    tree.emit_signal(key, WidgetSignal::ContextMenu);
                    if let Some(callback) = tree.node(key).and_then(|n| n.context_menu.clone()) {
                        callback.call(tree, key, WidgetSignal::ContextMenu);
                    }
                    event.set_processed();
                }
                _ => {}
            }
        });
        self.connect_event(key, EventKind::MouseButton, handler);

        let enter = EventHandler::new(|tree, key, event| {
            tree.set_hovered(key, true);
            event.set_processed();
        });
        self.connect_event(key, EventKind::MouseMove, enter);
    }

    /// Shows the node's tooltip when hovered, anchored at the lower right of
    /// its window bbox. It goes away when the pointer leaves the node.
    pub fn hover_tooltip_event(&mut self, key: NodeKey) {
        let handler = EventHandler::new(|tree, key, event| {
            let Some(node) = tree.node(key) else {
                return;
            };
            let Some(text) = node.tooltip.clone() else {
                return;
            };
            if tree.tooltip.is_some_and(|t| t.owner == key) {
                event.set_processed();
                return;
            }
            let pos = node.win_bbox.max - IVec2::new(20, 0);
            tree.popup_tooltip(key, &text, pos);
            event.set_processed();
        });
        self.connect_event(key, EventKind::Hover, handler);
    }

    /// Creates an overlay frame holding `text` under the root, kept inside the
    /// root viewport. `pos` is in window coordinates.
    pub fn popup_tooltip(&mut self, owner: NodeKey, text: &str, pos: IVec2) -> Option<NodeKey> {
        self.dismiss_tooltip();
        let root = self.root?;
        let root_size = self.surface_size();
        let font = self.nodes.get(root).map(|n| n.style.unit_ctx.font_size)?;

        let frame = self.insert_node(Some(root), None, Box::new(Frame::column()), "tooltip", false);
        let label = self.insert_node(Some(frame), None, Box::new(Label::new(text)), "text", false);
        let max_width = (40.0 * font).min(root_size.x - 20.0).max(0.0);
        if let Some(node) = self.nodes.get_mut(frame) {
            node.flags.insert(NodeFlags::OVERLAY);
            node.props = Props::new()
                .with("border-width", Value::ZERO)
                .with("border-color", "none")
                .with("margin", Value::ZERO)
                .with("padding", Value::px(2.0))
                .with("box-shadow.h-offset", Value::ZERO)
                .with("box-shadow.v-offset", Value::ZERO);
        }
        if let Some(node) = self.nodes.get_mut(label) {
            node.props = Props::new()
                .with("background-color", TOOLTIP_BG)
                .with("max-width", Value::dot(max_width));
        }

        self.init_tree(frame);
        self.style_tree(frame);
        self.size_tree(frame);
        let size = self.nodes.get(frame).map(|n| n.layout.size.pref)?;

        let local = (pos - self.window_pos()).as_vec2();
        let x = local.x.min(root_size.x - size.x).max(0.0);
        let y = local.y.min(root_size.y - size.y).max(0.0);
        if let Some(node) = self.nodes.get_mut(frame) {
            node.props.set("x", Value::dot(x));
            node.props.set("y", Value::dot(y));
        }
        self.tooltip = Some(TooltipState { owner, popup: frame });
        self.mark_full_rerender(root);
        Some(frame)
    }

    pub fn dismiss_tooltip(&mut self) {
        if let Some(tip) = self.tooltip.take() {
            self.remove(tip.popup);
        }
    }

    pub fn tooltip_popup(&self) -> Option<NodeKey> {
        self.tooltip.map(|t| t.popup)
    }
}

#[cfg(test)]
mod tests {
    use crate::style::{Color, Value};
    use crate::ui::{
        EventHandler, EventKind, EventQueue, EventSender, EventSource, InputEvent, MouseButton, SignalObserver,
        WidgetSignal,
    };
    use crate::view::{Button, Frame, NodeFlags, RecordingSurface, Viewport, WidgetTree};
    use glam::IVec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tree_with_button() -> (WidgetTree, crate::view::NodeKey, crate::view::NodeKey) {
        let mut tree = WidgetTree::new(RecordingSurface::new(300, 200));
        let root = tree.set_root(Viewport::new(), "root");
        let frame = tree.add_child(root, Frame::column(), "frame");
        let button = tree.add_child(frame, Button::new("Ok"), "ok");
        tree.set_fixed_width(button, Value::px(80.0));
        tree.set_fixed_height(button, Value::px(30.0));
        tree.render();
        (tree, frame, button)
    }

    fn center(tree: &WidgetTree, key: crate::view::NodeKey) -> IVec2 {
        tree.node(key)
            .map(|n| (n.win_bbox.min + n.win_bbox.max) / 2)
            .unwrap_or(IVec2::splat(-1))
    }

    #[test]
    fn left_press_toggles_selection_and_signals() {
        let (mut tree, _, button) = tree_with_button();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        tree.on_signal(button, SignalObserver::new(move |_, _, sig| log.borrow_mut().push(sig)));

        let at = center(&tree, button);
        assert!(tree.dispatch_event(InputEvent::mouse_press(at, MouseButton::Left)));
        assert!(tree.node(button).is_some_and(|n| n.is_selected()));
        assert!(tree.node(button).is_some_and(|n| n.needs_full_rerender()));
        assert_eq!(*seen.borrow(), vec![WidgetSignal::Selected]);

        tree.render();
        tree.dispatch_event(InputEvent::mouse_press(at, MouseButton::Left));
        assert!(!tree.node(button).is_some_and(|n| n.is_selected()));
    }

    #[test]
    fn right_release_runs_context_menu_after_signal() {
        let (mut tree, _, button) = tree_with_button();
        let order = Rc::new(RefCell::new(Vec::new()));
        let a = order.clone();
        tree.on_signal(button, SignalObserver::new(move |_, _, _| a.borrow_mut().push("signal")));
        let b = order.clone();
        tree.set_context_menu(button, Some(SignalObserver::new(move |_, _, _| b.borrow_mut().push("menu"))));

        let at = center(&tree, button);
        tree.dispatch_event(InputEvent::mouse_release(at, MouseButton::Right));
        assert_eq!(*order.borrow(), vec!["signal", "menu"]);
    }

    #[test]
    fn events_outside_the_bbox_are_ignored() {
        let (mut tree, _, button) = tree_with_button();
        let queue = EventQueue::new();
        let sender = queue.sender();
        assert!(sender.send(InputEvent::mouse_press(IVec2::new(299, 199), MouseButton::Left)));
        assert!(sender.send(InputEvent::mouse_press(center(&tree, button), MouseButton::Left)));
        assert_eq!(tree.process_events(&queue), 1);
    }

    #[test]
    fn hover_pops_tooltip_inside_root() {
        let (mut tree, _, button) = tree_with_button();
        tree.set_tooltip(button, Some("press to confirm"));
        let at = center(&tree, button);
        assert!(tree.dispatch_event(InputEvent::hover(at)));

        let popup = tree.tooltip_popup();
        assert!(popup.is_some_and(|p| tree.node(p).is_some_and(|n| n.flags.contains(NodeFlags::OVERLAY))));
        tree.render();
        let root = tree.surface().bounds();
        let bbox = popup.and_then(|p| tree.node(p)).map(|n| n.vp_bbox).unwrap_or_default();
        assert!(!bbox.is_empty());
        assert!(bbox.min.x >= root.min.x && bbox.max.x <= root.max.x);
        assert!(bbox.max.y <= root.max.y);

        tree.dismiss_tooltip();
        assert!(popup.is_some_and(|p| !tree.contains(p)));
    }

    #[test]
    fn removing_owner_dismisses_tooltip() {
        let (mut tree, frame, button) = tree_with_button();
        tree.set_tooltip(button, Some("tip"));
        tree.dispatch_event(InputEvent::hover(center(&tree, button)));
        let popup = tree.tooltip_popup();
        assert!(popup.is_some());
        tree.remove(frame);
        assert!(tree.tooltip_popup().is_none());
        assert!(popup.is_some_and(|p| !tree.contains(p)));
    }

    #[test]
    fn focus_moves_flag_and_signals() {
        let (mut tree, frame, button) = tree_with_button();
        let focused = Rc::new(RefCell::new(0));
        let count = focused.clone();
        tree.on_signal(button, SignalObserver::new(move |_, _, sig| {
            if sig == WidgetSignal::Focused {
                *count.borrow_mut() += 1;
            }
        }));
        tree.set_focus(Some(button));
        assert!(tree.node(button).is_some_and(|n| n.flags.contains(NodeFlags::FOCUSED)));
        tree.set_focus(Some(frame));
        assert!(!tree.node(button).is_some_and(|n| n.flags.contains(NodeFlags::FOCUSED)));
        assert_eq!(tree.focus(), Some(frame));
        assert_eq!(*focused.borrow(), 1);
    }

    #[test]
    fn pointer_motion_sets_and_clears_hover() {
        let (mut tree, _, button) = tree_with_button();
        let at = center(&tree, button);
        assert!(tree.dispatch_event(InputEvent::mouse_move(at, IVec2::ZERO)));
        assert_eq!(tree.hovered(), Some(button));
        assert_eq!(tree.node(button).map(|n| n.state_selector()), Some(":hover"));
        tree.render();
        let bg = tree.node(button).map(|n| n.style.font.bg_color);
        assert_eq!(bg, Some(Color::rgb(0xe0, 0xe0, 0xe0)));

        tree.dispatch_event(InputEvent::mouse_move(IVec2::new(299, 199), at));
        assert_eq!(tree.hovered(), None);
        assert!(tree.node(button).is_some_and(|n| !n.flags.contains(NodeFlags::HOVERED)));
        assert!(tree.node(button).is_some_and(|n| n.needs_full_rerender()));
    }

    #[test]
    fn leaving_owner_dismisses_tooltip() {
        let (mut tree, _, button) = tree_with_button();
        tree.set_tooltip(button, Some("tip"));
        let at = center(&tree, button);
        tree.dispatch_event(InputEvent::hover(at));
        let popup = tree.tooltip_popup();
        assert!(popup.is_some());

        tree.dispatch_event(InputEvent::hover(at));
        assert_eq!(tree.tooltip_popup(), popup);

        tree.dispatch_event(InputEvent::mouse_move(IVec2::new(299, 199), at));
        assert!(tree.tooltip_popup().is_none());
        assert!(popup.is_some_and(|p| !tree.contains(p)));
    }

    struct Scripted(Vec<InputEvent>);

    impl EventSource for Scripted {
        fn pump(&mut self, sender: &EventSender) {
            for event in self.0.drain(..) {
                sender.send(event);
            }
        }
    }

    #[test]
    fn pump_delivers_what_the_source_queued() {
        let (mut tree, _, button) = tree_with_button();
        let queue = EventQueue::new();
        let mut source = Scripted(vec![InputEvent::mouse_press(center(&tree, button), MouseButton::Left)]);
        assert_eq!(tree.pump_events(&mut source, &queue), 1);
        assert!(tree.node(button).is_some_and(|n| n.is_selected()));
        assert_eq!(tree.pump_events(&mut source, &queue), 0);
    }

    #[test]
    fn new_handler_is_bound_on_next_paint() {
        let (mut tree, _, button) = tree_with_button();
        assert!(tree.is_connected(button));
        let before = tree.active_bindings(button);
        tree.connect_event(button, EventKind::Scroll, EventHandler::new(|_, _, event| event.set_processed()));
        assert!(!tree.is_connected(button));
        assert_eq!(tree.active_bindings(button), before);
        tree.render();
        assert!(tree.is_connected(button));
        assert_eq!(tree.active_bindings(button), before + 1);
    }
}
