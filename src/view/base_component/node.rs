use super::{BBox, LayoutData, NodeKey};
use crate::style::{ComputedStyle, Props, StyleSheet};
use crate::ui::{EventHandler, EventKind, SignalObserver};
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::rc::Rc;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u16 {
        /// Subtree must run init, style, size, layout and render again before painting.
        const FULL_RERENDER = 1 << 0;
        const SELECTED = 1 << 1;
        /// Mirrors the resolved `inactive` style property.
        const INACTIVE = 1 << 2;
        /// Floats above normal layout and clips to the whole surface.
        const OVERLAY = 1 << 3;
        /// Root of a render surface; descendants bind to the nearest one.
        const VIEWPORT = 1 << 4;
        /// Root of a widget's parts tree; positioned by its owner.
        const PART_ROOT = 1 << 5;
        const HOVERED = 1 << 6;
        const FOCUSED = 1 << 7;
        /// Handlers are in the tree's binding lists.
        const CONNECTED = 1 << 8;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initialized,
    Styled,
    Sized,
    LaidOut,
    Rendered,
}

/// The data half of a tree node. Behaviour lives in the node's [`super::Widget`].
#[derive(Debug)]
pub struct WidgetNode {
    pub name: SmolStr,
    pub type_name: &'static str,
    /// Whitespace-separated class list.
    pub class: SmolStr,
    pub tooltip: Option<String>,
    pub props: Props,
    /// Selector-scoped instance maps such as `#icon`, read by the owner when
    /// it styles its parts.
    pub sub_props: FxHashMap<SmolStr, Props>,
    pub css: StyleSheet,
    pub style: ComputedStyle,
    pub layout: LayoutData,
    /// Allocation rectangle in surface coordinates.
    pub bbox: BBox,
    /// `bbox` shifted by the current move delta.
    pub obj_bbox: BBox,
    /// `obj_bbox` clipped by the parent; empty means nothing is drawn.
    pub vp_bbox: BBox,
    /// `vp_bbox` in window coordinates, used for hit-testing.
    pub win_bbox: BBox,
    pub flags: NodeFlags,
    pub state: LifecycleState,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) parts: Option<NodeKey>,
    pub(crate) viewport: Option<NodeKey>,
    pub(crate) def_style: Option<Rc<ComputedStyle>>,
    pub(crate) handlers: Vec<(EventKind, EventHandler)>,
    pub(crate) observers: Vec<SignalObserver>,
    pub(crate) context_menu: Option<SignalObserver>,
}

impl WidgetNode {
    pub fn new(type_name: &'static str, name: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            type_name,
            class: SmolStr::default(),
            tooltip: None,
            props: Props::new(),
            sub_props: FxHashMap::default(),
            css: StyleSheet::new(),
            style: ComputedStyle::default(),
            layout: LayoutData::default(),
            bbox: BBox::ZERO,
            obj_bbox: BBox::ZERO,
            vp_bbox: BBox::ZERO,
            win_bbox: BBox::ZERO,
            flags: NodeFlags::empty(),
            state: LifecycleState::Uninitialized,
            parent: None,
            children: Vec::new(),
            parts: None,
            viewport: None,
            def_style: None,
            handlers: Vec::new(),
            observers: Vec::new(),
            context_menu: None,
        }
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn parts(&self) -> Option<NodeKey> {
        self.parts
    }

    /// Init has bound this node to a render surface.
    pub fn is_bound(&self) -> bool {
        self.viewport.is_some()
    }

    pub fn needs_full_rerender(&self) -> bool {
        self.flags.contains(NodeFlags::FULL_RERENDER)
    }

    pub fn is_selected(&self) -> bool {
        self.flags.contains(NodeFlags::SELECTED)
    }

    pub fn is_inactive(&self) -> bool {
        self.flags.contains(NodeFlags::INACTIVE)
    }

    pub fn is_overlay(&self) -> bool {
        self.flags.contains(NodeFlags::OVERLAY)
    }

    /// Pseudo-state selector used to pick the cached type default.
    pub fn state_selector(&self) -> &'static str {
        if self.flags.contains(NodeFlags::INACTIVE) {
            ":inactive"
        } else if self.flags.contains(NodeFlags::SELECTED) {
            ":selected"
        } else if self.flags.contains(NodeFlags::HOVERED) {
            ":hover"
        } else {
            ""
        }
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.iter().any(|(k, _)| *k == kind)
    }

    pub(crate) fn handler(&self, kind: EventKind) -> Option<EventHandler> {
        self.handlers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, h)| h.clone())
    }

    /// One handler per kind; a new registration replaces the old one.
    pub(crate) fn set_handler(&mut self, kind: EventKind, handler: EventHandler) {
        if let Some(slot) = self.handlers.iter_mut().find(|(k, _)| *k == kind) {
            slot.1 = handler;
        } else {
            self.handlers.push((kind, handler));
        }
    }
}
