use crate::view::{NodeKey, WidgetTree};
use glam::{IVec2, Vec2};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Press,
    Release,
    DoubleClick,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

/// Payload of an input event. Positions are in window coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    MouseButton {
        pos: IVec2,
        button: MouseButton,
        action: MouseAction,
        modifiers: KeyModifiers,
    },
    MouseMove {
        pos: IVec2,
        from: IVec2,
    },
    Hover {
        pos: IVec2,
    },
    Scroll {
        pos: IVec2,
        delta: Vec2,
    },
    Key {
        key: SmolStr,
        pressed: bool,
        modifiers: KeyModifiers,
    },
    Focus {
        gained: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseButton,
    MouseMove,
    Hover,
    Scroll,
    Key,
    Focus,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::MouseButton,
        EventKind::MouseMove,
        EventKind::Hover,
        EventKind::Scroll,
        EventKind::Key,
        EventKind::Focus,
    ];

    /// Positional kinds are delivered by hit-testing the window bbox.
    pub fn is_positional(self) -> bool {
        matches!(
            self,
            EventKind::MouseButton | EventKind::MouseMove | EventKind::Hover | EventKind::Scroll
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub data: EventData,
    processed: bool,
}

impl InputEvent {
    pub fn new(data: EventData) -> Self {
        Self {
            data,
            processed: false,
        }
    }

    pub fn mouse_press(pos: IVec2, button: MouseButton) -> Self {
        Self::new(EventData::MouseButton {
            pos,
            button,
            action: MouseAction::Press,
            modifiers: KeyModifiers::default(),
        })
    }

    pub fn mouse_release(pos: IVec2, button: MouseButton) -> Self {
        Self::new(EventData::MouseButton {
            pos,
            button,
            action: MouseAction::Release,
            modifiers: KeyModifiers::default(),
        })
    }

    pub fn mouse_move(pos: IVec2, from: IVec2) -> Self {
        Self::new(EventData::MouseMove { pos, from })
    }

    pub fn hover(pos: IVec2) -> Self {
        Self::new(EventData::Hover { pos })
    }

    pub fn kind(&self) -> EventKind {
        match self.data {
            EventData::MouseButton { .. } => EventKind::MouseButton,
            EventData::MouseMove { .. } => EventKind::MouseMove,
            EventData::Hover { .. } => EventKind::Hover,
            EventData::Scroll { .. } => EventKind::Scroll,
            EventData::Key { .. } => EventKind::Key,
            EventData::Focus { .. } => EventKind::Focus,
        }
    }

    pub fn pos(&self) -> Option<IVec2> {
        match self.data {
            EventData::MouseButton { pos, .. }
            | EventData::MouseMove { pos, .. }
            | EventData::Hover { pos }
            | EventData::Scroll { pos, .. } => Some(pos),
            EventData::Key { .. } | EventData::Focus { .. } => None,
        }
    }

    pub fn set_processed(&mut self) {
        self.processed = true;
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }
}

/// Sending half of the event queue; cheap to clone and usable from any thread.
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::Sender<InputEvent>);

impl EventSender {
    /// Returns false once the queue has been dropped.
    pub fn send(&self, event: InputEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

/// Serializes events from the windowing layer onto the main thread.
#[derive(Debug)]
pub struct EventQueue {
    tx: mpsc::Sender<InputEvent>,
    rx: mpsc::Receiver<InputEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender(self.tx.clone())
    }

    /// Everything queued so far, in arrival order.
    pub fn drain(&self) -> Vec<InputEvent> {
        self.rx.try_iter().collect()
    }
}

/// The windowing collaborator: pushes whatever it has received into the queue.
pub trait EventSource {
    fn pump(&mut self, sender: &EventSender);
}

/// Signals every widget can emit to its observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetSignal {
    /// A left press; reported whether or not the selection actually changed.
    Selected,
    Focused,
    /// Right release, emitted before the context-menu callback runs.
    ContextMenu,
}

fn next_handler_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

type HandlerFn = dyn FnMut(&mut WidgetTree, NodeKey, &mut InputEvent);
type ObserverFn = dyn FnMut(&mut WidgetTree, NodeKey, WidgetSignal);

#[derive(Clone)]
pub struct EventHandler {
    id: u64,
    handler: Rc<RefCell<HandlerFn>>,
}

impl EventHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&mut WidgetTree, NodeKey, &mut InputEvent) + 'static,
    {
        Self {
            id: next_handler_id(),
            handler: Rc::new(RefCell::new(handler)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Skips the call if this handler is already running further up the stack.
    pub fn call(&self, tree: &mut WidgetTree, key: NodeKey, event: &mut InputEvent) {
        if let Ok(mut handler) = self.handler.try_borrow_mut() {
            (handler)(tree, key, event);
        }
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler").field("id", &self.id).finish()
    }
}

#[derive(Clone)]
pub struct SignalObserver {
    id: u64,
    observer: Rc<RefCell<ObserverFn>>,
}

impl SignalObserver {
    pub fn new<F>(observer: F) -> Self
    where
        F: FnMut(&mut WidgetTree, NodeKey, WidgetSignal) + 'static,
    {
        Self {
            id: next_handler_id(),
            observer: Rc::new(RefCell::new(observer)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn call(&self, tree: &mut WidgetTree, key: NodeKey, signal: WidgetSignal) {
        if let Ok(mut observer) = self.observer.try_borrow_mut() {
            (observer)(tree, key, signal);
        }
    }
}

impl PartialEq for SignalObserver {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for SignalObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalObserver").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_preserves_order_across_threads() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        std::thread::spawn(move || {
            for x in 0..3 {
                sender.send(InputEvent::hover(IVec2::new(x, 0)));
            }
        })
        .join()
        .expect("sender thread");
        let xs: Vec<i32> = queue
            .drain()
            .iter()
            .filter_map(|e| e.pos().map(|p| p.x))
            .collect();
        assert_eq!(xs, vec![0, 1, 2]);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn kinds_and_positions() {
        let press = InputEvent::mouse_press(IVec2::new(3, 4), MouseButton::Left);
        assert_eq!(press.kind(), EventKind::MouseButton);
        assert!(press.kind().is_positional());
        let key = InputEvent::new(EventData::Key {
            key: SmolStr::new("a"),
            pressed: true,
            modifiers: KeyModifiers::default(),
        });
        assert_eq!(key.pos(), None);
        assert!(!key.kind().is_positional());
    }
}
