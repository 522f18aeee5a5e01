//! Game window notifications and the observer list that delivers them

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Timing information passed with update and render notifications
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameEventArgs {
    /// Seconds elapsed since the previous notification of the same kind
    pub time: f64,
}

impl FrameEventArgs {
    /// Create frame arguments with the given elapsed time in seconds
    pub fn new(time: f64) -> Self {
        Self { time }
    }
}

/// Notifications emitted by a game window
#[derive(Clone, Debug, PartialEq)]
pub enum GameWindowEvent {
    /// The window is about to start running; graphics resources exist
    Load,
    /// The window stopped running; graphics resources were released
    Unload,
    /// Time to advance game state
    UpdateFrame(FrameEventArgs),
    /// Time to draw a frame
    RenderFrame(FrameEventArgs),
    /// The drawable size changed
    Resize,
    /// The window was closed
    Closed,
    /// The window was disposed
    Disposed,
    /// The title changed
    TitleChanged,
    /// Visibility changed
    VisibleChanged,
    /// Fullscreen/normal state changed
    WindowStateChanged,
    /// The window moved
    Move,
    /// Focus was gained or lost
    FocusedChanged,
    /// The border style changed
    WindowBorderChanged,
    /// A character was typed
    KeyPress(char),
}

impl GameWindowEvent {
    /// The kind used to route this event to subscribers
    pub fn kind(&self) -> EventKind {
        match self {
            GameWindowEvent::Load => EventKind::Load,
            GameWindowEvent::Unload => EventKind::Unload,
            GameWindowEvent::UpdateFrame(_) => EventKind::UpdateFrame,
            GameWindowEvent::RenderFrame(_) => EventKind::RenderFrame,
            GameWindowEvent::Resize => EventKind::Resize,
            GameWindowEvent::Closed => EventKind::Closed,
            GameWindowEvent::Disposed => EventKind::Disposed,
            GameWindowEvent::TitleChanged => EventKind::TitleChanged,
            GameWindowEvent::VisibleChanged => EventKind::VisibleChanged,
            GameWindowEvent::WindowStateChanged => EventKind::WindowStateChanged,
            GameWindowEvent::Move => EventKind::Move,
            GameWindowEvent::FocusedChanged => EventKind::FocusedChanged,
            GameWindowEvent::WindowBorderChanged => EventKind::WindowBorderChanged,
            GameWindowEvent::KeyPress(_) => EventKind::KeyPress,
        }
    }

    /// Frame timing carried by update and render notifications
    pub fn frame_args(&self) -> Option<FrameEventArgs> {
        match self {
            GameWindowEvent::UpdateFrame(args) | GameWindowEvent::RenderFrame(args) => Some(*args),
            _ => None,
        }
    }
}

/// Event kinds that can be subscribed to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Load,
    Unload,
    UpdateFrame,
    RenderFrame,
    Resize,
    Closed,
    Disposed,
    TitleChanged,
    VisibleChanged,
    WindowStateChanged,
    Move,
    FocusedChanged,
    WindowBorderChanged,
    KeyPress,
}

/// Handle returned by [`EventDispatcher::subscribe`], used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Event handler callback
pub type EventHandler = Rc<dyn Fn(&GameWindowEvent)>;

/// Ordered multicast observer list
///
/// Handlers run in subscription order. The list is snapshotted before
/// dispatch, so a handler may subscribe, unsubscribe, or emit further events
/// without invalidating the iteration. Changes made during dispatch take
/// effect from the next emit.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RefCell<Vec<(SubscriptionId, EventKind, EventHandler)>>,
    next_id: Cell<u64>,
}

impl EventDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, kind, handler));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(handler_id, _, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Number of handlers registered for `kind`
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers
            .borrow()
            .iter()
            .filter(|(_, handler_kind, _)| *handler_kind == kind)
            .count()
    }

    /// Deliver an event to every handler registered for its kind
    pub fn emit(&self, event: &GameWindowEvent) {
        let kind = event.kind();
        let snapshot: Vec<EventHandler> = self
            .handlers
            .borrow()
            .iter()
            .filter(|(_, handler_kind, _)| *handler_kind == kind)
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect();

        for handler in snapshot {
            handler(event);
        }
    }

    /// Drop every handler
    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&'static str) -> EventHandler) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_for_handlers = Rc::clone(&log);
        let make = move |name: &'static str| -> EventHandler {
            let log = Rc::clone(&log_for_handlers);
            Rc::new(move |event: &GameWindowEvent| {
                log.borrow_mut().push(format!("{name}:{:?}", event.kind()));
            })
        };
        (log, make)
    }

    #[test]
    fn test_emit_routes_by_kind_in_order() {
        let dispatcher = EventDispatcher::new();
        let (log, make) = recorder();

        dispatcher.subscribe(EventKind::Load, make("a"));
        dispatcher.subscribe(EventKind::Unload, make("b"));
        dispatcher.subscribe(EventKind::Load, make("c"));

        dispatcher.emit(&GameWindowEvent::Load);
        assert_eq!(*log.borrow(), vec!["a:Load", "c:Load"]);
    }

    #[test]
    fn test_unsubscribe() {
        let dispatcher = EventDispatcher::new();
        let (log, make) = recorder();

        let id = dispatcher.subscribe(EventKind::Resize, make("a"));
        assert_eq!(dispatcher.handler_count(EventKind::Resize), 1);
        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));

        dispatcher.emit(&GameWindowEvent::Resize);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_handler_may_subscribe_during_emit() {
        let dispatcher = Rc::new(EventDispatcher::new());
        let hits = Rc::new(Cell::new(0));

        let inner = Rc::clone(&dispatcher);
        let inner_hits = Rc::clone(&hits);
        dispatcher.subscribe(
            EventKind::Closed,
            Rc::new(move |_| {
                let hits = Rc::clone(&inner_hits);
                inner.subscribe(EventKind::Closed, Rc::new(move |_| hits.set(hits.get() + 1)));
            }),
        );

        dispatcher.emit(&GameWindowEvent::Closed);
        assert_eq!(hits.get(), 0);
        dispatcher.emit(&GameWindowEvent::Closed);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_frame_args() {
        let event = GameWindowEvent::UpdateFrame(FrameEventArgs::new(0.5));
        assert_eq!(event.kind(), EventKind::UpdateFrame);
        assert_eq!(event.frame_args(), Some(FrameEventArgs::new(0.5)));
        assert_eq!(GameWindowEvent::Load.frame_args(), None);
    }
}
