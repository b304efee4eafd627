//! Typed notifications and the observer registry
//!
//! Listeners are plain closures. The bus is shared as `Rc<EventBus>` so
//! pending commit deliveries can still report after the orchestrator has
//! moved on to the next fragment.

use serde::Serialize;
use std::cell::{Cell, RefCell};

use super::mode::CaptureMode;
use crate::diagnostics::CaptureError;
use crate::models::{Fragment, FragmentMetadata, MusicalElement};
use crate::shortcuts::{EngineState, MappingCategory, ModifierChange};

/// Every observable change
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CaptureEvent {
    #[serde(rename_all = "camelCase")]
    NoteAdded {
        element: MusicalElement,
        index: usize,
        metadata: FragmentMetadata,
    },
    #[serde(rename_all = "camelCase")]
    ElementDeleted {
        element: MusicalElement,
        metadata: FragmentMetadata,
    },
    #[serde(rename_all = "camelCase")]
    FragmentCleared { fragment_id: String },
    FragmentCommitted { fragment: Fragment },
    ModeChanged {
        previous: CaptureMode,
        current: CaptureMode,
    },
    ModifierChanged {
        change: ModifierChange,
        state: EngineState,
    },
    Error(CaptureError),
    KeyMappingChanged {
        category: Option<MappingCategory>,
        key: Option<String>,
    },
    PreviewUpdated { fragment: Fragment },
    #[serde(rename_all = "camelCase")]
    HistoryChanged { can_undo: bool, can_redo: bool },
}

/// Event names, for filtered subscriptions
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    NoteAdded,
    ElementDeleted,
    FragmentCleared,
    FragmentCommitted,
    ModeChanged,
    ModifierChanged,
    Error,
    KeyMappingChanged,
    PreviewUpdated,
    HistoryChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::NoteAdded,
        EventKind::ElementDeleted,
        EventKind::FragmentCleared,
        EventKind::FragmentCommitted,
        EventKind::ModeChanged,
        EventKind::ModifierChanged,
        EventKind::Error,
        EventKind::KeyMappingChanged,
        EventKind::PreviewUpdated,
        EventKind::HistoryChanged,
    ];

    /// The camelCase event name used by JS hosts
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::NoteAdded => "noteAdded",
            EventKind::ElementDeleted => "elementDeleted",
            EventKind::FragmentCleared => "fragmentCleared",
            EventKind::FragmentCommitted => "fragmentCommitted",
            EventKind::ModeChanged => "modeChanged",
            EventKind::ModifierChanged => "modifierChanged",
            EventKind::Error => "error",
            EventKind::KeyMappingChanged => "keyMappingChanged",
            EventKind::PreviewUpdated => "previewUpdated",
            EventKind::HistoryChanged => "historyChanged",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl CaptureEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CaptureEvent::NoteAdded { .. } => EventKind::NoteAdded,
            CaptureEvent::ElementDeleted { .. } => EventKind::ElementDeleted,
            CaptureEvent::FragmentCleared { .. } => EventKind::FragmentCleared,
            CaptureEvent::FragmentCommitted { .. } => EventKind::FragmentCommitted,
            CaptureEvent::ModeChanged { .. } => EventKind::ModeChanged,
            CaptureEvent::ModifierChanged { .. } => EventKind::ModifierChanged,
            CaptureEvent::Error(_) => EventKind::Error,
            CaptureEvent::KeyMappingChanged { .. } => EventKind::KeyMappingChanged,
            CaptureEvent::PreviewUpdated { .. } => EventKind::PreviewUpdated,
            CaptureEvent::HistoryChanged { .. } => EventKind::HistoryChanged,
        }
    }
}

/// Handle for removing a listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&CaptureEvent)>;

struct Subscription {
    id: SubscriptionId,
    filter: Option<EventKind>,
    listener: Listener,
}

/// Observer registry for capture notifications
#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
    /// Removals requested while an emit was in progress
    removed: RefCell<Vec<SubscriptionId>>,
    depth: Cell<usize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to one kind of event
    pub fn subscribe(&self, kind: EventKind, listener: impl FnMut(&CaptureEvent) + 'static) -> SubscriptionId {
        self.add(Some(kind), Box::new(listener))
    }

    /// Listen to every event
    pub fn subscribe_all(&self, listener: impl FnMut(&CaptureEvent) + 'static) -> SubscriptionId {
        self.add(None, Box::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        if subscriptions.len() == before && self.depth.get() > 0 {
            self.removed.borrow_mut().push(id);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Deliver an event to every matching listener
    ///
    /// Listeners may subscribe or unsubscribe while being called. Events
    /// emitted from inside a listener are not delivered.
    pub fn emit(&self, event: &CaptureEvent) {
        let kind = event.kind();
        let mut active = std::mem::take(&mut *self.subscriptions.borrow_mut());
        self.depth.set(self.depth.get() + 1);

        for subscription in active.iter_mut() {
            if subscription.filter.map_or(true, |filter| filter == kind) {
                (subscription.listener)(event);
            }
        }

        self.depth.set(self.depth.get() - 1);

        let mut subscriptions = self.subscriptions.borrow_mut();
        active.append(&mut subscriptions);
        if self.depth.get() == 0 {
            let removed = std::mem::take(&mut *self.removed.borrow_mut());
            active.retain(|subscription| !removed.contains(&subscription.id));
        }
        *subscriptions = active;
    }

    fn add(&self, filter: Option<EventKind>, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.subscriptions.borrow_mut().push(Subscription { id, filter, listener });
        id
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn mode_changed() -> CaptureEvent {
        CaptureEvent::ModeChanged {
            previous: CaptureMode::Stopped,
            current: CaptureMode::Capture,
        }
    }

    #[test]
    fn test_filtered_and_global_listeners() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        bus.subscribe(EventKind::ModeChanged, move |event| log.borrow_mut().push(("mode", event.kind())));
        let log = seen.clone();
        bus.subscribe(EventKind::FragmentCleared, move |event| log.borrow_mut().push(("clear", event.kind())));
        let log = seen.clone();
        bus.subscribe_all(move |event| log.borrow_mut().push(("all", event.kind())));

        bus.emit(&mode_changed());
        assert_eq!(
            *seen.borrow(),
            vec![("mode", EventKind::ModeChanged), ("all", EventKind::ModeChanged)]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let id = bus.subscribe_all(move |_| counter.set(counter.get() + 1));

        bus.emit(&mode_changed());
        bus.unsubscribe(id);
        bus.emit(&mode_changed());
        assert_eq!(count.get(), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let bus = Rc::new(EventBus::new());
        let count = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));

        let (inner_bus, counter, id_slot) = (bus.clone(), count.clone(), own_id.clone());
        let id = bus.subscribe_all(move |_| {
            counter.set(counter.get() + 1);
            if let Some(id) = id_slot.get() {
                inner_bus.unsubscribe(id);
            }
        });
        own_id.set(Some(id));

        bus.emit(&mode_changed());
        bus.emit(&mode_changed());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(mode_changed()).unwrap();
        assert_eq!(json["type"], "modeChanged");
        assert_eq!(json["previous"], "STOPPED");
        assert_eq!(json["current"], "CAPTURE");
    }

    #[test]
    fn test_kind_names_match_event_tags() {
        assert_eq!(EventKind::from_name("previewUpdated"), Some(EventKind::PreviewUpdated));
        assert_eq!(EventKind::from_name("nope"), None);
        let json = serde_json::to_value(mode_changed()).unwrap();
        assert_eq!(json["type"], EventKind::ModeChanged.name());
    }
}
