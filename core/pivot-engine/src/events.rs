//! FILENAME: core/pivot-engine/src/events.rs
//! Change notifications.
//!
//! Listeners registered with `PivotEngine::subscribe` are called
//! synchronously, in registration order, after the mutation that caused the
//! event has fully recomputed the snapshot.

use std::sync::Arc;

use serde::Serialize;

use crate::definition::ViewMode;
use crate::error::PivotError;
use crate::pagination::PaginationState;
use crate::view::EngineState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum PivotEvent<R> {
    /// Fired after every successful mutation.
    StateChange(Arc<EngineState<R>>),
    /// Fired when the active mode's pagination changed.
    PaginationChange(PaginationState),
    ViewModeChange(ViewMode),
    /// A failure caught at the command boundary.
    #[serde(rename = "pivotError")]
    Error(PivotError),
}

impl<R> PivotEvent<R> {
    pub fn name(&self) -> &'static str {
        match self {
            PivotEvent::StateChange(_) => "stateChange",
            PivotEvent::PaginationChange(_) => "paginationChange",
            PivotEvent::ViewModeChange(_) => "viewModeChange",
            PivotEvent::Error(_) => "pivotError",
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(pub(crate) u64);

pub type Listener<R> = Box<dyn FnMut(&PivotEvent<R>) + Send>;

/// Registered listeners in subscription order.
pub(crate) struct Listeners<R> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener<R>)>,
}

impl<R> Default for Listeners<R> {
    fn default() -> Self {
        Listeners {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<R> Listeners<R> {
    pub(crate) fn add(&mut self, listener: Listener<R>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, event: &PivotEvent<R>) {
        log::trace!(target: "pivot", "emit {} to {} listener(s)", event.name(), self.entries.len());
        for (_, listener) in self.entries.iter_mut() {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn listeners_receive_events_until_removed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners: Listeners<()> = Listeners::default();

        let sink = Arc::clone(&seen);
        let id = listeners.add(Box::new(move |e: &PivotEvent<()>| {
            sink.lock().unwrap().push(e.name());
        }));

        listeners.emit(&PivotEvent::ViewModeChange(ViewMode::Raw));
        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.emit(&PivotEvent::ViewModeChange(ViewMode::Processed));

        assert_eq!(*seen.lock().unwrap(), vec!["viewModeChange"]);
        assert!(listeners.entries.is_empty());
    }

    #[test]
    fn error_event_serializes_with_adapter_name() {
        let event: PivotEvent<()> = PivotEvent::Error(PivotError::InvalidCommand("bad".into()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "pivotError");
        assert_eq!(json["payload"]["kind"], "invalidCommand");
    }
}
