//! Semantic engine events and the observer layer.
//!
//! The engine fires events when a state change commits; delivery is
//! synchronous and in call order. Observers must not mutate engine
//! state — they exist so a presentation layer (chat broadcast, map
//! refresh, scoreboard colors) can react without the engine knowing
//! about it.
//!
//! Uses serde's tag format for clean JSONL output:
//! ```json
//! {"type":"relation_changed","a":"t1","b":"t2","old":"neutral","new":"ally"}
//! ```

use crate::relation::TerritoryRelation;
use crate::state::TerritoryId;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;
use thiserror::Error;

/// Events emitted by the engine when a state change commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A diplomacy proposal landed in a territory's inbox.
    DiplomacyProposalReceived {
        proposer: TerritoryId,
        target: TerritoryId,
        wanted: TerritoryRelation,
    },

    /// A proposal was accepted and the relation rewritten on both sides.
    RelationChanged {
        a: TerritoryId,
        b: TerritoryId,
        old: TerritoryRelation,
        new: TerritoryRelation,
    },

    /// A vassalization offer landed in a territory's inbox.
    VassalProposalReceived {
        proposer: TerritoryId,
        target: TerritoryId,
    },

    /// A vassalization offer was accepted; both sides are linked.
    VassalAccepted {
        vassal: TerritoryId,
        overlord: TerritoryId,
    },

    /// A vassal was released from its overlord.
    OverlordRemoved {
        vassal: TerritoryId,
        overlord: TerritoryId,
    },

    /// Destructive, player-impacting outcome of an upkeep shortfall —
    /// broadcast-quality, never silent.
    ChunksLost {
        territory: TerritoryId,
        count: usize,
    },

    /// A territory was dissolved.
    TerritoryDeleted { territory: TerritoryId },
}

/// Errors that can occur during observation.
#[derive(Error, Debug)]
pub enum ObserverError {
    /// I/O error (e.g. writing an event log line)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Trait for engine observers.
///
/// Implementations must be `Send + Sync`. Errors are logged and do not
/// block the engine or later observers.
pub trait EngineObserver: Send + Sync {
    /// Called after each committed state change, in call order.
    fn on_event(&self, event: &EngineEvent) -> Result<(), ObserverError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Registry for managing multiple observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Box<dyn EngineObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn EngineObserver>) {
        log::debug!("Registering observer: {}", observer.name());
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver an event to every observer, in registration order.
    pub fn notify(&self, event: &EngineEvent) {
        for observer in &self.observers {
            if let Err(e) = observer.on_event(event) {
                log::warn!("Observer '{}' failed: {}", observer.name(), e);
            }
        }
    }
}

/// Observer writing events as JSON lines to any `Write` destination.
pub struct EventLogObserver<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> EventLogObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> EngineObserver for EventLogObserver<W> {
    fn on_event(&self, event: &EngineEvent) -> Result<(), ObserverError> {
        let line = serde_json::to_string(event)?;
        let mut writer = self.writer.lock().expect("event log writer poisoned");
        writeln!(writer, "{line}")?;
        Ok(())
    }

    fn name(&self) -> &str {
        "event_log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<EngineEvent>>,
    }

    impl EngineObserver for Arc<Recording> {
        fn on_event(&self, event: &EngineEvent) -> Result<(), ObserverError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_notify_preserves_call_order() {
        let recording = Arc::new(Recording::default());
        let mut registry = ObserverRegistry::new();
        registry.register(Box::new(recording.clone()));

        let first = EngineEvent::TerritoryDeleted {
            territory: TerritoryId::new("t1"),
        };
        let second = EngineEvent::ChunksLost {
            territory: TerritoryId::new("t2"),
            count: 4,
        };
        registry.notify(&first);
        registry.notify(&second);

        let events = recording.events.lock().unwrap();
        assert_eq!(*events, vec![first, second]);
    }

    #[test]
    fn test_event_log_writes_jsonl() {
        let observer = EventLogObserver::new(Vec::new());
        observer
            .on_event(&EngineEvent::ChunksLost {
                territory: TerritoryId::new("t1"),
                count: 3,
            })
            .unwrap();
        let bytes = observer.writer.into_inner().unwrap();
        let line = String::from_utf8(bytes).unwrap();
        assert!(line.contains("\"type\":\"chunks_lost\""));
        assert!(line.ends_with('\n'));
    }
}
