//! Domain event system: decoupled notification of workflow activity.
//!
//! The coordinator publishes an event whenever the stage changes, a notice is
//! raised, or an asset is produced. The HTTP layer relays them to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::stage::Stage;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// The workflow moved between stages
    StageChanged {
        from: Stage,
        to: Stage,
        timestamp: DateTime<Utc>,
    },

    /// A recovered failure the user should see
    NoticeRaised {
        operation: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A garment was synthesized and added to the candidates
    ClothingGenerated {
        asset_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A try-on composite completed and was recorded in history
    CompositionCompleted {
        entry_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The workflow was reset to person selection
    SessionReset { timestamp: DateTime<Utc> },
}

impl DomainEvent {
    /// Stable event name, used as the SSE `event:` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StageChanged { .. } => "stage_changed",
            Self::NoticeRaised { .. } => "notice_raised",
            Self::ClothingGenerated { .. } => "clothing_generated",
            Self::CompositionCompleted { .. } => "composition_completed",
            Self::SessionReset { .. } => "session_reset",
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
