//! Notifications for listeners outside the engine (neighbouring regions, the tool server).

use tokio::sync::broadcast;
use tracing::trace;

use crate::constants::{CONTENT_LOADED, RELEDIT_RELOADED};
use crate::models::{RegionId, SessionParams};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionEvent {
    /// Fresh content was committed into a region
    ContentLoaded { region: RegionId },
    /// An edited region was refreshed after a successful submission
    RelEditReloaded { params: SessionParams },
}

impl RegionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RegionEvent::ContentLoaded { .. } => CONTENT_LOADED,
            RegionEvent::RelEditReloaded { .. } => RELEDIT_RELOADED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RegionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegionEvent> {
        self.sender.subscribe()
    }

    /// Delivered to current subscribers only; nobody listening is fine.
    pub fn emit(&self, event: RegionEvent) {
        trace!(event = event.name(), "emitting");
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
