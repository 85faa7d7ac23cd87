use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle signals published by the gate. Neither carries a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GateEvent {
    /// An authorizer was installed by `init`.
    Initialized,
    /// The granted permissions were replaced.
    PermissionsUpdated,
}

impl GateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GateEvent::Initialized => "initialized",
            GateEvent::PermissionsUpdated => "permissionsUpdated",
        }
    }
}

pub type EventBus = broadcast::Sender<GateEvent>;

/// A zero capacity is raised to one; `broadcast::channel` rejects zero.
pub fn init_event_bus(capacity: usize) -> EventBus {
    let (tx, _rx) = broadcast::channel(capacity.max(1));
    tx
}

/// Fire and forget: having no subscribers is not an error.
pub fn publish(bus: &EventBus, event: GateEvent) {
    let delivered = bus.send(event).unwrap_or(0);
    tracing::debug!(event = event.name(), delivered, "gate event published");
}
