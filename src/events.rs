//! Registry event bus
//!
//! Every committed store mutation is announced here. Subscribers drive
//! audit logs and UI refreshes.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::models::ParcelStatus;

/// Events emitted after a mutation has been persisted
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    ParcelSubmitted {
        id: u64,
        khasra_number: String,
        owner_name: String,
    },
    ParcelUpdated {
        id: u64,
    },
    ParcelDeleted {
        id: u64,
    },
    ParcelApproved {
        id: u64,
        council_member: String,
        approvals: usize,
        status: ParcelStatus,
    },
    ParcelRejected {
        id: u64,
    },
    ParcelDisputed {
        id: u64,
    },
    StatusSynced {
        id: u64,
        status: ParcelStatus,
    },
    OwnershipTransferred {
        id: u64,
        new_owner_wallet: String,
    },
    ChainMirrorFailed {
        operation: &'static str,
        id: Option<u64>,
        error: String,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &RegistryEvent);
}

/// Broadcast bus for registry events
pub struct EventBus {
    sender: broadcast::Sender<RegistryEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: RegistryEvent) {
        trace!(event = ?event, "Emitting registry event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns events into tracing records
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &RegistryEvent) {
        match event {
            RegistryEvent::ParcelSubmitted { id, khasra_number, owner_name } => {
                info!(id, khasra = %khasra_number, owner = %owner_name, "Parcel submitted");
            }
            RegistryEvent::ParcelApproved { id, council_member, approvals, status } => {
                info!(id, member = %council_member, approvals, status = %status, "Parcel approved");
            }
            RegistryEvent::ParcelRejected { id } => info!(id, "Parcel rejected"),
            RegistryEvent::ParcelDisputed { id } => info!(id, "Parcel disputed"),
            RegistryEvent::ChainMirrorFailed { operation, id, error } => {
                warn!(operation, id = ?id, error = %error, "Chain mirror failed");
            }
            _ => {
                debug!(event = ?event, "Registry event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}
