use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::offer::OfferKind;

/// Event delivered to a courier's live channel. Fire-and-forget; the core
/// never awaits delivery confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CourierEvent {
    JobOffered {
        offer_id: Uuid,
        order_id: Uuid,
        kind: OfferKind,
        courier_id: Uuid,
        distance_km: f64,
        express: bool,
    },
    JobTaken {
        offer_id: Uuid,
        order_id: Uuid,
        kind: OfferKind,
        courier_id: Uuid,
    },
}

impl CourierEvent {
    pub fn courier_id(&self) -> Uuid {
        match self {
            CourierEvent::JobOffered { courier_id, .. }
            | CourierEvent::JobTaken { courier_id, .. } => *courier_id,
        }
    }
}

/// Injected broadcast capability. The fan-out and resolver receive this
/// explicitly through `AppState`; there is no process-wide singleton.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: CourierEvent);
}

pub struct BroadcastPublisher {
    tx: broadcast::Sender<CourierEvent>,
}

impl BroadcastPublisher {
    pub fn new(tx: broadcast::Sender<CourierEvent>) -> Self {
        Self { tx }
    }
}

impl Publisher for BroadcastPublisher {
    fn publish(&self, event: CourierEvent) {
        // Send fails only when no subscriber is connected; that is fine.
        let _ = self.tx.send(event);
    }
}
