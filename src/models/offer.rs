use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The pickup or delivery half of an order's fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    PickupAvailable,
    DeliveryAvailable,
}

impl OfferKind {
    pub fn leg(self) -> Leg {
        match self {
            OfferKind::PickupAvailable => Leg::Pickup,
            OfferKind::DeliveryAvailable => Leg::Delivery,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OfferKind::PickupAvailable => "pickup_available",
            OfferKind::DeliveryAvailable => "delivery_available",
        }
    }
}

/// One courier's unconsumed invitation to claim a leg of one order.
/// Many offers exist in parallel per order; at most one is ever accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kind: OfferKind,
    pub courier_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    /// Set when the offer is superseded by another courier's acceptance.
    pub read_at: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn is_unconsumed(&self) -> bool {
        self.accepted_at.is_none() && self.read_at.is_none()
    }
}
