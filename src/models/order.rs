use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupMode {
    Immediate,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    PickedUp,
    InFacility,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InFacility => "in_facility",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Server-derived monetary breakdown. Never accepted from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub express_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub pickup_mode: PickupMode,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub express: bool,
    pub pricing: PriceBreakdown,
    pub status: OrderStatus,
    /// Set at most once, via the resolver's conditional write.
    pub pickup_driver: Option<Uuid>,
    /// Set at most once, via the resolver's conditional write.
    pub delivery_driver: Option<Uuid>,
    pub confirmed_item_count: u32,
    pub pickup_item_count: Option<u32>,
    pub delivery_item_count: Option<u32>,
    /// Generated at creation; immutable thereafter.
    pub qr_payload: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order, with prices snapshotted at order time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub category_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub express_surcharge: Decimal,
}

/// Append-only audit row. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub actor_id: Uuid,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
