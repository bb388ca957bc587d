use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A laundry service category (e.g. "wash & fold", "dry cleaning").
/// Prices here are the live prices; placed orders carry their own snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub base_price: Decimal,
    pub express_price: Decimal,
}
