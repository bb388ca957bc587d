use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Snapshot of an order's identity fields, embedded in its QR label.
/// `order_id` and `order_number` are required on decode; the rest is
/// carried for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: Uuid,
    pub order_number: String,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

pub fn encode(snapshot: &OrderSnapshot) -> Result<String, AppError> {
    serde_json::to_string(snapshot)
        .map_err(|err| AppError::Internal(format!("failed to encode qr payload: {err}")))
}

pub fn decode(raw: &str) -> Result<OrderSnapshot, AppError> {
    serde_json::from_str(raw)
        .map_err(|_| AppError::ValidationError("invalid qr payload".to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{decode, encode, OrderSnapshot};

    #[test]
    fn round_trip_preserves_identity() {
        let snapshot = OrderSnapshot {
            order_id: Uuid::from_u128(7),
            order_number: "LND-000007".to_string(),
            customer_id: Some(Uuid::from_u128(1)),
            created_at: Some(Utc::now()),
        };

        let raw = encode(&snapshot).unwrap();
        let decoded = decode(&raw).unwrap();

        assert_eq!(decoded.order_id, snapshot.order_id);
        assert_eq!(decoded.order_number, snapshot.order_number);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("not json at all").is_err());
    }

    #[test]
    fn decode_rejects_missing_required_fields() {
        let raw = r#"{"order_number": "LND-000001"}"#;
        assert!(decode(raw).is_err());
    }

    #[test]
    fn decode_tolerates_missing_display_fields() {
        let id = Uuid::from_u128(9);
        let raw = format!(r#"{{"order_id": "{id}", "order_number": "LND-000009"}}"#);
        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded.order_id, id);
        assert!(decoded.customer_id.is_none());
    }
}
