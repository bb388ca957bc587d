use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::fanout;
use crate::engine::lifecycle::{is_legal, record_history};
use crate::error::AppError;
use crate::models::artifact::{Artifact, ArtifactKind, Checkpoint, PhotoTag};
use crate::models::offer::{Leg, OfferKind};
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// A single physical scan: checkpoint label plus the counts and artifacts
/// captured alongside it. The checkpoint is a closed enum, so an unknown
/// label never reaches the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanEvent {
    pub checkpoint: Checkpoint,
    pub item_count: Option<u32>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub signature: Option<String>,
}

fn target_status(checkpoint: Checkpoint) -> OrderStatus {
    match checkpoint {
        Checkpoint::PickedUp => OrderStatus::PickedUp,
        Checkpoint::Received => OrderStatus::InFacility,
        Checkpoint::Ready => OrderStatus::Ready,
        Checkpoint::Delivered => OrderStatus::Delivered,
    }
}

fn signature_leg(checkpoint: Checkpoint) -> Option<Leg> {
    match checkpoint {
        Checkpoint::PickedUp => Some(Leg::Pickup),
        Checkpoint::Delivered => Some(Leg::Delivery),
        Checkpoint::Received | Checkpoint::Ready => None,
    }
}

/// Translates a scan into count capture + transition + artifact storage.
/// All validation happens before the first write; a rejected scan leaves
/// no partial state behind.
pub async fn handle_scan(
    state: &AppState,
    order_id: Uuid,
    actor_id: Uuid,
    scan: ScanEvent,
) -> Result<Order, AppError> {
    let target = target_status(scan.checkpoint);
    let leg = signature_leg(scan.checkpoint);

    if scan.signature.is_some() && leg.is_none() {
        return Err(AppError::ValidationError(format!(
            "signature not accepted at checkpoint {:?}",
            scan.checkpoint
        )));
    }
    if matches!(scan.checkpoint, Checkpoint::PickedUp | Checkpoint::Delivered)
        && scan.item_count.is_none()
    {
        return Err(AppError::ValidationError(format!(
            "item_count required at checkpoint {:?}",
            scan.checkpoint
        )));
    }

    let updated = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if !is_legal(order.status, target) {
            return Err(AppError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        match scan.checkpoint {
            Checkpoint::PickedUp => {
                if order.pickup_driver != Some(actor_id) {
                    return Err(AppError::Forbidden(
                        "only the assigned pickup courier may scan pickup".to_string(),
                    ));
                }
                if order.pickup_item_count.is_some() {
                    return Err(AppError::InvalidOperation(
                        "pickup item count already recorded".to_string(),
                    ));
                }
                order.pickup_item_count = scan.item_count;
            }
            Checkpoint::Delivered => {
                if order.delivery_driver != Some(actor_id) {
                    return Err(AppError::Forbidden(
                        "only the assigned delivery courier may scan delivery".to_string(),
                    ));
                }
                if order.delivery_item_count.is_some() {
                    return Err(AppError::InvalidOperation(
                        "delivery item count already recorded".to_string(),
                    ));
                }
                order.delivery_item_count = scan.item_count;
            }
            // Reception is tracked through status alone; no dedicated
            // count field exists for these checkpoints.
            Checkpoint::Received | Checkpoint::Ready => {}
        }

        order.status = target;
        order.updated_at = Utc::now();
        record_history(
            state,
            order_id,
            target,
            actor_id,
            Some(format!("scan: {:?}", scan.checkpoint)),
        );
        order.clone()
    };

    let now = Utc::now();
    let mut artifacts = state.artifacts.entry(order_id).or_default();
    if let (Some(signature), Some(leg)) = (scan.signature, leg) {
        artifacts.push(Artifact {
            id: Uuid::new_v4(),
            order_id,
            kind: ArtifactKind::Signature { leg },
            data: signature,
            recorded_by: actor_id,
            created_at: now,
        });
    }
    for photo in scan.photos {
        artifacts.push(Artifact {
            id: Uuid::new_v4(),
            order_id,
            kind: ArtifactKind::Photo {
                tag: scan.checkpoint.into(),
            },
            data: photo,
            recorded_by: actor_id,
            created_at: now,
        });
    }
    drop(artifacts);

    info!(order_id = %order_id, checkpoint = ?scan.checkpoint, "scan processed");

    if target == OrderStatus::Ready {
        fanout::enqueue(state, order_id, OfferKind::DeliveryAvailable).await;
    }

    Ok(updated)
}

/// Stores issue photos outside the checkpoint vocabulary.
pub fn record_issue(
    state: &AppState,
    order_id: Uuid,
    actor_id: Uuid,
    photos: Vec<String>,
) -> Result<usize, AppError> {
    if photos.is_empty() {
        return Err(AppError::ValidationError(
            "issue report requires at least one photo".to_string(),
        ));
    }
    if !state.orders.contains_key(&order_id) {
        return Err(AppError::NotFound(format!("order {order_id} not found")));
    }

    let now = Utc::now();
    let count = photos.len();
    let mut artifacts = state.artifacts.entry(order_id).or_default();
    for photo in photos {
        artifacts.push(Artifact {
            id: Uuid::new_v4(),
            order_id,
            kind: ArtifactKind::Photo {
                tag: PhotoTag::Issue,
            },
            data: photo,
            recorded_by: actor_id,
            created_at: now,
        });
    }

    Ok(count)
}
