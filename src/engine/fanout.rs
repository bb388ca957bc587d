use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::offer::{Leg, Offer, OfferKind};
use crate::publisher::CourierEvent;
use crate::state::{AppState, DispatchJob};

/// Queues a fan-out job for the dispatch engine. Best-effort: the order is
/// already committed, so a full queue is logged and never propagated.
pub async fn enqueue(state: &AppState, order_id: Uuid, kind: OfferKind) {
    let job = DispatchJob { order_id, kind };
    match state.dispatch_tx.send(job).await {
        Ok(()) => state.metrics.dispatch_queue_depth.inc(),
        Err(err) => warn!(order_id = %order_id, error = %err, "dispatch queue send failed"),
    }
}

/// Background loop consuming fan-out jobs. Failures are logged; they never
/// affect the operation that enqueued the job.
pub async fn run_dispatch_engine(state: Arc<AppState>, mut rx: mpsc::Receiver<DispatchJob>) {
    info!("dispatch engine started");

    while let Some(job) = rx.recv().await {
        state.metrics.dispatch_queue_depth.dec();

        match fan_out(&state, job.order_id, job.kind) {
            Ok(count) => {
                info!(order_id = %job.order_id, kind = job.kind.as_str(), offers = count, "fan-out complete");
            }
            Err(err) => {
                error!(order_id = %job.order_id, kind = job.kind.as_str(), error = %err, "fan-out failed");
            }
        }
    }

    warn!("dispatch engine stopped: queue channel closed");
}

/// Creates one offer per active courier for the given leg of the order and
/// publishes a `JobOffered` event to each. Idempotent: couriers already
/// holding an unconsumed offer of the same kind for this order are skipped,
/// and a leg that is already claimed fans out to nobody. Zero active
/// couriers is success with zero offers; the order simply waits.
pub fn fan_out(state: &AppState, order_id: Uuid, kind: OfferKind) -> Result<usize, AppError> {
    let (stop, express, claimed) = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        let stop = match kind.leg() {
            Leg::Pickup => order.pickup,
            Leg::Delivery => order.dropoff,
        };
        let claimed = match kind.leg() {
            Leg::Pickup => order.pickup_driver.is_some(),
            Leg::Delivery => order.delivery_driver.is_some(),
        };
        (stop, order.express, claimed)
    };

    if claimed {
        return Ok(0);
    }

    let candidates: Vec<_> = state
        .couriers
        .iter()
        .filter(|entry| entry.value().active)
        .map(|entry| (entry.value().id, entry.value().location))
        .collect();

    let mut created = 0;
    for (courier_id, location) in candidates {
        let already_offered = state.offers.iter().any(|entry| {
            let offer = entry.value();
            offer.order_id == order_id
                && offer.kind == kind
                && offer.courier_id == courier_id
                && offer.is_unconsumed()
        });
        if already_offered {
            continue;
        }

        let offer = Offer {
            id: Uuid::new_v4(),
            order_id,
            kind,
            courier_id,
            created_at: Utc::now(),
            accepted_at: None,
            read_at: None,
        };
        state.offers.insert(offer.id, offer.clone());
        state
            .metrics
            .offers_created_total
            .with_label_values(&[kind.as_str()])
            .inc();

        state.publisher.publish(CourierEvent::JobOffered {
            offer_id: offer.id,
            order_id,
            kind,
            courier_id,
            distance_km: location.distance_km(&stop),
            express,
        });

        created += 1;
    }

    Ok(created)
}
