use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::fanout;
use crate::error::AppError;
use crate::models::offer::OfferKind;
use crate::models::order::{Order, OrderStatus, StatusHistoryEntry};
use crate::publisher::CourierEvent;
use crate::state::AppState;

/// The legal successors of each status. Everything else is rejected;
/// status strings never travel raw through the engine.
pub fn allowed_successors(status: OrderStatus) -> &'static [OrderStatus] {
    match status {
        OrderStatus::Pending => &[OrderStatus::Assigned, OrderStatus::Cancelled],
        OrderStatus::Assigned => &[OrderStatus::PickedUp],
        OrderStatus::PickedUp => &[OrderStatus::InFacility],
        OrderStatus::InFacility => &[OrderStatus::Ready],
        OrderStatus::Ready => &[OrderStatus::OutForDelivery],
        OrderStatus::OutForDelivery => &[OrderStatus::Delivered],
        OrderStatus::Delivered | OrderStatus::Cancelled => &[],
    }
}

pub fn is_legal(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_successors(from).contains(&to)
}

pub(crate) fn record_history(
    state: &AppState,
    order_id: Uuid,
    status: OrderStatus,
    actor_id: Uuid,
    note: Option<String>,
) {
    state.history.entry(order_id).or_default().push(StatusHistoryEntry {
        order_id,
        status,
        actor_id,
        note,
        recorded_at: Utc::now(),
    });
}

/// Applies a validated status transition and appends one history row.
/// Entering `ready` enqueues the delivery fan-out as a follow-up job;
/// `assigned` and `out_for_delivery` are produced by the resolver, not
/// through this path.
pub async fn transition(
    state: &AppState,
    order_id: Uuid,
    target: OrderStatus,
    actor_id: Uuid,
    note: Option<String>,
) -> Result<Order, AppError> {
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

        order.status = target;
        order.updated_at = Utc::now();
        record_history(state, order_id, target, actor_id, note);
        order.clone()
    };

    info!(order_id = %order_id, status = %target, "order transitioned");

    if target == OrderStatus::Ready {
        fanout::enqueue(state, order_id, OfferKind::DeliveryAvailable).await;
    }

    Ok(updated)
}

/// Compare-guarded cancellation: permitted only while the order is still
/// `pending`. Outstanding pickup offers are superseded so the job vanishes
/// from courier feeds.
pub fn cancel(state: &AppState, order_id: Uuid, actor_id: Uuid) -> Result<Order, AppError> {
    let updated = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if order.status != OrderStatus::Pending {
            return Err(AppError::InvalidOperation(format!(
                "cannot cancel order in status {}",
                order.status
            )));
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        record_history(state, order_id, OrderStatus::Cancelled, actor_id, None);
        order.clone()
    };

    let now = Utc::now();
    for mut entry in state.offers.iter_mut() {
        let offer = entry.value_mut();
        if offer.order_id == order_id && offer.is_unconsumed() {
            offer.read_at = Some(now);
            state.publisher.publish(CourierEvent::JobTaken {
                offer_id: offer.id,
                order_id,
                kind: offer.kind,
                courier_id: offer.courier_id,
            });
        }
    }

    info!(order_id = %order_id, "order cancelled");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{cancel, is_legal, transition};
    use crate::error::AppError;
    use crate::models::order::OrderStatus;
    use crate::state::AppState;
    use crate::test_support::seed_order;

    #[test]
    fn graph_is_monotonic() {
        use OrderStatus::*;

        assert!(is_legal(Pending, Assigned));
        assert!(is_legal(Pending, Cancelled));
        assert!(is_legal(Assigned, PickedUp));
        assert!(is_legal(PickedUp, InFacility));
        assert!(is_legal(InFacility, Ready));
        assert!(is_legal(Ready, OutForDelivery));
        assert!(is_legal(OutForDelivery, Delivered));

        // No revisiting earlier phases.
        assert!(!is_legal(PickedUp, Pending));
        assert!(!is_legal(Ready, Assigned));
        assert!(!is_legal(Delivered, OutForDelivery));
        // Cancellation only from pending.
        assert!(!is_legal(Assigned, Cancelled));
        assert!(!is_legal(Ready, Cancelled));
        // No skipping ahead.
        assert!(!is_legal(Pending, PickedUp));
        assert!(!is_legal(Assigned, Ready));
    }

    #[tokio::test]
    async fn illegal_transition_rejected() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Pending);

        let err = transition(&state, order_id, OrderStatus::Delivered, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn transition_appends_history() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Assigned);
        let actor = Uuid::new_v4();

        let updated = transition(&state, order_id, OrderStatus::PickedUp, actor, None)
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::PickedUp);
        let history = state.history.get(&order_id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OrderStatus::PickedUp);
        assert_eq!(history[0].actor_id, actor);
    }

    #[tokio::test]
    async fn ready_transition_enqueues_delivery_fanout() {
        let (state, mut rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::InFacility);

        transition(&state, order_id, OrderStatus::Ready, Uuid::new_v4(), None)
            .await
            .unwrap();

        let job = rx.try_recv().unwrap();
        assert_eq!(job.order_id, order_id);
        assert_eq!(job.kind, crate::models::offer::OfferKind::DeliveryAvailable);
    }

    #[test]
    fn cancel_pending_succeeds_with_one_history_row() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Pending);

        let updated = cancel(&state, order_id, Uuid::new_v4()).unwrap();
        assert_eq!(updated.status, OrderStatus::Cancelled);

        let history = state.history.get(&order_id).unwrap();
        let cancelled_rows = history
            .iter()
            .filter(|entry| entry.status == OrderStatus::Cancelled)
            .count();
        assert_eq!(cancelled_rows, 1);
    }

    #[test]
    fn cancel_non_pending_fails() {
        let (state, _rx) = AppState::new(16, 16);
        for status in [
            OrderStatus::Assigned,
            OrderStatus::PickedUp,
            OrderStatus::InFacility,
            OrderStatus::Ready,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            let order_id = seed_order(&state, status);
            let err = cancel(&state, order_id, Uuid::new_v4()).unwrap_err();
            assert!(matches!(err, AppError::InvalidOperation(_)), "{status}");
        }
    }
}
