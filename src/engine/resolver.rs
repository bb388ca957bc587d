use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::lifecycle::record_history;
use crate::error::AppError;
use crate::models::offer::{Leg, Offer, OfferKind};
use crate::models::order::{Order, OrderStatus};
use crate::publisher::CourierEvent;
use crate::state::AppState;

/// An unconsumed offer joined with its order, as shown in a courier's feed.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableJob {
    pub offer: Offer,
    pub order: Order,
}

/// Resolves one courier's acceptance into an exclusive assignment.
///
/// The winner is decided by a conditional write on the order's per-leg
/// driver field, performed under the order's map-entry guard: whoever
/// finds the field still empty wins; everyone else gets `AlreadyClaimed`.
/// Plain read-then-write is not enough here, two couriers may race on the
/// same offer set within the same millisecond.
pub fn accept(state: &AppState, offer_id: Uuid, courier_id: Uuid) -> Result<Order, AppError> {
    let start = Instant::now();
    let result = try_accept(state, offer_id, courier_id);

    let outcome = match &result {
        Ok(_) => "won",
        Err(AppError::AlreadyClaimed(_)) => "lost",
        Err(_) => "error",
    };
    state
        .metrics
        .accepts_total
        .with_label_values(&[outcome])
        .inc();
    state
        .metrics
        .accept_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());

    result
}

fn try_accept(state: &AppState, offer_id: Uuid, courier_id: Uuid) -> Result<Order, AppError> {
    let offer = state
        .offers
        .get(&offer_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("offer {offer_id} not found")))?;

    if offer.courier_id != courier_id {
        return Err(AppError::NotFound(format!("offer {offer_id} not found")));
    }
    if !offer.is_unconsumed() {
        return Err(AppError::AlreadyClaimed(
            "job no longer available".to_string(),
        ));
    }

    let leg = offer.kind.leg();
    let new_status = match leg {
        Leg::Pickup => OrderStatus::Assigned,
        Leg::Delivery => OrderStatus::OutForDelivery,
    };

    // Conditional write: driver field, status and history row are applied
    // as one unit under the order's entry guard.
    let updated = {
        let mut order = state
            .orders
            .get_mut(&offer.order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", offer.order_id)))?;

        if order.status == OrderStatus::Cancelled {
            return Err(AppError::InvalidOperation("order is cancelled".to_string()));
        }

        let slot = match leg {
            Leg::Pickup => &mut order.pickup_driver,
            Leg::Delivery => &mut order.delivery_driver,
        };
        if slot.is_some() {
            return Err(AppError::AlreadyClaimed(
                "job no longer available".to_string(),
            ));
        }
        *slot = Some(courier_id);

        order.status = new_status;
        order.updated_at = Utc::now();
        record_history(state, order.id, new_status, courier_id, None);
        order.clone()
    };

    // Bookkeeping after the race is settled: mark the winner accepted and
    // supersede every competing offer for the same leg.
    let now = Utc::now();
    if let Some(mut winner) = state.offers.get_mut(&offer_id) {
        winner.accepted_at = Some(now);
    }
    for mut entry in state.offers.iter_mut() {
        let other = entry.value_mut();
        if other.order_id == offer.order_id
            && other.kind == offer.kind
            && other.id != offer_id
            && other.is_unconsumed()
        {
            other.read_at = Some(now);
            state.publisher.publish(CourierEvent::JobTaken {
                offer_id: other.id,
                order_id: other.order_id,
                kind: other.kind,
                courier_id: other.courier_id,
            });
        }
    }

    info!(
        order_id = %updated.id,
        courier_id = %courier_id,
        leg = offer.kind.as_str(),
        "leg assigned"
    );

    Ok(updated)
}

/// Live view of a courier's claimable jobs: unconsumed offers of `kind`
/// addressed to the courier, excluding cancelled orders and legs someone
/// has already won.
pub fn list_available(state: &AppState, courier_id: Uuid, kind: OfferKind) -> Vec<AvailableJob> {
    state
        .offers
        .iter()
        .filter(|entry| {
            let offer = entry.value();
            offer.courier_id == courier_id && offer.kind == kind && offer.is_unconsumed()
        })
        .filter_map(|entry| {
            let offer = entry.value().clone();
            let order = state.orders.get(&offer.order_id)?.value().clone();

            if order.status == OrderStatus::Cancelled {
                return None;
            }
            let claimed = match kind.leg() {
                Leg::Pickup => order.pickup_driver.is_some(),
                Leg::Delivery => order.delivery_driver.is_some(),
            };
            if claimed {
                return None;
            }

            Some(AvailableJob { offer, order })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::{accept, list_available};
    use crate::engine::fanout::fan_out;
    use crate::error::AppError;
    use crate::models::offer::OfferKind;
    use crate::models::order::OrderStatus;
    use crate::state::AppState;
    use crate::test_support::{seed_courier, seed_order};

    fn offer_for(state: &AppState, courier_id: Uuid, kind: OfferKind) -> Uuid {
        state
            .offers
            .iter()
            .find(|entry| entry.value().courier_id == courier_id && entry.value().kind == kind)
            .map(|entry| entry.value().id)
            .unwrap()
    }

    #[test]
    fn accept_assigns_pickup_and_supersedes_rivals() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Pending);
        let winner = seed_courier(&state, true);
        let loser = seed_courier(&state, true);
        fan_out(&state, order_id, OfferKind::PickupAvailable).unwrap();

        let winner_offer = offer_for(&state, winner, OfferKind::PickupAvailable);
        let updated = accept(&state, winner_offer, winner).unwrap();

        assert_eq!(updated.status, OrderStatus::Assigned);
        assert_eq!(updated.pickup_driver, Some(winner));

        let loser_offer = offer_for(&state, loser, OfferKind::PickupAvailable);
        let loser_entry = state.offers.get(&loser_offer).unwrap();
        assert!(loser_entry.read_at.is_some());
        assert!(loser_entry.accepted_at.is_none());
    }

    #[test]
    fn losing_courier_gets_already_claimed() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Pending);
        let winner = seed_courier(&state, true);
        let loser = seed_courier(&state, true);
        fan_out(&state, order_id, OfferKind::PickupAvailable).unwrap();

        accept(&state, offer_for(&state, winner, OfferKind::PickupAvailable), winner).unwrap();

        let err = accept(&state, offer_for(&state, loser, OfferKind::PickupAvailable), loser)
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyClaimed(_)));
    }

    #[test]
    fn accept_requires_offer_addressed_to_caller() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Pending);
        let courier = seed_courier(&state, true);
        fan_out(&state, order_id, OfferKind::PickupAvailable).unwrap();

        let offer_id = offer_for(&state, courier, OfferKind::PickupAvailable);
        let err = accept(&state, offer_id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn accept_on_cancelled_order_is_rejected() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Pending);
        let courier = seed_courier(&state, true);
        fan_out(&state, order_id, OfferKind::PickupAvailable).unwrap();

        crate::engine::lifecycle::cancel(&state, order_id, Uuid::new_v4()).unwrap();

        // Cancellation already superseded the offer.
        let offer_id = offer_for(&state, courier, OfferKind::PickupAvailable);
        let err = accept(&state, offer_id, courier).unwrap_err();
        assert!(matches!(err, AppError::AlreadyClaimed(_)));
    }

    #[test]
    fn delivery_accept_sets_out_for_delivery() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Ready);
        let courier = seed_courier(&state, true);
        fan_out(&state, order_id, OfferKind::DeliveryAvailable).unwrap();

        let updated = accept(
            &state,
            offer_for(&state, courier, OfferKind::DeliveryAvailable),
            courier,
        )
        .unwrap();

        assert_eq!(updated.status, OrderStatus::OutForDelivery);
        assert_eq!(updated.delivery_driver, Some(courier));
    }

    #[test]
    fn concurrent_accepts_have_exactly_one_winner() {
        let (state, _rx) = AppState::new(64, 64);
        let state = Arc::new(state);
        let order_id = seed_order(&state, OrderStatus::Pending);

        let couriers: Vec<Uuid> = (0..8).map(|_| seed_courier(&state, true)).collect();
        fan_out(&state, order_id, OfferKind::PickupAvailable).unwrap();

        let handles: Vec<_> = couriers
            .iter()
            .map(|&courier| {
                let state = state.clone();
                let offer_id = offer_for(&state, courier, OfferKind::PickupAvailable);
                std::thread::spawn(move || accept(&state, offer_id, courier))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
        assert_eq!(winners.len(), 1);
        for result in &results {
            if let Err(err) = result {
                assert!(matches!(err, AppError::AlreadyClaimed(_)));
            }
        }

        let order = state.orders.get(&order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Assigned);
        let winner_id = order.pickup_driver.unwrap();
        assert!(couriers.contains(&winner_id));

        let accepted: Vec<_> = state
            .offers
            .iter()
            .filter(|entry| entry.value().accepted_at.is_some())
            .map(|entry| entry.value().clone())
            .collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].courier_id, winner_id);
    }

    #[test]
    fn list_available_reflects_claims_live() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Pending);
        let winner = seed_courier(&state, true);
        let rival = seed_courier(&state, true);
        fan_out(&state, order_id, OfferKind::PickupAvailable).unwrap();

        assert_eq!(list_available(&state, winner, OfferKind::PickupAvailable).len(), 1);
        assert_eq!(list_available(&state, rival, OfferKind::PickupAvailable).len(), 1);

        accept(&state, offer_for(&state, winner, OfferKind::PickupAvailable), winner).unwrap();

        // Nobody sees the claimed leg anymore, the winner included.
        assert!(list_available(&state, winner, OfferKind::PickupAvailable).is_empty());
        assert!(list_available(&state, rival, OfferKind::PickupAvailable).is_empty());
    }

    #[test]
    fn list_available_excludes_cancelled_orders() {
        let (state, _rx) = AppState::new(16, 16);
        let order_id = seed_order(&state, OrderStatus::Pending);
        let courier = seed_courier(&state, true);
        fan_out(&state, order_id, OfferKind::PickupAvailable).unwrap();

        crate::engine::lifecycle::cancel(&state, order_id, Uuid::new_v4()).unwrap();

        assert!(list_available(&state, courier, OfferKind::PickupAvailable).is_empty());
    }
}
