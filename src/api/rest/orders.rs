use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthContext, Role};
use crate::engine::lifecycle;
use crate::engine::pricing::{self, ItemRequest};
use crate::engine::fanout;
use crate::error::AppError;
use crate::models::courier::GeoPoint;
use crate::models::offer::OfferKind;
use crate::models::order::{Order, OrderStatus, PickupMode, StatusHistoryEntry};
use crate::qr::{self, OrderSnapshot};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/history", get(get_history))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/transition", post(transition_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub pickup_mode: PickupMode,
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub express: bool,
    pub items: Vec<ItemRequest>,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    auth.require(&[Role::Customer])?;

    if payload.pickup_mode == PickupMode::Scheduled && payload.scheduled_for.is_none() {
        return Err(AppError::ValidationError(
            "scheduled pickup requires scheduled_for".to_string(),
        ));
    }

    // Everything that can fail happens before the first insert, so a bad
    // request leaves no order behind.
    let order_id = Uuid::new_v4();
    let (items, pricing) = pricing::price_order(&state, order_id, &payload.items, payload.express)?;

    let now = Utc::now();
    let order_number = state.next_order_number();
    let qr_payload = qr::encode(&OrderSnapshot {
        order_id,
        order_number: order_number.clone(),
        customer_id: Some(auth.user_id),
        created_at: Some(now),
    })?;

    let order = Order {
        id: order_id,
        order_number,
        customer_id: auth.user_id,
        pickup: payload.pickup,
        dropoff: payload.dropoff,
        pickup_mode: payload.pickup_mode,
        scheduled_for: payload.scheduled_for,
        express: payload.express,
        pricing,
        status: OrderStatus::Pending,
        pickup_driver: None,
        delivery_driver: None,
        confirmed_item_count: items.iter().map(|item| item.quantity).sum(),
        pickup_item_count: None,
        delivery_item_count: None,
        qr_payload,
        created_at: now,
        updated_at: now,
    };

    state.orders.insert(order.id, order.clone());
    state.order_items.insert(order.id, items);
    state.history.entry(order.id).or_default().push(StatusHistoryEntry {
        order_id: order.id,
        status: OrderStatus::Pending,
        actor_id: auth.user_id,
        note: None,
        recorded_at: now,
    });
    state.metrics.orders_created_total.inc();

    // Best-effort fan-out after commit; failure is logged, never surfaced.
    fanout::enqueue(&state, order.id, OfferKind::PickupAvailable).await;

    Ok(Json(order))
}

fn visible_to(auth: &AuthContext, order: &Order) -> Result<(), AppError> {
    if auth.role == Role::Customer && order.customer_id != auth.user_id {
        return Err(AppError::Forbidden(
            "customers may only view their own orders".to_string(),
        ));
    }
    Ok(())
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    visible_to(&auth, &order)?;
    Ok(Json(order))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusHistoryEntry>>, AppError> {
    let order = state
        .orders
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    visible_to(&auth, &order)?;

    let history = state
        .history
        .get(&id)
        .map(|entry| entry.value().clone())
        .unwrap_or_default();
    Ok(Json(history))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    auth.require(&[Role::Customer])?;

    if auth.role == Role::Customer {
        let order = state
            .orders
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        if order.customer_id != auth.user_id {
            return Err(AppError::Forbidden(
                "customers may only cancel their own orders".to_string(),
            ));
        }
    }

    let updated = lifecycle::cancel(&state, id, auth.user_id)?;
    Ok(Json(updated))
}

/// Forced transition for facility staff; the state machine still applies.
async fn transition_order(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Order>, AppError> {
    auth.require(&[Role::Cleaner])?;

    let updated = lifecycle::transition(&state, id, payload.status, auth.user_id, payload.note).await?;
    Ok(Json(updated))
}
