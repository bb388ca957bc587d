use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthContext, Role};
use crate::error::AppError;
use crate::models::courier::{Courier, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(register_courier).get(list_couriers))
        .route("/couriers/:id/active", patch(set_active))
        .route("/couriers/:id/location", patch(update_location))
}

#[derive(Deserialize)]
pub struct RegisterCourierRequest {
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

/// A driver registers themselves; the courier id is the driver's user id.
async fn register_courier(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<RegisterCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    auth.require(&[Role::Driver])?;

    if payload.name.trim().is_empty() {
        return Err(AppError::ValidationError("name cannot be empty".to_string()));
    }

    let courier = Courier {
        id: auth.user_id,
        name: payload.name,
        location: payload.location,
        active: true,
        updated_at: Utc::now(),
    };

    state.couriers.insert(courier.id, courier.clone());
    Ok(Json(courier))
}

async fn list_couriers(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<Vec<Courier>>, AppError> {
    auth.require(&[])?;

    let couriers = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Ok(Json(couriers))
}

fn self_or_admin(auth: &AuthContext, courier_id: Uuid) -> Result<(), AppError> {
    auth.require(&[Role::Driver])?;
    if auth.role != Role::Admin && auth.user_id != courier_id {
        return Err(AppError::Forbidden(
            "couriers may only update themselves".to_string(),
        ));
    }
    Ok(())
}

async fn set_active(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<Courier>, AppError> {
    self_or_admin(&auth, id)?;

    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    courier.active = payload.active;
    courier.updated_at = Utc::now();

    Ok(Json(courier.clone()))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    self_or_admin(&auth, id)?;

    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    courier.location = payload.location;
    courier.updated_at = Utc::now();

    Ok(Json(courier.clone()))
}
