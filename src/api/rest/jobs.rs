use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthContext, Role};
use crate::engine::resolver::{self, AvailableJob};
use crate::error::AppError;
use crate::models::offer::OfferKind;
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/:offer_id/accept", post(accept_job))
}

#[derive(Deserialize)]
pub struct ListJobsQuery {
    pub kind: OfferKind,
}

async fn list_jobs(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<AvailableJob>>, AppError> {
    auth.require(&[Role::Driver])?;
    Ok(Json(resolver::list_available(&state, auth.user_id, query.kind)))
}

async fn accept_job(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    auth.require(&[Role::Driver])?;
    let updated = resolver::accept(&state, offer_id, auth.user_id)?;
    Ok(Json(updated))
}
