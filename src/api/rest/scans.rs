use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthContext, Role};
use crate::engine::checkpoint::{self, ScanEvent};
use crate::error::AppError;
use crate::models::artifact::Checkpoint;
use crate::models::order::Order;
use crate::qr;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scans", post(submit_scan))
        .route("/orders/:id/issues", post(report_issue))
}

#[derive(Deserialize)]
pub struct ScanRequest {
    /// The QR label scanned off the laundry bag.
    pub qr_payload: String,
    pub checkpoint: Checkpoint,
    pub item_count: Option<u32>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub signature: Option<String>,
}

#[derive(Deserialize)]
pub struct IssueRequest {
    pub photos: Vec<String>,
}

#[derive(Serialize)]
pub struct IssueResponse {
    pub stored: usize,
}

async fn submit_scan(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<Order>, AppError> {
    match payload.checkpoint {
        Checkpoint::PickedUp | Checkpoint::Delivered => auth.require(&[Role::Driver])?,
        Checkpoint::Received | Checkpoint::Ready => auth.require(&[Role::Cleaner])?,
    }

    let snapshot = qr::decode(&payload.qr_payload)?;

    let updated = checkpoint::handle_scan(
        &state,
        snapshot.order_id,
        auth.user_id,
        ScanEvent {
            checkpoint: payload.checkpoint,
            item_count: payload.item_count,
            photos: payload.photos,
            signature: payload.signature,
        },
    )
    .await?;

    Ok(Json(updated))
}

async fn report_issue(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<IssueRequest>,
) -> Result<Json<IssueResponse>, AppError> {
    auth.require(&[Role::Driver, Role::Cleaner])?;

    let stored = checkpoint::record_issue(&state, id, auth.user_id, payload.photos)?;
    Ok(Json(IssueResponse { stored }))
}
