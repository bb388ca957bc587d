use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::models::category::Category;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/categories", post(create_category).get(list_categories))
}

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub base_price: Decimal,
    pub express_price: Decimal,
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    auth.require(&[])?;

    if payload.name.trim().is_empty() {
        return Err(AppError::ValidationError("name cannot be empty".to_string()));
    }
    if payload.base_price <= Decimal::ZERO || payload.express_price < payload.base_price {
        return Err(AppError::ValidationError(
            "prices must be positive and express_price >= base_price".to_string(),
        ));
    }

    let category = Category {
        id: Uuid::new_v4(),
        name: payload.name,
        base_price: payload.base_price,
        express_price: payload.express_price,
    };

    state.categories.insert(category.id, category.clone());
    Ok(Json(category))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
) -> Json<Vec<Category>> {
    let categories = state
        .categories
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(categories)
}
