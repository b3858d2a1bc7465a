pub mod store;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use shared::{ApiError, Item, NewPoint};
use tower_http::cors::CorsLayer;

use crate::store::{PointStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PointStore>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/items", get(items_handler))
        .route("/api/points", post(create_point_handler))
        // Frontend is served from another origin.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn items_handler(State(state): State<AppState>) -> Json<Vec<Item>> {
    Json(state.store.items().to_vec())
}

async fn create_point_handler(
    State(state): State<AppState>,
    Json(req): Json<NewPoint>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let record = state.store.create_point(req).map_err(store_error)?;
    tracing::info!(
        "created collection point id={} uf={} city={}",
        record.id,
        record.point.uf,
        record.point.city
    );
    Ok((StatusCode::CREATED, Json(record)))
}

fn store_error(err: StoreError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        StoreError::UnknownItem(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
