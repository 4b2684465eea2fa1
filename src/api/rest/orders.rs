use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::engine::assignment::assign_orders;
use crate::engine::completion::complete_order;
use crate::engine::lookup::get_order;
use crate::engine::registration::register_order_elements;
use crate::error::AppError;
use crate::models::batch::AssignmentOutcome;
use crate::models::courier::CourierId;
use crate::models::order::{OrderId, OrderView};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_orders))
        .route("/orders/assign", post(assign))
        .route("/orders/complete", post(complete))
        .route("/orders/:id", get(read_order))
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct IdRef {
    pub id: u64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrdersRequest {
    pub data: Vec<Value>,
}

#[derive(Serialize)]
pub struct CreateOrdersResponse {
    pub orders: Vec<IdRef>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignRequest {
    pub courier_id: CourierId,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteRequest {
    pub courier_id: CourierId,
    pub order_id: OrderId,
    pub complete_time: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    pub order_id: OrderId,
}

async fn create_orders(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateOrdersRequest>,
) -> Result<(StatusCode, Json<CreateOrdersResponse>), AppError> {
    let ids = register_order_elements(&state, payload.data).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrdersResponse {
            orders: ids.into_iter().map(|id| IdRef { id }).collect(),
        }),
    ))
}

async fn assign(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<AssignRequest>,
) -> Result<Json<AssignmentOutcome>, AppError> {
    Ok(Json(assign_orders(&state, payload.courier_id).await?))
}

async fn complete(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CompleteRequest>,
) -> Result<Json<CompleteResponse>, AppError> {
    let order_id = complete_order(
        &state,
        payload.courier_id,
        payload.order_id,
        payload.complete_time,
    )
    .await?;

    Ok(Json(CompleteResponse { order_id }))
}

async fn read_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderView>, AppError> {
    Ok(Json(OrderView::from(get_order(&state, id).await?)))
}
