use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::api::rest::orders::IdRef;
use crate::engine::consistency::update_courier;
use crate::engine::lookup::get_courier;
use crate::engine::registration::register_courier_elements;
use crate::error::AppError;
use crate::models::courier::{CourierId, CourierPatch, CourierProjection, CourierType, RegionId};
use crate::models::hours::TimeRange;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_couriers))
        .route("/couriers/:id", get(read_courier).patch(patch_courier))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCouriersRequest {
    pub data: Vec<Value>,
}

#[derive(Serialize)]
pub struct CreateCouriersResponse {
    pub couriers: Vec<IdRef>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchCourierRequest {
    pub courier_type: Option<String>,
    pub regions: Option<Vec<RegionId>>,
    pub working_hours: Option<Vec<String>>,
}

impl TryFrom<PatchCourierRequest> for CourierPatch {
    type Error = AppError;

    fn try_from(request: PatchCourierRequest) -> Result<Self, Self::Error> {
        let courier_type = request
            .courier_type
            .as_deref()
            .map(str::parse::<CourierType>)
            .transpose()?;
        let working_hours = request
            .working_hours
            .as_deref()
            .map(|raw| TimeRange::parse_all(raw))
            .transpose()
            .map_err(|err| AppError::InvalidAttributes(err.to_string()))?;

        Ok(CourierPatch {
            courier_type,
            regions: request.regions.map(|regions| regions.into_iter().collect()),
            working_hours,
        })
    }
}

async fn create_couriers(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateCouriersRequest>,
) -> Result<(StatusCode, Json<CreateCouriersResponse>), AppError> {
    let ids = register_courier_elements(&state, payload.data).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCouriersResponse {
            couriers: ids.into_iter().map(|id| IdRef { id }).collect(),
        }),
    ))
}

async fn read_courier(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<CourierId>,
) -> Result<Json<CourierProjection>, AppError> {
    Ok(Json(get_courier(&state, id).await?))
}

async fn patch_courier(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<CourierId>,
    ApiJson(payload): ApiJson<PatchCourierRequest>,
) -> Result<Json<CourierProjection>, AppError> {
    let patch = CourierPatch::try_from(payload)?;
    Ok(Json(update_courier(&state, id, patch).await?))
}
