use crate::engine::instrumented;
use crate::error::AppError;
use crate::models::courier::{CourierId, CourierProjection};
use crate::models::order::{DeliveryOrder, OrderId};
use crate::state::AppState;

pub async fn get_courier(
    state: &AppState,
    courier_id: CourierId,
) -> Result<CourierProjection, AppError> {
    instrumented(state, "get_courier", async {
        state
            .store
            .begin()
            .courier(courier_id)
            .map(|courier| CourierProjection::from(&courier))
            .ok_or(AppError::CourierNotFound(courier_id))
    })
    .await
}

pub async fn get_order(state: &AppState, order_id: OrderId) -> Result<DeliveryOrder, AppError> {
    instrumented(state, "get_order", async {
        state
            .store
            .begin()
            .order(order_id)
            .ok_or(AppError::OrderNotFound(order_id))
    })
    .await
}
