use chrono::{DateTime, Utc};
use tracing::info;

use crate::engine::{close_batch_if_drained, instrumented};
use crate::error::AppError;
use crate::models::courier::CourierId;
use crate::models::event::DispatchEvent;
use crate::models::order::OrderId;
use crate::state::AppState;

/// Marks the order delivered by its assigned courier. Completion is final:
/// the courier and batch references stay on the order as history.
pub async fn complete_order(
    state: &AppState,
    courier_id: CourierId,
    order_id: OrderId,
    complete_time: DateTime<Utc>,
) -> Result<OrderId, AppError> {
    instrumented(
        state,
        "complete_order",
        complete(state, courier_id, order_id, complete_time),
    )
    .await
}

async fn complete(
    state: &AppState,
    courier_id: CourierId,
    order_id: OrderId,
    complete_time: DateTime<Utc>,
) -> Result<OrderId, AppError> {
    let mut tx = state.store.begin();

    let order = tx.order(order_id).ok_or(AppError::OrderNotFound(order_id))?;
    if order.assigned_courier != Some(courier_id) {
        return Err(AppError::OwnershipMismatch {
            courier_id,
            order_id,
        });
    }

    // Revocation may have moved the order while we waited for the lock.
    tx.lock_courier(courier_id).await?;
    let mut order = tx.order(order_id).ok_or(AppError::OrderNotFound(order_id))?;
    if order.assigned_courier != Some(courier_id) {
        return Err(AppError::OwnershipMismatch {
            courier_id,
            order_id,
        });
    }
    if order.completed {
        return Err(AppError::AlreadyCompleted(order_id));
    }

    order.completed = true;
    order.completed_at = Some(complete_time);
    tx.put_order(order);

    let mut courier = tx
        .courier(courier_id)
        .ok_or(AppError::CourierNotFound(courier_id))?;
    let closed = close_batch_if_drained(&mut tx, &mut courier, Utc::now())?;
    if closed.is_some() {
        tx.put_courier(courier);
    }

    let locks = tx.commit();

    info!(
        courier_id,
        order_id,
        batch_closed = closed.is_some(),
        "order completed"
    );

    state.publish(DispatchEvent::OrderCompleted {
        courier_id,
        order_id,
        complete_time,
    });
    if let Some(batch_id) = closed {
        state.metrics.open_batches.dec();
        state.publish(DispatchEvent::BatchClosed {
            courier_id,
            batch_id,
        });
    }
    drop(locks);

    Ok(order_id)
}
