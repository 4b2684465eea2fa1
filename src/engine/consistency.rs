use chrono::Utc;
use tracing::{debug, info};

use crate::engine::eligibility::incompatibility;
use crate::engine::{close_batch_if_drained, instrumented};
use crate::error::AppError;
use crate::models::courier::{CourierId, CourierPatch, CourierProjection};
use crate::models::event::DispatchEvent;
use crate::state::AppState;

/// Applies `patch` to the courier and revokes every assignment the new
/// attributes no longer allow.
///
/// Revoked orders go back to the unassigned pool. When nothing active is
/// left in the courier's open batch, the batch is closed. All of it commits
/// together or not at all.
pub async fn update_courier(
    state: &AppState,
    courier_id: CourierId,
    patch: CourierPatch,
) -> Result<CourierProjection, AppError> {
    instrumented(state, "update_courier", update(state, courier_id, patch)).await
}

async fn update(
    state: &AppState,
    courier_id: CourierId,
    patch: CourierPatch,
) -> Result<CourierProjection, AppError> {
    let mut tx = state.store.begin();

    let Some(current) = tx.courier(courier_id) else {
        return Err(AppError::CourierNotFound(courier_id));
    };
    if patch.is_empty() {
        return Ok(CourierProjection::from(&current));
    }

    tx.lock_courier(courier_id).await?;
    let mut courier = tx
        .courier(courier_id)
        .ok_or(AppError::CourierNotFound(courier_id))?;

    if !patch.apply_to(&mut courier) {
        debug!(courier_id, "courier patch changes nothing");
        return Ok(CourierProjection::from(&courier));
    }

    let now = Utc::now();
    courier.updated_at = now;

    let mut events = Vec::new();
    let active = tx.orders_matching(|order| {
        order.assigned_courier == Some(courier_id) && !order.completed
    });

    for mut order in active {
        let Some(reason) = incompatibility(&order, &courier, state.overlap_boundary) else {
            continue;
        };

        debug!(courier_id, order_id = order.id, reason = reason.as_str(), "revoking order");
        order.revoke();
        events.push(DispatchEvent::OrderRevoked {
            courier_id,
            order_id: order.id,
            reason,
        });
        tx.put_order(order);
    }

    let closed = close_batch_if_drained(&mut tx, &mut courier, now)?;
    if let Some(batch_id) = closed {
        events.push(DispatchEvent::BatchClosed {
            courier_id,
            batch_id,
        });
    }

    let projection = CourierProjection::from(&courier);
    tx.put_courier(courier);
    let locks = tx.commit();

    let mut revoked = 0usize;
    for event in &events {
        if let DispatchEvent::OrderRevoked { reason, .. } = event {
            revoked += 1;
            state
                .metrics
                .revocations_total
                .with_label_values(&[reason.as_str()])
                .inc();
        }
    }
    if closed.is_some() {
        state.metrics.open_batches.dec();
    }

    info!(
        courier_id,
        revoked,
        batch_closed = closed.is_some(),
        "courier updated"
    );

    for event in events {
        state.publish(event);
    }
    drop(locks);

    Ok(projection)
}
