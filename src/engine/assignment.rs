use chrono::Utc;
use tracing::{debug, info};

use crate::engine::eligibility::find_eligible;
use crate::engine::instrumented;
use crate::error::AppError;
use crate::models::batch::AssignmentOutcome;
use crate::models::courier::CourierId;
use crate::models::event::DispatchEvent;
use crate::state::AppState;

/// Hands the courier a batch of orders.
///
/// While the courier already has an open batch its members are returned
/// unchanged and no matching runs. Otherwise every eligible order is claimed
/// into a new batch; with nothing eligible the result is empty and no batch
/// is created.
pub async fn assign_orders(
    state: &AppState,
    courier_id: CourierId,
) -> Result<AssignmentOutcome, AppError> {
    instrumented(state, "assign", assign(state, courier_id)).await
}

async fn assign(state: &AppState, courier_id: CourierId) -> Result<AssignmentOutcome, AppError> {
    let mut tx = state.store.begin();

    if tx.courier(courier_id).is_none() {
        return Err(AppError::CourierNotFound(courier_id));
    }
    tx.lock_courier(courier_id).await?;
    let mut courier = tx
        .courier(courier_id)
        .ok_or(AppError::CourierNotFound(courier_id))?;

    if let Some(batch_id) = courier.open_batch {
        let batch = tx.batch(batch_id).ok_or_else(|| {
            AppError::Internal(format!(
                "courier {courier_id} points at missing batch {batch_id}"
            ))
        })?;
        let members = tx
            .batch_members(batch_id)
            .into_iter()
            .map(|order| order.id)
            .collect();

        debug!(courier_id, batch_id, "courier already has an open batch");
        return Ok(AssignmentOutcome::new(members, batch.created_at));
    }

    // Held until commit so no other courier can claim what we match here.
    tx.lock_order_pool().await?;
    let eligible = find_eligible(&tx, &courier, state.overlap_boundary);

    if eligible.is_empty() {
        info!(courier_id, "no eligible orders for courier");
        return Ok(AssignmentOutcome::empty());
    }

    let now = Utc::now();
    let batch = tx.open_batch(courier_id, now);
    courier.open_batch = Some(batch.id);
    courier.updated_at = now;
    tx.put_courier(courier);

    let mut order_ids = Vec::with_capacity(eligible.len());
    for mut order in eligible {
        order.assign(courier_id, batch.id);
        order_ids.push(order.id);
        tx.put_order(order);
    }

    let locks = tx.commit();

    let outcome = AssignmentOutcome::new(order_ids, now);

    state
        .metrics
        .orders_assigned_total
        .inc_by(outcome.orders.len() as u64);
    state.metrics.open_batches.inc();

    info!(
        courier_id,
        batch_id = batch.id,
        orders = outcome.orders.len(),
        "batch opened"
    );

    state.publish(DispatchEvent::BatchOpened {
        courier_id,
        batch_id: batch.id,
        order_ids: outcome.order_ids(),
        assign_time: now,
    });
    drop(locks);

    Ok(outcome)
}
