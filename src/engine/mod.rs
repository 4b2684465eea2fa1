pub mod assignment;
pub mod completion;
pub mod consistency;
pub mod eligibility;
pub mod lookup;
pub mod overlap;
pub mod registration;

use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::batch::BatchId;
use crate::models::courier::Courier;
use crate::state::AppState;
use crate::store::Transaction;

/// Runs one engine operation under the store deadline and records its
/// outcome and latency. A timed-out operation is dropped along with its
/// transaction, so nothing it staged is committed.
pub(crate) async fn instrumented<T, F>(
    state: &AppState,
    operation: &'static str,
    work: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    let start = Instant::now();

    let result = match tokio::time::timeout(state.store_timeout, work).await {
        Ok(result) => result,
        Err(_) => Err(AppError::StoreUnavailable(format!(
            "{operation} did not finish within {:?}",
            state.store_timeout
        ))),
    };

    let outcome = match &result {
        Ok(_) => "success",
        Err(err) => err.kind(),
    };
    state
        .metrics
        .operation_latency_seconds
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .operations_total
        .with_label_values(&[operation, outcome])
        .inc();

    if let Err(err) = &result {
        if err.is_retryable() {
            warn!(operation, error = %err, "operation aborted, retryable");
        } else {
            debug!(operation, error = %err, "operation rejected");
        }
    }

    result
}

/// Clears the courier's open-batch pointer once no member of that batch is
/// both assigned and incomplete, stamping the batch as closed. The courier
/// must be written back by the caller when a batch id is returned.
pub(crate) fn close_batch_if_drained(
    tx: &mut Transaction<'_>,
    courier: &mut Courier,
    now: DateTime<Utc>,
) -> Result<Option<BatchId>, AppError> {
    let Some(batch_id) = courier.open_batch else {
        return Ok(None);
    };

    if tx.batch_members(batch_id).iter().any(|order| order.is_active()) {
        return Ok(None);
    }

    let mut batch = tx.batch(batch_id).ok_or_else(|| {
        AppError::Internal(format!(
            "courier {} points at missing batch {batch_id}",
            courier.id
        ))
    })?;
    batch.closed_at = Some(now);
    tx.put_batch(batch);

    courier.open_batch = None;
    courier.updated_at = now;

    Ok(Some(batch_id))
}
