//! Bulk registration of couriers and orders.
//!
//! A request is all-or-nothing: every element is validated first, and a
//! single bad element rejects the whole request with the ids of all the
//! offending elements. Nothing is written in that case.

use std::collections::HashSet;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::engine::instrumented;
use crate::error::{AppError, RegistrationKind};
use crate::models::courier::{Courier, CourierDraft, CourierId};
use crate::models::order::{OrderDraft, OrderId};
use crate::state::AppState;

pub async fn register_couriers(
    state: &AppState,
    drafts: Vec<CourierDraft>,
) -> Result<Vec<CourierId>, AppError> {
    let rejected = Rejected::new(RegistrationKind::Couriers);
    instrumented(state, "register_couriers", couriers(state, drafts, rejected)).await
}

pub async fn register_orders(
    state: &AppState,
    drafts: Vec<OrderDraft>,
) -> Result<Vec<OrderId>, AppError> {
    let rejected = Rejected::new(RegistrationKind::Orders);
    instrumented(state, "register_orders", orders(state, drafts, rejected)).await
}

/// Registers couriers from raw JSON elements. An element that does not
/// decode into a draft (unknown or missing key, wrong value type) is
/// rejected under its `courier_id` together with any other bad element.
pub async fn register_courier_elements(
    state: &AppState,
    elements: Vec<Value>,
) -> Result<Vec<CourierId>, AppError> {
    instrumented(state, "register_couriers", async {
        let mut rejected = Rejected::new(RegistrationKind::Couriers);
        let drafts = decode_elements(elements, "courier_id", &mut rejected)?;
        couriers(state, drafts, rejected).await
    })
    .await
}

/// Order counterpart of [`register_courier_elements`], keyed by `order_id`.
pub async fn register_order_elements(
    state: &AppState,
    elements: Vec<Value>,
) -> Result<Vec<OrderId>, AppError> {
    instrumented(state, "register_orders", async {
        let mut rejected = Rejected::new(RegistrationKind::Orders);
        let drafts = decode_elements(elements, "order_id", &mut rejected)?;
        orders(state, drafts, rejected).await
    })
    .await
}

/// Elements without a numeric id cannot be reported by id and fail the
/// request as a bad request instead.
fn decode_elements<D: DeserializeOwned>(
    elements: Vec<Value>,
    id_key: &str,
    rejected: &mut Rejected,
) -> Result<Vec<D>, AppError> {
    let mut drafts = Vec::with_capacity(elements.len());

    for (index, element) in elements.into_iter().enumerate() {
        let Some(id) = element.get(id_key).and_then(Value::as_u64) else {
            return Err(AppError::BadRequest(format!(
                "data[{index}] has no numeric {id_key}"
            )));
        };
        match serde_json::from_value::<D>(element) {
            Ok(draft) => drafts.push(draft),
            Err(err) => rejected.push(id, &err.to_string()),
        }
    }

    Ok(drafts)
}

async fn couriers(
    state: &AppState,
    drafts: Vec<CourierDraft>,
    mut rejected: Rejected,
) -> Result<Vec<CourierId>, AppError> {
    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut couriers = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let id = draft.courier_id;
        if !seen.insert(id) {
            rejected.push(id, "duplicated in request");
            continue;
        }
        match draft.into_courier(now) {
            Ok(courier) => couriers.push(courier),
            Err(err) => rejected.push(id, &err.to_string()),
        }
    }
    rejected.check()?;

    let ids: Vec<CourierId> = couriers.iter().map(|courier| courier.id).collect();
    let result = insert_couriers(state, couriers, &mut rejected).await;
    if result.is_err() {
        state.store.release_unused_courier_locks(&ids);
    }
    result?;

    info!(count = ids.len(), "couriers registered");
    Ok(ids)
}

async fn insert_couriers(
    state: &AppState,
    couriers: Vec<Courier>,
    rejected: &mut Rejected,
) -> Result<(), AppError> {
    let mut tx = state.store.begin();

    // Known ids are turned away before any lock entry is created for them.
    for courier in &couriers {
        if tx.courier(courier.id).is_some() {
            rejected.push(courier.id, "already registered");
        }
    }
    rejected.check()?;

    tx.lock_couriers(couriers.iter().map(|courier| courier.id)).await?;
    for courier in &couriers {
        if tx.courier(courier.id).is_some() {
            rejected.push(courier.id, "already registered");
        }
    }
    rejected.check()?;

    for courier in couriers {
        tx.put_courier(courier);
    }
    tx.commit();
    Ok(())
}

async fn orders(
    state: &AppState,
    drafts: Vec<OrderDraft>,
    mut rejected: Rejected,
) -> Result<Vec<OrderId>, AppError> {
    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut orders = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let id = draft.order_id;
        if !seen.insert(id) {
            rejected.push(id, "duplicated in request");
            continue;
        }
        match draft.into_order(now) {
            Ok(order) => orders.push(order),
            Err(err) => rejected.push(id, &err.to_string()),
        }
    }
    rejected.check()?;

    let mut tx = state.store.begin();
    tx.lock_order_pool().await?;

    for order in &orders {
        if tx.order(order.id).is_some() {
            rejected.push(order.id, "already registered");
        }
    }
    rejected.check()?;

    let ids: Vec<OrderId> = orders.iter().map(|order| order.id).collect();
    for order in orders {
        tx.put_order(order);
    }
    tx.commit();

    info!(count = ids.len(), "orders registered");
    Ok(ids)
}

struct Rejected {
    kind: RegistrationKind,
    ids: Vec<u64>,
}

impl Rejected {
    fn new(kind: RegistrationKind) -> Self {
        Self {
            kind,
            ids: Vec::new(),
        }
    }

    fn push(&mut self, id: u64, reason: &str) {
        debug!(kind = self.kind.as_str(), id, reason, "registration element rejected");
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    fn check(&mut self) -> Result<(), AppError> {
        if self.ids.is_empty() {
            return Ok(());
        }
        Err(AppError::RegistrationRejected {
            kind: self.kind,
            ids: std::mem::take(&mut self.ids),
        })
    }
}
