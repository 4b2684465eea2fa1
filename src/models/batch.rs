use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::courier::CourierId;
use crate::models::order::OrderId;

pub type BatchId = u64;

/// One assignment event: the group of orders handed to a courier at once.
/// Membership is implicit through `DeliveryOrder::batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub courier_id: CourierId,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderRef {
    pub id: OrderId,
}

/// Result of an assign request. `assign_time` is absent when nothing was
/// eligible and no batch exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentOutcome {
    pub orders: Vec<OrderRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_time: Option<DateTime<Utc>>,
}

impl AssignmentOutcome {
    pub fn empty() -> Self {
        Self {
            orders: Vec::new(),
            assign_time: None,
        }
    }

    pub fn new(mut order_ids: Vec<OrderId>, assign_time: DateTime<Utc>) -> Self {
        order_ids.sort_unstable();
        Self {
            orders: order_ids.into_iter().map(|id| OrderRef { id }).collect(),
            assign_time: Some(assign_time),
        }
    }

    pub fn order_ids(&self) -> Vec<OrderId> {
        self.orders.iter().map(|order| order.id).collect()
    }
}
