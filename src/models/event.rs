use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::batch::BatchId;
use crate::models::courier::CourierId;
use crate::models::order::OrderId;

/// Why an order is not compatible with a courier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Incompatibility {
    Overweight,
    RegionNotServed,
    NoTimeOverlap,
}

impl Incompatibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Incompatibility::Overweight => "overweight",
            Incompatibility::RegionNotServed => "region_not_served",
            Incompatibility::NoTimeOverlap => "no_time_overlap",
        }
    }
}

/// Committed state changes, broadcast to websocket subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    BatchOpened {
        courier_id: CourierId,
        batch_id: BatchId,
        order_ids: Vec<OrderId>,
        assign_time: DateTime<Utc>,
    },
    OrderRevoked {
        courier_id: CourierId,
        order_id: OrderId,
        reason: Incompatibility,
    },
    OrderCompleted {
        courier_id: CourierId,
        order_id: OrderId,
        complete_time: DateTime<Utc>,
    },
    BatchClosed {
        courier_id: CourierId,
        batch_id: BatchId,
    },
}
