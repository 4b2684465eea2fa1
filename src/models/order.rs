use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::batch::BatchId;
use crate::models::courier::{CourierId, RegionId};
use crate::models::hours::TimeRange;

pub type OrderId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOrder {
    pub id: OrderId,
    pub weight: f64,
    pub region: RegionId,
    pub delivery_hours: Vec<TimeRange>,
    pub assigned_courier: Option<CourierId>,
    pub batch: Option<BatchId>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryOrder {
    pub fn status(&self) -> OrderStatus {
        if self.completed {
            OrderStatus::Completed
        } else if self.assigned_courier.is_some() {
            OrderStatus::Assigned
        } else {
            OrderStatus::Pending
        }
    }

    /// Assigned to some courier and still waiting for delivery.
    pub fn is_active(&self) -> bool {
        !self.completed && self.assigned_courier.is_some()
    }

    pub fn assign(&mut self, courier_id: CourierId, batch_id: BatchId) {
        self.assigned_courier = Some(courier_id);
        self.batch = Some(batch_id);
    }

    /// Returns the order to the unassigned pool.
    pub fn revoke(&mut self) {
        self.assigned_courier = None;
        self.batch = None;
    }
}

/// Registration payload for one order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderDraft {
    pub order_id: OrderId,
    pub weight: f64,
    pub region: RegionId,
    pub delivery_hours: Vec<String>,
}

impl OrderDraft {
    pub fn into_order(self, now: DateTime<Utc>) -> Result<DeliveryOrder, AppError> {
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(AppError::InvalidAttributes(format!(
                "order {} weight must be a positive number, got {}",
                self.order_id, self.weight
            )));
        }

        let delivery_hours = TimeRange::parse_all(&self.delivery_hours)
            .map_err(|err| AppError::InvalidAttributes(err.to_string()))?;

        Ok(DeliveryOrder {
            id: self.order_id,
            weight: self.weight,
            region: self.region,
            delivery_hours,
            assigned_courier: None,
            batch: None,
            completed: false,
            completed_at: None,
            created_at: now,
        })
    }
}

/// Order as presented over the API, with its derived status.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: DeliveryOrder,
    pub status: OrderStatus,
}

impl From<DeliveryOrder> for OrderView {
    fn from(order: DeliveryOrder) -> Self {
        let status = order.status();
        Self { order, status }
    }
}
