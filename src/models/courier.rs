use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::batch::BatchId;
use crate::models::hours::TimeRange;

pub type CourierId = u64;
pub type RegionId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourierType {
    Foot,
    Bike,
    Car,
}

impl CourierType {
    /// Maximum total weight the courier type can carry.
    pub fn capacity(&self) -> f64 {
        match self {
            CourierType::Foot => 10.0,
            CourierType::Bike => 15.0,
            CourierType::Car => 50.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CourierType::Foot => "foot",
            CourierType::Bike => "bike",
            CourierType::Car => "car",
        }
    }
}

impl FromStr for CourierType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foot" => Ok(CourierType::Foot),
            "bike" => Ok(CourierType::Bike),
            "car" => Ok(CourierType::Car),
            other => Err(AppError::InvalidAttributes(format!(
                "unknown courier type {other:?}, expected foot/bike/car"
            ))),
        }
    }
}

impl fmt::Display for CourierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: CourierId,
    pub courier_type: CourierType,
    pub regions: BTreeSet<RegionId>,
    pub working_hours: Vec<TimeRange>,
    pub open_batch: Option<BatchId>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload for one courier, kept raw so a bad value can be
/// reported against its id.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourierDraft {
    pub courier_id: CourierId,
    pub courier_type: String,
    pub regions: Vec<RegionId>,
    pub working_hours: Vec<String>,
}

impl CourierDraft {
    pub fn into_courier(self, now: DateTime<Utc>) -> Result<Courier, AppError> {
        let working_hours = TimeRange::parse_all(&self.working_hours)
            .map_err(|err| AppError::InvalidAttributes(err.to_string()))?;

        Ok(Courier {
            id: self.courier_id,
            courier_type: self.courier_type.parse()?,
            regions: self.regions.into_iter().collect(),
            working_hours,
            open_batch: None,
            updated_at: now,
        })
    }
}

/// Attribute changes requested for an existing courier. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourierPatch {
    pub courier_type: Option<CourierType>,
    pub regions: Option<BTreeSet<RegionId>>,
    pub working_hours: Option<Vec<TimeRange>>,
}

impl CourierPatch {
    pub fn is_empty(&self) -> bool {
        self.courier_type.is_none() && self.regions.is_none() && self.working_hours.is_none()
    }

    /// Writes the requested fields into `courier` and reports whether any
    /// value actually differed from what was stored.
    pub fn apply_to(&self, courier: &mut Courier) -> bool {
        let mut changed = false;

        if let Some(courier_type) = self.courier_type {
            changed |= courier.courier_type != courier_type;
            courier.courier_type = courier_type;
        }
        if let Some(regions) = &self.regions {
            changed |= &courier.regions != regions;
            courier.regions = regions.clone();
        }
        if let Some(working_hours) = &self.working_hours {
            changed |= &courier.working_hours != working_hours;
            courier.working_hours = working_hours.clone();
        }

        changed
    }
}

/// The courier view returned to callers after reads and updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourierProjection {
    pub courier_id: CourierId,
    pub courier_type: CourierType,
    pub regions: Vec<RegionId>,
    pub working_hours: Vec<TimeRange>,
}

impl From<&Courier> for CourierProjection {
    fn from(courier: &Courier) -> Self {
        Self {
            courier_id: courier.id,
            courier_type: courier.courier_type,
            regions: courier.regions.iter().copied().collect(),
            working_hours: courier.working_hours.clone(),
        }
    }
}
