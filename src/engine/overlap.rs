use std::str::FromStr;

use chrono::NaiveTime;

use crate::models::hours::TimeRange;

/// How touching interval endpoints are treated.
///
/// `Inclusive` treats ranges as closed, so `09:00-10:00` and `10:00-11:00`
/// overlap at 10:00. `Exclusive` requires a shared stretch of non-zero
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryPolicy {
    #[default]
    Inclusive,
    Exclusive,
}

impl BoundaryPolicy {
    pub fn overlaps(
        &self,
        a_start: NaiveTime,
        a_stop: NaiveTime,
        b_start: NaiveTime,
        b_stop: NaiveTime,
    ) -> bool {
        match self {
            BoundaryPolicy::Inclusive => a_start <= b_stop && b_start <= a_stop,
            BoundaryPolicy::Exclusive => a_start < b_stop && b_start < a_stop,
        }
    }

    pub fn ranges_overlap(&self, a: &TimeRange, b: &TimeRange) -> bool {
        self.overlaps(a.start(), a.stop(), b.start(), b.stop())
    }

    /// True when at least one working range overlaps at least one delivery
    /// range.
    pub fn time_compatible(&self, working_hours: &[TimeRange], delivery_hours: &[TimeRange]) -> bool {
        working_hours.iter().any(|working| {
            delivery_hours
                .iter()
                .any(|delivery| self.ranges_overlap(working, delivery))
        })
    }
}

impl FromStr for BoundaryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inclusive" => Ok(BoundaryPolicy::Inclusive),
            "exclusive" => Ok(BoundaryPolicy::Exclusive),
            other => Err(format!(
                "unknown overlap boundary {other:?}, expected inclusive/exclusive"
            )),
        }
    }
}
