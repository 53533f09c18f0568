use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick", value_type = String)]
    pub leave_type: String,
    #[schema(example = "pending", value_type = String)]
    pub status: Option<String>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    /// Leave spans whole days, both endpoints included.
    pub fn units(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// True when this request shares at least one calendar day with the
    /// given span.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }
}

/// Per-type entitlement ledger row. Invariant kept by `core::ledger`:
/// consumed + reserved never exceeds entitled.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "employee_id": 1000,
    "leave_type": "annual",
    "entitled": 20,
    "consumed": 3,
    "reserved": 2
}))]
pub struct LeaveBalance {
    pub employee_id: u64,
    #[schema(value_type = String)]
    pub leave_type: String,
    pub entitled: i64,
    pub consumed: i64,
    pub reserved: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id: 1000,
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            leave_type: "annual".into(),
            status: Some("pending".into()),
            created_at: None,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn units_include_both_endpoints() {
        assert_eq!(request("2026-01-01", "2026-01-03").units(), 3);
        assert_eq!(request("2026-01-01", "2026-01-01").units(), 1);
    }

    #[test]
    fn identical_spans_overlap() {
        let r = request("2026-01-05", "2026-01-07");
        assert!(r.overlaps(day("2026-01-05"), day("2026-01-07")));
    }

    #[test]
    fn partial_and_contained_spans_overlap() {
        let r = request("2026-01-05", "2026-01-07");
        assert!(r.overlaps(day("2026-01-07"), day("2026-01-09")));
        assert!(r.overlaps(day("2026-01-01"), day("2026-01-05")));
        assert!(r.overlaps(day("2026-01-06"), day("2026-01-06")));
        assert!(r.overlaps(day("2026-01-01"), day("2026-01-31")));
    }

    #[test]
    fn disjoint_spans_do_not_overlap() {
        let r = request("2026-01-05", "2026-01-07");
        assert!(!r.overlaps(day("2026-01-08"), day("2026-01-10")));
        assert!(!r.overlaps(day("2026-01-01"), day("2026-01-04")));
    }
}
