//! Business-day arithmetic and case identifier generation.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::Rng;
use tracing::warn;

use super::cases::{CaseId, StoreError};

/// Source of the last-used case sequence per (year, organisation).
pub trait SequenceSource: Send + Sync {
    /// Reserve and return the next sequence number for the pair.
    fn next_sequence(&self, year: i32, org_code: &str) -> Result<u32, StoreError>;
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Walk forward one calendar day at a time, counting only weekdays, until `n`
/// business days have been added. No holiday calendar is applied.
pub fn add_business_days(start: NaiveDate, n: u32) -> NaiveDate {
    let mut current = start;
    let mut added = 0;
    while added < n {
        current += Duration::days(1);
        if is_business_day(current) {
            added += 1;
        }
    }
    current
}

/// Business days in `(start, end]`.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut count = 0;
    let mut current = start;
    while current < end {
        current += Duration::days(1);
        if is_business_day(current) {
            count += 1;
        }
    }
    count
}

/// Calendar days left until the deadline; negative once it has passed.
pub fn days_remaining(deadline: NaiveDate, today: NaiveDate) -> i64 {
    (deadline - today).num_days()
}

#[derive(Debug, Clone)]
pub struct DeadlineCalculator {
    prefix: String,
}

impl DeadlineCalculator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim().to_ascii_uppercase(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Compose `PREFIX-YEAR-ORG-SEQ`. When the store cannot hand out the next
    /// sequence a random five digit value is used instead, which may collide.
    pub fn generate_identifier(
        &self,
        sequences: &dyn SequenceSource,
        org_code: &str,
        today: NaiveDate,
    ) -> CaseId {
        let org_code = org_code.trim().to_ascii_uppercase();
        let year = today.year();
        let sequence = match sequences.next_sequence(year, &org_code) {
            Ok(sequence) => sequence,
            Err(error) => {
                let fallback = rand::rng().random_range(10_000..=99_999);
                warn!(
                    %error,
                    year,
                    org_code = %org_code,
                    fallback,
                    "sequence unavailable; using random case sequence"
                );
                fallback
            }
        };

        CaseId(format!("{}-{year}-{org_code}-{sequence:05}", self.prefix))
    }

    /// Deadlines always land on a business day, even for a zero-day SLA
    /// counted from a weekend.
    pub fn deadline_for(&self, start: NaiveDate, sla_days: u32) -> NaiveDate {
        let due = add_business_days(start, sla_days);
        if is_business_day(due) {
            due
        } else {
            add_business_days(due, 1)
        }
    }
}

impl Default for DeadlineCalculator {
    fn default() -> Self {
        Self::new("EXP")
    }
}
