//! Submission date ranges

use crate::edinet::errors::{EdinetError, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use tracing::info;

/// Every calendar date from `start_date` through `end_date`, inclusive.
///
/// `end_date` defaults to today's local date. Fails with
/// [`EdinetError::InvalidRange`] when the end precedes the start.
pub fn generate_date_sequence(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Result<Vec<NaiveDate>> {
    let end_date = end_date.unwrap_or_else(|| Local::now().date_naive());

    if end_date < start_date {
        return Err(EdinetError::InvalidRange {
            start: start_date,
            end: end_date,
        });
    }

    info!("Date range {} to {}", start_date, end_date);

    let total_days = (end_date - start_date).num_days() + 1;
    Ok((0..total_days)
        .map(|i| start_date + ChronoDuration::days(i))
        .collect())
}
