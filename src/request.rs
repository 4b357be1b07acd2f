use chrono::{Duration, NaiveDate, TimeZone, Utc};

use crate::core::models::{common::Pagination, submission::Query as SubmissionQuery};
use crate::error::Error;
use crate::serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SubmissionListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Inclusive, `YYYY-MM-DD` in UTC.
    pub start_date: Option<NaiveDate>,
    /// Inclusive, `YYYY-MM-DD` in UTC.
    pub end_date: Option<NaiveDate>,
}

impl SubmissionListParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_page(self.page, self.limit)
    }

    pub fn to_query(&self, form_id: i32) -> Result<SubmissionQuery, Error> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(Error::MalformedRequest("end_date is before start_date".into()));
            }
        }
        let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|t| Utc.from_utc_datetime(&t));
        Ok(SubmissionQuery {
            form_id_eq: form_id,
            submitted_from: self.start_date.and_then(midnight),
            submitted_before: self.end_date.and_then(|d| d.checked_add_signed(Duration::days(1))).and_then(midnight),
        })
    }
}
