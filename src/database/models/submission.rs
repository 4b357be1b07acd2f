use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::core::models::submission::Submission;

#[derive(Debug, Clone, FromRow)]
pub struct SubmissionRow {
    pub id: i32,
    pub khao_sat_id: i32,
    pub nguoi_dung_id: Option<i32>,
    pub email: Option<String>,
    pub ngay_gui: DateTime<Utc>,
    pub lan_gui: i32,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        Submission {
            id: row.id,
            form_id: row.khao_sat_id,
            respondent_id: row.nguoi_dung_id,
            email: row.email,
            submitted_at: row.ngay_gui,
            sequence: row.lan_gui,
        }
    }
}
