use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::core::models::form::Form;
use crate::error::Error;

#[derive(Debug, Clone, FromRow)]
pub struct FormRow {
    pub id: i32,
    pub tieu_de: String,
    pub trang_thai: String,
    pub nguoi_tao_id: Option<i32>,
    pub so_phan_hoi: i32,
    pub settings_json: Option<String>,
    pub ngay_tao: DateTime<Utc>,
}

impl TryFrom<FormRow> for Form {
    type Error = Error;
    fn try_from(row: FormRow) -> Result<Self, Self::Error> {
        Ok(Form {
            id: row.id,
            title: row.tieu_de,
            status: row.trang_thai.parse()?,
            owner_id: row.nguoi_tao_id,
            response_count: row.so_phan_hoi,
            settings_json: row.settings_json,
            created_at: row.ngay_tao,
        })
    }
}
