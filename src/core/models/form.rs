use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    Draft,
    #[default]
    Active,
    Archived,
    Deleted,
}

impl FromStr for FormStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(FormStatus::Draft),
            "active" => Ok(FormStatus::Active),
            "archived" => Ok(FormStatus::Archived),
            "deleted" => Ok(FormStatus::Deleted),
            other => Err(Error::ServerError(format!("unknown form status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Form {
    pub id: i32,
    pub title: String,
    pub status: FormStatus,
    pub owner_id: Option<i32>,
    pub response_count: i32,
    #[serde(skip)]
    pub settings_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Form {
    pub fn is_deleted(&self) -> bool {
        self.status == FormStatus::Deleted
    }

    pub fn is_owned_by(&self, uid: i32) -> bool {
        self.owner_id == Some(uid)
    }
}
