use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::answer::Answer;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AnswerSubmit {
    #[serde(rename = "cau_hoi_id")]
    pub question_id: i32,
    #[serde(rename = "loai_cau_hoi")]
    pub type_tag: String,
    #[serde(rename = "noi_dung", default)]
    pub content: String,
    #[serde(rename = "lua_chon", default)]
    pub choices: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SubmitRequest {
    #[serde(rename = "khao_sat_id")]
    pub form_id: Option<i32>,
    #[serde(default)]
    pub email: Option<String>,
    pub answers: Vec<AnswerSubmit>,
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content: Bytes,
}

/// Attachments of one request, keyed by question id.
pub type Attachments = HashMap<i32, Attachment>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Respondent {
    pub id: i32,
}

#[derive(Debug)]
pub struct Submit {
    pub form_id: i32,
    pub respondent: Option<Respondent>,
    pub request: SubmitRequest,
    pub attachments: Attachments,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Submission {
    pub id: i32,
    pub form_id: i32,
    #[serde(rename = "user_id")]
    pub respondent_id: Option<i32>,
    pub email: Option<String>,
    #[serde(rename = "ngay_gui")]
    pub submitted_at: DateTime<Utc>,
    #[serde(rename = "lan_gui")]
    pub sequence: i32,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub form_id: i32,
    pub respondent_id: Option<i32>,
    pub email: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub sequence: i32,
}

#[derive(Debug, Default)]
pub struct Query {
    pub form_id_eq: i32,
    pub submitted_from: Option<DateTime<Utc>>,
    pub submitted_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: Submission,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Receipt {
    pub id: i32,
    #[serde(rename = "lan_gui")]
    pub sequence: i32,
}
