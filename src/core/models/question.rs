use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    #[default]
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    Rating,
    FillBlank,
    UploadFile,
}

impl QuestionType {
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "SINGLE_CHOICE",
            QuestionType::MultipleChoice => "MULTIPLE_CHOICE",
            QuestionType::TrueFalse => "TRUE_FALSE",
            QuestionType::Rating => "RATING",
            QuestionType::FillBlank => "FILL_BLANK",
            QuestionType::UploadFile => "UPLOAD_FILE",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for QuestionType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SINGLE_CHOICE" => Ok(QuestionType::SingleChoice),
            "MULTIPLE_CHOICE" => Ok(QuestionType::MultipleChoice),
            "TRUE_FALSE" => Ok(QuestionType::TrueFalse),
            "RATING" => Ok(QuestionType::Rating),
            "FILL_BLANK" => Ok(QuestionType::FillBlank),
            "UPLOAD_FILE" => Ok(QuestionType::UploadFile),
            other => Err(Error::MalformedRequest(format!("unknown question type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuestionProps {
    #[serde(default)]
    pub required: bool,
}

impl QuestionProps {
    /// Props are authored elsewhere; a broken blob is logged and treated as
    /// "no properties" rather than blocking submissions.
    pub fn parse_lenient(question_id: i32, raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|r| !r.is_empty()) {
            None => Self::default(),
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                warn!("failed to parse props of question {}: {}", question_id, e);
                Self::default()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Opt {
    pub id: i32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Question {
    pub id: i32,
    pub form_id: i32,
    pub content: String,
    pub type_: QuestionType,
    pub order: i32,
    pub props: QuestionProps,
    pub options: Vec<Opt>,
}

impl Question {
    pub fn is_required(&self) -> bool {
        self.props.required
    }

    /// Option named by `choice`, either its label or its id.
    pub fn option_for(&self, choice: &str) -> Option<&Opt> {
        self.options.iter().find(|o| o.label == choice || o.id.to_string() == choice)
    }
}

#[derive(Debug, Default)]
pub struct Query {
    pub form_id_eq: i32,
}
