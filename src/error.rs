use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;

use crate::jsonwebtoken::errors::Error as JsonWebTokenError;
use crate::thiserror::Error as ThisError;
use std::num;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("form {0} not found")]
    FormNotFound(i32),

    #[error("form {form_id} is not accepting submissions: {reason}")]
    FormNotAcceptingSubmissions { form_id: i32, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidSettingsFormat(String),

    #[error("invalid settings value: {0}")]
    InvalidSettingsValue(String),

    #[error("invalid settings: {0}")]
    InvalidSettingsPatch(String),

    #[error("the form has reached its limit of {quota} responses")]
    QuotaExceeded { quota: i64 },

    #[error("this form requires login")]
    LoginRequired,

    #[error("this form requires an email address")]
    EmailRequired,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("question {0} does not belong to this form")]
    UnknownQuestion(i32),

    #[error("question {question_id} is required")]
    RequiredAnswerMissing { question_id: i32 },

    #[error("invalid answer for question {question_id}: {reason}")]
    InvalidAnswer { question_id: i32, reason: String },

    #[error("invalid attachment for question {question_id}: {reason}")]
    InvalidAttachment { question_id: i32, reason: String },

    #[error("upload failed for question {question_id}: {reason}")]
    UploadFailed { question_id: i32, reason: String },

    #[error("the submission conflicted with a concurrent submission, please retry")]
    ConcurrentSubmissionConflict,

    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("jwt error: {0}")]
    JWTError(#[from] JsonWebTokenError),

    #[error("parse int error: {0}")]
    ParseIntError(#[from] num::ParseIntError),

    #[error("server error: {0}")]
    ServerError(String),
}

impl Error {
    fn question_id(&self) -> Option<i32> {
        match self {
            Error::UnknownQuestion(question_id)
            | Error::RequiredAnswerMissing { question_id }
            | Error::InvalidAnswer { question_id, .. }
            | Error::InvalidAttachment { question_id, .. }
            | Error::UploadFailed { question_id, .. } => Some(*question_id),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    question_id: Option<i32>,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::MalformedRequest(_)
            | Error::EmailRequired
            | Error::InvalidEmail(_)
            | Error::UnknownQuestion(_)
            | Error::RequiredAnswerMissing { .. }
            | Error::InvalidAnswer { .. }
            | Error::InvalidAttachment { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidSettingsPatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::FormNotFound(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::FormNotAcceptingSubmissions { .. } | Error::QuotaExceeded { .. } | Error::Forbidden => StatusCode::FORBIDDEN,
            Error::LoginRequired | Error::Unauthorized | Error::JWTError(_) => StatusCode::UNAUTHORIZED,
            Error::ConcurrentSubmissionConflict => StatusCode::CONFLICT,
            Error::UploadFailed { .. } => StatusCode::BAD_GATEWAY,
            Error::InvalidSettingsFormat(_)
            | Error::InvalidSettingsValue(_)
            | Error::PersistenceFailure(_)
            | Error::IoError(_)
            | Error::ParseIntError(_)
            | Error::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("{}", self);
            "internal server error".to_owned()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ErrorBody {
            error: message,
            question_id: self.question_id(),
        })
    }
}
