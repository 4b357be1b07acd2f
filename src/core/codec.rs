//! Per question type validation and encoding of answers.
//!
//! Encoding runs in two phases. `prepare` is pure and runs for every answer of
//! a request before anything is written; `finish` performs the upload of an
//! already checked attachment. A bad attachment therefore aborts the request
//! before the uploader has been called for any answer.

use bytes::Bytes;
use log::debug;
use serde_json::Value;

use crate::core::models::{
    answer::StoredAnswer,
    question::{Question, QuestionType},
    submission::{AnswerSubmit, Attachment},
    upload_file::UploadedFileCreate,
};
use crate::core::ports::uploader::AttachmentUploader;
use crate::error::Error;

pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 10 << 20;
pub const ANSWER_FOLDER: &str = "answers";

const ALLOWED_CONTENT_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[derive(Debug, Clone, Copy)]
pub struct AttachmentPolicy {
    pub max_bytes: usize,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

/// Decoded answer value. Choices keep the selections exactly as submitted,
/// option ids and labels alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Choices(Vec<Value>),
    Text(String),
    FileReference(String),
}

#[derive(Debug, Clone)]
pub struct CheckedAttachment {
    pub question_id: i32,
    pub extension: String,
    pub content_type: &'static str,
    pub content: Bytes,
}

#[derive(Debug, Clone)]
pub enum Prepared {
    Ready(StoredAnswer),
    Upload(CheckedAttachment),
}

/// The codec family a question type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Choice { single: bool, boolean: bool },
    Text,
    File,
}

impl From<QuestionType> for Codec {
    fn from(t: QuestionType) -> Self {
        match t {
            QuestionType::SingleChoice => Codec::Choice { single: true, boolean: false },
            QuestionType::MultipleChoice => Codec::Choice { single: false, boolean: false },
            QuestionType::TrueFalse => Codec::Choice { single: true, boolean: true },
            QuestionType::Rating | QuestionType::FillBlank => Codec::Text,
            QuestionType::UploadFile => Codec::File,
        }
    }
}

impl Codec {
    pub fn is_empty(&self, answer: Option<&AnswerSubmit>, attachment: Option<&Attachment>) -> bool {
        match self {
            Codec::Choice { .. } => answer.map_or(true, |a| {
                let raw = a.choices.trim();
                raw.is_empty() || raw == "[]"
            }),
            Codec::Text => answer.map_or(true, |a| a.content.trim().is_empty()),
            Codec::File => attachment.is_none(),
        }
    }

    pub fn prepare(&self, question: &Question, answer: &AnswerSubmit, attachment: Option<Attachment>, policy: &AttachmentPolicy) -> Result<Prepared, Error> {
        match self {
            Codec::Choice { single, boolean } => encode_choices(question, &answer.choices, *single, *boolean).map(Prepared::Ready),
            Codec::Text => Ok(Prepared::Ready(StoredAnswer::Text(answer.content.clone()))),
            Codec::File => {
                let attachment = attachment.ok_or_else(|| Error::InvalidAttachment {
                    question_id: question.id,
                    reason: "missing file".into(),
                })?;
                check_attachment(question.id, attachment, policy).map(Prepared::Upload)
            }
        }
    }

    pub fn decode(&self, question_id: i32, stored: &StoredAnswer) -> Result<AnswerValue, Error> {
        match (self, stored) {
            (Codec::Choice { .. }, StoredAnswer::ChoiceSet(raw)) => parse_choice_list(question_id, raw).map(AnswerValue::Choices),
            (Codec::Text, StoredAnswer::Text(t)) => Ok(AnswerValue::Text(t.clone())),
            (Codec::File, StoredAnswer::Text(r)) => Ok(AnswerValue::FileReference(r.clone())),
            _ => Err(Error::ServerError(format!("stored answer of question {} does not match its type", question_id))),
        }
    }
}

/// Completes a prepared answer, uploading the attachment under
/// `answers/{submission_id}_{question_id}{ext}`. Returns the stored answer and
/// the key of any uploaded object.
pub async fn finish<U>(uploader: &U, submission_id: i32, prepared: Prepared) -> Result<(StoredAnswer, Option<String>), Error>
where
    U: AttachmentUploader,
{
    match prepared {
        Prepared::Ready(stored) => Ok((stored, None)),
        Prepared::Upload(file) => {
            let key = format!("{}/{}_{}{}", ANSWER_FOLDER, submission_id, file.question_id, file.extension);
            let question_id = file.question_id;
            let reference = uploader
                .upload(UploadedFileCreate {
                    key: key.clone(),
                    content_type: file.content_type,
                    content: file.content,
                })
                .await
                .map_err(|e| Error::UploadFailed {
                    question_id,
                    reason: e.to_string(),
                })?;
            Ok((StoredAnswer::Text(reference), Some(key)))
        }
    }
}

/// Text form of a single selection, used to match it against option ids and
/// labels.
pub fn choice_text(choice: &Value) -> String {
    match choice {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_choice_list(question_id: i32, raw: &str) -> Result<Vec<Value>, Error> {
    let invalid = |reason: String| Error::InvalidAnswer { question_id, reason };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let values: Vec<Value> = serde_json::from_str(raw).map_err(|e| invalid(format!("choices must be a JSON list: {}", e)))?;
    if let Some(other) = values.iter().find(|v| !matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))) {
        return Err(invalid(format!("unsupported choice value: {}", other)));
    }
    Ok(values)
}

fn encode_choices(question: &Question, raw: &str, single: bool, boolean: bool) -> Result<StoredAnswer, Error> {
    let invalid = |reason: String| Error::InvalidAnswer {
        question_id: question.id,
        reason,
    };
    let selected = parse_choice_list(question.id, raw)?;
    if single && selected.len() > 1 {
        return Err(invalid(format!("expected at most one choice, got {}", selected.len())));
    }
    for choice in selected.iter().map(choice_text) {
        let known = if question.options.is_empty() {
            !boolean || matches!(choice.to_ascii_lowercase().as_str(), "true" | "false")
        } else {
            question.option_for(&choice).is_some()
        };
        if !known {
            return Err(invalid(format!("unknown choice: {}", choice)));
        }
    }
    let encoded = serde_json::to_string(&selected).map_err(|e| Error::ServerError(e.to_string()))?;
    Ok(StoredAnswer::ChoiceSet(encoded))
}

fn check_attachment(question_id: i32, attachment: Attachment, policy: &AttachmentPolicy) -> Result<CheckedAttachment, Error> {
    let invalid = |reason: String| Error::InvalidAttachment { question_id, reason };
    if attachment.content.is_empty() {
        return Err(invalid("empty file".into()));
    }
    if attachment.content.len() > policy.max_bytes {
        return Err(invalid(format!("file exceeds {} bytes", policy.max_bytes)));
    }
    let content_type = sniff(&attachment.content);
    debug!("attachment {:?} of question {} sniffed as {}", attachment.filename, question_id, content_type);
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(invalid(format!("unsupported file type {}", content_type)));
    }
    Ok(CheckedAttachment {
        question_id,
        extension: extension_of(content_type).to_owned(),
        content_type,
        content: attachment.content,
    })
}

/// Key extension for a sniffed content type. The client's filename is never
/// consulted, the static file server picks its content type from this.
fn extension_of(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "application/pdf" => ".pdf",
        "application/msword" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        _ => "",
    }
}

/// Content type from the leading bytes of a file, ignoring whatever the
/// client claimed.
pub fn sniff(content: &[u8]) -> &'static str {
    const OLE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    let head = &content[..content.len().min(512)];
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        "image/gif"
    } else if head.starts_with(b"%PDF-") {
        "application/pdf"
    } else if head.starts_with(OLE) {
        "application/msword"
    } else if head.starts_with(b"PK\x03\x04") {
        if contains(content, b"word/document.xml") {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        } else {
            "application/zip"
        }
    } else if head.starts_with(b"#!") {
        "text/x-script"
    } else if std::str::from_utf8(head).is_ok() {
        let lower = String::from_utf8_lossy(head).trim_start().to_ascii_lowercase();
        if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
            "text/html"
        } else {
            "text/plain"
        }
    } else {
        "application/octet-stream"
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
