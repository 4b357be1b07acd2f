//! Form configuration stored as JSON in `khao_sat.settings_json`.
//!
//! Every field is optional so the same type serves as a stored value and as a
//! patch. `max_responses` needs three states because `null` (unlimited) is a
//! meaningful value distinct from "not mentioned".

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate<T> {
    Unset,
    SetTo(Option<T>),
}

impl<T> Default for Tristate<T> {
    fn default() -> Self {
        Tristate::Unset
    }
}

impl<T> Tristate<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Tristate::Unset)
    }
}

impl<T: Copy> Tristate<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Tristate::SetTo(v) => *v,
            Tristate::Unset => None,
        }
    }
}

impl<T: Serialize> Serialize for Tristate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Tristate::SetTo(v) => v.serialize(serializer),
            Tristate::Unset => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Tristate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Tristate::SetTo)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Tristate::is_unset")]
    pub max_responses: Tristate<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_login: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_progress: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_questions: Option<bool>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<i64>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
}

impl Settings {
    pub fn quota(&self) -> Option<i64> {
        self.max_responses.value()
    }

    pub fn requires_login(&self) -> bool {
        self.require_login.unwrap_or(false)
    }

    pub fn collects_email(&self) -> bool {
        self.collect_email.unwrap_or(false)
    }

    /// Reason the form is closed at `now` (unix seconds), if any.
    pub fn window_violation(&self, now: i64) -> Option<String> {
        if let Some(start) = self.start_at {
            if now < start {
                return Some(format!("opens at {}", start));
            }
        }
        if let Some(expire) = self.expire_at {
            if now >= expire {
                return Some(format!("expired at {}", expire));
            }
        }
        None
    }
}

/// Clamps an out of range quota, rejects an inverted scheduling window.
pub fn validate(settings: &mut Settings) -> Result<(), Error> {
    if let Tristate::SetTo(Some(n)) = settings.max_responses {
        if n < 1 {
            settings.max_responses = Tristate::SetTo(Some(1));
        }
    }
    if let (Some(start), Some(expire)) = (settings.start_at, settings.expire_at) {
        if expire <= start {
            return Err(Error::InvalidSettingsValue("expire_at must be after start_at".into()));
        }
    }
    Ok(())
}

pub fn parse(raw: &str) -> Result<Settings, Error> {
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }
    let invalid = |e: serde_json::Error| Error::InvalidSettingsFormat(e.to_string());
    let object = match serde_json::from_str::<Value>(raw).map_err(invalid)? {
        object @ Value::Object(_) => object,
        other => return Err(Error::InvalidSettingsFormat(format!("expected a JSON object, got {}", other))),
    };
    let mut settings: Settings = serde_json::from_value(object).map_err(invalid)?;
    validate(&mut settings)?;
    Ok(settings)
}

/// Settings of a form as stored, absent meaning defaults.
pub fn resolve(raw: Option<&str>) -> Result<Settings, Error> {
    raw.map(parse).unwrap_or_else(|| Ok(Settings::default()))
}

pub fn merge(base: &Settings, patch: &Settings) -> Settings {
    let mut out = base.clone();
    if !patch.max_responses.is_unset() {
        out.max_responses = patch.max_responses;
    }
    out.require_login = patch.require_login.or(base.require_login);
    out.collect_email = patch.collect_email.or(base.collect_email);
    out.show_progress = patch.show_progress.or(base.show_progress);
    out.shuffle_questions = patch.shuffle_questions.or(base.shuffle_questions);
    out.start_at = patch.start_at.or(base.start_at);
    out.expire_at = patch.expire_at.or(base.expire_at);
    if !patch.language.is_empty() {
        out.language = patch.language.clone();
    }
    out
}

pub fn normalize(settings: &Settings) -> Result<String, Error> {
    serde_json::to_string(settings).map_err(|e| Error::ServerError(format!("failed to serialize settings: {}", e)))
}
