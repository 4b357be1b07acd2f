use serde::Serialize;

/// Storable form of one answer. Text goes to `noi_dung`, choice sets to
/// `lua_chon`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredAnswer {
    Text(String),
    ChoiceSet(String),
}

impl StoredAnswer {
    pub fn into_columns(self) -> (Option<String>, Option<String>) {
        match self {
            StoredAnswer::Text(t) => (Some(t), None),
            StoredAnswer::ChoiceSet(c) => (None, Some(c)),
        }
    }

    pub fn from_columns(content: Option<String>, choices: Option<String>) -> Self {
        match choices.filter(|c| !c.is_empty()) {
            Some(c) => StoredAnswer::ChoiceSet(c),
            None => StoredAnswer::Text(content.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Answer {
    #[serde(skip)]
    pub id: i32,
    #[serde(skip)]
    pub submission_id: i32,
    #[serde(rename = "cau_hoi_id")]
    pub question_id: i32,
    #[serde(skip)]
    pub respondent_id: Option<i32>,
    #[serde(rename = "noi_dung")]
    pub content: Option<String>,
    #[serde(rename = "lua_chon")]
    pub choices: Option<String>,
}

impl Answer {
    pub fn stored(&self) -> StoredAnswer {
        StoredAnswer::from_columns(self.content.clone(), self.choices.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub submission_id: i32,
    pub question_id: i32,
    pub payload: StoredAnswer,
}

#[derive(Debug, Default)]
pub struct Query {
    pub form_id_eq: Option<i32>,
    pub submission_id_in: Option<Vec<i32>>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_columns() {
        let (content, choices) = StoredAnswer::ChoiceSet(r#"["x"]"#.into()).into_columns();
        assert_eq!(content, None);
        assert_eq!(StoredAnswer::from_columns(content, choices), StoredAnswer::ChoiceSet(r#"["x"]"#.into()));
        assert_eq!(StoredAnswer::from_columns(None, None), StoredAnswer::Text(String::new()));
    }
}
