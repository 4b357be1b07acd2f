use sqlx::FromRow;

use crate::core::models::question::{Opt, Question, QuestionProps, QuestionType};
use crate::error::Error;

#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i32,
    pub khao_sat_id: i32,
    pub noi_dung: String,
    pub loai_cau_hoi: String,
    pub thu_tu: i32,
    pub props_json: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OptionRow {
    pub id: i32,
    pub cau_hoi_id: i32,
    pub noi_dung: String,
}

impl QuestionRow {
    pub fn into_question(self, options: Vec<OptionRow>) -> Result<Question, Error> {
        let type_: QuestionType = self
            .loai_cau_hoi
            .parse()
            .map_err(|_| Error::ServerError(format!("question {} has unknown type {}", self.id, self.loai_cau_hoi)))?;
        Ok(Question {
            id: self.id,
            form_id: self.khao_sat_id,
            content: self.noi_dung,
            type_,
            order: self.thu_tu,
            props: QuestionProps::parse_lenient(self.id, self.props_json.as_deref()),
            options: options.into_iter().map(|o| Opt { id: o.id, label: o.noi_dung }).collect(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_into_question() {
        let row = QuestionRow {
            id: 3,
            khao_sat_id: 1,
            noi_dung: "Bạn thích quả gì?".into(),
            loai_cau_hoi: "single_choice".into(),
            thu_tu: 0,
            props_json: Some(r#"{"required": true}"#.into()),
        };
        let q = row
            .into_question(vec![OptionRow {
                id: 9,
                cau_hoi_id: 3,
                noi_dung: "Cam".into(),
            }])
            .unwrap();
        assert_eq!(q.type_, QuestionType::SingleChoice);
        assert!(q.is_required());
        assert_eq!(q.options, vec![Opt { id: 9, label: "Cam".into() }]);
    }

    #[test]
    fn test_unknown_stored_type_is_a_server_fault() {
        let row = QuestionRow {
            id: 3,
            khao_sat_id: 1,
            noi_dung: String::new(),
            loai_cau_hoi: "ESSAY".into(),
            thu_tu: 0,
            props_json: None,
        };
        assert!(matches!(row.into_question(Vec::new()), Err(Error::ServerError(_))));
    }
}
