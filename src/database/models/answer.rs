use sqlx::FromRow;

use crate::core::models::answer::Answer;

/// An answer joined with the respondent of its submission.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerRow {
    pub id: i32,
    pub phan_hoi_id: i32,
    pub cau_hoi_id: i32,
    pub nguoi_dung_id: Option<i32>,
    pub noi_dung: Option<String>,
    pub lua_chon: Option<String>,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            submission_id: row.phan_hoi_id,
            question_id: row.cau_hoi_id,
            respondent_id: row.nguoi_dung_id,
            content: row.noi_dung,
            choices: row.lua_chon,
        }
    }
}
