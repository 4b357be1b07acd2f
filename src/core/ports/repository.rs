use crate::core::models::{
    answer::{Answer, Insert as AnswerInsert, Query as AnswerQuery},
    common::Pagination,
    form::Form,
    question::{Query as QuestionQuery, Question},
    submission::{Insert as SubmissionInsert, Query as SubmissionQuery, Submission},
};
use crate::error::Error;

pub trait FormCommon {
    async fn get(&mut self, id: i32) -> Result<Form, Error>;
    /// Same as `get` but holds a row lock until the surrounding transaction ends.
    async fn get_for_update(&mut self, id: i32) -> Result<Form, Error>;
    async fn increment_responses(&mut self, id: i32) -> Result<(), Error>;
    async fn update_settings(&mut self, id: i32, settings_json: String) -> Result<(), Error>;
}

pub trait QuestionCommon {
    async fn query(&mut self, query: QuestionQuery) -> Result<Vec<Question>, Error>;
}

pub trait SubmissionCommon {
    async fn insert(&mut self, data: SubmissionInsert) -> Result<i32, Error>;
    async fn count(&mut self, query: &SubmissionQuery) -> Result<i64, Error>;
    async fn query(&mut self, query: &SubmissionQuery, pagination: Option<Pagination>) -> Result<Vec<Submission>, Error>;
    async fn get(&mut self, form_id: i32, id: i32) -> Result<Submission, Error>;
    async fn latest_sequence(&mut self, form_id: i32, respondent_id: i32) -> Result<Option<i32>, Error>;
}

pub trait AnswerCommon {
    async fn bulk_insert(&mut self, answers: Vec<AnswerInsert>) -> Result<(), Error>;
    async fn query(&mut self, query: AnswerQuery) -> Result<Vec<Answer>, Error>;
}

pub trait UserCommon {
    async fn email(&mut self, id: i32) -> Result<Option<String>, Error>;
}

pub trait Common: FormCommon + QuestionCommon + SubmissionCommon + AnswerCommon + UserCommon {}

pub trait Store: Common {}

pub trait TxStore: Store {
    async fn commit(self) -> Result<(), Error>;
    async fn rollback(self) -> Result<(), Error>;
}
