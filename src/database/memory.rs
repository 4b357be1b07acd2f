//! In-process store used by service tests. A transaction takes the whole
//! database lock, works on a copy and publishes it on commit.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::models::{
    answer::{Answer, Insert as AnswerInsert, Query as AnswerQuery},
    common::Pagination,
    form::Form,
    question::{Query as QuestionQuery, Question},
    submission::{Insert as SubmissionInsert, Query as SubmissionQuery, Submission},
};
use crate::core::ports::repository::{AnswerCommon, Common, FormCommon, QuestionCommon, Store, SubmissionCommon, TxStore, UserCommon};
use crate::error::Error;

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub forms: Vec<Form>,
    pub questions: Vec<Question>,
    pub submissions: Vec<Submission>,
    pub answers: Vec<Answer>,
    pub users: HashMap<i32, String>,
    /// Makes every answer insert fail with a database error.
    pub fail_answer_insert: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryDb {
    pub fn new(tables: Tables) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tables)),
        }
    }

    pub async fn begin(&self) -> MemoryTx {
        let guard = self.inner.clone().lock_owned().await;
        MemoryTx {
            working: guard.clone(),
            guard,
        }
    }

    pub async fn snapshot(&self) -> Tables {
        self.inner.lock().await.clone()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

fn matches(query: &SubmissionQuery, s: &Submission) -> bool {
    s.form_id == query.form_id_eq && query.submitted_from.map_or(true, |from| s.submitted_at >= from) && query.submitted_before.map_or(true, |before| s.submitted_at < before)
}

impl FormCommon for MemoryTx {
    async fn get(&mut self, id: i32) -> Result<Form, Error> {
        self.working.forms.iter().find(|f| f.id == id).cloned().ok_or(Error::FormNotFound(id))
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Form, Error> {
        FormCommon::get(self, id).await
    }

    async fn increment_responses(&mut self, id: i32) -> Result<(), Error> {
        let form = self.working.forms.iter_mut().find(|f| f.id == id).ok_or(Error::FormNotFound(id))?;
        form.response_count += 1;
        Ok(())
    }

    async fn update_settings(&mut self, id: i32, settings_json: String) -> Result<(), Error> {
        let form = self.working.forms.iter_mut().find(|f| f.id == id).ok_or(Error::FormNotFound(id))?;
        form.settings_json = Some(settings_json);
        Ok(())
    }
}

impl QuestionCommon for MemoryTx {
    async fn query(&mut self, query: QuestionQuery) -> Result<Vec<Question>, Error> {
        let mut questions: Vec<Question> = self.working.questions.iter().filter(|q| q.form_id == query.form_id_eq).cloned().collect();
        questions.sort_by_key(|q| (q.order, q.id));
        Ok(questions)
    }
}

impl SubmissionCommon for MemoryTx {
    async fn insert(&mut self, data: SubmissionInsert) -> Result<i32, Error> {
        let taken = self
            .working
            .submissions
            .iter()
            .any(|s| data.respondent_id.is_some() && s.form_id == data.form_id && s.respondent_id == data.respondent_id && s.sequence == data.sequence);
        if taken {
            return Err(Error::ConcurrentSubmissionConflict);
        }
        let id = self.working.submissions.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        self.working.submissions.push(Submission {
            id,
            form_id: data.form_id,
            respondent_id: data.respondent_id,
            email: data.email,
            submitted_at: data.submitted_at,
            sequence: data.sequence,
        });
        Ok(id)
    }

    async fn count(&mut self, query: &SubmissionQuery) -> Result<i64, Error> {
        Ok(self.working.submissions.iter().filter(|s| matches(query, s)).count() as i64)
    }

    async fn query(&mut self, query: &SubmissionQuery, pagination: Option<Pagination>) -> Result<Vec<Submission>, Error> {
        let mut found: Vec<Submission> = self.working.submissions.iter().filter(|s| matches(query, s)).cloned().collect();
        found.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(match pagination {
            Some(p) => found.into_iter().skip(p.offset as usize).take(p.limit as usize).collect(),
            None => found,
        })
    }

    async fn get(&mut self, form_id: i32, id: i32) -> Result<Submission, Error> {
        self.working
            .submissions
            .iter()
            .find(|s| s.form_id == form_id && s.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("submission {}", id)))
    }

    async fn latest_sequence(&mut self, form_id: i32, respondent_id: i32) -> Result<Option<i32>, Error> {
        Ok(self
            .working
            .submissions
            .iter()
            .filter(|s| s.form_id == form_id && s.respondent_id == Some(respondent_id))
            .map(|s| s.sequence)
            .max())
    }
}

impl AnswerCommon for MemoryTx {
    async fn bulk_insert(&mut self, answers: Vec<AnswerInsert>) -> Result<(), Error> {
        if self.working.fail_answer_insert {
            return Err(Error::PersistenceFailure(sqlx::Error::PoolClosed));
        }
        for a in answers {
            let id = self.working.answers.iter().map(|a| a.id).max().unwrap_or(0) + 1;
            let respondent_id = self.working.submissions.iter().find(|s| s.id == a.submission_id).and_then(|s| s.respondent_id);
            let (content, choices) = a.payload.into_columns();
            self.working.answers.push(Answer {
                id,
                submission_id: a.submission_id,
                question_id: a.question_id,
                respondent_id,
                content,
                choices,
            });
        }
        Ok(())
    }

    async fn query(&mut self, query: AnswerQuery) -> Result<Vec<Answer>, Error> {
        let submissions = &self.working.submissions;
        Ok(self
            .working
            .answers
            .iter()
            .filter(|a| {
                query
                    .form_id_eq
                    .map_or(true, |fid| submissions.iter().any(|s| s.id == a.submission_id && s.form_id == fid))
            })
            .filter(|a| query.submission_id_in.as_ref().map_or(true, |ids| ids.contains(&a.submission_id)))
            .cloned()
            .collect())
    }
}

impl UserCommon for MemoryTx {
    async fn email(&mut self, id: i32) -> Result<Option<String>, Error> {
        Ok(self.working.users.get(&id).cloned())
    }
}

impl Common for MemoryTx {}
impl Store for MemoryTx {}

impl TxStore for MemoryTx {
    async fn commit(mut self) -> Result<(), Error> {
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        Ok(())
    }
}
