use itertools::Itertools;
use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, query_scalar, Executor, PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;

use crate::core::models::{
    answer::{Answer, Insert as AnswerInsert, Query as AnswerQuery},
    common::Pagination,
    form::Form,
    question::{Query as QuestionQuery, Question},
    submission::{Insert as SubmissionInsert, Query as SubmissionQuery, Submission},
};
use crate::core::ports::repository::{AnswerCommon, Common, FormCommon, QuestionCommon, Store, SubmissionCommon, TxStore, UserCommon};
use crate::database::models::{
    answer::AnswerRow,
    form::FormRow,
    question::{OptionRow, QuestionRow},
    submission::SubmissionRow,
};
use crate::error::Error;

const UNIQUE_VIOLATION: &str = "23505";

const FORM_COLUMNS: &str = "id, tieu_de, trang_thai, nguoi_tao_id, so_phan_hoi, settings_json, ngay_tao";
const SUBMISSION_COLUMNS: &str = "id, khao_sat_id, nguoi_dung_id, email, ngay_gui, lan_gui";

pub struct PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e>,
{
    executor: E,
}

fn conflict_or_failure(e: sqlx::Error) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => Error::ConcurrentSubmissionConflict,
        _ => Error::PersistenceFailure(e),
    }
}

fn push_submission_filters(stmt: &mut QueryBuilder<'_, Postgres>, query: &SubmissionQuery) {
    stmt.push(" WHERE khao_sat_id = ").push_bind(query.form_id_eq);
    if let Some(from) = query.submitted_from {
        stmt.push(" AND ngay_gui >= ").push_bind(from);
    }
    if let Some(before) = query.submitted_before {
        stmt.push(" AND ngay_gui < ").push_bind(before);
    }
}

impl<E> FormCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn get(&mut self, id: i32) -> Result<Form, Error> {
        let row: Option<FormRow> = query_as(&format!("SELECT {} FROM khao_sat WHERE id = $1", FORM_COLUMNS))
            .bind(id)
            .fetch_optional(&mut self.executor)
            .await?;
        row.ok_or(Error::FormNotFound(id))?.try_into()
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Form, Error> {
        let row: Option<FormRow> = query_as(&format!("SELECT {} FROM khao_sat WHERE id = $1 FOR UPDATE", FORM_COLUMNS))
            .bind(id)
            .fetch_optional(&mut self.executor)
            .await?;
        row.ok_or(Error::FormNotFound(id))?.try_into()
    }

    async fn increment_responses(&mut self, id: i32) -> Result<(), Error> {
        query("UPDATE khao_sat SET so_phan_hoi = so_phan_hoi + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn update_settings(&mut self, id: i32, settings_json: String) -> Result<(), Error> {
        let res = query("UPDATE khao_sat SET settings_json = $1 WHERE id = $2")
            .bind(settings_json)
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::FormNotFound(id));
        }
        Ok(())
    }
}

impl<E> QuestionCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn query(&mut self, query: QuestionQuery) -> Result<Vec<Question>, Error> {
        let rows: Vec<QuestionRow> = query_as(
            "SELECT id, khao_sat_id, noi_dung, loai_cau_hoi, thu_tu, props_json
            FROM cau_hoi
            WHERE khao_sat_id = $1
            ORDER BY thu_tu, id",
        )
        .bind(query.form_id_eq)
        .fetch_all(&mut self.executor)
        .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|q| q.id).collect();
        let options: Vec<OptionRow> = query_as(
            "SELECT id, cau_hoi_id, noi_dung
            FROM lua_chon
            WHERE cau_hoi_id = ANY($1)
            ORDER BY thu_tu, id",
        )
        .bind(ids)
        .fetch_all(&mut self.executor)
        .await?;
        let mut options: HashMap<i32, Vec<OptionRow>> = options.into_iter().map(|o| (o.cau_hoi_id, o)).into_group_map();
        rows.into_iter()
            .map(|q| {
                let opts = options.remove(&q.id).unwrap_or_default();
                q.into_question(opts)
            })
            .collect()
    }
}

impl<E> SubmissionCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: SubmissionInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO phan_hoi (khao_sat_id, nguoi_dung_id, email, ngay_gui, lan_gui) VALUES ($1, $2, $3, $4, $5) RETURNING id")
            .bind(data.form_id)
            .bind(data.respondent_id)
            .bind(data.email)
            .bind(data.submitted_at)
            .bind(data.sequence)
            .fetch_one(&mut self.executor)
            .await
            .map_err(conflict_or_failure)?;
        Ok(id)
    }

    async fn count(&mut self, query: &SubmissionQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM phan_hoi");
        push_submission_filters(&mut stmt, query);
        let (n,): (i64,) = stmt.build_query_as().fetch_one(&mut self.executor).await?;
        Ok(n)
    }

    async fn query(&mut self, query: &SubmissionQuery, pagination: Option<Pagination>) -> Result<Vec<Submission>, Error> {
        let mut stmt = QueryBuilder::new(format!("SELECT {} FROM phan_hoi", SUBMISSION_COLUMNS));
        push_submission_filters(&mut stmt, query);
        stmt.push(" ORDER BY ngay_gui DESC, id DESC");
        if let Some(p) = pagination {
            stmt.push(" LIMIT ").push_bind(p.limit);
            stmt.push(" OFFSET ").push_bind(p.offset);
        }
        let rows: Vec<SubmissionRow> = stmt.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(rows.into_iter().map(Submission::from).collect())
    }

    async fn get(&mut self, form_id: i32, id: i32) -> Result<Submission, Error> {
        let row: Option<SubmissionRow> = query_as(&format!("SELECT {} FROM phan_hoi WHERE khao_sat_id = $1 AND id = $2", SUBMISSION_COLUMNS))
            .bind(form_id)
            .bind(id)
            .fetch_optional(&mut self.executor)
            .await?;
        row.map(Submission::from).ok_or_else(|| Error::NotFound(format!("submission {}", id)))
    }

    async fn latest_sequence(&mut self, form_id: i32, respondent_id: i32) -> Result<Option<i32>, Error> {
        let latest = query_scalar("SELECT MAX(lan_gui) FROM phan_hoi WHERE khao_sat_id = $1 AND nguoi_dung_id = $2")
            .bind(form_id)
            .bind(respondent_id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(latest)
    }
}

impl<E> AnswerCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn bulk_insert(&mut self, answers: Vec<AnswerInsert>) -> Result<(), Error> {
        if answers.is_empty() {
            return Ok(());
        }
        let mut stmt = QueryBuilder::new("INSERT INTO cau_tra_loi (phan_hoi_id, cau_hoi_id, noi_dung, lua_chon) ");
        stmt.push_values(answers, |mut b, a| {
            let (content, choices) = a.payload.into_columns();
            b.push_bind(a.submission_id).push_bind(a.question_id).push_bind(content).push_bind(choices);
        });
        stmt.build().execute(&mut self.executor).await?;
        Ok(())
    }

    async fn query(&mut self, query: AnswerQuery) -> Result<Vec<Answer>, Error> {
        let mut stmt = QueryBuilder::new(
            "SELECT a.id, a.phan_hoi_id, a.cau_hoi_id, p.nguoi_dung_id, a.noi_dung, a.lua_chon
            FROM cau_tra_loi AS a
            JOIN phan_hoi AS p ON p.id = a.phan_hoi_id
            WHERE 1 = 1",
        );
        if let Some(form_id) = query.form_id_eq {
            stmt.push(" AND p.khao_sat_id = ").push_bind(form_id);
        }
        if let Some(ids) = query.submission_id_in {
            stmt.push(" AND a.phan_hoi_id = ANY(").push_bind(ids).push(")");
        }
        stmt.push(" ORDER BY a.phan_hoi_id, a.id");
        let rows: Vec<AnswerRow> = stmt.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(rows.into_iter().map(Answer::from).collect())
    }
}

impl<E> UserCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn email(&mut self, id: i32) -> Result<Option<String>, Error> {
        let email: Option<Option<String>> = query_scalar("SELECT email FROM nguoi_dung WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(email.flatten())
    }
}

impl Common for PgSqlx<PoolConnection<Postgres>> {}
impl Common for PgSqlx<Transaction<'static, Postgres>> {}
impl Store for PgSqlx<PoolConnection<Postgres>> {}
impl Store for PgSqlx<Transaction<'static, Postgres>> {}

impl TxStore for PgSqlx<Transaction<'static, Postgres>> {
    async fn commit(self) -> Result<(), Error> {
        self.executor.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        self.executor.rollback().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgSqlxManager {
    pool: PgPool,
}

impl PgSqlxManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn begin(&self) -> Result<PgSqlx<Transaction<'static, Postgres>>, Error> {
        let tx = self.pool.begin().await?;
        Ok(PgSqlx { executor: tx })
    }

    pub async fn acquire(&self) -> Result<PgSqlx<PoolConnection<Postgres>>, Error> {
        let conn = self.pool.acquire().await?;
        Ok(PgSqlx { executor: conn })
    }
}
