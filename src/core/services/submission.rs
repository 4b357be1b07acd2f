use chrono::Utc;
use itertools::Itertools;
use log::{info, warn};
use std::collections::HashMap;

use crate::core::admission::{self, admit};
use crate::core::codec::{finish, AttachmentPolicy, Codec};
use crate::core::models::{
    answer::{Insert as AnswerInsert, Query as AnswerQuery},
    common::Pagination,
    submission::{Insert as SubmissionInsert, Query as SubmissionQuery, Receipt, Submission, SubmissionDetail, Submit},
};
use crate::core::ports::repository::{AnswerCommon, FormCommon, Store, SubmissionCommon, TxStore};
use crate::core::ports::uploader::AttachmentUploader;
use crate::error::Error;

/// Admits and persists one submission inside `store`'s transaction. Either
/// the header, every answer and the counter bump are committed together or
/// nothing is, in which case objects already uploaded are removed again.
pub async fn submit<S, U>(mut store: S, uploader: &U, policy: &AttachmentPolicy, submit: Submit) -> Result<Receipt, Error>
where
    S: TxStore,
    U: AttachmentUploader,
{
    let form_id = submit.form_id;
    let mut uploaded = Vec::new();
    let result = match write(&mut store, uploader, policy, submit, &mut uploaded).await {
        Ok(receipt) => store.commit().await.map(|_| receipt),
        Err(e) => {
            if let Err(re) = store.rollback().await {
                warn!("failed to roll back submission to form {}: {}", form_id, re);
            }
            Err(e)
        }
    };
    match result {
        Ok(receipt) => {
            info!("form {} received submission {} (attempt {})", form_id, receipt.id, receipt.sequence);
            Ok(receipt)
        }
        Err(e) => {
            discard(uploader, &uploaded).await;
            Err(e)
        }
    }
}

async fn write<S, U>(store: &mut S, uploader: &U, policy: &AttachmentPolicy, submit: Submit, uploaded: &mut Vec<String>) -> Result<Receipt, Error>
where
    S: TxStore,
    U: AttachmentUploader,
{
    let Submit {
        form_id,
        respondent,
        mut request,
        mut attachments,
    } = submit;
    if let Some(body_id) = request.form_id {
        if body_id != form_id {
            return Err(Error::MalformedRequest(format!("body names form {} but the path names form {}", body_id, form_id)));
        }
    }
    admission::add_implicit_uploads(&mut request, &attachments);

    // the row lock serializes quota and sequence checks per form
    let form = FormCommon::get_for_update(store, form_id).await?;
    let now = Utc::now();
    let admitted = admit(store, &form, respondent, &request, &attachments, now).await?;

    let mut prepared = Vec::with_capacity(request.answers.len());
    for answer in &request.answers {
        let question = admitted.questions.get(&answer.question_id).ok_or(Error::UnknownQuestion(answer.question_id))?;
        let codec = Codec::from(question.type_);
        let attachment = attachments.remove(&question.id);
        if codec == Codec::File && attachment.is_none() {
            continue;
        }
        prepared.push((question.id, codec.prepare(question, answer, attachment, policy)?));
    }

    let sequence = match respondent {
        Some(r) => SubmissionCommon::latest_sequence(store, form.id, r.id).await?.map_or(1, |n| n + 1),
        None => 1,
    };
    let submission_id = SubmissionCommon::insert(
        store,
        SubmissionInsert {
            form_id: form.id,
            respondent_id: respondent.map(|r| r.id),
            email: admitted.email,
            submitted_at: now,
            sequence,
        },
    )
    .await?;

    let mut answers = Vec::with_capacity(prepared.len());
    for (question_id, p) in prepared {
        let (payload, key) = finish(uploader, submission_id, p).await?;
        uploaded.extend(key);
        answers.push(AnswerInsert {
            submission_id,
            question_id,
            payload,
        });
    }
    if !answers.is_empty() {
        AnswerCommon::bulk_insert(store, answers).await?;
    }
    FormCommon::increment_responses(store, form.id).await?;
    Ok(Receipt { id: submission_id, sequence })
}

async fn discard<U>(uploader: &U, keys: &[String])
where
    U: AttachmentUploader,
{
    for key in keys {
        if let Err(e) = uploader.remove(key).await {
            warn!("failed to remove orphaned upload {}: {}", key, e);
        }
    }
}

async fn owned_form<S>(store: &mut S, uid: i32, form_id: i32) -> Result<(), Error>
where
    S: Store,
{
    let form = FormCommon::get(store, form_id).await?;
    if !form.is_owned_by(uid) {
        return Err(Error::Forbidden);
    }
    Ok(())
}

async fn with_answers<S>(store: &mut S, submissions: Vec<Submission>) -> Result<Vec<SubmissionDetail>, Error>
where
    S: Store,
{
    if submissions.is_empty() {
        return Ok(Vec::new());
    }
    let answers = AnswerCommon::query(
        store,
        AnswerQuery {
            submission_id_in: Some(submissions.iter().map(|s| s.id).collect()),
            ..default::default()
        },
    )
    .await?;
    let mut grouped: HashMap<i32, Vec<_>> = answers.into_iter().map(|a| (a.submission_id, a)).into_group_map();
    Ok(submissions
        .into_iter()
        .map(|submission| {
            let mut answers = grouped.remove(&submission.id).unwrap_or_default();
            answers.sort_by_key(|a| a.question_id);
            SubmissionDetail { submission, answers }
        })
        .collect())
}

/// Newest first. Returns the page and the total number of matches.
pub async fn list_submissions<S>(store: &mut S, uid: i32, query: SubmissionQuery, pagination: Pagination) -> Result<(Vec<SubmissionDetail>, i64), Error>
where
    S: Store,
{
    owned_form(store, uid, query.form_id_eq).await?;
    let total = SubmissionCommon::count(store, &query).await?;
    let submissions = SubmissionCommon::query(store, &query, Some(pagination)).await?;
    let details = with_answers(store, submissions).await?;
    Ok((details, total))
}

pub async fn submission_detail<S>(store: &mut S, uid: i32, form_id: i32, id: i32) -> Result<SubmissionDetail, Error>
where
    S: Store,
{
    owned_form(store, uid, form_id).await?;
    let submission = SubmissionCommon::get(store, form_id, id).await?;
    let mut details = with_answers(store, vec![submission]).await?;
    details.pop().ok_or_else(|| Error::NotFound(format!("submission {}", id)))
}
