//! Decides whether a submission attempt may be written. Checks run in a fixed
//! order and stop at the first failure; nothing is written by this module.

use chrono::{DateTime, Utc};
use log::error;
use std::collections::{HashMap, HashSet};

use crate::core::codec::Codec;
use crate::core::models::{
    form::Form,
    question::{Query as QuestionQuery, Question, QuestionType},
    submission::{AnswerSubmit, Attachments, Query as SubmissionQuery, Respondent, SubmitRequest},
};
use crate::core::ports::repository::{QuestionCommon, Store, SubmissionCommon, UserCommon};
use crate::core::settings::{self, Settings};
use crate::error::Error;

#[derive(Debug)]
pub struct Admitted {
    pub email: Option<String>,
    pub questions: HashMap<i32, Question>,
}

pub async fn admit<S>(
    store: &mut S,
    form: &Form,
    respondent: Option<Respondent>,
    request: &SubmitRequest,
    attachments: &Attachments,
    now: DateTime<Utc>,
) -> Result<Admitted, Error>
where
    S: Store,
{
    check_form(form)?;
    let settings = settings::resolve(form.settings_json.as_deref()).map_err(|e| {
        error!("stored settings of form {} are unusable: {}", form.id, e);
        e
    })?;
    if let Some(reason) = settings.window_violation(now.timestamp()) {
        return Err(Error::FormNotAcceptingSubmissions { form_id: form.id, reason });
    }

    if let Some(quota) = settings.quota() {
        let count = SubmissionCommon::count(
            store,
            &SubmissionQuery {
                form_id_eq: form.id,
                ..default::default()
            },
        )
        .await?;
        check_quota(quota, count)?;
    }

    if settings.requires_login() && respondent.is_none() {
        return Err(Error::LoginRequired);
    }
    let account_email = match respondent {
        Some(r) => UserCommon::email(store, r.id).await?,
        None => None,
    };
    let email = resolve_email(&settings, account_email, request.email.as_deref())?;

    let questions = QuestionCommon::query(store, QuestionQuery { form_id_eq: form.id }).await?;
    check_answers(&questions, &request.answers, attachments)?;

    Ok(Admitted {
        email,
        questions: questions.into_iter().map(|q| (q.id, q)).collect(),
    })
}

pub fn check_form(form: &Form) -> Result<(), Error> {
    if form.is_deleted() {
        return Err(Error::FormNotAcceptingSubmissions {
            form_id: form.id,
            reason: "form has been deleted".into(),
        });
    }
    Ok(())
}

pub fn check_quota(quota: i64, count: i64) -> Result<(), Error> {
    if count >= quota {
        return Err(Error::QuotaExceeded { quota });
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.contains('@') && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// The account email of a logged in respondent wins over a typed one.
pub fn resolve_email(settings: &Settings, account_email: Option<String>, requested: Option<&str>) -> Result<Option<String>, Error> {
    let requested = requested.map(str::trim).filter(|e| !e.is_empty());
    if let Some(email) = requested {
        if !looks_like_email(email) {
            return Err(Error::InvalidEmail(email.to_owned()));
        }
    }
    let email = account_email.filter(|e| !e.is_empty()).or_else(|| requested.map(str::to_owned));
    if settings.collects_email() && email.is_none() {
        return Err(Error::EmailRequired);
    }
    Ok(email)
}

/// Adds an upload answer for every attached file the answer list does not
/// mention, so a file part alone is enough to answer an upload question.
pub fn add_implicit_uploads(request: &mut SubmitRequest, attachments: &Attachments) {
    let mentioned: HashSet<i32> = request.answers.iter().map(|a| a.question_id).collect();
    let mut missing: Vec<i32> = attachments.keys().filter(|id| !mentioned.contains(id)).copied().collect();
    missing.sort_unstable();
    request.answers.extend(missing.into_iter().map(|question_id| AnswerSubmit {
        question_id,
        type_tag: QuestionType::UploadFile.tag().into(),
        ..Default::default()
    }));
}

/// `questions` are expected in display order so the first missing required
/// question is reported.
pub fn check_answers(questions: &[Question], answers: &[AnswerSubmit], attachments: &Attachments) -> Result<(), Error> {
    let by_id: HashMap<i32, &Question> = questions.iter().map(|q| (q.id, q)).collect();
    let mut seen = HashSet::new();
    for answer in answers {
        let question = by_id.get(&answer.question_id).ok_or(Error::UnknownQuestion(answer.question_id))?;
        if !seen.insert(answer.question_id) {
            return Err(Error::MalformedRequest(format!("question {} answered more than once", answer.question_id)));
        }
        let tag: QuestionType = answer.type_tag.parse()?;
        if tag != question.type_ {
            return Err(Error::MalformedRequest(format!(
                "question {} is {}, not {}",
                question.id, question.type_, tag
            )));
        }
    }
    let answers: HashMap<i32, &AnswerSubmit> = answers.iter().map(|a| (a.question_id, a)).collect();
    for question in questions.iter().filter(|q| q.is_required()) {
        if Codec::from(question.type_).is_empty(answers.get(&question.id).copied(), attachments.get(&question.id)) {
            return Err(Error::RequiredAnswerMissing { question_id: question.id });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::models::form::FormStatus;
    use crate::core::models::question::QuestionProps;
    use crate::core::models::submission::Attachment;
    use bytes::Bytes;

    fn question(id: i32, type_: QuestionType, required: bool) -> Question {
        Question {
            id,
            form_id: 1,
            type_,
            order: id,
            props: QuestionProps { required },
            ..Default::default()
        }
    }

    fn answer(question_id: i32, type_: QuestionType, content: &str, choices: &str) -> AnswerSubmit {
        AnswerSubmit {
            question_id,
            type_tag: type_.tag().to_lowercase(),
            content: content.into(),
            choices: choices.into(),
        }
    }

    #[test]
    fn test_deleted_form_is_closed() {
        let mut form = Form {
            id: 3,
            status: FormStatus::Archived,
            ..Default::default()
        };
        assert!(check_form(&form).is_ok());
        form.status = FormStatus::Deleted;
        assert!(matches!(check_form(&form), Err(Error::FormNotAcceptingSubmissions { form_id: 3, .. })));
    }

    #[test]
    fn test_quota() {
        assert!(check_quota(2, 1).is_ok());
        assert!(matches!(check_quota(2, 2), Err(Error::QuotaExceeded { quota: 2 })));
        assert!(matches!(check_quota(1, 5), Err(Error::QuotaExceeded { quota: 1 })));
    }

    #[test]
    fn test_resolve_email() {
        let open = Settings::default();
        let collecting = settings::parse(r#"{"collect_email": true}"#).unwrap();

        assert_eq!(resolve_email(&open, None, None).unwrap(), None);
        assert_eq!(resolve_email(&open, None, Some(" a@b.vn ")).unwrap(), Some("a@b.vn".into()));
        assert_eq!(resolve_email(&open, Some("me@x.io".into()), Some("a@b.vn")).unwrap(), Some("me@x.io".into()));
        assert!(matches!(resolve_email(&open, None, Some("nope")), Err(Error::InvalidEmail(_))));
        assert!(matches!(resolve_email(&open, None, Some("a@b")), Err(Error::InvalidEmail(_))));
        assert!(matches!(resolve_email(&collecting, None, Some("")), Err(Error::EmailRequired)));
        assert_eq!(resolve_email(&collecting, Some("me@x.io".into()), None).unwrap(), Some("me@x.io".into()));
    }

    #[test]
    fn test_required_choice_with_empty_set() {
        let questions = vec![question(1, QuestionType::SingleChoice, true)];
        let answers = vec![answer(1, QuestionType::SingleChoice, "", "[]")];
        assert!(matches!(
            check_answers(&questions, &answers, &Attachments::new()),
            Err(Error::RequiredAnswerMissing { question_id: 1 })
        ));
    }

    #[test]
    fn test_required_question_omitted() {
        let questions = vec![question(1, QuestionType::FillBlank, false), question(2, QuestionType::Rating, true)];
        let answers = vec![answer(1, QuestionType::FillBlank, "hi", "")];
        assert!(matches!(
            check_answers(&questions, &answers, &Attachments::new()),
            Err(Error::RequiredAnswerMissing { question_id: 2 })
        ));
    }

    #[test]
    fn test_required_upload_needs_file() {
        let questions = vec![question(4, QuestionType::UploadFile, true)];
        let answers = vec![answer(4, QuestionType::UploadFile, "", "")];
        assert!(matches!(
            check_answers(&questions, &answers, &Attachments::new()),
            Err(Error::RequiredAnswerMissing { question_id: 4 })
        ));
        let mut attachments = Attachments::new();
        attachments.insert(
            4,
            Attachment {
                filename: "a.pdf".into(),
                content: Bytes::from_static(b"%PDF-1.4"),
            },
        );
        assert!(check_answers(&questions, &answers, &attachments).is_ok());
    }

    #[test]
    fn test_unknown_and_duplicate_questions() {
        let questions = vec![question(1, QuestionType::FillBlank, false)];
        let stranger = vec![answer(9, QuestionType::FillBlank, "x", "")];
        assert!(matches!(check_answers(&questions, &stranger, &Attachments::new()), Err(Error::UnknownQuestion(9))));
        let twice = vec![answer(1, QuestionType::FillBlank, "x", ""), answer(1, QuestionType::FillBlank, "y", "")];
        assert!(matches!(check_answers(&questions, &twice, &Attachments::new()), Err(Error::MalformedRequest(_))));
    }

    #[test]
    fn test_implicit_uploads() {
        let mut attachments = Attachments::new();
        for id in [7, 5] {
            attachments.insert(
                id,
                Attachment {
                    filename: "a.png".into(),
                    content: Bytes::from_static(b"\x89PNG"),
                },
            );
        }
        let mut request = SubmitRequest {
            answers: vec![answer(7, QuestionType::UploadFile, "", "")],
            ..Default::default()
        };
        add_implicit_uploads(&mut request, &attachments);
        assert_eq!(request.answers.iter().map(|a| a.question_id).collect::<Vec<_>>(), vec![7, 5]);
        assert_eq!(request.answers[1].type_tag, "UPLOAD_FILE");

        let questions = vec![question(5, QuestionType::FillBlank, false), question(7, QuestionType::UploadFile, false)];
        assert!(matches!(check_answers(&questions, &request.answers, &attachments), Err(Error::MalformedRequest(_))));
    }

    #[test]
    fn test_type_tag_must_match() {
        let questions = vec![question(1, QuestionType::FillBlank, false)];
        let wrong = vec![answer(1, QuestionType::Rating, "4", "")];
        assert!(matches!(check_answers(&questions, &wrong, &Attachments::new()), Err(Error::MalformedRequest(_))));
        let bogus = vec![AnswerSubmit {
            question_id: 1,
            type_tag: "ESSAY".into(),
            ..Default::default()
        }];
        assert!(matches!(check_answers(&questions, &bogus, &Attachments::new()), Err(Error::MalformedRequest(_))));
    }
}
