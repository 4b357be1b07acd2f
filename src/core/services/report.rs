use itertools::Itertools;
use log::warn;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::core::codec::{choice_text, AnswerValue, Codec};
use crate::core::models::{
    answer::{Answer, Query as AnswerQuery},
    question::{Query as QuestionQuery, Question, QuestionType},
};
use crate::core::ports::repository::{AnswerCommon, FormCommon, QuestionCommon, Store};
use crate::error::Error;

#[derive(Debug, Serialize, PartialEq)]
pub struct ChoiceCount {
    pub option: String,
    pub count: usize,
    /// Share of the question's answers that picked this option.
    pub percent: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RatingBucket {
    pub rating: i64,
    pub count: usize,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct RatingStats {
    pub avg: f64,
    pub min: i64,
    pub max: i64,
    pub histogram: Vec<RatingBucket>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TextCount {
    pub answer: String,
    pub count: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FileEntry {
    pub user_id: Option<i32>,
    pub file: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Stats {
    Choices(Vec<ChoiceCount>),
    Rating(RatingStats),
    Texts(Vec<TextCount>),
    Files(Vec<FileEntry>),
}

#[derive(Debug, Serialize)]
pub struct QuestionReport {
    pub question_id: i32,
    #[serde(rename = "type")]
    pub type_: QuestionType,
    pub content: String,
    pub answered: usize,
    pub stats: Stats,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub form_id: i32,
    pub response_count: i32,
    pub results: Vec<QuestionReport>,
}

fn decoded(question: &Question, answers: &[&Answer]) -> Vec<(Option<i32>, AnswerValue)> {
    let codec = Codec::from(question.type_);
    answers
        .iter()
        .filter_map(|a| match codec.decode(question.id, &a.stored()) {
            Ok(v) => Some((a.respondent_id, v)),
            Err(e) => {
                warn!("skipping answer {} in report: {}", a.id, e);
                None
            }
        })
        .collect()
}

fn choice_stats(question: &Question, values: Vec<AnswerValue>) -> Stats {
    let answered = values.len();
    let counts = values
        .into_iter()
        .flat_map(|v| match v {
            AnswerValue::Choices(c) => c
                .iter()
                .map(|v| {
                    let text = choice_text(v);
                    question.option_for(&text).map_or(text, |o| o.label.clone())
                })
                .unique()
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
        .counts();
    let known: Vec<String> = question.options.iter().map(|o| o.label.clone()).collect();
    let extra = counts.keys().filter(|k| !known.contains(*k)).sorted().cloned().collect_vec();
    let percent = |count: usize| if answered == 0 { 0.0 } else { count as f64 * 100.0 / answered as f64 };
    Stats::Choices(
        known
            .into_iter()
            .chain(extra)
            .map(|option| {
                let count = counts.get(&option).copied().unwrap_or(0);
                ChoiceCount {
                    option,
                    count,
                    percent: percent(count),
                }
            })
            .collect(),
    )
}

/// Non numeric answers are left out of every figure.
fn rating_stats(values: Vec<AnswerValue>) -> Stats {
    let ratings: Vec<i64> = values
        .into_iter()
        .filter_map(|v| match v {
            AnswerValue::Text(t) => t.trim().parse().ok(),
            _ => None,
        })
        .collect();
    if ratings.is_empty() {
        return Stats::Rating(RatingStats::default());
    }
    let mut histogram: BTreeMap<i64, usize> = BTreeMap::new();
    for r in &ratings {
        *histogram.entry(*r).or_default() += 1;
    }
    let (min, max) = ratings.iter().minmax().into_option().map_or((0, 0), |(a, b)| (*a, *b));
    Stats::Rating(RatingStats {
        avg: ratings.iter().map(|r| i128::from(*r)).sum::<i128>() as f64 / ratings.len() as f64,
        min,
        max,
        histogram: histogram.into_iter().map(|(rating, count)| RatingBucket { rating, count }).collect(),
    })
}

fn text_stats(values: Vec<AnswerValue>) -> Stats {
    let counts = values
        .into_iter()
        .filter_map(|v| match v {
            AnswerValue::Text(t) if !t.trim().is_empty() => Some(t),
            _ => None,
        })
        .counts();
    Stats::Texts(
        counts
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(answer, count)| TextCount { answer, count })
            .collect(),
    )
}

fn file_stats(values: Vec<(Option<i32>, AnswerValue)>) -> Stats {
    Stats::Files(
        values
            .into_iter()
            .filter_map(|(user_id, v)| match v {
                AnswerValue::FileReference(file) if !file.is_empty() => Some(FileEntry { user_id, file }),
                _ => None,
            })
            .collect(),
    )
}

pub fn summarize(question: &Question, answers: &[&Answer]) -> QuestionReport {
    let values = decoded(question, answers);
    let answered = values.len();
    let stats = match Codec::from(question.type_) {
        Codec::Choice { .. } => choice_stats(question, values.into_iter().map(|(_, v)| v).collect()),
        Codec::Text if question.type_ == QuestionType::Rating => rating_stats(values.into_iter().map(|(_, v)| v).collect()),
        Codec::Text => text_stats(values.into_iter().map(|(_, v)| v).collect()),
        Codec::File => file_stats(values),
    };
    QuestionReport {
        question_id: question.id,
        type_: question.type_,
        content: question.content.clone(),
        answered,
        stats,
    }
}

pub async fn dashboard<S>(store: &mut S, uid: i32, form_id: i32) -> Result<Dashboard, Error>
where
    S: Store,
{
    let form = FormCommon::get(store, form_id).await?;
    if !form.is_owned_by(uid) {
        return Err(Error::Forbidden);
    }
    let questions = QuestionCommon::query(store, QuestionQuery { form_id_eq: form_id }).await?;
    let answers = AnswerCommon::query(
        store,
        AnswerQuery {
            form_id_eq: Some(form_id),
            ..default::default()
        },
    )
    .await?;
    let by_question: HashMap<i32, Vec<&Answer>> = answers.iter().map(|a| (a.question_id, a)).into_group_map();
    let results = questions
        .iter()
        .map(|q| summarize(q, by_question.get(&q.id).map(Vec::as_slice).unwrap_or(&[])))
        .collect();
    Ok(Dashboard {
        form_id,
        response_count: form.response_count,
        results,
    })
}
