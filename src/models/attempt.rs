// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::{config::MAX_SCORE, error::AppError, models::question::QuestionKind};

/// Raw learner answer: an option index for multiple-choice, free text for essays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    Choice(i64),
    Text(String),
}

impl SubmittedAnswer {
    /// Interprets the answer as an option index. Numeric text is accepted.
    pub fn as_choice(&self) -> Option<i64> {
        match self {
            SubmittedAnswer::Choice(index) => Some(*index),
            SubmittedAnswer::Text(text) => text.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            SubmittedAnswer::Choice(index) => index.to_string(),
            SubmittedAnswer::Text(text) => text.clone(),
        }
    }

    /// Blank essay text counts as no answer.
    pub fn is_blank(&self) -> bool {
        matches!(self, SubmittedAnswer::Text(text) if text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    #[default]
    Completed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Completed => "completed",
        }
    }
}

/// Graded outcome for a single question.
/// Question text and kind are snapshots taken at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: i64,
    pub question_text: String,
    pub kind: QuestionKind,
    pub user_answer: Option<SubmittedAnswer>,

    /// 0-100.
    pub score: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// A graded attempt that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttempt {
    pub exam_id: i64,
    pub user_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_score: i32,
    pub passing_score: i32,
    pub passed: bool,
    pub answers: Vec<AnswerResult>,
}

/// A stored attempt. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: i64,
    pub exam_id: i64,
    pub user_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: AttemptStatus,
    pub total_score: i32,
    pub max_score: i32,
    pub passing_score: i32,
    pub passed: bool,
    pub answers: Vec<AnswerResult>,
}

impl Attempt {
    pub fn from_new(id: i64, new: NewAttempt) -> Self {
        Attempt {
            id,
            exam_id: new.exam_id,
            user_name: new.user_name,
            started_at: new.started_at,
            completed_at: new.completed_at,
            status: AttemptStatus::Completed,
            total_score: new.total_score,
            max_score: MAX_SCORE as i32,
            passing_score: new.passing_score,
            passed: new.passed,
            answers: new.answers,
        }
    }
}

/// Represents the 'attempts' table in the database.
#[derive(Debug, FromRow)]
pub struct AttemptRow {
    pub id: i64,
    pub exam_id: i64,
    pub user_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: String,
    pub total_score: i32,
    pub max_score: i32,
    pub passing_score: i32,
    pub passed: bool,
    pub answers: Json<Vec<AnswerResult>>,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = AppError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "completed" => AttemptStatus::Completed,
            other => {
                return Err(AppError::InternalServerError(format!(
                    "Attempt {} has unknown status '{}'",
                    row.id, other
                )));
            }
        };

        Ok(Attempt {
            id: row.id,
            exam_id: row.exam_id,
            user_name: row.user_name,
            started_at: row.started_at,
            completed_at: row.completed_at,
            status,
            total_score: row.total_score,
            max_score: row.max_score,
            passing_score: row.passing_score,
            passed: row.passed,
            answers: row.answers.0,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_id: i64,
    #[serde(default)]
    pub answer: Option<SubmittedAnswer>,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    #[validate(required(message = "examId is required"))]
    pub exam_id: Option<i64>,
    #[validate(length(max = 100))]
    pub user_name: Option<String>,
    #[validate(length(max = 500))]
    pub answers: Vec<AnswerEntry>,
    #[validate(required(message = "startedAt is required"))]
    pub started_at: Option<DateTime<Utc>>,
}

/// Response body for a successful submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptResponse {
    pub attempt_id: i64,
    pub total_score: i32,
    pub max_score: i32,
    pub passing_score: i32,
    pub passed: bool,
    pub answers: Vec<AnswerResult>,
}

impl From<Attempt> for SubmitAttemptResponse {
    fn from(attempt: Attempt) -> Self {
        SubmitAttemptResponse {
            attempt_id: attempt.id,
            total_score: attempt.total_score,
            max_score: attempt.max_score,
            passing_score: attempt.passing_score,
            passed: attempt.passed,
            answers: attempt.answers,
        }
    }
}
