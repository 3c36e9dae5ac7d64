// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    Essay,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::Essay => "essay",
        }
    }
}

/// Kind-specific part of a question, selected by the `kind` discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionBody {
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        options: Vec<String>,
        /// Zero-based index into `options`.
        correct_index: i32,
    },
    #[serde(rename_all = "camelCase")]
    Essay { model_answer: String },
}

impl QuestionBody {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionBody::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            QuestionBody::Essay { .. } => QuestionKind::Essay,
        }
    }
}

/// A question owned by exactly one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,

    /// The text content of the question.
    pub content: String,

    #[serde(flatten)]
    pub body: QuestionBody,

    /// Explanation shown to the learner after grading.
    pub explanation: Option<String>,

    /// Subject tag, also passed to the essay grader.
    pub subject: Option<String>,

    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        self.body.kind()
    }
}

/// Represents the 'questions' table in the database.
/// Kind-specific columns are nullable; `kind` decides which ones apply.
#[derive(Debug, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub exam_id: i64,
    pub kind: String,
    pub content: String,
    pub options: Option<Json<Vec<String>>>,
    pub correct_index: Option<i32>,
    pub model_answer: Option<String>,
    pub explanation: Option<String>,
    pub subject: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let body = match row.kind.as_str() {
            "multiple-choice" => QuestionBody::MultipleChoice {
                options: row.options.map(|o| o.0).unwrap_or_default(),
                correct_index: row.correct_index.ok_or_else(|| {
                    AppError::InternalServerError(format!(
                        "Question {} has no correct index",
                        row.id
                    ))
                })?,
            },
            "essay" => QuestionBody::Essay {
                model_answer: row.model_answer.unwrap_or_default(),
            },
            other => {
                return Err(AppError::InternalServerError(format!(
                    "Question {} has unknown kind '{}'",
                    row.id, other
                )));
            }
        };

        Ok(Question {
            id: row.id,
            exam_id: row.exam_id,
            content: row.content,
            body,
            explanation: row.explanation,
            subject: row.subject,
            display_order: row.display_order,
            created_at: row.created_at,
        })
    }
}

/// DTO for sending a question to learners (no answer key, no model answer).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub kind: QuestionKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub subject: Option<String>,
    pub display_order: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        let options = match &q.body {
            QuestionBody::MultipleChoice { options, .. } => Some(options.clone()),
            QuestionBody::Essay { .. } => None,
        };

        PublicQuestion {
            id: q.id,
            kind: q.kind(),
            content: q.content.clone(),
            options,
            subject: q.subject.clone(),
            display_order: q.display_order,
        }
    }
}

/// DTO for creating a new question under an exam.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    #[serde(flatten)]
    #[validate(custom(function = validate_question_body))]
    pub body: QuestionBody,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
    /// Defaults to the end of the exam's question list.
    #[validate(range(min = 0, max = 10000))]
    pub display_order: Option<i32>,
}

/// DTO for updating a question. Fields are optional; `body` replaces the kind-specific part as a whole.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: Option<String>,
    pub body: Option<QuestionBody>,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
    #[validate(range(min = 0, max = 10000))]
    pub display_order: Option<i32>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.body.is_none()
            && self.explanation.is_none()
            && self.subject.is_none()
            && self.display_order.is_none()
    }

    pub fn apply(self, question: &mut Question) {
        if let Some(content) = self.content {
            question.content = content;
        }
        if let Some(body) = self.body {
            question.body = body;
        }
        if let Some(explanation) = self.explanation {
            question.explanation = Some(explanation);
        }
        if let Some(subject) = self.subject {
            question.subject = Some(subject);
        }
        if let Some(order) = self.display_order {
            question.display_order = order;
        }
    }
}

/// Multiple-choice bodies need at least two bounded options and an in-range answer key.
pub fn validate_question_body(body: &QuestionBody) -> Result<(), validator::ValidationError> {
    match body {
        QuestionBody::MultipleChoice {
            options,
            correct_index,
        } => {
            if options.len() < 2 {
                return Err(validator::ValidationError::new("options_need_at_least_two"));
            }
            for opt in options {
                if opt.is_empty() || opt.len() > 500 {
                    return Err(validator::ValidationError::new("option_length_invalid"));
                }
            }
            let in_range = usize::try_from(*correct_index).is_ok_and(|i| i < options.len());
            if !in_range {
                return Err(validator::ValidationError::new("correct_index_out_of_range"));
            }
        }
        QuestionBody::Essay { model_answer } => {
            if model_answer.trim().is_empty() || model_answer.len() > 10000 {
                return Err(validator::ValidationError::new("model_answer_length_invalid"));
            }
        }
    }
    Ok(())
}
