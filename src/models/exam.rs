// src/models/exam.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::{config::DEFAULT_PASSING_SCORE, error::AppError};

/// Publication state of an exam. Learners only see published exams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    #[default]
    Draft,
    Published,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Draft => "draft",
            ExamStatus::Published => "published",
        }
    }
}

impl FromStr for ExamStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ExamStatus::Draft),
            "published" => Ok(ExamStatus::Published),
            other => Err(AppError::InternalServerError(format!(
                "Unknown exam status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(AppError::InternalServerError(format!(
                "Unknown difficulty '{}'",
                other
            ))),
        }
    }
}

/// An exam as exposed by the API and held by the stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub title: String,

    /// Sanitized rich text.
    pub description: String,

    pub duration_minutes: i32,

    /// Minimum total score (0-100) required to pass.
    pub passing_score: i32,

    pub category: String,
    pub difficulty: Difficulty,
    pub status: ExamStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exam {
    pub fn is_published(&self) -> bool {
        self.status == ExamStatus::Published
    }
}

/// Represents the 'exams' table in the database.
/// Enum columns are stored as TEXT and parsed on the way out.
#[derive(Debug, FromRow)]
pub struct ExamRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration_minutes: i32,
    pub passing_score: i32,
    pub category: String,
    pub difficulty: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ExamRow> for Exam {
    type Error = AppError;

    fn try_from(row: ExamRow) -> Result<Self, Self::Error> {
        Ok(Exam {
            id: row.id,
            title: row.title,
            description: row.description,
            duration_minutes: row.duration_minutes,
            passing_score: row.passing_score,
            category: row.category,
            difficulty: row.difficulty.parse()?,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn default_passing_score() -> i32 {
    DEFAULT_PASSING_SCORE
}

/// DTO for creating a new exam.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub description: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,
    #[serde(default = "default_passing_score")]
    #[validate(range(min = 0, max = 100))]
    pub passing_score: i32,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub status: ExamStatus,
}

/// DTO for updating an exam. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i32>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<ExamStatus>,
}

impl UpdateExamRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.duration_minutes.is_none()
            && self.passing_score.is_none()
            && self.category.is_none()
            && self.difficulty.is_none()
            && self.status.is_none()
    }

    /// Applies the present fields to `exam` in place.
    pub fn apply(self, exam: &mut Exam) {
        if let Some(title) = self.title {
            exam.title = title;
        }
        if let Some(description) = self.description {
            exam.description = description;
        }
        if let Some(duration) = self.duration_minutes {
            exam.duration_minutes = duration;
        }
        if let Some(passing_score) = self.passing_score {
            exam.passing_score = passing_score;
        }
        if let Some(category) = self.category {
            exam.category = category;
        }
        if let Some(difficulty) = self.difficulty {
            exam.difficulty = difficulty;
        }
        if let Some(status) = self.status {
            exam.status = status;
        }
    }
}

/// Filters for listing exams. Also used as query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamFilter {
    pub status: Option<ExamStatus>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl ExamFilter {
    pub fn published() -> Self {
        Self {
            status: Some(ExamStatus::Published),
            ..Self::default()
        }
    }

    pub fn matches(&self, exam: &Exam) -> bool {
        self.status.is_none_or(|s| s == exam.status)
            && self.category.as_deref().is_none_or(|c| c == exam.category)
            && self.difficulty.is_none_or(|d| d == exam.difficulty)
    }
}
