// src/handlers/exam.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{
        exam::{Difficulty, Exam, ExamFilter},
        question::PublicQuestion,
    },
    store::ExamStore,
};

/// Query parameters for the public exam catalogue.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

/// A published exam with its questions, answer keys removed.
#[derive(Debug, Serialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: Exam,
    pub questions: Vec<PublicQuestion>,
}

/// Lists published exams, optionally filtered by category and difficulty.
pub async fn list_exams(
    State(store): State<Arc<dyn ExamStore>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ExamFilter {
        category: params.category,
        difficulty: params.difficulty,
        ..ExamFilter::published()
    };

    let exams = store.list_exams(&filter).await?;

    Ok(Json(exams))
}

/// Retrieves a published exam and the questions a learner will answer.
pub async fn get_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = store
        .get_exam(id)
        .await?
        .filter(Exam::is_published)
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let questions = store
        .list_questions(exam.id)
        .await?
        .iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(Json(ExamDetail { exam, questions }))
}
