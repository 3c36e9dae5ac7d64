// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam, ExamFilter, UpdateExamRequest},
        question::{
            CreateQuestionRequest, Question, UpdateQuestionRequest, validate_question_body,
        },
    },
    store::ExamStore,
    utils::{extract::ValidatedJson, html::clean_html, jwt::Claims},
};

/// Admin view of an exam: every question including answer keys.
#[derive(Debug, Serialize)]
pub struct AdminExamDetail {
    #[serde(flatten)]
    pub exam: Exam,
    pub questions: Vec<Question>,
}

async fn require_exam(store: &dyn ExamStore, id: i64) -> Result<Exam, AppError> {
    store
        .get_exam(id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Lists all exams, drafts included.
/// Admin only.
pub async fn list_exams(
    State(store): State<Arc<dyn ExamStore>>,
    Query(filter): Query<ExamFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_exams(&filter).await?))
}

/// Creates a new exam.
/// Admin only.
pub async fn create_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(mut payload): ValidatedJson<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.description = clean_html(&payload.description);

    let exam = store.create_exam(payload).await?;
    tracing::info!("Exam {} created by {}", exam.id, claims.sub);

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Retrieves an exam with full question data.
/// Admin only.
pub async fn get_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = require_exam(store.as_ref(), id).await?;
    let questions = store.list_questions(id).await?;

    Ok(Json(AdminExamDetail { exam, questions }))
}

/// Updates an exam. Fields are optional.
/// Admin only.
pub async fn update_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
    ValidatedJson(mut payload): ValidatedJson<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.description = payload.description.as_deref().map(clean_html);

    let exam = store
        .update_exam(id, payload)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    Ok(Json(exam))
}

/// Deletes an exam and its questions. Refused once attempts exist.
/// Admin only.
pub async fn delete_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_exam(id).await? {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }
    tracing::info!("Exam {} deleted by {}", id, claims.sub);

    Ok(StatusCode::NO_CONTENT)
}

/// Lists an exam's questions in display order.
/// Admin only.
pub async fn list_questions(
    State(store): State<Arc<dyn ExamStore>>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_exam(store.as_ref(), exam_id).await?;

    Ok(Json(store.list_questions(exam_id).await?))
}

/// Adds a question to an exam.
/// Admin only.
pub async fn create_question(
    State(store): State<Arc<dyn ExamStore>>,
    Path(exam_id): Path<i64>,
    ValidatedJson(mut payload): ValidatedJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.content = clean_html(&payload.content);

    let question = store.create_question(exam_id, payload).await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Admin only.
pub async fn get_question(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = store
        .get_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Updates a question. A present `body` replaces the kind-specific fields.
/// Admin only.
pub async fn update_question(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
    ValidatedJson(mut payload): ValidatedJson<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(body) = &payload.body {
        validate_question_body(body).map_err(|e| AppError::BadRequest(e.to_string()))?;
    }
    payload.content = payload.content.as_deref().map(clean_html);

    let question = store
        .update_question(id, payload)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Admin only.
pub async fn delete_question(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_question(id).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Attempt history for an exam, newest first.
/// Admin only.
pub async fn list_attempts(
    State(store): State<Arc<dyn ExamStore>>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_exam(store.as_ref(), exam_id).await?;

    Ok(Json(store.list_attempts(exam_id).await?))
}
