// src/handlers/attempt.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    grading::{self, SubjectiveGrader, Submission},
    models::attempt::{SubmitAttemptRequest, SubmitAttemptResponse},
    store::ExamStore,
    utils::extract::ValidatedJson,
};

/// Submits a learner's answers for grading.
///
/// * 400 when the body is malformed or `examId` or `startedAt` is missing.
/// * 404 when the exam does not exist, is unpublished, or has no questions.
/// * 201 with the graded breakdown otherwise. Essay grading failures never fail the request.
pub async fn submit_attempt(
    State(store): State<Arc<dyn ExamStore>>,
    State(grader): State<Arc<SubjectiveGrader>>,
    ValidatedJson(req): ValidatedJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exam_id = req
        .exam_id
        .ok_or(AppError::BadRequest("examId is required".to_string()))?;
    let started_at = req
        .started_at
        .ok_or(AppError::BadRequest("startedAt is required".to_string()))?;

    let submission = Submission {
        exam_id,
        user_name: req
            .user_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        started_at,
        answers: req.answers,
    };

    let attempt = grading::submit_attempt(store.as_ref(), &grader, submission).await?;

    tracing::info!(
        "Recorded attempt {} for exam {} (score {})",
        attempt.id,
        attempt.exam_id,
        attempt.total_score
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitAttemptResponse::from(attempt)),
    ))
}

/// Retrieves a recorded attempt with its per-question results.
pub async fn get_attempt(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = store
        .get_attempt(id)
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    Ok(Json(attempt))
}
