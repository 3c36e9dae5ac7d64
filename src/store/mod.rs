// src/store/mod.rs

//! Persistence seam for exams, questions and attempts.
//!
//! Attempts are append-only: the trait exposes no way to update or delete them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, NewAttempt},
        exam::{CreateExamRequest, Exam, ExamFilter, UpdateExamRequest},
        question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ExamStore: Send + Sync {
    /// Lists exams matching `filter`, newest first.
    async fn list_exams(&self, filter: &ExamFilter) -> Result<Vec<Exam>, AppError>;

    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, AppError>;

    async fn create_exam(&self, req: CreateExamRequest) -> Result<Exam, AppError>;

    /// Returns `None` when the exam does not exist.
    async fn update_exam(&self, id: i64, req: UpdateExamRequest)
    -> Result<Option<Exam>, AppError>;

    /// Deletes the exam and its questions. Fails with `Conflict` when attempts reference it.
    async fn delete_exam(&self, id: i64) -> Result<bool, AppError>;

    /// Questions of an exam in display order, ties broken by id.
    async fn list_questions(&self, exam_id: i64) -> Result<Vec<Question>, AppError>;

    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError>;

    /// Fails with `NotFound` when the exam does not exist.
    async fn create_question(
        &self,
        exam_id: i64,
        req: CreateQuestionRequest,
    ) -> Result<Question, AppError>;

    async fn update_question(
        &self,
        id: i64,
        req: UpdateQuestionRequest,
    ) -> Result<Option<Question>, AppError>;

    async fn delete_question(&self, id: i64) -> Result<bool, AppError>;

    /// Appends a graded attempt and returns it with its assigned id.
    async fn create_attempt(&self, new: NewAttempt) -> Result<Attempt, AppError>;

    async fn get_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError>;

    /// Attempts recorded for an exam, newest first.
    async fn list_attempts(&self, exam_id: i64) -> Result<Vec<Attempt>, AppError>;
}
