// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptRow, AttemptStatus, NewAttempt},
        exam::{CreateExamRequest, Exam, ExamFilter, ExamRow, UpdateExamRequest},
        question::{
            CreateQuestionRequest, Question, QuestionBody, QuestionRow, UpdateQuestionRequest,
        },
    },
    store::ExamStore,
};

const EXAM_COLUMNS: &str = "id, title, description, duration_minutes, passing_score, category, \
                            difficulty, status, created_at, updated_at";

const QUESTION_COLUMNS: &str = "id, exam_id, kind, content, options, correct_index, model_answer, \
                                explanation, subject, display_order, created_at";

const ATTEMPT_COLUMNS: &str = "id, exam_id, user_name, started_at, completed_at, status, \
                               total_score, max_score, passing_score, passed, answers";

/// Postgres error code for foreign key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == FOREIGN_KEY_VIOLATION)
}

/// Column values for the kind-specific part of a question.
struct BodyColumns {
    kind: &'static str,
    options: Option<Json<Vec<String>>>,
    correct_index: Option<i32>,
    model_answer: Option<String>,
}

impl From<QuestionBody> for BodyColumns {
    fn from(body: QuestionBody) -> Self {
        let kind = body.kind().as_str();
        match body {
            QuestionBody::MultipleChoice {
                options,
                correct_index,
            } => BodyColumns {
                kind,
                options: Some(Json(options)),
                correct_index: Some(correct_index),
                model_answer: None,
            },
            QuestionBody::Essay { model_answer } => BodyColumns {
                kind,
                options: None,
                correct_index: None,
                model_answer: Some(model_answer),
            },
        }
    }
}

/// Exam store backed by PostgreSQL. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamStore for PgStore {
    async fn list_exams(&self, filter: &ExamFilter) -> Result<Vec<Exam>, AppError> {
        let rows = sqlx::query_as::<_, ExamRow>(&format!(
            r#"
            SELECT {EXAM_COLUMNS}
            FROM exams
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR category = $2)
              AND ($3::TEXT IS NULL OR difficulty = $3)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.category.as_deref())
        .bind(filter.difficulty.map(|d| d.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list exams: {:?}", e);
            AppError::from(e)
        })?;

        rows.into_iter().map(Exam::try_from).collect()
    }

    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        sqlx::query_as::<_, ExamRow>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Exam::try_from)
            .transpose()
    }

    async fn create_exam(&self, req: CreateExamRequest) -> Result<Exam, AppError> {
        let row = sqlx::query_as::<_, ExamRow>(&format!(
            r#"
            INSERT INTO exams
            (title, description, duration_minutes, passing_score, category, difficulty, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(req.title)
        .bind(req.description)
        .bind(req.duration_minutes)
        .bind(req.passing_score)
        .bind(req.category)
        .bind(req.difficulty.as_str())
        .bind(req.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create exam: {:?}", e);
            AppError::from(e)
        })?;

        Exam::try_from(row)
    }

    async fn update_exam(
        &self,
        id: i64,
        req: UpdateExamRequest,
    ) -> Result<Option<Exam>, AppError> {
        if req.is_empty() {
            return self.get_exam(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE exams SET ");
        let mut separated = builder.separated(", ");

        if let Some(title) = req.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }

        if let Some(description) = req.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }

        if let Some(duration) = req.duration_minutes {
            separated.push("duration_minutes = ");
            separated.push_bind_unseparated(duration);
        }

        if let Some(passing_score) = req.passing_score {
            separated.push("passing_score = ");
            separated.push_bind_unseparated(passing_score);
        }

        if let Some(category) = req.category {
            separated.push("category = ");
            separated.push_bind_unseparated(category);
        }

        if let Some(difficulty) = req.difficulty {
            separated.push("difficulty = ");
            separated.push_bind_unseparated(difficulty.as_str());
        }

        if let Some(status) = req.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status.as_str());
        }

        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {EXAM_COLUMNS}"));

        let row = builder
            .build_query_as::<ExamRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update exam: {:?}", e);
                AppError::from(e)
            })?;

        row.map(Exam::try_from).transpose()
    }

    async fn delete_exam(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::Conflict("Exam has recorded attempts and cannot be deleted".to_string())
                } else {
                    tracing::error!("Failed to delete exam: {:?}", e);
                    AppError::from(e)
                }
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY display_order, id"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::from(e)
        })?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Question::try_from)
        .transpose()
    }

    async fn create_question(
        &self,
        exam_id: i64,
        req: CreateQuestionRequest,
    ) -> Result<Question, AppError> {
        let body = BodyColumns::from(req.body);

        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            r#"
            INSERT INTO questions
            (exam_id, kind, content, options, correct_index, model_answer, explanation, subject, display_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                COALESCE($9, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM questions WHERE exam_id = $1)))
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(exam_id)
        .bind(body.kind)
        .bind(req.content)
        .bind(body.options)
        .bind(body.correct_index)
        .bind(body.model_answer)
        .bind(req.explanation)
        .bind(req.subject)
        .bind(req.display_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound("Exam not found".to_string())
            } else {
                tracing::error!("Failed to create question: {:?}", e);
                AppError::from(e)
            }
        })?;

        Question::try_from(row)
    }

    async fn update_question(
        &self,
        id: i64,
        req: UpdateQuestionRequest,
    ) -> Result<Option<Question>, AppError> {
        if req.is_empty() {
            return self.get_question(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
        let mut separated = builder.separated(", ");

        if let Some(content) = req.content {
            separated.push("content = ");
            separated.push_bind_unseparated(content);
        }

        if let Some(body) = req.body {
            let body = BodyColumns::from(body);
            separated.push("kind = ");
            separated.push_bind_unseparated(body.kind);
            separated.push("options = ");
            separated.push_bind_unseparated(body.options);
            separated.push("correct_index = ");
            separated.push_bind_unseparated(body.correct_index);
            separated.push("model_answer = ");
            separated.push_bind_unseparated(body.model_answer);
        }

        if let Some(explanation) = req.explanation {
            separated.push("explanation = ");
            separated.push_bind_unseparated(explanation);
        }

        if let Some(subject) = req.subject {
            separated.push("subject = ");
            separated.push_bind_unseparated(subject);
        }

        if let Some(order) = req.display_order {
            separated.push("display_order = ");
            separated.push_bind_unseparated(order);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {QUESTION_COLUMNS}"));

        let row = builder
            .build_query_as::<QuestionRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update question: {:?}", e);
                AppError::from(e)
            })?;

        row.map(Question::try_from).transpose()
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete question: {:?}", e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_attempt(&self, new: NewAttempt) -> Result<Attempt, AppError> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            r#"
            INSERT INTO attempts
            (exam_id, user_name, started_at, completed_at, status, total_score, max_score,
             passing_score, passed, answers)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(new.exam_id)
        .bind(new.user_name)
        .bind(new.started_at)
        .bind(new.completed_at)
        .bind(AttemptStatus::Completed.as_str())
        .bind(new.total_score)
        .bind(crate::config::MAX_SCORE as i32)
        .bind(new.passing_score)
        .bind(new.passed)
        .bind(Json(new.answers))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record attempt: {:?}", e);
            AppError::from(e)
        })?;

        Attempt::try_from(row)
    }

    async fn get_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Attempt::try_from)
        .transpose()
    }

    async fn list_attempts(&self, exam_id: i64) -> Result<Vec<Attempt>, AppError> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE exam_id = $1 ORDER BY completed_at DESC, id DESC"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list attempts: {:?}", e);
            AppError::from(e)
        })?;

        rows.into_iter().map(Attempt::try_from).collect()
    }
}
