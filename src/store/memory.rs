// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, NewAttempt},
        exam::{CreateExamRequest, Difficulty, Exam, ExamFilter, ExamStatus, UpdateExamRequest},
        question::{CreateQuestionRequest, Question, QuestionBody, UpdateQuestionRequest},
    },
    store::ExamStore,
};

#[derive(Default)]
struct Inner {
    exams: BTreeMap<i64, Exam>,
    questions: BTreeMap<i64, Question>,
    attempts: Vec<Attempt>,
    next_exam_id: i64,
    next_question_id: i64,
    next_attempt_id: i64,
}

impl Inner {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// Process-local store used by tests and for running without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one published demo exam with two multiple-choice
    /// questions and one essay question.
    pub async fn seeded() -> Result<Self, AppError> {
        let store = Self::new();

        let exam = store
            .create_exam(CreateExamRequest {
                title: "Introduction to Contract Law".to_string(),
                description: "<p>Offer, acceptance and consideration.</p>".to_string(),
                duration_minutes: 30,
                passing_score: 60,
                category: "civil-law".to_string(),
                difficulty: Difficulty::Easy,
                status: ExamStatus::Published,
            })
            .await?;

        let questions = [
            (
                "Which element turns an agreement into a binding contract?",
                QuestionBody::MultipleChoice {
                    options: vec![
                        "A handshake".to_string(),
                        "Consideration".to_string(),
                        "A witness".to_string(),
                        "A notary".to_string(),
                    ],
                    correct_index: 1,
                },
                Some("Consideration is the value each party gives up."),
            ),
            (
                "An offer can be revoked at any time before...",
                QuestionBody::MultipleChoice {
                    options: vec![
                        "it is written down".to_string(),
                        "the offeror signs it".to_string(),
                        "it is accepted".to_string(),
                    ],
                    correct_index: 2,
                },
                None,
            ),
            (
                "Explain the difference between an offer and an invitation to treat.",
                QuestionBody::Essay {
                    model_answer: "An offer is a definite promise to be bound on specific \
                                   terms once accepted; an invitation to treat only invites \
                                   offers, as with goods displayed in a shop."
                        .to_string(),
                },
                None,
            ),
        ];

        for (content, body, explanation) in questions {
            store
                .create_question(
                    exam.id,
                    CreateQuestionRequest {
                        content: content.to_string(),
                        body,
                        explanation: explanation.map(str::to_string),
                        subject: Some("contract law".to_string()),
                        display_order: None,
                    },
                )
                .await?;
        }

        Ok(store)
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn list_exams(&self, filter: &ExamFilter) -> Result<Vec<Exam>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .exams
            .values()
            .rev()
            .filter(|exam| filter.matches(exam))
            .cloned()
            .collect())
    }

    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        Ok(self.inner.read().await.exams.get(&id).cloned())
    }

    async fn create_exam(&self, req: CreateExamRequest) -> Result<Exam, AppError> {
        let mut inner = self.inner.write().await;
        let id = Inner::next_id(&mut inner.next_exam_id);
        let now = Utc::now();

        let exam = Exam {
            id,
            title: req.title,
            description: req.description,
            duration_minutes: req.duration_minutes,
            passing_score: req.passing_score,
            category: req.category,
            difficulty: req.difficulty,
            status: req.status,
            created_at: now,
            updated_at: now,
        };
        inner.exams.insert(id, exam.clone());

        Ok(exam)
    }

    async fn update_exam(
        &self,
        id: i64,
        req: UpdateExamRequest,
    ) -> Result<Option<Exam>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(exam) = inner.exams.get_mut(&id) else {
            return Ok(None);
        };

        if !req.is_empty() {
            req.apply(exam);
            exam.updated_at = Utc::now();
        }

        Ok(Some(exam.clone()))
    }

    async fn delete_exam(&self, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;

        if inner.attempts.iter().any(|a| a.exam_id == id) {
            return Err(AppError::Conflict(
                "Exam has recorded attempts and cannot be deleted".to_string(),
            ));
        }

        if inner.exams.remove(&id).is_none() {
            return Ok(false);
        }
        inner.questions.retain(|_, q| q.exam_id != id);

        Ok(true)
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<Question>, AppError> {
        let inner = self.inner.read().await;
        let mut questions: Vec<Question> = inner
            .questions
            .values()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.display_order, q.id));

        Ok(questions)
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        Ok(self.inner.read().await.questions.get(&id).cloned())
    }

    async fn create_question(
        &self,
        exam_id: i64,
        req: CreateQuestionRequest,
    ) -> Result<Question, AppError> {
        let mut inner = self.inner.write().await;

        if !inner.exams.contains_key(&exam_id) {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }

        let display_order = match req.display_order {
            Some(order) => order,
            None => {
                inner
                    .questions
                    .values()
                    .filter(|q| q.exam_id == exam_id)
                    .map(|q| q.display_order)
                    .max()
                    .unwrap_or(0)
                    .saturating_add(1)
            }
        };

        let id = Inner::next_id(&mut inner.next_question_id);
        let question = Question {
            id,
            exam_id,
            content: req.content,
            body: req.body,
            explanation: req.explanation,
            subject: req.subject,
            display_order,
            created_at: Utc::now(),
        };
        inner.questions.insert(id, question.clone());

        Ok(question)
    }

    async fn update_question(
        &self,
        id: i64,
        req: UpdateQuestionRequest,
    ) -> Result<Option<Question>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(question) = inner.questions.get_mut(&id) else {
            return Ok(None);
        };
        req.apply(question);

        Ok(Some(question.clone()))
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.inner.write().await.questions.remove(&id).is_some())
    }

    async fn create_attempt(&self, new: NewAttempt) -> Result<Attempt, AppError> {
        let mut inner = self.inner.write().await;

        if !inner.exams.contains_key(&new.exam_id) {
            return Err(AppError::InternalServerError(format!(
                "Cannot record attempt for missing exam {}",
                new.exam_id
            )));
        }

        let id = Inner::next_id(&mut inner.next_attempt_id);
        let attempt = Attempt::from_new(id, new);
        inner.attempts.push(attempt.clone());

        Ok(attempt)
    }

    async fn get_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_attempts(&self, exam_id: i64) -> Result<Vec<Attempt>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .iter()
            .rev()
            .filter(|a| a.exam_id == exam_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam_request(status: ExamStatus) -> CreateExamRequest {
        CreateExamRequest {
            title: "Criminal Procedure".to_string(),
            description: String::new(),
            duration_minutes: 20,
            passing_score: 50,
            category: "criminal-law".to_string(),
            difficulty: Difficulty::Medium,
            status,
        }
    }

    fn essay(content: &str, order: Option<i32>) -> CreateQuestionRequest {
        CreateQuestionRequest {
            content: content.to_string(),
            body: QuestionBody::Essay {
                model_answer: "model".to_string(),
            },
            explanation: None,
            subject: None,
            display_order: order,
        }
    }

    fn new_attempt(exam_id: i64) -> NewAttempt {
        NewAttempt {
            exam_id,
            user_name: Some("Somchai".to_string()),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            total_score: 80,
            passing_score: 50,
            passed: true,
            answers: vec![],
        }
    }

    #[tokio::test]
    async fn test_reads_are_idempotent() {
        let store = MemoryStore::new();
        let exam = store.create_exam(exam_request(ExamStatus::Published)).await.unwrap();
        let question = store.create_question(exam.id, essay("Q1", None)).await.unwrap();

        let first = store.get_exam(exam.id).await.unwrap();
        let second = store.get_exam(exam.id).await.unwrap();
        assert_eq!(first, second);

        let q1 = store.get_question(question.id).await.unwrap();
        let q2 = store.get_question(question.id).await.unwrap();
        assert_eq!(q1, q2);

        let l1 = store.list_questions(exam.id).await.unwrap();
        let l2 = store.list_questions(exam.id).await.unwrap();
        assert_eq!(l1, l2);
    }

    #[tokio::test]
    async fn test_questions_ordered_by_display_order() {
        let store = MemoryStore::new();
        let exam = store.create_exam(exam_request(ExamStatus::Draft)).await.unwrap();

        let late = store.create_question(exam.id, essay("late", Some(5))).await.unwrap();
        let early = store.create_question(exam.id, essay("early", Some(1))).await.unwrap();
        let appended = store.create_question(exam.id, essay("appended", None)).await.unwrap();

        assert_eq!(appended.display_order, 6);

        let ids: Vec<i64> = store
            .list_questions(exam.id)
            .await
            .unwrap()
            .iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id, appended.id]);
    }

    #[tokio::test]
    async fn test_appended_display_order_saturates() {
        let store = MemoryStore::new();
        let exam = store.create_exam(exam_request(ExamStatus::Draft)).await.unwrap();

        store.create_question(exam.id, essay("last", Some(i32::MAX))).await.unwrap();
        let appended = store.create_question(exam.id, essay("appended", None)).await.unwrap();

        assert_eq!(appended.display_order, i32::MAX);
    }

    #[tokio::test]
    async fn test_create_question_requires_exam() {
        let store = MemoryStore::new();
        let result = store.create_question(42, essay("orphan", None)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_attempts_are_append_only_with_unique_ids() {
        let store = MemoryStore::new();
        let exam = store.create_exam(exam_request(ExamStatus::Published)).await.unwrap();

        let a = store.create_attempt(new_attempt(exam.id)).await.unwrap();
        let b = store.create_attempt(new_attempt(exam.id)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.max_score, 100);

        let listed = store.list_attempts(exam.id).await.unwrap();
        assert_eq!(listed.iter().map(|x| x.id).collect::<Vec<_>>(), vec![b.id, a.id]);
        assert_eq!(store.get_attempt(a.id).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn test_delete_exam_with_attempts_conflicts() {
        let store = MemoryStore::new();
        let exam = store.create_exam(exam_request(ExamStatus::Published)).await.unwrap();
        store.create_question(exam.id, essay("Q", None)).await.unwrap();
        store.create_attempt(new_attempt(exam.id)).await.unwrap();

        let result = store.delete_exam(exam.id).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(store.get_exam(exam.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_exam_cascades_questions() {
        let store = MemoryStore::new();
        let exam = store.create_exam(exam_request(ExamStatus::Draft)).await.unwrap();
        let q = store.create_question(exam.id, essay("Q", None)).await.unwrap();

        assert!(store.delete_exam(exam.id).await.unwrap());
        assert!(store.get_question(q.id).await.unwrap().is_none());
        assert!(!store.delete_exam(exam.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_exam_partial() {
        let store = MemoryStore::new();
        let exam = store.create_exam(exam_request(ExamStatus::Draft)).await.unwrap();

        let updated = store
            .update_exam(
                exam.id,
                UpdateExamRequest {
                    status: Some(ExamStatus::Published),
                    ..UpdateExamRequest::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, ExamStatus::Published);
        assert_eq!(updated.title, exam.title);
        assert!(
            store
                .update_exam(999, UpdateExamRequest::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_seeded_store_has_published_exam() {
        let store = MemoryStore::seeded().await.unwrap();
        let exams = store.list_exams(&ExamFilter::published()).await.unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(store.list_questions(exams[0].id).await.unwrap().len(), 3);
    }
}
