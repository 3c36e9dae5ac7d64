// src/grading/submission.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::{
    error::AppError,
    grading::{
        objective,
        subjective::{EssayPrompt, SubjectiveGrader},
    },
    models::{
        attempt::{AnswerEntry, AnswerResult, Attempt, NewAttempt, SubmittedAnswer},
        question::{Question, QuestionBody},
    },
    store::ExamStore,
};

pub const NOT_ANSWERED_FEEDBACK: &str = "Not answered";

/// A validated submission, ready for grading.
#[derive(Debug, Clone)]
pub struct Submission {
    pub exam_id: i64,
    pub user_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub answers: Vec<AnswerEntry>,
}

/// Grades a submission against the stored exam and records exactly one attempt.
///
/// * NotFound if the exam is missing, unpublished, or has no questions.
/// * Every exam question gets a result; missing answers score 0.
/// * Questions are graded concurrently; results keep question order.
/// * Nothing is written unless grading completed.
pub async fn submit_attempt(
    store: &dyn ExamStore,
    grader: &SubjectiveGrader,
    submission: Submission,
) -> Result<Attempt, AppError> {
    let exam = store
        .get_exam(submission.exam_id)
        .await?
        .filter(|exam| exam.is_published())
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let questions = store.list_questions(exam.id).await?;
    if questions.is_empty() {
        return Err(AppError::NotFound("Exam has no questions".to_string()));
    }

    // First answer wins when a question id is repeated.
    let mut answers: HashMap<i64, &SubmittedAnswer> = HashMap::new();
    for entry in &submission.answers {
        if let Some(answer) = &entry.answer {
            answers.entry(entry.question_id).or_insert(answer);
        }
    }

    let results: Vec<AnswerResult> = join_all(
        questions
            .iter()
            .map(|question| grade_question(grader, question, answers.get(&question.id).copied())),
    )
    .await;

    let scores: Vec<i32> = results.iter().map(|r| r.score).collect();
    let total_score = aggregate_score(&scores);
    let passed = total_score >= exam.passing_score;

    tracing::info!(
        exam_id = exam.id,
        total_score,
        passed,
        questions = results.len(),
        "Graded exam submission"
    );

    store
        .create_attempt(NewAttempt {
            exam_id: exam.id,
            user_name: submission.user_name,
            started_at: submission.started_at,
            completed_at: Utc::now(),
            total_score,
            passing_score: exam.passing_score,
            passed,
            answers: results,
        })
        .await
}

async fn grade_question(
    grader: &SubjectiveGrader,
    question: &Question,
    answer: Option<&SubmittedAnswer>,
) -> AnswerResult {
    let mut result = AnswerResult {
        question_id: question.id,
        question_text: question.content.clone(),
        kind: question.kind(),
        user_answer: answer.cloned(),
        score: 0,
        is_correct: None,
        selected_index: None,
        correct_index: None,
        explanation: question.explanation.clone(),
        feedback: None,
        strengths: Vec::new(),
        weaknesses: Vec::new(),
        suggestions: Vec::new(),
    };

    let answer = match answer.filter(|a| !a.is_blank()) {
        Some(answer) => answer,
        None => {
            if let QuestionBody::MultipleChoice { correct_index, .. } = &question.body {
                result.is_correct = Some(false);
                result.correct_index = Some(*correct_index);
            }
            result.feedback = Some(NOT_ANSWERED_FEEDBACK.to_string());
            return result;
        }
    };

    match &question.body {
        QuestionBody::MultipleChoice { correct_index, .. } => {
            let selected = answer.as_choice();
            let correct =
                selected.is_some_and(|s| objective::is_correct(s, i64::from(*correct_index)));

            result.selected_index = selected;
            result.correct_index = Some(*correct_index);
            result.is_correct = Some(correct);
            result.score = objective::score(correct);
        }
        QuestionBody::Essay { model_answer } => {
            let student_answer = answer.as_text();
            let grade = grader
                .grade(&EssayPrompt {
                    question: &question.content,
                    model_answer,
                    student_answer: &student_answer,
                    subject: question.subject.as_deref(),
                })
                .await;

            result.score = grade.score;
            result.feedback = Some(grade.feedback);
            result.strengths = grade.strengths;
            result.weaknesses = grade.weaknesses;
            result.suggestions = grade.suggestions;
        }
    }

    result
}

/// Mean of per-question scores rounded half up. Empty input scores 0.
pub fn aggregate_score(scores: &[i32]) -> i32 {
    if scores.is_empty() {
        return 0;
    }

    let sum: i64 = scores.iter().map(|&s| i64::from(s)).sum();
    let n = scores.len() as i64;

    // floor((sum / n) + 1/2) in integer arithmetic
    ((2 * sum + n).div_euclid(2 * n)) as i32
}
