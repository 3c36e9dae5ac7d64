// src/grading/mod.rs

//! Exam submission and grading.

pub mod llm;
pub mod objective;
pub mod subjective;
pub mod submission;

pub use llm::{CompletionClient, LlmError, OpenAiCompletion};
pub use subjective::{EssayGrade, EssayPrompt, SubjectiveGrader};
pub use submission::{NOT_ANSWERED_FEEDBACK, Submission, submit_attempt};
