// src/grading/subjective.rs

//! AI-assisted essay grading.
//!
//! The grader never fails: timeouts, transport errors and unparseable replies
//! all end in [`EssayGrade::degraded`] once retries are exhausted.

use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::MAX_SCORE,
    grading::llm::{CompletionClient, LlmError},
};

pub const GRADING_FAILED_FEEDBACK: &str =
    "This answer could not be graded automatically at the moment.";

pub const RETRY_SUGGESTION: &str = "Please try again later to receive AI feedback on this answer.";

const EMPTY_FEEDBACK: &str = "No feedback was provided.";

/// Score written as text: `65`, `65%`, `65/100`.
static SCORE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*(?:%|/\s*100)?\s*$").expect("score pattern is valid")
});

/// Delay before the first retry; multiplied by the retry number.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

const SYSTEM_PROMPT: &str = "You are a strict but fair examiner for a legal education platform. \
     You grade student answers against a model answer and reply with JSON only.";

#[derive(Debug, thiserror::Error)]
pub enum GradingError {
    #[error("grading timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("unparseable grading response: {0}")]
    Parse(String),
}

/// Inputs for grading one essay answer.
#[derive(Debug, Clone, Copy)]
pub struct EssayPrompt<'a> {
    pub question: &'a str,
    pub model_answer: &'a str,
    pub student_answer: &'a str,
    pub subject: Option<&'a str>,
}

impl EssayPrompt<'_> {
    fn render(&self) -> String {
        let subject = self.subject.unwrap_or("law");
        format!(
            r#"Grade the following {subject} exam answer.

Question:
{question}

Model answer:
{model_answer}

Student answer:
{student_answer}

Compare the student answer with the model answer for accuracy, completeness and legal reasoning.
Respond with a single JSON object and nothing else, in exactly this shape:
{{
  "score": <integer from 0 to 100>,
  "feedback": "<overall feedback in two or three sentences>",
  "strengths": ["<short point>", ...],
  "weaknesses": ["<short point>", ...],
  "suggestions": ["<short point>", ...]
}}"#,
            question = self.question,
            model_answer = self.model_answer,
            student_answer = self.student_answer,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EssayGrade {
    /// 0-100.
    pub score: i32,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

impl EssayGrade {
    /// Fallback used when the completion service cannot produce a usable grade.
    pub fn degraded() -> Self {
        EssayGrade {
            score: 0,
            feedback: GRADING_FAILED_FEEDBACK.to_string(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            suggestions: vec![RETRY_SUGGESTION.to_string()],
        }
    }
}

pub struct SubjectiveGrader {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    max_retries: u32,
}

impl SubjectiveGrader {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            client,
            timeout,
            max_retries,
        }
    }

    pub async fn grade(&self, prompt: &EssayPrompt<'_>) -> EssayGrade {
        let user_message = prompt.render();

        for attempt in 0..=self.max_retries {
            match self.try_grade(&user_message).await {
                Ok(grade) => return grade,
                Err(e) => {
                    warn!(attempt, error = %e, "Essay grading attempt failed");
                    if attempt < self.max_retries {
                        tokio::time::sleep(RETRY_BACKOFF * (attempt + 1)).await;
                    }
                }
            }
        }

        warn!("Essay grading degraded after {} attempt(s)", self.max_retries + 1);
        EssayGrade::degraded()
    }

    async fn try_grade(&self, user_message: &str) -> Result<EssayGrade, GradingError> {
        let reply = tokio::time::timeout(
            self.timeout,
            self.client.complete(SYSTEM_PROMPT, user_message),
        )
        .await
        .map_err(|_| GradingError::Timeout(self.timeout))??;

        debug!("Grading reply length: {}", reply.len());
        parse_grade(&reply)
    }
}

/// Locates the JSON object in a free-text model reply.
///
/// Returns the first balanced `{...}` span, fenced or not, with braces inside
/// string literals ignored.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parses a model reply into a grade, clamping the score into [0, 100].
pub fn parse_grade(text: &str) -> Result<EssayGrade, GradingError> {
    let block = extract_json_block(text)
        .ok_or_else(|| GradingError::Parse("no JSON object in reply".to_string()))?;

    let value: Value =
        serde_json::from_str(block).map_err(|e| GradingError::Parse(e.to_string()))?;

    let score = value
        .get("score")
        .and_then(score_from_value)
        .ok_or_else(|| GradingError::Parse("missing or non-numeric score".to_string()))?;

    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(EMPTY_FEEDBACK)
        .to_string();

    Ok(EssayGrade {
        score,
        feedback,
        strengths: string_list(value.get("strengths")),
        weaknesses: string_list(value.get("weaknesses")),
        suggestions: string_list(value.get("suggestions")),
    })
}

fn score_from_value(value: &Value) -> Option<i32> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => SCORE_TEXT
            .captures(s)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())?,
        _ => return None,
    };

    if !raw.is_finite() {
        return None;
    }

    Some(raw.clamp(0.0, MAX_SCORE as f64).round() as i32)
}

/// Accepts an array of strings or a single string; anything else is empty.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
