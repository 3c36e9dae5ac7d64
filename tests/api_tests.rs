// tests/api_tests.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lawslane::{
    config::Config,
    grading::{CompletionClient, LlmError, NOT_ANSWERED_FEEDBACK, SubjectiveGrader},
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::{ADMIN_ROLE, sign_jwt},
};
use serde_json::{Value, json};

const JWT_SECRET: &str = "test_secret_for_integration_tests";
const STARTED_AT: &str = "2025-01-10T09:00:00Z";

/// Completion client that always fails, as when the AI provider is down.
struct Unavailable;

#[async_trait]
impl CompletionClient for Unavailable {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Err(LlmError::EmptyResponse)
    }
}

/// Completion client that answers with a fixed, prose-wrapped grade.
struct Examiner;

#[async_trait]
impl CompletionClient for Examiner {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        Ok(r#"Here is the grade:
{"score": 75, "feedback": "Mostly correct.", "strengths": ["clear"], "weaknesses": ["no authority cited"], "suggestions": ["cite a case"]}"#
            .to_string())
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app(client: impl CompletionClient + 'static) -> String {
    let config = Config::for_tests(JWT_SECRET);

    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        grader: Arc::new(SubjectiveGrader::new(
            Arc::new(client),
            Duration::from_secs(2),
            0,
        )),
        config,
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn admin_token() -> String {
    sign_jwt("admin-1", ADMIN_ROLE, JWT_SECRET, 600).unwrap()
}

/// Creates a published exam with the given questions through the admin API.
/// Returns (exam_id, question_ids).
async fn create_exam(
    client: &reqwest::Client,
    address: &str,
    passing_score: i64,
    questions: Vec<Value>,
) -> (i64, Vec<i64>) {
    let token = admin_token();

    let exam: Value = client
        .post(format!("{}/api/admin/exams", address))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Thai Civil and Commercial Code",
            "description": "<p>Book II</p><script>alert(1)</script>",
            "durationMinutes": 30,
            "passingScore": passing_score,
            "category": "civil-law",
            "difficulty": "medium",
            "status": "published"
        }))
        .send()
        .await
        .expect("Create exam failed")
        .json()
        .await
        .unwrap();

    let exam_id = exam["id"].as_i64().expect("exam id");
    assert_eq!(exam["description"], "<p>Book II</p>");

    let mut ids = Vec::new();
    for question in questions {
        let response = client
            .post(format!("{}/api/admin/exams/{}/questions", address, exam_id))
            .bearer_auth(&token)
            .json(&question)
            .send()
            .await
            .expect("Create question failed");
        assert_eq!(response.status().as_u16(), 201);

        let created: Value = response.json().await.unwrap();
        ids.push(created["id"].as_i64().unwrap());
    }

    (exam_id, ids)
}

fn mc(content: &str, correct_index: i64) -> Value {
    json!({
        "kind": "multiple-choice",
        "content": content,
        "options": ["A", "B", "C", "D"],
        "correctIndex": correct_index
    })
}

fn essay(content: &str) -> Value {
    json!({
        "kind": "essay",
        "content": content,
        "modelAnswer": "A juristic act is a lawful voluntary act intended to create legal relations.",
        "subject": "civil law"
    })
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn multiple_choice_submission_fails_below_threshold() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();
    let (exam_id, q) = create_exam(
        &client,
        &address,
        60,
        vec![mc("Question 1", 1), mc("Question 2", 2)],
    )
    .await;

    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&json!({
            "examId": exam_id,
            "userName": "Ploy",
            "startedAt": STARTED_AT,
            "answers": [
                {"questionId": q[0], "answer": 1},
                {"questionId": q[1], "answer": 0}
            ]
        }))
        .send()
        .await
        .expect("Submit failed");

    assert_eq!(response.status().as_u16(), 201);
    let result: Value = response.json().await.unwrap();

    assert_eq!(result["totalScore"], 50);
    assert_eq!(result["maxScore"], 100);
    assert_eq!(result["passingScore"], 60);
    assert_eq!(result["passed"], false);
    assert_eq!(result["answers"][0]["score"], 100);
    assert_eq!(result["answers"][0]["isCorrect"], true);
    assert_eq!(result["answers"][1]["score"], 0);

    // The stored attempt matches the response
    let attempt_id = result["attemptId"].as_i64().unwrap();
    let stored: Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stored["totalScore"], 50);
    assert_eq!(stored["userName"], "Ploy");
    assert_eq!(stored["status"], "completed");
    assert_eq!(stored["startedAt"], "2025-01-10T09:00:00Z");
}

#[tokio::test]
async fn essay_submission_degrades_when_grader_unavailable() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();
    let (exam_id, q) = create_exam(&client, &address, 50, vec![essay("Define a juristic act.")]).await;

    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&json!({
            "examId": exam_id,
            "startedAt": STARTED_AT,
            "answers": [{"questionId": q[0], "answer": "An act done by a person."}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let result: Value = response.json().await.unwrap();

    assert_eq!(result["totalScore"], 0);
    assert_eq!(result["passed"], false);
    let answer = &result["answers"][0];
    assert!(!answer["feedback"].as_str().unwrap().is_empty());
    assert_eq!(answer["suggestions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn essay_submission_uses_model_grade() {
    let address = spawn_app(Examiner).await;
    let client = reqwest::Client::new();
    let (exam_id, q) = create_exam(
        &client,
        &address,
        70,
        vec![essay("Define a juristic act."), mc("Question 2", 3)],
    )
    .await;

    let result: Value = client
        .post(format!("{}/api/attempts", address))
        .json(&json!({
            "examId": exam_id,
            "startedAt": STARTED_AT,
            "answers": [
                {"questionId": q[0], "answer": "A lawful voluntary act."},
                {"questionId": q[1], "answer": 3}
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["answers"][0]["score"], 75);
    assert_eq!(result["answers"][0]["feedback"], "Mostly correct.");
    assert_eq!(result["answers"][0]["weaknesses"][0], "no authority cited");
    assert_eq!(result["totalScore"], 88); // 87.5 rounds up
    assert_eq!(result["passed"], true);
}

#[tokio::test]
async fn unanswered_question_is_reported() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();
    let (exam_id, q) = create_exam(
        &client,
        &address,
        60,
        vec![mc("Q1", 0), mc("Q2", 0), mc("Q3", 0), mc("Q4", 0)],
    )
    .await;

    let result: Value = client
        .post(format!("{}/api/attempts", address))
        .json(&json!({
            "examId": exam_id,
            "startedAt": STARTED_AT,
            "answers": [
                {"questionId": q[0], "answer": 0},
                {"questionId": q[1], "answer": 0},
                {"questionId": q[3], "answer": 0}
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let answers = result["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 4);
    let unanswered: Vec<&Value> = answers
        .iter()
        .filter(|a| a["feedback"] == NOT_ANSWERED_FEEDBACK)
        .collect();
    assert_eq!(unanswered.len(), 1);
    assert_eq!(unanswered[0]["questionId"], q[2]);
    assert_eq!(unanswered[0]["score"], 0);
    assert_eq!(result["totalScore"], 75);
}

#[tokio::test]
async fn submission_validation_errors() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();

    // Missing examId
    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&json!({ "startedAt": STARTED_AT, "answers": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    // Missing startedAt
    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&json!({ "examId": 1, "answers": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("startedAt"));

    // Malformed body
    let response = client
        .post(format!("{}/api/attempts", address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Unknown exam
    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&json!({ "examId": 12345, "startedAt": STARTED_AT, "answers": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Exam not found");
}

#[tokio::test]
async fn exam_without_questions_is_not_found() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();
    let (exam_id, _) = create_exam(&client, &address, 60, vec![]).await;

    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&json!({ "examId": exam_id, "startedAt": STARTED_AT, "answers": [] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn public_exam_hides_answer_keys() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();
    let (exam_id, _) = create_exam(
        &client,
        &address,
        60,
        vec![mc("Q1", 2), essay("Explain.")],
    )
    .await;

    let listed: Vec<Value> = client
        .get(format!("{}/api/exams", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let first: Value = client
        .get(format!("{}/api/exams/{}", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: Value = client
        .get(format!("{}/api/exams/{}", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first, second);

    let questions = first["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert!(questions[0].get("correctIndex").is_none());
    assert!(questions[1].get("modelAnswer").is_none());
}

#[tokio::test]
async fn admin_routes_enforce_roles() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/admin/exams", address))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let learner = sign_jwt("learner-1", "user", JWT_SECRET, 600).unwrap();
    let response = client
        .get(format!("{}/api/admin/exams", address))
        .bearer_auth(learner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_question_validation_and_exam_history() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();
    let token = admin_token();
    let (exam_id, q) = create_exam(&client, &address, 60, vec![mc("Q1", 0)]).await;

    // correctIndex out of range
    let response = client
        .post(format!("{}/api/admin/exams/{}/questions", address, exam_id))
        .bearer_auth(&token)
        .json(&json!({
            "kind": "multiple-choice",
            "content": "Bad",
            "options": ["A", "B"],
            "correctIndex": 5
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    client
        .post(format!("{}/api/attempts", address))
        .json(&json!({
            "examId": exam_id,
            "startedAt": STARTED_AT,
            "answers": [{"questionId": q[0], "answer": 0}]
        }))
        .send()
        .await
        .unwrap();

    let history: Vec<Value> = client
        .get(format!("{}/api/admin/exams/{}/attempts", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["passed"], true);

    // Exams with attempts cannot be deleted
    let response = client
        .delete(format!("{}/api/admin/exams/{}", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // Editing the question afterwards leaves the recorded snapshot untouched
    let response = client
        .put(format!("{}/api/admin/questions/{}", address, q[0]))
        .bearer_auth(&token)
        .json(&json!({ "content": "Q1 (revised)" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // A replacement body is validated like a new question
    let response = client
        .put(format!("{}/api/admin/questions/{}", address, q[0]))
        .bearer_auth(&token)
        .json(&json!({
            "body": {
                "kind": "multiple-choice",
                "options": ["A", "B"],
                "correctIndex": 2
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let attempt_id = history[0]["id"].as_i64().unwrap();
    let stored: Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["answers"][0]["questionText"], "Q1");
}

#[tokio::test]
async fn display_order_is_bounded() {
    let address = spawn_app(Unavailable).await;
    let client = reqwest::Client::new();
    let token = admin_token();
    let (exam_id, q) = create_exam(&client, &address, 60, vec![mc("Q1", 0)]).await;

    let response = client
        .put(format!("{}/api/admin/questions/{}", address, q[0]))
        .bearer_auth(&token)
        .json(&json!({ "displayOrder": i32::MAX }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let mut question = mc("Q2", 1);
    question["displayOrder"] = json!(-1);
    let response = client
        .post(format!("{}/api/admin/exams/{}/questions", address, exam_id))
        .bearer_auth(&token)
        .json(&question)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Appending after the highest allowed position still succeeds
    let response = client
        .put(format!("{}/api/admin/questions/{}", address, q[0]))
        .bearer_auth(&token)
        .json(&json!({ "displayOrder": 10000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .post(format!("{}/api/admin/exams/{}/questions", address, exam_id))
        .bearer_auth(&token)
        .json(&mc("Q3", 2))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["displayOrder"], 10001);
}
