//! End-to-end tests for the HTTP surface, exercised against an in-memory
//! store and mock LLM/embedder via `app().oneshot(...)`, covering the
//! upload → match → roadmap flow.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use matchforge_core::embed::MockEmbedder;
use matchforge_core::llm::MockLlm;
use matchforge_core::store::sqlite::SqliteStore;
use serde_json::Value;
use tower::util::ServiceExt;
use tower_http::cors::CorsLayer;

use matchforge_api::extract::PlainTextExtractor;
use matchforge_api::{routes, AppState};

#[tokio::test]
async fn health_check_works_against_a_file_backed_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("matchforge.db");
    let store = Arc::new(SqliteStore::open(&path).await.unwrap());
    let embedder = Arc::new(MockEmbedder::new());
    let llm = Arc::new(MockLlm::always("{}"));
    let extractor = Arc::new(PlainTextExtractor);
    let state = AppState::new(store, embedder, llm, extractor);
    let app = routes::app(state, CorsLayer::permissive());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn test_app() -> axum::Router {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let embedder = Arc::new(MockEmbedder::new());
    let llm = Arc::new(MockLlm::always(
        r#"{"summary":"solid fit","strengths":["Rust","APIs"],"weaknesses":["Kubernetes"],"potential":["cloud-native roles"],"action_items":["Learn Kubernetes"]}"#,
    ));
    let extractor = Arc::new(PlainTextExtractor);
    let state = AppState::new(store, embedder, llm, extractor);
    routes::app(state, CorsLayer::permissive())
}

async fn upload(app: &axum::Router, filename: &str, file_type: &str, text: &str) -> Value {
    let boundary = "----matchforgeTestBoundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(text.as_bytes());
    body.extend_from_slice(
        format!(
            "\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"file_type\"\r\n\r\n{file_type}\r\n--{boundary}--\r\n"
        )
        .as_bytes(),
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_for_completed(app: &axum::Router, file_id: &str) {
    for _ in 0..50 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/v1/analysis/documents/{file_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        if body["embedding_status"] == "completed" {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("document {file_id} never reached completed status");
}

#[tokio::test]
async fn health_check_reports_ok() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn full_upload_match_gap_analysis_roadmap_flow() {
    let app = test_app().await;

    let resume = upload(
        &app,
        "resume.txt",
        "resume",
        "Summary\nRust backend engineer.\n\nSkills\nRust, PostgreSQL, Docker.",
    )
    .await;
    let jd = upload(
        &app,
        "jd.txt",
        "job_description",
        "Requirements\nRust, Docker, Kubernetes experience required.",
    )
    .await;

    let resume_file_id = resume["file_id"].as_str().unwrap();
    let jd_file_id = jd["file_id"].as_str().unwrap();
    wait_for_completed(&app, resume_file_id).await;
    wait_for_completed(&app, jd_file_id).await;

    let resume_document_id = resume["document_id"].as_str().unwrap().to_string();
    let jd_document_id = jd["document_id"].as_str().unwrap().to_string();

    let match_body = serde_json::json!({
        "resume_document_id": resume_document_id,
        "jd_document_id": jd_document_id,
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/analysis/match")
                .header("content-type", "application/json")
                .body(Body::from(match_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let match_response: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(match_response["success"], true);
    assert!(match_response["data"]["match_score"].is_number());

    let gap_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/analysis/gap-analysis")
                .header("content-type", "application/json")
                .body(Body::from(match_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(gap_response.status(), StatusCode::OK);

    let roadmap_body = serde_json::json!({
        "resume_id": resume_document_id,
        "jd_id": jd_document_id,
        "target_weeks": 4,
    });
    let roadmap_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/roadmap/generate")
                .header("content-type", "application/json")
                .body(Body::from(roadmap_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(roadmap_response.status(), StatusCode::OK);
    let bytes = roadmap_response.into_body().collect().await.unwrap().to_bytes();
    let roadmap_json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        roadmap_json["data"]["weekly_plan"].as_array().unwrap().len(),
        4
    );

    let delete_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/analysis/documents/{resume_file_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete_response.status(), StatusCode::OK);
}

#[tokio::test]
async fn match_with_unknown_document_id_returns_422() {
    let app = test_app().await;
    let body = serde_json::json!({
        "resume_document_id": "does-not-exist",
        "jd_document_id": "also-missing",
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/analysis/match")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn upload_rejects_unknown_file_type() {
    let app = test_app().await;
    let response = upload_expect_status(&app, "cover_letter").await;
    assert_eq!(response, StatusCode::UNPROCESSABLE_ENTITY);
}

async fn upload_expect_status(app: &axum::Router, file_type: &str) -> StatusCode {
    let boundary = "----matchforgeTestBoundary2";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.txt\"\r\n\r\ntext\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"file_type\"\r\n\r\n{file_type}\r\n--{boundary}--\r\n"
        )
        .as_bytes(),
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status()
}
