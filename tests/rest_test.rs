use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt; // for `oneshot`
use salesdesk::api;
use salesdesk::chart::BitmapBarChart;
use salesdesk::engine::SalesEngine;
use salesdesk::storage::MemoryStore;
use salesdesk::ai::LlmProvider;
use salesdesk::testing::{sample_store, FailingLlm, ScriptedLlm};
use serde_json::{json, Value};
use std::sync::Arc;

fn app_with(store: MemoryStore, llm: Arc<dyn LlmProvider>) -> Router {
    let engine = SalesEngine::new(Arc::new(store), llm, Arc::new(BitmapBarChart::default()));
    api::router(Arc::new(engine))
}

fn app(llm: Arc<dyn LlmProvider>) -> Router {
    app_with(sample_store(), llm)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_home_and_health() {
    let (status, body) = get_json(app(Arc::new(FailingLlm::default())), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "E-commerce AI Agent is running"}));

    let (status, _, body) = get(app(Arc::new(FailingLlm::default())), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK".to_vec());
}

#[tokio::test]
async fn test_ask_total_sales() {
    let (status, body) = get_json(
        app(Arc::new(FailingLlm::default())),
        "/ask?question=What%20are%20my%20total%20sales%3F",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], "What are my total sales?");
    assert_eq!(body["sql_query"], salesdesk::rule::TOTAL_SALES_SQL);
    assert_eq!(body["sql_origin"], "rule");
    assert_eq!(body["result"], json!([[1523.5]]));
    assert_eq!(body["answer"], "The answer is 1523.5");
}

#[tokio::test]
async fn test_ask_generated() {
    let (status, body) = get_json(
        app(ScriptedLlm::shared("SELECT COUNT(DISTINCT item_id) FROM product_ad_sales_metrics")),
        "/ask?question=How+many+products+ran+ads",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sql_origin"], "generated");
    assert_eq!(body["answer"], "The answer is 3");
}

#[tokio::test]
async fn test_ask_errors() {
    let (status, body) = get_json(app(Arc::new(FailingLlm::default())), "/ask?question=best+day").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["stage"], "translation");
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));

    let (status, body) = get_json(
        app(ScriptedLlm::shared("SELECT nope FROM product_eligibility")),
        "/ask?question=eligibility",
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["stage"], "execution");
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, body) = get_json(app(Arc::new(FailingLlm::default())), "/ask").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["stage"], "request");
}

#[tokio::test]
async fn test_chart_png() {
    let (status, content_type, body) = get(app(Arc::new(FailingLlm::default())), "/chart/sales").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(&body[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

    let (status, content_type, _) = get(app(Arc::new(FailingLlm::default())), "/chart/ad_spend").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_chart_no_data_and_unknown_kind() {
    let (status, body) = get_json(app_with(MemoryStore::new(), Arc::new(FailingLlm::default())), "/chart/sales").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "No data available."}));

    let (status, body) = get_json(app(Arc::new(FailingLlm::default())), "/chart/revenue").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["stage"], "request");
}
