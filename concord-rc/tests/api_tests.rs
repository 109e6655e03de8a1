//! Integration tests for concord-rc API endpoints
//!
//! Tests cover:
//! - Health and build info endpoints
//! - POST /api/analyze result document shape
//! - POST /api/views result plus presentation views
//! - Malformed request bodies

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use concord_common::config::TomlConfig;
use concord_rc::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: Create app with default configuration
fn setup_app() -> axum::Router {
    build_router(AppState::new(TomlConfig::default()))
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn sample_request() -> Value {
    json!({
        "supplied_artifacts": ["README", "API_SPEC", "TEST"],
        "claims": [
            {
                "category": "ErrorSemantics",
                "endpoint": "POST /users",
                "condition": "with invalid data",
                "assertion": "asserts 400",
                "source": {
                    "artifact": "TEST",
                    "file": "tests/test_users.py",
                    "lines": {"start": 10, "end": 14},
                    "excerpt": "assert resp.status_code == 400"
                },
                "confidence": "high"
            },
            {
                "category": "ErrorSemantics",
                "endpoint": "POST /users",
                "condition": "with invalid data",
                "assertion": "returns 422",
                "source": {
                    "artifact": "API_SPEC",
                    "file": "openapi.yaml",
                    "lines": {"start": 40, "end": 41},
                    "excerpt": "'422': description: Validation error"
                },
                "confidence": "medium"
            },
            {
                "category": "ErrorSemantics",
                "endpoint": "GET /users/1",
                "condition": "not found",
                "assertion": "",
                "source": {
                    "artifact": "README",
                    "file": "README.md",
                    "lines": {"start": 3, "end": 3},
                    "excerpt": ""
                },
                "confidence": "low"
            }
        ]
    })
}

// =============================================================================
// Health and Build Info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let response = setup_app().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "concord-rc");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let response = setup_app()
        .oneshot(get_request("/api/buildinfo"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Analysis
// =============================================================================

#[tokio::test]
async fn test_analyze_returns_result_document() {
    let response = setup_app()
        .oneshot(post_json("/api/analyze", &sample_request()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["release_signal"], "High");
    assert_eq!(body["summary_counts"]["contradictions"], 1);
    assert_eq!(body["summary_counts"]["rejected_claims"], 1);

    let finding = &body["findings"][0];
    assert_eq!(finding["outcome"], "Contradiction");
    assert_eq!(finding["condition"], "invalid_input");
    assert_eq!(finding["method"], "POST");
    assert_eq!(finding["confidence_score"], "medium");
    assert_eq!(finding["evidence"].as_array().unwrap().len(), 2);
    assert!(finding["warnings"]
        .as_array()
        .unwrap()
        .contains(&json!("CONTRADICTION")));

    assert_eq!(body["rejected_claims"][0]["input_index"], 2);
    assert_eq!(body["rejected_claims"][0]["reason"], "empty assertion");
}

#[tokio::test]
async fn test_analyze_empty_claims_is_low() {
    let response = setup_app()
        .oneshot(post_json("/api/analyze", &json!({"claims": []})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["release_signal"], "Low");
    assert!(body["findings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_views_endpoint() {
    let response = setup_app()
        .oneshot(post_json("/api/views", &sample_request()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["result"]["release_signal"], "High");

    let endpoints = body["views"]["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0]["endpoint"], "/users");
    assert_eq!(endpoints[0]["most_severe"], "Contradiction");

    let recommendations = body["views"]["recommendations"].as_array().unwrap();
    assert!(recommendations.iter().any(|r| r["tag"] == "CONTRADICTION"));
}

#[tokio::test]
async fn test_analyze_rejects_non_json_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();

    let response = setup_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Malformed analysis request"));
}

#[tokio::test]
async fn test_views_rejects_wrong_shape_with_envelope() {
    let response = setup_app()
        .oneshot(post_json("/api/views", &json!({"claims": "none"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_analyze_rejects_unreadable_claim_alone() {
    let mut request = sample_request();
    let claims = request["claims"].as_array_mut().unwrap();
    claims.push(json!({
        "category": "ErrorSemantics",
        "endpoint": "POST /users",
        "condition": "with invalid data",
        "assertion": "returns 400",
        "source": {
            "artifact": "README",
            "file": "README.md",
            "lines": {"start": 9, "end": 9},
            "excerpt": "returns 400"
        },
        "confidence": "very high"
    }));
    claims.push(json!({"assertion": "returns 200", "confidence": "low"}));

    let response = setup_app()
        .oneshot(post_json("/api/analyze", &request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["summary_counts"]["contradictions"], 1);
    assert_eq!(body["summary_counts"]["rejected_claims"], 3);

    let rejected = body["rejected_claims"].as_array().unwrap();
    assert_eq!(rejected[1]["input_index"], 3);
    assert_eq!(rejected[1]["reason"], "unrecognized confidence: very high");
    assert_eq!(rejected[1]["claim"]["confidence"], "very high");
    assert_eq!(rejected[2]["input_index"], 4);
    assert_eq!(rejected[2]["reason"], "missing source");
}
