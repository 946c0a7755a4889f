// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{ScanHarness, TEST_API_KEY};
use axum::body::Body;
use chrono::{Duration as TimeDelta, Utc};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", TEST_API_KEY);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create(app: &Router, url: &str) -> Uuid {
    let (status, body) = send(
        app,
        request(Method::POST, "/v1/targets", Some(json!({ "url": url }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let harness = ScanHarness::new();
    let app = harness.router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_api_key() {
    let harness = ScanHarness::new();
    let app = harness.router();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/targets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/targets")
                .header("x-api-key", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_get_and_duplicate() {
    let harness = ScanHarness::new();
    let app = harness.router();

    let id = create(&app, "https://example.com").await;

    let (status, body) = send(&app, request(Method::GET, &format!("/v1/targets/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://example.com");
    assert_eq!(body["status"], "queued");
    assert_eq!(body["brokenLinks"], 0);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/v1/targets",
            Some(json!({ "url": "https://example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_exists");
}

#[tokio::test]
async fn test_create_rejects_invalid_urls() {
    let harness = ScanHarness::new();
    let app = harness.router();

    for url in ["not a url", "ftp://example.com/file"] {
        let (status, body) = send(
            &app,
            request(Method::POST, "/v1/targets", Some(json!({ "url": url }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "url {}", url);
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let harness = ScanHarness::new();
    let app = harness.router();
    let unknown = Uuid::new_v4();

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/v1/targets/{unknown}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(
        &app,
        request(Method::POST, &format!("/v1/targets/{unknown}/scan"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request(Method::DELETE, &format!("/v1/targets/{unknown}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scan_lifecycle_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<title>slow</title>", "text/html")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let harness = ScanHarness::new();
    let app = harness.router();
    let id = create(&app, &server.uri()).await;

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/v1/targets/{id}/scan"), None),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["targetId"], id.to_string());
    assert!(body["jobId"].is_string());

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/v1/targets/{id}/scan"), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "scan_in_progress");

    let (status, body) = send(&app, request(Method::GET, "/v1/scans", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["targetId"], id.to_string());

    let (status, _) = send(
        &app,
        request(Method::POST, &format!("/v1/targets/{id}/cancel-scan"), None),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/v1/targets/{id}/cancel-scan"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_active_scan");
}

#[tokio::test]
async fn test_list_pagination_and_filters() {
    let harness = ScanHarness::new();
    let app = harness.router();
    for i in 0..12 {
        create(&app, &format!("https://site{i}.example")).await;
    }

    let (status, body) = send(&app, request(Method::GET, "/v1/targets?page=2&limit=5", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["pagination"]["totalItems"], 12);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["pagination"]["currentPage"], 2);
    assert_eq!(body["pagination"]["pageSize"], 5);

    let (_, body) = send(
        &app,
        request(Method::GET, "/v1/targets?search=site1&status=all", None),
    )
    .await;
    // site1, site10, site11
    assert_eq!(body["pagination"]["totalItems"], 3);

    let (_, body) = send(
        &app,
        request(Method::GET, "/v1/targets?status=completed", None),
    )
    .await;
    assert_eq!(body["pagination"]["totalItems"], 0);

    let (status, body) = send(
        &app,
        request(Method::GET, "/v1/targets?status=bogus", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_list_filters_by_link_counts_and_dates() {
    let harness = ScanHarness::new();
    let app = harness.router();
    let now = Utc::now();

    let mut busy = harness.add_target("https://busy.example");
    busy.internal_links = 40;
    busy.external_links = 12;
    busy.created_at = now - TimeDelta::days(40);
    busy.crawl_finished_at = Some(now - TimeDelta::days(3));
    harness.repo.insert(busy);

    let mut quiet = harness.add_target("https://quiet.example");
    quiet.internal_links = 3;
    quiet.external_links = 0;
    quiet.created_at = now - TimeDelta::days(1);
    harness.repo.insert(quiet);

    let list = |query: String| {
        let app = app.clone();
        async move {
            let (status, body) = send(&app, request(Method::GET, &query, None)).await;
            assert_eq!(status, StatusCode::OK, "{}", body);
            body["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|t| t["url"].as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(
        list("/v1/targets?internalLinksMin=10".to_string()).await,
        vec!["https://busy.example"]
    );
    assert_eq!(
        list("/v1/targets?externalLinksMax=5".to_string()).await,
        vec!["https://quiet.example"]
    );
    assert_eq!(
        list("/v1/targets?internalLinksMin=1&externalLinksMin=1&internalLinksMax=39".to_string())
            .await,
        Vec::<String>::new()
    );

    let week_ago = (now - TimeDelta::days(7)).format("%Y-%m-%d");
    assert_eq!(
        list(format!("/v1/targets?dateCreatedFrom={week_ago}")).await,
        vec!["https://quiet.example"]
    );
    assert_eq!(
        list(format!("/v1/targets?dateCreatedTo={week_ago}")).await,
        vec!["https://busy.example"]
    );
    assert_eq!(
        list(format!("/v1/targets?dateCrawledFrom={week_ago}")).await,
        vec!["https://busy.example"]
    );

    let (status, body) = send(
        &app,
        request(Method::GET, "/v1/targets?dateCrawledTo=yesterday", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_delete_and_bulk_delete() {
    let harness = ScanHarness::new();
    let app = harness.router();
    let a = create(&app, "https://a.example").await;
    let b = create(&app, "https://b.example").await;
    let c = create(&app, "https://c.example").await;

    let (status, _) = send(&app, request(Method::DELETE, &format!("/v1/targets/{a}"), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/v1/targets/bulk-delete",
            Some(json!({ "ids": [a, b, c] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rowsAffected"], 2);

    let (status, body) = send(
        &app,
        request(Method::POST, "/v1/targets/bulk-delete", Some(json!({ "ids": [] }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(harness.repo.get(b).is_none());
}
