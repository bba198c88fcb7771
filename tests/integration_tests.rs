//! Integration tests against the HTTP API
//!
//! Tests the full flow: bearer token → authentication → scoped orchestrator
//! call → paginated JSON response

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use clouditor::cli::build_app;
use clouditor::ServiceConfig;
use jsonwebtoken::{encode, EncodingKey, Header};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";
const DEFAULT_ID: &str = "00000000-0000-0000-0000-000000000000";

const CONFIG: &str = r#"
authentication:
  enabled: true
  algorithm: HS256
  secret: integration-secret
authorization:
  strategy: claims
  allow_all_key: cladmin
  scope_key: TargetOfEvaluationid
catalogs:
  - id: EUCS
    name: EU Cloud Services
  - id: BSI-C5
    name: Cloud Computing Compliance Criteria
"#;

fn app() -> Router {
    let config = ServiceConfig::load_from_str(CONFIG).unwrap();
    build_app(&config).unwrap()
}

fn token(claims: Value) -> String {
    let mut claims = claims;
    claims["exp"] = json!(Utc::now().timestamp() + 3600);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn admin_token() -> String {
    token(json!({ "sub": "admin", "cladmin": true }))
}

fn scoped_token(ids: &[&str]) -> String {
    token(json!({ "sub": "client", "TargetOfEvaluationid": ids }))
}

/// Page tokens are base64 and may contain `+`, `/` and `=`
fn encode_query_value(value: &str) -> String {
    value
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

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

async fn create_target(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/v1/orchestrator/targets_of_evaluation",
        Some(&admin_token()),
        Some(json!({ "name": name, "target_type": "cloud" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

fn ids_of(body: &Value, key: &str) -> Vec<String> {
    body["data"][key]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/targets_of_evaluation",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "error": "invalid auth token" }));
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let app = app();
    let forged = encode(
        &Header::default(),
        &json!({ "sub": "mallory", "cladmin": true, "exp": Utc::now().timestamp() + 3600 }),
        &EncodingKey::from_secret(b"wrong-secret"),
    )
    .unwrap();

    let (status, _) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/targets_of_evaluation",
        Some(&forged),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Targets of Evaluation
// ============================================================================

#[tokio::test]
async fn test_default_target_exists() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/v1/orchestrator/targets_of_evaluation/{DEFAULT_ID}"),
        Some(&admin_token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "default");
}

#[tokio::test]
async fn test_scoped_list_only_shows_allowed_targets() {
    let app = app();
    let mine = create_target(&app, "mine").await;
    create_target(&app, "theirs").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/targets_of_evaluation",
        Some(&scoped_token(&[&mine])),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids_of(&body, "targets_of_evaluation"), vec![mine]);
    assert_eq!(body["data"]["next_page_token"], "");

    let (_, body) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/targets_of_evaluation",
        Some(&admin_token()),
        None,
    )
    .await;
    // Two created plus the default target
    assert_eq!(ids_of(&body, "targets_of_evaluation").len(), 3);
}

#[tokio::test]
async fn test_token_without_scope_claim_sees_nothing() {
    let app = app();
    create_target(&app, "a").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/targets_of_evaluation",
        Some(&token(json!({ "sub": "nobody" }))),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids_of(&body, "targets_of_evaluation").is_empty());
}

#[tokio::test]
async fn test_follow_page_tokens_over_http() {
    let app = app();
    let mut expected = vec![DEFAULT_ID.to_string()];
    for n in 0..6 {
        expected.push(create_target(&app, &format!("target {n}")).await);
    }
    expected.sort();

    let admin = admin_token();
    let mut seen = Vec::new();
    let mut page_token = String::new();
    let mut pages = 0;
    loop {
        let uri = format!(
            "/v1/orchestrator/targets_of_evaluation?page_size=3&page_token={}",
            encode_query_value(&page_token)
        );
        let (status, body) = send(&app, Method::GET, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        seen.extend(ids_of(&body, "targets_of_evaluation"));
        pages += 1;

        page_token = body["data"]["next_page_token"].as_str().unwrap().to_string();
        if page_token.is_empty() {
            break;
        }
    }

    assert_eq!(seen, expected);
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn test_order_by_name_descending() {
    let app = app();
    create_target(&app, "alpha").await;
    create_target(&app, "zulu").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/targets_of_evaluation?order_by=name&asc=false",
        Some(&admin_token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body["data"]["targets_of_evaluation"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["zulu", "default", "alpha"]);
}

#[tokio::test]
async fn test_bad_list_requests() {
    let app = app();
    let admin = admin_token();

    for uri in [
        "/v1/orchestrator/targets_of_evaluation?page_token=not-base64!!",
        "/v1/orchestrator/targets_of_evaluation?order_by=description",
        "/v1/orchestrator/targets_of_evaluation?page_size=-1",
    ] {
        let (status, body) = send(&app, Method::GET, uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_out_of_scope_access_is_denied() {
    let app = app();
    let theirs = create_target(&app, "theirs").await;
    let client = scoped_token(&["11111111-1111-1111-1111-111111111111"]);
    let uri = format!("/v1/orchestrator/targets_of_evaluation/{theirs}");

    let (status, body) = send(&app, Method::GET, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access denied");

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&client),
        Some(json!({ "name": "hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/orchestrator/targets_of_evaluation",
        Some(&client),
        Some(json!({ "name": "new" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_and_remove_target() {
    let app = app();
    let id = create_target(&app, "before").await;
    let client = scoped_token(&[&id]);
    let uri = format!("/v1/orchestrator/targets_of_evaluation/{id}");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&client),
        Some(json!({ "name": "after", "target_type": "product" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "after");
    assert_eq!(body["data"]["target_type"], "product");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "target of evaluation not found");
}

// ============================================================================
// Certificates
// ============================================================================

#[tokio::test]
async fn test_certificates_are_scoped_by_target() {
    let app = app();
    let mine = create_target(&app, "mine").await;
    let theirs = create_target(&app, "theirs").await;
    let admin = admin_token();

    for target in [&mine, &theirs] {
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/v1/orchestrator/targets_of_evaluation/{target}/certificates"),
            Some(&admin),
            Some(json!({ "name": "EUCS basic", "standard": "EUCS" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let client = scoped_token(&[&mine]);
    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/certificates",
        Some(&client),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let certs = body["data"]["certificates"].as_array().unwrap();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0]["target_of_evaluation_id"], mine.as_str());

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/v1/orchestrator/targets_of_evaluation/{theirs}/certificates"),
        Some(&client),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_certificate_lifecycle() {
    let app = app();
    let target = create_target(&app, "t").await;
    let client = scoped_token(&[&target]);
    let base = format!("/v1/orchestrator/targets_of_evaluation/{target}/certificates");

    let (status, body) = send(
        &app,
        Method::POST,
        &base,
        Some(&client),
        Some(json!({ "name": "c5", "cab": "TÜV" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cert_id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("{base}/{cert_id}");

    let (status, body) = send(&app, Method::GET, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cab"], "TÜV");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&client),
        Some(json!({ "name": "c5 renewed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "c5 renewed");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Catalogs
// ============================================================================

#[tokio::test]
async fn test_catalogs() {
    let app = app();
    let client = scoped_token(&[]);

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/catalogs?page_size=1",
        Some(&client),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids_of(&body, "catalogs"), vec!["BSI-C5"]);
    assert_eq!(body["data"]["next_page_token"], "CAEQAQ==");

    let (status, body) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/catalogs/EUCS",
        Some(&client),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "EU Cloud Services");

    let (status, _) = send(
        &app,
        Method::GET,
        "/v1/orchestrator/catalogs/unknown",
        Some(&client),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lists_agree() {
    let app = app();
    for n in 0..5 {
        create_target(&app, &format!("t{n}")).await;
    }
    let admin = admin_token();

    let requests = (0..16).map(|_| {
        send(
            &app,
            Method::GET,
            "/v1/orchestrator/targets_of_evaluation?page_size=4",
            Some(&admin),
            None,
        )
    });
    let responses = futures::future::join_all(requests).await;

    let first = &responses[0].1;
    for (status, body) in &responses {
        assert_eq!(*status, StatusCode::OK);
        assert_eq!(body, first);
    }
}
