mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;

use common::{KEY, id_of, spawn_app, spawn_app_with};
use grc_nexus::config::Config;

#[tokio::test]
async fn health_needs_no_key() {
    let t = spawn_app("health").await;
    let (status, body) = t
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ai_enabled"], false);
}

#[tokio::test]
async fn api_rejects_missing_or_wrong_key() {
    let t = spawn_app("auth").await;

    let (status, body) = t
        .send(Request::get("/api/organizations").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = t
        .send(
            Request::get("/api/organizations")
                .header("x-nexus-key", "nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t
        .send(
            Request::get("/api/organizations")
                .header("authorization", format!("Bearer {KEY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn organization_header_is_required_and_checked() {
    let t = spawn_app("org-header").await;

    let (status, body) = t.call("GET", "/api/policies", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_ORGANIZATION");

    let (status, body) = t.call("GET", "/api/policies", Some(999), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn records_of_other_organizations_are_invisible() {
    let t = spawn_app("cross-org").await;
    let acme = t.create_org("Acme", 12).await;
    let globex = t.create_org("Globex", 12).await;

    let (status, policy) = t
        .call(
            "POST",
            "/api/policies",
            Some(acme),
            Some(json!({"title": "Acceptable Use", "content": "Be nice."})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/policies/{}", id_of(&policy));

    let (status, _) = t.call("GET", &uri, Some(globex), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t.call("DELETE", &uri, Some(globex), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = t.call("GET", "/api/policies", Some(globex), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = t.call("GET", &uri, Some(acme), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_organization_name_conflicts() {
    let t = spawn_app("org-dup").await;
    t.create_org("Initech", 10).await;
    let (status, body) = t
        .call(
            "POST",
            "/api/organizations",
            None,
            Some(json!({"name": "Initech"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn organization_appetite_is_validated_and_defaulted() {
    let t = spawn_app("org-appetite").await;
    let (status, body) = t
        .call(
            "POST",
            "/api/organizations",
            None,
            Some(json!({"name": "Hooli", "risk_appetite": 40})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = t
        .call(
            "POST",
            "/api/organizations",
            None,
            Some(json!({"name": "Hooli"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["risk_appetite"], 12);
}

#[tokio::test]
async fn ai_routes_report_disabled_assistant() {
    let t = spawn_app("ai-off").await;
    let org = t.create_org("Umbrella", 12).await;
    let (status, body) = t
        .call(
            "POST",
            "/api/policies/generate",
            Some(org),
            Some(json!({"title": "Data Retention", "framework": "GDPR"})),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "AI_DISABLED");

    let (_, listed) = t.call("GET", "/api/policies", Some(org), None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected_with_413() {
    let mut cfg = Config::default();
    cfg.basic.max_body_bytes = 1024;
    let t = spawn_app_with("body-limit", cfg).await;

    let payload = json!({"name": "a".repeat(4096)});
    let (status, body) = t
        .call("POST", "/api/organizations", None, Some(payload))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn malformed_input_uses_the_error_envelope() {
    let t = spawn_app("malformed").await;
    let org = t.create_org("Acme", 12).await;

    let (status, body) = t
        .call("POST", "/api/risks", Some(org), Some(json!({"title": "No factors"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("likelihood")
    );

    let (_, policy) = t
        .call("POST", "/api/policies", Some(org), Some(json!({"title": "BCM"})))
        .await;
    let (status, body) = t
        .call(
            "POST",
            &format!("/api/policies/{}/transition", id_of(&policy)),
            Some(org),
            Some(json!({"status": "bogus"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = t.call("GET", "/api/risks/abc", Some(org), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = t
        .call("GET", "/api/risks?status=bogus", Some(org), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let req = Request::post("/api/risks")
        .header("x-nexus-key", KEY)
        .header("x-organization-id", org.to_string())
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = t.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
