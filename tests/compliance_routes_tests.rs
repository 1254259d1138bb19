mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{TestApp, id_of, spawn_app};

#[tokio::test]
async fn policy_lifecycle_follows_transition_table() {
    let t = spawn_app("policy-lifecycle").await;
    let org = t.create_org("Acme", 12).await;
    let (_, policy) = t
        .call(
            "POST",
            "/api/policies",
            Some(org),
            Some(json!({"title": "Password Policy", "content": "Use a manager."})),
        )
        .await;
    assert_eq!(policy["status"], "draft");
    assert_eq!(policy["version"], 1);
    let id = id_of(&policy);
    let transition = format!("/api/policies/{id}/transition");

    let (status, body) = t
        .call("POST", &transition, Some(org), Some(json!({"status": "approved"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = t
        .call("POST", &transition, Some(org), Some(json!({"status": "in_review"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, approved) = t
        .call("POST", &transition, Some(org), Some(json!({"status": "approved"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(approved["approved_at"].is_string());

    let (status, _) = t
        .call(
            "PATCH",
            &format!("/api/policies/{id}"),
            Some(org),
            Some(json!({"content": "Rewritten."})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, reopened) = t
        .call("POST", &transition, Some(org), Some(json!({"status": "draft"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["version"], 2);
    assert!(reopened["approved_at"].is_null());

    let (status, edited) = t
        .call(
            "PATCH",
            &format!("/api/policies/{id}"),
            Some(org),
            Some(json!({"content": "Rewritten."})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "Rewritten.");

    let (_, drafts) = t
        .call("GET", "/api/policies?status=draft", Some(org), None)
        .await;
    assert_eq!(drafts.as_array().unwrap().len(), 1);
}

struct Fixture {
    org: i64,
    framework: i64,
    controls: Vec<i64>,
}

async fn framework_with_controls(t: &TestApp, codes: &[&str]) -> Fixture {
    let org = t.create_org("Acme", 12).await;
    let (status, fw) = t
        .call(
            "POST",
            "/api/frameworks",
            Some(org),
            Some(json!({"name": "SOC 2"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let framework = id_of(&fw);
    let (_, domain) = t
        .call(
            "POST",
            &format!("/api/frameworks/{framework}/domains"),
            Some(org),
            Some(json!({"code": "CC6", "name": "Logical access"})),
        )
        .await;
    let mut controls = Vec::new();
    for code in codes {
        let (status, control) = t
            .call(
                "POST",
                &format!("/api/domains/{}/controls", id_of(&domain)),
                Some(org),
                Some(json!({"code": code, "title": format!("Control {code}")})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        controls.push(id_of(&control));
    }
    Fixture {
        org,
        framework,
        controls,
    }
}

#[tokio::test]
async fn framework_tree_and_score_follow_control_status() {
    let t = spawn_app("framework-score").await;
    let f = framework_with_controls(&t, &["CC6.1", "CC6.2"]).await;

    let (status, _) = t
        .call(
            "PATCH",
            &format!("/api/controls/{}", f.controls[0]),
            Some(f.org),
            Some(json!({"implementation_status": "implemented"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, tree) = t
        .call("GET", &format!("/api/frameworks/{}", f.framework), Some(f.org), None)
        .await;
    assert_eq!(tree["name"], "SOC 2");
    assert_eq!(tree["domains"][0]["controls"].as_array().unwrap().len(), 2);

    let (status, score) = t
        .call(
            "GET",
            &format!("/api/frameworks/{}/score", f.framework),
            Some(f.org),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(score["unweighted"], 50.0);
    assert_eq!(score["risk_weighted"], 50.0);
    assert_eq!(score["applicable"], 2);
}

#[tokio::test]
async fn completing_an_assessment_scores_results_with_risk_weights() {
    let t = spawn_app("assessment").await;
    let f = framework_with_controls(&t, &["CC6.1", "CC6.2"]).await;

    let (_, risk) = t
        .call(
            "POST",
            "/api/risks",
            Some(f.org),
            Some(json!({"title": "Credential stuffing", "likelihood": 5, "impact": 5})),
        )
        .await;
    let (status, _) = t
        .call(
            "PUT",
            &format!("/api/risks/{}/controls/{}", id_of(&risk), f.controls[0]),
            Some(f.org),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, assessment) = t
        .call(
            "POST",
            "/api/assessments",
            Some(f.org),
            Some(json!({"framework_id": f.framework, "name": "Q3 audit"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = id_of(&assessment);

    let record = |control: i64, status: &str| {
        (
            format!("/api/assessments/{id}/results/{control}"),
            json!({"status": status, "notes": "sampled 25 accounts"}),
        )
    };
    let (uri, body) = record(f.controls[0], "non_compliant");
    t.call("PUT", &uri, Some(f.org), Some(body)).await;
    // upsert replaces the earlier finding
    let (uri, body) = record(f.controls[0], "compliant");
    let (status, result) = t.call("PUT", &uri, Some(f.org), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "compliant");

    let (_, progress) = t
        .call(
            "GET",
            &format!("/api/assessments/{id}/progress"),
            Some(f.org),
            None,
        )
        .await;
    assert_eq!(progress, json!({"total": 2, "assessed": 1, "percent": 50.0}));

    let (status, done) = t
        .call(
            "POST",
            &format!("/api/assessments/{id}/complete"),
            Some(f.org),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "completed");
    // weight 3 for the control guarding the 25-point risk, 1 for the unassessed one
    assert_eq!(done["score"], 75.0);
    assert_eq!(done["breakdown"]["unweighted"], 50.0);
    assert_eq!(done["breakdown"]["unsatisfied"], 1);

    let (uri, body) = record(f.controls[1], "compliant");
    let (status, _) = t.call("PUT", &uri, Some(f.org), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = t
        .call(
            "POST",
            &format!("/api/assessments/{id}/complete"),
            Some(f.org),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn results_for_foreign_controls_are_rejected() {
    let t = spawn_app("assessment-foreign").await;
    let f = framework_with_controls(&t, &["CC6.1"]).await;
    let (_, other_fw) = t
        .call(
            "POST",
            "/api/frameworks",
            Some(f.org),
            Some(json!({"name": "ISO 22301"})),
        )
        .await;
    let (_, assessment) = t
        .call(
            "POST",
            "/api/assessments",
            Some(f.org),
            Some(json!({"framework_id": id_of(&other_fw), "name": "BCMS"})),
        )
        .await;
    let (status, body): (StatusCode, Value) = t
        .call(
            "PUT",
            &format!(
                "/api/assessments/{}/results/{}",
                id_of(&assessment),
                f.controls[0]
            ),
            Some(f.org),
            Some(json!({"status": "compliant"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn closed_risks_do_not_weight_controls() {
    let t = spawn_app("framework-closed-risk").await;
    let f = framework_with_controls(&t, &["CC6.1", "CC6.2"]).await;
    t.call(
        "PATCH",
        &format!("/api/controls/{}", f.controls[0]),
        Some(f.org),
        Some(json!({"implementation_status": "implemented"})),
    )
    .await;
    let score_uri = format!("/api/frameworks/{}/score", f.framework);

    let (_, closed) = t
        .call(
            "POST",
            "/api/risks",
            Some(f.org),
            Some(json!({"title": "Old datacentre", "likelihood": 5, "impact": 5, "status": "closed"})),
        )
        .await;
    let (status, _) = t
        .call(
            "PUT",
            &format!("/api/risks/{}/controls/{}", id_of(&closed), f.controls[0]),
            Some(f.org),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, score) = t.call("GET", &score_uri, Some(f.org), None).await;
    assert_eq!(score["risk_weighted"], 50.0);

    let (_, open) = t
        .call(
            "POST",
            "/api/risks",
            Some(f.org),
            Some(json!({"title": "Credential stuffing", "likelihood": 5, "impact": 5})),
        )
        .await;
    t.call(
        "PUT",
        &format!("/api/risks/{}/controls/{}", id_of(&open), f.controls[0]),
        Some(f.org),
        None,
    )
    .await;
    let (_, score) = t.call("GET", &score_uri, Some(f.org), None).await;
    assert_eq!(score["risk_weighted"], 75.0);
}

#[tokio::test]
async fn completion_score_covers_every_accepted_result() {
    let t = spawn_app("assessment-race").await;
    let f = framework_with_controls(&t, &["CC6.1", "CC6.2"]).await;

    for round in 0..5 {
        let (_, assessment) = t
            .call(
                "POST",
                "/api/assessments",
                Some(f.org),
                Some(json!({"framework_id": f.framework, "name": format!("Round {round}")})),
            )
            .await;
        let id = id_of(&assessment);
        let record_uri = format!("/api/assessments/{id}/results/{}", f.controls[0]);
        let complete_uri = format!("/api/assessments/{id}/complete");

        let ((recorded, _), (completed, done)) = tokio::join!(
            t.call(
                "PUT",
                &record_uri,
                Some(f.org),
                Some(json!({"status": "compliant"})),
            ),
            t.call("POST", &complete_uri, Some(f.org), None),
        );
        assert_eq!(completed, StatusCode::OK);
        match recorded {
            StatusCode::OK => assert_eq!(done["breakdown"]["satisfied"], 1),
            StatusCode::CONFLICT => assert_eq!(done["breakdown"]["satisfied"], 0),
            other => panic!("unexpected status {other}"),
        }

        let (_, detail) = t
            .call("GET", &format!("/api/assessments/{id}"), Some(f.org), None)
            .await;
        assert_eq!(detail["score"], done["score"]);
    }
}
