mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{TestApp, id_of, spawn_app};

async fn process(t: &TestApp, org: i64, name: &str, rto: f64, cost: f64) -> i64 {
    let (status, body) = t
        .call(
            "POST",
            "/api/bia/processes",
            Some(org),
            Some(json!({
                "name": name,
                "criticality": "high",
                "rto_hours": rto,
                "rpo_hours": 1.0,
                "mtpd_hours": 12.0,
                "hourly_downtime_cost": cost
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

async fn depend(t: &TestApp, org: i64, process: i64, target: Value) -> (StatusCode, Value) {
    t.call(
        "POST",
        &format!("/api/bia/processes/{process}/dependencies"),
        Some(org),
        Some(target),
    )
    .await
}

#[tokio::test]
async fn analysis_flags_rto_gap_and_downstream_impact() {
    let t = spawn_app("bia-analysis").await;
    let org = t.create_org("Acme", 12).await;

    let payments = process(&t, org, "Payments", 4.0, 1000.0).await;
    let checkout = process(&t, org, "Checkout", 2.0, 500.0).await;
    let (status, asset) = t
        .call(
            "POST",
            "/api/bia/assets",
            Some(org),
            Some(json!({
                "name": "Core ledger DB",
                "asset_type": "data",
                "rto_hours": 8.0,
                "rpo_hours": 0.5,
                "hourly_cost": 100.0
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let ledger = id_of(&asset);

    let (status, _) = depend(&t, org, payments, json!({"asset_id": ledger})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = depend(&t, org, checkout, json!({"process_id": payments})).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, analysis) = t
        .call(
            "GET",
            &format!("/api/bia/processes/{payments}/analysis"),
            Some(org),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["achievable_rto_hours"], 8.0);
    let gaps = analysis["rto_gaps"].as_array().unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0]["gap_hours"], 4.0);
    assert_eq!(gaps[0]["node"], json!({"kind": "asset", "id": ledger}));
    assert!(analysis["rpo_gaps"].as_array().unwrap().is_empty());

    let impacted = analysis["impacted_processes"].as_array().unwrap();
    assert_eq!(impacted.len(), 1);
    assert_eq!(impacted[0]["process_id"], checkout);

    let cost = &analysis["downtime_cost"];
    assert_eq!(cost["cost_at_target"], 4000.0);
    assert_eq!(cost["cost_at_achievable"], 8000.0);
    assert_eq!(cost["propagated_cost"], 4000.0);
    assert_eq!(cost["asset_cost"], 800.0);
    assert_eq!(cost["total"], 12800.0);
    assert_eq!(analysis["risk_rating"], "critical");

    // Checkout inherits the ledger's RTO through Payments.
    let (_, upstream) = t
        .call(
            "GET",
            &format!("/api/bia/processes/{checkout}/analysis"),
            Some(org),
            None,
        )
        .await;
    assert_eq!(upstream["dependencies"].as_array().unwrap().len(), 2);
    assert_eq!(upstream["rto_gaps"].as_array().unwrap().len(), 2);

    let (status, overview) = t.call("GET", "/api/bia/analysis", Some(org), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["processes"], 2);
    assert_eq!(overview["processes_with_rto_gaps"], 2);
}

#[tokio::test]
async fn dependency_rules_are_enforced() {
    let t = spawn_app("bia-deps").await;
    let org = t.create_org("Acme", 12).await;
    let a = process(&t, org, "Billing", 4.0, 10.0).await;
    let b = process(&t, org, "Invoicing", 4.0, 10.0).await;

    let (status, _) = depend(&t, org, a, json!({"process_id": a})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = depend(&t, org, a, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, dep) = depend(&t, org, a, json!({"process_id": b})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = depend(&t, org, a, json!({"process_id": b})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // a cycle is stored and the analysis still terminates
    let (status, _) = depend(&t, org, b, json!({"process_id": a})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, analysis) = t
        .call("GET", &format!("/api/bia/processes/{a}/analysis"), Some(org), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["dependencies"].as_array().unwrap().len(), 1);

    let other = t.create_org("Globex", 12).await;
    let foreign = process(&t, other, "Foreign", 1.0, 1.0).await;
    let (status, _) = depend(&t, org, a, json!({"process_id": foreign})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .call(
            "DELETE",
            &format!("/api/bia/dependencies/{}", id_of(&dep)),
            Some(other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t
        .call(
            "DELETE",
            &format!("/api/bia/dependencies/{}", id_of(&dep)),
            Some(org),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn runbook_steps_keep_contiguous_positions() {
    let t = spawn_app("runbook-steps").await;
    let org = t.create_org("Acme", 12).await;
    let payments = process(&t, org, "Payments", 1.0, 100.0).await;

    let (status, runbook) = t
        .call(
            "POST",
            "/api/runbooks",
            Some(org),
            Some(json!({"title": "Payments failover", "process_id": payments})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(runbook["status"], "draft");
    let rb = id_of(&runbook);

    let mut ids = Vec::new();
    for (title, minutes) in [("Declare", 5), ("Fail over", 40), ("Verify", 20)] {
        let (status, step) = t
            .call(
                "POST",
                &format!("/api/runbooks/{rb}/steps"),
                Some(org),
                Some(json!({"title": title, "estimated_minutes": minutes})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(step["position"], ids.len() as i64 + 1);
        ids.push(id_of(&step));
    }

    let (_, readiness) = t
        .call("GET", &format!("/api/runbooks/{rb}/readiness"), Some(org), None)
        .await;
    assert_eq!(readiness["total_minutes"], 65);
    assert_eq!(readiness["rto_minutes"], 60);
    assert_eq!(readiness["within_rto"], false);

    let order = format!("/api/runbooks/{rb}/steps/order");
    let (status, _) = t
        .call("PUT", &order, Some(org), Some(json!({"step_ids": [ids[0], ids[1]]})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = t
        .call(
            "PUT",
            &order,
            Some(org),
            Some(json!({"step_ids": [ids[0], ids[0], ids[1]]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, reordered) = t
        .call(
            "PUT",
            &order,
            Some(org),
            Some(json!({"step_ids": [ids[2], ids[0], ids[1]]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let got: Vec<(i64, i64)> = reordered
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (id_of(s), s["position"].as_i64().unwrap()))
        .collect();
    assert_eq!(got, vec![(ids[2], 1), (ids[0], 2), (ids[1], 3)]);

    let (status, _) = t
        .call("DELETE", &format!("/api/runbook-steps/{}", ids[0]), Some(org), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, steps) = t
        .call("GET", &format!("/api/runbooks/{rb}/steps"), Some(org), None)
        .await;
    let got: Vec<(i64, i64)> = steps
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (id_of(s), s["position"].as_i64().unwrap()))
        .collect();
    assert_eq!(got, vec![(ids[2], 1), (ids[1], 2)]);

    let (status, _) = t
        .call(
            "PATCH",
            &format!("/api/runbook-steps/{}", ids[1]),
            Some(org),
            Some(json!({"estimated_minutes": 10})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, readiness) = t
        .call("GET", &format!("/api/runbooks/{rb}/readiness"), Some(org), None)
        .await;
    assert_eq!(readiness["total_minutes"], 30);
    assert_eq!(readiness["within_rto"], true);
}

#[tokio::test]
async fn dashboard_summarises_the_organization() {
    let t = spawn_app("dashboard").await;
    let org = t.create_org("Acme", 12).await;
    t.call(
        "POST",
        "/api/policies",
        Some(org),
        Some(json!({"title": "BCM Policy"})),
    )
    .await;
    t.call(
        "POST",
        "/api/risks",
        Some(org),
        Some(json!({"title": "Flood", "likelihood": 4, "impact": 4})),
    )
    .await;
    process(&t, org, "Payments", 4.0, 1000.0).await;
    t.call(
        "POST",
        "/api/runbooks",
        Some(org),
        Some(json!({"title": "Flood response", "status": "active"})),
    )
    .await;

    let (status, dash) = t.call("GET", "/api/dashboard", Some(org), None).await;
    assert_eq!(status, StatusCode::OK, "{dash}");
    assert_eq!(dash["policies_by_status"]["draft"], 1);
    assert_eq!(dash["policies_by_status"]["approved"], 0);
    assert_eq!(dash["risks"]["open"], 1);
    assert_eq!(dash["risks"]["above_appetite"], 1);
    assert_eq!(dash["risks"]["by_level"]["critical"], 1);
    assert_eq!(dash["heatmap"]["cells"][3][3], 1);
    assert_eq!(dash["bia"]["processes"], 1);
    assert_eq!(dash["bia"]["total_exposure"], 4000.0);
    assert_eq!(dash["runbooks_by_status"]["active"], 1);
}

#[tokio::test]
async fn reorder_racing_an_append_keeps_positions_contiguous() {
    let t = spawn_app("runbook-reorder-race").await;
    let org = t.create_org("Acme", 12).await;

    for round in 0..5 {
        let (_, runbook) = t
            .call(
                "POST",
                "/api/runbooks",
                Some(org),
                Some(json!({"title": format!("Restore payments {round}")})),
            )
            .await;
        let steps_uri = format!("/api/runbooks/{}/steps", id_of(&runbook));
        let mut ids = Vec::new();
        for title in ["Page on-call", "Fail over database"] {
            let (_, step) = t
                .call("POST", &steps_uri, Some(org), Some(json!({"title": title})))
                .await;
            ids.push(id_of(&step));
        }

        let order_uri = format!("{steps_uri}/order");
        let ((appended, late), (reordered, _)) = tokio::join!(
            t.call(
                "POST",
                &steps_uri,
                Some(org),
                Some(json!({"title": "Notify customers"})),
            ),
            t.call(
                "PUT",
                &order_uri,
                Some(org),
                Some(json!({"step_ids": [ids[1], ids[0]]})),
            ),
        );
        assert_eq!(appended, StatusCode::CREATED);

        let (_, steps) = t.call("GET", &steps_uri, Some(org), None).await;
        let order: Vec<(i64, i64)> = steps
            .as_array()
            .unwrap()
            .iter()
            .map(|s| (id_of(s), s["position"].as_i64().unwrap()))
            .collect();
        match reordered {
            StatusCode::OK => assert_eq!(
                order,
                vec![(ids[1], 1), (ids[0], 2), (id_of(&late), 3)]
            ),
            StatusCode::BAD_REQUEST => assert_eq!(
                order,
                vec![(ids[0], 1), (ids[1], 2), (id_of(&late), 3)]
            ),
            other => panic!("unexpected status {other}"),
        }
    }
}
