use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_extractor_with_state,
    routing::{delete, get, patch, post, put},
};

use crate::config::BasicConfig;
use crate::db::GrcStorage;
use crate::handlers::{
    assessments, bia, dashboard, frameworks, health, organizations, policies, risks, runbooks,
};
use crate::middleware::auth::RequireKeyAuth;
use crate::service::assistant::AiAssistant;

#[derive(Clone)]
pub struct NexusState {
    pub storage: GrcStorage,
    pub assistant: AiAssistant,
    pub nexus_key: Arc<str>,
    pub default_risk_appetite: i64,
    pub max_body_bytes: usize,
}

impl NexusState {
    pub fn new(storage: GrcStorage, assistant: AiAssistant, basic: &BasicConfig) -> Self {
        Self {
            storage,
            assistant,
            nexus_key: Arc::from(basic.nexus_key.as_str()),
            default_risk_appetite: i64::from(basic.default_risk_appetite),
            max_body_bytes: basic.max_body_bytes,
        }
    }
}

fn api_router() -> Router<NexusState> {
    Router::new()
        .route(
            "/organizations",
            post(organizations::create_organization).get(organizations::list_organizations),
        )
        .route(
            "/organizations/{id}",
            get(organizations::get_organization).patch(organizations::update_organization),
        )
        .route(
            "/users",
            post(organizations::create_user).get(organizations::list_users),
        )
        .route("/users/{id}", delete(organizations::delete_user))
        .route(
            "/policies",
            post(policies::create_policy).get(policies::list_policies),
        )
        .route("/policies/generate", post(policies::generate_policy))
        .route(
            "/policies/{id}",
            get(policies::get_policy)
                .patch(policies::update_policy)
                .delete(policies::delete_policy),
        )
        .route("/policies/{id}/transition", post(policies::transition_policy))
        .route(
            "/frameworks",
            post(frameworks::create_framework).get(frameworks::list_frameworks),
        )
        .route(
            "/frameworks/{id}",
            get(frameworks::get_framework).delete(frameworks::delete_framework),
        )
        .route("/frameworks/{id}/domains", post(frameworks::create_domain))
        .route("/frameworks/{id}/score", get(frameworks::score_framework))
        .route("/domains/{id}/controls", post(frameworks::create_control))
        .route("/controls/{id}", patch(frameworks::update_control))
        .route(
            "/assessments",
            post(assessments::create_assessment).get(assessments::list_assessments),
        )
        .route("/assessments/{id}", get(assessments::get_assessment))
        .route(
            "/assessments/{id}/results/{control_id}",
            put(assessments::record_result),
        )
        .route(
            "/assessments/{id}/progress",
            get(assessments::assessment_progress),
        )
        .route(
            "/assessments/{id}/complete",
            post(assessments::complete_assessment),
        )
        .route(
            "/risk-universe",
            post(risks::create_universe_entry).get(risks::list_universe),
        )
        .route("/risks", post(risks::create_risk).get(risks::list_risks))
        .route("/risks/heatmap", get(risks::risk_heatmap))
        .route(
            "/risks/{id}",
            get(risks::get_risk)
                .patch(risks::update_risk)
                .delete(risks::delete_risk),
        )
        .route(
            "/risks/{id}/controls/{control_id}",
            put(risks::link_control).delete(risks::unlink_control),
        )
        .route(
            "/risks/{id}/suggest-treatment",
            post(risks::suggest_treatment),
        )
        .route(
            "/bia/processes",
            post(bia::create_process).get(bia::list_processes),
        )
        .route(
            "/bia/processes/{id}",
            get(bia::get_process)
                .patch(bia::update_process)
                .delete(bia::delete_process),
        )
        .route(
            "/bia/processes/{id}/dependencies",
            post(bia::create_dependency).get(bia::list_dependencies),
        )
        .route("/bia/processes/{id}/analysis", get(bia::process_analysis))
        .route(
            "/bia/processes/{id}/analysis/recommendations",
            post(bia::process_recommendations),
        )
        .route("/bia/assets", post(bia::create_asset).get(bia::list_assets))
        .route("/bia/assets/{id}", delete(bia::delete_asset))
        .route(
            "/bia/dependencies/{id}",
            delete(bia::delete_dependency),
        )
        .route("/bia/analysis", get(bia::organization_analysis))
        .route(
            "/runbooks",
            post(runbooks::create_runbook).get(runbooks::list_runbooks),
        )
        .route(
            "/runbooks/{id}",
            get(runbooks::get_runbook)
                .patch(runbooks::update_runbook)
                .delete(runbooks::delete_runbook),
        )
        .route(
            "/runbooks/{id}/steps",
            post(runbooks::add_step).get(runbooks::list_steps),
        )
        .route("/runbooks/{id}/steps/order", put(runbooks::reorder_steps))
        .route("/runbooks/{id}/readiness", get(runbooks::runbook_readiness))
        .route(
            "/runbooks/{id}/generate-steps",
            post(runbooks::generate_steps),
        )
        .route(
            "/runbook-steps/{id}",
            patch(runbooks::update_step).delete(runbooks::delete_step),
        )
        .route("/dashboard", get(dashboard::dashboard_summary))
}

pub fn nexus_router(state: NexusState) -> Router {
    let api = api_router().route_layer(from_extractor_with_state::<RequireKeyAuth, _>(
        state.clone(),
    ));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state)
}
