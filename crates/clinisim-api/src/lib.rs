//! clinisim-api
//!
//! HTTP surface of the simulator: an axum router over the session service.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware as axum_mw;
use axum::routing::{get, post};
use clinisim_llm::client::{ChatBackend, OpenAiCompatClient};
use clinisim_llm::synth::CaseSynthesizer;
use clinisim_sessions::lifecycle::SessionService;
use clinisim_sessions::relay::ConversationRelay;
use clinisim_storage::Store;
use clinisim_storage::memory::MemoryStore;
use clinisim_storage::s3::S3Store;
use tower_http::cors::{Any, CorsLayer};

use config::{Settings, StoreKind};
use state::AppState;

/// Wire the session service from settings: store, model client, relay and
/// synthesizer. Fixed cases are imported before the service is returned.
pub async fn build_state(settings: &Settings) -> eyre::Result<AppState> {
    let store: Arc<dyn Store> = match settings.store {
        StoreKind::S3 => {
            let s3 = clinisim_storage::client::build_client().await;
            Arc::new(S3Store::new(s3, settings.bucket.clone()))
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory store; sessions are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let backend: Arc<dyn ChatBackend> = Arc::new(OpenAiCompatClient::new(
        &settings.llm_base_url,
        settings.llm_model.clone(),
        settings.llm_api_key.clone(),
        settings.llm_timeout,
    )?);
    let estimator = settings.estimator()?;

    if let Some(dir) = &settings.cases_dir {
        clinisim_sessions::import::import_dir(store.as_ref(), dir)
            .await
            .map_err(|e| eyre::eyre!("importing cases from {}: {e}", dir.display()))?;
    }

    Ok(assemble(store, backend, estimator, settings))
}

/// Build application state around an existing store and model backend.
pub fn assemble(
    store: Arc<dyn Store>,
    backend: Arc<dyn ChatBackend>,
    estimator: clinisim_llm::budget::TokenEstimator,
    settings: &Settings,
) -> AppState {
    let relay = ConversationRelay::new(
        Arc::clone(&backend),
        Arc::clone(&store),
        estimator.clone(),
        settings.relay_settings(),
    );
    let synthesizer = CaseSynthesizer::new(
        backend,
        estimator,
        settings.max_context_len,
        settings.synthesis_settings(),
    );
    AppState {
        sessions: Arc::new(SessionService::new(
            store,
            relay,
            synthesizer,
            settings.intent_ordering,
        )),
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Everything under /sessions belongs to the bearer.
    let protected = Router::new()
        .route(
            "/sessions",
            post(routes::sessions::create_session).get(routes::sessions::list_sessions),
        )
        .route(
            "/sessions/{id}",
            get(routes::sessions::get_session).delete(routes::sessions::delete_session),
        )
        .route("/sessions/{id}/chat", post(routes::chat::post_message))
        .route(
            "/sessions/{id}/investigations",
            post(routes::investigations::order_investigation)
                .get(routes::investigations::list_investigations),
        )
        .route(
            "/sessions/{id}/submit",
            post(routes::submission::submit_diagnosis),
        )
        .route("/sessions/{id}/score", get(routes::submission::get_score))
        .route_layer(axum_mw::from_fn(middleware::auth::require_auth));

    Router::new()
        // Health (no auth)
        .route("/health", get(routes::health::health_check))
        // Case catalog (no auth; no ground truth or results)
        .route("/cases", get(routes::cases::list_cases))
        .route(
            "/cases/{id}/investigations",
            get(routes::cases::list_case_investigations),
        )
        .merge(protected)
        .layer(axum_mw::from_fn(middleware::audit::audit_log))
        .layer(cors)
        .with_state(state)
}
