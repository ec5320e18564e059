//! HTTP routes for domain records.
//!
//! - `GET /domains` lists every stored record
//! - `POST /domains?host=<name>` returns the current host info for one domain,
//!   building or refreshing it first when needed

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use hostgrade_client::parse_host;
use hostgrade_core::{DomainList, Error, HostInfo, RefreshOrchestrator};

use crate::error::ApiError;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RefreshOrchestrator>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .route("/domains", get(list_domains).post(resolve_domain))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct HostParams {
    pub host: Option<String>,
}

async fn list_domains(State(state): State<AppState>) -> Result<Json<DomainList>, ApiError> {
    let list = state.orchestrator.list().await?;
    tracing::debug!(count = list.items.len(), "listed domains");
    Ok(Json(list))
}

async fn resolve_domain(
    State(state): State<AppState>, Query(params): Query<HostParams>,
) -> Result<(StatusCode, Json<HostInfo>), ApiError> {
    let raw = params
        .host
        .ok_or_else(|| Error::InvalidInput("Invalid domain name: missing host parameter".into()))?;
    let host = parse_host(&raw)?;

    let domain = state.orchestrator.resolve(&host).await?;

    Ok((StatusCode::CREATED, Json(domain.host_info)))
}
