use std::time::SystemTime;

use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::extract::{Form, Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod access_token;
pub mod api_envelope;
pub mod assistant;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod datasets;
pub mod domain_store;
pub mod endpoints;
pub mod openapi;
pub mod projects;
pub mod research;
pub mod training;

mod auth_routes;
mod project_routes;

use crate::api_envelope::{
    ApiError, conflict_error, internal_error, invalid_state_error, not_found_error, ok_data,
    unauthorized_error, validation_error,
};
use crate::auth::{AuthError, AuthService, AuthUser};
use crate::catalog::ModelFilter;
use crate::config::Config;
use crate::domain_store::{DomainStore, DomainStoreError};
use crate::openapi::{
    ROUTE_ASSISTANT_CHAT, ROUTE_ASSISTANT_SUGGESTIONS, ROUTE_AUTH_LOGIN, ROUTE_AUTH_LOGOUT,
    ROUTE_AUTH_PROFILE, ROUTE_AUTH_REGISTER, ROUTE_AUTH_TOKEN, ROUTE_DATASETS,
    ROUTE_DATASETS_BY_ID, ROUTE_DATASETS_MAPPING, ROUTE_DATASETS_UPLOAD, ROUTE_DATASETS_VALIDATE,
    ROUTE_ENDPOINTS, ROUTE_ENDPOINTS_BY_ID, ROUTE_ENDPOINTS_INVOKE, ROUTE_FINE_TUNES,
    ROUTE_FINE_TUNES_BY_ID, ROUTE_FINE_TUNES_LOGS, ROUTE_FINE_TUNES_METRICS,
    ROUTE_FINE_TUNES_STOP, ROUTE_HEALTH, ROUTE_MODELS, ROUTE_MODELS_BY_ID, ROUTE_OPENAPI_JSON,
    ROUTE_PROJECTS, ROUTE_PROJECTS_BY_ID, ROUTE_RESEARCH, ROUTE_RESEARCH_BY_ID,
    ROUTE_RESEARCH_STOP, ROUTE_RESEARCH_STREAM, openapi_document,
};

#[derive(Clone)]
struct AppState {
    auth: AuthService,
    store: DomainStore,
    started_at: SystemTime,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct SuggestionsQuery {
    #[serde(default)]
    context: Option<String>,
}

pub fn build_router(config: Config) -> Router {
    let auth = AuthService::from_config(&config);
    let store = DomainStore::from_config(&config);
    let cors = cors_layer(&config);
    let state = AppState {
        auth,
        store,
        started_at: SystemTime::now(),
    };

    let public_api_router = Router::<AppState>::new()
        .route(ROUTE_AUTH_REGISTER, post(auth_routes::register))
        .route(ROUTE_AUTH_LOGIN, post(auth_routes::login))
        .route(ROUTE_AUTH_TOKEN, post(auth_routes::token))
        .route(ROUTE_MODELS, get(list_models))
        .route(ROUTE_MODELS_BY_ID, get(show_model));

    let protected_api_router = Router::<AppState>::new()
        .route(
            ROUTE_AUTH_PROFILE,
            get(auth_routes::profile).patch(auth_routes::update_profile),
        )
        .route(ROUTE_AUTH_LOGOUT, post(auth_routes::logout))
        .route(
            ROUTE_PROJECTS,
            get(project_routes::list_projects).post(project_routes::create_project),
        )
        .route(
            ROUTE_PROJECTS_BY_ID,
            get(project_routes::show_project)
                .patch(project_routes::update_project)
                .delete(project_routes::delete_project),
        )
        .route(ROUTE_DATASETS, get(project_routes::list_datasets))
        .route(ROUTE_DATASETS_UPLOAD, post(project_routes::upload_dataset))
        .route(
            ROUTE_DATASETS_BY_ID,
            get(project_routes::show_dataset).delete(project_routes::delete_dataset),
        )
        .route(
            ROUTE_DATASETS_VALIDATE,
            post(project_routes::validate_dataset),
        )
        .route(
            ROUTE_DATASETS_MAPPING,
            axum::routing::patch(project_routes::update_dataset_mapping),
        )
        .route(
            ROUTE_FINE_TUNES,
            get(project_routes::list_training_runs).post(project_routes::start_training_run),
        )
        .route(
            ROUTE_FINE_TUNES_BY_ID,
            get(project_routes::show_training_run),
        )
        .route(ROUTE_FINE_TUNES_LOGS, get(project_routes::training_logs))
        .route(
            ROUTE_FINE_TUNES_METRICS,
            get(project_routes::training_metrics),
        )
        .route(ROUTE_FINE_TUNES_STOP, post(project_routes::stop_training_run))
        .route(
            ROUTE_ENDPOINTS,
            get(project_routes::list_endpoints).post(project_routes::create_endpoint),
        )
        .route(
            ROUTE_ENDPOINTS_BY_ID,
            get(project_routes::show_endpoint)
                .patch(project_routes::update_endpoint)
                .delete(project_routes::delete_endpoint),
        )
        .route(
            ROUTE_ENDPOINTS_INVOKE,
            post(project_routes::invoke_endpoint),
        )
        .route(
            ROUTE_RESEARCH,
            get(project_routes::list_research_sessions)
                .post(project_routes::create_research_session),
        )
        .route(
            ROUTE_RESEARCH_BY_ID,
            get(project_routes::show_research_session)
                .delete(project_routes::delete_research_session),
        )
        .route(
            ROUTE_RESEARCH_STREAM,
            get(project_routes::research_stream),
        )
        .route(
            ROUTE_RESEARCH_STOP,
            post(project_routes::stop_research_session),
        )
        .route(ROUTE_ASSISTANT_CHAT, post(assistant_chat))
        .route(ROUTE_ASSISTANT_SUGGESTIONS, get(assistant_suggestions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_session_gate,
        ));

    Router::new()
        .route(ROUTE_HEALTH, get(health))
        .route(ROUTE_OPENAPI_JSON, get(openapi_spec))
        .merge(public_api_router)
        .merge(protected_api_router)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr;
    let listener = TcpListener::bind(bind_addr).await?;
    info!(bind_addr = %bind_addr, "llm toolkit service listening");

    axum::serve(listener, build_router(config)).await?;
    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(origin = %origin, %error, "ignoring invalid cors origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = match state.started_at.elapsed() {
        Ok(duration) => duration.as_secs(),
        Err(_) => 0,
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
    })
}

async fn openapi_spec() -> Json<serde_json::Value> {
    Json(openapi_document())
}

async fn auth_session_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return unauthorized_error("Not authenticated").into_response();
    };

    match state.auth.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(error) => map_auth_error(error).into_response(),
    }
}

async fn list_models(
    query: Result<Query<ModelFilter>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query_params(query)?;
    Ok(ok_data(catalog::list_models(&filter)))
}

async fn show_model(Path(model_id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let model = catalog::find_model(&model_id).ok_or_else(|| not_found_error("Model not found"))?;
    Ok(ok_data(model))
}

async fn assistant_chat(
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<assistant::AssistantChatInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    tracing::debug!(
        target: "llm_toolkit.assistant",
        user_id = %user.id,
        messages = payload.messages.len(),
        context = payload.context.as_deref().unwrap_or("none"),
        "assistant chat"
    );
    Ok(ok_data(assistant::reply(&payload.messages)))
}

async fn assistant_suggestions(
    query: Result<Query<SuggestionsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query_params(query)?;
    Ok(ok_data(assistant::suggestions(query.context.as_deref())))
}

fn map_auth_error(error: AuthError) -> ApiError {
    match error {
        AuthError::Validation { field, message } => validation_error(field, &message),
        AuthError::Unauthorized { message } => unauthorized_error(&message),
        AuthError::Conflict { message } => conflict_error(message),
        AuthError::Internal { message } => internal_error(message),
    }
}

fn map_domain_store_error(error: DomainStoreError) -> ApiError {
    match error {
        DomainStoreError::NotFound { .. } => not_found_error(error.to_string()),
        DomainStoreError::Validation { field, message } => validation_error(field, &message),
        DomainStoreError::InvalidState { message } => invalid_state_error(message),
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| validation_error("body", &rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| validation_error("query", &rejection.body_text()))
}

fn form_body<T>(payload: Result<Form<T>, FormRejection>) -> Result<T, ApiError> {
    payload
        .map(|Form(value)| value)
        .map_err(|rejection| validation_error("body", &rejection.body_text()))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let authorization = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = authorization.strip_prefix("Bearer ")?.trim();
    non_empty(token.to_string())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
