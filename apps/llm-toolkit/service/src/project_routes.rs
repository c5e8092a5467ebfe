use super::*;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartRejection;
use serde_json::{Map, Value};

use crate::api_envelope::{created_data, ok_ack};
use crate::endpoints::{CreateEndpointInput, InvokeEndpointInput, UpdateEndpointInput};
use crate::projects::{CreateProjectInput, PageRequest, UpdateProjectInput};
use crate::research::CreateResearchSessionInput;
use crate::training::CreateTrainingRunInput;

const DATASET_FILE_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub(super) struct ProjectListQuery {
    #[serde(default)]
    page: Option<usize>,
    #[serde(default, alias = "pageSize")]
    page_size: Option<usize>,
}

pub(super) async fn list_projects(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<ProjectListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query_params(query)?;
    let page = state
        .store
        .list_projects(&user.id, PageRequest::new(query.page, query.page_size))
        .await;
    Ok(ok_data(page))
}

pub(super) async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateProjectInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let project = state
        .store
        .create_project(&user.id, payload)
        .await
        .map_err(map_domain_store_error)?;
    Ok(created_data(project))
}

pub(super) async fn show_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state
        .store
        .get_project(&user.id, &project_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(project))
}

pub(super) async fn update_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    payload: Result<Json<UpdateProjectInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let project = state
        .store
        .update_project(&user.id, &project_id, payload)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(project))
}

pub(super) async fn delete_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .delete_project(&user.id, &project_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_ack())
}

pub(super) async fn list_datasets(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let datasets = state
        .store
        .list_datasets(&user.id, &project_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(datasets))
}

/// Only the file name of the `file` part is kept; the bytes are discarded.
pub(super) async fn upload_dataset(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .get_project(&user.id, &project_id)
        .await
        .map_err(map_domain_store_error)?;

    let mut multipart = multipart
        .map_err(|rejection| validation_error(DATASET_FILE_FIELD, &rejection.body_text()))?;
    let mut file_name = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| validation_error(DATASET_FILE_FIELD, &error.body_text()))?
    {
        if field.name() == Some(DATASET_FILE_FIELD) {
            file_name = field.file_name().map(ToString::to_string);
            break;
        }
    }
    let file_name = file_name
        .ok_or_else(|| validation_error(DATASET_FILE_FIELD, "A dataset file is required"))?;

    let dataset = state
        .store
        .upload_dataset(&user.id, &project_id, &file_name)
        .await
        .map_err(map_domain_store_error)?;
    Ok(created_data(dataset))
}

pub(super) async fn show_dataset(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, dataset_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let dataset = state
        .store
        .get_dataset(&user.id, &project_id, &dataset_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(dataset))
}

pub(super) async fn delete_dataset(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, dataset_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .delete_dataset(&user.id, &project_id, &dataset_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_ack())
}

pub(super) async fn validate_dataset(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, dataset_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let validation = state
        .store
        .validate_dataset(&user.id, &project_id, &dataset_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(validation))
}

pub(super) async fn update_dataset_mapping(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, dataset_id)): Path<(String, String)>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mapping = json_body(payload)?;
    let dataset = state
        .store
        .update_dataset_mapping(&user.id, &project_id, &dataset_id, mapping)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(dataset))
}

pub(super) async fn list_training_runs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let runs = state
        .store
        .list_training_runs(&user.id, &project_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(runs))
}

pub(super) async fn start_training_run(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    payload: Result<Json<CreateTrainingRunInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let run = state
        .store
        .start_training_run(&user.id, &project_id, payload)
        .await
        .map_err(map_domain_store_error)?;
    Ok(created_data(run))
}

pub(super) async fn show_training_run(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, run_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let run = state
        .store
        .get_training_run(&user.id, &project_id, &run_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(run))
}

pub(super) async fn training_logs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, run_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = state
        .store
        .training_logs(&user.id, &project_id, &run_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(logs))
}

pub(super) async fn training_metrics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, run_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let metrics = state
        .store
        .training_metrics(&user.id, &project_id, &run_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(metrics))
}

pub(super) async fn stop_training_run(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, run_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let run = state
        .store
        .stop_training_run(&user.id, &project_id, &run_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(run))
}

pub(super) async fn list_endpoints(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let endpoints = state
        .store
        .list_endpoints(&user.id, &project_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(endpoints))
}

pub(super) async fn create_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    payload: Result<Json<CreateEndpointInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let endpoint = state
        .store
        .create_endpoint(&user.id, &project_id, payload)
        .await
        .map_err(map_domain_store_error)?;
    Ok(created_data(endpoint))
}

pub(super) async fn show_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, endpoint_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let endpoint = state
        .store
        .get_endpoint(&user.id, &project_id, &endpoint_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(endpoint))
}

pub(super) async fn update_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, endpoint_id)): Path<(String, String)>,
    payload: Result<Json<UpdateEndpointInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let endpoint = state
        .store
        .update_endpoint(&user.id, &project_id, &endpoint_id, payload)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(endpoint))
}

pub(super) async fn delete_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, endpoint_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .delete_endpoint(&user.id, &project_id, &endpoint_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_ack())
}

pub(super) async fn invoke_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, endpoint_id)): Path<(String, String)>,
    payload: Result<Json<InvokeEndpointInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let result = state
        .store
        .invoke_endpoint(&user.id, &project_id, &endpoint_id, payload)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(result))
}

pub(super) async fn list_research_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state
        .store
        .list_research_sessions(&user.id, &project_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(sessions))
}

pub(super) async fn create_research_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
    payload: Result<Json<CreateResearchSessionInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let session = state
        .store
        .create_research_session(&user.id, &project_id, payload)
        .await
        .map_err(map_domain_store_error)?;
    Ok(created_data(session))
}

pub(super) async fn show_research_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .store
        .get_research_session(&user.id, &project_id, &session_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(session))
}

pub(super) async fn delete_research_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .delete_research_session(&user.id, &project_id, &session_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_ack())
}

pub(super) async fn research_stream(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let notice = state
        .store
        .research_stream_notice(&user.id, &project_id, &session_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(notice))
}

pub(super) async fn stop_research_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .store
        .stop_research_session(&user.id, &project_id, &session_id)
        .await
        .map_err(map_domain_store_error)?;
    Ok(ok_data(session))
}
