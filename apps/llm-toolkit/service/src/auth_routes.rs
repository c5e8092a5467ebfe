use super::*;

use crate::api_envelope::{created_data, ok_ack};
use crate::auth::{LoginInput, ProfileUpdateInput, RegisterInput};

const INVALID_TOKEN_GRANT_MESSAGE: &str = "Incorrect username or password";

#[derive(Debug, Deserialize)]
pub(super) struct RegisterRequestPayload {
    email: String,
    password: String,
    name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequestPayload {
    email: String,
    password: String,
}

/// OAuth2 password grant. `username` carries the email.
#[derive(Debug, Deserialize)]
pub(super) struct TokenForm {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProfileUpdateRequestPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    default_region: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

pub(super) async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequestPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let session = state
        .auth
        .register(RegisterInput {
            email: payload.email,
            password: payload.password,
            name: payload.name,
        })
        .await
        .map_err(map_auth_error)?;

    Ok(created_data(session))
}

pub(super) async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequestPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let session = state
        .auth
        .login(LoginInput {
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(map_auth_error)?;

    Ok(ok_data(session))
}

pub(super) async fn token(
    State(state): State<AppState>,
    payload: Result<Form<TokenForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = form_body(payload)?;
    let session = state
        .auth
        .login(LoginInput {
            email: payload.username,
            password: payload.password,
        })
        .await
        .map_err(|error| match error {
            AuthError::Unauthorized { .. } => unauthorized_error(INVALID_TOKEN_GRANT_MESSAGE),
            other => map_auth_error(other),
        })?;

    Ok(Json(TokenResponse {
        access_token: session.token,
        token_type: "bearer",
    }))
}

pub(super) async fn profile(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    ok_data(user)
}

pub(super) async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ProfileUpdateRequestPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let updated = state
        .auth
        .update_profile(
            &user.id,
            ProfileUpdateInput {
                name: payload.name,
                organization: payload.organization,
                default_region: payload.default_region,
            },
        )
        .await
        .map_err(map_auth_error)?;

    Ok(ok_data(updated))
}

pub(super) async fn logout(Extension(user): Extension<AuthUser>) -> impl IntoResponse {
    info!(target: "llm_toolkit.auth", user_id = %user.id, "logout acknowledged");
    ok_ack()
}
