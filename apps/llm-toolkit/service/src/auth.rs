use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::access_token::{AccessTokenError, AccessTokenIssuer};
use crate::config::Config;

const MAX_NAME_CHARS: usize = 120;
const MAX_EMAIL_LEN: usize = 255;
const INVALID_LOGIN_MESSAGE: &str = "Incorrect email or password";
const INVALID_CREDENTIALS_MESSAGE: &str = "Could not validate credentials";

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: AccessTokenIssuer,
    password_hash_cost: u32,
    default_region: String,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub organization: Option<String>,
    pub default_region: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user. Inserted into request extensions by the auth gate.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub organization: Option<String>,
    pub default_region: String,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for AuthUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            email: record.email.clone(),
            name: record.name.clone(),
            organization: record.organization.clone(),
            default_region: record.default_region.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateInput {
    pub name: Option<String>,
    pub organization: Option<String>,
    pub default_region: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{message}")]
    Unauthorized { message: String },
    #[error("{message}")]
    Conflict { message: String },
    #[error("{message}")]
    Internal { message: String },
}

pub type UserPatch = Box<dyn FnOnce(&mut UserRecord) + Send>;

/// Storage seam for user accounts. Email uniqueness is enforced by `insert`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, record: UserRecord) -> Result<(), AuthError>;

    async fn find_by_email(&self, email: &str) -> Option<UserRecord>;

    async fn update(&self, user_id: &str, patch: UserPatch) -> Option<UserRecord>;
}

#[derive(Default)]
struct UserState {
    users_by_id: HashMap<String, UserRecord>,
    users_by_email: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    state: Arc<RwLock<UserState>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, record: UserRecord) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        if state.users_by_email.contains_key(&record.email) {
            return Err(AuthError::Conflict {
                message: "Email already registered".to_string(),
            });
        }

        state
            .users_by_email
            .insert(record.email.clone(), record.id.clone());
        state.users_by_id.insert(record.id.clone(), record);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        let state = self.state.read().await;
        let user_id = state.users_by_email.get(email)?;
        state.users_by_id.get(user_id).cloned()
    }

    async fn update(&self, user_id: &str, patch: UserPatch) -> Option<UserRecord> {
        let mut state = self.state.write().await;
        let record = state.users_by_id.get_mut(user_id)?;
        patch(record);
        Some(record.clone())
    }
}

impl AuthService {
    pub fn from_config(config: &Config) -> Self {
        Self::with_repository(config, Arc::new(InMemoryUserRepository::default()))
    }

    pub fn with_repository(config: &Config, users: Arc<dyn UserRepository>) -> Self {
        Self {
            users,
            tokens: AccessTokenIssuer::from_config(config),
            password_hash_cost: config.password_hash_cost,
            default_region: config.default_region.clone(),
        }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&input.email)?;
        let name = normalize_name(&input.name)?;
        let password = require_password(input.password)?;

        if self.users.find_by_email(&email).await.is_some() {
            return Err(AuthError::Conflict {
                message: "Email already registered".to_string(),
            });
        }

        let password_hash = hash_password(password, self.password_hash_cost).await?;
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            password_hash,
            organization: None,
            default_region: self.default_region.clone(),
            created_at: Utc::now(),
        };
        self.users.insert(record.clone()).await?;

        tracing::info!(
            target: "llm_toolkit.auth",
            user_id = %record.id,
            "user registered"
        );

        self.session_for(&record)
    }

    /// Every miss yields the same 401, whether or not the identifier looks
    /// like an email.
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let email = input.email.trim().to_lowercase();
        let Some(record) = self.users.find_by_email(&email).await else {
            tracing::debug!(target: "llm_toolkit.auth", "login rejected for unknown email");
            return Err(invalid_login());
        };

        if !verify_password(input.password, record.password_hash.clone()).await? {
            tracing::debug!(
                target: "llm_toolkit.auth",
                user_id = %record.id,
                "login rejected for wrong password"
            );
            return Err(invalid_login());
        }

        self.session_for(&record)
    }

    /// Resolves a bearer credential to a live user account.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.tokens.verify(token).map_err(|error| {
            tracing::debug!(target: "llm_toolkit.auth", reason = %error, "bearer token rejected");
            invalid_credentials()
        })?;

        self.users
            .find_by_email(&claims.sub)
            .await
            .map(|record| AuthUser::from(&record))
            .ok_or_else(invalid_credentials)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        input: ProfileUpdateInput,
    ) -> Result<AuthUser, AuthError> {
        let name = input.name.as_deref().map(normalize_name).transpose()?;
        let default_region = input
            .default_region
            .as_deref()
            .map(|value| normalize_required(value, "default_region"))
            .transpose()?;
        let organization = input.organization.map(|value| value.trim().to_string());

        let updated = self
            .users
            .update(
                user_id,
                Box::new(move |record: &mut UserRecord| {
                    if let Some(name) = name {
                        record.name = name;
                    }
                    if let Some(organization) = organization {
                        record.organization = Some(organization).filter(|value| !value.is_empty());
                    }
                    if let Some(default_region) = default_region {
                        record.default_region = default_region;
                    }
                }),
            )
            .await
            .ok_or_else(invalid_credentials)?;

        Ok(AuthUser::from(&updated))
    }

    fn session_for(&self, record: &UserRecord) -> Result<AuthSession, AuthError> {
        let issued = self.tokens.issue(&record.email).map_err(map_token_error)?;
        Ok(AuthSession {
            token: issued.token,
            user: AuthUser::from(record),
        })
    }
}

fn map_token_error(error: AccessTokenError) -> AuthError {
    match error {
        AccessTokenError::Signing { message } => AuthError::Internal { message },
        AccessTokenError::InvalidToken | AccessTokenError::TokenExpired => invalid_credentials(),
    }
}

fn invalid_login() -> AuthError {
    AuthError::Unauthorized {
        message: INVALID_LOGIN_MESSAGE.to_string(),
    }
}

fn invalid_credentials() -> AuthError {
    AuthError::Unauthorized {
        message: INVALID_CREDENTIALS_MESSAGE.to_string(),
    }
}

async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|error| AuthError::Internal {
            message: format!("password hashing task failed: {error}"),
        })?
        .map_err(|error| AuthError::Internal {
            message: format!("password hashing failed: {error}"),
        })
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|error| AuthError::Internal {
            message: format!("password verification task failed: {error}"),
        })?
        .map_err(|error| AuthError::Internal {
            message: format!("password verification failed: {error}"),
        })
}

fn normalize_email(raw_email: &str) -> Result<String, AuthError> {
    let email = raw_email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') || email.len() > MAX_EMAIL_LEN {
        return Err(AuthError::Validation {
            field: "email",
            message: "Enter a valid email address.".to_string(),
        });
    }

    Ok(email)
}

fn normalize_name(raw_name: &str) -> Result<String, AuthError> {
    let name = normalize_required(raw_name, "name")?;
    Ok(name.chars().take(MAX_NAME_CHARS).collect())
}

fn normalize_required(value: &str, field: &'static str) -> Result<String, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::Validation {
            field,
            message: format!("The {field} field is required."),
        });
    }

    Ok(trimmed.to_string())
}

fn require_password(password: String) -> Result<String, AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation {
            field: "password",
            message: "The password field is required.".to_string(),
        });
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::from_config(&Config::for_tests())
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: "hunter22".to_string(),
            name: "Ada Lovelace".to_string(),
        }
    }

    #[tokio::test]
    async fn register_issues_token_and_defaults_profile() -> Result<(), AuthError> {
        let auth = service();
        let session = auth.register(register_input("  Ada@Example.com ")).await?;

        assert_eq!(session.user.email, "ada@example.com");
        assert_eq!(session.user.organization, None);
        assert_eq!(session.user.default_region, "us-east-1");

        let resolved = auth.authenticate(&session.token).await?;
        assert_eq!(resolved, session.user);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() -> Result<(), AuthError> {
        let auth = service();
        auth.register(register_input("ada@example.com")).await?;

        let second = auth.register(register_input("ADA@example.com")).await;
        assert!(matches!(second, Err(AuthError::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() -> Result<(), AuthError> {
        let auth = service();
        auth.register(register_input("ada@example.com")).await?;

        let wrong_password = auth
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "nope".to_string(),
            })
            .await;
        let unknown_email = auth
            .login(LoginInput {
                email: "grace@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await;
        let not_an_email = auth
            .login(LoginInput {
                email: "nobody".to_string(),
                password: "hunter22".to_string(),
            })
            .await;

        let messages: Vec<String> = [wrong_password, unknown_email, not_an_email]
            .into_iter()
            .map(|result| match result {
                Err(AuthError::Unauthorized { message }) => message,
                other => format!("unexpected: {other:?}"),
            })
            .collect();
        assert_eq!(messages, vec![INVALID_LOGIN_MESSAGE; 3]);
        Ok(())
    }

    #[tokio::test]
    async fn login_with_correct_password_succeeds() -> Result<(), AuthError> {
        let auth = service();
        let registered = auth.register(register_input("ada@example.com")).await?;

        let session = auth
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await?;
        assert_eq!(session.user.id, registered.user.id);
        Ok(())
    }

    #[tokio::test]
    async fn authenticate_rejects_token_for_missing_user() -> Result<(), AccessTokenError> {
        let config = Config::for_tests();
        let auth = AuthService::from_config(&config);
        let orphan = AccessTokenIssuer::from_config(&config).issue("ghost@example.com")?;

        let result = auth.authenticate(&orphan.token).await;
        assert!(matches!(result, Err(AuthError::Unauthorized { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn profile_update_touches_allow_listed_fields_only() -> Result<(), AuthError> {
        let auth = service();
        let session = auth.register(register_input("ada@example.com")).await?;

        let updated = auth
            .update_profile(
                &session.user.id,
                ProfileUpdateInput {
                    name: Some("Countess".to_string()),
                    organization: Some("Analytical Engines".to_string()),
                    default_region: None,
                },
            )
            .await?;

        assert_eq!(updated.name, "Countess");
        assert_eq!(updated.organization.as_deref(), Some("Analytical Engines"));
        assert_eq!(updated.default_region, "us-east-1");
        assert_eq!(updated.email, session.user.email);
        assert_eq!(updated.id, session.user.id);
        Ok(())
    }

    #[tokio::test]
    async fn register_validates_required_fields() {
        let auth = service();

        let bad_email = auth.register(register_input("not-an-email")).await;
        assert!(matches!(
            bad_email,
            Err(AuthError::Validation { field: "email", .. })
        ));

        let mut blank_name = register_input("ada@example.com");
        blank_name.name = "   ".to_string();
        let result = auth.register(blank_name).await;
        assert!(matches!(
            result,
            Err(AuthError::Validation { field: "name", .. })
        ));
    }
}
