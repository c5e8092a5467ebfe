use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain_store::{
    DomainStore, DomainStoreError, ScopedRecord, normalize_non_empty, normalize_optional_string,
    short_id,
};

const DEFAULT_ENDPOINT_INSTANCE: &str = "ml.g5.xlarge";
const MOCK_PROMPT_PREFIX_CHARS: usize = 50;
const MOCK_PROMPT_TOKENS: u32 = 50;
const MOCK_COMPLETION_TOKENS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Creating,
    InService,
    Updating,
    Failed,
    Deleting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointRecord {
    pub id: String,
    pub project_id: String,
    pub training_run_id: String,
    pub name: String,
    pub sagemaker_endpoint_name: String,
    pub status: EndpointStatus,
    pub instance_type: String,
    pub instance_count: u32,
    pub auto_scaling: bool,
    pub endpoint_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopedRecord for EndpointRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope_id(&self) -> &str {
        &self.project_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEndpointInput {
    pub training_run_id: String,
    pub name: String,
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub instance_count: Option<u32>,
    #[serde(default)]
    pub auto_scaling: bool,
}

/// Patchable endpoint fields. `status` is written as given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEndpointInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub instance_count: Option<u32>,
    #[serde(default)]
    pub auto_scaling: Option<bool>,
    #[serde(default)]
    pub status: Option<EndpointStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvokeEndpointInput {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    pub response: String,
    pub usage: TokenUsage,
}

fn mock_completion(messages: &[ChatMessage]) -> InvocationResult {
    let prefix: String = messages
        .last()
        .map(|message| message.content.chars().take(MOCK_PROMPT_PREFIX_CHARS).collect())
        .unwrap_or_default();

    InvocationResult {
        response: format!("This is a mock response to: {prefix}..."),
        usage: TokenUsage {
            prompt_tokens: MOCK_PROMPT_TOKENS,
            completion_tokens: MOCK_COMPLETION_TOKENS,
            total_tokens: MOCK_PROMPT_TOKENS + MOCK_COMPLETION_TOKENS,
        },
    }
}

impl DomainStore {
    pub async fn list_endpoints(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Vec<EndpointRecord>, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        Ok(self.endpoints.list(project_id).await)
    }

    pub async fn create_endpoint(
        &self,
        user_id: &str,
        project_id: &str,
        input: CreateEndpointInput,
    ) -> Result<EndpointRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        let training_run_id = normalize_non_empty(&input.training_run_id, "training_run_id")?;
        let name = normalize_non_empty(&input.name, "name")?;
        let instance_count = validate_instance_count(input.instance_count.unwrap_or(1))?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let endpoint = EndpointRecord {
            sagemaker_endpoint_name: format!("{}-{}", self.naming.bucket_prefix, short_id(&id)),
            id,
            project_id: project_id.to_string(),
            training_run_id,
            name,
            status: EndpointStatus::Creating,
            instance_type: normalize_optional_string(input.instance_type.as_deref())
                .unwrap_or_else(|| DEFAULT_ENDPOINT_INSTANCE.to_string()),
            instance_count,
            auto_scaling: input.auto_scaling,
            endpoint_url: None,
            created_at: now,
            updated_at: now,
        };

        Ok(self.endpoints.insert(endpoint).await)
    }

    pub async fn get_endpoint(
        &self,
        user_id: &str,
        project_id: &str,
        endpoint_id: &str,
    ) -> Result<EndpointRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.endpoints.get(project_id, endpoint_id).await
    }

    pub async fn update_endpoint(
        &self,
        user_id: &str,
        project_id: &str,
        endpoint_id: &str,
        input: UpdateEndpointInput,
    ) -> Result<EndpointRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        let name = input
            .name
            .as_deref()
            .map(|value| normalize_non_empty(value, "name"))
            .transpose()?;
        let instance_count = input
            .instance_count
            .map(validate_instance_count)
            .transpose()?;
        let auto_scaling = input.auto_scaling;
        let status = input.status;

        self.endpoints
            .update(
                project_id,
                endpoint_id,
                Box::new(move |endpoint: &mut EndpointRecord| {
                    if let Some(name) = name {
                        endpoint.name = name;
                    }
                    if let Some(instance_count) = instance_count {
                        endpoint.instance_count = instance_count;
                    }
                    if let Some(auto_scaling) = auto_scaling {
                        endpoint.auto_scaling = auto_scaling;
                    }
                    if let Some(status) = status {
                        endpoint.status = status;
                    }
                    endpoint.updated_at = Utc::now();
                }),
            )
            .await
    }

    pub async fn delete_endpoint(
        &self,
        user_id: &str,
        project_id: &str,
        endpoint_id: &str,
    ) -> Result<(), DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.endpoints
            .remove(project_id, endpoint_id)
            .await
            .map(|_| ())
    }

    /// Canned completion echoing the start of the last message. Only
    /// in-service endpoints answer.
    pub async fn invoke_endpoint(
        &self,
        user_id: &str,
        project_id: &str,
        endpoint_id: &str,
        input: InvokeEndpointInput,
    ) -> Result<InvocationResult, DomainStoreError> {
        let endpoint = self.get_endpoint(user_id, project_id, endpoint_id).await?;
        if endpoint.status != EndpointStatus::InService {
            return Err(DomainStoreError::InvalidState {
                message: "Endpoint is not in service".to_string(),
            });
        }

        tracing::debug!(
            target: "llm_toolkit.domain_store",
            endpoint_id = %endpoint.id,
            messages = input.messages.len(),
            max_tokens = input.max_tokens,
            temperature = input.temperature,
            top_p = input.top_p,
            "mock endpoint invocation"
        );
        Ok(mock_completion(&input.messages))
    }
}

fn validate_instance_count(value: u32) -> Result<u32, DomainStoreError> {
    if value == 0 {
        return Err(DomainStoreError::Validation {
            field: "instance_count",
            message: "must be at least 1".to_string(),
        });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::projects::{CreateProjectInput, ProjectType};

    async fn store_with_endpoint() -> Result<(DomainStore, String, EndpointRecord), DomainStoreError>
    {
        let store = DomainStore::from_config(&Config::for_tests());
        let project = store
            .create_project(
                "user-1",
                CreateProjectInput {
                    name: "Serving".to_string(),
                    description: None,
                    project_type: ProjectType::FineTune,
                    tags: Vec::new(),
                    aws_region: None,
                    s3_bucket: None,
                },
            )
            .await?;
        let endpoint = store
            .create_endpoint(
                "user-1",
                &project.id,
                CreateEndpointInput {
                    training_run_id: "run-1".to_string(),
                    name: "chat-prod".to_string(),
                    instance_type: None,
                    instance_count: None,
                    auto_scaling: false,
                },
            )
            .await?;
        Ok((store, project.id, endpoint))
    }

    fn invoke_input(messages: Vec<ChatMessage>) -> InvokeEndpointInput {
        InvokeEndpointInput {
            messages,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }

    fn user_message(content: &str) -> ChatMessage {
        ChatMessage {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn status_uses_compact_wire_values() -> Result<(), serde_json::Error> {
        assert_eq!(
            serde_json::to_value(EndpointStatus::InService)?,
            serde_json::json!("inservice")
        );
        let parsed: EndpointStatus = serde_json::from_value(serde_json::json!("creating"))?;
        assert_eq!(parsed, EndpointStatus::Creating);
        Ok(())
    }

    #[tokio::test]
    async fn create_applies_defaults() -> Result<(), DomainStoreError> {
        let (_, _, endpoint) = store_with_endpoint().await?;

        assert_eq!(endpoint.status, EndpointStatus::Creating);
        assert_eq!(endpoint.instance_type, "ml.g5.xlarge");
        assert_eq!(endpoint.instance_count, 1);
        assert!(!endpoint.auto_scaling);
        assert!(endpoint.endpoint_url.is_none());
        assert_eq!(
            endpoint.sagemaker_endpoint_name,
            format!("llm-toolkit-{}", &endpoint.id[..8])
        );
        Ok(())
    }

    #[tokio::test]
    async fn invoking_endpoint_that_is_not_in_service_fails() -> Result<(), DomainStoreError> {
        let (store, project_id, endpoint) = store_with_endpoint().await?;

        let result = store
            .invoke_endpoint(
                "user-1",
                &project_id,
                &endpoint.id,
                invoke_input(vec![user_message("hello")]),
            )
            .await;
        assert!(matches!(result, Err(DomainStoreError::InvalidState { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn in_service_endpoint_echoes_truncated_prompt() -> Result<(), DomainStoreError> {
        let (store, project_id, endpoint) = store_with_endpoint().await?;
        store
            .update_endpoint(
                "user-1",
                &project_id,
                &endpoint.id,
                UpdateEndpointInput {
                    status: Some(EndpointStatus::InService),
                    ..UpdateEndpointInput::default()
                },
            )
            .await?;

        let long_prompt = "x".repeat(80);
        let result = store
            .invoke_endpoint(
                "user-1",
                &project_id,
                &endpoint.id,
                invoke_input(vec![user_message("ignored"), user_message(&long_prompt)]),
            )
            .await?;

        assert_eq!(
            result.response,
            format!("This is a mock response to: {}...", "x".repeat(50))
        );
        assert_eq!(result.usage.total_tokens, 150);
        Ok(())
    }

    #[test]
    fn empty_conversation_uses_empty_prefix() {
        let result = mock_completion(&[]);
        assert_eq!(result.response, "This is a mock response to: ...");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let prompt = "é".repeat(60);
        let result = mock_completion(&[user_message(&prompt)]);
        assert_eq!(
            result.response,
            format!("This is a mock response to: {}...", "é".repeat(50))
        );
    }

    #[tokio::test]
    async fn patch_updates_allowed_fields_and_rejects_zero_instances()
    -> Result<(), DomainStoreError> {
        let (store, project_id, endpoint) = store_with_endpoint().await?;

        let updated = store
            .update_endpoint(
                "user-1",
                &project_id,
                &endpoint.id,
                UpdateEndpointInput {
                    name: Some("chat-canary".to_string()),
                    instance_count: Some(3),
                    auto_scaling: Some(true),
                    status: None,
                },
            )
            .await?;
        assert_eq!(updated.name, "chat-canary");
        assert_eq!(updated.instance_count, 3);
        assert!(updated.auto_scaling);
        assert_eq!(updated.status, EndpointStatus::Creating);
        assert_eq!(updated.training_run_id, endpoint.training_run_id);

        let rejected = store
            .update_endpoint(
                "user-1",
                &project_id,
                &endpoint.id,
                UpdateEndpointInput {
                    instance_count: Some(0),
                    ..UpdateEndpointInput::default()
                },
            )
            .await;
        assert!(matches!(
            rejected,
            Err(DomainStoreError::Validation {
                field: "instance_count",
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_endpoint() -> Result<(), DomainStoreError> {
        let (store, project_id, endpoint) = store_with_endpoint().await?;
        store
            .delete_endpoint("user-1", &project_id, &endpoint.id)
            .await?;
        assert!(store.list_endpoints("user-1", &project_id).await?.is_empty());
        Ok(())
    }
}
