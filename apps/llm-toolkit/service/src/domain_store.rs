use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::datasets::DatasetRecord;
use crate::endpoints::EndpointRecord;
use crate::projects::ProjectRecord;
use crate::research::ResearchSessionRecord;
use crate::training::TrainingRunRecord;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainStoreError {
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{message}")]
    InvalidState { message: String },
}

/// A row that lives under exactly one owner scope: a user for projects, a
/// project for everything else.
pub trait ScopedRecord: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn scope_id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;
}

pub type RecordPatch<R> = Box<dyn FnOnce(&mut R) + Send>;

#[async_trait]
pub trait ScopedRepository<R: ScopedRecord>: Send + Sync {
    /// Every row in `scope_id`, newest first.
    async fn list(&self, scope_id: &str) -> Vec<R>;

    /// Absent rows and rows owned by another scope are both `NotFound`.
    async fn get(&self, scope_id: &str, id: &str) -> Result<R, DomainStoreError>;

    async fn insert(&self, record: R) -> R;

    async fn update(
        &self,
        scope_id: &str,
        id: &str,
        patch: RecordPatch<R>,
    ) -> Result<R, DomainStoreError>;

    async fn remove(&self, scope_id: &str, id: &str) -> Result<R, DomainStoreError>;
}

pub struct InMemoryTable<R> {
    resource: &'static str,
    rows: Arc<RwLock<HashMap<String, R>>>,
}

impl<R> InMemoryTable<R> {
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<R> Clone for InMemoryTable<R> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource,
            rows: Arc::clone(&self.rows),
        }
    }
}

fn scoped_row_mut<'a, R: ScopedRecord>(
    rows: &'a mut HashMap<String, R>,
    resource: &'static str,
    scope_id: &str,
    id: &str,
) -> Result<&'a mut R, DomainStoreError> {
    rows.get_mut(id)
        .filter(|row| row.scope_id() == scope_id)
        .ok_or(DomainStoreError::NotFound { resource })
}

#[async_trait]
impl<R: ScopedRecord> ScopedRepository<R> for InMemoryTable<R> {
    async fn list(&self, scope_id: &str) -> Vec<R> {
        let rows = self.rows.read().await;
        let mut scoped: Vec<R> = rows
            .values()
            .filter(|row| row.scope_id() == scope_id)
            .cloned()
            .collect();
        scoped.sort_by(|left, right| {
            right
                .created_at()
                .cmp(&left.created_at())
                .then_with(|| left.id().cmp(right.id()))
        });
        scoped
    }

    async fn get(&self, scope_id: &str, id: &str) -> Result<R, DomainStoreError> {
        let rows = self.rows.read().await;
        rows.get(id)
            .filter(|row| row.scope_id() == scope_id)
            .cloned()
            .ok_or(DomainStoreError::NotFound {
                resource: self.resource,
            })
    }

    async fn insert(&self, record: R) -> R {
        let mut rows = self.rows.write().await;
        rows.insert(record.id().to_string(), record.clone());
        tracing::info!(
            target: "llm_toolkit.domain_store",
            resource = self.resource,
            id = record.id(),
            scope_id = record.scope_id(),
            "record created"
        );
        record
    }

    async fn update(
        &self,
        scope_id: &str,
        id: &str,
        patch: RecordPatch<R>,
    ) -> Result<R, DomainStoreError> {
        let mut rows = self.rows.write().await;
        let row = scoped_row_mut(&mut rows, self.resource, scope_id, id)?;
        patch(row);
        tracing::debug!(
            target: "llm_toolkit.domain_store",
            resource = self.resource,
            id,
            "record updated"
        );
        Ok(row.clone())
    }

    async fn remove(&self, scope_id: &str, id: &str) -> Result<R, DomainStoreError> {
        let mut rows = self.rows.write().await;
        scoped_row_mut(&mut rows, self.resource, scope_id, id)?;
        let removed = rows.remove(id).ok_or(DomainStoreError::NotFound {
            resource: self.resource,
        })?;
        tracing::info!(
            target: "llm_toolkit.domain_store",
            resource = self.resource,
            id,
            "record deleted"
        );
        Ok(removed)
    }
}

/// Naming for the synthetic cloud references handed out on create.
#[derive(Debug, Clone)]
pub struct StorageNaming {
    pub default_region: String,
    pub bucket_prefix: String,
    pub dataset_bucket: String,
    pub artifact_bucket: String,
}

#[derive(Clone)]
pub struct DomainStore {
    pub(crate) naming: StorageNaming,
    pub(crate) projects: Arc<dyn ScopedRepository<ProjectRecord>>,
    pub(crate) datasets: Arc<dyn ScopedRepository<DatasetRecord>>,
    pub(crate) training_runs: Arc<dyn ScopedRepository<TrainingRunRecord>>,
    pub(crate) endpoints: Arc<dyn ScopedRepository<EndpointRecord>>,
    pub(crate) research_sessions: Arc<dyn ScopedRepository<ResearchSessionRecord>>,
}

impl DomainStore {
    pub fn from_config(config: &Config) -> Self {
        Self {
            naming: StorageNaming {
                default_region: config.default_region.clone(),
                bucket_prefix: config.bucket_prefix.clone(),
                dataset_bucket: config.dataset_bucket.clone(),
                artifact_bucket: config.artifact_bucket.clone(),
            },
            projects: Arc::new(InMemoryTable::new("Project")),
            datasets: Arc::new(InMemoryTable::new("Dataset")),
            training_runs: Arc::new(InMemoryTable::new("Training run")),
            endpoints: Arc::new(InMemoryTable::new("Endpoint")),
            research_sessions: Arc::new(InMemoryTable::new("Research session")),
        }
    }

    /// Gate for every nested resource: the project must belong to `user_id`.
    pub(crate) async fn owned_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<ProjectRecord, DomainStoreError> {
        self.projects.get(user_id, project_id).await
    }
}

pub(crate) fn normalize_non_empty(
    value: &str,
    field: &'static str,
) -> Result<String, DomainStoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainStoreError::Validation {
            field,
            message: "value is required".to_string(),
        });
    }

    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_string(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn normalize_string_vec(values: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !normalized.iter().any(|existing| existing == trimmed) {
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}

/// First eight characters of a generated id, used in synthetic resource names.
pub(crate) fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(index, _)| &id[..index])
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: String,
        owner: String,
        body: String,
        created_at: DateTime<Utc>,
    }

    impl ScopedRecord for Note {
        fn id(&self) -> &str {
            &self.id
        }

        fn scope_id(&self) -> &str {
            &self.owner
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
    }

    fn note(id: &str, owner: &str, age_minutes: i64) -> Note {
        Note {
            id: id.to_string(),
            owner: owner.to_string(),
            body: format!("note {id}"),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn list_is_scoped_and_newest_first() {
        let table = InMemoryTable::new("Note");
        table.insert(note("n1", "alice", 30)).await;
        table.insert(note("n2", "bob", 20)).await;
        table.insert(note("n3", "alice", 10)).await;

        let ids: Vec<String> = table
            .list("alice")
            .await
            .into_iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec!["n3", "n1"]);
    }

    #[tokio::test]
    async fn cross_scope_access_looks_like_absence() {
        let table = InMemoryTable::new("Note");
        table.insert(note("n1", "alice", 0)).await;

        let foreign = table.get("bob", "n1").await;
        let missing = table.get("alice", "n404").await;
        assert_eq!(foreign, Err(DomainStoreError::NotFound { resource: "Note" }));
        assert_eq!(foreign, missing);

        let update = table
            .update("bob", "n1", Box::new(|row: &mut Note| row.body.clear()))
            .await;
        assert!(update.is_err());
        assert!(table.remove("bob", "n1").await.is_err());
        assert_eq!(
            table.get("alice", "n1").await.map(|row| row.body),
            Ok("note n1".to_string())
        );
    }

    #[tokio::test]
    async fn update_and_remove_apply_within_scope() {
        let table = InMemoryTable::new("Note");
        table.insert(note("n1", "alice", 0)).await;

        let updated = table
            .update(
                "alice",
                "n1",
                Box::new(|row: &mut Note| row.body = "edited".to_string()),
            )
            .await;
        assert_eq!(updated.map(|row| row.body), Ok("edited".to_string()));

        assert!(table.remove("alice", "n1").await.is_ok());
        assert!(table.get("alice", "n1").await.is_err());
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        #[derive(Debug, Clone)]
        struct Counter {
            id: String,
            hits: u32,
            created_at: DateTime<Utc>,
        }

        impl ScopedRecord for Counter {
            fn id(&self) -> &str {
                &self.id
            }

            fn scope_id(&self) -> &str {
                "scope"
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }

        let table = InMemoryTable::new("Counter");
        table
            .insert(Counter {
                id: "c1".to_string(),
                hits: 0,
                created_at: Utc::now(),
            })
            .await;

        let mut handles = Vec::new();
        for _ in 0..32 {
            let table = table.clone();
            handles.push(tokio::spawn(async move {
                table
                    .update("scope", "c1", Box::new(|row: &mut Counter| row.hits += 1))
                    .await
                    .is_ok()
            }));
        }
        for handle in handles {
            assert!(matches!(handle.await, Ok(true)));
        }

        assert_eq!(table.get("scope", "c1").await.map(|row| row.hits), Ok(32));
    }

    #[test]
    fn short_id_takes_eight_chars() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn normalize_string_vec_trims_and_dedupes() {
        let tags = normalize_string_vec(vec![
            " chat ".to_string(),
            String::new(),
            "chat".to_string(),
            "code".to_string(),
        ]);
        assert_eq!(tags, vec!["chat", "code"]);
    }
}
