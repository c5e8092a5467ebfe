use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain_store::{
    DomainStore, DomainStoreError, ScopedRecord, normalize_non_empty, normalize_optional_string,
    normalize_string_vec, short_id,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    FineTune,
    DeepResearch,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub tags: Vec<String>,
    pub aws_region: String,
    pub s3_bucket: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopedRecord for ProjectRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope_id(&self) -> &str {
        &self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub s3_bucket: Option<String>,
}

/// Only `name`, `description` and `tags` are patchable. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: Option<usize>, page_size: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectPage {
    pub items: Vec<ProjectRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

impl DomainStore {
    pub async fn list_projects(&self, user_id: &str, page: PageRequest) -> ProjectPage {
        let projects = self.projects.list(user_id).await;
        let total = projects.len();
        let start = (page.page - 1).saturating_mul(page.page_size);
        let end = start.saturating_add(page.page_size);
        let items = projects
            .into_iter()
            .skip(start)
            .take(page.page_size)
            .collect();

        ProjectPage {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
            has_more: end < total,
        }
    }

    pub async fn create_project(
        &self,
        user_id: &str,
        input: CreateProjectInput,
    ) -> Result<ProjectRecord, DomainStoreError> {
        let name = normalize_non_empty(&input.name, "name")?;
        let id = Uuid::new_v4().to_string();
        let s3_bucket = normalize_optional_string(input.s3_bucket.as_deref()).unwrap_or_else(|| {
            format!(
                "{}-{}-{}",
                self.naming.bucket_prefix,
                short_id(user_id),
                short_id(&id)
            )
        });
        let now = Utc::now();

        let project = ProjectRecord {
            id,
            user_id: user_id.to_string(),
            name,
            description: normalize_optional_string(input.description.as_deref()),
            project_type: input.project_type,
            tags: normalize_string_vec(input.tags),
            aws_region: normalize_optional_string(input.aws_region.as_deref())
                .unwrap_or_else(|| self.naming.default_region.clone()),
            s3_bucket,
            created_at: now,
            updated_at: now,
        };

        Ok(self.projects.insert(project).await)
    }

    pub async fn get_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<ProjectRecord, DomainStoreError> {
        self.projects.get(user_id, project_id).await
    }

    pub async fn update_project(
        &self,
        user_id: &str,
        project_id: &str,
        input: UpdateProjectInput,
    ) -> Result<ProjectRecord, DomainStoreError> {
        let name = input
            .name
            .as_deref()
            .map(|value| normalize_non_empty(value, "name"))
            .transpose()?;
        let description = input.description;
        let tags = input.tags.map(normalize_string_vec);

        self.projects
            .update(
                user_id,
                project_id,
                Box::new(move |project: &mut ProjectRecord| {
                    if let Some(name) = name {
                        project.name = name;
                    }
                    if let Some(description) = description {
                        project.description = normalize_optional_string(Some(&description));
                    }
                    if let Some(tags) = tags {
                        project.tags = tags;
                    }
                    project.updated_at = Utc::now();
                }),
            )
            .await
    }

    /// Removes the project row only. Child datasets, runs, endpoints and
    /// research sessions stay in their tables.
    pub async fn delete_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<(), DomainStoreError> {
        self.projects.remove(user_id, project_id).await.map(|_| ())
    }
}
