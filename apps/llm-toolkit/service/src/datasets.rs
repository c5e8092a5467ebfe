use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain_store::{DomainStore, DomainStoreError, ScopedRecord, normalize_non_empty};

const MOCK_ROW_COUNT: u64 = 2547;
const MOCK_ESTIMATED_TOKENS: u64 = 1_250_000;
const MOCK_TRUNCATION_WARNING: &str = "15 rows exceed 2048 tokens and will be truncated";
const MOCK_DETECTED_COLUMNS: [&str; 3] = ["instruction", "input", "output"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    Jsonl,
    Csv,
}

impl DatasetFormat {
    pub fn from_file_name(file_name: &str) -> Self {
        if file_name.ends_with(".jsonl") {
            Self::Jsonl
        } else {
            Self::Csv
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatasetRecord {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub file_name: String,
    pub s3_uri: String,
    pub format: DatasetFormat,
    pub row_count: u64,
    pub column_mapping: Map<String, Value>,
    pub validation_status: String,
    pub validation_errors: Vec<String>,
    pub estimated_tokens: u64,
    pub created_at: DateTime<Utc>,
}

impl ScopedRecord for DatasetRecord {
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

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatasetValidation {
    pub is_valid: bool,
    pub total_rows: u64,
    pub estimated_tokens: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub detected_columns: Vec<String>,
}

fn dataset_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

impl DomainStore {
    pub async fn list_datasets(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Vec<DatasetRecord>, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        Ok(self.datasets.list(project_id).await)
    }

    /// Registers an uploaded file. Contents are not inspected.
    pub async fn upload_dataset(
        &self,
        user_id: &str,
        project_id: &str,
        file_name: &str,
    ) -> Result<DatasetRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        let file_name = normalize_non_empty(file_name, "file")?;
        let id = Uuid::new_v4().to_string();

        let dataset = DatasetRecord {
            s3_uri: format!(
                "s3://{}/{project_id}/{id}/{file_name}",
                self.naming.dataset_bucket
            ),
            id,
            project_id: project_id.to_string(),
            name: dataset_name(&file_name),
            format: DatasetFormat::from_file_name(&file_name),
            file_name,
            row_count: MOCK_ROW_COUNT,
            column_mapping: Map::new(),
            validation_status: "valid".to_string(),
            validation_errors: Vec::new(),
            estimated_tokens: MOCK_ESTIMATED_TOKENS,
            created_at: Utc::now(),
        };

        Ok(self.datasets.insert(dataset).await)
    }

    pub async fn get_dataset(
        &self,
        user_id: &str,
        project_id: &str,
        dataset_id: &str,
    ) -> Result<DatasetRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.datasets.get(project_id, dataset_id).await
    }

    pub async fn validate_dataset(
        &self,
        user_id: &str,
        project_id: &str,
        dataset_id: &str,
    ) -> Result<DatasetValidation, DomainStoreError> {
        let dataset = self.get_dataset(user_id, project_id, dataset_id).await?;

        Ok(DatasetValidation {
            is_valid: true,
            total_rows: dataset.row_count,
            estimated_tokens: dataset.estimated_tokens,
            errors: Vec::new(),
            warnings: vec![MOCK_TRUNCATION_WARNING.to_string()],
            detected_columns: MOCK_DETECTED_COLUMNS
                .iter()
                .map(ToString::to_string)
                .collect(),
        })
    }

    /// Replaces the column mapping wholesale.
    pub async fn update_dataset_mapping(
        &self,
        user_id: &str,
        project_id: &str,
        dataset_id: &str,
        mapping: Map<String, Value>,
    ) -> Result<DatasetRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.datasets
            .update(
                project_id,
                dataset_id,
                Box::new(move |dataset: &mut DatasetRecord| dataset.column_mapping = mapping),
            )
            .await
    }

    pub async fn delete_dataset(
        &self,
        user_id: &str,
        project_id: &str,
        dataset_id: &str,
    ) -> Result<(), DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.datasets.remove(project_id, dataset_id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::projects::{CreateProjectInput, ProjectType};

    async fn store_with_project(user_id: &str) -> Result<(DomainStore, String), DomainStoreError> {
        let store = DomainStore::from_config(&Config::for_tests());
        let project = store
            .create_project(
                user_id,
                CreateProjectInput {
                    name: "Datasets".to_string(),
                    description: None,
                    project_type: ProjectType::FineTune,
                    tags: Vec::new(),
                    aws_region: None,
                    s3_bucket: None,
                },
            )
            .await?;
        Ok((store, project.id))
    }

    #[test]
    fn format_and_name_follow_file_name() {
        assert_eq!(DatasetFormat::from_file_name("train.jsonl"), DatasetFormat::Jsonl);
        assert_eq!(DatasetFormat::from_file_name("train.csv"), DatasetFormat::Csv);
        assert_eq!(DatasetFormat::from_file_name("train.json"), DatasetFormat::Csv);
        assert_eq!(dataset_name("support.v2.jsonl"), "support.v2");
        assert_eq!(dataset_name("README"), "README");
    }

    #[tokio::test]
    async fn upload_records_mock_statistics() -> Result<(), DomainStoreError> {
        let (store, project_id) = store_with_project("user-1").await?;
        let dataset = store
            .upload_dataset("user-1", &project_id, "chats.jsonl")
            .await?;

        assert_eq!(dataset.name, "chats");
        assert_eq!(dataset.format, DatasetFormat::Jsonl);
        assert_eq!(dataset.row_count, 2547);
        assert_eq!(dataset.estimated_tokens, 1_250_000);
        assert_eq!(dataset.validation_status, "valid");
        assert_eq!(
            dataset.s3_uri,
            format!(
                "s3://llm-toolkit-datasets/{project_id}/{}/chats.jsonl",
                dataset.id
            )
        );
        Ok(())
    }

    #[tokio::test]
    async fn list_returns_only_the_projects_datasets() -> Result<(), DomainStoreError> {
        let (store, first) = store_with_project("user-1").await?;
        let second = store
            .create_project(
                "user-1",
                CreateProjectInput {
                    name: "Other".to_string(),
                    description: None,
                    project_type: ProjectType::FineTune,
                    tags: Vec::new(),
                    aws_region: None,
                    s3_bucket: None,
                },
            )
            .await?
            .id;

        let mine = store.upload_dataset("user-1", &first, "a.csv").await?;
        store.upload_dataset("user-1", &second, "b.csv").await?;

        let listed = store.list_datasets("user-1", &first).await?;
        assert_eq!(listed, vec![mine]);
        Ok(())
    }

    #[tokio::test]
    async fn foreign_project_hides_datasets() -> Result<(), DomainStoreError> {
        let (store, project_id) = store_with_project("user-1").await?;
        let dataset = store.upload_dataset("user-1", &project_id, "a.csv").await?;

        assert_eq!(
            store.get_dataset("user-2", &project_id, &dataset.id).await,
            Err(DomainStoreError::NotFound {
                resource: "Project"
            })
        );
        assert!(store.list_datasets("user-2", &project_id).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn mapping_patch_replaces_whole_mapping() -> Result<(), DomainStoreError> {
        let (store, project_id) = store_with_project("user-1").await?;
        let dataset = store.upload_dataset("user-1", &project_id, "a.csv").await?;

        let mut first = Map::new();
        first.insert("prompt".to_string(), json!("instruction"));
        first.insert("answer".to_string(), json!("output"));
        store
            .update_dataset_mapping("user-1", &project_id, &dataset.id, first)
            .await?;

        let mut second = Map::new();
        second.insert("question".to_string(), json!("input"));
        let updated = store
            .update_dataset_mapping("user-1", &project_id, &dataset.id, second.clone())
            .await?;
        assert_eq!(updated.column_mapping, second);
        Ok(())
    }

    #[tokio::test]
    async fn validation_is_canned_and_delete_removes() -> Result<(), DomainStoreError> {
        let (store, project_id) = store_with_project("user-1").await?;
        let dataset = store.upload_dataset("user-1", &project_id, "a.csv").await?;

        let report = store
            .validate_dataset("user-1", &project_id, &dataset.id)
            .await?;
        assert!(report.is_valid);
        assert_eq!(report.total_rows, 2547);
        assert_eq!(report.detected_columns, vec!["instruction", "input", "output"]);

        store
            .delete_dataset("user-1", &project_id, &dataset.id)
            .await?;
        assert_eq!(
            store.get_dataset("user-1", &project_id, &dataset.id).await,
            Err(DomainStoreError::NotFound {
                resource: "Dataset"
            })
        );
        Ok(())
    }
}
