use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain_store::{
    DomainStore, DomainStoreError, ScopedRecord, normalize_non_empty, normalize_optional_string,
    short_id,
};

const DEFAULT_TRAINING_INSTANCE: &str = "ml.g5.2xlarge";
const MOCK_ESTIMATED_COST: f64 = 15.50;

const MOCK_LOG_LINES: [(&str, &str); 3] = [
    ("2024-01-15T10:00:00Z", "Starting training job..."),
    ("2024-01-15T10:00:05Z", "Loading model weights..."),
    ("2024-01-15T10:01:00Z", "Training started. Epoch 1/3"),
];

const MOCK_LOSS_HISTORY: [(u64, f64, f64); 3] = [(100, 2.5, 2.6), (200, 1.8, 1.9), (300, 1.2, 1.4)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FineTuneType {
    Full,
    Lora,
    Qlora,
}

impl FineTuneType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Lora => "lora",
            Self::Qlora => "qlora",
        }
    }
}

/// Full wire vocabulary; the mock only ever moves runs to `starting` and
/// `stopping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: u32,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub warmup_ratio: f64,
    pub gradient_checkpointing: bool,
    pub packing: bool,
    pub fine_tune_type: FineTuneType,
    pub lora_rank: Option<u32>,
    pub lora_alpha: Option<u32>,
    pub quantization_bits: Option<u8>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 3,
            learning_rate: 0.0001,
            batch_size: 4,
            warmup_ratio: 0.1,
            gradient_checkpointing: true,
            packing: false,
            fine_tune_type: FineTuneType::Lora,
            lora_rank: Some(16),
            lora_alpha: Some(32),
            quantization_bits: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingMetrics {
    pub current_epoch: u32,
    pub total_epochs: u32,
    pub current_step: u64,
    pub total_steps: u64,
    pub train_loss: Option<f64>,
    pub eval_loss: Option<f64>,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingArtifacts {
    pub model_artifacts_s3: String,
    pub logs_s3: String,
    pub checkpoints_s3: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRunRecord {
    pub id: String,
    pub project_id: String,
    pub model_id: String,
    pub dataset_id: String,
    pub sagemaker_job_name: String,
    pub status: TrainingStatus,
    pub config: TrainingConfig,
    pub metrics: TrainingMetrics,
    pub artifacts: TrainingArtifacts,
    pub instance_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_cost: f64,
}

impl ScopedRecord for TrainingRunRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope_id(&self) -> &str {
        &self.project_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTrainingRunInput {
    pub model_id: String,
    pub dataset_id: String,
    #[serde(default)]
    pub config: TrainingConfig,
    #[serde(default)]
    pub instance_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrainingLogEntry {
    pub timestamp: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrainingLogs {
    pub logs: Vec<TrainingLogEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LossPoint {
    pub step: u64,
    pub train_loss: f64,
    pub eval_loss: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrainingMetricsHistory {
    pub loss_history: Vec<LossPoint>,
}

impl DomainStore {
    pub async fn list_training_runs(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Vec<TrainingRunRecord>, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        Ok(self.training_runs.list(project_id).await)
    }

    /// Records a run in `starting`. Nothing is scheduled.
    pub async fn start_training_run(
        &self,
        user_id: &str,
        project_id: &str,
        input: CreateTrainingRunInput,
    ) -> Result<TrainingRunRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        let model_id = normalize_non_empty(&input.model_id, "model_id")?;
        let dataset_id = normalize_non_empty(&input.dataset_id, "dataset_id")?;
        if input.config.epochs == 0 {
            return Err(DomainStoreError::Validation {
                field: "config.epochs",
                message: "must be at least 1".to_string(),
            });
        }

        let id = Uuid::new_v4().to_string();
        let artifact_root = format!("s3://{}/{project_id}/{id}", self.naming.artifact_bucket);
        let config = input.config;

        let run = TrainingRunRecord {
            sagemaker_job_name: format!("{}-{}", self.naming.bucket_prefix, short_id(&id)),
            id,
            project_id: project_id.to_string(),
            model_id,
            dataset_id,
            status: TrainingStatus::Starting,
            metrics: TrainingMetrics {
                current_epoch: 0,
                total_epochs: config.epochs,
                current_step: 0,
                total_steps: 0,
                train_loss: None,
                eval_loss: None,
                learning_rate: config.learning_rate,
            },
            config,
            artifacts: TrainingArtifacts {
                model_artifacts_s3: format!("{artifact_root}/model"),
                logs_s3: format!("{artifact_root}/logs"),
                checkpoints_s3: format!("{artifact_root}/checkpoints"),
            },
            instance_type: normalize_optional_string(input.instance_type.as_deref())
                .unwrap_or_else(|| DEFAULT_TRAINING_INSTANCE.to_string()),
            started_at: Utc::now(),
            completed_at: None,
            estimated_cost: MOCK_ESTIMATED_COST,
        };

        Ok(self.training_runs.insert(run).await)
    }

    pub async fn get_training_run(
        &self,
        user_id: &str,
        project_id: &str,
        run_id: &str,
    ) -> Result<TrainingRunRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.training_runs.get(project_id, run_id).await
    }

    pub async fn training_logs(
        &self,
        user_id: &str,
        project_id: &str,
        run_id: &str,
    ) -> Result<TrainingLogs, DomainStoreError> {
        self.get_training_run(user_id, project_id, run_id).await?;

        Ok(TrainingLogs {
            logs: MOCK_LOG_LINES
                .iter()
                .map(|(timestamp, message)| TrainingLogEntry {
                    timestamp: (*timestamp).to_string(),
                    message: (*message).to_string(),
                })
                .collect(),
        })
    }

    pub async fn training_metrics(
        &self,
        user_id: &str,
        project_id: &str,
        run_id: &str,
    ) -> Result<TrainingMetricsHistory, DomainStoreError> {
        self.get_training_run(user_id, project_id, run_id).await?;

        Ok(TrainingMetricsHistory {
            loss_history: MOCK_LOSS_HISTORY
                .iter()
                .map(|&(step, train_loss, eval_loss)| LossPoint {
                    step,
                    train_loss,
                    eval_loss,
                })
                .collect(),
        })
    }

    /// Flags the run as `stopping`; there is no transition check.
    pub async fn stop_training_run(
        &self,
        user_id: &str,
        project_id: &str,
        run_id: &str,
    ) -> Result<TrainingRunRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.training_runs
            .update(
                project_id,
                run_id,
                Box::new(|run: &mut TrainingRunRecord| run.status = TrainingStatus::Stopping),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::projects::{CreateProjectInput, ProjectType};

    async fn store_with_project() -> Result<(DomainStore, String), DomainStoreError> {
        let store = DomainStore::from_config(&Config::for_tests());
        let project = store
            .create_project(
                "user-1",
                CreateProjectInput {
                    name: "Training".to_string(),
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

    fn run_input(config: TrainingConfig) -> CreateTrainingRunInput {
        CreateTrainingRunInput {
            model_id: "mistral-7b-v02".to_string(),
            dataset_id: "ds-1".to_string(),
            config,
            instance_type: None,
        }
    }

    #[test]
    fn config_defaults_fill_missing_fields() -> Result<(), serde_json::Error> {
        let config: TrainingConfig = serde_json::from_value(serde_json::json!({
            "epochs": 5,
            "fine_tune_type": "qlora"
        }))?;

        assert_eq!(config.epochs, 5);
        assert_eq!(config.fine_tune_type, FineTuneType::Qlora);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.lora_rank, Some(16));
        assert!(config.gradient_checkpointing);
        assert!(!config.packing);
        Ok(())
    }

    #[tokio::test]
    async fn start_seeds_metrics_from_config() -> Result<(), DomainStoreError> {
        let (store, project_id) = store_with_project().await?;
        let config = TrainingConfig {
            epochs: 7,
            learning_rate: 0.0002,
            ..TrainingConfig::default()
        };

        let run = store
            .start_training_run("user-1", &project_id, run_input(config))
            .await?;

        assert_eq!(run.status, TrainingStatus::Starting);
        assert_eq!(run.metrics.total_epochs, 7);
        assert_eq!(run.metrics.current_epoch, 0);
        assert!((run.metrics.learning_rate - 0.0002).abs() < f64::EPSILON);
        assert_eq!(run.metrics.train_loss, None);
        assert_eq!(run.instance_type, "ml.g5.2xlarge");
        assert_eq!(run.sagemaker_job_name, format!("llm-toolkit-{}", &run.id[..8]));
        assert_eq!(
            run.artifacts.checkpoints_s3,
            format!("s3://llm-toolkit-artifacts/{project_id}/{}/checkpoints", run.id)
        );
        assert!((run.estimated_cost - 15.5).abs() < f64::EPSILON);
        assert!(run.completed_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn stop_sets_stopping_without_other_changes() -> Result<(), DomainStoreError> {
        let (store, project_id) = store_with_project().await?;
        let run = store
            .start_training_run("user-1", &project_id, run_input(TrainingConfig::default()))
            .await?;

        let stopped = store
            .stop_training_run("user-1", &project_id, &run.id)
            .await?;
        assert_eq!(stopped.status, TrainingStatus::Stopping);
        assert_eq!(stopped.metrics, run.metrics);
        Ok(())
    }

    #[tokio::test]
    async fn logs_and_metrics_require_existing_run() -> Result<(), DomainStoreError> {
        let (store, project_id) = store_with_project().await?;
        let run = store
            .start_training_run("user-1", &project_id, run_input(TrainingConfig::default()))
            .await?;

        let logs = store.training_logs("user-1", &project_id, &run.id).await?;
        assert_eq!(logs.logs.len(), 3);
        assert_eq!(logs.logs[0].message, "Starting training job...");

        let metrics = store
            .training_metrics("user-1", &project_id, &run.id)
            .await?;
        let steps: Vec<u64> = metrics.loss_history.iter().map(|point| point.step).collect();
        assert_eq!(steps, vec![100, 200, 300]);

        assert_eq!(
            store.training_logs("user-1", &project_id, "missing").await,
            Err(DomainStoreError::NotFound {
                resource: "Training run"
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn zero_epochs_is_rejected() -> Result<(), DomainStoreError> {
        let (store, project_id) = store_with_project().await?;
        let config = TrainingConfig {
            epochs: 0,
            ..TrainingConfig::default()
        };

        let result = store
            .start_training_run("user-1", &project_id, run_input(config))
            .await;
        assert!(matches!(
            result,
            Err(DomainStoreError::Validation {
                field: "config.epochs",
                ..
            })
        ));
        Ok(())
    }
}
