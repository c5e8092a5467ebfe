use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain_store::{
    DomainStore, DomainStoreError, ScopedRecord, normalize_non_empty, normalize_string_vec,
};

const STREAM_NOTICE: &str = "Use WebSocket connection for real-time updates";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResearchDepth {
    #[default]
    Quick,
    InDepth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Bullets,
    Report,
    Faq,
    ProsCons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchStatus {
    Running,
    Completed,
    Stopped,
    Failed,
}

/// Sessions are seeded with a single `search` step; the other kinds are
/// wire vocabulary only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchStepKind {
    Search,
    Browse,
    Synthesize,
}

/// Wire shape of a cited source. The mock never collects any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchSource {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchStep {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResearchStepKind,
    pub status: ResearchStatus,
    pub query: Option<String>,
    pub sources: Vec<ResearchSource>,
    pub synthesis: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchSessionRecord {
    pub id: String,
    pub project_id: String,
    pub question: String,
    pub status: ResearchStatus,
    pub depth: ResearchDepth,
    pub output_format: OutputFormat,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub steps: Vec<ResearchStep>,
    pub final_report: Option<String>,
    pub sources: Vec<ResearchSource>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScopedRecord for ResearchSessionRecord {
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
pub struct CreateResearchSessionInput {
    pub question: String,
    #[serde(default)]
    pub depth: ResearchDepth,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub include_domains: Vec<String>,
    #[serde(default)]
    pub exclude_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchStreamNotice {
    pub message: &'static str,
    pub session: ResearchSessionRecord,
}

impl DomainStore {
    pub async fn list_research_sessions(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Vec<ResearchSessionRecord>, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        Ok(self.research_sessions.list(project_id).await)
    }

    /// Opens a session with a single running search step for the question.
    pub async fn create_research_session(
        &self,
        user_id: &str,
        project_id: &str,
        input: CreateResearchSessionInput,
    ) -> Result<ResearchSessionRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        let question = normalize_non_empty(&input.question, "question")?;
        let now = Utc::now();

        let first_step = ResearchStep {
            id: Uuid::new_v4().to_string(),
            kind: ResearchStepKind::Search,
            status: ResearchStatus::Running,
            query: Some(question.clone()),
            sources: Vec::new(),
            synthesis: None,
            started_at: now,
            completed_at: None,
        };

        let session = ResearchSessionRecord {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            question,
            status: ResearchStatus::Running,
            depth: input.depth,
            output_format: input.output_format,
            include_domains: normalize_string_vec(input.include_domains),
            exclude_domains: normalize_string_vec(input.exclude_domains),
            steps: vec![first_step],
            final_report: None,
            sources: Vec::new(),
            created_at: now,
            completed_at: None,
        };

        Ok(self.research_sessions.insert(session).await)
    }

    pub async fn get_research_session(
        &self,
        user_id: &str,
        project_id: &str,
        session_id: &str,
    ) -> Result<ResearchSessionRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.research_sessions.get(project_id, session_id).await
    }

    pub async fn research_stream_notice(
        &self,
        user_id: &str,
        project_id: &str,
        session_id: &str,
    ) -> Result<ResearchStreamNotice, DomainStoreError> {
        let session = self
            .get_research_session(user_id, project_id, session_id)
            .await?;
        Ok(ResearchStreamNotice {
            message: STREAM_NOTICE,
            session,
        })
    }

    pub async fn stop_research_session(
        &self,
        user_id: &str,
        project_id: &str,
        session_id: &str,
    ) -> Result<ResearchSessionRecord, DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.research_sessions
            .update(
                project_id,
                session_id,
                Box::new(|session: &mut ResearchSessionRecord| {
                    session.status = ResearchStatus::Stopped;
                }),
            )
            .await
    }

    pub async fn delete_research_session(
        &self,
        user_id: &str,
        project_id: &str,
        session_id: &str,
    ) -> Result<(), DomainStoreError> {
        self.owned_project(user_id, project_id).await?;
        self.research_sessions
            .remove(project_id, session_id)
            .await
            .map(|_| ())
    }
}
