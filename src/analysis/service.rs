//! Analysis service shared by the HTTP surface and the CLI.

use super::{AnalysisError, AnalysisReport, AnalysisSettings, run_analysis};
use crate::{
    backend::{Backend, BackendError, get_backend},
    config::get_config,
    metrics::{AnalysisMetrics, MetricsSnapshot},
    session::{ChatTurn, DocumentSession, SessionError},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Owns the backend, the analysis settings, and the metrics registry.
///
/// Construct once near process start and share it through an `Arc`. Runs are independent of
/// each other; the service keeps no per-document state.
pub struct AnalysisService {
    backend: Box<dyn Backend>,
    settings: AnalysisSettings,
    metrics: Arc<AnalysisMetrics>,
}

/// Abstraction over the analysis pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Run the full pipeline over raw document text.
    async fn analyze(&self, text: String) -> Result<AnalysisReport, AnalysisError>;

    /// Answer a follow-up question within `session`.
    async fn ask(
        &self,
        session: &mut DocumentSession,
        question: &str,
    ) -> Result<ChatTurn, SessionError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl AnalysisService {
    /// Build a service around an explicit backend and settings.
    pub fn new(backend: Box<dyn Backend>, settings: AnalysisSettings) -> Self {
        Self {
            backend,
            settings,
            metrics: Arc::new(AnalysisMetrics::new()),
        }
    }

    /// Build a service from the global configuration.
    pub fn from_config() -> Result<Self, BackendError> {
        let config = get_config();
        tracing::info!(provider = ?config.backend_provider, "Initializing backend");
        let backend = get_backend()?;
        Ok(Self::new(backend, AnalysisSettings::from_config(config)))
    }

    /// Settings applied to every run.
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Analyze a document and record the run in the metrics registry.
    pub async fn analyze(&self, text: String) -> Result<AnalysisReport, AnalysisError> {
        let report = run_analysis(self.backend.as_ref(), &self.settings, &text).await?;
        self.metrics
            .record_analysis(report.chunks.len() as u64, report.is_quota_exhausted());
        Ok(report)
    }

    /// Answer a question about the session's document.
    pub async fn ask(
        &self,
        session: &mut DocumentSession,
        question: &str,
    ) -> Result<ChatTurn, SessionError> {
        let turn = crate::session::ask(self.backend.as_ref(), session, question).await?;
        self.metrics.record_question();
        Ok(turn)
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl AnalysisApi for AnalysisService {
    async fn analyze(&self, text: String) -> Result<AnalysisReport, AnalysisError> {
        AnalysisService::analyze(self, text).await
    }

    async fn ask(
        &self,
        session: &mut DocumentSession,
        question: &str,
    ) -> Result<ChatTurn, SessionError> {
        AnalysisService::ask(self, session, question).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        AnalysisService::metrics_snapshot(self)
    }
}
