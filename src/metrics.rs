use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing analysis activity.
#[derive(Default)]
pub struct AnalysisMetrics {
    documents_analyzed: AtomicU64,
    chunks_dispatched: AtomicU64,
    quota_exhaustions: AtomicU64,
    questions_answered: AtomicU64,
}

impl AnalysisMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished analysis run and the number of chunk summaries it collected.
    pub fn record_analysis(&self, chunk_count: u64, quota_exhausted: bool) {
        self.documents_analyzed.fetch_add(1, Ordering::Relaxed);
        self.chunks_dispatched
            .fetch_add(chunk_count, Ordering::Relaxed);
        if quota_exhausted {
            self.quota_exhaustions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an answered follow-up question.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_analyzed: self.documents_analyzed.load(Ordering::Relaxed),
            chunks_dispatched: self.chunks_dispatched.load(Ordering::Relaxed),
            quota_exhaustions: self.quota_exhaustions.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of analysis counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Number of analysis runs since startup, including those stopped early.
    pub documents_analyzed: u64,
    /// Chunk summaries collected across all runs.
    pub chunks_dispatched: u64,
    /// Runs that stopped because the backend quota was exhausted.
    pub quota_exhaustions: u64,
    /// Follow-up questions answered.
    pub questions_answered: u64,
}
