//! Analysis pipeline: sanitize, chunk, summarize each chunk, consolidate, extract risks.
//!
//! [`run_analysis`] is stateless: everything it needs arrives as arguments and everything it
//! produces is returned in the [`AnalysisReport`]. Backend calls are issued one at a time, in
//! order. When the backend reports quota exhaustion the run stops immediately and returns the
//! work collected so far with [`AnalysisStatus::QuotaExhausted`].

pub mod parse;
mod prompts;
mod risks;
mod service;
pub mod types;

pub use parse::parse_model_text;
pub use risks::placeholder_risks;
pub use service::{AnalysisApi, AnalysisService};
pub use types::{
    AnalysisError, AnalysisReport, AnalysisSettings, AnalysisStage, AnalysisStatus, ChunkRecord,
    ModelOutput, Risk, Severity, SummaryPoint,
};

pub(crate) use prompts::{question_prompt, truncate_chars};

use crate::backend::{Backend, BackendRequest};
use crate::processing::{chunk_document, fingerprint, sanitize};
use std::time::Instant;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Outcome of a single backend invocation as seen by the orchestrator.
enum Invocation {
    Completed(ModelOutput),
    Exhausted,
}

async fn invoke(
    backend: &dyn Backend,
    stage: AnalysisStage,
    prompt: String,
    max_output_tokens: u32,
) -> Invocation {
    match backend
        .invoke(BackendRequest::new(prompt, max_output_tokens))
        .await
    {
        Ok(text) => Invocation::Completed(parse_model_text(&text)),
        Err(error) if error.is_quota_exhausted() => {
            tracing::warn!(
                provider = backend.provider(),
                stage = ?stage,
                error = %error,
                "Backend quota exhausted; stopping analysis"
            );
            Invocation::Exhausted
        }
        Err(error) => {
            tracing::warn!(
                provider = backend.provider(),
                stage = ?stage,
                error = %error,
                "Backend invocation failed"
            );
            Invocation::Completed(ModelOutput::Error(error.to_string()))
        }
    }
}

/// Analyze raw document text end to end.
///
/// Fails only when the sanitized text is too short to analyze or the chunk budget is invalid.
/// Backend failures never surface as errors: quota exhaustion yields a report tagged
/// [`AnalysisStatus::QuotaExhausted`], other failures become [`ModelOutput::Error`] entries,
/// malformed output becomes [`ModelOutput::Raw`].
pub async fn run_analysis(
    backend: &dyn Backend,
    settings: &AnalysisSettings,
    raw_text: &str,
) -> Result<AnalysisReport, AnalysisError> {
    let started = Instant::now();
    let text = sanitize(raw_text);
    let text_chars = text.chars().count();
    if text_chars < settings.min_input_chars {
        return Err(AnalysisError::InsufficientText {
            chars: text_chars,
            min: settings.min_input_chars,
        });
    }

    let chunks = chunk_document(&text, settings.max_chars, settings.overlap_chars)?;
    let chunk_count = chunks.len();
    tracing::info!(
        provider = backend.provider(),
        text_chars,
        chunk_count,
        "Starting analysis"
    );

    let mut report = AnalysisReport {
        run_id: uuid::Uuid::new_v4().to_string(),
        generated_at: current_timestamp_rfc3339(),
        status: AnalysisStatus::Complete,
        exhausted_at: None,
        fingerprint: fingerprint(&text),
        text_chars,
        chunk_count,
        chunks: Vec::with_capacity(chunk_count),
        summary: ModelOutput::empty_summary(),
        risks: Vec::new(),
        elapsed_seconds: 0.0,
    };

    for chunk in chunks {
        tracing::debug!(section = chunk.index + 1, chunk_count, "Summarizing section");
        let prompt = prompts::chunk_prompt(chunk.index + 1, chunk_count, &chunk.content);
        match invoke(
            backend,
            AnalysisStage::ChunkSummaries,
            prompt,
            settings.chunk_output_tokens,
        )
        .await
        {
            Invocation::Completed(result) => report.chunks.push(ChunkRecord { chunk, result }),
            Invocation::Exhausted => {
                return Ok(stop_exhausted(
                    report,
                    AnalysisStage::ChunkSummaries,
                    started,
                ));
            }
        }
    }

    let chunk_results: Vec<_> = report
        .chunks
        .iter()
        .filter(|record| !matches!(record.result, ModelOutput::Error(_)))
        .map(|record| record.result.to_prompt_value())
        .collect();
    match invoke(
        backend,
        AnalysisStage::Consolidation,
        prompts::consolidation_prompt(&chunk_results),
        settings.consolidation_output_tokens,
    )
    .await
    {
        Invocation::Completed(summary) => report.summary = summary,
        Invocation::Exhausted => {
            return Ok(stop_exhausted(
                report,
                AnalysisStage::Consolidation,
                started,
            ));
        }
    }

    let initial = match invoke(
        backend,
        AnalysisStage::RiskExtraction,
        prompts::risk_prompt(&text, settings.min_risks),
        settings.risk_output_tokens,
    )
    .await
    {
        Invocation::Completed(output) => risks::collect_risks(&output),
        Invocation::Exhausted => {
            return Ok(stop_exhausted(
                report,
                AnalysisStage::RiskExtraction,
                started,
            ));
        }
    };

    let final_risks = if initial.len() >= settings.min_risks {
        initial
    } else {
        tracing::info!(
            found = initial.len(),
            required = settings.min_risks,
            "Too few risks; retrying with a simplified prompt"
        );
        let prefix = truncate_chars(&text, settings.retry_prefix_chars);
        match invoke(
            backend,
            AnalysisStage::RiskRetry,
            prompts::risk_retry_prompt(&prefix, settings.min_risks),
            settings.retry_output_tokens,
        )
        .await
        {
            Invocation::Completed(output) => {
                risks::reconcile(initial, risks::collect_risks(&output), settings.min_risks)
            }
            Invocation::Exhausted => {
                report.risks = initial;
                return Ok(stop_exhausted(report, AnalysisStage::RiskRetry, started));
            }
        }
    };

    report.risks = final_risks;
    report.elapsed_seconds = elapsed_seconds(started);
    tracing::info!(
        chunk_count,
        risks = report.risks.len(),
        elapsed_seconds = report.elapsed_seconds,
        "Analysis complete"
    );
    Ok(report)
}

fn stop_exhausted(
    mut report: AnalysisReport,
    stage: AnalysisStage,
    started: Instant,
) -> AnalysisReport {
    report.status = AnalysisStatus::QuotaExhausted;
    report.exhausted_at = Some(stage);
    report.elapsed_seconds = elapsed_seconds(started);
    tracing::warn!(
        stage = ?stage,
        completed_chunks = report.chunks.len(),
        chunk_count = report.chunk_count,
        "Analysis stopped on quota exhaustion"
    );
    report
}

fn elapsed_seconds(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 10.0).round() / 10.0
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
