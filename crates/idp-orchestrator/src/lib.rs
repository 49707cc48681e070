//! Orchestrator (C4, §4.2/§5): drives one document through the fixed
//! `Queued -> Running -> Ocr -> Classifying -> Extracting ->
//! [Assessing] -> [Postprocessing] -> [Summarizing] -> [Evaluating] ->
//! Completed` sequence, or to `Failed` from any non-terminal state.
//!
//! Within a document, stages run strictly sequentially except Extraction's
//! section fan-out. `Document::transition_to` updates in-memory state only;
//! the atomicity contract in §4.1 requires this module to push the tracking
//! record immediately after every successful transition, before any later
//! stage observes the document.

mod error;
mod providers;

pub use error::OrchestratorError;
pub use providers::Providers;

use chrono::Utc;
use idp_blob_store::BlobStore;
use idp_core::config::Config;
use idp_core::{ErrorKind, ExecutionContext};
use idp_document::{Document, DocumentErrorEntry, DocumentStatus, TrackingRecord, TrackingStore};
use idp_extraction::{RateLimiter, SchemaRegistry};
use idp_ocr::RawPage;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

async fn persist(doc: &Document, tracking: &dyn TrackingStore) -> Result<(), OrchestratorError> {
    tracking.upsert(TrackingRecord::from(doc)).await?;
    Ok(())
}

async fn transition(
    doc: &mut Document,
    tracking: &dyn TrackingStore,
    next: DocumentStatus,
) -> Result<(), OrchestratorError> {
    doc.transition_to(next)?;
    persist(doc, tracking).await
}

/// Append a failure entry and move the document to `Failed`. `Failed` is
/// reachable from every non-terminal state, so this only no-ops if the
/// document already reached a terminal status through another path.
async fn fail(
    doc: &mut Document,
    tracking: &dyn TrackingStore,
    stage: &str,
    kind: ErrorKind,
    message: String,
) -> Result<(), OrchestratorError> {
    doc.append_error(DocumentErrorEntry {
        kind,
        message,
        stage: Some(stage.to_string()),
        scope: None,
        occurred_at: Utc::now(),
    });
    let _ = doc.transition_to(DocumentStatus::Failed);
    persist(doc, tracking).await
}

async fn check_cancelled(
    doc: &mut Document,
    tracking: &dyn TrackingStore,
    ctx: &ExecutionContext,
) -> Result<(), OrchestratorError> {
    if ctx.is_cancelled() {
        fail(doc, tracking, "orchestrator", ErrorKind::Cancelled, "cancelled".to_string()).await?;
        return Err(OrchestratorError::Cancelled);
    }
    Ok(())
}

/// Everything `run_document` needs beyond `doc` itself: the per-run inputs
/// (rendered pages, rule set, evaluation baseline, assessment thresholds)
/// and the shared collaborators (tracking store, blob store, schema
/// registry, rate limiter, resolved providers, config, execution context).
#[allow(clippy::too_many_arguments)]
pub async fn run_document(
    doc: &mut Document,
    raw_pages: Vec<RawPage>,
    rules: &[String],
    baseline: Option<&serde_json::Value>,
    assessment_thresholds: &HashMap<String, f32>,
    tracking: &dyn TrackingStore,
    blobs: Arc<dyn BlobStore>,
    schema_registry: Arc<SchemaRegistry>,
    limiter: Arc<RateLimiter>,
    providers: &Providers,
    config: &Config,
    ctx: &ExecutionContext,
) -> Result<(), OrchestratorError> {
    match tokio::time::timeout(
        ctx.overall_timeout,
        run_stages(
            doc,
            raw_pages,
            rules,
            baseline,
            assessment_thresholds,
            tracking,
            blobs,
            schema_registry,
            limiter,
            providers,
            config,
            ctx,
        ),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => {
            warn!(document_id = %doc.id, "overall execution timeout elapsed");
            fail(doc, tracking, "orchestrator", ErrorKind::TransientIo, "overall timeout elapsed".to_string()).await?;
            Err(OrchestratorError::Timeout)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_stages(
    doc: &mut Document,
    raw_pages: Vec<RawPage>,
    rules: &[String],
    baseline: Option<&serde_json::Value>,
    assessment_thresholds: &HashMap<String, f32>,
    tracking: &dyn TrackingStore,
    blobs: Arc<dyn BlobStore>,
    schema_registry: Arc<SchemaRegistry>,
    limiter: Arc<RateLimiter>,
    providers: &Providers,
    config: &Config,
    ctx: &ExecutionContext,
) -> Result<(), OrchestratorError> {
    doc.execution_id = Some(ctx.execution_id.clone());
    transition(doc, tracking, DocumentStatus::Running).await?;

    check_cancelled(doc, tracking, ctx).await?;
    transition(doc, tracking, DocumentStatus::Ocr).await?;
    if let Err(e) = idp_ocr::run(doc, raw_pages, &*blobs, &*providers.ocr, &config.retry, config.pipeline.continue_on_page_error).await {
        fail(doc, tracking, "ocr", e.kind(), e.to_string()).await?;
        return Err(e.into());
    }

    check_cancelled(doc, tracking, ctx).await?;
    transition(doc, tracking, DocumentStatus::Classifying).await?;
    if let Err(e) = idp_classification::run(doc, &*blobs, &*providers.classification, &config.classification, &config.retry).await {
        fail(doc, tracking, "classification", e.kind(), e.to_string()).await?;
        return Err(e.into());
    }

    check_cancelled(doc, tracking, ctx).await?;
    transition(doc, tracking, DocumentStatus::Extracting).await?;
    run_extraction(doc, tracking, blobs.clone(), schema_registry, limiter, providers, config, ctx).await?;

    if config.pipeline.enable_assessment {
        check_cancelled(doc, tracking, ctx).await?;
        transition(doc, tracking, DocumentStatus::Assessing).await?;
        if let Err(e) = idp_assessment::run(doc, &*blobs, &*providers.assessment, assessment_thresholds, &config.retry).await {
            fail(doc, tracking, "assessment", e.kind(), e.to_string()).await?;
            return Err(e.into());
        }
    }

    if config.pipeline.enable_rule_validation && !rules.is_empty() {
        check_cancelled(doc, tracking, ctx).await?;
        transition(doc, tracking, DocumentStatus::Postprocessing).await?;
        if let Err(e) = idp_rule_validation::run(doc, rules, &*blobs, &*providers.rule_validation, &config.rule_validation, &config.retry).await {
            fail(doc, tracking, "rule_validation", e.kind(), e.to_string()).await?;
            return Err(e.into());
        }
    }

    if config.pipeline.enable_summarization {
        check_cancelled(doc, tracking, ctx).await?;
        transition(doc, tracking, DocumentStatus::Summarizing).await?;
        if let Err(e) = idp_summarization::run(doc, &*blobs, &*providers.summarization, &config.retry).await {
            fail(doc, tracking, "summarization", e.kind(), e.to_string()).await?;
            return Err(e.into());
        }
    }

    if config.pipeline.enable_evaluation {
        if let Some(baseline) = baseline {
            check_cancelled(doc, tracking, ctx).await?;
            transition(doc, tracking, DocumentStatus::Evaluating).await?;
            let provider = providers.evaluation.as_deref();
            if let Err(e) = idp_evaluation::run(doc, baseline, &config.evaluation, provider, &*blobs, &config.retry).await {
                fail(doc, tracking, "evaluation", e.kind(), e.to_string()).await?;
                return Err(e.into());
            }
        }
    }

    transition(doc, tracking, DocumentStatus::Completed).await?;
    info!(document_id = %doc.id, "document completed");
    Ok(())
}

/// Fan out extraction across every section, then fan in: apply each
/// section's result onto `doc.sections`, annotating (and optionally
/// tolerating) per-section failures per `pipeline.continue_on_section_error`.
/// `ctx`'s cancellation token is raced against the in-flight section calls so
/// a cancellation mid-fan-out aborts outstanding work instead of waiting for
/// every section to finish.
#[allow(clippy::too_many_arguments)]
async fn run_extraction(
    doc: &mut Document,
    tracking: &dyn TrackingStore,
    blobs: Arc<dyn BlobStore>,
    schema_registry: Arc<SchemaRegistry>,
    limiter: Arc<RateLimiter>,
    providers: &Providers,
    config: &Config,
    ctx: &ExecutionContext,
) -> Result<(), OrchestratorError> {
    let outcomes = match idp_extraction::run(
        doc,
        blobs,
        schema_registry,
        providers.extraction.clone(),
        config.retry.clone(),
        limiter,
        config.extraction.concurrency_per_document,
        ctx.cancellation_token(),
    )
    .await
    {
        Ok(outcomes) => outcomes,
        Err(e) => {
            let cancelled = matches!(e, idp_extraction::ExtractionStageError::Cancelled);
            fail(doc, tracking, "extraction", e.kind(), e.to_string()).await?;
            return Err(if cancelled { OrchestratorError::Cancelled } else { e.into() });
        }
    };

    idp_extraction::merge_extraction_metering(doc, &outcomes);

    for outcome in outcomes {
        match outcome.result {
            Ok((uri, value, _metering)) => {
                let section = &mut doc.sections[outcome.section_index];
                section.extraction_uri = Some(uri);
                section.attributes = Some(value);
            }
            Err(e) => {
                let section_id = doc.sections[outcome.section_index].section_id.clone();
                doc.append_error(DocumentErrorEntry {
                    kind: e.kind(),
                    message: e.to_string(),
                    stage: Some("extraction".to_string()),
                    scope: Some(section_id.clone()),
                    occurred_at: Utc::now(),
                });
                if !config.pipeline.continue_on_section_error {
                    let kind = e.kind();
                    let message = e.to_string();
                    fail(doc, tracking, "extraction", kind, message).await?;
                    return Err(OrchestratorError::Section { section_id, source: e });
                }
            }
        }
    }

    Ok(())
}
