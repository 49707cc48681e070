//! Extraction Stage (C7, §4.6): per-section structured attribute extraction,
//! fanned out across a document's sections with bounded concurrency and a
//! shared provider rate limiter.

mod error;
mod rate_limit;
mod schema;

pub use error::ExtractionStageError;
pub use rate_limit::RateLimiter;
pub use schema::{validate_and_coerce, ClassSchema, SchemaRegistry};

use idp_blob_store::{get_with_eventual_consistency_retry, BlobStore, JsonBlobStore};
use idp_core::{retry_stage, CancellationToken, RetryConfig};
use idp_document::{Document, Metering};
use idp_providers::{ExtractionProvider, ExtractionRequest, PageText};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of extracting one section, applied back onto `Document.sections`
/// by the caller once the whole fan-out has completed (the fan-in, §4.6).
pub struct SectionOutcome {
    pub section_index: usize,
    pub result: Result<(String, serde_json::Value, std::collections::HashMap<String, u64>), ExtractionStageError>,
}

/// Run extraction across every section of `doc`, bounded by
/// `concurrency_per_document` (`None` = unbounded) and the shared
/// `limiter`'s request-per-second budget. Returns per-section outcomes in
/// section order; applying them and deciding whether to fail the document on
/// a section error is the caller's responsibility (`continue_on_section_error`).
///
/// `cancel` is checked between joins: once it fires, every section task
/// still in flight is aborted and the whole fan-out returns
/// `ExtractionStageError::Cancelled` rather than partial outcomes.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    doc: &Document,
    blobs: Arc<dyn BlobStore>,
    registry: Arc<SchemaRegistry>,
    provider: Arc<dyn ExtractionProvider>,
    retry: RetryConfig,
    limiter: Arc<RateLimiter>,
    concurrency_per_document: Option<usize>,
    cancel: CancellationToken,
) -> Result<Vec<SectionOutcome>, ExtractionStageError> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(
        concurrency_per_document.unwrap_or(doc.sections.len().max(1)),
    ));

    let mut set = tokio::task::JoinSet::new();
    for (index, section) in doc.sections.iter().enumerate() {
        let page_texts = collect_page_texts(doc, section, &blobs).await;
        let blobs = blobs.clone();
        let registry = registry.clone();
        let provider = provider.clone();
        let retry = retry.clone();
        let limiter = limiter.clone();
        let semaphore = semaphore.clone();
        let document_id = doc.id.clone();
        let section_id = section.section_id.clone();
        let class = section.classification.clone();

        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            let result = match page_texts {
                Ok(page_texts) => {
                    extract_one(&document_id, &section_id, &class, page_texts, &*blobs, &registry, &*provider, &retry, &limiter).await
                }
                Err(e) => Err(e),
            };
            SectionOutcome { section_index: index, result }
        });
    }

    let mut outcomes = Vec::with_capacity(set.len());
    let mut cancelled = false;
    while !set.is_empty() {
        tokio::select! {
            biased;
            _ = cancel.cancelled(), if !cancelled => {
                cancelled = true;
                set.abort_all();
            }
            joined = set.join_next() => {
                match joined {
                    Some(Ok(outcome)) => outcomes.push(outcome),
                    Some(Err(join_err)) => {
                        warn!(error = %join_err, "extraction task panicked or was aborted");
                    }
                    None => break,
                }
            }
        }
    }

    if cancelled {
        return Err(ExtractionStageError::Cancelled);
    }

    outcomes.sort_by_key(|o| o.section_index);
    Ok(outcomes)
}

async fn collect_page_texts(
    doc: &Document,
    section: &idp_document::Section,
    blobs: &Arc<dyn BlobStore>,
) -> Result<Vec<PageText>, ExtractionStageError> {
    let mut texts = Vec::with_capacity(section.page_ids.len());
    for page_id in &section.page_ids {
        let text = match doc.pages.get(page_id).and_then(|p| p.parsed_text_uri.as_deref()) {
            Some(uri) => String::from_utf8_lossy(&get_with_eventual_consistency_retry(&**blobs, uri).await?).into_owned(),
            None => String::new(),
        };
        texts.push(PageText { page_id: page_id.clone(), text });
    }
    Ok(texts)
}

#[allow(clippy::too_many_arguments)]
async fn extract_one(
    document_id: &str,
    section_id: &str,
    class: &str,
    page_texts: Vec<PageText>,
    blobs: &dyn BlobStore,
    registry: &SchemaRegistry,
    provider: &dyn ExtractionProvider,
    retry: &RetryConfig,
    limiter: &RateLimiter,
) -> Result<(String, serde_json::Value, std::collections::HashMap<String, u64>), ExtractionStageError> {
    if class == "unknown" {
        let value = serde_json::json!({});
        let key = format!("{document_id}/sections/{section_id}/result.json");
        let uri = blobs.put_json(&key, &value).await?;
        info!(document_id, section_id, "unknown-class section extracted with empty attribute set");
        return Ok((uri, value, std::collections::HashMap::new()));
    }

    let schema = registry
        .get(class)
        .ok_or_else(|| ExtractionStageError::UnknownClass(class.to_string()))?;

    let section_text = page_texts
        .iter()
        .map(|p| format!("--- page {} ---\n{}", p.page_id, p.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    let few_shot = schema.few_shot.iter().filter(|e| e.class == class).cloned().collect();

    let request = ExtractionRequest {
        class: class.to_string(),
        class_description: schema.description.clone(),
        attributes: schema.attributes.clone(),
        section_text,
        few_shot,
    };

    let (mut value, metering) = retry_stage(retry, || async {
        limiter.acquire().await;
        provider.extract_section(&request).await
    })
    .await?;

    schema::validate_and_coerce(&mut value, schema).map_err(|detail| {
        ExtractionStageError::SchemaMismatch { class: class.to_string(), detail }
    })?;

    let key = format!("{document_id}/sections/{section_id}/result.json");
    let uri = blobs.put_json(&key, &value).await?;

    info!(document_id, section_id, "extraction complete");
    Ok((uri, value, metering))
}

/// Fold a set of per-section outcomes into the document's metering under the
/// `extraction` stage key.
pub fn merge_extraction_metering(doc: &mut Document, outcomes: &[SectionOutcome]) {
    let mut counters = std::collections::HashMap::new();
    for outcome in outcomes {
        if let Ok((_, _, metering)) = &outcome.result {
            for (k, v) in metering {
                *counters.entry(k.clone()).or_insert(0u64) += v;
            }
        }
    }
    let mut stage_metering = Metering::new();
    stage_metering.insert("extraction".to_string(), counters);
    doc.merge_metering(&stage_metering);
}
