//! Assessment Stage (C8, §4.7): re-present each section's extracted value
//! to a provider for a per-attribute confidence score, counting alerts where
//! the score falls below that attribute's threshold.

use idp_blob_store::{get_with_eventual_consistency_retry, BlobStore, JsonBlobStore};
use idp_core::{retry_stage, ErrorKind, RetryConfig, StageError};
use idp_document::{Document, Metering};
use idp_providers::{AssessmentProvider, PageText};
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AssessmentStageError {
    #[error(transparent)]
    Provider(#[from] StageError),

    #[error(transparent)]
    Blob(#[from] idp_blob_store::BlobError),
}

impl AssessmentStageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssessmentStageError::Provider(e) => e.kind,
            AssessmentStageError::Blob(e) => e.kind(),
        }
    }
}

pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Assess every section with an extraction result. Alerts and per-section
/// scores land under `metering["assessment"]`; no per-stage URI field exists
/// on `Document` (§4.7 merges summary metrics rather than tracking a
/// pointer), so the full score artifact is written for inspection only.
pub async fn run(
    doc: &mut Document,
    blobs: &dyn BlobStore,
    provider: &dyn AssessmentProvider,
    thresholds: &HashMap<String, f32>,
    retry: &RetryConfig,
) -> Result<(), AssessmentStageError> {
    let mut alerts = 0u64;
    let mut sections_assessed = 0u64;

    for section in &doc.sections {
        let Some(attributes) = &section.attributes else {
            continue;
        };
        let section_text = section_text(doc, &section.page_ids, blobs).await?;

        let (result, metering) =
            retry_stage(retry, || provider.assess_section(&section_text, attributes)).await?;

        for (attribute, score) in &result.scores {
            let threshold = thresholds.get(attribute).copied().unwrap_or(DEFAULT_THRESHOLD);
            if *score < threshold {
                alerts += 1;
            }
        }
        sections_assessed += 1;

        let key = format!("{}/sections/{}/assessment.json", doc.id, section.section_id);
        blobs.put_json(&key, &result).await?;

        let mut stage_metering = Metering::new();
        stage_metering.insert("assessment".to_string(), metering);
        doc.merge_metering(&stage_metering);
    }

    let mut summary = Metering::new();
    summary.insert(
        "assessment".to_string(),
        HashMap::from([("alerts".to_string(), alerts), ("sections".to_string(), sections_assessed)]),
    );
    doc.merge_metering(&summary);

    info!(document_id = %doc.id, alerts, "assessment complete");
    Ok(())
}

async fn section_text(
    doc: &Document,
    page_ids: &[String],
    blobs: &dyn BlobStore,
) -> Result<String, idp_blob_store::BlobError> {
    let mut pages = Vec::with_capacity(page_ids.len());
    for page_id in page_ids {
        let text = match doc.pages.get(page_id).and_then(|p| p.parsed_text_uri.as_deref()) {
            Some(uri) => {
                String::from_utf8_lossy(&get_with_eventual_consistency_retry(blobs, uri).await?).into_owned()
            }
            None => String::new(),
        };
        pages.push(PageText { page_id: page_id.clone(), text });
    }
    Ok(pages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use idp_blob_store::InMemoryBlobStore;
    use idp_document::{Location, Page, Section};
    use idp_providers::{AssessmentResult, ProviderMetering};
    use serde_json::json;

    struct FixedProvider;

    #[async_trait]
    impl AssessmentProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn assess_section(
            &self,
            _section_text: &str,
            _extracted: &serde_json::Value,
        ) -> Result<(AssessmentResult, ProviderMetering), StageError> {
            let mut scores = HashMap::new();
            scores.insert("total".to_string(), 0.3);
            scores.insert("vendor".to_string(), 0.9);
            Ok((AssessmentResult { scores }, ProviderMetering::new()))
        }
    }

    fn doc_with_section() -> Document {
        let mut doc = Document::new(
            "doc-1",
            Location { bucket: "in".to_string(), key: "a.pdf".to_string() },
            "out/doc-1",
        );
        doc.pages.insert("1".to_string(), Page::new("1"));
        doc.sections.push(Section {
            section_id: "1".to_string(),
            classification: "invoice".to_string(),
            confidence: 0.9,
            page_ids: vec!["1".to_string()],
            extraction_uri: Some("doc-1/sections/1/result.json".to_string()),
            attributes: Some(json!({"total": 10.5, "vendor": "Acme"})),
        });
        doc
    }

    #[tokio::test]
    async fn counts_alerts_below_threshold() {
        let mut doc = doc_with_section();
        let blobs = InMemoryBlobStore::new();
        let thresholds = HashMap::from([("total".to_string(), 0.5), ("vendor".to_string(), 0.5)]);
        run(&mut doc, &blobs, &FixedProvider, &thresholds, &RetryConfig::default()).await.unwrap();
        assert_eq!(doc.metering["assessment"]["alerts"], 1);
        assert_eq!(doc.metering["assessment"]["sections"], 1);
    }
}
