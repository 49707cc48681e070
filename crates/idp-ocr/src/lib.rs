//! OCR Stage (C5, §4.4): turn a document's rendered pages into per-page text
//! and confidence artifacts. Page rendering itself (PDF/image -> bitmap) is a
//! concern of intake, not this stage; this stage receives already-rendered
//! page images and invokes the configured `OcrProvider`.

mod error;

pub use error::OcrStageError;

use idp_blob_store::{BlobStore, JsonBlobStore};
use idp_core::{retry_stage, RetryConfig};
use idp_document::{Document, Page};
use idp_providers::OcrProvider;
use tracing::{debug, info};

/// A page image already rendered from the source document, ready for OCR.
pub struct RawPage {
    pub page_id: String,
    pub image_bytes: Vec<u8>,
    pub content_type: String,
}

/// Run OCR over every page in `raw_pages`, writing artifacts through `blobs`
/// and populating `doc.pages`. `doc.num_pages` is set to `raw_pages.len()`.
///
/// A page whose retries are exhausted is either annotated and skipped (when
/// `continue_on_page_error` is set) or aborts the whole stage, per §4.4's
/// failure semantics.
pub async fn run(
    doc: &mut Document,
    raw_pages: Vec<RawPage>,
    blobs: &dyn BlobStore,
    provider: &dyn OcrProvider,
    retry: &RetryConfig,
    continue_on_page_error: bool,
) -> Result<(), OcrStageError> {
    if raw_pages.is_empty() {
        return Err(OcrStageError::EmptyDocument);
    }

    doc.num_pages = raw_pages.len();
    info!(document_id = %doc.id, pages = raw_pages.len(), "starting OCR stage");

    for raw in raw_pages {
        match ocr_one_page(doc, &raw, blobs, provider, retry).await {
            Ok((page, metering)) => {
                let mut stage_metering = idp_document::Metering::new();
                stage_metering.insert("ocr".to_string(), metering);
                doc.merge_metering(&stage_metering);
                doc.pages.insert(page.page_id.clone(), page);
            }
            Err(err) if continue_on_page_error => {
                debug!(page_id = %raw.page_id, error = %err, "page OCR failed, continuing");
                let mut page = Page::new(raw.page_id.clone());
                page.image_uri = write_image(doc, &raw, blobs).await.ok();
                doc.append_error(idp_document::DocumentErrorEntry {
                    kind: err.kind,
                    message: err.message.clone(),
                    stage: Some("ocr".to_string()),
                    scope: Some(raw.page_id.clone()),
                    occurred_at: chrono::Utc::now(),
                });
                doc.pages.insert(page.page_id.clone(), page);
            }
            Err(err) => return Err(OcrStageError::Page { page_id: raw.page_id, source: err }),
        }
    }

    Ok(())
}

fn image_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        _ => "jpg",
    }
}

async fn write_image(
    doc: &Document,
    raw: &RawPage,
    blobs: &dyn BlobStore,
) -> Result<String, idp_blob_store::BlobError> {
    let key = format!("{}/pages/{}/image.{}", doc.id, raw.page_id, image_extension(&raw.content_type));
    blobs.put(&key, &raw.image_bytes, &raw.content_type).await
}

async fn ocr_one_page(
    doc: &Document,
    raw: &RawPage,
    blobs: &dyn BlobStore,
    provider: &dyn OcrProvider,
    retry: &RetryConfig,
) -> Result<(Page, std::collections::HashMap<String, u64>), idp_core::StageError> {
    let image_uri = write_image(doc, raw, blobs)
        .await
        .map_err(|e| idp_core::StageError::new(e.kind(), e.to_string()).with_scope(raw.page_id.clone()))?;

    let (result, metering) = retry_stage(retry, || provider.ocr_page(&raw.image_bytes)).await?;

    let raw_ocr_key = format!("{}/pages/{}/rawText.json", doc.id, raw.page_id);
    let raw_ocr_uri = blobs
        .put_json(&raw_ocr_key, &result)
        .await
        .map_err(|e| idp_core::StageError::new(e.kind(), e.to_string()))?;

    let parsed_text = result
        .blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let parsed_text_key = format!("{}/pages/{}/text.md", doc.id, raw.page_id);
    let parsed_text_uri = blobs
        .put(&parsed_text_key, parsed_text.as_bytes(), "text/markdown")
        .await
        .map_err(|e| idp_core::StageError::new(e.kind(), e.to_string()))?;

    let confidences: Vec<f32> = result.blocks.iter().map(|b| b.confidence).collect();
    let confidence_key = format!("{}/pages/{}/textConfidence.json", doc.id, raw.page_id);
    let text_confidence_uri = blobs
        .put_json(&confidence_key, &confidences)
        .await
        .map_err(|e| idp_core::StageError::new(e.kind(), e.to_string()))?;

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    let mut page = Page::new(raw.page_id.clone());
    page.image_uri = Some(image_uri);
    page.raw_ocr_uri = Some(raw_ocr_uri);
    page.parsed_text_uri = Some(parsed_text_uri);
    page.text_confidence_uri = Some(text_confidence_uri);
    page.confidence = Some(confidence);

    let mut counters = metering;
    *counters.entry("pages".to_string()).or_insert(0) += 1;

    Ok((page, counters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use idp_blob_store::InMemoryBlobStore;
    use idp_document::{Document, Location};
    use idp_providers::{OcrBlock, OcrResult, ProviderMetering};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedOcr;

    #[async_trait]
    impl OcrProvider for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn ocr_page(
            &self,
            _image_bytes: &[u8],
        ) -> Result<(OcrResult, ProviderMetering), idp_core::StageError> {
            let mut metering = ProviderMetering::new();
            metering.insert("requests".to_string(), 1);
            Ok((
                OcrResult {
                    blocks: vec![OcrBlock {
                        text: "hello world".to_string(),
                        bbox: (0.0, 0.0, 1.0, 0.1),
                        confidence: 0.95,
                    }],
                },
                metering,
            ))
        }
    }

    struct FlakyOnce {
        calls: AtomicU32,
    }

    #[async_trait]
    impl OcrProvider for FlakyOnce {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn ocr_page(
            &self,
            _image_bytes: &[u8],
        ) -> Result<(OcrResult, ProviderMetering), idp_core::StageError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(idp_core::StageError::transient_provider("rate limited"))
            } else {
                Ok((OcrResult::default(), ProviderMetering::new()))
            }
        }
    }

    fn new_doc() -> Document {
        Document::new(
            "doc-1",
            Location {
                bucket: "in".to_string(),
                key: "a.pdf".to_string(),
            },
            "out/doc-1",
        )
    }

    #[tokio::test]
    async fn empty_document_is_permanent_input() {
        let mut doc = new_doc();
        let blobs = InMemoryBlobStore::new();
        let provider = FixedOcr;
        let err = run(&mut doc, vec![], &blobs, &provider, &RetryConfig::default(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrStageError::EmptyDocument));
        assert_eq!(err.kind(), idp_core::ErrorKind::PermanentInput);
    }

    #[tokio::test]
    async fn ocrs_every_page_and_sets_artifacts() {
        let mut doc = new_doc();
        let blobs = InMemoryBlobStore::new();
        let provider = FixedOcr;
        let pages = vec![
            RawPage { page_id: "1".to_string(), image_bytes: vec![1, 2, 3], content_type: "image/png".to_string() },
            RawPage { page_id: "2".to_string(), image_bytes: vec![4, 5, 6], content_type: "image/png".to_string() },
        ];
        run(&mut doc, pages, &blobs, &provider, &RetryConfig::default(), true)
            .await
            .unwrap();

        assert_eq!(doc.num_pages, 2);
        let page1 = &doc.pages["1"];
        assert!(page1.raw_ocr_uri.is_some());
        assert!(page1.parsed_text_uri.is_some());
        assert!(page1.text_confidence_uri.is_some());
        assert_eq!(page1.confidence, Some(0.95));
    }

    #[tokio::test]
    async fn transient_page_failure_retries_then_succeeds() {
        let mut doc = new_doc();
        let blobs = InMemoryBlobStore::new();
        let provider = FlakyOnce { calls: AtomicU32::new(0) };
        let pages = vec![RawPage {
            page_id: "1".to_string(),
            image_bytes: vec![1],
            content_type: "image/png".to_string(),
        }];
        run(&mut doc, pages, &blobs, &provider, &RetryConfig::default(), true)
            .await
            .unwrap();
        assert!(doc.errors.is_empty());
    }
}
