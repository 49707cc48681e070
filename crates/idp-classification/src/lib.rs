//! Classification Stage (C6, §4.5): label every page and group contiguous
//! same-label runs (`pageLevel`) or accept a holistic page-range sequence
//! directly into `Document.sections`.

mod error;
mod grouping;

pub use error::ClassificationStageError;

use grouping::{group_page_level, LabeledPage};
use idp_blob_store::{get_with_eventual_consistency_retry, BlobStore};
use idp_core::config::{ClassificationConfig, ClassificationMethod};
use idp_core::{retry_stage, RetryConfig};
use idp_document::{Document, Section};
use idp_providers::{ClassificationOutput, ClassificationProvider, PageText};
use tracing::info;

const UNKNOWN_LABEL: &str = "unknown";

pub async fn run(
    doc: &mut Document,
    blobs: &dyn BlobStore,
    provider: &dyn ClassificationProvider,
    cfg: &ClassificationConfig,
    retry: &RetryConfig,
) -> Result<(), ClassificationStageError> {
    let mut page_ids: Vec<String> = doc.pages.keys().cloned().collect();
    page_ids.sort_by_key(|id| id.parse::<usize>().unwrap_or(0));

    let mut page_texts = Vec::with_capacity(page_ids.len());
    for page_id in &page_ids {
        let text = match doc.pages[page_id].parsed_text_uri.as_deref() {
            Some(uri) => String::from_utf8_lossy(
                &get_with_eventual_consistency_retry(blobs, uri).await?,
            )
            .into_owned(),
            None => String::new(),
        };
        page_texts.push(PageText { page_id: page_id.clone(), text });
    }

    let (output, metering) =
        retry_stage(retry, || provider.classify_pages(&page_texts)).await?;

    let mut stage_metering = idp_document::Metering::new();
    stage_metering.insert("classification".to_string(), metering);
    doc.merge_metering(&stage_metering);

    let sections = match (cfg.method, &output) {
        (ClassificationMethod::PageLevel, ClassificationOutput::PerPage(labels)) => {
            apply_per_page(doc, &page_ids, labels, cfg.split_threshold)
        }
        (ClassificationMethod::Holistic, ClassificationOutput::Ranges(ranges)) => {
            apply_ranges(doc, &page_ids, ranges)
        }
        (ClassificationMethod::PageLevel, ClassificationOutput::Ranges(_)) => {
            return Err(ClassificationStageError::UnexpectedOutputShape {
                expected: "per-page",
                got: "ranges",
            })
        }
        (ClassificationMethod::Holistic, ClassificationOutput::PerPage(_)) => {
            return Err(ClassificationStageError::UnexpectedOutputShape {
                expected: "ranges",
                got: "per-page",
            })
        }
    };

    info!(document_id = %doc.id, sections = sections.len(), "classification complete");
    doc.sections = sections;
    Ok(())
}

fn apply_per_page(
    doc: &mut Document,
    page_ids: &[String],
    labels: &[idp_providers::PageLabel],
    split_threshold: f32,
) -> Vec<Section> {
    use std::collections::HashMap;
    let by_page: HashMap<&str, &idp_providers::PageLabel> =
        labels.iter().map(|l| (l.page_id.as_str(), l)).collect();

    let mut labeled = Vec::with_capacity(page_ids.len());
    for page_id in page_ids {
        let (label, confidence) = match by_page.get(page_id.as_str()) {
            Some(l) if !l.label.is_empty() => (l.label.clone(), l.confidence),
            _ => (UNKNOWN_LABEL.to_string(), 0.0),
        };
        let page = doc.pages.get_mut(page_id).expect("page_id came from doc.pages");
        page.classification = Some(label.clone());
        page.confidence = Some(confidence);
        labeled.push(LabeledPage { page_id: page_id.clone(), label, confidence });
    }

    group_page_level(&labeled, split_threshold)
        .into_iter()
        .map(|g| Section {
            section_id: g.page_ids[0].clone(),
            classification: g.label,
            confidence: g.confidence,
            page_ids: g.page_ids,
            extraction_uri: None,
            attributes: None,
        })
        .collect()
}

fn apply_ranges(
    doc: &mut Document,
    page_ids: &[String],
    ranges: &[idp_providers::PageRangeLabel],
) -> Vec<Section> {
    let ordinal = |id: &str| id.parse::<usize>().unwrap_or(0);
    let mut sections = Vec::with_capacity(ranges.len());

    for range in ranges {
        let (label, confidence) = if range.label.is_empty() {
            (UNKNOWN_LABEL.to_string(), 0.0)
        } else {
            (range.label.clone(), range.confidence)
        };
        let first = ordinal(&range.first_page_id);
        let last = ordinal(&range.last_page_id);
        let covered: Vec<String> = page_ids
            .iter()
            .filter(|id| {
                let n = ordinal(id);
                n >= first && n <= last
            })
            .cloned()
            .collect();

        for page_id in &covered {
            let page = doc.pages.get_mut(page_id).expect("page_id came from doc.pages");
            page.classification = Some(label.clone());
            page.confidence = Some(confidence);
        }

        sections.push(Section {
            section_id: covered.first().cloned().unwrap_or_else(|| range.first_page_id.clone()),
            classification: label,
            confidence,
            page_ids: covered,
            extraction_uri: None,
            attributes: None,
        });
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use idp_blob_store::InMemoryBlobStore;
    use idp_document::{Document, Location};
    use idp_providers::{PageLabel, PageRangeLabel, ProviderMetering};

    fn new_doc_with_pages(n: usize) -> Document {
        let mut doc = Document::new(
            "doc-1",
            Location { bucket: "in".to_string(), key: "a.pdf".to_string() },
            "out/doc-1",
        );
        doc.num_pages = n;
        for i in 1..=n {
            doc.pages.insert(i.to_string(), idp_document::Page::new(i.to_string()));
        }
        doc
    }

    struct PerPageProvider;

    #[async_trait]
    impl ClassificationProvider for PerPageProvider {
        fn name(&self) -> &str {
            "per-page"
        }
        async fn classify_pages(
            &self,
            pages: &[PageText],
        ) -> Result<(ClassificationOutput, ProviderMetering), idp_core::StageError> {
            let labels = pages
                .iter()
                .map(|p| PageLabel { page_id: p.page_id.clone(), label: "invoice".to_string(), confidence: 0.9 })
                .collect();
            Ok((ClassificationOutput::PerPage(labels), ProviderMetering::new()))
        }
    }

    struct HolisticProvider;

    #[async_trait]
    impl ClassificationProvider for HolisticProvider {
        fn name(&self) -> &str {
            "holistic"
        }
        async fn classify_pages(
            &self,
            _pages: &[PageText],
        ) -> Result<(ClassificationOutput, ProviderMetering), idp_core::StageError> {
            Ok((
                ClassificationOutput::Ranges(vec![PageRangeLabel {
                    first_page_id: "1".to_string(),
                    last_page_id: "2".to_string(),
                    label: "invoice".to_string(),
                    confidence: 0.85,
                }]),
                ProviderMetering::new(),
            ))
        }
    }

    #[tokio::test]
    async fn page_level_populates_pages_and_sections() {
        let mut doc = new_doc_with_pages(2);
        let blobs = InMemoryBlobStore::new();
        let provider = PerPageProvider;
        let cfg = ClassificationConfig { method: ClassificationMethod::PageLevel, split_threshold: 0.5 };
        run(&mut doc, &blobs, &provider, &cfg, &RetryConfig::default()).await.unwrap();

        assert!(doc.pages["1"].classification.is_some());
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].page_ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn holistic_builds_sections_from_ranges() {
        let mut doc = new_doc_with_pages(2);
        let blobs = InMemoryBlobStore::new();
        let provider = HolisticProvider;
        let cfg = ClassificationConfig { method: ClassificationMethod::Holistic, split_threshold: 0.5 };
        run(&mut doc, &blobs, &provider, &cfg, &RetryConfig::default()).await.unwrap();

        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].classification, "invoice");
        assert_eq!(doc.pages["2"].classification.as_deref(), Some("invoice"));
    }

    #[tokio::test]
    async fn mismatched_output_shape_is_a_schema_error() {
        let mut doc = new_doc_with_pages(1);
        let blobs = InMemoryBlobStore::new();
        let provider = HolisticProvider;
        let cfg = ClassificationConfig { method: ClassificationMethod::PageLevel, split_threshold: 0.5 };
        let err = run(&mut doc, &blobs, &provider, &cfg, &RetryConfig::default()).await.unwrap_err();
        assert!(matches!(err, ClassificationStageError::UnexpectedOutputShape { .. }));
    }
}
