//! Summarization Stage (C9, §4.8): one cited markdown summary per section,
//! concatenated under a generated table of contents into the document-level
//! summary.

mod citations;
mod error;

pub use error::SummarizationStageError;

use idp_blob_store::{get_with_eventual_consistency_retry, BlobStore, JsonBlobStore};
use idp_core::{retry_stage, RetryConfig};
use idp_document::{Document, Metering, Section};
use idp_providers::SummarizationProvider;
use serde_json::Value;
use tracing::info;

async fn section_text(
    doc: &Document,
    page_ids: &[String],
    blobs: &dyn BlobStore,
) -> Result<String, idp_blob_store::BlobError> {
    let mut parts = Vec::with_capacity(page_ids.len());
    for page_id in page_ids {
        let text = match doc.pages.get(page_id).and_then(|p| p.parsed_text_uri.as_deref()) {
            Some(uri) => {
                String::from_utf8_lossy(&get_with_eventual_consistency_retry(blobs, uri).await?).into_owned()
            }
            None => String::new(),
        };
        parts.push(text);
    }
    Ok(parts.join("\n\n"))
}

fn attribute_table(attributes: &Value, page_ids: &[String]) -> String {
    let pages = page_ids.join(", ");
    let mut table = String::from("| Attribute | Value | Pages |\n|---|---|---|\n");
    if let Some(map) = attributes.as_object() {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            let value = map.get(key).map(|v| v.to_string()).unwrap_or_default();
            table.push_str(&format!("| {key} | {value} | {pages} |\n"));
        }
    }
    table
}

fn section_markdown(section: &Section, narrative: &str, references: &[String]) -> String {
    let attributes = section.attributes.clone().unwrap_or(Value::Null);
    format!(
        "## Section {id} — {class}\n\n### Attributes\n\n{table}\n### Narrative\n\n{narrative}\n\n### References\n\n{refs}\n",
        id = section.section_id,
        class = section.classification,
        table = attribute_table(&attributes, &section.page_ids),
        narrative = narrative,
        refs = references.iter().map(|p| format!("- page {p}")).collect::<Vec<_>>().join("\n"),
    )
}

fn table_of_contents(sections: &[Section]) -> String {
    let mut toc = String::from("## Table of Contents\n\n");
    for section in sections {
        toc.push_str(&format!("- [Section {} — {}](#section-{})\n", section.section_id, section.classification, section.section_id));
    }
    toc
}

/// Summarize every section and write the concatenated document-level
/// summary, setting `document.summary_uri`.
pub async fn run(
    doc: &mut Document,
    blobs: &dyn BlobStore,
    provider: &dyn SummarizationProvider,
    retry: &RetryConfig,
) -> Result<(), SummarizationStageError> {
    let mut section_blocks = Vec::with_capacity(doc.sections.len());

    for section in doc.sections.clone() {
        let text = section_text(doc, &section.page_ids, blobs).await?;
        let attributes = section.attributes.clone().unwrap_or(Value::Null);

        let (narrative, metering) = retry_stage(retry, || provider.summarize_section(&text, &attributes)).await?;

        let mut citations = citations::extract_citations(&narrative, &section.page_ids);
        if citations.is_empty() {
            citations = section.page_ids.clone();
        }

        section_blocks.push(section_markdown(&section, &narrative, &citations));

        let mut stage_metering = Metering::new();
        stage_metering.insert("summarization".to_string(), metering);
        doc.merge_metering(&stage_metering);
    }

    let mut document_md = String::from("# Document Summary\n\n");
    document_md.push_str(&table_of_contents(&doc.sections));
    document_md.push('\n');
    for block in section_blocks {
        document_md.push_str(&block);
        document_md.push('\n');
    }

    let key = format!("{}/summary/summary.md", doc.id);
    let uri = blobs.put(&key, document_md.as_bytes(), "text/markdown").await?;
    doc.summary_uri = Some(uri);

    info!(document_id = %doc.id, sections = doc.sections.len(), "summarization complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use idp_blob_store::InMemoryBlobStore;
    use idp_core::StageError;
    use idp_document::{Location, Page};
    use idp_providers::ProviderMetering;
    use serde_json::json;

    struct FixedSummarizer;

    #[async_trait]
    impl SummarizationProvider for FixedSummarizer {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn summarize_section(
            &self,
            _section_text: &str,
            _attributes: &Value,
        ) -> Result<(String, ProviderMetering), StageError> {
            Ok(("An invoice from Acme totaling $500 [p:1].".to_string(), ProviderMetering::new()))
        }
    }

    fn doc_with_section() -> Document {
        let mut doc = Document::new(
            "doc-1",
            Location { bucket: "in".to_string(), key: "a.pdf".to_string() },
            "out/doc-1",
        );
        let mut page = Page::new("1");
        page.parsed_text_uri = Some("doc-1/pages/1/text.md".to_string());
        doc.pages.insert("1".to_string(), page);
        doc.sections.push(Section {
            section_id: "1".to_string(),
            classification: "invoice".to_string(),
            confidence: 0.9,
            page_ids: vec!["1".to_string()],
            extraction_uri: None,
            attributes: Some(json!({"vendor": "Acme", "total": 500})),
        });
        doc
    }

    #[tokio::test]
    async fn writes_document_summary_and_sets_uri() {
        let mut doc = doc_with_section();
        let blobs = InMemoryBlobStore::new();
        blobs.put("doc-1/pages/1/text.md", b"Invoice from Acme, total $500.", "text/markdown").await.unwrap();

        run(&mut doc, &blobs, &FixedSummarizer, &RetryConfig::default()).await.unwrap();

        assert!(doc.summary_uri.is_some());
        let bytes = blobs.get(doc.summary_uri.as_deref().unwrap()).await.unwrap();
        let md = String::from_utf8(bytes).unwrap();
        assert!(md.contains("Table of Contents"));
        assert!(md.contains("page 1"));
    }
}
