//! Rule Validation Stage (C8, §4.7): fact extraction per section x rule with
//! page-aware chunking, then orchestration consolidating facts into a single
//! recommendation per rule.

mod chunking;
mod consolidate;
mod error;

pub use consolidate::Consolidated;
pub use error::RuleValidationStageError;

use idp_blob_store::{get_with_eventual_consistency_retry, BlobStore, JsonBlobStore};
use idp_core::config::RuleValidationConfig;
use idp_core::{retry_stage, RetryConfig};
use idp_document::{Document, Metering};
use idp_providers::{Fact, PageText, RuleValidationProvider, RuleValidationRequest};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Serialize)]
struct RuleSummaryEntry {
    rule: String,
    recommendation: String,
    supporting_page_ids: Vec<String>,
}

async fn section_pages(
    doc: &Document,
    page_ids: &[String],
    blobs: &dyn BlobStore,
) -> Result<Vec<PageText>, idp_blob_store::BlobError> {
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
    Ok(pages)
}

fn consolidated_markdown(entries: &[RuleSummaryEntry]) -> String {
    let mut md = String::from("# Rule Validation Summary\n\n| Rule | Recommendation | Supporting Pages |\n|---|---|---|\n");
    for entry in entries {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            entry.rule,
            entry.recommendation,
            entry.supporting_page_ids.join(", "),
        ));
    }
    md
}

/// Run fact extraction and orchestration for every configured rule. A no-op
/// when `rules` is empty (§4.1: rule validation is skipped when no rules are
/// configured).
pub async fn run(
    doc: &mut Document,
    rules: &[String],
    blobs: &dyn BlobStore,
    provider: &dyn RuleValidationProvider,
    cfg: &RuleValidationConfig,
    retry: &RetryConfig,
) -> Result<(), RuleValidationStageError> {
    if rules.is_empty() {
        return Ok(());
    }

    let mut facts_by_rule: HashMap<String, Vec<Fact>> = HashMap::new();

    for section in doc.sections.clone() {
        let pages = section_pages(doc, &section.page_ids, blobs).await?;
        let chunks = chunking::build_chunks(&pages, cfg.chunk_overlap_fraction);

        let mut section_facts: HashMap<String, Vec<Fact>> = HashMap::new();
        for rule in rules {
            let request = RuleValidationRequest { rule: rule.clone(), chunks: chunks.clone() };
            let (facts, metering) = retry_stage(retry, || provider.rule_validate(&request)).await?;

            facts_by_rule.entry(rule.clone()).or_default().extend(facts.clone());
            section_facts.insert(rule.clone(), facts);

            let mut stage_metering = Metering::new();
            stage_metering.insert("rule_validation".to_string(), metering);
            doc.merge_metering(&stage_metering);
        }

        let key = format!("{}/rule_validation/sections/{}.json", doc.id, section.section_id);
        blobs.put_json(&key, &section_facts).await?;
    }

    let mut entries = Vec::with_capacity(rules.len());
    for rule in rules {
        let facts = facts_by_rule.remove(rule).unwrap_or_default();
        let consolidated = consolidate::consolidate(facts, &cfg.recommendation_options);
        entries.push(RuleSummaryEntry {
            rule: rule.clone(),
            recommendation: consolidated.recommendation,
            supporting_page_ids: consolidated.supporting_page_ids,
        });
    }

    let summary_key = format!("{}/rule_validation/consolidated/summary.json", doc.id);
    let summary_uri = blobs.put_json(&summary_key, &entries).await?;

    let markdown_key = format!("{}/rule_validation/consolidated/summary.md", doc.id);
    blobs.put(&markdown_key, consolidated_markdown(&entries).as_bytes(), "text/markdown").await?;

    doc.rule_validation_uri = Some(summary_uri);

    info!(document_id = %doc.id, rules = rules.len(), "rule validation complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use idp_blob_store::InMemoryBlobStore;
    use idp_core::StageError;
    use idp_document::{Location, Page, Section};
    use idp_providers::ProviderMetering;

    struct FixedRuleProvider;

    #[async_trait]
    impl RuleValidationProvider for FixedRuleProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn rule_validate(
            &self,
            request: &RuleValidationRequest,
        ) -> Result<(Vec<Fact>, ProviderMetering), StageError> {
            if request.rule == "has_signature" {
                Ok((
                    vec![Fact { text: "Document is signed. Pass.".to_string(), page_ids: vec!["1".to_string()] }],
                    ProviderMetering::new(),
                ))
            } else {
                Ok((vec![], ProviderMetering::new()))
            }
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
            classification: "contract".to_string(),
            confidence: 0.9,
            page_ids: vec!["1".to_string()],
            extraction_uri: None,
            attributes: None,
        });
        doc
    }

    #[tokio::test]
    async fn no_rules_is_a_no_op() {
        let mut doc = doc_with_section();
        let blobs = InMemoryBlobStore::new();
        run(&mut doc, &[], &blobs, &FixedRuleProvider, &RuleValidationConfig::default(), &RetryConfig::default())
            .await
            .unwrap();
        assert!(doc.rule_validation_uri.is_none());
    }

    #[tokio::test]
    async fn consolidates_facts_into_a_recommendation() {
        let mut doc = doc_with_section();
        let blobs = InMemoryBlobStore::new();
        blobs.put("doc-1/pages/1/text.md", b"signed by both parties", "text/markdown").await.unwrap();

        let rules = vec!["has_signature".to_string(), "has_date".to_string()];
        run(&mut doc, &rules, &blobs, &FixedRuleProvider, &RuleValidationConfig::default(), &RetryConfig::default())
            .await
            .unwrap();

        assert!(doc.rule_validation_uri.is_some());
    }
}
