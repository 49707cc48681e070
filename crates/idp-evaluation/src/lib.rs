//! Evaluation Stage (C8, §4.7): compare extracted attributes against a
//! baseline record using per-field methods, producing a confusion matrix
//! and derived precision/recall/F1.

mod comparators;
mod hungarian;

pub use comparators::{compare_local, default_threshold, FieldScore};
pub use hungarian::match_by_similarity;

use idp_blob_store::{BlobStore, JsonBlobStore};
use idp_core::config::{EvaluationConfig, EvaluationMethod};
use idp_core::{retry_stage, ErrorKind, RetryConfig, StageError};
use idp_document::Document;
use idp_providers::EvaluationProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum EvaluationStageError {
    #[error(transparent)]
    Provider(#[from] StageError),

    #[error(transparent)]
    Blob(#[from] idp_blob_store::BlobError),

    #[error(transparent)]
    Document(#[from] idp_document::DocumentError),

    #[error("field '{0}' is configured for SEMANTIC/LLM evaluation but no evaluation provider was wired")]
    MissingProvider(String),
}

impl EvaluationStageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvaluationStageError::Provider(e) => e.kind,
            EvaluationStageError::Blob(e) => e.kind(),
            EvaluationStageError::Document(e) => e.kind(),
            EvaluationStageError::MissingProvider(_) => ErrorKind::PermanentInput,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldResult {
    pub field: String,
    pub score: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: u64,
    pub false_positive: u64,
    pub false_negative: u64,
    pub true_negative: u64,
}

impl ConfusionMatrix {
    pub fn precision(&self) -> f64 {
        let denom = (self.true_positive + self.false_positive) as f64;
        if denom == 0.0 { 0.0 } else { self.true_positive as f64 / denom }
    }

    pub fn recall(&self) -> f64 {
        let denom = (self.true_positive + self.false_negative) as f64;
        if denom == 0.0 { 0.0 } else { self.true_positive as f64 / denom }
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub fields: Vec<FieldResult>,
    pub confusion: ConfusionMatrix,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

fn extracted_value<'a>(doc: &'a Document, field: &str) -> Option<&'a serde_json::Value> {
    doc.sections.iter().find_map(|s| s.attributes.as_ref().and_then(|a| a.get(field)))
}

/// Run evaluation against `baseline`, writing `{document_id}/evaluation/result.json`
/// and setting `document.evaluation_uri`.
pub async fn run(
    doc: &mut Document,
    baseline: &serde_json::Value,
    cfg: &EvaluationConfig,
    provider: Option<&dyn EvaluationProvider>,
    blobs: &dyn BlobStore,
    retry: &RetryConfig,
) -> Result<EvaluationResult, EvaluationStageError> {
    let mut fields = Vec::new();
    let mut confusion = ConfusionMatrix::default();

    for (field, method) in &cfg.methods {
        let threshold = cfg.thresholds.get(field).copied().unwrap_or_else(|| default_threshold(*method));
        let extracted = extracted_value(doc, field);
        let baseline_value = baseline.get(field);

        match (extracted, baseline_value) {
            (None, None) => confusion.true_negative += 1,
            (Some(_), None) => {
                confusion.false_positive += 1;
                fields.push(FieldResult { field: field.clone(), score: 0.0, passed: false });
            }
            (None, Some(_)) => {
                confusion.false_negative += 1;
                fields.push(FieldResult { field: field.clone(), score: 0.0, passed: false });
            }
            (Some(extracted), Some(baseline_value)) => {
                let outcome = if *method == EvaluationMethod::Hungarian {
                    evaluate_array_field(extracted, baseline_value, threshold, &mut confusion)
                } else if matches!(method, EvaluationMethod::Semantic | EvaluationMethod::Llm) {
                    let provider = provider.ok_or_else(|| EvaluationStageError::MissingProvider(field.clone()))?;
                    let (score, _metering) =
                        retry_stage(retry, || provider.evaluate_attribute(extracted, baseline_value)).await?;
                    let passed = score >= threshold;
                    if passed { confusion.true_positive += 1 } else { confusion.false_negative += 1 }
                    FieldScore { score, passed }
                } else {
                    let score = compare_local(*method, extracted, baseline_value, threshold);
                    if score.passed { confusion.true_positive += 1 } else { confusion.false_negative += 1 }
                    score
                };
                fields.push(FieldResult { field: field.clone(), score: outcome.score, passed: outcome.passed });
            }
        }
    }

    let result = EvaluationResult {
        precision: confusion.precision(),
        recall: confusion.recall(),
        f1: confusion.f1(),
        fields,
        confusion,
    };

    let key = format!("{}/evaluation/result.json", doc.id);
    let uri = blobs.put_json(&key, &result).await?;
    doc.evaluation_uri = Some(uri);

    let mut metering = idp_document::Metering::new();
    metering.insert("evaluation".to_string(), HashMap::from([("fields".to_string(), result.fields.len() as u64)]));
    doc.merge_metering(&metering);

    info!(document_id = %doc.id, f1 = result.f1, "evaluation complete");
    Ok(result)
}

fn evaluate_array_field(
    extracted: &serde_json::Value,
    baseline: &serde_json::Value,
    threshold: f64,
    confusion: &mut ConfusionMatrix,
) -> FieldScore {
    let extracted_arr = extracted.as_array().cloned().unwrap_or_default();
    let baseline_arr = baseline.as_array().cloned().unwrap_or_default();

    let similarity = |e: usize, b: usize| {
        strsim::normalized_levenshtein(&extracted_arr[e].to_string(), &baseline_arr[b].to_string())
    };
    let pairs = match_by_similarity(extracted_arr.len(), baseline_arr.len(), similarity);

    let mut matched_extracted = vec![false; extracted_arr.len()];
    let mut matched_baseline = vec![false; baseline_arr.len()];
    let mut total_score = 0.0;

    for (e, b, score) in &pairs {
        matched_extracted[*e] = true;
        matched_baseline[*b] = true;
        total_score += score;
        if *score >= threshold {
            confusion.true_positive += 1;
        } else {
            confusion.false_negative += 1;
        }
    }
    confusion.false_positive += matched_extracted.iter().filter(|m| !**m).count() as u64;
    confusion.false_negative += matched_baseline.iter().filter(|m| !**m).count() as u64;

    let score = if pairs.is_empty() { 0.0 } else { total_score / pairs.len() as f64 };
    FieldScore { score, passed: score >= threshold }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idp_blob_store::InMemoryBlobStore;
    use idp_document::{Location, Section};
    use serde_json::json;

    fn doc_with_attrs(attrs: serde_json::Value) -> Document {
        let mut doc = Document::new(
            "doc-1",
            Location { bucket: "in".to_string(), key: "a.pdf".to_string() },
            "out/doc-1",
        );
        doc.sections.push(Section {
            section_id: "1".to_string(),
            classification: "invoice".to_string(),
            confidence: 0.9,
            page_ids: vec!["1".to_string()],
            extraction_uri: None,
            attributes: Some(attrs),
        });
        doc
    }

    #[tokio::test]
    async fn exact_match_is_a_true_positive() {
        let mut doc = doc_with_attrs(json!({"vendor": "Acme"}));
        let baseline = json!({"vendor": "Acme"});
        let mut cfg = EvaluationConfig::default();
        cfg.methods.insert("vendor".to_string(), EvaluationMethod::Exact);
        let blobs = InMemoryBlobStore::new();

        let result = run(&mut doc, &baseline, &cfg, None, &blobs, &RetryConfig::default()).await.unwrap();
        assert_eq!(result.confusion.true_positive, 1);
        assert_eq!(result.f1, 1.0);
        assert!(doc.evaluation_uri.is_some());
    }

    #[tokio::test]
    async fn missing_baseline_field_is_a_false_positive() {
        let mut doc = doc_with_attrs(json!({"vendor": "Acme"}));
        let baseline = json!({});
        let mut cfg = EvaluationConfig::default();
        cfg.methods.insert("vendor".to_string(), EvaluationMethod::Exact);
        let blobs = InMemoryBlobStore::new();

        let result = run(&mut doc, &baseline, &cfg, None, &blobs, &RetryConfig::default()).await.unwrap();
        assert_eq!(result.confusion.false_positive, 1);
    }

    #[tokio::test]
    async fn hungarian_matches_array_elements() {
        let mut doc = doc_with_attrs(json!({"line_items": [{"sku": "A"}, {"sku": "B"}]}));
        let baseline = json!({"line_items": [{"sku": "A"}, {"sku": "B"}]});
        let mut cfg = EvaluationConfig::default();
        cfg.methods.insert("line_items".to_string(), EvaluationMethod::Hungarian);
        let blobs = InMemoryBlobStore::new();

        let result = run(&mut doc, &baseline, &cfg, None, &blobs, &RetryConfig::default()).await.unwrap();
        assert_eq!(result.confusion.true_positive, 2);
    }

    #[tokio::test]
    async fn semantic_method_without_a_provider_is_a_missing_provider_error() {
        let mut doc = doc_with_attrs(json!({"vendor": "Acme"}));
        let baseline = json!({"vendor": "Acme Inc"});
        let mut cfg = EvaluationConfig::default();
        cfg.methods.insert("vendor".to_string(), EvaluationMethod::Semantic);
        let blobs = InMemoryBlobStore::new();

        let err = run(&mut doc, &baseline, &cfg, None, &blobs, &RetryConfig::default()).await.unwrap_err();
        assert!(matches!(err, EvaluationStageError::MissingProvider(field) if field == "vendor"));
    }
}
