//! The provider capability set (§6): `{ocr_page, classify_pages,
//! extract_section, assess_section, evaluate_attribute, summarize_section,
//! rule_validate}`. Each stage crate consumes exactly one of these traits
//! through the registry rather than depending on a concrete vendor.

use crate::types::{
    AssessmentResult, ClassificationOutput, Fact, OcrResult, PageText, ProviderMetering,
    RuleValidationRequest, ExtractionRequest,
};
use async_trait::async_trait;
use idp_core::StageError;

#[async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn ocr_page(
        &self,
        image_bytes: &[u8],
    ) -> Result<(OcrResult, ProviderMetering), StageError>;
}

#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn classify_pages(
        &self,
        pages: &[PageText],
    ) -> Result<(ClassificationOutput, ProviderMetering), StageError>;
}

#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn extract_section(
        &self,
        request: &ExtractionRequest,
    ) -> Result<(serde_json::Value, ProviderMetering), StageError>;
}

#[async_trait]
pub trait AssessmentProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn assess_section(
        &self,
        section_text: &str,
        extracted: &serde_json::Value,
    ) -> Result<(AssessmentResult, ProviderMetering), StageError>;
}

/// Only `SEMANTIC` and `LLM` evaluation methods need a provider call; the
/// other methods (`EXACT`, `NUMERIC_EXACT`, `FUZZY`, `LEVENSHTEIN`,
/// `HUNGARIAN`) are computed locally by `idp-evaluation`.
#[async_trait]
pub trait EvaluationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate_attribute(
        &self,
        extracted: &serde_json::Value,
        baseline: &serde_json::Value,
    ) -> Result<(f64, ProviderMetering), StageError>;
}

#[async_trait]
pub trait SummarizationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize_section(
        &self,
        section_text: &str,
        attributes: &serde_json::Value,
    ) -> Result<(String, ProviderMetering), StageError>;
}

#[async_trait]
pub trait RuleValidationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn rule_validate(
        &self,
        request: &RuleValidationRequest,
    ) -> Result<(Vec<Fact>, ProviderMetering), StageError>;
}
