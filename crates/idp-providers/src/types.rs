//! Request/response shapes shared by the provider traits. Deliberately
//! decoupled from `idp_document`'s `Document`/`Page`/`Section` types: a
//! provider only ever sees the slice of state relevant to one call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrBlock {
    pub text: String,
    /// `(x, y, width, height)` in normalized page coordinates.
    pub bbox: (f32, f32, f32, f32),
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OcrResult {
    pub blocks: Vec<OcrBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    pub page_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLabel {
    pub page_id: String,
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRangeLabel {
    pub first_page_id: String,
    pub last_page_id: String,
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassificationOutput {
    PerPage(Vec<PageLabel>),
    Ranges(Vec<PageRangeLabel>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FewShotExample {
    pub class: String,
    pub attributes_prompt: serde_json::Value,
    pub image_refs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSchema {
    pub name: String,
    pub description: String,
    pub field_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub class: String,
    pub class_description: String,
    pub attributes: Vec<AttributeSchema>,
    pub section_text: String,
    pub few_shot: Vec<FewShotExample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Confidence score per extracted attribute name, in `[0, 1]`.
    pub scores: HashMap<String, f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub text: String,
    pub page_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleValidationRequest {
    pub rule: String,
    /// Page-aware chunks of section text, each carrying the page ids it was
    /// drawn from (§4.7: chunking never splits a page).
    pub chunks: Vec<PageText>,
}

/// Per-call metering counters (request counts, tokens, etc.), merged into
/// the document's `metering` by the orchestrator.
pub type ProviderMetering = HashMap<String, u64>;
