//! The resolved configuration surface the core receives at construction.
//!
//! The embedding binary is responsible for merging layered configuration
//! sources (env, file, schema migration) before handing the core a `Config`;
//! none of that inheritance machinery lives here (§1 Non-goals).

use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassificationMethod {
    PageLevel,
    Holistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationMethod {
    Exact,
    NumericExact,
    Fuzzy,
    Levenshtein,
    Semantic,
    Llm,
    Hungarian,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub enable_assessment: bool,
    pub enable_evaluation: bool,
    pub enable_rule_validation: bool,
    pub enable_summarization: bool,
    pub continue_on_section_error: bool,
    pub continue_on_page_error: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_assessment: true,
            enable_evaluation: true,
            enable_rule_validation: true,
            enable_summarization: true,
            continue_on_section_error: true,
            continue_on_page_error: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    pub max_in_flight: usize,
    pub queue_watermark_high: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_in_flight: std::env::var("IDP_MAX_IN_FLIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(16),
            queue_watermark_high: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub threshold_bytes: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: 200 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub method: ClassificationMethod,
    /// Page-label confidence below which a run boundary is considered weak
    /// enough to merge with its neighbor (§4.5).
    pub split_threshold: f32,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            method: ClassificationMethod::PageLevel,
            split_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// `None` means unbounded within admission limits.
    pub concurrency_per_document: Option<usize>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency_per_document: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleValidationConfig {
    pub recommendation_options: Vec<String>,
    pub chunk_overlap_fraction: f32,
}

impl Default for RuleValidationConfig {
    fn default() -> Self {
        Self {
            recommendation_options: vec![
                "Pass".to_string(),
                "Fail".to_string(),
                "Information Not Found".to_string(),
            ],
            chunk_overlap_fraction: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub methods: HashMap<String, EvaluationMethod>,
    pub thresholds: HashMap<String, f64>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            methods: HashMap::new(),
            thresholds: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub model: String,
    pub temperature: f32,
    pub top_k: Option<u32>,
    pub max_tokens: Option<u32>,
    /// Requests-per-second budget enforced by a semaphore-based rate limiter.
    pub rps: f32,
    pub overall_timeout_secs: u64,
    pub per_request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: 0.0,
            top_k: None,
            max_tokens: None,
            rps: 5.0,
            overall_timeout_secs: 600,
            per_request_timeout_secs: 60,
        }
    }
}

/// The fully-resolved configuration the core receives at construction. No
/// module-scope mutable state anywhere downstream reads config any other way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub admission: AdmissionConfig,
    pub retry: RetryConfig,
    pub compression: CompressionConfig,
    pub classification: ClassificationConfig,
    pub extraction: ExtractionConfig,
    pub rule_validation: RuleValidationConfig,
    pub evaluation: EvaluationConfig,
    /// Per-stage provider configuration, keyed by stage name
    /// (`ocr`, `classification`, `extraction`, `assessment`, `evaluation`,
    /// `summarization`, `rule_validation`).
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            admission: AdmissionConfig::default(),
            retry: RetryConfig::default(),
            compression: CompressionConfig::default(),
            classification: ClassificationConfig::default(),
            extraction: ExtractionConfig::default(),
            rule_validation: RuleValidationConfig::default(),
            evaluation: EvaluationConfig::default(),
            providers: HashMap::new(),
        }
    }
}

impl Config {
    pub fn provider(&self, stage: &str) -> ProviderConfig {
        self.providers.get(stage).cloned().unwrap_or_default()
    }
}
