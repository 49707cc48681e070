//! An explicit provider registry initialized at start, keyed by stage and
//! provider name (§9 Design Notes — replacing decorator/runtime class
//! registration). One map per capability, since each capability has a
//! distinct trait object type.

use crate::traits::{
    AssessmentProvider, ClassificationProvider, EvaluationProvider, ExtractionProvider,
    OcrProvider, RuleValidationProvider, SummarizationProvider,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no {stage} provider registered under name '{name}'")]
    NotFound { stage: &'static str, name: String },
}

#[derive(Default)]
pub struct ProviderRegistry {
    ocr: HashMap<String, Arc<dyn OcrProvider>>,
    classification: HashMap<String, Arc<dyn ClassificationProvider>>,
    extraction: HashMap<String, Arc<dyn ExtractionProvider>>,
    assessment: HashMap<String, Arc<dyn AssessmentProvider>>,
    evaluation: HashMap<String, Arc<dyn EvaluationProvider>>,
    summarization: HashMap<String, Arc<dyn SummarizationProvider>>,
    rule_validation: HashMap<String, Arc<dyn RuleValidationProvider>>,
}

macro_rules! capability_accessors {
    ($field:ident, $trait:ty, $stage:literal, $register:ident, $get:ident) => {
        pub fn $register(&mut self, name: impl Into<String>, provider: Arc<$trait>) {
            let name = name.into();
            info!("registering {} provider '{}'", $stage, name);
            self.$field.insert(name, provider);
        }

        pub fn $get(&self, name: &str) -> Result<Arc<$trait>, RegistryError> {
            self.$field
                .get(name)
                .cloned()
                .ok_or_else(|| RegistryError::NotFound {
                    stage: $stage,
                    name: name.to_string(),
                })
        }
    };
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    capability_accessors!(ocr, dyn OcrProvider, "ocr", register_ocr, ocr);
    capability_accessors!(
        classification,
        dyn ClassificationProvider,
        "classification",
        register_classification,
        classification
    );
    capability_accessors!(
        extraction,
        dyn ExtractionProvider,
        "extraction",
        register_extraction,
        extraction
    );
    capability_accessors!(
        assessment,
        dyn AssessmentProvider,
        "assessment",
        register_assessment,
        assessment
    );
    capability_accessors!(
        evaluation,
        dyn EvaluationProvider,
        "evaluation",
        register_evaluation,
        evaluation
    );
    capability_accessors!(
        summarization,
        dyn SummarizationProvider,
        "summarization",
        register_summarization,
        summarization
    );
    capability_accessors!(
        rule_validation,
        dyn RuleValidationProvider,
        "rule_validation",
        register_rule_validation,
        rule_validation
    );
}
