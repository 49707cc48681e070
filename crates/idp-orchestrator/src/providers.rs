//! The resolved provider set a single run is wired with. `ProviderConfig`
//! (idp-core) only carries model/rate-limit settings, not a provider name, so
//! the binary that assembles a run resolves each capability against its own
//! `ProviderRegistry` lookup and hands the orchestrator the result directly.
//! Evaluation's provider is optional: the stage falls back to the configured
//! comparator methods (exact, fuzzy, Hungarian, ...) when none is wired.
//! Rule validation always takes a provider since fact extraction has no
//! local fallback; the stage itself is skipped upstream when no rules are
//! configured for a document.

use idp_providers::{
    AssessmentProvider, ClassificationProvider, EvaluationProvider, ExtractionProvider,
    OcrProvider, RuleValidationProvider, SummarizationProvider,
};
use std::sync::Arc;

pub struct Providers {
    pub ocr: Arc<dyn OcrProvider>,
    pub classification: Arc<dyn ClassificationProvider>,
    pub extraction: Arc<dyn ExtractionProvider>,
    pub assessment: Arc<dyn AssessmentProvider>,
    pub evaluation: Option<Arc<dyn EvaluationProvider>>,
    pub summarization: Arc<dyn SummarizationProvider>,
    pub rule_validation: Arc<dyn RuleValidationProvider>,
}
