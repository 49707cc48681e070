//! Provider capability traits and the stage+name registry that replaces the
//! source system's decorator-based provider registration (§9).

mod registry;
mod traits;
mod types;

pub use registry::{ProviderRegistry, RegistryError};
pub use traits::{
    AssessmentProvider, ClassificationProvider, EvaluationProvider, ExtractionProvider,
    OcrProvider, RuleValidationProvider, SummarizationProvider,
};
pub use types::{
    AssessmentResult, AttributeSchema, ClassificationOutput, Fact, FewShotExample, OcrBlock,
    OcrResult, PageLabel, PageRangeLabel, PageText, ProviderMetering, RuleValidationRequest,
    ExtractionRequest,
};
