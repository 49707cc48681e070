use idp_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Document(#[from] idp_document::DocumentError),

    #[error(transparent)]
    Ocr(#[from] idp_ocr::OcrStageError),

    #[error(transparent)]
    Classification(#[from] idp_classification::ClassificationStageError),

    #[error(transparent)]
    Assessment(#[from] idp_assessment::AssessmentStageError),

    #[error(transparent)]
    Evaluation(#[from] idp_evaluation::EvaluationStageError),

    #[error(transparent)]
    RuleValidation(#[from] idp_rule_validation::RuleValidationStageError),

    #[error(transparent)]
    Summarization(#[from] idp_summarization::SummarizationStageError),

    #[error("section {section_id} extraction failed: {source}")]
    Section { section_id: String, source: idp_extraction::ExtractionStageError },

    #[error(transparent)]
    Extraction(#[from] idp_extraction::ExtractionStageError),

    #[error("document cancelled")]
    Cancelled,

    #[error("overall execution timeout elapsed")]
    Timeout,
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::Document(e) => e.kind(),
            OrchestratorError::Ocr(e) => e.kind(),
            OrchestratorError::Classification(e) => e.kind(),
            OrchestratorError::Assessment(e) => e.kind(),
            OrchestratorError::Evaluation(e) => e.kind(),
            OrchestratorError::RuleValidation(e) => e.kind(),
            OrchestratorError::Summarization(e) => e.kind(),
            OrchestratorError::Section { source, .. } => source.kind(),
            OrchestratorError::Extraction(e) => e.kind(),
            OrchestratorError::Cancelled => ErrorKind::Cancelled,
            OrchestratorError::Timeout => ErrorKind::TransientIo,
        }
    }
}
