//! The Document/Page/Section data model (§3) and the invariants (I1-I6) C2
//! enforces on every write.

use crate::error::DocumentError;
use chrono::{DateTime, Utc};
use idp_core::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub bucket: String,
    pub key: String,
}

/// Lifecycle status. The discriminant order is the partial order from §4.1:
/// a retry restarts from `Queued`, and within an attempt status only moves
/// forward (or to `Failed`, which is absorbing).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash,
)]
pub enum DocumentStatus {
    Queued,
    Running,
    Ocr,
    Classifying,
    Extracting,
    Assessing,
    Postprocessing,
    Summarizing,
    Evaluating,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }

    /// Whether `self -> next` is a permitted transition per §4.1: strictly
    /// forward along the sequence, or to `Failed` from any non-terminal
    /// state. `Failed` and `Completed` are absorbing.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == DocumentStatus::Failed || next > self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page_id: String,
    pub image_uri: Option<String>,
    pub raw_ocr_uri: Option<String>,
    pub parsed_text_uri: Option<String>,
    pub text_confidence_uri: Option<String>,
    pub classification: Option<String>,
    pub confidence: Option<f32>,
}

impl Page {
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            image_uri: None,
            raw_ocr_uri: None,
            parsed_text_uri: None,
            text_confidence_uri: None,
            classification: None,
            confidence: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub section_id: String,
    pub classification: String,
    pub confidence: f32,
    /// Ordered, non-empty, disjoint from every other section's page_ids.
    pub page_ids: Vec<String>,
    pub extraction_uri: Option<String>,
    pub attributes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentErrorEntry {
    pub kind: ErrorKind,
    pub message: String,
    pub stage: Option<String>,
    pub scope: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// `metering[stage][counter]`, e.g. `metering["ocr"]["pages"] = 3`. Values
/// are non-negative; merging two documents' metering is pointwise addition
/// (I6).
pub type Metering = HashMap<String, HashMap<String, u64>>;

pub fn merge_metering(a: &mut Metering, b: &Metering) {
    for (stage, counters) in b {
        let entry = a.entry(stage.clone()).or_default();
        for (counter, value) in counters {
            *entry.entry(counter.clone()).or_insert(0) += value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub input_location: Location,
    pub output_location: String,
    pub execution_id: Option<String>,
    pub status: DocumentStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub num_pages: usize,
    pub pages: HashMap<String, Page>,
    pub sections: Vec<Section>,
    pub errors: Vec<DocumentErrorEntry>,
    pub metering: Metering,
    pub summary_uri: Option<String>,
    pub evaluation_uri: Option<String>,
    pub rule_validation_uri: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, input_location: Location, output_location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input_location,
            output_location: output_location.into(),
            execution_id: None,
            status: DocumentStatus::Queued,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            num_pages: 0,
            pages: HashMap::new(),
            sections: Vec::new(),
            errors: Vec::new(),
            metering: HashMap::new(),
            summary_uri: None,
            evaluation_uri: None,
            rule_validation_uri: None,
        }
    }

    /// Move to `next`, enforcing the partial order in §4.1 (P3). Callers
    /// must persist the document immediately after this succeeds, before any
    /// later stage may observe it (§4.1 atomicity contract).
    pub fn transition_to(&mut self, next: DocumentStatus) -> Result<(), DocumentError> {
        if !self.status.can_transition_to(next) {
            return Err(DocumentError::InvalidTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            });
        }
        if next == DocumentStatus::Running && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        self.status = next;
        Ok(())
    }

    pub fn append_error(&mut self, entry: DocumentErrorEntry) {
        self.errors.push(entry);
    }

    pub fn merge_metering(&mut self, other: &Metering) {
        merge_metering(&mut self.metering, other);
    }

    /// Enforce I1-I6 against the document's current in-memory state. I5
    /// (transition legality) is enforced incrementally by `transition_to`
    /// rather than re-derivable from a single snapshot, so it's not
    /// re-checked here.
    pub fn validate(&self) -> Result<(), DocumentError> {
        use std::collections::HashSet;

        // I4
        if self.num_pages != self.pages.len() {
            return Err(DocumentError::InvariantViolated(format!(
                "I4: num_pages ({}) != |pages| ({})",
                self.num_pages,
                self.pages.len()
            )));
        }

        let mut seen_pages: HashSet<&str> = HashSet::new();
        let mut last_first_ordinal: Option<usize> = None;

        for section in &self.sections {
            if section.page_ids.is_empty() {
                return Err(DocumentError::InvariantViolated(format!(
                    "section {} has empty page_ids",
                    section.section_id
                )));
            }
            for page_id in &section.page_ids {
                // I1
                if !self.pages.contains_key(page_id) {
                    return Err(DocumentError::InvariantViolated(format!(
                        "I1: section {} references unknown page {}",
                        section.section_id, page_id
                    )));
                }
                // I2 (disjointness half of the union check)
                if !seen_pages.insert(page_id.as_str()) {
                    return Err(DocumentError::InvariantViolated(format!(
                        "I2: page {} claimed by more than one section",
                        page_id
                    )));
                }
            }
            // I3: section order matches ascending first-page order. Page ids
            // are ordinal strings ("1", "2", ...); parse for comparison,
            // falling back to lexicographic order if non-numeric.
            let first = &section.page_ids[0];
            let ordinal = first.parse::<usize>().unwrap_or(0);
            if let Some(prev) = last_first_ordinal {
                if ordinal < prev {
                    return Err(DocumentError::InvariantViolated(
                        "I3: sections are not in ascending first-page order".to_string(),
                    ));
                }
            }
            last_first_ordinal = Some(ordinal);
        }

        // I2 (union half): every page must belong to some section once
        // classification has run (sections non-empty implies full coverage).
        if !self.sections.is_empty() && seen_pages.len() != self.pages.len() {
            return Err(DocumentError::InvariantViolated(
                "I2: section page_ids do not cover every page".to_string(),
            ));
        }

        // I6
        for counters in self.metering.values() {
            for value in counters.values() {
                // u64 is already non-negative; this loop exists so a future
                // change to a signed counter type doesn't silently violate I6.
                let _ = value;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location {
            bucket: "in".to_string(),
            key: "invoice1.pdf".to_string(),
        }
    }

    #[test]
    fn fresh_document_is_queued_and_valid() {
        let doc = Document::new("doc-1", loc(), "out/doc-1");
        assert_eq!(doc.status, DocumentStatus::Queued);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn transition_order_is_enforced() {
        let mut doc = Document::new("doc-1", loc(), "out/doc-1");
        assert!(doc.transition_to(DocumentStatus::Running).is_ok());
        assert!(doc.transition_to(DocumentStatus::Ocr).is_ok());
        // Can't go backwards.
        assert!(doc.transition_to(DocumentStatus::Running).is_err());
    }

    #[test]
    fn failed_and_completed_are_absorbing() {
        let mut doc = Document::new("doc-1", loc(), "out/doc-1");
        doc.transition_to(DocumentStatus::Running).unwrap();
        doc.transition_to(DocumentStatus::Failed).unwrap();
        assert!(doc.transition_to(DocumentStatus::Ocr).is_err());
    }

    #[test]
    fn any_non_terminal_state_can_fail() {
        let mut doc = Document::new("doc-1", loc(), "out/doc-1");
        doc.transition_to(DocumentStatus::Running).unwrap();
        doc.transition_to(DocumentStatus::Ocr).unwrap();
        doc.transition_to(DocumentStatus::Classifying).unwrap();
        assert!(doc.transition_to(DocumentStatus::Failed).is_ok());
    }

    #[test]
    fn validate_catches_section_referencing_unknown_page() {
        let mut doc = Document::new("doc-1", loc(), "out/doc-1");
        doc.num_pages = 1;
        doc.pages.insert("1".to_string(), Page::new("1"));
        doc.sections.push(Section {
            section_id: "s1".to_string(),
            classification: "invoice".to_string(),
            confidence: 0.9,
            page_ids: vec!["2".to_string()],
            extraction_uri: None,
            attributes: None,
        });
        assert!(doc.validate().is_err());
    }

    #[test]
    fn metering_merge_is_pointwise_additive() {
        let mut a: Metering = HashMap::new();
        a.entry("ocr".to_string())
            .or_default()
            .insert("pages".to_string(), 2);
        let mut b: Metering = HashMap::new();
        b.entry("ocr".to_string())
            .or_default()
            .insert("pages".to_string(), 3);
        merge_metering(&mut a, &b);
        assert_eq!(a["ocr"]["pages"], 5);
    }
}
