//! Citation extraction: narratives cite pages with a `[p:ID]` marker. Every
//! marker is validated against the section's own page ids so a narrative
//! can never cite a page it didn't come from (§4.8: never invent content).

use regex::Regex;
use std::collections::BTreeSet;

/// Extract the sorted, deduplicated set of page ids cited in `narrative`
/// that are also present in `valid_page_ids`. Citations outside that set are
/// silently dropped rather than surfaced, since they'd be fabricated pages.
pub fn extract_citations(narrative: &str, valid_page_ids: &[String]) -> Vec<String> {
    let marker = Regex::new(r"\[p:([^\]]+)\]").expect("static pattern");
    let valid: BTreeSet<&str> = valid_page_ids.iter().map(String::as_str).collect();

    let cited: BTreeSet<String> = marker
        .captures_iter(narrative)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .filter(|id| valid.contains(id.as_str()))
        .collect();

    cited.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_valid_citations_only() {
        let narrative = "The invoice total is $500 [p:1]. The vendor is Acme [p:2].";
        let valid = vec!["1".to_string(), "2".to_string()];
        assert_eq!(extract_citations(narrative, &valid), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn drops_citations_to_pages_outside_the_section() {
        let narrative = "Mentions page [p:99] which isn't part of this section.";
        let valid = vec!["1".to_string()];
        assert!(extract_citations(narrative, &valid).is_empty());
    }

    #[test]
    fn deduplicates_repeated_citations() {
        let narrative = "[p:1] again [p:1] and [p:1]";
        let valid = vec!["1".to_string()];
        assert_eq!(extract_citations(narrative, &valid), vec!["1".to_string()]);
    }
}
