//! Orchestration sub-stage (§4.7 step 2): consolidate a rule's per-section
//! facts into a single recommendation plus the sorted union of supporting
//! page ids.

use idp_providers::Fact;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Consolidated {
    pub recommendation: String,
    pub supporting_page_ids: Vec<String>,
    pub facts: Vec<Fact>,
}

fn information_not_found(options: &[String]) -> String {
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case("information not found"))
        .cloned()
        .unwrap_or_else(|| options.first().cloned().unwrap_or_default())
}

/// Derive a recommendation from the consolidated fact text. No facts means
/// no evidence was found for the rule. With facts, the first configured
/// option whose label appears (case-insensitively) in any fact's text wins;
/// falling through to `information_not_found` keeps the result a safe default
/// rather than guessing.
pub fn consolidate(rule_facts: Vec<Fact>, options: &[String]) -> Consolidated {
    let unique_page_ids: HashSet<String> =
        rule_facts.iter().flat_map(|f| f.page_ids.iter().cloned()).collect();
    let mut supporting_page_ids: Vec<String> = unique_page_ids.into_iter().collect();
    supporting_page_ids.sort_by_key(|id| id.parse::<usize>().unwrap_or(0));

    let recommendation = if rule_facts.is_empty() {
        information_not_found(options)
    } else {
        let haystack = rule_facts.iter().map(|f| f.text.to_lowercase()).collect::<Vec<_>>().join(" ");
        options
            .iter()
            .find(|o| haystack.contains(&o.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| information_not_found(options))
    };

    Consolidated {
        recommendation,
        supporting_page_ids,
        facts: rule_facts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Vec<String> {
        vec!["Pass".to_string(), "Fail".to_string(), "Information Not Found".to_string()]
    }

    #[test]
    fn no_facts_is_information_not_found() {
        let result = consolidate(vec![], &opts());
        assert_eq!(result.recommendation, "Information Not Found");
        assert!(result.supporting_page_ids.is_empty());
    }

    #[test]
    fn matches_configured_option_in_fact_text() {
        let facts = vec![Fact { text: "The policy clearly states Fail on late filings.".to_string(), page_ids: vec!["3".to_string()] }];
        let result = consolidate(facts, &opts());
        assert_eq!(result.recommendation, "Fail");
        assert_eq!(result.supporting_page_ids, vec!["3".to_string()]);
    }

    #[test]
    fn supporting_pages_are_a_sorted_union() {
        let facts = vec![
            Fact { text: "Pass criteria met".to_string(), page_ids: vec!["5".to_string(), "2".to_string()] },
            Fact { text: "confirmed elsewhere".to_string(), page_ids: vec!["2".to_string(), "1".to_string()] },
        ];
        let result = consolidate(facts, &opts());
        assert_eq!(result.supporting_page_ids, vec!["1".to_string(), "2".to_string(), "5".to_string()]);
    }

    #[test]
    fn supporting_pages_sort_numerically_past_single_digits() {
        let facts = vec![
            Fact { text: "Pass criteria met".to_string(), page_ids: vec!["10".to_string(), "2".to_string()] },
            Fact { text: "confirmed elsewhere".to_string(), page_ids: vec!["9".to_string(), "1".to_string()] },
        ];
        let result = consolidate(facts, &opts());
        assert_eq!(result.supporting_page_ids, vec!["1".to_string(), "2".to_string(), "9".to_string(), "10".to_string()]);
    }
}
