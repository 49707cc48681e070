//! Per-field comparators (§4.7): local string/number comparisons plus a
//! provider-backed path for `SEMANTIC`/`LLM`.

use idp_core::config::EvaluationMethod;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldScore {
    pub score: f64,
    pub passed: bool,
}

fn as_comparable_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn default_threshold(method: EvaluationMethod) -> f64 {
    match method {
        EvaluationMethod::Exact | EvaluationMethod::NumericExact => 1.0,
        EvaluationMethod::Fuzzy | EvaluationMethod::Semantic | EvaluationMethod::Llm | EvaluationMethod::Hungarian => 0.8,
        EvaluationMethod::Levenshtein => 2.0,
    }
}

/// Compare two values locally for every method except `SEMANTIC`/`LLM`
/// (which need a provider round-trip) and `HUNGARIAN` (handled separately
/// for array fields).
pub fn compare_local(
    method: EvaluationMethod,
    extracted: &serde_json::Value,
    baseline: &serde_json::Value,
    threshold: f64,
) -> FieldScore {
    match method {
        EvaluationMethod::Exact => {
            let score = if as_comparable_string(extracted) == as_comparable_string(baseline) { 1.0 } else { 0.0 };
            FieldScore { score, passed: score >= threshold }
        }
        EvaluationMethod::NumericExact => {
            let e = extracted.as_f64().or_else(|| extracted.as_str().and_then(|s| s.parse().ok()));
            let b = baseline.as_f64().or_else(|| baseline.as_str().and_then(|s| s.parse().ok()));
            let score = match (e, b) {
                (Some(e), Some(b)) if (e - b).abs() < 1e-9 => 1.0,
                _ => 0.0,
            };
            FieldScore { score, passed: score >= threshold }
        }
        EvaluationMethod::Fuzzy => {
            let score = strsim::normalized_levenshtein(&as_comparable_string(extracted), &as_comparable_string(baseline));
            FieldScore { score, passed: score >= threshold }
        }
        EvaluationMethod::Levenshtein => {
            let distance = strsim::levenshtein(&as_comparable_string(extracted), &as_comparable_string(baseline)) as f64;
            FieldScore { score: distance, passed: distance <= threshold }
        }
        EvaluationMethod::Semantic | EvaluationMethod::Llm | EvaluationMethod::Hungarian => {
            unreachable!("compare_local does not handle provider/array methods")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_requires_identical_strings() {
        let score = compare_local(EvaluationMethod::Exact, &json!("Acme"), &json!("Acme"), 1.0);
        assert!(score.passed);
        let score = compare_local(EvaluationMethod::Exact, &json!("Acme"), &json!("acme"), 1.0);
        assert!(!score.passed);
    }

    #[test]
    fn numeric_exact_tolerates_float_noise() {
        let score = compare_local(EvaluationMethod::NumericExact, &json!(10.0000000001), &json!(10.0), 1.0);
        assert!(score.passed);
    }

    #[test]
    fn fuzzy_passes_near_matches() {
        let score = compare_local(EvaluationMethod::Fuzzy, &json!("Acme Corp"), &json!("Acme Corp."), 0.8);
        assert!(score.passed);
    }

    #[test]
    fn levenshtein_is_a_distance_not_a_similarity() {
        let score = compare_local(EvaluationMethod::Levenshtein, &json!("cat"), &json!("bat"), 2.0);
        assert_eq!(score.score, 1.0);
        assert!(score.passed);
    }
}
