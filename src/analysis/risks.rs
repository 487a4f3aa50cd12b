//! Risk list extraction and the minimum-count backfill policy.

use serde_json::Value;

use super::types::{ModelOutput, Risk, Severity};

/// Pull valid risk items out of a parsed model output.
///
/// Accepts a bare array or an object with a `risks` array. Items without a category are
/// dropped.
pub(crate) fn collect_risks(output: &ModelOutput) -> Vec<Risk> {
    let ModelOutput::Structured(value) = output else {
        return Vec::new();
    };
    let items: &[Value] = match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("risks")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| serde_json::from_value::<Risk>(item.clone()).ok())
        .filter(|risk| !risk.category.trim().is_empty())
        .map(|mut risk| {
            risk.placeholder = false;
            risk
        })
        .collect()
}

/// Combine the first extraction with the retry so at least `min` risks are reported.
///
/// A retry that reaches the minimum wins outright (truncated to `min`). Otherwise the longer of
/// the two lists is kept (the first one on ties) and padded with [`placeholder_risks`].
pub(crate) fn reconcile(initial: Vec<Risk>, mut retried: Vec<Risk>, min: usize) -> Vec<Risk> {
    if retried.len() >= min {
        retried.truncate(min);
        return retried;
    }
    let mut kept = if retried.len() > initial.len() {
        retried
    } else {
        initial
    };
    backfill(&mut kept, min);
    kept
}

/// Pad `risks` with generic placeholders until it holds `min` items.
pub(crate) fn backfill(risks: &mut Vec<Risk>, min: usize) {
    let needed = min.saturating_sub(risks.len());
    if needed == 0 {
        return;
    }
    tracing::info!(
        found = risks.len(),
        added = needed,
        "Backfilling risk list with generic placeholders"
    );
    let placeholders = placeholder_risks();
    risks.extend(placeholders.iter().cycle().take(needed).cloned());
}

/// Generic, low-confidence risks that apply to most Terms of Service documents.
pub fn placeholder_risks() -> Vec<Risk> {
    vec![
        Risk {
            category: "Data Collection".into(),
            severity: Severity::Medium,
            excerpt: "Standard data collection practices".into(),
            note: "Most services collect user data; review the privacy policy for details.".into(),
            placeholder: true,
        },
        Risk {
            category: "Account Termination".into(),
            severity: Severity::Low,
            excerpt: "Service provider reserves termination rights".into(),
            note: "Your account could be terminated for policy violations.".into(),
            placeholder: true,
        },
        Risk {
            category: "Service Changes".into(),
            severity: Severity::Low,
            excerpt: "Terms may be updated without notice".into(),
            note: "Terms can change; check them periodically.".into(),
            placeholder: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn risk(category: &str) -> Risk {
        Risk {
            category: category.into(),
            severity: Severity::High,
            excerpt: String::new(),
            note: String::new(),
            placeholder: false,
        }
    }

    #[test]
    fn collect_risks_accepts_arrays_and_wrapped_objects() {
        let array = ModelOutput::Structured(json!([
            { "type": "Arbitration", "severity": "High" },
            { "severity": "Low" },
            { "type": "  " }
        ]));
        assert_eq!(collect_risks(&array).len(), 1);

        let wrapped = ModelOutput::Structured(json!({ "risks": [{ "type": "Fees" }] }));
        assert_eq!(collect_risks(&wrapped)[0].category, "Fees");

        assert!(collect_risks(&ModelOutput::Raw("none".into())).is_empty());
        assert!(collect_risks(&ModelOutput::Structured(json!({ "summary": [] }))).is_empty());
    }

    #[test]
    fn collect_risks_ignores_model_supplied_placeholder_flags() {
        let output = ModelOutput::Structured(json!([{ "type": "Fees", "placeholder": true }]));
        assert!(!collect_risks(&output)[0].placeholder);
    }

    #[test]
    fn reconcile_prefers_a_sufficient_retry() {
        let retried = vec![risk("A"), risk("B"), risk("C"), risk("D")];
        let risks = reconcile(vec![risk("X")], retried, 3);
        let categories: Vec<_> = risks.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["A", "B", "C"]);
    }

    #[test]
    fn reconcile_backfills_when_retry_falls_short() {
        let risks = reconcile(vec![risk("Real")], vec![risk("Other")], 3);
        assert_eq!(risks.len(), 3);
        assert_eq!(risks[0].category, "Real");
        assert!(!risks[0].placeholder);
        assert!(risks[1].placeholder && risks[2].placeholder);
        assert_eq!(risks[1].category, "Data Collection");
    }

    #[test]
    fn backfill_cycles_placeholders_for_large_minimums() {
        let mut risks = Vec::new();
        backfill(&mut risks, 5);
        assert_eq!(risks.len(), 5);
        assert_eq!(risks[3].category, risks[0].category);
    }
}
