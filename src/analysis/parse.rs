//! Two-stage parsing of model output.
//!
//! Stage one is a strict JSON parse of the whole response. Stage two, [`parse_bracketed`], is
//! a named fallback that looks for the largest `{…}` or `[…]` span inside free text (models
//! like to wrap JSON in prose or code fences). Anything else degrades to raw text.

use serde_json::Value;

use super::types::ModelOutput;

/// Parse backend text into a [`ModelOutput`]. Never fails.
pub fn parse_model_text(text: &str) -> ModelOutput {
    let trimmed = text.trim();
    if let Some(value) = parse_strict(trimmed) {
        return ModelOutput::Structured(value);
    }
    if let Some(value) = parse_bracketed(trimmed) {
        tracing::debug!("Recovered structured output from surrounding text");
        return ModelOutput::Structured(value);
    }
    ModelOutput::Raw(trimmed.to_string())
}

/// Strict stage: the whole text must be a JSON object or array.
fn parse_strict(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|value| value.is_object() || value.is_array())
}

/// Fallback stage: parse the largest bracket-delimited span.
///
/// Candidates run from the first opening bracket to the last matching closing bracket, for
/// both `{}` and `[]`; the longer span is tried first.
pub fn parse_bracketed(text: &str) -> Option<Value> {
    let mut candidates: Vec<&str> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| outer_span(text, open, close))
        .collect();
    candidates.sort_by_key(|span| std::cmp::Reverse(span.len()));
    candidates.into_iter().find_map(parse_strict)
}

fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plain_json() {
        let output = parse_model_text(" {\"bullets\": []} ");
        assert_eq!(output, ModelOutput::Structured(json!({ "bullets": [] })));
    }

    #[test]
    fn recovers_json_wrapped_in_prose_and_fences() {
        let text = "Here you go:\n```json\n{\"summary\": [{\"text\": \"Fees\"}]}\n```\nThanks!";
        let output = parse_model_text(text);
        assert_eq!(
            output,
            ModelOutput::Structured(json!({ "summary": [{ "text": "Fees" }] }))
        );
    }

    #[test]
    fn prefers_the_larger_array_span() {
        let text = r#"Risks: [{"type": "A"}, {"type": "B"}] end"#;
        let output = parse_model_text(text);
        assert_eq!(
            output,
            ModelOutput::Structured(json!([{ "type": "A" }, { "type": "B" }]))
        );
    }

    #[test]
    fn degrades_to_raw_text() {
        let output = parse_model_text("  I could not find anything {broken  ");
        assert_eq!(
            output,
            ModelOutput::Raw("I could not find anything {broken".into())
        );
    }

    #[test]
    fn scalar_json_is_treated_as_raw_text() {
        assert_eq!(parse_model_text("42"), ModelOutput::Raw("42".into()));
    }
}
