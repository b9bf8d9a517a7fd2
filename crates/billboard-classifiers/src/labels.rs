//! Parsing of classifier responses.

use anyhow::{anyhow, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `{label, score}` pair returned by a classification model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub label: String,
    pub score: f64,
}

impl Label {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Label {
            label: label.into(),
            score,
        }
    }
}

/// Encode binary content as a `data:` URI for the `inputs` field
pub fn data_uri(data: &[u8], mime_type: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

/// Parse a label list. Accepts a flat `[{label, score}]` array or the nested
/// `[[{label, score}]]` form text models return for a single input.
pub fn parse_labels(value: &Value) -> Result<Vec<Label>> {
    let items = value
        .as_array()
        .ok_or_else(|| anyhow!("Expected a JSON array of labels, got: {}", kind(value)))?;

    let flat: Vec<&Value> = match items.first() {
        Some(Value::Array(_)) => items
            .iter()
            .filter_map(Value::as_array)
            .flatten()
            .collect(),
        _ => items.iter().collect(),
    };

    flat.into_iter()
        .map(|item| {
            serde_json::from_value::<Label>(item.clone())
                .map_err(|e| anyhow!("Malformed label entry {}: {}", item, e))
        })
        .collect()
}

/// Pull the transcript out of a speech-to-text response (`{text}`).
pub fn parse_transcript(value: &Value) -> Result<String> {
    value
        .get("text")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("Transcription response has no text field"))
}

/// Pull generated text out of an image-to-text response. Accepts
/// `[{generated_text}]`, `{generated_text}` or `{text}`.
pub fn parse_generated_text(value: &Value) -> Result<String> {
    let object = match value {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| anyhow!("OCR response is an empty array"))?,
        other => other,
    };

    object
        .get("generated_text")
        .or_else(|| object.get("text"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("OCR response has no generated_text field"))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_and_nested_label_lists() {
        let flat = json!([{"label": "nsfw", "score": 0.9}, {"label": "normal", "score": 0.1}]);
        assert_eq!(
            parse_labels(&flat).unwrap(),
            vec![Label::new("nsfw", 0.9), Label::new("normal", 0.1)]
        );

        let nested = json!([[{"label": "toxic", "score": 0.7}]]);
        assert_eq!(parse_labels(&nested).unwrap(), vec![Label::new("toxic", 0.7)]);

        assert!(parse_labels(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn malformed_labels_are_errors() {
        assert!(parse_labels(&json!({"error": "Model is loading"})).is_err());
        assert!(parse_labels(&json!([{"label": "x"}])).is_err());
    }

    #[test]
    fn transcript_and_ocr_shapes() {
        assert_eq!(
            parse_transcript(&json!({"text": " hello world "})).unwrap(),
            "hello world"
        );
        assert!(parse_transcript(&json!([])).is_err());

        assert_eq!(
            parse_generated_text(&json!([{"generated_text": "SALE"}])).unwrap(),
            "SALE"
        );
        assert_eq!(
            parse_generated_text(&json!({"generated_text": "50% off"})).unwrap(),
            "50% off"
        );
        assert!(parse_generated_text(&json!([])).is_err());
    }

    #[test]
    fn data_uri_prefix() {
        assert_eq!(data_uri(b"abc", "image/jpeg"), "data:image/jpeg;base64,YWJj");
    }
}
