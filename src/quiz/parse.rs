//! Parsing of raw model completions into [`QuestionRecord`]s.
//!
//! The model is asked for a bare JSON object but routinely wraps it in a
//! markdown fence (```` ```json ... ``` ````). Field names follow the wire
//! format of the instruction payload, which is Spanish.

use serde_json::{Map, Value};

use crate::error::GenerationError;

use super::record::QuestionRecord;

const FIELD_PROMPT: &str = "Pregunta";
const FIELD_CODE: &str = "Codigo";
const FIELD_OPTIONS: &str = "Respuestas";
const FIELD_CORRECT: &str = "Respuesta correcta";
const FIELD_EXPLANATION: &str = "Explicacion";

const FENCE: &str = "```";

/// Trim the completion and strip one leading (optionally tagged) and one
/// trailing markdown fence.
pub fn strip_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix(FENCE) {
        // Language tag such as `json` directly after the fence.
        body = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    }
    if let Some(rest) = body.strip_suffix(FENCE) {
        body = rest;
    }
    body.trim()
}

/// Parse a completion into a record.
///
/// Only decoding failures are reported here; structural completeness is the
/// validator's job.
pub fn parse_completion(text: &str) -> Result<QuestionRecord, GenerationError> {
    let body = strip_fences(text);
    let value: Value = serde_json::from_str(body).map_err(|e| GenerationError::Parse {
        detail: e.to_string(),
        raw: text.to_string(),
    })?;
    let Value::Object(fields) = value else {
        return Err(GenerationError::Parse {
            detail: "expected a JSON object".to_string(),
            raw: text.to_string(),
        });
    };

    Ok(QuestionRecord {
        prompt_text: string_field(&fields, FIELD_PROMPT),
        code_block: string_field(&fields, FIELD_CODE),
        answer_options: normalize_options(fields.get(FIELD_OPTIONS)),
        correct_answer: string_field(&fields, FIELD_CORRECT),
        explanation: string_field(&fields, FIELD_EXPLANATION),
    })
}

/// Comma-joined strings are split and trimmed, arrays are kept as they are,
/// anything else becomes an empty list.
pub fn normalize_options(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(joined)) => joined.split(',').map(|s| s.trim().to_string()).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FENCED: &str = "```json\n{\"Pregunta\":\"Q\",\"Codigo\":\"c\",\"Respuestas\":[\"1\",\"2\",\"3\",\"4\"],\"Respuesta correcta\":\"2\",\"Explicacion\":\"e\"}\n```";

    #[test]
    fn test_strip_fences_tagged() {
        assert_eq!(strip_fences("```json\n{}\n```"), "{}");
    }

    #[test]
    fn test_strip_fences_untagged() {
        assert_eq!(strip_fences("  ```\n{\"a\":1}\n```  "), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_leaves_bare_json() {
        assert_eq!(strip_fences(" {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_trailing_only() {
        assert_eq!(strip_fences("{}\n```"), "{}");
    }

    #[test]
    fn test_parse_fenced_completion() {
        let record = parse_completion(FENCED).unwrap();
        assert_eq!(record.prompt_text, "Q");
        assert_eq!(record.code_block, "c");
        assert_eq!(record.correct_answer, "2");
        assert_eq!(record.answer_options, vec!["1", "2", "3", "4"]);
        assert_eq!(record.explanation, "e");
    }

    #[test]
    fn test_parse_non_json_is_parse_failure() {
        let err = parse_completion("Sorry, I cannot help with that.").unwrap_err();
        match err {
            GenerationError::Parse { raw, .. } => {
                assert_eq!(raw, "Sorry, I cannot help with that.")
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_json_array_is_parse_failure() {
        assert!(matches!(
            parse_completion("[1, 2, 3]"),
            Err(GenerationError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let record = parse_completion(r#"{"Pregunta":"Q"}"#).unwrap();
        assert_eq!(record.prompt_text, "Q");
        assert!(record.code_block.is_empty());
        assert!(record.answer_options.is_empty());
        assert!(record.explanation.is_empty());
    }

    #[test]
    fn test_normalize_comma_joined_options() {
        let value = json!("a , b,c ,  d");
        assert_eq!(normalize_options(Some(&value)), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_normalize_other_shapes_to_empty() {
        assert!(normalize_options(Some(&json!({"a": 1}))).is_empty());
        assert!(normalize_options(Some(&json!(42))).is_empty());
        assert!(normalize_options(None).is_empty());
    }

    #[test]
    fn test_normalize_non_string_items_keep_json_text() {
        let value = json!([1, "2", true, null]);
        assert_eq!(
            normalize_options(Some(&value)),
            vec!["1", "2", "true", "null"]
        );
    }
}
