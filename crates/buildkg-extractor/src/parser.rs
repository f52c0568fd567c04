//! Parse LLM output into extraction payloads

use buildkg_graph::ExtractionPayload;
use serde_json::Value;

use crate::error::ExtractorError;

/// Parse an LLM response into entities and relationships.
///
/// A response wrapped in a markdown code block is unwrapped first. Text that
/// is not JSON fails with [`ExtractorError::JsonParse`]; JSON of the wrong
/// shape fails with [`ExtractorError::InvalidFormat`].
pub fn parse_extraction(response: &str) -> Result<ExtractionPayload, ExtractorError> {
    let json_str = extract_json(response)?;
    let json: Value = serde_json::from_str(&json_str)?;
    ExtractionPayload::from_value(json).map_err(|e| ExtractorError::InvalidFormat(e.to_string()))
}

/// Extract JSON from response, handling markdown code blocks
fn extract_json(response: &str) -> Result<String, ExtractorError> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(ExtractorError::InvalidFormat("Empty code block".to_string()));
        }

        // Skip the opening fence line and the closing fence
        let end = if lines[lines.len() - 1].trim_start().starts_with("```") {
            lines.len() - 1
        } else {
            lines.len()
        };
        Ok(lines[1..end].join("\n"))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let response = r#"{
            "entities": [
                {"_label": "Provision", "id": "B.01.008"},
                {"_label": "Requirement", "description": "Label sodium"}
            ],
            "relationships": [
                {"_label": "DERIVED_FROM", "_from_index": 1, "_to_index": 0}
            ]
        }"#;

        let payload = parse_extraction(response).unwrap();
        assert_eq!(payload.entities.len(), 2);
        assert_eq!(payload.relationships.len(), 1);
        assert_eq!(payload.relationships[0].from_index, Some(1));
    }

    #[test]
    fn test_parse_json_with_markdown_wrapper() {
        let response = "```json\n{\"entities\": [{\"_label\": \"Provision\"}]}\n```";
        let payload = parse_extraction(response).unwrap();
        assert_eq!(payload.entities.len(), 1);
    }

    #[test]
    fn test_parse_empty_arrays() {
        let payload = parse_extraction(r#"{"entities": [], "relationships": []}"#).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_extraction("This is not JSON");
        assert!(matches!(result, Err(ExtractorError::JsonParse(_))));
    }

    #[test]
    fn test_parse_wrong_shape() {
        let result = parse_extraction(r#"[{"_label": "Provision"}]"#);
        assert!(matches!(result, Err(ExtractorError::InvalidFormat(_))));
    }

    #[test]
    fn test_extract_json_from_plain_json() {
        let json = r#"{"key": "value"}"#;
        assert_eq!(extract_json(json).unwrap(), json);
    }

    #[test]
    fn test_extract_json_from_markdown_without_language() {
        let response = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json(response).unwrap(), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_json_unclosed_fence() {
        let response = "```json\n{\"key\": 1}";
        assert_eq!(extract_json(response).unwrap(), r#"{"key": 1}"#);
    }
}
