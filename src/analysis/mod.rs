//! Model response schema and parsing.

pub mod validate;

pub use validate::{validate_and_repair, RepairStats};

use serde::{Deserialize, Serialize};

use crate::error::CritiqueError;

/// The structured critique the model is asked to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueResponse {
    pub image_description: String,
    pub dimensions: Vec<DimensionAssessment>,
    pub overall_score: f64,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub priority_improvements: Vec<String>,
    #[serde(default)]
    pub technical_notes: String,
}

/// One scored dimension in the critique. The citation fields carry opaque
/// handles until validation resolves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionAssessment {
    pub name: String,
    pub score: f64,
    pub comment: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_study_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,
}

/// Parse the model's raw completion into the critique schema.
///
/// The raw text may wrap the JSON in markdown code fences; anything that
/// still fails to parse is a [`CritiqueError::MalformedModelOutput`] — a
/// reportable condition for the caller, never a crash.
pub fn parse_response(raw: &str) -> Result<CritiqueResponse, CritiqueError> {
    let json = extract_json(raw);
    serde_json::from_str(&json).map_err(|e| CritiqueError::MalformedModelOutput {
        reason: e.to_string(),
    })
}

/// Extract JSON from a string that might contain markdown code blocks
fn extract_json(content: &str) -> String {
    let trimmed = content.trim();

    // Check for markdown code block
    if trimmed.starts_with("```") {
        // Find the end of the code block
        if let Some(start) = trimmed.find('\n') {
            let after_first_line = &trimmed[start + 1..];
            if let Some(end) = after_first_line.rfind("```") {
                return after_first_line[..end].trim().to_string();
            }
        }
    }

    // Already plain JSON
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "image_description": "A granite cliff at dusk.",
        "dimensions": [
            {"name": "composition", "score": 7.0,
             "comment": "Strong diagonals.", "recommendation": "Tighten the crop.",
             "case_study_id": "IMG_1"}
        ],
        "overall_score": 7.2,
        "key_strengths": ["tonal range"],
        "priority_improvements": ["foreground interest"],
        "technical_notes": "Slight vignetting."
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let response = parse_response(VALID).unwrap();
        assert_eq!(response.dimensions.len(), 1);
        assert_eq!(response.dimensions[0].case_study_id.as_deref(), Some("IMG_1"));
        assert_eq!(response.dimensions[0].quote_id, None);
        assert_eq!(response.overall_score, 7.2);
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", VALID);
        let response = parse_response(&fenced).unwrap();
        assert_eq!(response.image_description, "A granite cliff at dusk.");
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let err = parse_response(r#"{"dimensions": []}"#).unwrap_err();
        assert!(matches!(err, CritiqueError::MalformedModelOutput { .. }));
    }

    #[test]
    fn test_prose_is_malformed() {
        let err = parse_response("I think this is a lovely photograph.").unwrap_err();
        assert!(matches!(err, CritiqueError::MalformedModelOutput { .. }));
    }

    #[test]
    fn test_optional_lists_default_empty() {
        let minimal = r#"{
            "image_description": "d",
            "dimensions": [],
            "overall_score": 5.0
        }"#;
        let response = parse_response(minimal).unwrap();
        assert!(response.key_strengths.is_empty());
        assert!(response.technical_notes.is_empty());
    }
}
