//! Citation validation and repair.
//!
//! Model output is untrusted free-form generation: it can cite handles it
//! was never given, cite the same handle twice, or echo handle tokens into
//! prose. This pass repairs all of that in place and never fails the
//! request — only counters and warnings come out of it.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::CritiqueResponse;
use crate::prompt::{CitationSource, HandleMap};

/// What the repair pass had to fix, for quality monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    /// Citations of handles not offered in this request.
    pub hallucinated: usize,
    /// Repeat citations of an already-consumed handle.
    pub duplicates: usize,
    /// Citations dropped by the per-kind cap.
    pub over_cap: usize,
    /// Bare handle tokens scrubbed out of prose.
    pub stripped_tokens: usize,
}

impl RepairStats {
    pub fn is_clean(&self) -> bool {
        *self == RepairStats::default()
    }
}

fn handle_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:IMG|QUOTE)_\d+\b").expect("handle pattern"))
}

/// Repair a parsed critique against the handle map of its own request.
///
/// Guarantees on return: every surviving `case_study_id`/`quote_id`
/// resolves to a source actually offered to the model, no handle is cited
/// for two dimensions (first in array order wins), each kind stays within
/// its cap (excess dropped earliest-first), and no bare handle token
/// remains in any prose field.
pub fn validate_and_repair(
    response: &mut CritiqueResponse,
    handles: &HandleMap,
    max_image_citations: usize,
    max_quote_citations: usize,
) -> RepairStats {
    let mut stats = RepairStats::default();
    let mut used_images: HashSet<String> = HashSet::new();
    let mut used_quotes: HashSet<String> = HashSet::new();

    for assessment in &mut response.dimensions {
        if let Some(handle) = assessment.case_study_id.take() {
            match resolve(handles, &handle, CitationKind::Image) {
                Resolution::Valid => {
                    if used_images.contains(&handle) {
                        stats.duplicates += 1;
                        tracing::warn!(handle = %handle, dimension = %assessment.name,
                            "duplicate image citation dropped");
                    } else if used_images.len() >= max_image_citations {
                        stats.over_cap += 1;
                        tracing::warn!(handle = %handle, dimension = %assessment.name,
                            "image citation over cap dropped");
                    } else {
                        used_images.insert(handle.clone());
                        assessment.case_study_id = Some(handle);
                    }
                }
                Resolution::Unknown => {
                    stats.hallucinated += 1;
                    tracing::warn!(handle = %handle, dimension = %assessment.name,
                        "hallucinated image citation dropped");
                }
            }
        }

        if let Some(handle) = assessment.quote_id.take() {
            match resolve(handles, &handle, CitationKind::Quote) {
                Resolution::Valid => {
                    if used_quotes.contains(&handle) {
                        stats.duplicates += 1;
                        tracing::warn!(handle = %handle, dimension = %assessment.name,
                            "duplicate quote citation dropped");
                    } else if used_quotes.len() >= max_quote_citations {
                        stats.over_cap += 1;
                        tracing::warn!(handle = %handle, dimension = %assessment.name,
                            "quote citation over cap dropped");
                    } else {
                        used_quotes.insert(handle.clone());
                        assessment.quote_id = Some(handle);
                    }
                }
                Resolution::Unknown => {
                    stats.hallucinated += 1;
                    tracing::warn!(handle = %handle, dimension = %assessment.name,
                        "hallucinated quote citation dropped");
                }
            }
        }

        // Prose cleanup is orthogonal to the structured fields: the model
        // can take either escape, both must be sanitized.
        assessment.comment = strip_handles(&assessment.comment, &mut stats);
        assessment.recommendation = strip_handles(&assessment.recommendation, &mut stats);
    }

    response.image_description = strip_handles(&response.image_description, &mut stats);
    response.technical_notes = strip_handles(&response.technical_notes, &mut stats);
    for item in &mut response.key_strengths {
        *item = strip_handles(item, &mut stats);
    }
    for item in &mut response.priority_improvements {
        *item = strip_handles(item, &mut stats);
    }

    stats
}

enum CitationKind {
    Image,
    Quote,
}

enum Resolution {
    Valid,
    Unknown,
}

/// A handle only resolves against its own namespace: a quote handle in an
/// image field counts as hallucinated.
fn resolve(handles: &HandleMap, handle: &str, kind: CitationKind) -> Resolution {
    match (handles.get(handle), kind) {
        (Some(CitationSource::Image(_)), CitationKind::Image) => Resolution::Valid,
        (Some(CitationSource::Quote(_)), CitationKind::Quote) => Resolution::Valid,
        _ => Resolution::Unknown,
    }
}

/// Remove every bare handle token and normalize the whitespace left behind.
fn strip_handles(text: &str, stats: &mut RepairStats) -> String {
    let matches = handle_pattern().find_iter(text).count();
    if matches == 0 {
        return text.to_string();
    }
    stats.stripped_tokens += matches;

    let stripped = handle_pattern().replace_all(text, "");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DimensionAssessment;
    use crate::db::{BookPassage, DimensionalProfile};
    use crate::dimension::Dimension;
    use crate::prompt::{augment, ImageReference, QuoteReference};
    use std::collections::BTreeSet;

    fn handle_map(images: usize, quotes: usize) -> HandleMap {
        let image_refs: Vec<ImageReference> = (0..images)
            .map(|n| ImageReference {
                profile: DimensionalProfile {
                    id: n as i64 + 1,
                    advisor_id: "ansel".to_string(),
                    image_path: format!("/refs/{}.jpg", n + 1),
                    title: Some(format!("Reference {}", n + 1)),
                    ..Default::default()
                },
                dimension: Dimension::Composition,
                gap: 1.0,
            })
            .collect();
        let quote_refs: Vec<QuoteReference> = (0..quotes)
            .map(|n| QuoteReference {
                passage: BookPassage {
                    id: n as i64 + 1,
                    advisor_id: "ansel".to_string(),
                    book_title: "The Negative".to_string(),
                    passage_text: "…".to_string(),
                    dimension_tags: [Dimension::Composition].into_iter().collect::<BTreeSet<_>>(),
                    embedding: None,
                    relevance_score: 1.0,
                    source: None,
                    notes: None,
                },
                dimensions: vec![Dimension::Composition],
            })
            .collect();
        augment("p", &image_refs, &quote_refs).handles
    }

    fn assessment(name: &str, case_study: Option<&str>, quote: Option<&str>) -> DimensionAssessment {
        DimensionAssessment {
            name: name.to_string(),
            score: 6.0,
            comment: "Fine.".to_string(),
            recommendation: "Keep practicing.".to_string(),
            case_study_id: case_study.map(String::from),
            quote_id: quote.map(String::from),
        }
    }

    fn response(dimensions: Vec<DimensionAssessment>) -> CritiqueResponse {
        CritiqueResponse {
            image_description: "A photo.".to_string(),
            dimensions,
            overall_score: 6.0,
            key_strengths: vec![],
            priority_improvements: vec![],
            technical_notes: String::new(),
        }
    }

    #[test]
    fn test_hallucinated_handle_dropped() {
        let handles = handle_map(2, 0);
        let mut resp = response(vec![assessment("composition", Some("IMG_5"), None)]);

        let stats = validate_and_repair(&mut resp, &handles, 3, 3);
        assert_eq!(resp.dimensions[0].case_study_id, None);
        assert_eq!(stats.hallucinated, 1);
    }

    #[test]
    fn test_duplicate_keeps_first_occurrence() {
        let handles = handle_map(0, 1);
        let mut resp = response(vec![
            assessment("composition", None, Some("QUOTE_1")),
            assessment("lighting", None, Some("QUOTE_1")),
        ]);

        let stats = validate_and_repair(&mut resp, &handles, 3, 3);
        assert_eq!(resp.dimensions[0].quote_id.as_deref(), Some("QUOTE_1"));
        assert_eq!(resp.dimensions[1].quote_id, None);
        assert_eq!(stats.duplicates, 1);
    }

    #[test]
    fn test_cap_drops_excess_in_array_order() {
        let handles = handle_map(4, 0);
        let mut resp = response(vec![
            assessment("composition", Some("IMG_1"), None),
            assessment("lighting", Some("IMG_2"), None),
            assessment("visual_balance", Some("IMG_3"), None),
        ]);

        let stats = validate_and_repair(&mut resp, &handles, 2, 3);
        assert_eq!(resp.dimensions[0].case_study_id.as_deref(), Some("IMG_1"));
        assert_eq!(resp.dimensions[1].case_study_id.as_deref(), Some("IMG_2"));
        assert_eq!(resp.dimensions[2].case_study_id, None);
        assert_eq!(stats.over_cap, 1);
    }

    #[test]
    fn test_wrong_namespace_counts_as_hallucinated() {
        let handles = handle_map(1, 1);
        let mut resp = response(vec![assessment("composition", Some("QUOTE_1"), Some("IMG_1"))]);

        let stats = validate_and_repair(&mut resp, &handles, 3, 3);
        assert_eq!(resp.dimensions[0].case_study_id, None);
        assert_eq!(resp.dimensions[0].quote_id, None);
        assert_eq!(stats.hallucinated, 2);
    }

    #[test]
    fn test_prose_tokens_stripped_and_whitespace_collapsed() {
        let handles = handle_map(1, 0);
        let mut resp = response(vec![assessment("composition", Some("IMG_1"), None)]);
        resp.dimensions[0].recommendation =
            "Study IMG_1 'Half Dome' for depth.".to_string();

        let stats = validate_and_repair(&mut resp, &handles, 3, 3);
        assert_eq!(
            resp.dimensions[0].recommendation,
            "Study 'Half Dome' for depth."
        );
        // The structured citation survives even though the prose echo of
        // the same handle was scrubbed.
        assert_eq!(resp.dimensions[0].case_study_id.as_deref(), Some("IMG_1"));
        assert_eq!(stats.stripped_tokens, 1);
    }

    #[test]
    fn test_unknown_handles_also_stripped_from_prose() {
        let handles = handle_map(1, 0);
        let mut resp = response(vec![assessment("composition", None, None)]);
        resp.dimensions[0].comment = "Compare IMG_9 and QUOTE_4 here.".to_string();
        resp.technical_notes = "See QUOTE_2.".to_string();
        resp.key_strengths = vec!["Echoes IMG_1 nicely".to_string()];

        let stats = validate_and_repair(&mut resp, &handles, 3, 3);
        assert_eq!(resp.dimensions[0].comment, "Compare and here.");
        assert_eq!(resp.technical_notes, "See .");
        assert_eq!(resp.key_strengths[0], "Echoes nicely");
        assert_eq!(stats.stripped_tokens, 4);
    }

    #[test]
    fn test_clean_response_untouched() {
        let handles = handle_map(1, 1);
        let mut resp = response(vec![assessment("composition", Some("IMG_1"), Some("QUOTE_1"))]);

        let stats = validate_and_repair(&mut resp, &handles, 3, 3);
        assert!(stats.is_clean());
        assert_eq!(resp.dimensions[0].case_study_id.as_deref(), Some("IMG_1"));
        assert_eq!(resp.dimensions[0].quote_id.as_deref(), Some("QUOTE_1"));
        assert_eq!(resp.dimensions[0].comment, "Fine.");
    }
}
