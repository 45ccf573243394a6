//! The closed set of visual-quality dimensions every image is scored on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fixed visual-quality axes.
///
/// The set is closed and versioned: scores, commentary, passage tags and
/// model responses all draw from this vocabulary. The declaration order is
/// the canonical presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Composition,
    Lighting,
    FocusSharpness,
    ColorHarmony,
    SubjectIsolation,
    DepthPerspective,
    VisualBalance,
    EmotionalImpact,
}

impl Dimension {
    /// All dimensions in canonical order.
    pub const ALL: [Dimension; 8] = [
        Dimension::Composition,
        Dimension::Lighting,
        Dimension::FocusSharpness,
        Dimension::ColorHarmony,
        Dimension::SubjectIsolation,
        Dimension::DepthPerspective,
        Dimension::VisualBalance,
        Dimension::EmotionalImpact,
    ];

    /// The wire name used in JSON columns, prompts and model responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Composition => "composition",
            Dimension::Lighting => "lighting",
            Dimension::FocusSharpness => "focus_sharpness",
            Dimension::ColorHarmony => "color_harmony",
            Dimension::SubjectIsolation => "subject_isolation",
            Dimension::DepthPerspective => "depth_perspective",
            Dimension::VisualBalance => "visual_balance",
            Dimension::EmotionalImpact => "emotional_impact",
        }
    }

    /// A human-readable label for prompt text.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Composition => "Composition",
            Dimension::Lighting => "Lighting",
            Dimension::FocusSharpness => "Focus & Sharpness",
            Dimension::ColorHarmony => "Color Harmony",
            Dimension::SubjectIsolation => "Subject Isolation",
            Dimension::DepthPerspective => "Depth & Perspective",
            Dimension::VisualBalance => "Visual Balance",
            Dimension::EmotionalImpact => "Emotional Impact",
        }
    }

    /// Parse a wire name. Unknown names return `None`; callers must treat
    /// them as absent data, never as a zero score.
    pub fn parse(name: &str) -> Option<Dimension> {
        match name {
            "composition" => Some(Dimension::Composition),
            "lighting" => Some(Dimension::Lighting),
            "focus_sharpness" => Some(Dimension::FocusSharpness),
            "color_harmony" => Some(Dimension::ColorHarmony),
            "subject_isolation" => Some(Dimension::SubjectIsolation),
            "depth_perspective" => Some(Dimension::DepthPerspective),
            "visual_balance" => Some(Dimension::VisualBalance),
            "emotional_impact" => Some(Dimension::EmotionalImpact),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
