//! Prompt augmentation with opaque citation handles.
//!
//! Retrieved reference material reaches the model exclusively through this
//! module. Each candidate is serialized behind a request-scoped handle
//! (`IMG_1`, `QUOTE_1`, …) so the model never sees database ids, and every
//! citation in its response can later be resolved — or rejected — against
//! the handle map.

use std::collections::HashMap;

use crate::db::{BookPassage, DimensionalProfile};
use crate::dimension::Dimension;

/// A reference photograph selected for citation, with the dimension it is
/// being cited for and how far the target trails it there.
#[derive(Debug, Clone)]
pub struct ImageReference {
    pub profile: DimensionalProfile,
    pub dimension: Dimension,
    pub gap: f64,
}

/// A book passage selected for citation, with the weak dimensions it was
/// retrieved for.
#[derive(Debug, Clone)]
pub struct QuoteReference {
    pub passage: BookPassage,
    pub dimensions: Vec<Dimension>,
}

/// What a handle resolves back to.
#[derive(Debug, Clone)]
pub enum CitationSource {
    Image(ImageReference),
    Quote(QuoteReference),
}

impl CitationSource {
    pub fn title(&self) -> String {
        match self {
            CitationSource::Image(image) => image.profile.display_title(),
            CitationSource::Quote(quote) => quote.passage.book_title.clone(),
        }
    }
}

/// Handle → source record for one analysis request. Handles are scoped to
/// the request that minted them and never reused.
pub type HandleMap = HashMap<String, CitationSource>;

/// The prompt sent to the model plus the map needed to validate its
/// citations afterwards.
#[derive(Debug, Clone)]
pub struct AugmentedPrompt {
    pub prompt: String,
    pub handles: HandleMap,
}

/// Serialize the selected references into the prompt.
///
/// Handles are numbered from 1 within each namespace, independent of the
/// other namespace. With no references at all the base prompt passes
/// through unchanged — an advisor without reference material still gets a
/// valid, uncited critique prompt.
pub fn augment(
    base_prompt: &str,
    images: &[ImageReference],
    quotes: &[QuoteReference],
) -> AugmentedPrompt {
    let mut handles = HandleMap::new();

    if images.is_empty() && quotes.is_empty() {
        return AugmentedPrompt {
            prompt: base_prompt.to_string(),
            handles,
        };
    }

    let mut prompt = String::from(base_prompt);
    prompt.push_str("\n\nREFERENCE MATERIAL\n");
    prompt.push_str(
        "Use the case studies below to ground your critique. Refer to each \
         only by its handle.\n",
    );

    for (n, image) in images.iter().enumerate() {
        let handle = format!("IMG_{}", n + 1);
        prompt.push_str(&format!(
            "\n[{}] \"{}\" — cited for {}",
            handle,
            image.profile.display_title(),
            image.dimension.label(),
        ));
        if let Some(score) = image.profile.scores.get(&image.dimension) {
            prompt.push_str(&format!(" (reference score {:.1}/10)", score));
        }
        prompt.push('\n');
        if let Some(point) = image.profile.teaching_points.get(&image.dimension) {
            prompt.push_str(&format!("  Teaching note: {}\n", point));
        } else if let Some(comment) = image.profile.comments.get(&image.dimension) {
            prompt.push_str(&format!("  Note: {}\n", comment));
        }
        handles.insert(handle, CitationSource::Image(image.clone()));
    }

    for (n, quote) in quotes.iter().enumerate() {
        let handle = format!("QUOTE_{}", n + 1);
        let dims: Vec<&str> = quote.dimensions.iter().map(|d| d.label()).collect();
        prompt.push_str(&format!(
            "\n[{}] From \"{}\" — cited for {}\n  \"{}\"\n",
            handle,
            quote.passage.book_title,
            dims.join(", "),
            quote.passage.passage_text.trim(),
        ));
        handles.insert(handle, CitationSource::Quote(quote.clone()));
    }

    prompt.push_str(
        "\nCITATION RULES\n\
         - In the structured output, cite at most one image handle (case_study_id) \
         and one quote handle (quote_id) per dimension.\n\
         - Only use handles listed above. Never invent a handle.\n\
         - Never cite the same handle for two different dimensions.\n",
    );

    AugmentedPrompt { prompt, handles }
}
