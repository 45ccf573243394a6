//! End-to-end critique pipeline: retrieve references, augment the prompt,
//! run one inference, validate the citations.

use rand::Rng;
use std::collections::BTreeMap;

use crate::analysis::{parse_response, validate_and_repair, CritiqueResponse, RepairStats};
use crate::config::RetrievalConfig;
use crate::db::{Database, DimensionalProfile};
use crate::dimension::Dimension;
use crate::error::CritiqueError;
use crate::llm::LlmClient;
use crate::prompt::{augment, HandleMap, ImageReference, QuoteReference};
use crate::retrieval::sampler::{sample_diverse, WeightedCandidate};
use crate::retrieval::{find_similar, passages, select_passages};

/// A completed, citation-consistent analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub response: CritiqueResponse,
    /// Handle → source for every reference offered to the model; consumers
    /// resolve surviving case_study_id/quote_id fields against this.
    pub handles: HandleMap,
    pub repair: RepairStats,
}

/// The critique pipeline over one store and one model client.
///
/// Each analysis is independent: handle numbering is request-local and the
/// store is only read, so concurrent analyses never interfere.
pub struct CritiqueEngine {
    db: Database,
    client: LlmClient,
    retrieval: RetrievalConfig,
}

impl CritiqueEngine {
    pub fn new(db: Database, client: LlmClient, retrieval: RetrievalConfig) -> Self {
        Self {
            db,
            client,
            retrieval,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Analyze one image with citation-grounded reference material.
    ///
    /// An advisor with no reference profiles or passages degrades to an
    /// uncited critique; only an unreachable store, a failed inference
    /// call or unparseable model output are errors. The model is invoked
    /// exactly once — retry policy belongs to the caller.
    pub fn analyze_with_citations(
        &self,
        advisor_id: &str,
        target_profile: &BTreeMap<Dimension, f64>,
        base_prompt: &str,
        image: &[u8],
    ) -> Result<AnalysisOutcome, CritiqueError> {
        let mut rng = rand::thread_rng();
        self.analyze_with_rng(advisor_id, target_profile, base_prompt, image, &mut rng)
    }

    /// Same pipeline with an injected rng, so tests can seed the sampling.
    pub fn analyze_with_rng<R: Rng>(
        &self,
        advisor_id: &str,
        target_profile: &BTreeMap<Dimension, f64>,
        base_prompt: &str,
        image: &[u8],
        rng: &mut R,
    ) -> Result<AnalysisOutcome, CritiqueError> {
        let profiles = self
            .db
            .load_profiles(advisor_id)
            .map_err(CritiqueError::StoreUnavailable)?;
        let passage_pool = self
            .db
            .load_passages(advisor_id)
            .map_err(CritiqueError::StoreUnavailable)?;

        let matches = find_similar(&profiles, target_profile, self.retrieval.top_k_profiles);
        let image_refs = self.pick_image_references(matches, target_profile, rng);

        let weak = passages::weak_dimensions(target_profile, self.retrieval.weak_score_threshold);
        let quote_refs: Vec<QuoteReference> = select_passages(
            passage_pool,
            &weak,
            self.retrieval.max_quote_citations,
            rng,
        )
        .into_iter()
        .map(|passage| {
            let dimensions = passages::cited_dimensions(&passage, &weak);
            QuoteReference {
                passage,
                dimensions,
            }
        })
        .collect();

        tracing::debug!(
            advisor = advisor_id,
            images = image_refs.len(),
            quotes = quote_refs.len(),
            weak_dimensions = weak.len(),
            "references selected"
        );

        let augmented = augment(base_prompt, &image_refs, &quote_refs);

        let raw = self
            .client
            .critique_image(&augmented.prompt, image)
            .map_err(CritiqueError::Inference)?;

        let mut response = parse_response(&raw)?;

        let repair = validate_and_repair(
            &mut response,
            &augmented.handles,
            self.retrieval.max_image_citations,
            self.retrieval.max_quote_citations,
        );
        if !repair.is_clean() {
            tracing::warn!(
                advisor = advisor_id,
                hallucinated = repair.hallucinated,
                duplicates = repair.duplicates,
                over_cap = repair.over_cap,
                stripped = repair.stripped_tokens,
                "citation repairs applied"
            );
        }

        Ok(AnalysisOutcome {
            response,
            handles: augmented.handles,
            repair,
        })
    }

    /// Analyze and persist the resulting profile for (advisor, image path).
    ///
    /// The stored profile keeps only dimensions from the closed vocabulary;
    /// anything else the model volunteered is dropped.
    pub fn analyze_and_persist(
        &self,
        advisor_id: &str,
        image_path: &str,
        target_profile: &BTreeMap<Dimension, f64>,
        base_prompt: &str,
        image: &[u8],
    ) -> Result<AnalysisOutcome, CritiqueError> {
        let outcome =
            self.analyze_with_citations(advisor_id, target_profile, base_prompt, image)?;

        let profile = profile_from_response(advisor_id, image_path, &outcome.response);
        self.db
            .insert_profile(&profile)
            .map_err(CritiqueError::StoreUnavailable)?;

        Ok(outcome)
    }

    /// Turn ranked similarity matches into weighted citation candidates and
    /// sample the final set.
    ///
    /// Each match is cited for the shared dimension where it most
    /// outperforms the target; the margin is the gap, and gap x similarity
    /// is the sampling weight. Matches that nowhere outperform the target
    /// have nothing to teach and are excluded.
    fn pick_image_references<R: Rng>(
        &self,
        matches: Vec<crate::retrieval::SimilarityMatch>,
        target: &BTreeMap<Dimension, f64>,
        rng: &mut R,
    ) -> Vec<ImageReference> {
        let candidates: Vec<WeightedCandidate<ImageReference>> = matches
            .into_iter()
            .filter_map(|m| {
                let mut best: Option<(Dimension, f64)> = None;
                for (dim, target_score) in target {
                    if let Some(candidate_score) = m.profile.scores.get(dim) {
                        let gap = candidate_score - target_score;
                        if gap > 0.0 && best.map_or(true, |(_, g)| gap > g) {
                            best = Some((*dim, gap));
                        }
                    }
                }
                let (dimension, gap) = best?;
                let weight = gap * m.similarity;
                Some(WeightedCandidate {
                    item: ImageReference {
                        profile: m.profile,
                        dimension,
                        gap,
                    },
                    weight,
                })
            })
            .collect();

        sample_diverse(candidates, self.retrieval.max_image_citations, rng)
    }
}

fn profile_from_response(
    advisor_id: &str,
    image_path: &str,
    response: &CritiqueResponse,
) -> DimensionalProfile {
    let mut scores = BTreeMap::new();
    let mut comments = BTreeMap::new();

    for assessment in &response.dimensions {
        if let Some(dim) = Dimension::parse(&assessment.name) {
            scores.insert(dim, assessment.score.clamp(0.0, 10.0));
            if !assessment.comment.is_empty() {
                comments.insert(dim, assessment.comment.clone());
            }
        }
    }

    DimensionalProfile {
        advisor_id: advisor_id.to_string(),
        image_path: image_path.to_string(),
        scores,
        comments,
        overall_grade: Some(format!("{:.1}/10", response.overall_score)),
        image_description: Some(response.image_description.clone()),
        rendered_analysis: serde_json::to_string(response).ok(),
        ..Default::default()
    }
}
