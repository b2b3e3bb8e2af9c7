//! The Venturi pipeline: a fixed three-stage adaptive transform
//!
//! Stage 1 ([`preprocess`]) normalizes analyzer outputs into a feature
//! vector against the subject's rolling baseline. Stage 2 ([`signature`])
//! projects the features onto the engagement / fatigue / cognitive-load
//! axes. Stage 3 ([`response`]) synthesizes a trait delta from the
//! signature. Stage count and order are invariant; each stage is a pure
//! function of its input plus the state snapshot it is handed.

pub mod preprocess;
pub mod response;
pub mod signature;

use neuroadapt_core::config::TraitConfig;
use neuroadapt_core::types::{ArtifactFlags, BandPowerEstimate, SampleWindow, SubjectState};

pub use preprocess::{FeatureVector, FEATURE_COUNT};
pub use response::{ResponseOutcome, TraitUpdate};
pub use signature::ProjectionWeights;

/// The assembled three-stage pipeline.
#[derive(Clone, Debug)]
pub struct VenturiPipeline {
    weights: ProjectionWeights,
    traits: TraitConfig,
}

/// Everything Stage 3 produced for one window, plus the updated baseline the
/// orchestrator commits alongside the trait update.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// Normalized Stage-1 features
    pub features: FeatureVector,
    /// Stage-2 signature
    pub signature: neuroadapt_core::types::Signature,
    /// Stage-3 trait update, or the instability marker
    pub outcome: ResponseOutcome,
}

impl VenturiPipeline {
    /// Create a pipeline from a weights asset and trait configuration
    #[must_use]
    pub const fn new(weights: ProjectionWeights, traits: TraitConfig) -> Self {
        Self { weights, traits }
    }

    /// Run all three stages for one window.
    ///
    /// Reads the subject state snapshot but never mutates it; the caller
    /// commits the returned baseline and trait update atomically.
    #[must_use]
    pub fn run(
        &self,
        window: &SampleWindow,
        bands: &BandPowerEstimate,
        artifacts: &ArtifactFlags,
        state: &SubjectState,
    ) -> PipelineOutput {
        let features = preprocess::extract(
            window,
            bands,
            artifacts,
            &state.baseline,
            self.traits.baseline_decay,
        );
        let signature = self.weights.signature(&features.normalized);
        let outcome =
            response::synthesize(&signature, &state.trait_vector, &self.weights, &self.traits);

        PipelineOutput {
            features,
            signature,
            outcome,
        }
    }
}
