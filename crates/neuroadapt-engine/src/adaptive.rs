//! Trait modulation engine
//!
//! Consumes the Venturi pipeline output and performs the single state update
//! a window is allowed: trait vector, learning stage, neural state, and the
//! adaptation decision. The engine receives a mutable borrow of the subject
//! state for exactly one update and retains nothing afterwards.

use tracing::{debug, warn};

use neuroadapt_core::config::{ArtifactConfig, StageConfig, TraitConfig};
use neuroadapt_core::types::{
    AdaptationDecision, ArtifactFlags, NeuralState, RationaleTag, Signature, SubjectState,
};

use crate::venturi::{PipelineOutput, ResponseOutcome};

// Neural-state drive thresholds on the bounded signature axes
const FATIGUE_REST_THRESHOLD: f64 = 0.4;
const ENGAGEMENT_DEEP_THRESHOLD: f64 = 0.6;
const ENGAGEMENT_LEARNING_THRESHOLD: f64 = 0.3;
const DISENGAGED_BREAK_THRESHOLD: f64 = -0.3;

/// The stateful update step of the pipeline.
#[derive(Clone, Debug)]
pub struct TraitEngine {
    traits: TraitConfig,
    stages: StageConfig,
    muscle_spike_threshold: f64,
}

impl TraitEngine {
    /// Create an engine from configuration
    #[must_use]
    pub const fn new(traits: TraitConfig, stages: StageConfig, artifacts: &ArtifactConfig) -> Self {
        Self {
            traits,
            stages,
            muscle_spike_threshold: artifacts.muscle_spike_threshold,
        }
    }

    /// Apply one window's pipeline output to the subject state.
    ///
    /// This is the only mutator of `SubjectState` in the system and runs at
    /// most once per window. Numeric instability resets the trait vector to
    /// the configured prior and the session continues.
    pub fn update(
        &self,
        state: &mut SubjectState,
        output: &PipelineOutput,
        artifacts: &ArtifactFlags,
        window_index: u64,
    ) -> AdaptationDecision {
        state.last_window_index = Some(window_index);
        state.windows_processed += 1;
        state.baseline = output.features.next_baseline.clone();

        let mut rationale = RationaleTag::Nominal;
        let mut delta_magnitude = 0.0;

        match &output.outcome {
            ResponseOutcome::Stable(update) => {
                state.trait_vector = update.next_traits;
                delta_magnitude = update
                    .delta_modulation
                    .iter()
                    .zip(&update.delta_growth)
                    .map(|(m, g)| (m + g) * (m + g))
                    .sum::<f64>()
                    .sqrt();
            }
            ResponseOutcome::Unstable => {
                warn!(
                    subject = %state.subject_id,
                    window = window_index,
                    "trait vector went non-finite; resetting to prior"
                );
                state.trait_vector = self.traits.default_prior;
                rationale = RationaleTag::TraitReset;
            }
        }

        let fatigue_spike = artifacts.muscle_index >= self.muscle_spike_threshold
            || artifacts.line_noise_present;

        let prior_neural = state.neural_state;
        if fatigue_spike {
            // Safety override: straight to rest, no adjacency walk
            state.neural_state = NeuralState::Resting;
            if rationale == RationaleTag::Nominal {
                rationale = RationaleTag::FatigueSpike;
            }
        } else {
            let target = neural_target(&output.signature);
            state.neural_state = prior_neural.step_toward(target);
        }
        if state.neural_state != prior_neural {
            debug!(
                subject = %state.subject_id,
                from = prior_neural.name(),
                to = state.neural_state.name(),
                "neural state transition"
            );
        }

        if self.advance_stage(state, &output.signature) && rationale == RationaleTag::Nominal {
            rationale = RationaleTag::StageAdvanced;
        }

        let engagement = output.signature.engagement;
        let direction = if engagement >= 0.0 { 1.0 } else { -1.0 };
        let recommended_difficulty_delta = (direction * delta_magnitude).clamp(-1.0, 1.0);

        let break_suggested = fatigue_spike
            || (engagement < DISENGAGED_BREAK_THRESHOLD
                && prior_neural == NeuralState::Processing);

        AdaptationDecision {
            window_index,
            recommended_difficulty_delta,
            break_suggested,
            rationale,
        }
    }

    /// Drive the cyclic learning-stage machine. Returns true on a transition.
    ///
    /// A stage advances when engagement holds above the stage threshold for
    /// the configured number of consecutive windows; this is the only place
    /// `learning_stage` changes.
    fn advance_stage(&self, state: &mut SubjectState, signature: &Signature) -> bool {
        let threshold = self.stages.engagement_thresholds[state.learning_stage.index()];
        let progress = &mut state.stage_progress;

        progress.cumulative_engagement += signature.engagement.max(0.0);
        if signature.engagement >= threshold {
            progress.consecutive_above += 1;
        } else {
            progress.consecutive_above = 0;
        }

        if progress.consecutive_above >= self.stages.required_consecutive {
            let from = state.learning_stage;
            state.learning_stage = from.next();
            state.stage_progress.reset();
            debug!(
                subject = %state.subject_id,
                from = from.name(),
                to = state.learning_stage.name(),
                "learning stage advanced"
            );
            return true;
        }
        false
    }

    /// Trait configuration in use
    #[must_use]
    pub const fn trait_config(&self) -> &TraitConfig {
        &self.traits
    }
}

/// Map the instantaneous signature to the neural state it pulls toward.
fn neural_target(signature: &Signature) -> NeuralState {
    if signature.fatigue > FATIGUE_REST_THRESHOLD {
        NeuralState::Resting
    } else if signature.engagement > ENGAGEMENT_DEEP_THRESHOLD {
        if signature.cognitive_load > 0.0 {
            NeuralState::Processing
        } else {
            NeuralState::Consolidating
        }
    } else if signature.engagement > ENGAGEMENT_LEARNING_THRESHOLD {
        NeuralState::Learning
    } else if signature.engagement > 0.0 {
        NeuralState::Focused
    } else {
        NeuralState::Resting
    }
}
