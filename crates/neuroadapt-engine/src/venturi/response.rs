//! Venturi Stage 3: adaptive response synthesis
//!
//! Applies the three trait-update rules in fixed order:
//!
//! 1. Trait modulation: `ΔT_mod = α ⊙ (W_resp · S)`
//! 2. Neuroplasticity growth: `ΔT_growth = β · (1 − T) · engagement`
//! 3. Projection: the candidate vector is multiplied by the orthonormal
//!    basis and rescaled so its norm stays within the configured drift band
//!    of the prior norm, then clamped to [0, 1] per trait.
//!
//! The growth term saturates as traits approach 1.0, and the norm clamp
//! keeps a runaway signature from dragging the whole vector with it.

use neuroadapt_core::config::TraitConfig;
use neuroadapt_core::types::{CognitiveTrait, Signature, TraitVector};

use super::signature::ProjectionWeights;

/// Stage-3 output for one window.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TraitUpdate {
    /// Modulation deltas in trait order
    pub delta_modulation: [f64; CognitiveTrait::COUNT],
    /// Growth deltas in trait order
    pub delta_growth: [f64; CognitiveTrait::COUNT],
    /// The candidate successor trait vector
    pub next_traits: TraitVector,
    /// Norm ratio (successor / prior) after clamping; 1.0 when the prior
    /// norm was zero
    pub norm_ratio: f64,
}

/// How the update turned out, after the finiteness check.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseOutcome {
    /// Update is numerically sound
    Stable(TraitUpdate),
    /// NaN or infinity appeared; the caller must reset to the prior
    Unstable,
}

/// Synthesize the trait update for one window.
#[must_use]
pub fn synthesize(
    signature: &Signature,
    traits: &TraitVector,
    weights: &ProjectionWeights,
    config: &TraitConfig,
) -> ResponseOutcome {
    let drive = weights.trait_drive(signature);

    let mut delta_modulation = [0.0f64; CognitiveTrait::COUNT];
    for (i, t) in CognitiveTrait::ALL.iter().enumerate() {
        delta_modulation[i] = config.learning_rates[t.index()] * drive[i];
    }

    let mut delta_growth = [0.0f64; CognitiveTrait::COUNT];
    for (i, t) in CognitiveTrait::ALL.iter().enumerate() {
        delta_growth[i] = config.growth_rate * (1.0 - traits.get(*t)) * signature.engagement;
    }

    let mut candidate = [0.0f64; CognitiveTrait::COUNT];
    for (i, t) in CognitiveTrait::ALL.iter().enumerate() {
        candidate[i] = traits.get(*t) + delta_modulation[i] + delta_growth[i];
    }

    let projected = weights.project(&candidate);

    let prior_norm = traits.norm();
    let projected_norm = projected.iter().map(|v| v * v).sum::<f64>().sqrt();

    let (drift_min, drift_max) = config.norm_drift_band;
    let (scaled, norm_ratio) = if prior_norm > 0.0 && projected_norm > 0.0 {
        let ratio = projected_norm / prior_norm;
        let clamped = ratio.clamp(drift_min, drift_max);
        let scale = clamped / ratio;
        let mut out = projected;
        for v in &mut out {
            *v *= scale;
        }
        (out, clamped)
    } else {
        (projected, 1.0)
    };

    let mut next = TraitVector::uniform(0.0);
    for (i, t) in CognitiveTrait::ALL.iter().enumerate() {
        next.set(*t, scaled[i].clamp(0.0, 1.0));
    }

    if next.is_finite() {
        ResponseOutcome::Stable(TraitUpdate {
            delta_modulation,
            delta_growth,
            next_traits: next,
            norm_ratio,
        })
    } else {
        ResponseOutcome::Unstable
    }
}
