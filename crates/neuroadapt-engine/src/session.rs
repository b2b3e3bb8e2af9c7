//! Single-subject session orchestration
//!
//! A [`Session`] owns one subject's state exclusively and sequences windows
//! through quality assessment, the two analyzers (forked onto scoped
//! threads), the Venturi pipeline, and the trait engine. Every window is
//! fully evaluated into a [`PendingWindow`] before any state is written, so
//! a window either lands completely or not at all.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use neuroadapt_core::config::SessionConfig;
use neuroadapt_core::error::{ConfigError, SessionError};
use neuroadapt_core::types::{
    AdaptationDecision, QualityReport, RationaleTag, SampleWindow, SubjectId, SubjectState,
};

use crate::adaptive::TraitEngine;
use crate::processing::artifacts::ArtifactDetector;
use crate::processing::bands::BandAnalyzer;
use crate::processing::quality::QualityAssessor;
use crate::venturi::{ProjectionWeights, VenturiPipeline, FEATURE_COUNT};

/// Per-session counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Windows that advanced subject state
    pub processed: u64,
    /// Windows rejected by the quality gate
    pub rejected_quality: u64,
    /// Windows rejected by the sequence gate
    pub rejected_sequence: u64,
    /// Windows that exceeded the latency budget
    pub budget_overruns: u64,
    /// Trait-vector resets after numeric instability
    pub trait_resets: u64,
}

/// A fully evaluated window awaiting commit.
///
/// Produced by [`Session::evaluate`]; dropping it discards the window with
/// no state mutation (the cancellation path of the router).
#[derive(Clone, Debug)]
pub struct PendingWindow {
    decision: AdaptationDecision,
    quality: QualityReport,
    next_state: Option<SubjectState>,
    elapsed: Duration,
}

impl PendingWindow {
    /// The decision this window will produce on commit
    #[must_use]
    pub const fn decision(&self) -> &AdaptationDecision {
        &self.decision
    }

    /// The quality report for this window
    #[must_use]
    pub const fn quality(&self) -> &QualityReport {
        &self.quality
    }
}

/// One subject's processing session.
pub struct Session {
    config: SessionConfig,
    state: SubjectState,
    quality: QualityAssessor,
    bands: BandAnalyzer,
    artifacts: ArtifactDetector,
    pipeline: VenturiPipeline,
    engine: TraitEngine,
    stats: SessionStats,
}

impl Session {
    /// Create a session with a fresh subject state.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration cannot support the
    /// pipeline; this is the only fatal path in the system.
    pub fn new(subject_id: SubjectId, config: SessionConfig) -> Result<Self, ConfigError> {
        let state = SubjectState::new(subject_id, config.traits.default_prior, FEATURE_COUNT);
        Self::resume(config, state)
    }

    /// Resume a session from an externally checkpointed subject state.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration is invalid.
    pub fn resume(config: SessionConfig, state: SubjectState) -> Result<Self, ConfigError> {
        config.validate()?;

        let quality = QualityAssessor::new(config.quality);
        let bands = BandAnalyzer::new(config.band_edges_hz);
        let artifacts = ArtifactDetector::new(
            config.artifacts,
            config.signal.sample_rate_hz,
            config.signal.window_samples,
        );
        let pipeline = VenturiPipeline::new(ProjectionWeights::default(), config.traits);
        let engine = TraitEngine::new(config.traits, config.stages, &config.artifacts);

        info!(subject = %state.subject_id, "session started");

        Ok(Self {
            config,
            state,
            quality,
            bands,
            artifacts,
            pipeline,
            engine,
            stats: SessionStats::default(),
        })
    }

    /// The exclusively owned subject state.
    #[must_use]
    pub const fn state(&self) -> &SubjectState {
        &self.state
    }

    /// Session counters.
    #[must_use]
    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The subject this session belongs to.
    #[must_use]
    pub const fn subject_id(&self) -> SubjectId {
        self.state.subject_id
    }

    /// Snapshot the subject state for external checkpointing.
    ///
    /// The snapshot is plain structured data; serializing and restoring it
    /// through [`Session::resume`] reproduces trait values bit-exactly.
    #[must_use]
    pub fn checkpoint(&self) -> SubjectState {
        self.state.clone()
    }

    /// Process one window end to end.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] for out-of-order, duplicate, or
    /// wrong-geometry windows; the subject state is untouched in every error
    /// case.
    pub fn process_window(
        &mut self,
        window: &SampleWindow,
    ) -> Result<AdaptationDecision, SessionError> {
        let pending = self.evaluate(window)?;
        Ok(self.commit(pending))
    }

    /// Evaluate a window without touching subject state.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] for sequence or geometry violations.
    pub fn evaluate(&mut self, window: &SampleWindow) -> Result<PendingWindow, SessionError> {
        let start = Instant::now();
        self.check_geometry(window)?;
        self.check_sequence(window)?;

        let quality = self.quality.assess(window);
        if !quality.pass {
            return Ok(PendingWindow {
                decision: AdaptationDecision::no_op(window.index(), RationaleTag::LowQuality),
                quality,
                next_state: None,
                elapsed: start.elapsed(),
            });
        }

        // The two analyzers have no data dependency: fork band decomposition
        // onto a scoped thread while artifact detection runs here, join
        // before Stage 2.
        let bands = &self.bands;
        let detector = &mut self.artifacts;
        let (band_estimate, artifact_flags) = std::thread::scope(|scope| {
            let handle = scope.spawn(|| bands.analyze(window));
            let flags = detector.detect(window);
            let estimate = match handle.join() {
                Ok(estimate) => estimate,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            (estimate, flags)
        });

        let output = self
            .pipeline
            .run(window, &band_estimate, &artifact_flags, &self.state);

        let mut next_state = self.state.clone();
        let decision =
            self.engine
                .update(&mut next_state, &output, &artifact_flags, window.index());

        Ok(PendingWindow {
            decision,
            quality,
            next_state: Some(next_state),
            elapsed: start.elapsed(),
        })
    }

    /// Commit a pending window: the single state write per window.
    pub fn commit(&mut self, pending: PendingWindow) -> AdaptationDecision {
        if let Some(next_state) = pending.next_state {
            self.state = next_state;
            self.stats.processed += 1;
            if pending.decision.rationale == RationaleTag::TraitReset {
                self.stats.trait_resets += 1;
            }
        } else {
            self.stats.rejected_quality += 1;
        }

        if pending.elapsed > self.config.latency_budget {
            self.stats.budget_overruns += 1;
            warn!(
                subject = %self.state.subject_id,
                window = pending.decision.window_index,
                elapsed_us = pending.elapsed.as_micros() as u64,
                budget_us = self.config.latency_budget.as_micros() as u64,
                "window exceeded latency budget"
            );
        }

        pending.decision
    }

    fn check_geometry(&self, window: &SampleWindow) -> Result<(), SessionError> {
        if window.channel_count() != self.config.signal.channel_count {
            return Err(SessionError::ChannelCountMismatch {
                got: window.channel_count(),
                expected: self.config.signal.channel_count,
            });
        }
        if window.samples_per_channel() != self.config.signal.window_samples {
            return Err(SessionError::WindowLengthMismatch {
                got: window.samples_per_channel(),
                expected: self.config.signal.window_samples,
            });
        }
        Ok(())
    }

    fn check_sequence(&mut self, window: &SampleWindow) -> Result<(), SessionError> {
        if let Some(last) = self.state.last_window_index {
            if window.index() == last {
                self.stats.rejected_sequence += 1;
                return Err(SessionError::DuplicateWindow {
                    index: window.index(),
                });
            }
            if window.index() < last {
                self.stats.rejected_sequence += 1;
                return Err(SessionError::OutOfOrderWindow {
                    received: window.index(),
                    last_processed: last,
                });
            }
        }
        Ok(())
    }
}
