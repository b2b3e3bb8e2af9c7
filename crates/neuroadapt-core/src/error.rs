//! Error types for the Neuroadapt pipeline
//!
//! Two tiers, matching the propagation policy: [`ConfigError`] is fatal and
//! only possible at session creation; [`SessionError`] is recoverable, rejects
//! a single window, and never aborts a session. Numeric instability in the
//! trait engine is not an error type at all: it resets the trait vector to
//! the configured prior and surfaces through the decision's rationale tag.

use thiserror::Error;

/// Fatal configuration errors, rejected at session creation only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Sample rate is zero, negative, or non-finite
    #[error("invalid sample rate: {sample_rate_hz} Hz")]
    InvalidSampleRate {
        /// Offending sample rate
        sample_rate_hz: f64,
    },

    /// Channel count is zero
    #[error("invalid channel count: {got}")]
    InvalidChannelCount {
        /// Offending channel count
        got: usize,
    },

    /// Window length is zero
    #[error("invalid window length: {got} samples")]
    InvalidWindowLength {
        /// Offending window length
        got: usize,
    },

    /// Band edges are non-finite, negative, or inverted
    #[error("invalid {band} band edges: {low_hz}-{high_hz} Hz")]
    InvalidBandEdges {
        /// Band name
        band: &'static str,
        /// Lower edge in Hz
        low_hz: f64,
        /// Upper edge in Hz
        high_hz: f64,
    },

    /// Sample rate cannot resolve the bands up through beta
    #[error("sample rate {sample_rate_hz} Hz below Nyquist requirement {required_hz} Hz")]
    NyquistViolation {
        /// Configured sample rate
        sample_rate_hz: f64,
        /// Minimum sample rate for the configured bands
        required_hz: f64,
    },

    /// A threshold or rate parameter is outside its valid range
    #[error("parameter {name} out of range: {value}")]
    InvalidThreshold {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// Peak-to-peak plausibility envelope is inverted
    #[error("inverted amplitude envelope: {min_uv}-{max_uv} µV")]
    InvalidEnvelope {
        /// Lower envelope edge in µV
        min_uv: f64,
        /// Upper envelope edge in µV
        max_uv: f64,
    },
}

/// Recoverable per-window errors. Each rejects exactly one window and leaves
/// the subject state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Window index regressed below the last processed index
    #[error("out-of-order window {received} (last processed {last_processed})")]
    OutOfOrderWindow {
        /// Index of the rejected window
        received: u64,
        /// Index of the last accepted window
        last_processed: u64,
    },

    /// Window index was already processed
    #[error("duplicate window {index}")]
    DuplicateWindow {
        /// The duplicated index
        index: u64,
    },

    /// Window channel count does not match the session geometry
    #[error("channel count mismatch: got {got}, session declares {expected}")]
    ChannelCountMismatch {
        /// Channels in the submitted window
        got: usize,
        /// Channels declared at session start
        expected: usize,
    },

    /// Window length does not match the session geometry
    #[error("window length mismatch: got {got} samples, session declares {expected}")]
    WindowLengthMismatch {
        /// Samples per channel in the submitted window
        got: usize,
        /// Samples per channel declared at session start
        expected: usize,
    },
}

/// Result alias for session-creation operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result alias for per-window operations
pub type SessionResult<T> = Result<T, SessionError>;
