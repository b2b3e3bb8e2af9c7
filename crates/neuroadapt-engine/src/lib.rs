//! Neuroadapt Engine - adaptive EEG processing pipeline
//!
//! This crate turns raw EEG sample windows into adaptation decisions:
//! - Signal processing (filtering, band decomposition, quality, artifacts)
//! - The Venturi three-stage transform (preprocess, signature, response)
//! - The trait modulation engine with its learning-stage and neural-state
//!   machines
//! - Session orchestration with per-subject ordering and an async router
//!   for running many subjects in parallel
//!
//! # Modules
//!
//! - [`processing`]: Filters, spectral analysis, quality, artifact detection
//! - [`venturi`]: The fixed three-stage adaptive transform
//! - [`adaptive`]: Trait modulation engine and state machines
//! - [`session`]: Single-subject orchestration
//! - [`stream`]: Multi-subject async routing
//!
//! # Example
//!
//! ```rust
//! use neuroadapt_core::{SessionConfig, SubjectId};
//! use neuroadapt_engine::session::Session;
//!
//! let config = SessionConfig::default();
//! let session = Session::new(SubjectId::from_u32(1), config).unwrap();
//! assert_eq!(session.state().windows_processed, 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod adaptive;
pub mod processing;
pub mod session;
pub mod stream;
pub mod venturi;

// Re-export key types
pub use adaptive::TraitEngine;
pub use processing::artifacts::ArtifactDetector;
pub use processing::bands::BandAnalyzer;
pub use processing::quality::QualityAssessor;
pub use session::{Session, SessionStats};
pub use stream::{SessionEvent, SessionRouter};
pub use venturi::VenturiPipeline;
