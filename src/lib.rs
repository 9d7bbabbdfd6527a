//! IAT Engine - Client-local trial sequencing and scoring for Implicit Association Tests
//!
//! The engine drives the standard seven-block IAT procedure: counterbalanced
//! block planning → trial shuffling → timed response collection (with the
//! retry-until-correct rule) → improved D-score computation → emission of a
//! session record to the host application.
//!
//! ## Modules
//!
//! - **Trial Pipeline**: Plan, shuffle, and present trials for blocks 1-7
//! - **Scoring**: Compute the improved D-score (Greenwald et al.) from a response log

pub mod catalog;
pub mod clock;
pub mod collector;
pub mod error;
pub mod planner;
pub mod schema;
pub mod scoring;
pub mod sequencer;
pub mod session;
pub mod sink;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use catalog::StimulusCatalog;
pub use clock::{Clock, MonotonicClock};
pub use error::EngineError;
pub use scoring::compute_d_score;
pub use session::TestSession;
pub use sink::ResultSink;
pub use types::{
    CategoryTag, DScoreResult, KeySide, Response, SessionRecord, TestModel, Trial,
};

// Schema exports
pub use schema::{ResponseLog, SCHEMA_VERSION};

/// Engine version embedded in all session records
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for session records
pub const PRODUCER_NAME: &str = "iat-engine";
