#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the docsmith build engine
//!
//! This crate provides the step catalog used throughout the system: the
//! closed, ordered set of build steps a help-file build passes through,
//! the per-step outcome tags, and the report types produced when a run
//! reaches a terminal state.

pub mod reports;
pub mod step;

// Re-export commonly used types
pub use reports::{BuildReport, StepRecord};
pub use step::{BuildStep, StepOutcome};
pub use uuid::Uuid;
