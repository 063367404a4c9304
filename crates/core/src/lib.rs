//! Shared domain types for the ModelLab backend.
//!
//! Pure logic only: identifiers, the job state machine, processing
//! variants and input validation. No IO lives here.

pub mod error;
pub mod job;
pub mod types;
pub mod validation;
pub mod variant;
