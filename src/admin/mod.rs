#![forbid(unsafe_code)]

//! Administrative utilities over a nested-set store.
//!
//! Mutations never check the boundary encoding after the fact; [`verify`] walks every tree
//! and reports anything that breaks it.

mod verify;

/// Tree integrity verification.
///
/// Checks the boundary encoding of every scope and reports violations as findings.
pub use verify::{
    verify, verify_scope, VerifyCounts, VerifyFinding, VerifyReport, VerifySeverity,
};
