//! synthform: construct trees to declarative infrastructure templates.
//!
//! Build a tree of constructs, let deferred values resolve at synthesis,
//! and get a CloudFormation-shaped template with deterministic logical IDs.
//! The `assertions` module checks synthesized templates in tests.

pub mod assertions;
pub mod cli;
pub mod constructs;
pub mod core;
