//! Core synthesis logic: tree, tokens, resolution, synthesis, assembly.

pub mod assembler;
pub mod differ;
pub mod error;
pub mod hasher;
pub mod logical_id;
pub mod manifest;
pub mod parser;
pub mod resolver;
pub mod schema;
pub mod synth;
pub mod token;
pub mod tree;
pub mod types;

pub use error::SynthError;
pub use tree::{ConstructTree, NodeId};
pub use types::{Template, Value};
