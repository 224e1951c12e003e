//! Subcommand implementations.

pub mod canonicalize;
pub mod legacy;
pub mod pit;
pub mod plan;
pub mod replay;
