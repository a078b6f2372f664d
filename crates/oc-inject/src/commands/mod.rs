//! CLI command implementations

pub mod inject;
