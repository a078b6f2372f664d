//! oc-inject - run a locally built executable inside a running container
//!
//! This crate provides both a library and CLI for oc-inject, including:
//! - Dependency discovery through the dynamic linker
//! - Injection manifests and their fingerprints
//! - Deployment planning (direct copy or staged sync)
//! - Transfer and launch through the container-platform client
//! - Configuration file parsing and merging

pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod process;
pub mod resolve;

pub use error::{Error, Result};
