//! bpcheck - Blueprint encoding decoder and mod compatibility library
//!
//! This library provides the core functionality behind blueprint sharing:
//! - Decoding and validating encoded blueprints per mod grammar
//! - Mod-version compatibility ranges and freshness checks
//! - A post-commit parse job with per-blueprint serialization
//! - Batch checking of blueprint files

pub mod catalog;
pub mod checker;
pub mod cli;
pub mod compat;
pub mod domain;
pub mod error;
pub mod grammar;
pub mod job;
pub mod output;
pub mod progress;
pub mod validation;
