//! preset-index - Build the preset catalog for awesome-chatluna-presets
//!
//! Reads the YAML presets of each source directory, attaches an AI-generated
//! description, rating and tags to each one, and writes `presets.json`.
//! Annotations are cached in `cache-presets.json` keyed by preset URL and
//! content fingerprint, so unchanged presets are never sent to the model again.

pub mod annotation;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod fingerprint;
pub mod limiter;
pub mod llm;
pub mod pipeline;
pub mod preset;
pub mod retry;
pub mod util;
