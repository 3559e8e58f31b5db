//! bubblemark-core: answer-key evaluation, learning-area analysis, and batch
//! orchestration.
//!
//! This crate defines the data model, the collaborator traits for detection
//! and artifact rendering, and the marking logic the rest of bubblemark
//! builds on.

pub mod analysis;
pub mod answer_key;
pub mod bundle;
pub mod concept_map;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod manifest;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod statistics;
pub mod traits;
