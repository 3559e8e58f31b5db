//! bubblemark-detect: bubble-detection collaborators.
//!
//! Implements the `Detector` trait for an external OMR engine over HTTP and
//! for pre-detected JSON responses, and loads the marking configuration that
//! chooses between them.

pub mod config;
pub mod http;
pub mod json;
pub mod mock;

pub use config::{create_detector, load_config_from, DetectorConfig, MarkingConfig};
