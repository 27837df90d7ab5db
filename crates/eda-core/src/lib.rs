//! Shared foundation for the case-data pipeline.
//!
//! Holds the error type, the explicit record schema (key columns, metrics,
//! raw and normalized records), command-line settings with the configurable
//! source column map, and number formatting used by the text renderer.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{EdaError, Result};
