//! Chart output layer.
//!
//! Defines the sink contract (explicit chart configuration plus a prepared
//! table), a JSON sink that writes one document per chart, a plain-text sink,
//! and the fixed report sequence that feeds them.

pub mod json_sink;
pub mod report;
pub mod sink;
pub mod text_sink;

pub use eda_core as core;
pub use eda_data as data;
