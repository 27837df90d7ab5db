//! Data preparation layer.
//!
//! Loads the case CSV, normalizes missing values, aggregates the derived
//! views and reshapes them into long form for charting.

pub mod aggregator;
pub mod analysis;
pub mod normalizer;
pub mod reader;
pub mod reshaper;

pub use eda_core as core;
