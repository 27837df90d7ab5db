//! Sink that writes each chart as a standalone JSON document.

use std::path::{Path, PathBuf};

use eda_core::error::Result;
use serde::Serialize;
use tracing::debug;

use crate::sink::{ChartSink, ChartSpec, ChartTable};

#[derive(Serialize)]
struct ChartDocument<'a> {
    spec: &'a ChartSpec,
    data: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Writes `NN-<slug>.json` files holding `{"spec": …, "data": […]}`.
pub struct JsonSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonSink {
    /// Create the sink, creating `dir` (and parents) if needed.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    /// Files written so far, in render order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ChartSink for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn render(&mut self, spec: &ChartSpec, table: &ChartTable) -> Result<()> {
        spec.validate(table)?;

        let doc = ChartDocument {
            spec,
            data: table.to_records(),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        let path = self
            .dir
            .join(format!("{:02}-{}.json", self.written.len() + 1, slugify(&spec.title)));
        std::fs::write(&path, json)?;
        debug!("Wrote {} ({} rows)", path.display(), table.len());

        self.written.push(path);
        Ok(())
    }
}

/// Lowercase ASCII slug: runs of anything but letters and digits become `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("chart");
    }
    slug
}

// ── Tests ─────────────────────────────────────────────────────────────────────
