//! Top-level data preparation pipeline.
//!
//! Runs Loader → Normalizer → Aggregator once and returns every derived view
//! the charts consume, in a [`PipelineResult`]. Long-form tables are built on
//! demand from these views by the report.

use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use eda_core::error::Result;
use eda_core::models::{Case, KeyColumn};
use eda_core::settings::ColumnMap;
use tracing::info;

use crate::aggregator::{AggregatedView, CaseAggregator};
use crate::normalizer::normalize;
use crate::reader::{load_case_records, LoadedTable};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the pipeline result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PipelineMetadata {
    /// Number of records read from the source.
    pub records_loaded: usize,
    /// Missing cells found before imputation.
    pub missing_cells: usize,
    /// Records whose deaths + recovered exceed confirmed.
    pub negative_still_infected: usize,
    /// Number of distinct dates.
    pub dates: usize,
    /// Number of distinct regions.
    pub regions: usize,
    /// Most recent date in the data, if any.
    pub latest_date: Option<NaiveDate>,
    /// Wall-clock seconds spent reading the source.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent normalizing and aggregating.
    pub transform_time_seconds: f64,
}

/// Everything the report needs, computed once per run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Normalized records.
    pub cases: Vec<Case>,
    /// Per-date totals of all four metrics.
    pub time_series: AggregatedView,
    /// The time-series row(s) at the most recent date.
    pub latest: AggregatedView,
    /// Per `(region, subregion)` totals.
    pub geographic: AggregatedView,
    /// Per-region totals.
    pub by_region: AggregatedView,
    /// Per `(region, date)` totals.
    pub region_daily: AggregatedView,
    pub metadata: PipelineMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full pipeline against the file at `path`.
///
/// Any loader, normalizer or aggregator error aborts the run.
pub fn run_pipeline(path: &Path, columns: &ColumnMap) -> Result<PipelineResult> {
    let load_start = Instant::now();
    let table = load_case_records(path, columns)?;
    let load_time = load_start.elapsed().as_secs_f64();

    let mut result = prepare(table)?;
    result.metadata.load_time_seconds = load_time;
    Ok(result)
}

/// Normalize an already loaded table and build every aggregated view.
pub fn prepare(table: LoadedTable) -> Result<PipelineResult> {
    let start = Instant::now();

    let cases = normalize(&table.records)?;

    let time_series = CaseAggregator::time_series(&cases)?;
    let latest = CaseAggregator::latest_snapshot(&time_series)?;
    let geographic = CaseAggregator::geographic(&cases)?;
    let by_region = CaseAggregator::by_region(&cases)?;
    let region_daily = CaseAggregator::region_daily(&cases)?;

    let latest_date = latest
        .rows
        .first()
        .and_then(|r| r.key.first())
        .and_then(|k| k.as_date());

    let metadata = PipelineMetadata {
        records_loaded: table.records.len(),
        missing_cells: table.null_count,
        negative_still_infected: cases.iter().filter(|c| c.still_infected < 0).count(),
        dates: time_series.len(),
        regions: by_region.len(),
        latest_date,
        load_time_seconds: 0.0,
        transform_time_seconds: start.elapsed().as_secs_f64(),
    };

    info!(
        "Prepared {} records: {} dates, {} regions, latest {}",
        metadata.records_loaded,
        metadata.dates,
        metadata.regions,
        latest_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );

    Ok(PipelineResult {
        cases,
        time_series,
        latest,
        geographic,
        by_region,
        region_daily,
        metadata,
    })
}

impl PipelineResult {
    /// Geographic rows of a single region (e.g. all US states).
    pub fn region_breakdown(&self, region: &str) -> Result<AggregatedView> {
        self.geographic
            .filter_key(KeyColumn::Region, &region.into())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::load_case_records_from_reader;
    use eda_core::error::EdaError;
    use eda_core::models::{KeyValue, Metric};

    const CSV: &str = "\
Province/State,Country/Region,Date,Confirmed,Deaths,Recovered
Hubei,China,2020-03-01,66907,2761,31536
Guangdong,China,2020-03-01,1349,7,1016
,Italy,2020-03-01,1694,34,83
Washington,US,2020-03-02,18,6,1
New York,US,2020-03-02,1,0,
,Italy,2020-03-02,2036,52,149
";

    fn prepared() -> PipelineResult {
        let table = load_case_records_from_reader(CSV.as_bytes(), &ColumnMap::default())
            .expect("load");
        prepare(table).expect("prepare")
    }

    #[test]
    fn test_prepare_metadata() {
        let result = prepared();
        let meta = &result.metadata;
        assert_eq!(meta.records_loaded, 6);
        assert_eq!(meta.missing_cells, 3);
        assert_eq!(meta.dates, 2);
        assert_eq!(meta.regions, 3);
        assert_eq!(meta.latest_date, NaiveDate::from_ymd_opt(2020, 3, 2));
        assert_eq!(meta.negative_still_infected, 0);
    }

    #[test]
    fn test_prepare_latest_snapshot() {
        let result = prepared();
        assert_eq!(result.latest.len(), 1);
        assert_eq!(result.latest.rows[0].values, vec![2055, 58, 150, 1847]);
    }

    #[test]
    fn test_prepare_views_are_consistent() {
        let result = prepared();
        let total = result.time_series.total(Metric::Confirmed).unwrap();
        assert_eq!(total, result.geographic.total(Metric::Confirmed).unwrap());
        assert_eq!(total, result.by_region.total(Metric::Confirmed).unwrap());
        assert_eq!(total, result.region_daily.total(Metric::Confirmed).unwrap());
    }

    #[test]
    fn test_region_breakdown() {
        let result = prepared();
        let us = result.region_breakdown("US").expect("breakdown");
        assert_eq!(us.len(), 2);
        assert_eq!(us.rows[0].key[1], KeyValue::from("New York"));

        let italy = result.region_breakdown("Italy").expect("breakdown");
        assert_eq!(italy.rows[0].key[1], KeyValue::from("NA"));
    }

    #[test]
    fn test_run_pipeline_missing_source() {
        let err = run_pipeline(Path::new("/definitely/not/here.csv"), &ColumnMap::default())
            .unwrap_err();
        assert!(matches!(err, EdaError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_run_pipeline_from_file() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let path = tmp.path().join("covid19clean.csv");
        std::fs::write(&path, CSV).unwrap();

        let result = run_pipeline(&path, &ColumnMap::default()).expect("run");
        assert_eq!(result.cases.len(), 6);
        assert!(result.metadata.load_time_seconds >= 0.0);
    }
}
