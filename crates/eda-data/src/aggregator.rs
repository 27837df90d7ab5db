//! Group-and-sum views over normalized case records.
//!
//! Every call builds a new, independently owned [`AggregatedView`]; nothing
//! here keeps state between calls.

use std::collections::BTreeMap;

use eda_core::error::{EdaError, Result};
use eda_core::models::{Case, KeyColumn, KeyValue, Metric};

// ── AggregatedView ────────────────────────────────────────────────────────────

/// One group of an [`AggregatedView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRow {
    /// Key values, parallel to [`AggregatedView::key_columns`].
    pub key: Vec<KeyValue>,
    /// Summed values, parallel to [`AggregatedView::metrics`].
    pub values: Vec<i64>,
}

/// A table of summed counts keyed by one or more columns.
///
/// Rows are sorted ascending by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedView {
    pub key_columns: Vec<KeyColumn>,
    pub metrics: Vec<Metric>,
    pub rows: Vec<AggregatedRow>,
}

impl AggregatedView {
    /// Number of groups.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `column` among the key columns.
    pub fn key_index(&self, column: KeyColumn) -> Result<usize> {
        self.key_columns
            .iter()
            .position(|c| *c == column)
            .ok_or_else(|| {
                EdaError::SchemaMismatch(format!("view is not keyed by '{}'", column))
            })
    }

    /// Position of `metric` among the value columns.
    pub fn metric_index(&self, metric: Metric) -> Result<usize> {
        self.metrics
            .iter()
            .position(|m| *m == metric)
            .ok_or_else(|| EdaError::SchemaMismatch(format!("view has no column '{}'", metric)))
    }

    /// All values of one metric, in row order.
    pub fn column(&self, metric: Metric) -> Result<Vec<i64>> {
        let idx = self.metric_index(metric)?;
        Ok(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Sum of one metric over every row.
    pub fn total(&self, metric: Metric) -> Result<i64> {
        Ok(self.column(metric)?.into_iter().sum())
    }

    /// Rows whose `column` key equals `value`, as a new view.
    pub fn filter_key(&self, column: KeyColumn, value: &KeyValue) -> Result<AggregatedView> {
        let idx = self.key_index(column)?;
        Ok(AggregatedView {
            key_columns: self.key_columns.clone(),
            metrics: self.metrics.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| &r.key[idx] == value)
                .cloned()
                .collect(),
        })
    }

    /// Human-readable label of a row's key, e.g. `"US / Washington"`.
    pub fn key_label(row: &AggregatedRow) -> String {
        row.key
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

// ── RecoveryRate ──────────────────────────────────────────────────────────────

/// `recovered / confirmed` for one geographic group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRate {
    pub key: Vec<KeyValue>,
    pub recovered: i64,
    pub confirmed: i64,
}

impl RecoveryRate {
    /// The rate, or [`EdaError::DivisionUndefined`] when `confirmed` is zero.
    pub fn rate(&self) -> Result<f64> {
        if self.confirmed == 0 {
            return Err(EdaError::DivisionUndefined {
                group: self.group(),
                numerator: self.recovered,
            });
        }
        Ok(self.recovered as f64 / self.confirmed as f64)
    }

    /// The raw IEEE quotient: NaN for `0 / 0`, infinite for `n / 0`.
    pub fn ratio(&self) -> f64 {
        self.recovered as f64 / self.confirmed as f64
    }

    fn group(&self) -> String {
        self.key
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

// ── CaseAggregator ────────────────────────────────────────────────────────────

/// Stateless helper that groups case records and sums their counts.
pub struct CaseAggregator;

impl CaseAggregator {
    /// Group `cases` by `keys` and sum each of `metrics`.
    ///
    /// One row per key combination actually observed; absent combinations
    /// are not zero-filled. A sum outside the `i64` range is
    /// [`EdaError::CountOverflow`].
    pub fn aggregate(
        cases: &[Case],
        keys: &[KeyColumn],
        metrics: &[Metric],
    ) -> Result<AggregatedView> {
        if keys.is_empty() {
            return Err(EdaError::SchemaMismatch(
                "at least one grouping column is required".to_string(),
            ));
        }
        if metrics.is_empty() {
            return Err(EdaError::SchemaMismatch(
                "at least one value column is required".to_string(),
            ));
        }
        for (i, k) in keys.iter().enumerate() {
            if keys[..i].contains(k) {
                return Err(EdaError::SchemaMismatch(format!(
                    "grouping column '{}' given twice",
                    k
                )));
            }
        }
        for (i, m) in metrics.iter().enumerate() {
            if metrics[..i].contains(m) {
                return Err(EdaError::SchemaMismatch(format!(
                    "value column '{}' given twice",
                    m
                )));
            }
        }

        // BTreeMap keeps the groups sorted by key.
        let mut groups: BTreeMap<Vec<KeyValue>, Vec<i64>> = BTreeMap::new();
        for case in cases {
            let key: Vec<KeyValue> = keys.iter().map(|k| case.key(*k)).collect();
            let sums = groups
                .entry(key)
                .or_insert_with(|| vec![0; metrics.len()]);
            for (sum, metric) in sums.iter_mut().zip(metrics) {
                *sum = sum.checked_add(case.metric(*metric)).ok_or_else(|| {
                    EdaError::CountOverflow(format!(
                        "{} total for {}",
                        metric,
                        keys.iter()
                            .map(|k| case.key(*k).to_string())
                            .collect::<Vec<_>>()
                            .join(" / ")
                    ))
                })?;
            }
        }

        Ok(AggregatedView {
            key_columns: keys.to_vec(),
            metrics: metrics.to_vec(),
            rows: groups
                .into_iter()
                .map(|(key, values)| AggregatedRow { key, values })
                .collect(),
        })
    }

    /// Totals per date over all four metrics.
    pub fn time_series(cases: &[Case]) -> Result<AggregatedView> {
        Self::aggregate(cases, &[KeyColumn::Date], &Metric::ALL)
    }

    /// Totals per `(region, subregion)` over the three source counts.
    pub fn geographic(cases: &[Case]) -> Result<AggregatedView> {
        Self::aggregate(
            cases,
            &[KeyColumn::Region, KeyColumn::Subregion],
            &Metric::SOURCE,
        )
    }

    /// Totals per region (world-level view).
    pub fn by_region(cases: &[Case]) -> Result<AggregatedView> {
        Self::aggregate(cases, &[KeyColumn::Region], &Metric::SOURCE)
    }

    /// Totals per `(region, date)`.
    pub fn region_daily(cases: &[Case]) -> Result<AggregatedView> {
        Self::aggregate(
            cases,
            &[KeyColumn::Region, KeyColumn::Date],
            &Metric::SOURCE,
        )
    }

    /// Rows of `view` whose date is the maximum date present.
    ///
    /// An empty view yields an empty view.
    pub fn latest_snapshot(view: &AggregatedView) -> Result<AggregatedView> {
        let idx = view.key_index(KeyColumn::Date)?;
        let latest = view.rows.iter().filter_map(|r| r.key[idx].as_date()).max();

        match latest {
            Some(date) => view.filter_key(KeyColumn::Date, &KeyValue::Date(date)),
            None => Ok(AggregatedView {
                rows: Vec::new(),
                ..view.clone()
            }),
        }
    }

    /// `recovered / confirmed` per row of a geographic view.
    pub fn recovery_rates(view: &AggregatedView) -> Result<Vec<RecoveryRate>> {
        let confirmed = view.metric_index(Metric::Confirmed)?;
        let recovered = view.metric_index(Metric::Recovered)?;

        Ok(view
            .rows
            .iter()
            .map(|r| RecoveryRate {
                key: r.key.clone(),
                recovered: r.values[recovered],
                confirmed: r.values[confirmed],
            })
            .collect())
    }

    /// Average of `metric` weighted by itself: `Σ v² / Σ v`.
    ///
    /// Used as the colour midpoint of the world treemap. `None` when the
    /// weights sum to zero.
    pub fn weighted_midpoint(view: &AggregatedView, metric: Metric) -> Result<Option<f64>> {
        let values = view.column(metric)?;
        let weight: f64 = values.iter().map(|v| *v as f64).sum();
        if weight == 0.0 {
            return Ok(None);
        }
        let weighted: f64 = values.iter().map(|v| (*v as f64) * (*v as f64)).sum();
        Ok(Some(weighted / weight))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn case(
        day: NaiveDate,
        region: &str,
        subregion: &str,
        confirmed: i64,
        deaths: i64,
        recovered: i64,
    ) -> Case {
        Case {
            date: day,
            region: region.to_string(),
            subregion: subregion.to_string(),
            confirmed,
            deaths,
            recovered,
            still_infected: confirmed - deaths - recovered,
        }
    }

    fn sample() -> Vec<Case> {
        vec![
            case(date(2020, 3, 2), "US", "Washington", 18, 6, 1),
            case(date(2020, 3, 1), "A", "NA", 10, 1, 2),
            case(date(2020, 3, 1), "B", "NA", 5, 0, 1),
            case(date(2020, 3, 2), "US", "New York", 1, 0, 0),
            case(date(2020, 3, 2), "A", "NA", 12, 1, 3),
        ]
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_time_series_worked_example() {
        let cases = vec![
            case(date(2020, 3, 1), "A", "NA", 10, 1, 2),
            case(date(2020, 3, 1), "B", "NA", 5, 0, 1),
        ];
        let view = CaseAggregator::time_series(&cases).expect("aggregate");

        assert_eq!(view.len(), 1);
        let row = &view.rows[0];
        assert_eq!(row.key, vec![KeyValue::Date(date(2020, 3, 1))]);
        assert_eq!(row.values, vec![15, 1, 3, 11]);
    }

    #[test]
    fn test_time_series_one_row_per_distinct_date() {
        let cases = sample();
        let view = CaseAggregator::time_series(&cases).expect("aggregate");

        assert_eq!(view.len(), 2);
        for row in &view.rows {
            let day = row.key[0].as_date().unwrap();
            let expected: i64 = cases
                .iter()
                .filter(|c| c.date == day)
                .map(|c| c.confirmed)
                .sum();
            assert_eq!(row.values[0], expected);
        }
    }

    #[test]
    fn test_rows_sorted_by_key() {
        let view = CaseAggregator::geographic(&sample()).expect("aggregate");
        let labels: Vec<String> = view.rows.iter().map(AggregatedView::key_label).collect();
        assert_eq!(
            labels,
            vec!["A / NA", "B / NA", "US / New York", "US / Washington"]
        );
    }

    #[test]
    fn test_no_zero_filling_of_absent_combinations() {
        let view = CaseAggregator::region_daily(&sample()).expect("aggregate");
        // B only reports on 2020-03-01, so (B, 2020-03-02) must not appear.
        assert_eq!(view.len(), 4);
        let b_rows = view
            .filter_key(KeyColumn::Region, &KeyValue::from("B"))
            .expect("filter");
        assert_eq!(b_rows.len(), 1);
    }

    #[test]
    fn test_by_region_sums_subregions() {
        let view = CaseAggregator::by_region(&sample()).expect("aggregate");
        let us = view
            .filter_key(KeyColumn::Region, &KeyValue::from("US"))
            .expect("filter");
        assert_eq!(us.rows[0].values, vec![19, 6, 1]);
    }

    #[test]
    fn test_empty_input_gives_empty_view() {
        let view = CaseAggregator::time_series(&[]).expect("aggregate");
        assert!(view.is_empty());
        assert_eq!(view.metrics.len(), 4);
    }

    #[test]
    fn test_empty_keys_is_schema_mismatch() {
        let err = CaseAggregator::aggregate(&sample(), &[], &Metric::ALL).unwrap_err();
        assert!(matches!(err, EdaError::SchemaMismatch(_)));
    }

    #[test]
    fn test_duplicate_key_is_schema_mismatch() {
        let err = CaseAggregator::aggregate(
            &sample(),
            &[KeyColumn::Date, KeyColumn::Date],
            &Metric::ALL,
        )
        .unwrap_err();
        assert!(matches!(err, EdaError::SchemaMismatch(_)));
    }

    #[test]
    fn test_empty_metrics_is_schema_mismatch() {
        let err = CaseAggregator::aggregate(&sample(), &[KeyColumn::Date], &[]).unwrap_err();
        assert!(matches!(err, EdaError::SchemaMismatch(_)));
    }

    #[test]
    fn test_sum_overflow_is_an_error() {
        let huge = 9_000_000_000_000_000_000;
        let cases = vec![
            case(date(2020, 3, 1), "A", "NA", huge, 0, 0),
            case(date(2020, 3, 1), "B", "NA", huge, 0, 0),
        ];
        let err = CaseAggregator::time_series(&cases).unwrap_err();
        match err {
            EdaError::CountOverflow(msg) => {
                assert!(msg.contains("confirmed"));
                assert!(msg.contains("2020-03-01"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Different groups never share a sum.
        let view = CaseAggregator::by_region(&cases).expect("aggregate");
        assert_eq!(view.rows[1].values, vec![huge, 0, 0]);
    }

    // ── latest_snapshot ───────────────────────────────────────────────────────

    #[test]
    fn test_latest_snapshot_returns_max_date() {
        let view = CaseAggregator::time_series(&sample()).expect("aggregate");
        let latest = CaseAggregator::latest_snapshot(&view).expect("latest");

        assert_eq!(latest.len(), 1);
        assert_eq!(latest.rows[0].key[0], KeyValue::Date(date(2020, 3, 2)));
        assert_eq!(latest.rows[0].values, vec![31, 7, 4, 20]);
    }

    #[test]
    fn test_latest_snapshot_needs_date_key() {
        let view = CaseAggregator::by_region(&sample()).expect("aggregate");
        let err = CaseAggregator::latest_snapshot(&view).unwrap_err();
        assert!(matches!(err, EdaError::SchemaMismatch(_)));
    }

    #[test]
    fn test_latest_snapshot_of_empty_view() {
        let view = CaseAggregator::time_series(&[]).expect("aggregate");
        let latest = CaseAggregator::latest_snapshot(&view).expect("latest");
        assert!(latest.is_empty());
    }

    // ── recovery_rates ────────────────────────────────────────────────────────

    #[test]
    fn test_recovery_rate_defined() {
        let view = CaseAggregator::by_region(&sample()).expect("aggregate");
        let rates = CaseAggregator::recovery_rates(&view).expect("rates");
        let a = &rates[0];
        assert_eq!(a.key, vec![KeyValue::from("A")]);
        assert!((a.rate().unwrap() - 5.0 / 22.0).abs() < 1e-12);
    }

    #[test]
    fn test_recovery_rate_zero_confirmed_is_division_undefined() {
        let cases = vec![case(date(2020, 3, 1), "Nowhere", "NA", 0, 0, 0)];
        let view = CaseAggregator::by_region(&cases).expect("aggregate");
        let rates = CaseAggregator::recovery_rates(&view).expect("rates");

        assert!(rates[0].ratio().is_nan());
        let err = rates[0].rate().unwrap_err();
        assert!(matches!(err, EdaError::DivisionUndefined { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_recovery_rate_needs_confirmed_column() {
        let view =
            CaseAggregator::aggregate(&sample(), &[KeyColumn::Region], &[Metric::Recovered])
                .expect("aggregate");
        assert!(CaseAggregator::recovery_rates(&view).is_err());
    }

    // ── weighted_midpoint ─────────────────────────────────────────────────────

    #[test]
    fn test_weighted_midpoint() {
        let cases = vec![
            case(date(2020, 3, 1), "A", "NA", 1, 0, 0),
            case(date(2020, 3, 1), "B", "NA", 3, 0, 0),
        ];
        let view = CaseAggregator::by_region(&cases).expect("aggregate");
        let mid = CaseAggregator::weighted_midpoint(&view, Metric::Confirmed)
            .expect("midpoint")
            .unwrap();
        assert!((mid - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_midpoint_zero_weight() {
        let view = CaseAggregator::by_region(&[]).expect("aggregate");
        let mid = CaseAggregator::weighted_midpoint(&view, Metric::Confirmed).expect("midpoint");
        assert_eq!(mid, None);
    }

    // ── filter_key / totals ───────────────────────────────────────────────────

    #[test]
    fn test_filter_key_unknown_column() {
        let view = CaseAggregator::time_series(&sample()).expect("aggregate");
        assert!(view
            .filter_key(KeyColumn::Region, &KeyValue::from("US"))
            .is_err());
    }

    #[test]
    fn test_total() {
        let view = CaseAggregator::geographic(&sample()).expect("aggregate");
        assert_eq!(view.total(Metric::Confirmed).unwrap(), 46);
        assert!(view.total(Metric::StillInfected).is_err());
    }
}
