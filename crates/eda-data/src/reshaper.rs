//! Wide-to-long reshaping ("melt") of aggregated views for charting.

use std::collections::BTreeMap;

use eda_core::error::{EdaError, Result};
use eda_core::models::{KeyColumn, KeyValue, Metric};

use crate::aggregator::{AggregatedRow, AggregatedView};

/// Default name of the column holding the unpivoted variable.
pub const DEFAULT_VAR_NAME: &str = "variable";
/// Default name of the column holding the unpivoted value.
pub const DEFAULT_VALUE_NAME: &str = "value";

/// One (identifier tuple, variable, value) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRow {
    /// Identifier values, parallel to [`LongTable::id_columns`].
    pub ids: Vec<KeyValue>,
    pub variable: Metric,
    pub value: i64,
}

/// A long-form table produced by [`melt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongTable {
    pub id_columns: Vec<KeyColumn>,
    /// Name of the variable column (e.g. `"Case"`).
    pub var_name: String,
    /// Name of the value column (e.g. `"Count"`).
    pub value_name: String,
    pub rows: Vec<LongRow>,
}

impl LongTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum values per identifier tuple and spread the variables back into
    /// columns.
    ///
    /// Value columns appear in the order their variables first occur; rows
    /// are sorted by identifier.
    pub fn pivot(&self) -> Result<AggregatedView> {
        if self.id_columns.is_empty() {
            return Err(EdaError::SchemaMismatch(
                "cannot pivot a long table without identifier columns".to_string(),
            ));
        }

        let mut metrics: Vec<Metric> = Vec::new();
        for row in &self.rows {
            if !metrics.contains(&row.variable) {
                metrics.push(row.variable);
            }
        }

        let mut groups: BTreeMap<Vec<KeyValue>, Vec<i64>> = BTreeMap::new();
        for row in &self.rows {
            // `metrics` was built from these rows, so the lookup always hits.
            let Some(idx) = metrics.iter().position(|m| *m == row.variable) else {
                continue;
            };
            groups
                .entry(row.ids.clone())
                .or_insert_with(|| vec![0; metrics.len()])[idx] += row.value;
        }

        Ok(AggregatedView {
            key_columns: self.id_columns.clone(),
            metrics,
            rows: groups
                .into_iter()
                .map(|(key, values)| AggregatedRow { key, values })
                .collect(),
        })
    }
}

/// Melt `view` into long form with the default `variable` / `value` names.
pub fn melt(
    view: &AggregatedView,
    id_columns: &[KeyColumn],
    value_columns: &[Metric],
) -> Result<LongTable> {
    melt_named(
        view,
        id_columns,
        value_columns,
        DEFAULT_VAR_NAME,
        DEFAULT_VALUE_NAME,
    )
}

/// Melt `view` into long form.
///
/// Produces `view.len() × value_columns.len()` rows: every row for the first
/// value column, then every row for the second, and so on.
pub fn melt_named(
    view: &AggregatedView,
    id_columns: &[KeyColumn],
    value_columns: &[Metric],
    var_name: &str,
    value_name: &str,
) -> Result<LongTable> {
    if value_columns.is_empty() {
        return Err(EdaError::SchemaMismatch(
            "at least one value column is required".to_string(),
        ));
    }
    if var_name == value_name {
        return Err(EdaError::SchemaMismatch(format!(
            "variable and value columns are both named '{}'",
            var_name
        )));
    }

    let id_idx = id_columns
        .iter()
        .map(|c| view.key_index(*c))
        .collect::<Result<Vec<_>>>()?;

    let mut value_idx = Vec::with_capacity(value_columns.len());
    for (i, metric) in value_columns.iter().enumerate() {
        if value_columns[..i].contains(metric) {
            return Err(EdaError::SchemaMismatch(format!(
                "value column '{}' given twice",
                metric
            )));
        }
        value_idx.push((*metric, view.metric_index(*metric)?));
    }

    let mut rows = Vec::with_capacity(view.len() * value_columns.len());
    for (metric, idx) in value_idx {
        for row in &view.rows {
            rows.push(LongRow {
                ids: id_idx.iter().map(|i| row.key[*i].clone()).collect(),
                variable: metric,
                value: row.values[idx],
            });
        }
    }

    Ok(LongTable {
        id_columns: id_columns.to_vec(),
        var_name: var_name.to_string(),
        value_name: value_name.to_string(),
        rows,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
