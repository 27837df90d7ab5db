//! The chart sink contract.
//!
//! A sink receives a prepared [`ChartTable`] and an explicit [`ChartSpec`]
//! naming which columns play which role. Nothing about rendering is shared
//! between calls; every chart carries its own configuration.

use chrono::NaiveDate;
use serde::Serialize;

use eda_core::error::{EdaError, Result};
use eda_core::settings::ColumnMap;
use eda_data::aggregator::AggregatedView;
use eda_data::reshaper::LongTable;

// ── ChartSpec ─────────────────────────────────────────────────────────────────

/// Kind of visual to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Treemap,
    Bar,
    Choropleth,
}

/// Which table columns play which visual role.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnRoles {
    /// Category / identifier axis (bar x-axis, choropleth locations).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Numeric value axis.
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_frame: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_name: Option<String>,
    /// Hierarchical breakdown for nested charts, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    /// Constant label placed above the first path level (e.g. `"world"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_root: Option<String>,
}

impl ColumnRoles {
    /// Every column name these roles reference.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = vec![self.value.as_str()];
        for opt in [
            &self.category,
            &self.color,
            &self.animation_frame,
            &self.hover_name,
        ] {
            if let Some(c) = opt {
                cols.push(c);
            }
        }
        cols.extend(self.path.iter().map(String::as_str));
        cols
    }
}

/// Continuous colour scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorScale {
    /// Named scale, e.g. `"RdBu"` or `"thermal"`.
    pub name: String,
    /// Value mapped to the centre of the scale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midpoint: Option<f64>,
}

impl ColorScale {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            midpoint: None,
        }
    }
}

/// Figure size in pixels; `None` leaves the sink's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Full configuration of one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub roles: ColumnRoles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scale: Option<ColorScale>,
    pub layout: Layout,
    /// Label placement for treemap tiles (e.g. `"top center"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_position: Option<String>,
    /// How choropleth locations are matched (e.g. `"country names"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_mode: Option<String>,
}

impl ChartSpec {
    /// A chart of `kind` with only the value role set.
    pub fn new(kind: ChartKind, title: &str, value: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            roles: ColumnRoles {
                value: value.to_string(),
                ..ColumnRoles::default()
            },
            color_scale: None,
            layout: Layout::default(),
            text_position: None,
            location_mode: None,
        }
    }

    /// Check that every referenced column exists in `table`.
    pub fn validate(&self, table: &ChartTable) -> Result<()> {
        for col in self.roles.referenced_columns() {
            if table.column_index(col).is_none() {
                return Err(EdaError::SchemaMismatch(format!(
                    "chart '{}' references missing column '{}'",
                    self.title, col
                )));
            }
        }
        if self.kind == ChartKind::Treemap && self.roles.path.is_empty() {
            return Err(EdaError::SchemaMismatch(format!(
                "treemap '{}' needs at least one path column",
                self.title
            )));
        }
        Ok(())
    }
}

// ── ChartTable ────────────────────────────────────────────────────────────────

/// One cell of a [`ChartTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Date(NaiveDate),
    Int(i64),
    /// May be non-finite; JSON output writes those as `null`.
    Float(f64),
}

/// A named-column table handed to a sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ChartTable {
    /// Flatten an aggregated view using display names from `names`.
    pub fn from_view(view: &AggregatedView, names: &ColumnMap) -> Self {
        let columns = view
            .key_columns
            .iter()
            .map(|k| names.key_name(*k).to_string())
            .chain(view.metrics.iter().map(|m| names.metric_name(*m).to_string()))
            .collect();

        let rows = view
            .rows
            .iter()
            .map(|r| {
                r.key
                    .iter()
                    .map(Cell::from)
                    .chain(r.values.iter().map(|v| Cell::Int(*v)))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Flatten a long-form table; the variable column holds display names.
    pub fn from_long(long: &LongTable, names: &ColumnMap) -> Self {
        let columns = long
            .id_columns
            .iter()
            .map(|k| names.key_name(*k).to_string())
            .chain([long.var_name.clone(), long.value_name.clone()])
            .collect();

        let rows = long
            .rows
            .iter()
            .map(|r| {
                r.ids
                    .iter()
                    .map(Cell::from)
                    .chain([
                        Cell::Text(names.metric_name(r.variable).to_string()),
                        Cell::Int(r.value),
                    ])
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| {
                        let value = serde_json::to_value(cell).unwrap_or(serde_json::Value::Null);
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

impl From<&eda_core::models::KeyValue> for Cell {
    fn from(key: &eda_core::models::KeyValue) -> Self {
        match key {
            eda_core::models::KeyValue::Date(d) => Cell::Date(*d),
            eda_core::models::KeyValue::Text(s) => Cell::Text(s.clone()),
        }
    }
}

// ── ChartSink ─────────────────────────────────────────────────────────────────

/// Consumer of prepared chart tables.
pub trait ChartSink {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Render one chart. Implementations should call [`ChartSpec::validate`]
    /// before producing output.
    fn render(&mut self, spec: &ChartSpec, table: &ChartTable) -> Result<()>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
