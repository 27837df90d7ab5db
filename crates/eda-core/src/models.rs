use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel substituted for a missing province/state.
pub const SUBREGION_SENTINEL: &str = "NA";

// ── Columns ───────────────────────────────────────────────────────────────────

/// Columns that can be used as grouping keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyColumn {
    /// Calendar date of the observation.
    Date,
    /// Country / region name.
    Region,
    /// Province / state name.
    Subregion,
}

impl KeyColumn {
    /// Internal column name, e.g. `"region"`.
    pub fn name(self) -> &'static str {
        match self {
            KeyColumn::Date => "date",
            KeyColumn::Region => "region",
            KeyColumn::Subregion => "subregion",
        }
    }
}

impl fmt::Display for KeyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric count columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Confirmed,
    Deaths,
    Recovered,
    /// `confirmed − deaths − recovered`, derived during normalization.
    StillInfected,
}

impl Metric {
    /// Every metric, in canonical column order.
    pub const ALL: [Metric; 4] = [
        Metric::Confirmed,
        Metric::Deaths,
        Metric::Recovered,
        Metric::StillInfected,
    ];

    /// The three counts read from the source file.
    pub const SOURCE: [Metric; 3] = [Metric::Confirmed, Metric::Deaths, Metric::Recovered];

    /// The components of `confirmed`; melting these never double-counts.
    pub const COMPONENTS: [Metric; 3] = [Metric::StillInfected, Metric::Deaths, Metric::Recovered];

    /// Internal column name, e.g. `"still_infected"`.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Confirmed => "confirmed",
            Metric::Deaths => "deaths",
            Metric::Recovered => "recovered",
            Metric::StillInfected => "still_infected",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── KeyValue ──────────────────────────────────────────────────────────────────

/// The value of a [`KeyColumn`] for one row.
///
/// Ordered so that grouped views come out sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Date(NaiveDate),
    Text(String),
}

impl KeyValue {
    /// The date held by this value, if it is one.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            KeyValue::Date(d) => Some(*d),
            KeyValue::Text(_) => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            KeyValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<NaiveDate> for KeyValue {
    fn from(d: NaiveDate) -> Self {
        KeyValue::Date(d)
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        KeyValue::Text(s.to_string())
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One row as read from the source file; nullable fields are still `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Observation date.
    pub date: NaiveDate,
    /// Country / region name (required, non-empty).
    pub region: String,
    /// Province / state name, if any.
    pub subregion: Option<String>,
    pub confirmed: Option<i64>,
    pub deaths: Option<i64>,
    pub recovered: Option<i64>,
}

impl CaseRecord {
    /// Number of missing cells in this row.
    pub fn null_count(&self) -> usize {
        [
            self.subregion.is_none(),
            self.confirmed.is_none(),
            self.deaths.is_none(),
            self.recovered.is_none(),
        ]
        .into_iter()
        .filter(|missing| *missing)
        .count()
    }
}

/// A normalized case record: every field is present and `still_infected` is
/// always `confirmed − deaths − recovered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub date: NaiveDate,
    pub region: String,
    pub subregion: String,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    /// May be negative when the source is inconsistent.
    pub still_infected: i64,
}

impl Case {
    /// Value of a key column for this record.
    pub fn key(&self, column: KeyColumn) -> KeyValue {
        match column {
            KeyColumn::Date => KeyValue::Date(self.date),
            KeyColumn::Region => KeyValue::Text(self.region.clone()),
            KeyColumn::Subregion => KeyValue::Text(self.subregion.clone()),
        }
    }

    /// Value of a numeric column for this record.
    pub fn metric(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Confirmed => self.confirmed,
            Metric::Deaths => self.deaths,
            Metric::Recovered => self.recovered,
            Metric::StillInfected => self.still_infected,
        }
    }
}

impl From<&Case> for CaseRecord {
    /// Lift a normalized record back into the loaded shape.
    fn from(case: &Case) -> Self {
        CaseRecord {
            date: case.date,
            region: case.region.clone(),
            subregion: Some(case.subregion.clone()),
            confirmed: Some(case.confirmed),
            deaths: Some(case.deaths),
            recovered: Some(case.recovered),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
