//! CSV loading for the case dataset.
//!
//! Reads the cleaned case table with the `csv` crate and converts each row
//! into a [`CaseRecord`] against the explicit [`ColumnMap`] schema. Nullable
//! fields stay `None`; imputation is the normalizer's job.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use eda_core::error::{EdaError, Result};
use eda_core::models::CaseRecord;
use eda_core::settings::ColumnMap;
use tracing::{debug, info};

/// Date-only patterns, tried in order. `%y` must precede `%Y` so that
/// `"1/22/20"` is read as 2020, not year 20.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%d.%m.%Y"];

/// Date-time patterns whose time part is dropped.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M",
];

/// Largest accepted count: every integer up to 2^53 is exact as `f64`.
pub const MAX_COUNT: i64 = 1 << 53;

// ── Public types ──────────────────────────────────────────────────────────────

/// The in-memory result of reading the source file.
#[derive(Debug, Clone, Default)]
pub struct LoadedTable {
    /// Rows in file order.
    pub records: Vec<CaseRecord>,
    /// Total number of missing cells across all rows.
    pub null_count: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the case table from `path`.
///
/// Fails with [`EdaError::SourceUnavailable`] when the file cannot be opened.
pub fn load_case_records(path: &Path, columns: &ColumnMap) -> Result<LoadedTable> {
    let file = std::fs::File::open(path).map_err(|source| EdaError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let table = load_case_records_from_reader(std::io::BufReader::new(file), columns)?;
    info!(
        "Loaded {} records from {} ({} missing cells)",
        table.records.len(),
        path.display(),
        table.null_count
    );
    Ok(table)
}

/// Load the case table from any reader holding comma-separated text with a
/// header row.
pub fn load_case_records_from_reader<R: Read>(
    reader: R,
    columns: &ColumnMap,
) -> Result<LoadedTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| csv_error(e, 1))?.clone();
    let index = HeaderIndex::resolve(&headers, columns)?;

    let mut table = LoadedTable::default();
    for result in rdr.records() {
        let row = result.map_err(|e| csv_error(e, 0))?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let record = index.parse_row(&row, line, columns)?;
        table.null_count += record.null_count();
        table.records.push(record);
    }

    debug!("Parsed {} rows", table.records.len());
    Ok(table)
}

/// Parse a calendar date in any of the accepted formats.
///
/// Time-of-day parts are discarded.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Parse an optional count.
///
/// Empty text and `NaN` are missing. Floats with no fractional part (as
/// written by dataframe exports with missing values) are accepted. Counts
/// must lie in `0..=MAX_COUNT`.
pub fn parse_count(s: &str) -> std::result::Result<Option<i64>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let value = match s.parse::<i64>() {
        Ok(v) => v,
        Err(_) => match s.parse::<f64>() {
            Ok(v) if v.is_nan() => return Ok(None),
            Ok(v) if v.fract() == 0.0 && v.abs() <= MAX_COUNT as f64 => v as i64,
            Ok(v) if v.fract() == 0.0 => return Err(out_of_range(s)),
            _ => return Err(format!("'{}' is not a whole number", s)),
        },
    };
    if !(0..=MAX_COUNT).contains(&value) {
        return Err(out_of_range(s));
    }
    Ok(Some(value))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Positions of the configured columns within the header row.
struct HeaderIndex {
    date: usize,
    region: usize,
    subregion: usize,
    confirmed: usize,
    deaths: usize,
    recovered: usize,
}

impl HeaderIndex {
    fn resolve(headers: &csv::StringRecord, columns: &ColumnMap) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                EdaError::SchemaMismatch(format!("column '{}' not found in header", name))
            })
        };

        Ok(Self {
            date: find(columns.date.as_str())?,
            region: find(columns.region.as_str())?,
            subregion: find(columns.subregion.as_str())?,
            confirmed: find(columns.confirmed.as_str())?,
            deaths: find(columns.deaths.as_str())?,
            recovered: find(columns.recovered.as_str())?,
        })
    }

    fn parse_row(
        &self,
        row: &csv::StringRecord,
        line: u64,
        columns: &ColumnMap,
    ) -> Result<CaseRecord> {
        let field = move |i: usize| row.get(i).unwrap_or("");
        let malformed = |reason: String| EdaError::MalformedRecord { line, reason };

        let raw_date = field(self.date);
        let date = parse_date(raw_date).ok_or_else(|| {
            malformed(format!("invalid {} '{}'", columns.date, raw_date))
        })?;

        let region = field(self.region);
        if region.is_empty() {
            return Err(malformed(format!("{} is empty", columns.region)));
        }

        let subregion = match field(self.subregion) {
            "" => None,
            s => Some(s.to_string()),
        };

        let count = |i: usize, name: &str| {
            parse_count(field(i)).map_err(|e| malformed(format!("{}: {}", name, e)))
        };

        Ok(CaseRecord {
            date,
            region: region.to_string(),
            subregion,
            confirmed: count(self.confirmed, columns.confirmed.as_str())?,
            deaths: count(self.deaths, columns.deaths.as_str())?,
            recovered: count(self.recovered, columns.recovered.as_str())?,
        })
    }
}

fn out_of_range(s: &str) -> String {
    format!("'{}' is outside 0..={}", s, MAX_COUNT)
}

/// Map a `csv` error to [`EdaError::MalformedRecord`], preferring the line
/// the error itself reports.
fn csv_error(err: csv::Error, fallback_line: u64) -> EdaError {
    let line = err
        .position()
        .map(|p| p.line())
        .unwrap_or(fallback_line);
    EdaError::MalformedRecord {
        line,
        reason: err.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "Province/State,Country/Region,Lat,Long,Date,Confirmed,Deaths,Recovered";

    fn load(body: &str) -> Result<LoadedTable> {
        let text = format!("{}\n{}", HEADER, body);
        load_case_records_from_reader(text.as_bytes(), &ColumnMap::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(parse_date("2020-03-01"), Some(date(2020, 3, 1)));
    }

    #[test]
    fn test_parse_date_us_short_year() {
        assert_eq!(parse_date("1/22/20"), Some(date(2020, 1, 22)));
    }

    #[test]
    fn test_parse_date_us_long_year() {
        assert_eq!(parse_date("03/15/2020"), Some(date(2020, 3, 15)));
    }

    #[test]
    fn test_parse_date_day_first_dotted() {
        assert_eq!(parse_date("15.03.2020"), Some(date(2020, 3, 15)));
    }

    #[test]
    fn test_parse_date_drops_time() {
        assert_eq!(parse_date("2020-03-01 23:59:59"), Some(date(2020, 3, 1)));
        assert_eq!(parse_date("2020-03-01T10:00:00Z"), Some(date(2020, 3, 1)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2020-13-01"), None);
    }

    // ── parse_count ───────────────────────────────────────────────────────────

    #[test]
    fn test_parse_count_variants() {
        assert_eq!(parse_count("42"), Ok(Some(42)));
        assert_eq!(parse_count(""), Ok(None));
        assert_eq!(parse_count("12.0"), Ok(Some(12)));
        assert_eq!(parse_count("NaN"), Ok(None));
    }

    #[test]
    fn test_parse_count_rejects_fractions_and_text() {
        assert!(parse_count("1.5").is_err());
        assert!(parse_count("many").is_err());
        assert!(parse_count("inf").is_err());
    }

    #[test]
    fn test_parse_count_rejects_negative() {
        assert!(parse_count("-5").is_err());
        assert!(parse_count("-5.0").is_err());
        assert_eq!(parse_count("0"), Ok(Some(0)));
        assert_eq!(parse_count("-0.0"), Ok(Some(0)));
    }

    #[test]
    fn test_parse_count_bounds() {
        assert_eq!(parse_count("9007199254740992"), Ok(Some(MAX_COUNT)));
        assert!(parse_count("9007199254740993").is_err());
        assert!(parse_count("9000000000000000000").is_err());
        assert!(parse_count("1e30").is_err());
    }

    // ── load_case_records_from_reader ─────────────────────────────────────────

    #[test]
    fn test_load_parses_rows_in_order() {
        let table = load(
            "Hubei,China,30.97,112.27,1/22/20,444,17,28\n\
             ,Italy,43.0,12.0,2020-03-01,1694,34,83\n",
        )
        .expect("load");

        assert_eq!(table.records.len(), 2);
        let first = &table.records[0];
        assert_eq!(first.region, "China");
        assert_eq!(first.subregion.as_deref(), Some("Hubei"));
        assert_eq!(first.date, date(2020, 1, 22));
        assert_eq!(first.confirmed, Some(444));

        let second = &table.records[1];
        assert_eq!(second.subregion, None);
        assert_eq!(second.recovered, Some(83));
        assert_eq!(table.null_count, 1);
    }

    #[test]
    fn test_load_keeps_missing_counts_as_none() {
        let table = load(",Iran,32.0,53.0,2020-02-20,2,,\n").expect("load");
        let record = &table.records[0];
        assert_eq!(record.deaths, None);
        assert_eq!(record.recovered, None);
        assert_eq!(table.null_count, 3);
    }

    #[test]
    fn test_load_bad_date_is_malformed() {
        let err = load(",Italy,43.0,12.0,2020-03-01,1,0,0\n,Italy,43.0,12.0,soon,1,0,0\n")
            .unwrap_err();
        match err {
            EdaError::MalformedRecord { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("soon"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_non_numeric_count_is_malformed() {
        let err = load(",Italy,43.0,12.0,2020-03-01,lots,0,0\n").unwrap_err();
        assert!(matches!(err, EdaError::MalformedRecord { .. }));
    }

    #[test]
    fn test_load_negative_count_is_malformed() {
        let err = load(",X,0.0,0.0,2020-03-01,-5,0,0\n").unwrap_err();
        match err {
            EdaError::MalformedRecord { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("Confirmed"));
                assert!(reason.contains("-5"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_wrong_field_count_is_malformed() {
        let err = load(
            ",Italy,43.0,12.0,2020-03-01,1,0,0\n\
             ,Italy,43.0,12.0,2020-03-02,1,0\n",
        )
        .unwrap_err();
        match err {
            EdaError::MalformedRecord { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_invalid_utf8_is_malformed() {
        let mut bytes = format!("{}\n,Italy,43.0,12.0,2020-03-01,1,0,0\n", HEADER).into_bytes();
        bytes.extend_from_slice(b",It\xffly,43.0,12.0,2020-03-02,1,0,0\n");
        let err = load_case_records_from_reader(bytes.as_slice(), &ColumnMap::default())
            .unwrap_err();
        match err {
            EdaError::MalformedRecord { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_empty_region_is_malformed() {
        let err = load("Hubei,,30.97,112.27,2020-03-01,1,0,0\n").unwrap_err();
        assert!(matches!(err, EdaError::MalformedRecord { .. }));
    }

    #[test]
    fn test_load_missing_column_is_schema_mismatch() {
        let text = "Country/Region,Date,Confirmed,Deaths,Recovered\nItaly,2020-03-01,1,0,0\n";
        let err = load_case_records_from_reader(text.as_bytes(), &ColumnMap::default())
            .unwrap_err();
        match err {
            EdaError::SchemaMismatch(msg) => assert!(msg.contains("Province/State")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_custom_column_map() {
        let columns = ColumnMap {
            date: "ObservationDate".to_string(),
            ..ColumnMap::default()
        };
        let text = "ObservationDate,Province/State,Country/Region,Confirmed,Deaths,Recovered\n\
                    2020-03-01,,Spain,84,0,2\n";
        let table = load_case_records_from_reader(text.as_bytes(), &columns).expect("load");
        assert_eq!(table.records[0].date, date(2020, 3, 1));
    }

    #[test]
    fn test_load_header_only_is_empty() {
        let table = load("").expect("load");
        assert!(table.records.is_empty());
        assert_eq!(table.null_count, 0);
    }

    // ── load_case_records ─────────────────────────────────────────────────────

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("covid19clean.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, ",Korea South,36.0,128.0,2020-03-01,3736,17,30").unwrap();
        drop(file);

        let table = load_case_records(&path, &ColumnMap::default()).expect("load");
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].region, "Korea South");
    }

    #[test]
    fn test_load_missing_file_is_source_unavailable() {
        let tmp = TempDir::new().expect("tempdir");
        let err = load_case_records(&tmp.path().join("absent.csv"), &ColumnMap::default())
            .unwrap_err();
        assert!(matches!(err, EdaError::SourceUnavailable { .. }));
    }
}
