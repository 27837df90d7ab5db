//! Imputation of missing values and derivation of `still_infected`.

use eda_core::error::{EdaError, Result};
use eda_core::models::{Case, CaseRecord, SUBREGION_SENTINEL};
use tracing::{debug, warn};

/// Normalize loaded records.
///
/// * missing `subregion` → `"NA"`
/// * missing `confirmed` / `deaths` / `recovered` → `0`
/// * `still_infected = confirmed − deaths − recovered`, never clamped
///
/// Counts are imputed before `still_infected` is derived, so the identity
/// holds on every output row. Applying this to the lifted output of a
/// previous call returns the same records.
///
/// Fails with [`EdaError::CountOverflow`] when a difference leaves the `i64`
/// range.
pub fn normalize(records: &[CaseRecord]) -> Result<Vec<Case>> {
    let cases = records
        .iter()
        .map(normalize_record)
        .collect::<Result<Vec<Case>>>()?;

    let inconsistent = cases.iter().filter(|c| c.still_infected < 0).count();
    if inconsistent > 0 {
        warn!(
            "{} record(s) have deaths + recovered > confirmed (negative still_infected)",
            inconsistent
        );
    }
    debug!("Normalized {} records", cases.len());

    Ok(cases)
}

/// Normalize a single record.
pub fn normalize_record(record: &CaseRecord) -> Result<Case> {
    let confirmed = record.confirmed.unwrap_or(0);
    let deaths = record.deaths.unwrap_or(0);
    let recovered = record.recovered.unwrap_or(0);

    let still_infected = confirmed
        .checked_sub(deaths)
        .and_then(|v| v.checked_sub(recovered))
        .ok_or_else(|| {
            EdaError::CountOverflow(format!(
                "still infected for {} on {}: {} - {} - {}",
                record.region, record.date, confirmed, deaths, recovered
            ))
        })?;

    Ok(Case {
        date: record.date,
        region: record.region.clone(),
        subregion: record
            .subregion
            .clone()
            .unwrap_or_else(|| SUBREGION_SENTINEL.to_string()),
        confirmed,
        deaths,
        recovered,
        still_infected,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
