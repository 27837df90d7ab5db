mod bootstrap;

use anyhow::Result;
use eda_charts::json_sink::JsonSink;
use eda_charts::report::{render_report, ReportSummary};
use eda_charts::text_sink::TextSink;
use eda_core::formatting::{format_count, format_rate};
use eda_core::models::Metric;
use eda_core::settings::{ColumnMap, Settings};
use eda_data::aggregator::{AggregatedView, CaseAggregator};
use eda_data::analysis::{run_pipeline, PipelineResult};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("covid-eda v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Input: {}, format: {}",
        settings.input.display(),
        settings.format
    );

    let summary = run(&settings, &ColumnMap::config_path())?;

    if summary.undefined_recovery_rates > 0 {
        tracing::warn!(
            "{} region(s) had no confirmed cases; recovery rate undefined",
            summary.undefined_recovery_rates
        );
    }

    Ok(())
}

/// Load, prepare and render the full report for `settings`.
///
/// `default_columns` is where the column map is looked up when `--columns`
/// is not given.
fn run(settings: &Settings, default_columns: &std::path::Path) -> Result<ReportSummary> {
    let columns = ColumnMap::resolve(settings.columns.as_deref(), default_columns)?;
    let result = run_pipeline(&settings.input, &columns)?;

    if let Some(region) = &settings.region {
        log_region(&result, region)?;
    }

    let summary = match settings.format.as_str() {
        "text" => {
            let stdout = std::io::stdout();
            let mut sink = TextSink::new(stdout.lock());
            render_report(&result, &columns, &mut sink)?
        }
        _ => {
            let mut sink = JsonSink::new(&settings.output_dir)?;
            let summary = render_report(&result, &columns, &mut sink)?;
            tracing::info!(
                "Wrote {} chart files to {}",
                sink.written().len(),
                settings.output_dir.display()
            );
            summary
        }
    };

    Ok(summary)
}

/// Log the per-province totals and recovery rate of one region.
///
/// Provinces with nothing confirmed log their rate as `undefined`.
fn log_region(result: &PipelineResult, region: &str) -> Result<()> {
    let view = result.region_breakdown(region)?;
    if view.is_empty() {
        tracing::warn!("Region '{}' not found in the data", region);
        return Ok(());
    }

    let deaths = view.metric_index(Metric::Deaths)?;
    let rates = CaseAggregator::recovery_rates(&view)?;
    for (row, rate) in view.rows.iter().zip(&rates) {
        tracing::info!(
            "{}: confirmed {}, deaths {}, recovered {} ({})",
            AggregatedView::key_label(row),
            format_count(rate.confirmed),
            format_count(row.values[deaths]),
            format_count(rate.recovered),
            format_rate(rate.ratio())
        );
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
