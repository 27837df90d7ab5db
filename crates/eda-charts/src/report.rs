//! The fixed sequence of exploratory charts.
//!
//! Each chart is built from one view of a [`PipelineResult`], reshaped where
//! needed, and handed to the sink together with its own [`ChartSpec`].

use eda_core::error::Result;
use eda_core::models::{KeyColumn, Metric};
use eda_core::settings::ColumnMap;
use eda_data::aggregator::CaseAggregator;
use eda_data::analysis::PipelineResult;
use eda_data::reshaper::{melt, melt_named};
use serde::Serialize;
use tracing::{info, warn};

use crate::sink::{Cell, ChartKind, ChartSink, ChartSpec, ChartTable, ColorScale, Layout};

/// Root label of the world treemaps.
const WORLD: &str = "world";
/// Column holding the per-region recovery rate.
const RECOVERY_RATE: &str = "Recovery Rate";

const SQUARE: Layout = Layout {
    width: Some(1000),
    height: Some(1000),
};

/// What the report produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub charts_rendered: usize,
    /// Regions left out of the recovery-rate chart because nothing was
    /// confirmed there.
    pub undefined_recovery_rates: usize,
}

/// Render every chart of the report into `sink`.
///
/// Stops at the first chart that fails.
pub fn render_report(
    result: &PipelineResult,
    names: &ColumnMap,
    sink: &mut dyn ChartSink,
) -> Result<ReportSummary> {
    let mut summary = ReportSummary::default();

    let charts = [
        latest_snapshot_chart(result, names)?,
        world_confirmed_chart(result, names)?,
        deaths_by_subregion_chart(result, names)?,
        {
            let (chart, undefined) = recovery_rate_chart(result, names)?;
            summary.undefined_recovery_rates = undefined;
            chart
        },
        cases_over_time_chart(result, names)?,
        region_over_time_chart(result, names, Metric::Deaths)?,
        region_over_time_chart(result, names, Metric::Recovered)?,
        spread_map_chart(result, names),
    ];

    for (spec, table) in &charts {
        sink.render(spec, table)?;
        summary.charts_rendered += 1;
    }

    info!(
        "Rendered {} charts to the {} sink",
        summary.charts_rendered,
        sink.name()
    );
    Ok(summary)
}

// ── Charts ────────────────────────────────────────────────────────────────────

/// Treemap of the latest totals split into still infected / deaths / recovered.
pub fn latest_snapshot_chart(
    result: &PipelineResult,
    names: &ColumnMap,
) -> Result<(ChartSpec, ChartTable)> {
    let long = melt(&result.latest, &[KeyColumn::Date], &Metric::COMPONENTS)?;

    let mut spec = ChartSpec::new(ChartKind::Treemap, "Latest snapshot", &long.value_name);
    spec.roles.path = vec![long.var_name.clone()];
    spec.layout.height = Some(200);

    Ok((spec, ChartTable::from_long(&long, names)))
}

/// World treemap of confirmed cases, centred on the confirmed-weighted mean.
pub fn world_confirmed_chart(
    result: &PipelineResult,
    names: &ColumnMap,
) -> Result<(ChartSpec, ChartTable)> {
    let view = &result.geographic;
    let confirmed = names.metric_name(Metric::Confirmed);

    let mut spec = ChartSpec::new(ChartKind::Treemap, "Confirmed cases by region", confirmed);
    spec.roles.path = vec![names.key_name(KeyColumn::Region).to_string()];
    spec.roles.path_root = Some(WORLD.to_string());
    spec.color_scale = Some(ColorScale {
        name: "RdBu".to_string(),
        midpoint: CaseAggregator::weighted_midpoint(view, Metric::Confirmed)?,
    });
    spec.layout = SQUARE;

    Ok((spec, ChartTable::from_view(view, names)))
}

/// World → region → subregion treemap of deaths.
pub fn deaths_by_subregion_chart(
    result: &PipelineResult,
    names: &ColumnMap,
) -> Result<(ChartSpec, ChartTable)> {
    let mut spec = ChartSpec::new(
        ChartKind::Treemap,
        "Deaths by region and province",
        names.metric_name(Metric::Deaths),
    );
    spec.roles.path = vec![
        names.key_name(KeyColumn::Region).to_string(),
        names.key_name(KeyColumn::Subregion).to_string(),
    ];
    spec.roles.path_root = Some(WORLD.to_string());
    spec.color_scale = Some(ColorScale::named("RdBu"));
    spec.text_position = Some("top center".to_string());
    spec.layout = SQUARE;

    Ok((spec, ChartTable::from_view(&result.geographic, names)))
}

/// World treemap of `recovered / confirmed` per region.
///
/// Regions with no confirmed cases have no defined rate and are left out;
/// their number is returned alongside the chart.
pub fn recovery_rate_chart(
    result: &PipelineResult,
    names: &ColumnMap,
) -> Result<((ChartSpec, ChartTable), usize)> {
    let rates = CaseAggregator::recovery_rates(&result.by_region)?;
    let region = names.key_name(KeyColumn::Region).to_string();

    let mut table = ChartTable {
        columns: vec![region.clone(), RECOVERY_RATE.to_string()],
        rows: Vec::with_capacity(rates.len()),
    };
    let mut undefined = 0;
    for rate in &rates {
        match rate.rate() {
            Ok(value) => table.rows.push(
                rate.key
                    .iter()
                    .map(Cell::from)
                    .chain([Cell::Float(value)])
                    .collect(),
            ),
            Err(e) => {
                warn!("Skipping recovery rate: {}", e);
                undefined += 1;
            }
        }
    }

    let mut spec = ChartSpec::new(ChartKind::Treemap, "Recovery rate by region", RECOVERY_RATE);
    spec.roles.path = vec![region];
    spec.roles.path_root = Some(WORLD.to_string());
    spec.color_scale = Some(ColorScale::named("RdBu"));
    spec.text_position = Some("top center".to_string());
    spec.layout = SQUARE;

    Ok(((spec, table), undefined))
}

/// Stacked bar of still infected / deaths / recovered per day.
pub fn cases_over_time_chart(
    result: &PipelineResult,
    names: &ColumnMap,
) -> Result<(ChartSpec, ChartTable)> {
    let long = melt_named(
        &result.time_series,
        &[KeyColumn::Date],
        &Metric::COMPONENTS,
        "Case",
        "Count",
    )?;

    let mut spec = ChartSpec::new(ChartKind::Bar, "Cases over time", &long.value_name);
    spec.roles.category = Some(names.key_name(KeyColumn::Date).to_string());
    spec.roles.color = Some(long.var_name.clone());

    Ok((spec, ChartTable::from_long(&long, names)))
}

/// Bar of one metric per day, coloured by region.
pub fn region_over_time_chart(
    result: &PipelineResult,
    names: &ColumnMap,
    metric: Metric,
) -> Result<(ChartSpec, ChartTable)> {
    // Fails early if the metric is not summed in the region-daily view.
    result.region_daily.metric_index(metric)?;

    let title = names.metric_name(metric);
    let mut spec = ChartSpec::new(ChartKind::Bar, title, title);
    spec.roles.category = Some(names.key_name(KeyColumn::Date).to_string());
    spec.roles.color = Some(names.key_name(KeyColumn::Region).to_string());
    spec.color_scale = Some(ColorScale::named("thermal"));
    spec.layout.height = Some(600);

    Ok((spec, ChartTable::from_view(&result.region_daily, names)))
}

/// Choropleth of confirmed cases per country, animated over the confirmed count.
pub fn spread_map_chart(result: &PipelineResult, names: &ColumnMap) -> (ChartSpec, ChartTable) {
    let region = names.key_name(KeyColumn::Region).to_string();
    let confirmed = names.metric_name(Metric::Confirmed).to_string();

    let mut spec = ChartSpec::new(
        ChartKind::Choropleth,
        "Spread of Coronavirus over time",
        &confirmed,
    );
    spec.roles.category = Some(region.clone());
    spec.roles.color = Some(confirmed.clone());
    spec.roles.hover_name = Some(region);
    spec.roles.animation_frame = Some(confirmed);
    spec.location_mode = Some("country names".to_string());

    (spec, ChartTable::from_view(&result.by_region, names))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
