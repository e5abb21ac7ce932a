//! Mortality Charts - Weekly mortality CSV summary & static chart generator
//!
//! Loads the weekly death counts, keeps 2020-2023, renders three PNG charts
//! and prints summary statistics.

mod charts;
mod config;
mod data;
mod report;
mod stats;

use anyhow::{Context, Result};
use charts::ChartRenderer;
use config::{ReportConfig, MONTHLY_TOTALS_FILE, SUMMARY_FILE, TOP_CAUSES_FILE, WEEKLY_COVID_FILE};
use data::MortalityLoader;
use report::{ReportData, Reporter};
use std::fs;

fn main() -> Result<()> {
    env_logger::init();

    let config = ReportConfig::default();
    run(&config)
}

fn run(config: &ReportConfig) -> Result<()> {
    let table = MortalityLoader::load(config)
        .with_context(|| format!("loading {}", config.input_path().display()))?;
    let year_span = config.year_span();
    Reporter::print_loaded(&table, &year_span);

    let data = ReportData::compute(&table, &year_span).context("aggregating weekly data")?;

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "creating output directory {}",
            config.output_dir.display()
        )
    })?;

    Reporter::print_stage(1, "Top 8 Causes of Death");
    ChartRenderer::render_top_causes(
        &data.top_causes,
        &year_span,
        &config.output_file(TOP_CAUSES_FILE),
    )
    .context("rendering cause totals chart")?;

    Reporter::print_stage(2, "Total Deaths Over Time");
    ChartRenderer::render_monthly_totals(
        &data.monthly_totals,
        &year_span,
        &config.output_file(MONTHLY_TOTALS_FILE),
    )
    .context("rendering monthly totals chart")?;

    Reporter::print_stage(3, "COVID-19 Deaths Over Time");
    ChartRenderer::render_weekly_covid(
        &data.weekly_covid,
        &year_span,
        &config.output_file(WEEKLY_COVID_FILE),
    )
    .context("rendering weekly COVID-19 chart")?;

    data.write_json(&config.output_file(SUMMARY_FILE))
        .context("writing report summary")?;

    Reporter::print_summary(&data, &config.output_dir);
    Ok(())
}
