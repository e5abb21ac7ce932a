//! Report Module
//! Aggregates everything the charts and console summary need, prints the
//! summary, and writes it as JSON next to the charts.

use crate::charts::format::{format_thousands, long_date};
use crate::data::{
    AggregateError, CauseTotal, DataProcessor, MonthlyTotal, MortalityTable, WeeklySeries,
};
use crate::stats::{DatasetSummary, StatsCalculator};
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

const RULE_WIDTH: usize = 60;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),
    #[error("Failed to write summary: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// The aggregated series behind the three charts, plus the dataset overview.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub year_span: String,
    pub top_causes: Vec<CauseTotal>,
    pub monthly_totals: Vec<MonthlyTotal>,
    pub weekly_covid: WeeklySeries,
    pub overview: DatasetSummary,
}

impl ReportData {
    /// Run every aggregation over the filtered table.
    pub fn compute(table: &MortalityTable, year_span: &str) -> Result<Self, ReportError> {
        let top_causes = DataProcessor::cause_totals(table)?;
        let monthly_totals = DataProcessor::monthly_totals(table)?;
        let weekly_covid = DataProcessor::weekly_covid(table)?;
        let overview = StatsCalculator::summarize(table, weekly_covid.peak)
            .map_err(AggregateError::from)?;

        log::debug!(
            "Aggregated {} causes, {} months, {} COVID-19 weeks",
            top_causes.len(),
            monthly_totals.len(),
            weekly_covid.points.len()
        );

        Ok(Self {
            year_span: year_span.to_string(),
            top_causes,
            monthly_totals,
            weekly_covid,
            overview,
        })
    }

    /// Write the report data as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Summary written to {}", path.display());
        Ok(())
    }
}

/// Console output for a report run.
pub struct Reporter;

impl Reporter {
    pub fn loaded_lines(table: &MortalityTable, year_span: &str) -> Vec<String> {
        let (first, last) = table.date_range();
        vec![
            format!("Data loaded: {} rows from {}", table.height(), year_span),
            format!("Date range: {} to {}", first, last),
        ]
    }

    pub fn print_loaded(table: &MortalityTable, year_span: &str) {
        for line in Self::loaded_lines(table, year_span) {
            println!("{}", line);
        }
    }

    pub fn print_stage(number: usize, title: &str) {
        println!("\nGenerating Visualization {}: {}...", number, title);
    }

    /// Totals, peak week and output location.
    pub fn summary_lines(data: &ReportData, output_dir: &Path) -> Vec<String> {
        let overview = &data.overview;
        let peak = overview.covid_peak;
        vec![
            "Summary Statistics:".to_string(),
            format!(
                "Total deaths ({}): {}",
                data.year_span,
                format_thousands(overview.all_cause.total)
            ),
            format!(
                "Total COVID-19 deaths: {}",
                format_thousands(overview.covid_total)
            ),
            format!(
                "Peak COVID-19 deaths (weekly): {} on {}",
                format_thousands(peak.deaths),
                long_date(peak.date)
            ),
            String::new(),
            format!("Files saved to: {}", output_dir.display()),
        ]
    }

    /// Dataset overview block printed after the summary.
    pub fn overview_lines(overview: &DatasetSummary) -> Vec<String> {
        let stats = &overview.all_cause;
        let risk = &overview.risk_categories;
        let years: Vec<String> = overview.years_covered.iter().map(|y| y.to_string()).collect();

        let mut lines = vec![
            "Dataset Overview:".to_string(),
            format!(
                "Records: {} of {} rows, {} columns",
                format_thousands(overview.filtered_rows as i64),
                format_thousands(overview.raw_rows as i64),
                overview.raw_columns
            ),
            format!("Weeks: {} to {}", overview.first_week, overview.last_week),
            format!("Years covered: {}", years.join(", ")),
            format!(
                "Weekly all-cause deaths: mean {}, median {}, std {}, min {}, max {}",
                format_thousands(stats.mean.round() as i64),
                format_thousands(stats.median.round() as i64),
                format_thousands(stats.std.round() as i64),
                format_thousands(stats.min as i64),
                format_thousands(stats.max as i64)
            ),
            format!(
                "Weekly all-cause P05/P95: {} / {}",
                format_thousands(stats.p05.round() as i64),
                format_thousands(stats.p95.round() as i64)
            ),
            format!(
                "Missing values: {} ({:.2}%)",
                format_thousands(overview.missing_values.count as i64),
                overview.missing_values.percentage
            ),
            format!(
                "Weeks by all-cause deaths: Low {}, Medium {}, High {}, Very High {}",
                risk.low, risk.medium, risk.high, risk.very_high
            ),
        ];

        if let Some(natural) = &overview.natural_cause {
            lines.push(format!(
                "Natural causes: {} ({:.1}% of all deaths)",
                format_thousands(natural.natural),
                natural.percentage
            ));
        }
        if let Some(count) = overview.jurisdictions {
            lines.push(format!("Jurisdictions: {}", count));
        }

        lines
    }

    pub fn print_summary(data: &ReportData, output_dir: &Path) {
        let rule = "=".repeat(RULE_WIDTH);
        println!("\n{}", rule);
        println!("All visualizations generated successfully!");
        println!("{}", rule);
        println!();
        for line in Self::summary_lines(data, output_dir) {
            println!("{}", line);
        }
        println!();
        for line in Self::overview_lines(&data.overview) {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ReportConfig, ALL_CAUSE_COLUMN, COVID_COLUMN, DATE_COLUMN, SUMMARY_FILE, YEAR_COLUMN,
    };
    use crate::data::MortalityLoader;
    use polars::prelude::*;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mortality_charts_report_{}_{}",
            std::process::id(),
            name
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_table() -> MortalityTable {
        let df = df!(
            DATE_COLUMN => &["2020-01-04", "2020-01-11", "2020-01-18", "2020-01-25", "2019-12-28"],
            YEAR_COLUMN => &[2020i64, 2020, 2020, 2020, 2019],
            ALL_CAUSE_COLUMN => &[1000i64, 1010, 990, 1005, 7000],
            COVID_COLUMN => &[0i64, 50, 300, 120, 999],
            "Malignant neoplasms (C00-C97)" => &[200i64, 210, 190, 205, 100],
        )
        .unwrap();
        MortalityTable::from_dataframe(df, 2020, 2023).unwrap()
    }

    #[test]
    fn test_report_data_matches_examples() {
        let data = ReportData::compute(&sample_table(), "2020-2023").unwrap();

        assert_eq!(data.monthly_totals.len(), 1);
        assert_eq!(data.monthly_totals[0].deaths, 4005);
        assert_eq!(data.weekly_covid.peak.deaths, 300);
        assert_eq!(data.overview.covid_peak, data.weekly_covid.peak);
        assert_eq!(data.top_causes[0].label, "Cancer");
        assert_eq!(data.top_causes[0].total, 805);
        assert_eq!(data.top_causes[1].total, 470);
    }

    #[test]
    fn test_summary_lines() {
        let data = ReportData::compute(&sample_table(), "2020-2023").unwrap();
        let lines = Reporter::summary_lines(&data, Path::new("/tmp/out"));

        assert_eq!(lines[1], "Total deaths (2020-2023): 4,005");
        assert_eq!(lines[2], "Total COVID-19 deaths: 470");
        assert_eq!(
            lines[3],
            "Peak COVID-19 deaths (weekly): 300 on January 18, 2020"
        );
        assert_eq!(lines[5], "Files saved to: /tmp/out");
    }

    #[test]
    fn test_overview_lines_skip_absent_columns() {
        let data = ReportData::compute(&sample_table(), "2020-2023").unwrap();
        let lines = Reporter::overview_lines(&data.overview);

        assert!(lines.iter().any(|l| l == "Years covered: 2020"));
        assert!(lines.iter().any(|l| l == "Records: 4 of 5 rows, 5 columns"));
        assert!(!lines.iter().any(|l| l.starts_with("Natural causes")));
        assert!(!lines.iter().any(|l| l.starts_with("Jurisdictions")));
    }

    #[test]
    fn test_loaded_lines() {
        let lines = Reporter::loaded_lines(&sample_table(), "2020-2023");
        assert_eq!(lines[0], "Data loaded: 4 rows from 2020-2023");
        assert_eq!(lines[1], "Date range: 2020-01-04 to 2020-01-25");
    }

    #[test]
    fn test_two_runs_write_identical_json() {
        let dir = temp_dir("idempotent");
        let csv = dir.join("deaths.csv");
        fs::write(
            &csv,
            "Week Ending Date,MMWR Year,MMWR Week,All Cause,\"COVID-19 (U071, Multiple Cause of Death)\"\n\
             2020-01-04,2020,1,1000,0\n\
             2020-01-11,2020,2,1010,50\n\
             2020-02-01,2020,5,990,300\n\
             2024-01-06,2024,1,1005,120\n",
        )
        .unwrap();
        let config = ReportConfig {
            input_path: csv,
            output_dir: dir.clone(),
            ..ReportConfig::default()
        };

        let mut outputs = Vec::new();
        for _ in 0..2 {
            let table = MortalityLoader::load(&config).unwrap();
            let data = ReportData::compute(&table, &config.year_span()).unwrap();
            let path = config.output_file(SUMMARY_FILE);
            data.write_json(&path).unwrap();
            outputs.push(fs::read_to_string(&path).unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);

        let json: serde_json::Value = serde_json::from_str(&outputs[0]).unwrap();
        assert_eq!(json["overview"]["filtered_rows"], 3);
        assert_eq!(json["weekly_covid"]["peak"]["deaths"], 300);
        assert_eq!(json["weekly_covid"]["peak"]["date"], "2020-02-01");
        assert_eq!(json["monthly_totals"][0]["deaths"], 2010);
    }
}
