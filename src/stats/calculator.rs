//! Statistics Calculator Module
//! Descriptive statistics and dataset overview for the filtered table.

use crate::config::{
    ALL_CAUSE_COLUMN, COVID_COLUMN, JURISDICTION_COLUMN, NATURAL_CAUSE_COLUMN, YEAR_COLUMN,
};
use crate::data::{MortalityTable, PeakWeek};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Median, Min};
use std::collections::BTreeSet;

/// Weekly All Cause thresholds between risk categories.
pub const RISK_THRESHOLDS: [i64; 3] = [50_000, 60_000, 70_000];

/// Descriptive statistics of a weekly count series.
///
/// `p05`/`p95` use linear interpolation between closest ranks, the NumPy and
/// pandas default, so they can be cross-checked against a notebook.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyStats {
    pub weeks: usize,
    pub total: i64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p95: f64,
}

impl Default for WeeklyStats {
    fn default() -> Self {
        Self {
            weeks: 0,
            total: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

/// Weeks per All Cause band.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskCategories {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub very_high: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingValues {
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NaturalCauseShare {
    pub natural: i64,
    pub total: i64,
    pub percentage: f64,
}

/// Overview of the filtered table.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub raw_rows: usize,
    pub raw_columns: usize,
    pub filtered_rows: usize,
    pub first_week: NaiveDate,
    pub last_week: NaiveDate,
    pub all_cause: WeeklyStats,
    pub covid_total: i64,
    pub covid_peak: PeakWeek,
    pub years_covered: Vec<i64>,
    pub missing_values: MissingValues,
    pub risk_categories: RiskCategories,
    pub natural_cause: Option<NaturalCauseShare>,
    pub jurisdictions: Option<usize>,
}

/// Handles the summary statistics behind the console report.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for weekly counts, nulls skipped.
    pub fn compute_weekly_stats(counts: &[Option<i64>]) -> WeeklyStats {
        let values: Vec<i64> = counts.iter().flatten().copied().collect();
        if values.is_empty() {
            return WeeklyStats::default();
        }

        let total: i64 = values.iter().sum();
        let mut sorted: Vec<f64> = values.iter().map(|&v| v as f64).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let data = Data::new(sorted.clone());

        WeeklyStats {
            weeks: values.len(),
            total,
            mean: data.mean().unwrap_or(f64::NAN),
            median: data.median(),
            std: data.std_dev().unwrap_or(0.0),
            min: data.min(),
            max: data.max(),
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Percentile of ascending values, interpolating linearly between ranks.
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
    }

    /// Count weeks per risk band of weekly All Cause deaths. Weeks without a
    /// count are not placed in any band.
    pub fn categorize_risk(counts: &[Option<i64>]) -> RiskCategories {
        let mut categories = RiskCategories::default();
        let [medium, high, very_high] = RISK_THRESHOLDS;

        for deaths in counts.iter().flatten().copied() {
            if deaths < medium {
                categories.low += 1;
            } else if deaths < high {
                categories.medium += 1;
            } else if deaths < very_high {
                categories.high += 1;
            } else {
                categories.very_high += 1;
            }
        }

        categories
    }

    /// Null cells across every column of the frame.
    pub fn missing_values(df: &DataFrame) -> MissingValues {
        let total_cells = df.height() * df.width();
        let count: usize = df.get_columns().iter().map(|c| c.null_count()).sum();
        let percentage = if total_cells == 0 {
            0.0
        } else {
            count as f64 / total_cells as f64 * 100.0
        };
        MissingValues { count, percentage }
    }

    /// Distinct MMWR years in the table, ascending.
    pub fn years_covered(table: &MortalityTable) -> PolarsResult<Vec<i64>> {
        let years: BTreeSet<i64> = table.counts(YEAR_COLUMN)?.into_iter().flatten().collect();
        Ok(years.into_iter().collect())
    }

    fn natural_cause_share(
        table: &MortalityTable,
        all_cause_total: i64,
    ) -> PolarsResult<Option<NaturalCauseShare>> {
        if !table.has_column(NATURAL_CAUSE_COLUMN) {
            return Ok(None);
        }
        let natural = table.sum(NATURAL_CAUSE_COLUMN)?;
        let percentage = if all_cause_total == 0 {
            0.0
        } else {
            natural as f64 / all_cause_total as f64 * 100.0
        };
        Ok(Some(NaturalCauseShare {
            natural,
            total: all_cause_total,
            percentage,
        }))
    }

    fn jurisdictions(table: &MortalityTable) -> PolarsResult<Option<usize>> {
        if !table.has_column(JURISDICTION_COLUMN) {
            return Ok(None);
        }
        let column = table.dataframe().column(JURISDICTION_COLUMN)?;
        Ok(Some(column.as_materialized_series().n_unique()?))
    }

    /// Compute the dataset overview for the filtered table.
    pub fn summarize(
        table: &MortalityTable,
        covid_peak: PeakWeek,
    ) -> PolarsResult<DatasetSummary> {
        let all_cause_counts = table.counts(ALL_CAUSE_COLUMN)?;
        let all_cause = Self::compute_weekly_stats(&all_cause_counts);
        let (first_week, last_week) = table.date_range();

        Ok(DatasetSummary {
            raw_rows: table.raw_rows(),
            raw_columns: table.raw_columns(),
            filtered_rows: table.height(),
            first_week,
            last_week,
            covid_total: table.sum(COVID_COLUMN)?,
            covid_peak,
            years_covered: Self::years_covered(table)?,
            missing_values: Self::missing_values(table.dataframe()),
            risk_categories: Self::categorize_risk(&all_cause_counts),
            natural_cause: Self::natural_cause_share(table, all_cause.total)?,
            jurisdictions: Self::jurisdictions(table)?,
            all_cause,
        })
    }
}
