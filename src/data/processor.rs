//! Data Processor Module
//! Reduces the filtered table into the series each chart needs.

use crate::config::{ALL_CAUSE_COLUMN, CAUSE_COLUMNS, COVID_COLUMN, TOP_CAUSES};
use crate::data::MortalityTable;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

const MONTH_COLUMN: &str = "Year-Month";

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Missing column: {0}")]
    MissingColumn(String),
    #[error("No weekly values in {0}")]
    EmptySeries(String),
    #[error("Bad month bucket: {0}")]
    BadMonth(String),
}

/// Total deaths for one cause column over the filtered rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CauseTotal {
    pub label: String,
    pub column: String,
    pub total: i64,
}

/// All-cause deaths in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTotal {
    /// First day of the month.
    pub month: NaiveDate,
    pub deaths: i64,
}

impl MonthlyTotal {
    pub fn year(&self) -> i32 {
        self.month.year()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyPoint {
    pub date: NaiveDate,
    pub deaths: i64,
}

/// Highest weekly value and the first week reaching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeakWeek {
    pub date: NaiveDate,
    pub deaths: i64,
}

/// A date-ordered weekly series with its peak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklySeries {
    pub points: Vec<WeeklyPoint>,
    pub peak: PeakWeek,
}

/// Handles the group-by/sum/sort reductions behind each chart.
pub struct DataProcessor;

impl DataProcessor {
    /// Sum every mapped cause column present in the table and rank them.
    ///
    /// The sort is stable, so equal totals keep their mapping order.
    pub fn cause_totals(table: &MortalityTable) -> Result<Vec<CauseTotal>, AggregateError> {
        let mut totals = Vec::with_capacity(CAUSE_COLUMNS.len());

        for (column, label) in CAUSE_COLUMNS {
            if !table.has_column(column) {
                log::warn!("Cause column not in data, skipping: {}", column);
                continue;
            }
            totals.push(CauseTotal {
                label: label.to_string(),
                column: column.to_string(),
                total: table.sum(column)?,
            });
        }

        totals.sort_by(|a, b| b.total.cmp(&a.total));
        totals.truncate(TOP_CAUSES);
        Ok(totals)
    }

    /// Sum "All Cause" per calendar month of the week-ending date.
    pub fn monthly_totals(table: &MortalityTable) -> Result<Vec<MonthlyTotal>, AggregateError> {
        let months: Vec<String> = table
            .dates()
            .iter()
            .map(|d| format!("{:04}-{:02}", d.year(), d.month()))
            .collect();

        let mut df = table.dataframe().select([ALL_CAUSE_COLUMN])?;
        df.with_column(Column::new(MONTH_COLUMN.into(), months))?;

        let grouped = df
            .lazy()
            .group_by([col(MONTH_COLUMN)])
            .agg([col(ALL_CAUSE_COLUMN).cast(DataType::Int64).sum()])
            .sort([MONTH_COLUMN], SortMultipleOptions::default())
            .collect()?;

        let month_ca = grouped.column(MONTH_COLUMN)?.str()?;
        let sums = grouped.column(ALL_CAUSE_COLUMN)?.cast(&DataType::Int64)?;
        let sum_ca = sums.i64()?;

        month_ca
            .into_iter()
            .zip(sum_ca.into_iter())
            .map(|(month, deaths)| {
                let month = month.unwrap_or_default();
                let first_day = NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
                    .map_err(|_| AggregateError::BadMonth(month.to_string()))?;
                Ok(MonthlyTotal {
                    month: first_day,
                    deaths: deaths.unwrap_or(0),
                })
            })
            .collect()
    }

    /// Date-ordered weekly series of one count column, skipping null weeks.
    pub fn weekly_series(
        table: &MortalityTable,
        column: &str,
    ) -> Result<WeeklySeries, AggregateError> {
        if !table.has_column(column) {
            return Err(AggregateError::MissingColumn(column.to_string()));
        }

        let mut points: Vec<WeeklyPoint> = table
            .dates()
            .iter()
            .zip(table.counts(column)?)
            .filter_map(|(&date, deaths)| deaths.map(|deaths| WeeklyPoint { date, deaths }))
            .collect();
        points.sort_by_key(|p| p.date);

        let peak = Self::find_peak(&points)
            .ok_or_else(|| AggregateError::EmptySeries(column.to_string()))?;

        Ok(WeeklySeries { points, peak })
    }

    /// Weekly COVID-19 deaths.
    pub fn weekly_covid(table: &MortalityTable) -> Result<WeeklySeries, AggregateError> {
        Self::weekly_series(table, COVID_COLUMN)
    }

    /// Maximum value; the earliest point wins ties.
    pub fn find_peak(points: &[WeeklyPoint]) -> Option<PeakWeek> {
        points.iter().fold(None, |best: Option<PeakWeek>, p| match best {
            Some(b) if b.deaths >= p.deaths => Some(b),
            _ => Some(PeakWeek {
                date: p.date,
                deaths: p.deaths,
            }),
        })
    }
}
