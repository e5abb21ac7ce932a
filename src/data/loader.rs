//! CSV Data Loader Module
//! Loads the weekly mortality CSV with Polars and restricts it to the report window.

use crate::config::{ReportConfig, ALL_CAUSE_COLUMN, DATE_COLUMN, YEAR_COLUMN};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::Path;
use thiserror::Error;

const REQUIRED_COLUMNS: [&str; 3] = [DATE_COLUMN, YEAR_COLUMN, ALL_CAUSE_COLUMN];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Input file not found: {0}")]
    NotFound(String),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Row {row}: cannot parse week ending date {value:?}")]
    InvalidDate { row: usize, value: String },
    #[error("No rows with MMWR Year between {first} and {last}")]
    NoRowsInRange { first: i32, last: i32 },
}

/// The weekly rows inside the report window, with week-ending dates parsed.
///
/// `dates[i]` belongs to row `i` of the frame. The table is never mutated after
/// construction; aggregations build their own projections from it.
#[derive(Debug, Clone)]
pub struct MortalityTable {
    df: DataFrame,
    dates: Vec<NaiveDate>,
    first_date: NaiveDate,
    last_date: NaiveDate,
    raw_rows: usize,
    raw_columns: usize,
}

impl MortalityTable {
    /// Validate the schema, keep rows with `first_year <= MMWR Year <= last_year`
    /// and parse the week-ending dates of the kept rows.
    pub fn from_dataframe(
        raw: DataFrame,
        first_year: i32,
        last_year: i32,
    ) -> Result<Self, LoaderError> {
        for required in REQUIRED_COLUMNS {
            if raw.column(required).is_err() {
                return Err(LoaderError::MissingColumn(required.to_string()));
            }
        }

        let raw_rows = raw.height();
        let raw_columns = raw.width();

        let df = raw
            .lazy()
            .filter(
                col(YEAR_COLUMN)
                    .gt_eq(lit(first_year))
                    .and(col(YEAR_COLUMN).lt_eq(lit(last_year))),
            )
            .collect()?;

        if df.height() == 0 {
            return Err(LoaderError::NoRowsInRange {
                first: first_year,
                last: last_year,
            });
        }

        let dates = Self::parse_dates(&df)?;
        let (first_date, last_date) = match (dates.iter().min(), dates.iter().max()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(LoaderError::NoRowsInRange {
                    first: first_year,
                    last: last_year,
                })
            }
        };

        log::debug!(
            "Kept {} of {} rows ({} to {})",
            df.height(),
            raw_rows,
            first_date,
            last_date
        );

        Ok(Self {
            df,
            dates,
            first_date,
            last_date,
            raw_rows,
            raw_columns,
        })
    }

    fn parse_dates(df: &DataFrame) -> Result<Vec<NaiveDate>, LoaderError> {
        // Polars may already have typed the column as a date; going through
        // String handles both cases.
        let as_text = df.column(DATE_COLUMN)?.cast(&DataType::String)?;
        let ca = as_text.str()?;

        ca.into_iter()
            .enumerate()
            .map(|(row, value)| {
                let value = value.unwrap_or_default();
                parse_week_ending(value).ok_or_else(|| LoaderError::InvalidDate {
                    row,
                    value: value.to_string(),
                })
            })
            .collect()
    }

    /// Get a reference to the filtered DataFrame.
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Week-ending dates, one per row.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.first_date, self.last_date)
    }

    /// Row count of the CSV before the year filter.
    pub fn raw_rows(&self) -> usize {
        self.raw_rows
    }

    /// Column count of the CSV.
    pub fn raw_columns(&self) -> usize {
        self.raw_columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// Column values as integer counts, one per row. Nulls stay `None`.
    pub fn counts(&self, name: &str) -> PolarsResult<Vec<Option<i64>>> {
        let counts = self.df.column(name)?.cast(&DataType::Int64)?;
        Ok(counts.i64()?.into_iter().collect())
    }

    /// Sum of a count column over all rows, nulls skipped.
    pub fn sum(&self, name: &str) -> PolarsResult<i64> {
        let counts = self.df.column(name)?.cast(&DataType::Int64)?;
        Ok(counts.i64()?.sum().unwrap_or(0))
    }
}

/// Accepts `2020-01-04`, `01/04/2020` and `2020-01-04T00:00:00.000`.
pub fn parse_week_ending(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Handles CSV file loading with Polars.
pub struct MortalityLoader;

impl MortalityLoader {
    /// Read the whole CSV into a DataFrame.
    pub fn read_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::NotFound(path.display().to_string()));
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        log::info!(
            "Read {} rows x {} columns from {}",
            df.height(),
            df.width(),
            path.display()
        );
        Ok(df)
    }

    /// Read the configured CSV and restrict it to the configured years.
    pub fn load(config: &ReportConfig) -> Result<MortalityTable, LoaderError> {
        let raw = Self::read_csv(config.input_path())?;
        MortalityTable::from_dataframe(raw, config.first_year, config.last_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn sample_frame() -> DataFrame {
        df!(
            DATE_COLUMN => &["2019-12-28", "2020-01-04", "2021-06-12", "2023-12-30", "2024-01-06"],
            YEAR_COLUMN => &[2019i64, 2020, 2021, 2023, 2024],
            ALL_CAUSE_COLUMN => &[900i64, 1000, 1100, 1200, 1300],
        )
        .unwrap()
    }

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mortality_charts_loader_{}_{}",
            std::process::id(),
            name
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("deaths.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_year_filter_is_inclusive() {
        let table = MortalityTable::from_dataframe(sample_frame(), 2020, 2023).unwrap();
        assert_eq!(table.height(), 3);
        assert_eq!(table.raw_rows(), 5);
        assert_eq!(table.raw_columns(), 3);

        let years = table.counts(YEAR_COLUMN).unwrap();
        assert!(years
            .iter()
            .all(|y| matches!(y, Some(year) if (2020..=2023).contains(year))));
    }

    #[test]
    fn test_excluded_rows_do_not_contribute() {
        let table = MortalityTable::from_dataframe(sample_frame(), 2020, 2023).unwrap();
        assert_eq!(table.sum(ALL_CAUSE_COLUMN).unwrap(), 3300);
        assert_eq!(
            table.date_range(),
            (
                NaiveDate::from_ymd_opt(2020, 1, 4).unwrap(),
                NaiveDate::from_ymd_opt(2023, 12, 30).unwrap()
            )
        );
    }

    #[test]
    fn test_missing_column_is_reported() {
        let df = df!(
            DATE_COLUMN => &["2020-01-04"],
            YEAR_COLUMN => &[2020i64],
        )
        .unwrap();
        let err = MortalityTable::from_dataframe(df, 2020, 2023).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn(name) if name == ALL_CAUSE_COLUMN));
    }

    #[test]
    fn test_empty_range_is_an_error() {
        let err = MortalityTable::from_dataframe(sample_frame(), 2030, 2031).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::NoRowsInRange {
                first: 2030,
                last: 2031
            }
        ));
    }

    #[test]
    fn test_bad_date_is_an_error() {
        let df = df!(
            DATE_COLUMN => &["2020-01-04", "not a date"],
            YEAR_COLUMN => &[2020i64, 2020],
            ALL_CAUSE_COLUMN => &[1i64, 2],
        )
        .unwrap();
        let err = MortalityTable::from_dataframe(df, 2020, 2023).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidDate { row: 1, .. }));
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 1, 16);
        assert_eq!(parse_week_ending("2021-01-16"), expected);
        assert_eq!(parse_week_ending("01/16/2021"), expected);
        assert_eq!(parse_week_ending("2021-01-16T00:00:00.000"), expected);
        assert_eq!(parse_week_ending(" 2021-01-16 "), expected);
        assert_eq!(parse_week_ending("16.01.2021"), None);
    }

    #[test]
    fn test_missing_file() {
        let err = MortalityLoader::read_csv(Path::new("/nonexistent/deaths.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn test_load_csv_with_quoted_cause_headers() {
        let path = temp_csv(
            "quoted",
            "Week Ending Date,MMWR Year,MMWR Week,All Cause,\"Diseases of heart (I00-I09,I11,I13,I20-I51)\"\n\
             2019-12-28,2019,52,900,200\n\
             2020-01-04,2020,1,1000,250\n\
             2020-01-11,2020,2,1010,260\n",
        );
        let config = ReportConfig {
            input_path: path,
            ..ReportConfig::default()
        };

        let table = MortalityLoader::load(&config).unwrap();
        assert_eq!(table.height(), 2);
        assert!(table.has_column("Diseases of heart (I00-I09,I11,I13,I20-I51)"));
        assert_eq!(
            table
                .sum("Diseases of heart (I00-I09,I11,I13,I20-I51)")
                .unwrap(),
            510
        );
    }
}
