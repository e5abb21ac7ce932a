//! Report Configuration
//! Hard-coded paths, column names and the year window used by the report.

use std::path::{Path, PathBuf};

pub const DATE_COLUMN: &str = "Week Ending Date";
pub const YEAR_COLUMN: &str = "MMWR Year";
pub const ALL_CAUSE_COLUMN: &str = "All Cause";
pub const COVID_COLUMN: &str = "COVID-19 (U071, Multiple Cause of Death)";
pub const NATURAL_CAUSE_COLUMN: &str = "Natural Cause";
pub const JURISDICTION_COLUMN: &str = "Jurisdiction of Occurrence";

/// Raw column name -> display label, in tie-break order.
pub const CAUSE_COLUMNS: [(&str, &str); 8] = [
    ("Diseases of heart (I00-I09,I11,I13,I20-I51)", "Heart Disease"),
    ("Malignant neoplasms (C00-C97)", "Cancer"),
    (COVID_COLUMN, "COVID-19"),
    ("Chronic lower respiratory diseases (J40-J47)", "Chronic Respiratory"),
    ("Cerebrovascular diseases (I60-I69)", "Stroke"),
    ("Alzheimer disease (G30)", "Alzheimer's"),
    ("Diabetes mellitus (E10-E14)", "Diabetes"),
    ("Influenza and pneumonia (J09-J18)", "Flu & Pneumonia"),
];

pub const TOP_CAUSES: usize = 8;

pub const TOP_CAUSES_FILE: &str = "top_8_causes_of_death.png";
pub const MONTHLY_TOTALS_FILE: &str = "total_deaths_over_time.png";
pub const WEEKLY_COVID_FILE: &str = "covid_deaths_over_time.png";
pub const SUMMARY_FILE: &str = "report_summary.json";

/// Everything one report run needs to know about its inputs and outputs.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub first_year: i32,
    pub last_year: i32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("/mnt/user-data/uploads/DeathsDataUpdated.csv"),
            output_dir: PathBuf::from("/mnt/user-data/outputs/"),
            first_year: 2020,
            last_year: 2023,
        }
    }
}

impl ReportConfig {
    /// Full path of a file inside the output directory.
    pub fn output_file(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// "2020-2023", as used in titles and console text.
    pub fn year_span(&self) -> String {
        format!("{}-{}", self.first_year, self.last_year)
    }
}
