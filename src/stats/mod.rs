//! Stats module - Summary statistics

mod calculator;

pub use calculator::{DatasetSummary, StatsCalculator};
