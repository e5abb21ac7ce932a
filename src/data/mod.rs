//! Data module - CSV loading and aggregation

mod loader;
mod processor;

pub use loader::{MortalityLoader, MortalityTable};
pub use processor::{
    AggregateError, CauseTotal, DataProcessor, MonthlyTotal, PeakWeek, WeeklySeries,
};
