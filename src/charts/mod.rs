//! Charts module - Static chart rendering

pub mod format;
mod renderer;

pub use renderer::ChartRenderer;
