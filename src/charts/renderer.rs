//! Static Chart Renderer
//! Draws the three report charts with plotters and saves them as PNG.
//!
//! Each chart is drawn into its own RGB buffer, written to disk, and dropped
//! before the next one is built.
//!
//! Charts:
//! 1. Top causes: horizontal bars with value labels
//! 2. Monthly totals: vertical bars coloured by year, with a year legend
//! 3. Weekly COVID-19: filled line with an annotated peak

use crate::charts::format::{
    format_axis_thousands, format_kilo, format_thousands, month_label, short_date,
};
use crate::data::{CauseTotal, MonthlyTotal, WeeklySeries};
use chrono::{Datelike, Days, Months, NaiveDate};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use thiserror::Error;

// Colors
const COVID_RED: RGBColor = RGBColor(0xE6, 0x39, 0x46);
const YEAR_2020: RGBColor = RGBColor(0xA8, 0xDA, 0xDC); // Light blue
const YEAR_2021: RGBColor = RGBColor(0x45, 0x7B, 0x9D); // Medium blue
const YEAR_2022: RGBColor = RGBColor(0x1D, 0x35, 0x57); // Dark blue
const YEAR_LATER: RGBColor = RGBColor(0x0D, 0x1B, 0x2A); // Darkest blue

// Output sizes (pixels)
const TOP_CAUSES_SIZE: (u32, u32) = (2100, 1200);
const MONTHLY_SIZE: (u32, u32) = (2400, 1200);
const WEEKLY_SIZE: (u32, u32) = (2400, 1200);

const FONT: &str = "sans-serif";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Failed to save image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Nothing to draw for {0}")]
    NoData(&'static str),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Drawing(err.to_string())
    }
}

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Bar color for a month, by calendar year.
pub fn year_color(year: i32) -> RGBColor {
    match year {
        year if year <= 2020 => YEAR_2020,
        2021 => YEAR_2021,
        2022 => YEAR_2022,
        _ => YEAR_LATER,
    }
}

/// Evenly spaced hues, like a husl palette.
fn cause_color(idx: usize, count: usize) -> HSLColor {
    HSLColor(idx as f64 / count.max(1) as f64, 0.65, 0.6)
}

/// Centres of `count` unit-wide slots on an axis spanning `0.0..count`.
fn slot_centers(count: usize) -> Vec<f64> {
    (0..count).map(|idx| idx as f64 + 0.5).collect()
}

/// Slot under an axis value, if it lies within the first `count` slots.
fn slot_index(value: f64, count: usize) -> Option<usize> {
    if value < 0.0 {
        return None;
    }
    let idx = value.floor() as usize;
    (idx < count).then_some(idx)
}

/// `WithKeyPoints` over an `f64` range, made usable with `configure_mesh`.
///
/// plotters only implements `ValueFormatter<f64>` for the bare
/// `RangedCoordf64`, so the wrapped axis needs this pass-through. Callers
/// always supply their own label formatter.
struct KeyedF64(plotters::coord::combinators::WithKeyPoints<plotters::coord::types::RangedCoordf64>);

impl KeyedF64 {
    fn new(range: std::ops::Range<f64>, points: Vec<f64>) -> Self {
        Self(range.with_key_points(points))
    }
}

impl Ranged for KeyedF64 {
    type ValueType = f64;
    type FormatOption = plotters::coord::ranged1d::DefaultFormatting;

    fn range(&self) -> std::ops::Range<f64> {
        self.0.range()
    }

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.0.map(value, limit)
    }

    fn key_points<Hint: plotters::coord::ranged1d::KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        self.0.key_points(hint)
    }

    fn axis_pixel_range(&self, limit: (i32, i32)) -> std::ops::Range<i32> {
        self.0.axis_pixel_range(limit)
    }
}

/// First day of every quarter (Jan, Apr, Jul, Oct) within `start..=end`.
fn quarter_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut ticks = Vec::new();
    let mut next = NaiveDate::from_ymd_opt(start.year(), start.month0() / 3 * 3 + 1, 1);
    while let Some(date) = next {
        if date > end {
            break;
        }
        if date >= start {
            ticks.push(date);
        }
        next = date.checked_add_months(Months::new(3));
    }
    ticks
}

fn title_style() -> TextStyle<'static> {
    TextStyle::from((FONT, 44).into_font().style(FontStyle::Bold))
}

fn axis_desc_style() -> TextStyle<'static> {
    TextStyle::from((FONT, 32).into_font().style(FontStyle::Bold))
}

/// Render into an in-memory RGB buffer, then save it as PNG.
fn render_png<F>(path: &Path, size: (u32, u32), draw: F) -> Result<(), RenderError>
where
    F: FnOnce(&Canvas<'_>) -> Result<(), RenderError>,
{
    let (width, height) = size;
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }

    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| RenderError::Drawing("image buffer size mismatch".to_string()))?;
    image.save(path)?;

    log::debug!("Wrote {}x{} chart to {}", width, height, path.display());
    Ok(())
}

fn print_saved(path: &Path) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    println!("✓ Saved: {}", name);
}

/// Draws the report charts.
pub struct ChartRenderer;

impl ChartRenderer {
    /// Horizontal bar chart of the ranked cause totals.
    pub fn render_top_causes(
        totals: &[CauseTotal],
        year_span: &str,
        path: &Path,
    ) -> Result<(), RenderError> {
        if totals.is_empty() {
            return Err(RenderError::NoData("cause totals"));
        }

        let max_total = totals.iter().map(|t| t.total).max().unwrap_or(0).max(1) as f64;
        let count = totals.len();
        // Highest total on the top row
        let row_of = |idx: usize| (count - 1 - idx) as f64;
        let value_style = TextStyle::from((FONT, 26).into_font().style(FontStyle::Bold))
            .color(&BLACK)
            .pos(Pos::new(HPos::Left, VPos::Center));

        render_png(path, TOP_CAUSES_SIZE, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(
                    format!("Top 8 Causes of Death in the United States ({})", year_span),
                    title_style(),
                )
                .margin(40)
                .x_label_area_size(100)
                .y_label_area_size(340)
                .build_cartesian_2d(
                    0.0..max_total * 1.15,
                    KeyedF64::new(0.0..count as f64, slot_centers(count)),
                )?;

            chart
                .configure_mesh()
                .disable_y_mesh()
                .light_line_style(BLACK.mix(0.05).stroke_width(1))
                .bold_line_style(BLACK.mix(0.15).stroke_width(1))
                .x_desc("Total Deaths")
                .y_desc("Cause of Death")
                .axis_desc_style(axis_desc_style())
                .label_style((FONT, 26))
                .x_label_formatter(&|x: &f64| format_axis_thousands(*x))
                .y_label_formatter(&|y: &f64| {
                    slot_index(*y, count)
                        .map(|row| totals[count - 1 - row].label.clone())
                        .unwrap_or_default()
                })
                .draw()?;

            chart.draw_series(totals.iter().enumerate().map(|(idx, t)| {
                let row = row_of(idx);
                let mut bar = Rectangle::new(
                    [(0.0, row), (t.total as f64, row + 1.0)],
                    cause_color(idx, count).filled(),
                );
                bar.set_margin(10, 10, 0, 0);
                bar
            }))?;

            chart.draw_series(totals.iter().enumerate().map(|(idx, t)| {
                let value = t.total as f64;
                Text::new(
                    format_thousands(t.total),
                    (value + value * 0.01, row_of(idx) + 0.5),
                    value_style.clone(),
                )
            }))?;

            Ok(())
        })?;

        print_saved(path);
        Ok(())
    }

    /// Vertical bar chart of monthly all-cause deaths, colored by year.
    pub fn render_monthly_totals(
        monthly: &[MonthlyTotal],
        year_span: &str,
        path: &Path,
    ) -> Result<(), RenderError> {
        if monthly.is_empty() {
            return Err(RenderError::NoData("monthly totals"));
        }

        let max_deaths = monthly.iter().map(|m| m.deaths).max().unwrap_or(0).max(1) as f64;
        let count = monthly.len();
        let mut years: Vec<i32> = monthly.iter().map(|m| m.year()).collect();
        years.dedup();
        let quarter_ticks: Vec<f64> = slot_centers(count)
            .into_iter()
            .zip(monthly)
            .filter(|(_, m)| m.month.month0() % 3 == 0)
            .map(|(center, _)| center)
            .collect();

        render_png(path, MONTHLY_SIZE, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(
                    format!("Total Deaths Over Time by Month ({})", year_span),
                    title_style(),
                )
                .margin(40)
                .x_label_area_size(100)
                .y_label_area_size(140)
                .build_cartesian_2d(
                    KeyedF64::new(0.0..count as f64, quarter_ticks),
                    0.0..max_deaths * 1.1,
                )?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .light_line_style(BLACK.mix(0.05).stroke_width(1))
                .bold_line_style(BLACK.mix(0.15).stroke_width(1))
                .x_desc("Month")
                .y_desc("Total Deaths")
                .axis_desc_style(axis_desc_style())
                .label_style((FONT, 24))
                .x_label_formatter(&|x: &f64| {
                    slot_index(*x, count)
                        .map(|idx| month_label(monthly[idx].month))
                        .unwrap_or_default()
                })
                .y_label_formatter(&|y: &f64| format_kilo(*y))
                .draw()?;

            for &year in &years {
                let color = year_color(year);
                let in_year = move || {
                    monthly
                        .iter()
                        .enumerate()
                        .filter(move |(_, m)| m.year() == year)
                };

                chart
                    .draw_series(in_year().map(|(idx, m)| {
                        let mut bar = Rectangle::new(
                            [(idx as f64, 0.0), (idx as f64 + 1.0, m.deaths as f64)],
                            color.filled(),
                        );
                        bar.set_margin(0, 0, 3, 3);
                        bar
                    }))?
                    .label(year.to_string())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 12), (x + 30, y + 12)], color.filled())
                    });

                // Bar edges
                chart.draw_series(in_year().map(|(idx, m)| {
                    let mut edge = Rectangle::new(
                        [(idx as f64, 0.0), (idx as f64 + 1.0, m.deaths as f64)],
                        BLACK.stroke_width(1),
                    );
                    edge.set_margin(0, 0, 3, 3);
                    edge
                }))?;
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .label_font((FONT, 28))
                .margin(20)
                .background_style(&WHITE.mix(0.9))
                .border_style(&BLACK.mix(0.4))
                .draw()?;

            Ok(())
        })?;

        print_saved(path);
        Ok(())
    }

    /// Filled line chart of a weekly series with its peak called out.
    pub fn render_weekly_covid(
        series: &WeeklySeries,
        year_span: &str,
        path: &Path,
    ) -> Result<(), RenderError> {
        let (Some(first), Some(last)) = (series.points.first(), series.points.last()) else {
            return Err(RenderError::NoData("weekly COVID-19 series"));
        };

        let start = first.date;
        let end = if last.date > start {
            last.date
        } else {
            start.checked_add_days(Days::new(7)).unwrap_or(start)
        };
        let peak = series.peak;
        let y_top = (peak.deaths.max(1) as f64) * 1.35;

        render_png(path, WEEKLY_SIZE, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(
                    format!("COVID-19 Deaths Over Time ({})", year_span),
                    title_style(),
                )
                .margin(40)
                .margin_right(90)
                .x_label_area_size(100)
                .y_label_area_size(160)
                .build_cartesian_2d(
                    (start..end).with_key_points(quarter_starts(start, end)),
                    0.0..y_top,
                )?;

            chart
                .configure_mesh()
                .light_line_style(BLACK.mix(0.05).stroke_width(1))
                .bold_line_style(BLACK.mix(0.15).stroke_width(1))
                .x_desc("Date")
                .y_desc("Weekly COVID-19 Deaths")
                .axis_desc_style(axis_desc_style())
                .label_style((FONT, 24))
                .x_label_formatter(&|d: &NaiveDate| month_label(*d))
                .y_label_formatter(&|y: &f64| format_axis_thousands(*y))
                .draw()?;

            chart.draw_series(
                AreaSeries::new(
                    series.points.iter().map(|p| (p.date, p.deaths as f64)),
                    0.0,
                    &COVID_RED.mix(0.3),
                )
                .border_style(COVID_RED.stroke_width(3)),
            )?;

            // Peak annotation, in pixel space
            let (px, py) = chart.backend_coord(&(peak.date, peak.deaths as f64));
            let canvas_width = WEEKLY_SIZE.0 as i32;
            let (box_w, box_h) = (400, 100);
            let left = (px - box_w / 2).clamp(10, canvas_width - box_w - 10);
            let top = (py - box_h - 90).max(10);
            let note_style = TextStyle::from((FONT, 28).into_font().style(FontStyle::Bold))
                .color(&BLACK);

            root.draw(&Rectangle::new(
                [(left, top), (left + box_w, top + box_h)],
                YELLOW.mix(0.7).filled(),
            ))?;
            root.draw(&Rectangle::new(
                [(left, top), (left + box_w, top + box_h)],
                BLACK.stroke_width(2),
            ))?;
            root.draw(&PathElement::new(
                vec![(left + box_w / 2, top + box_h), (px, py - 18)],
                BLACK.stroke_width(3),
            ))?;
            root.draw(&Polygon::new(
                vec![(px, py - 2), (px - 9, py - 20), (px + 9, py - 20)],
                BLACK.filled(),
            ))?;
            root.draw(&Text::new(
                format!("Peak: {} deaths", format_thousands(peak.deaths)),
                (left + 18, top + 14),
                note_style.clone(),
            ))?;
            root.draw(&Text::new(
                short_date(peak.date),
                (left + 18, top + 56),
                note_style,
            ))?;

            Ok(())
        })?;

        print_saved(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ALL_CAUSE_COLUMN, COVID_COLUMN, DATE_COLUMN, YEAR_COLUMN};
    use crate::data::{DataProcessor, MortalityTable};
    use polars::df;

    #[test]
    fn test_year_colors() {
        assert_eq!(year_color(2020).rgb(), (0xA8, 0xDA, 0xDC));
        assert_eq!(year_color(2021).rgb(), (0x45, 0x7B, 0x9D));
        assert_eq!(year_color(2022).rgb(), (0x1D, 0x35, 0x57));
        assert_eq!(year_color(2023).rgb(), (0x0D, 0x1B, 0x2A));
        assert_eq!(year_color(2024).rgb(), YEAR_LATER.rgb());
    }

    #[test]
    fn test_cause_colors_are_distinct() {
        let hues: Vec<f64> = (0..8).map(|i| cause_color(i, 8).0).collect();
        assert!(hues.windows(2).all(|w| w[0] < w[1]));
        assert!(hues.iter().all(|h| (0.0..1.0).contains(h)));
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_category_axis_has_one_slot_per_bar() {
        for count in [1, 2, 5, 8] {
            let centers = slot_centers(count);
            assert_eq!(centers.len(), count);
            // Every center falls back onto its own slot, and the last bar ends
            // exactly at the axis end.
            for (idx, center) in centers.iter().enumerate() {
                assert_eq!(slot_index(*center, count), Some(idx));
                assert!(idx as f64 + 1.0 <= count as f64);
            }
            assert_eq!(slot_index(count as f64, count), None);
        }
        assert_eq!(slot_index(-0.5, 3), None);
    }

    #[test]
    fn test_quarter_ticks() {
        let ticks = quarter_starts(date(2020, 1, 4), date(2023, 12, 30));
        assert_eq!(ticks.first(), Some(&date(2020, 4, 1)));
        assert_eq!(ticks.last(), Some(&date(2023, 10, 1)));
        assert_eq!(ticks.len(), 15);
        assert!(ticks.iter().all(|d| d.day() == 1 && d.month0() % 3 == 0));

        assert_eq!(
            quarter_starts(date(2021, 7, 1), date(2021, 10, 1)),
            vec![date(2021, 7, 1), date(2021, 10, 1)]
        );
        assert!(quarter_starts(date(2022, 2, 5), date(2022, 3, 26)).is_empty());
    }

    #[test]
    fn test_charts_are_written_at_fixed_sizes() {
        let dir = std::env::temp_dir().join(format!(
            "mortality_charts_render_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();

        // Two causes, five months, five weeks
        let df = df!(
            DATE_COLUMN => &["2020-01-04", "2020-02-01", "2020-03-07", "2020-04-04", "2020-05-02"],
            YEAR_COLUMN => &[2020i64, 2020, 2020, 2020, 2020],
            ALL_CAUSE_COLUMN => &[1000i64, 1010, 990, 1005, 1020],
            COVID_COLUMN => &[0i64, 50, 300, 120, 10],
            "Malignant neoplasms (C00-C97)" => &[200i64, 210, 190, 205, 195],
        )
        .unwrap();
        let table = MortalityTable::from_dataframe(df, 2020, 2023).unwrap();
        let causes = DataProcessor::cause_totals(&table).unwrap();
        let monthly = DataProcessor::monthly_totals(&table).unwrap();
        let weekly = DataProcessor::weekly_covid(&table).unwrap();
        assert_eq!((causes.len(), monthly.len()), (2, 5));

        let top = dir.join("top.png");
        let months = dir.join("monthly.png");
        let covid = dir.join("covid.png");
        ChartRenderer::render_top_causes(&causes, "2020-2023", &top).unwrap();
        ChartRenderer::render_monthly_totals(&monthly, "2020-2023", &months).unwrap();
        ChartRenderer::render_weekly_covid(&weekly, "2020-2023", &covid).unwrap();

        assert_eq!(image::image_dimensions(&top).unwrap(), TOP_CAUSES_SIZE);
        assert_eq!(image::image_dimensions(&months).unwrap(), MONTHLY_SIZE);
        assert_eq!(image::image_dimensions(&covid).unwrap(), WEEKLY_SIZE);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let path = Path::new("unused.png");
        assert!(matches!(
            ChartRenderer::render_top_causes(&[], "2020-2023", path),
            Err(RenderError::NoData(_))
        ));
        assert!(matches!(
            ChartRenderer::render_monthly_totals(&[], "2020-2023", path),
            Err(RenderError::NoData(_))
        ));
    }
}
