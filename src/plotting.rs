//! # SVG Charts
//!
//! Renders the summary tables as SVG files with `plotters`. Charts are a
//! read-only view of the tables: nothing here feeds back into the analysis.
//!
//! Month axes use a continuous `0.5..12.5` range with bars centred on the
//! month number, labelled with three-letter month names.

use crate::aggregate::{month_name, DaytimeMonthlyMean, MonthlyMean, YearMonthMean};
use crate::config::Units;
use crate::error::{Result, TideError};
use crate::threshold::ThresholdCount;
use log::info;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::ops::Range;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (1000, 600);
const WIDE_CHART_SIZE: (u32, u32) = (1200, 800);

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const SALMON: RGBColor = RGBColor(250, 128, 114);
const ORCHID: RGBColor = RGBColor(218, 112, 214);

fn plot_err<E: Display>(e: E) -> TideError {
    TideError::Plot(e.to_string())
}

/// Three-letter label for month ticks; blank between months.
fn month_tick(x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || !(1.0..=12.0).contains(&rounded) {
        return String::new();
    }
    month_name(rounded as u32).chars().take(3).collect()
}

/// Y range covering every value and zero, with 10% headroom.
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((hi - lo) * 0.1).max(0.1);
    let bottom = if lo < 0.0 { lo - pad } else { 0.0 };
    bottom..hi + pad
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn draw_month_bars(
    path: &Path,
    title: &str,
    y_desc: &str,
    bars: &[(u32, f64)],
    color: RGBColor,
) -> Result<()> {
    ensure_parent(path)?;
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0.5f64..12.5f64, value_range(bars.iter().map(|b| b.1)))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(12)
        .x_label_formatter(&|x: &f64| month_tick(*x))
        .x_desc("Month")
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(bars.iter().map(|&(month, value)| {
            let x = month as f64;
            Rectangle::new([(x - 0.35, 0.0), (x + 0.35, value)], color.filled())
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    info!("Plot saved to {}", path.display());
    Ok(())
}

/// Bar chart of the month-only mean low tide.
pub fn plot_monthly_mean(
    rows: &[MonthlyMean],
    title: &str,
    units: Units,
    path: &Path,
) -> Result<()> {
    let bars: Vec<(u32, f64)> = rows.iter().map(|r| (r.month, r.mean_value)).collect();
    let y_desc = format!("Average Low Tide Level ({})", units.abbreviation());
    draw_month_bars(path, title, &y_desc, &bars, SKY_BLUE)
}

/// Bar chart of the mean daytime lowest tide per month.
pub fn plot_daytime_monthly_mean(
    rows: &[DaytimeMonthlyMean],
    title: &str,
    units: Units,
    path: &Path,
) -> Result<()> {
    let bars: Vec<(u32, f64)> = rows
        .iter()
        .map(|r| (r.month, r.average_lowest_tide))
        .collect();
    let y_desc = format!("Average Lowest Tide Level ({})", units.abbreviation());
    draw_month_bars(path, title, &y_desc, &bars, SALMON)
}

/// Bar chart of the average count of daytime tides below the threshold.
pub fn plot_threshold_counts(
    rows: &[ThresholdCount],
    threshold: f64,
    title: &str,
    units: Units,
    path: &Path,
) -> Result<()> {
    let bars: Vec<(u32, f64)> = rows
        .iter()
        .map(|r| (r.month, r.average_count_below_threshold))
        .collect();
    let y_desc = format!(
        "Average Count of Tides Below {} {} During Daytime",
        threshold,
        units.abbreviation()
    );
    draw_month_bars(path, title, &y_desc, &bars, ORCHID)
}

/// One line per year of the year×month daytime lowest-tide means.
pub fn plot_yearly_monthly_mean(
    rows: &[YearMonthMean],
    title: &str,
    units: Units,
    path: &Path,
) -> Result<()> {
    ensure_parent(path)?;

    let mut by_year: BTreeMap<i32, Vec<(f64, f64)>> = BTreeMap::new();
    for row in rows {
        by_year
            .entry(row.year)
            .or_default()
            .push((row.month as f64, row.average_lowest_tide));
    }

    let root = SVGBackend::new(path, WIDE_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(
            0.5f64..12.5f64,
            value_range(rows.iter().map(|r| r.average_lowest_tide)),
        )
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|x: &f64| month_tick(*x))
        .x_desc("Month")
        .y_desc(format!("Average Lowest Tide Level ({})", units.abbreviation()))
        .draw()
        .map_err(plot_err)?;

    for (idx, (year, points)) in by_year.into_iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
            .map_err(plot_err)?
            .label(year.to_string())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart
            .draw_series(
                points
                    .into_iter()
                    .map(|point| Circle::new(point, 4, color.filled())),
            )
            .map_err(plot_err)?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    info!("Plot saved to {}", path.display());
    Ok(())
}
