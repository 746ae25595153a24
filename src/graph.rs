#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use crate::kpi::{DepartmentSpend, MonthValue, YearValue};
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

/// Chart styling shared by every report chart
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Relatório".to_string(),
            x_label: String::new(),
            y_label: "Valor".to_string(),
            width: 800,
            height: 600,
        }
    }
}

impl ChartOptions {
    pub fn titled(title: &str, x_label: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            ..Self::default()
        }
    }
}

/// Bar chart of the twelve monthly totals of a year
pub fn monthly_costs_chart(
    monthly: &[MonthValue],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let bars: Vec<(String, f64)> = monthly.iter().map(|m| (m.mes.clone(), m.valor)).collect();
    render_png(options, |path| draw_bars(path, &bars, options))
}

/// Bar chart of approved spend per department
pub fn department_spend_chart(
    spend: &[DepartmentSpend],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let bars: Vec<(String, f64)> = spend
        .iter()
        .map(|d| (d.departamento.clone(), d.valor))
        .collect();
    render_png(options, |path| draw_bars(path, &bars, options))
}

/// Line chart of the total per year
pub fn yearly_totals_chart(
    totals: &[YearValue],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let points: Vec<(f64, f64)> = totals.iter().map(|t| (t.year as f64, t.valor)).collect();
    render_png(options, |path| draw_line(path, &points, options))
}

/// Draws into a temporary PNG file and returns its bytes
///
/// The bitmap backend only encodes PNG when writing to a path, so the chart
/// goes through a file that is removed when this returns.
fn render_png<F>(options: &ChartOptions, draw: F) -> Result<Vec<u8>, Box<dyn Error>>
where
    F: FnOnce(&Path) -> Result<(), Box<dyn Error>>,
{
    if options.width == 0 || options.height == 0 {
        return Err("Chart dimensions must be positive".into());
    }
    let file = tempfile::Builder::new().suffix(".png").tempfile()?;
    draw(file.path())?;
    let png_data = std::fs::read(file.path())?;
    Ok(png_data)
}

fn draw_bars(
    path: &Path,
    bars: &[(String, f64)],
    options: &ChartOptions,
) -> Result<(), Box<dyn Error>> {
    if bars.is_empty() {
        return Err("No data to chart".into());
    }

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_y = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let x_range = -0.5..bars.len() as f64 - 0.5;
    let y_range = 0.0..(max_y * 1.1).max(1.0);

    let label_for = |x: &f64| {
        let index = x.round();
        if index < 0.0 || (x - index).abs() > 0.01 {
            return String::new();
        }
        bars.get(index as usize)
            .map(|(label, _)| label.clone())
            .unwrap_or_default()
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&label_for)
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *value)], BLUE.filled())
    }))?;

    root.present()?;
    Ok(())
}

fn draw_line(
    path: &Path,
    points: &[(f64, f64)],
    options: &ChartOptions,
) -> Result<(), Box<dyn Error>> {
    if points.is_empty() {
        return Err("No data to chart".into());
    }

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let min_x = points.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|(x, _)| *x).fold(f64::NEG_INFINITY, f64::max);
    let max_y = points.iter().map(|(_, y)| *y).fold(0.0, f64::max);

    let x_range = min_x - 0.5..max_x + 0.5;
    let y_range = 0.0..(max_y * 1.1).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|x: &f64| format!("{:.0}", x))
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 4, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}
