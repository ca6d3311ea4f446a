//! SVG rendering of the panel grid.

use std::fmt::Display;
use std::path::Path;

use plotters::chart::DualCoordChartContext;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

use crate::panels::{Axis, Layer, Mark, Panel, Rgb};
use crate::ReportError;

const SIZE: (u32, u32) = (1600, 2000);
const GRID: (usize, usize) = (4, 2);
const BAR_HALF_WIDTH: f64 = 0.35;

impl From<Rgb> for RGBColor {
    fn from(c: Rgb) -> Self {
        RGBColor(c.0, c.1, c.2)
    }
}

fn render_err<E: Display>(e: E) -> ReportError {
    ReportError::Render(e.to_string())
}

/// Render the figure to an SVG file.
pub fn render_svg(path: &Path, title: &str, panels: &[Panel]) -> Result<(), ReportError> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    draw(root, title, panels)?;
    debug!(path = %path.display(), panels = panels.len(), "chart written");
    Ok(())
}

/// Render the figure to an in-memory SVG document.
pub fn render_svg_string(title: &str, panels: &[Panel]) -> Result<String, ReportError> {
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, SIZE).into_drawing_area();
        draw(root, title, panels)?;
    }
    Ok(buf)
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    title: &str,
    panels: &[Panel],
) -> Result<(), ReportError> {
    root.fill(&WHITE).map_err(render_err)?;
    let body = root
        .titled(title, ("sans-serif", 28).into_font())
        .map_err(render_err)?;
    for (area, panel) in body.split_evenly(GRID).iter().zip(panels) {
        draw_panel(area, panel)?;
    }
    root.present().map_err(render_err)?;
    Ok(())
}

enum Shapes {
    Line(Vec<(f64, f64)>, ShapeStyle),
    Bars(Vec<Rectangle<(f64, f64)>>),
}

/// Turn one layer into drawable shapes. `base` carries the running top of
/// stacked bars on the same axis.
fn shapes(years: &[i32], layer: &Layer, base: &mut [f64]) -> Shapes {
    let mark = layer.mark;
    let xs = years.iter().map(|y| f64::from(*y));
    match mark {
        Mark::Line { width } => Shapes::Line(
            xs.zip(layer.values.iter().copied()).collect(),
            RGBColor::from(layer.color).stroke_width(width),
        ),
        Mark::Bar | Mark::Stacked => Shapes::Bars(
            xs.zip(&layer.values)
                .enumerate()
                .map(|(i, (x, v))| {
                    let bottom = if mark == Mark::Stacked { base[i] } else { 0.0 };
                    let top = bottom + v;
                    if mark == Mark::Stacked {
                        base[i] = top;
                    }
                    Rectangle::new(
                        [
                            (x - BAR_HALF_WIDTH, bottom.min(top)),
                            (x + BAR_HALF_WIDTH, bottom.max(top)),
                        ],
                        RGBColor::from(layer.color_at(i)).filled(),
                    )
                })
                .collect(),
        ),
    }
}

type Dual<'a, DB> = DualCoordChartContext<
    'a,
    DB,
    Cartesian2d<RangedCoordf64, RangedCoordf64>,
    Cartesian2d<RangedCoordf64, RangedCoordf64>,
>;

fn draw_axis<DB: DrawingBackend>(
    chart: &mut Dual<'_, DB>,
    years: &[i32],
    axis: &Axis,
    secondary: bool,
) -> Result<(), ReportError> {
    let mut base = vec![0.0; years.len()];
    for layer in &axis.layers {
        let color = RGBColor::from(layer.color);
        match shapes(years, layer, &mut base) {
            Shapes::Line(points, style) => {
                let series = LineSeries::new(points, style);
                let anno = if secondary {
                    chart.draw_secondary_series(series)
                } else {
                    chart.draw_series(series)
                }
                .map_err(render_err)?;
                anno.label(layer.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
            Shapes::Bars(bars) => {
                let anno = if secondary {
                    chart.draw_secondary_series(bars)
                } else {
                    chart.draw_series(bars)
                }
                .map_err(render_err)?;
                anno.label(layer.label.as_str()).legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                });
            }
        }
    }
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
) -> Result<(), ReportError> {
    let (Some(first), Some(last)) = (panel.years.first(), panel.years.last()) else {
        return Ok(());
    };
    let x_range = f64::from(*first) - 0.5..f64::from(*last) + 0.5;
    let (y0, y1) = panel.primary.extent();
    let (s0, s1) = panel
        .secondary
        .as_ref()
        .map_or((y0, y1), |axis| axis.extent());

    let mut builder = ChartBuilder::on(area);
    builder
        .caption(panel.title.as_str(), ("sans-serif", 18).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(55);
    if panel.secondary.is_some() {
        builder.right_y_label_area_size(55);
    }
    let mut chart = builder
        .build_cartesian_2d(x_range.clone(), y0..y1)
        .map_err(render_err)?
        .set_secondary_coord(x_range, s0..s1);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(panel.years.len().min(12))
        .x_label_formatter(&|x: &f64| format!("{x:.0}"))
        .y_desc(panel.primary.label.as_str())
        .draw()
        .map_err(render_err)?;

    draw_axis(&mut chart, &panel.years, &panel.primary, false)?;
    if let Some(axis) = &panel.secondary {
        chart
            .configure_secondary_axes()
            .y_desc(axis.label.as_str())
            .draw()
            .map_err(render_err)?;
        draw_axis(&mut chart, &panel.years, axis, true)?;
    }

    chart
        .draw_series(panel.annotations.iter().map(|a| {
            EmptyElement::at((f64::from(a.year), a.value))
                + Circle::new((0, 0), 3, BLACK.filled())
                + Text::new(a.text.clone(), (5, -15), ("sans-serif", 12).into_font())
        }))
        .map_err(render_err)?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", 12).into_font())
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;
    Ok(())
}
