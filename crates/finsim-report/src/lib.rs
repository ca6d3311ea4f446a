#![deny(warnings)]

//! Reporting: derived ratios, the text report and the chart panels.

mod insights;
mod panels;
mod render;

pub use insights::{compute_insights, write_preview, write_report, Insights};
pub use panels::{
    chart_file_name, figure_title, panels, Annotation, Axis, Layer, Mark, Panel, Rgb,
};
pub use render::{render_svg, render_svg_string};

use finsim_core::ValidationError;
use thiserror::Error;

/// Errors produced while computing or rendering reports.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("dataset is empty")]
    EmptyDataset,
    #[error("render error: {0}")]
    Render(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
