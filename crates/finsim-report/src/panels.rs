//! The fixed eight-panel chart layout, as plain data.
//!
//! Building panels is separate from drawing them so the layout can be
//! checked without a backend.

use finsim_core::{Dataset, Series};
use finsim_gen::Profile;

use crate::ReportError;

/// 24-bit colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Rgb> {
        let h = hex.strip_prefix('#')?;
        if h.len() != 6 {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(h.get(i..i + 2)?, 16).ok();
        Some(Rgb(byte(0)?, byte(2)?, byte(4)?))
    }
}

pub const BLUE: Rgb = Rgb(0x00, 0x66, 0xCC);
pub const ORANGE: Rgb = Rgb(0xFF, 0x66, 0x00);
pub const GREEN: Rgb = Rgb(0x00, 0x99, 0x00);
pub const PURPLE: Rgb = Rgb(0x99, 0x00, 0x99);
pub const PINK: Rgb = Rgb(0xFF, 0x33, 0x66);
pub const TEAL: Rgb = Rgb(0x33, 0xCC, 0xCC);

const STACK_COLORS: [Rgb; 6] = [BLUE, ORANGE, GREEN, PURPLE, PINK, TEAL];

/// How a layer is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark {
    Line { width: u32 },
    /// Bars from zero.
    Bar,
    /// Bars stacked on the previous stacked layers of the same axis.
    Stacked,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub label: String,
    pub mark: Mark,
    pub color: Rgb,
    /// Per-point colour overrides; empty means `color` everywhere.
    pub point_colors: Vec<Rgb>,
    pub values: Vec<f64>,
}

impl Layer {
    fn new(label: &str, mark: Mark, color: Rgb, values: Vec<f64>) -> Self {
        Self {
            label: label.to_string(),
            mark,
            color,
            point_colors: Vec::new(),
            values,
        }
    }

    fn line(label: &str, color: Rgb, values: Vec<f64>) -> Self {
        Self::new(label, Mark::Line { width: 2 }, color, values)
    }

    pub fn color_at(&self, i: usize) -> Rgb {
        self.point_colors.get(i).copied().unwrap_or(self.color)
    }
}

/// One y axis with its layers.
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    pub label: String,
    pub layers: Vec<Layer>,
}

impl Axis {
    fn new(label: &str, layers: Vec<Layer>) -> Self {
        Self {
            label: label.to_string(),
            layers,
        }
    }

    /// Padded `(min, max)` covering every layer, stacked totals included.
    /// Bar axes always include zero.
    pub fn extent(&self) -> (f64, f64) {
        let n = self.layers.iter().map(|l| l.values.len()).max().unwrap_or(0);
        let mut top = vec![0.0_f64; n];
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for layer in &self.layers {
            match layer.mark {
                Mark::Line { .. } => {
                    for v in &layer.values {
                        lo = lo.min(*v);
                        hi = hi.max(*v);
                    }
                }
                Mark::Bar => {
                    for v in &layer.values {
                        lo = lo.min(v.min(0.0));
                        hi = hi.max(v.max(0.0));
                    }
                }
                Mark::Stacked => {
                    for (t, v) in top.iter_mut().zip(&layer.values) {
                        *t += v;
                        lo = lo.min(t.min(0.0));
                        hi = hi.max(t.max(0.0));
                    }
                }
            }
        }
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        let span = if hi > lo { hi - lo } else { hi.abs().max(1.0) };
        let pad = span * 0.05;
        let lo = if lo == 0.0 { 0.0 } else { lo - pad };
        (lo, hi + pad)
    }
}

/// Text label pinned to a data point.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub year: i32,
    pub value: f64,
    pub text: String,
}

/// One chart of the figure.
#[derive(Clone, Debug, PartialEq)]
pub struct Panel {
    pub title: String,
    pub years: Vec<i32>,
    pub primary: Axis,
    pub secondary: Option<Axis>,
    pub annotations: Vec<Annotation>,
}

impl Panel {
    fn new(title: &str, years: &[i32], primary: Axis) -> Self {
        Self {
            title: title.to_string(),
            years: years.to_vec(),
            primary,
            secondary: None,
            annotations: Vec::new(),
        }
    }

    fn with_secondary(mut self, axis: Axis) -> Self {
        self.secondary = Some(axis);
        self
    }
}

/// Figure title for a profile and dataset.
pub fn figure_title(profile: &Profile, ds: &Dataset) -> String {
    match (ds.years().first(), ds.years().last()) {
        (Some(a), Some(b)) => format!("Finances of the {} ({a}-{b})", profile.name),
        _ => format!("Finances of the {}", profile.name),
    }
}

/// `<slug>_financial_analysis.svg`
pub fn chart_file_name(slug: &str) -> String {
    format!("{slug}_financial_analysis.svg")
}

fn scaled(ds: &Dataset, series: Series, factor: f64) -> Result<Vec<f64>, ReportError> {
    Ok(ds.require(series)?.iter().map(|v| v * factor).collect())
}

fn stacked(ds: &Dataset, series: &[Series]) -> Result<Vec<Layer>, ReportError> {
    series
        .iter()
        .zip(STACK_COLORS)
        .map(|(s, color)| -> Result<Layer, ReportError> {
            Ok(Layer::new(s.label(), Mark::Stacked, color, scaled(ds, *s, 1.0)?))
        })
        .collect()
}

/// Build the eight panels, in figure order.
pub fn panels(ds: &Dataset, profile: &Profile) -> Result<Vec<Panel>, ReportError> {
    if ds.is_empty() {
        return Err(ReportError::EmptyDataset);
    }
    let years = ds.years();
    let money = "Amount (M€)";

    let revenue = scaled(ds, Series::TotalRevenue, 1.0)?;
    let mut flows = Panel::new(
        "Revenue and expenses (M€)",
        years,
        Axis::new(
            money,
            vec![
                Layer::line("Total revenue", BLUE, revenue.clone()),
                Layer::line(
                    "Total expenses",
                    ORANGE,
                    scaled(ds, Series::TotalExpenses, 1.0)?,
                ),
            ],
        ),
    );
    flows.annotations = profile
        .annotations
        .iter()
        .filter_map(|(year, text)| {
            let i = ds.position(*year)?;
            Some(Annotation {
                year: *year,
                value: revenue[i],
                text: text.clone(),
            })
        })
        .collect();

    let revenue_mix = Panel::new(
        "Revenue structure (M€)",
        years,
        Axis::new(
            money,
            stacked(
                ds,
                &[
                    Series::MembershipFees,
                    Series::PrivateDonations,
                    Series::PublicFunding,
                    Series::EventRevenue,
                    Series::TrainingRevenue,
                    Series::Loans,
                ],
            )?,
        ),
    );

    let expense_mix = Panel::new(
        "Expense structure (M€)",
        years,
        Axis::new(
            money,
            stacked(
                ds,
                &[
                    Series::StaffExpenses,
                    Series::CampaignExpenses,
                    Series::CommunicationExpenses,
                    Series::OperatingExpenses,
                    Series::TrainingExpenses,
                    Series::LoanRepayments,
                ],
            )?,
        ),
    );

    let membership = Panel::new(
        "Members and territorial structure",
        years,
        Axis::new(
            "Members (thousands)",
            vec![Layer::new(
                "Members (thousands)",
                Mark::Bar,
                BLUE,
                scaled(ds, Series::Members, 1e-3)?,
            )],
        ),
    )
    .with_secondary(Axis::new(
        "Departmental federations",
        vec![Layer::line(
            "Departmental federations",
            ORANGE,
            scaled(ds, Series::DepartmentalFederations, 1.0)?,
        )],
    ));

    let investments = Panel::new(
        "Strategic investments (M€)",
        years,
        Axis::new(
            money,
            [
                (Series::CommunicationInvestment, BLUE),
                (Series::DigitalInvestment, ORANGE),
                (Series::TrainingInvestment, GREEN),
                (Series::ResearchInvestment, PURPLE),
            ]
            .into_iter()
            .map(|(s, c)| -> Result<Layer, ReportError> {
                Ok(Layer::line(s.label(), c, scaled(ds, s, 1.0)?))
            })
            .collect::<Result<Vec<_>, _>>()?,
        ),
    );

    let indicators = Panel::new(
        "Financial indicators",
        years,
        Axis::new(
            "Execution rate (%)",
            vec![Layer::new(
                "Execution rate (%)",
                Mark::Bar,
                BLUE,
                scaled(ds, Series::BudgetExecutionRate, 100.0)?,
            )],
        ),
    )
    .with_secondary(Axis::new(
        "Public funding dependency (%)",
        vec![Layer::new(
            "Public funding dependency (%)",
            Mark::Line { width: 3 },
            ORANGE,
            scaled(ds, Series::PublicFundingDependency, 100.0)?,
        )],
    ));

    let officials = Panel::new(
        "Elected officials",
        years,
        Axis::new(
            "Local officials (thousands)",
            vec![Layer::line(
                "Local officials (thousands)",
                BLUE,
                scaled(ds, Series::LocalOfficials, 1e-3)?,
            )],
        ),
    )
    .with_secondary(Axis::new(
        "National officials",
        vec![Layer::line(
            "National officials",
            ORANGE,
            scaled(ds, Series::NationalOfficials, 1.0)?,
        )],
    ));

    let balance = scaled(ds, Series::FinancialBalance, 100.0)?;
    let mut balance_layer = Layer::new("Balance (% of budget)", Mark::Bar, GREEN, balance);
    balance_layer.point_colors = balance_layer
        .values
        .iter()
        .map(|v| if *v > 0.0 { GREEN } else { ORANGE })
        .collect();
    let situation = Panel::new(
        "Financial situation",
        years,
        Axis::new("Balance (% of budget)", vec![balance_layer]),
    )
    .with_secondary(Axis::new(
        "Debt (M€)",
        vec![Layer::new(
            "Debt (M€)",
            Mark::Line { width: 3 },
            PURPLE,
            scaled(ds, Series::Debt, 1.0)?,
        )],
    ));

    Ok(vec![
        flows,
        revenue_mix,
        expense_mix,
        membership,
        investments,
        indicators,
        officials,
        situation,
    ])
}
