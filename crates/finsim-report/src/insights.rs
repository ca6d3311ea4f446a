//! Summary statistics and the plain-text report.

use finsim_core::{Dataset, Series};
use finsim_gen::Profile;
use serde::Serialize;
use std::io::Write;

use crate::ReportError;

/// Derived figures printed at the end of a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Insights {
    pub first_year: i32,
    pub last_year: i32,
    /// Millions of euros.
    pub mean_revenue: f64,
    pub mean_expenses: f64,
    pub mean_members: f64,
    pub mean_execution_rate_pct: f64,
    /// `None` when the first-year value is zero.
    pub revenue_growth_pct: Option<f64>,
    pub members_growth_pct: Option<f64>,
    /// Shares of mean revenue; `None` when mean revenue is zero.
    pub membership_share_pct: Option<f64>,
    pub donations_share_pct: Option<f64>,
    pub public_funding_share_pct: Option<f64>,
    pub mean_balance_pct: f64,
    pub final_debt: f64,
    pub final_public_dependency_pct: f64,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn last(values: &[f64]) -> f64 {
    values[values.len() - 1]
}

fn growth_pct(values: &[f64]) -> Option<f64> {
    let first = values[0];
    if first == 0.0 {
        return None;
    }
    Some((last(values) / first - 1.0) * 100.0)
}

fn share_pct(part: f64, whole: f64) -> Option<f64> {
    if whole == 0.0 {
        None
    } else {
        Some(part / whole * 100.0)
    }
}

/// Compute the summary figures. Every series used must be present.
pub fn compute_insights(ds: &Dataset) -> Result<Insights, ReportError> {
    let (Some(&first_year), Some(&last_year)) = (ds.years().first(), ds.years().last()) else {
        return Err(ReportError::EmptyDataset);
    };
    let revenue = ds.require(Series::TotalRevenue)?;
    let members = ds.require(Series::Members)?;
    let mean_revenue = mean(revenue);

    Ok(Insights {
        first_year,
        last_year,
        mean_revenue,
        mean_expenses: mean(ds.require(Series::TotalExpenses)?),
        mean_members: mean(members),
        mean_execution_rate_pct: mean(ds.require(Series::BudgetExecutionRate)?) * 100.0,
        revenue_growth_pct: growth_pct(revenue),
        members_growth_pct: growth_pct(members),
        membership_share_pct: share_pct(mean(ds.require(Series::MembershipFees)?), mean_revenue),
        donations_share_pct: share_pct(mean(ds.require(Series::PrivateDonations)?), mean_revenue),
        public_funding_share_pct: share_pct(mean(ds.require(Series::PublicFunding)?), mean_revenue),
        mean_balance_pct: mean(ds.require(Series::FinancialBalance)?) * 100.0,
        final_debt: last(ds.require(Series::Debt)?),
        final_public_dependency_pct: last(ds.require(Series::PublicFundingDependency)?) * 100.0,
    })
}

fn pct(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.1}%"),
        None => "n/a".to_string(),
    }
}

/// Round and group digits by thousands: 184523.7 -> "184,524".
fn thousands(v: f64) -> String {
    let rounded = v.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Write the seven-section text report.
pub fn write_report<W: Write>(
    out: &mut W,
    profile: &Profile,
    ins: &Insights,
) -> std::io::Result<()> {
    let (start, end) = (ins.first_year, ins.last_year);
    writeln!(out, "ANALYTICAL INSIGHTS - {} ({start}-{end})", profile.name)?;
    writeln!(out, "{}", "=".repeat(70))?;

    writeln!(out, "\n1. GENERAL STATISTICS")?;
    writeln!(out, "Mean annual revenue: {:.2} M€", ins.mean_revenue)?;
    writeln!(out, "Mean annual expenses: {:.2} M€", ins.mean_expenses)?;
    writeln!(out, "Mean members: {}", thousands(ins.mean_members))?;
    writeln!(
        out,
        "Mean budget execution rate: {:.1}%",
        ins.mean_execution_rate_pct
    )?;

    writeln!(out, "\n2. HISTORICAL EVOLUTION")?;
    writeln!(
        out,
        "Revenue change ({start}-{end}): {}",
        pct(ins.revenue_growth_pct)
    )?;
    writeln!(
        out,
        "Member change ({start}-{end}): {}",
        pct(ins.members_growth_pct)
    )?;

    writeln!(out, "\n3. FINANCIAL STRUCTURE")?;
    writeln!(
        out,
        "Membership fees share of revenue: {}",
        pct(ins.membership_share_pct)
    )?;
    writeln!(out, "Private donations share: {}", pct(ins.donations_share_pct))?;
    writeln!(
        out,
        "Public funding share: {}",
        pct(ins.public_funding_share_pct)
    )?;

    writeln!(out, "\n4. FINANCIAL PERFORMANCE")?;
    writeln!(
        out,
        "Mean financial balance: {:.1}% of budget",
        ins.mean_balance_pct
    )?;
    writeln!(out, "Final debt: {:.1} M€", ins.final_debt)?;
    writeln!(
        out,
        "Public funding dependency: {:.1}%",
        ins.final_public_dependency_pct
    )?;

    writeln!(out, "\n5. PROFILE")?;
    writeln!(out, "Political orientation: {}", profile.orientation)?;
    writeln!(
        out,
        "Target electorate: {}",
        profile.target_electorate.join(", ")
    )?;
    writeln!(out, "Funding sources: {}", profile.funding_sources.join(", "))?;

    writeln!(out, "\n6. KEY EVENTS")?;
    for m in &profile.milestones {
        writeln!(out, "• {}: {}", m.year, m.text)?;
    }

    writeln!(out, "\n7. STRATEGIC RECOMMENDATIONS")?;
    for r in &profile.recommendations {
        writeln!(out, "• {r}")?;
    }
    Ok(())
}

const PREVIEW: [Series; 4] = [
    Series::Members,
    Series::TotalRevenue,
    Series::TotalExpenses,
    Series::BudgetExecutionRate,
];

/// Write the first `rows` rows of the headline columns.
pub fn write_preview<W: Write>(
    out: &mut W,
    ds: &Dataset,
    rows: usize,
) -> Result<(), ReportError> {
    let columns = PREVIEW
        .iter()
        .map(|s| ds.require(*s).map(|v| (*s, v)))
        .collect::<Result<Vec<_>, _>>()?;

    write!(out, "{:>6}", "year")?;
    for (s, _) in &columns {
        write!(out, " {:>22}", s.column())?;
    }
    writeln!(out)?;
    for (i, year) in ds.years().iter().take(rows).enumerate() {
        write!(out, "{year:>6}")?;
        for (_, v) in &columns {
            write!(out, " {:>22.4}", v[i])?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsim_gen::run;

    fn fixed() -> Dataset {
        let mut ds = Dataset::for_range(2020, 2021).unwrap();
        let cols: [(Series, [f64; 2]); 9] = [
            (Series::TotalRevenue, [20.0, 30.0]),
            (Series::TotalExpenses, [18.0, 22.0]),
            (Series::Members, [100_000.0, 50_000.0]),
            (Series::BudgetExecutionRate, [0.8, 0.9]),
            (Series::MembershipFees, [5.0, 5.0]),
            (Series::PrivateDonations, [10.0, 5.0]),
            (Series::PublicFunding, [0.0, 12.5]),
            (Series::FinancialBalance, [-0.1, 0.05]),
            (Series::Debt, [12.0, 14.5]),
        ];
        for (s, v) in cols {
            ds.insert(s, v.to_vec()).unwrap();
        }
        ds.insert(Series::PublicFundingDependency, vec![0.3, 0.4]).unwrap();
        ds
    }

    #[test]
    fn insights_from_fixed_table() {
        let ins = compute_insights(&fixed()).unwrap();
        assert_eq!(ins.first_year, 2020);
        assert_eq!(ins.mean_revenue, 25.0);
        assert_eq!(ins.mean_expenses, 20.0);
        assert_eq!(ins.mean_members, 75_000.0);
        assert!((ins.mean_execution_rate_pct - 85.0).abs() < 1e-9);
        assert!((ins.revenue_growth_pct.unwrap() - 50.0).abs() < 1e-9);
        assert!((ins.members_growth_pct.unwrap() + 50.0).abs() < 1e-9);
        assert!((ins.membership_share_pct.unwrap() - 20.0).abs() < 1e-9);
        assert!((ins.donations_share_pct.unwrap() - 30.0).abs() < 1e-9);
        assert!((ins.public_funding_share_pct.unwrap() - 25.0).abs() < 1e-9);
        assert!((ins.mean_balance_pct + 2.5).abs() < 1e-9);
        assert_eq!(ins.final_debt, 14.5);
        assert!((ins.final_public_dependency_pct - 40.0).abs() < 1e-9);
    }

    #[test]
    fn zero_first_value_has_no_growth() {
        let mut ds = fixed();
        ds.insert(Series::Members, vec![0.0, 10.0]).unwrap();
        assert_eq!(compute_insights(&ds).unwrap().members_growth_pct, None);
    }

    #[test]
    fn empty_and_missing_are_errors() {
        assert!(matches!(
            compute_insights(&Dataset::default()),
            Err(ReportError::EmptyDataset)
        ));
        let mut ds = Dataset::for_range(2020, 2021).unwrap();
        ds.insert(Series::TotalRevenue, vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            compute_insights(&ds),
            Err(ReportError::Validation(_))
        ));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(thousands(184_523.7), "184,524");
        assert_eq!(thousands(999.0), "999");
        assert_eq!(thousands(1_000.0), "1,000");
        assert_eq!(thousands(-1_234_567.0), "-1,234,567");
    }

    #[test]
    fn report_has_every_section() {
        let profile = Profile::default();
        let ds = run(&profile).unwrap();
        let ins = compute_insights(&ds).unwrap();
        let mut buf = Vec::new();
        write_report(&mut buf, &profile, &ins).unwrap();
        let text = String::from_utf8(buf).unwrap();
        for heading in [
            "1. GENERAL STATISTICS",
            "2. HISTORICAL EVOLUTION",
            "3. FINANCIAL STRUCTURE",
            "4. FINANCIAL PERFORMANCE",
            "5. PROFILE",
            "6. KEY EVENTS",
            "7. STRATEGIC RECOMMENDATIONS",
        ] {
            assert!(text.contains(heading), "missing {heading}");
        }
        assert!(text.contains("(2002-2025)"));
        assert!(text.contains("• 2014: Bygmalion affair"));
    }

    #[test]
    fn insights_serialize_to_json() {
        let ins = compute_insights(&fixed()).unwrap();
        let json = serde_json::to_value(&ins).unwrap();
        assert_eq!(json["final_debt"], 14.5);
        assert_eq!(json["first_year"], 2020);
    }

    #[test]
    fn preview_limits_rows() {
        let ds = run(&Profile::default()).unwrap();
        let mut buf = Vec::new();
        write_preview(&mut buf, &ds, 5).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].contains("budget_execution_rate"));
        assert!(lines[1].trim_start().starts_with("2002"));
        assert!(lines[5].trim_start().starts_with("2006"));
    }
}
