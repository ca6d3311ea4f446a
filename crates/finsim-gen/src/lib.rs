#![deny(warnings)]

//! Scenario generator: trend rules, seeded noise and event post-processing.
//!
//! Each series value is `base × growth(index, year) × Π multipliers(year) ×
//! noise`, where noise is a normal factor centred on 1. A second pass
//! ([`apply_trends`]) scales individual (year, series) cells to encode
//! one-off historical events.

mod profile;

pub use profile::{Milestone, Profile};

use finsim_core::{Dataset, Schedule, Series, ValidationError, YearMatch};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};

/// Errors produced while loading profiles or generating data.
#[derive(Debug, Error)]
pub enum GenError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A rule is structurally unusable.
    #[error("invalid rule for {series}: {reason}")]
    InvalidRule { series: Series, reason: String },
    /// Profile file could not be parsed or written.
    #[error("invalid profile: {0}")]
    Profile(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for GenError {
    fn from(e: std::io::Error) -> Self {
        GenError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for GenError {
    fn from(e: serde_yaml::Error) -> Self {
        GenError::Profile(e.to_string())
    }
}

/// Base level of a series before growth and multipliers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Base {
    /// A fixed value.
    Absolute { value: f64 },
    /// A share of the profile's budget base (millions of euros).
    Budget { share: f64 },
    /// A share of the profile's member base.
    Members { share: f64 },
}

impl Base {
    pub fn resolve(&self, profile: &Profile) -> f64 {
        match self {
            Base::Absolute { value } => *value,
            Base::Budget { share } => profile.budget_base * share,
            Base::Members { share } => profile.members_base * share,
        }
    }
}

/// Trend component of a series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Growth {
    /// `1 + rate(year) × index / per`.
    Linear { rate: Schedule, per: f64 },
    /// `1 + rate × max(0, year − from) / per` from `from` on, `1` before.
    Ramp { from: i32, rate: f64, per: f64 },
    /// Running product of `1 + rate(year)`, current year included.
    Compound { rate: Schedule },
    Flat,
}

impl Growth {
    /// Growth factor for the `index`-th year. `level` carries the running
    /// product for [`Growth::Compound`] and must start at 1.
    pub fn factor(&self, index: usize, year: i32, level: &mut f64) -> f64 {
        match self {
            Growth::Linear { rate, per } => 1.0 + rate.at(year) * (index as f64 / per),
            Growth::Ramp { from, rate, per } => {
                if year >= *from {
                    1.0 + rate * (f64::from(year - from) / per).max(0.0)
                } else {
                    1.0
                }
            }
            Growth::Compound { rate } => {
                *level *= 1.0 + rate.at(year);
                *level
            }
            Growth::Flat => 1.0,
        }
    }

    fn check(&self, series: Series) -> Result<(), GenError> {
        let invalid = |reason: &str| GenError::InvalidRule {
            series,
            reason: reason.to_string(),
        };
        match self {
            Growth::Linear { rate, per } => {
                if !rate.is_finite() {
                    return Err(invalid("non-finite growth rate"));
                }
                if !per.is_finite() || *per <= 0.0 {
                    return Err(invalid("growth divisor must be > 0"));
                }
            }
            Growth::Ramp { rate, per, .. } => {
                if !rate.is_finite() {
                    return Err(invalid("non-finite growth rate"));
                }
                if !per.is_finite() || *per <= 0.0 {
                    return Err(invalid("growth divisor must be > 0"));
                }
            }
            Growth::Compound { rate } => {
                if !rate.is_finite() {
                    return Err(invalid("non-finite growth rate"));
                }
            }
            Growth::Flat => {}
        }
        Ok(())
    }
}

/// Generation rule for one series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesRule {
    pub series: Series,
    pub base: Base,
    pub growth: Growth,
    /// Event multipliers; all of them apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multipliers: Vec<Schedule>,
    /// Standard deviation of the normal noise factor; `None` disables noise.
    #[serde(default)]
    pub noise: Option<f64>,
    /// Lower bound applied to each generated value.
    #[serde(default)]
    pub floor: Option<f64>,
}

impl SeriesRule {
    pub fn new(series: Series, base: Base, growth: Growth) -> Self {
        Self {
            series,
            base,
            growth,
            multipliers: Vec::new(),
            noise: None,
            floor: None,
        }
    }

    pub fn times(mut self, multiplier: Schedule) -> Self {
        self.multipliers.push(multiplier);
        self
    }

    pub fn noise(mut self, std_dev: f64) -> Self {
        self.noise = Some(std_dev);
        self
    }

    pub fn floor(mut self, floor: f64) -> Self {
        self.floor = Some(floor);
        self
    }

    /// Evaluate the rule over `years`, drawing one noise sample per year
    /// when noise is enabled.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        years: &[i32],
        base: f64,
        rng: &mut R,
    ) -> Result<Vec<f64>, GenError> {
        let noise = match self.noise {
            Some(sd) => Some(Normal::new(1.0, sd).map_err(|e| GenError::InvalidRule {
                series: self.series,
                reason: e.to_string(),
            })?),
            None => None,
        };
        let mut level = 1.0;
        let mut out = Vec::with_capacity(years.len());
        for (i, &year) in years.iter().enumerate() {
            let growth = self.growth.factor(i, year, &mut level);
            let multiplier: f64 = self.multipliers.iter().map(|m| m.at(year)).product();
            let factor = match &noise {
                Some(n) => n.sample(&mut *rng),
                None => 1.0,
            };
            let mut v = base * growth * multiplier * factor;
            if let Some(floor) = self.floor {
                v = v.max(floor);
            }
            out.push(v);
        }
        Ok(out)
    }

    fn check(&self, profile: &Profile) -> Result<(), GenError> {
        if !self.base.resolve(profile).is_finite() {
            return Err(ValidationError::NonFinite(format!("{} base", self.series)).into());
        }
        self.growth.check(self.series)?;
        if self.multipliers.iter().any(|m| !m.is_finite()) {
            return Err(ValidationError::NonFinite(format!("{} multiplier", self.series)).into());
        }
        if let Some(sd) = self.noise {
            if !sd.is_finite() {
                return Err(ValidationError::NonFinite(format!("{} noise", self.series)).into());
            }
            if sd < 0.0 {
                return Err(ValidationError::NegativeNoise(self.series).into());
            }
        }
        if self.floor.is_some_and(|f| !f.is_finite()) {
            return Err(ValidationError::NonFinite(format!("{} floor", self.series)).into());
        }
        Ok(())
    }
}

/// Multiplicative adjustment of one series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendEffect {
    pub series: Series,
    pub factor: f64,
}

/// A historical event: a set of effects applied in the matching years.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendEvent {
    pub name: String,
    pub years: YearMatch,
    pub effects: Vec<TrendEffect>,
}

impl TrendEvent {
    pub fn new(name: &str, years: YearMatch) -> Self {
        Self {
            name: name.to_string(),
            years,
            effects: Vec::new(),
        }
    }

    pub fn scale(mut self, series: Series, factor: f64) -> Self {
        self.effects.push(TrendEffect { series, factor });
        self
    }
}

/// Validate a profile: year range, finite numbers, non-negative noise and
/// exactly one rule per series.
pub fn validate_profile(profile: &Profile) -> Result<(), GenError> {
    finsim_core::validate_year_range(profile.start_year, profile.end_year)?;
    if !profile.budget_base.is_finite() {
        return Err(ValidationError::NonFinite("budget_base".into()).into());
    }
    if !profile.members_base.is_finite() {
        return Err(ValidationError::NonFinite("members_base".into()).into());
    }
    let mut seen = BTreeSet::new();
    for rule in &profile.rules {
        if !seen.insert(rule.series) {
            return Err(ValidationError::DuplicateSeries(rule.series).into());
        }
        rule.check(profile)?;
    }
    if let Some(missing) = Series::ALL.iter().find(|s| !seen.contains(*s)) {
        return Err(ValidationError::MissingSeries(*missing).into());
    }
    for event in &profile.events {
        if event.effects.iter().any(|e| !e.factor.is_finite()) {
            return Err(ValidationError::NonFinite(format!("event {}", event.name)).into());
        }
    }
    Ok(())
}

/// Generate the raw dataset (no event post-processing).
///
/// Series are evaluated in [`Series`] order from one `ChaCha8Rng` seeded
/// with `profile.seed`, so equal profiles give equal datasets.
pub fn generate(profile: &Profile) -> Result<Dataset, GenError> {
    let mut ds = Dataset::for_range(profile.start_year, profile.end_year)?;
    let mut rng = ChaCha8Rng::seed_from_u64(profile.seed);
    let mut rules: Vec<&SeriesRule> = profile.rules.iter().collect();
    rules.sort_by_key(|r| r.series);
    for rule in rules {
        let base = rule.base.resolve(profile);
        let values = rule.evaluate(ds.years(), base, &mut rng)?;
        debug!(series = %rule.series, base, "generated series");
        ds.insert(rule.series, values)?;
    }
    Ok(ds)
}

/// Apply event adjustments in place. Years outside the dataset are skipped.
/// Returns the number of cells scaled.
pub fn apply_trends(ds: &mut Dataset, events: &[TrendEvent]) -> usize {
    let years = ds.years().to_vec();
    let mut adjusted = 0;
    for event in events {
        let before = adjusted;
        for &year in years.iter().filter(|y| event.years.matches(**y)) {
            for effect in &event.effects {
                if ds.scale(year, effect.series, effect.factor) {
                    adjusted += 1;
                }
            }
        }
        if adjusted == before {
            debug!(event = %event.name, "event outside dataset range");
        } else {
            debug!(event = %event.name, cells = adjusted - before, "applied event");
        }
    }
    adjusted
}

/// Validate, generate and post-process a profile.
pub fn run(profile: &Profile) -> Result<Dataset, GenError> {
    validate_profile(profile)?;
    info!(
        profile = %profile.name,
        start = profile.start_year,
        end = profile.end_year,
        seed = profile.seed,
        "generating dataset"
    );
    let mut ds = generate(profile)?;
    let adjusted = apply_trends(&mut ds, &profile.events);
    info!(rows = ds.len(), adjusted, "dataset ready");
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn profile_2002_2025() -> Profile {
        Profile::default()
    }

    #[test]
    fn default_profile_is_valid() {
        validate_profile(&profile_2002_2025()).unwrap();
    }

    #[test]
    fn dataset_covers_every_series_and_year() {
        let ds = run(&profile_2002_2025()).unwrap();
        assert_eq!(ds.len(), 24);
        assert_eq!(ds.years().first(), Some(&2002));
        assert_eq!(ds.years().last(), Some(&2025));
        assert!(ds.is_complete());
    }

    #[test]
    fn same_seed_same_data() {
        let p = profile_2002_2025();
        assert_eq!(run(&p).unwrap(), run(&p).unwrap());
        let mut q = p.clone();
        q.seed += 1;
        assert_ne!(run(&p).unwrap(), run(&q).unwrap());
    }

    #[test]
    fn federations_are_noise_free() {
        let ds = generate(&profile_2002_2025()).unwrap();
        let fed = ds.series(Series::DepartmentalFederations).unwrap();
        // 2002: index 0, rate 0.02 -> 100; 2013: index 11, rate -0.005 -> 98.625
        assert!((fed[0] - 100.0).abs() < 1e-9);
        assert!((fed[11] - 100.0 * (1.0 - 0.005 * 11.0 / 4.0)).abs() < 1e-9);
    }

    /// Default profile without noise or events: every cell is the bare
    /// `base × growth × multipliers` product.
    fn noise_free() -> Profile {
        let mut p = profile_2002_2025();
        for rule in &mut p.rules {
            rule.noise = None;
        }
        p.events.clear();
        p
    }

    fn assert_cells(ds: &Dataset, series: Series, cells: &[(i32, f64)]) {
        for &(year, expected) in cells {
            let got = ds.value(year, series).unwrap();
            assert!(
                (got - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                "{series} {year}: {got} != {expected}"
            );
        }
    }

    #[test]
    fn default_rule_table_values() {
        use Series::*;

        let ds = generate(&noise_free()).unwrap();
        let table: &[(Series, &[(i32, f64)])] = &[
            // 2007 and 2012 sit on two overlapping periods; the earlier one wins.
            (
                Members,
                &[
                    (2002, 200_000.0),
                    (2007, 250_000.0),
                    (2012, 200_000.0 * (1.0 + 0.08 * 10.0 / 3.0)),
                    (2013, 112_000.0),
                    (2016, 200_000.0 * (1.0 + 0.05 * 14.0 / 3.0)),
                    (2019, -4_000.0),
                    (2023, 242_000.0),
                ],
            ),
            (DepartmentalFederations, &[(2007, 102.5), (2010, 102.0)]),
            (
                LocalOfficials,
                &[(2003, 50_300.0), (2008, 56_810.0), (2020, 53_360.0)],
            ),
            (
                NationalOfficials,
                &[
                    (2007, 399.0),
                    (2010, 276.0),
                    (2012, 189.0),
                    (2022, 144.0),
                ],
            ),
            (
                TotalRevenue,
                &[
                    (2007, 30.0),
                    (2008, 27.0),
                    (2016, 25.0 * (1.0 + 0.08 * 14.0 / 3.0)),
                    (2021, 25.0 * (1.0 - 0.10 * 19.0 / 3.0)),
                    (2022, 25.0 * (1.0 + 0.05 * 20.0 / 3.0)),
                ],
            ),
            (
                MembershipFees,
                &[
                    (2007, 7.03125),
                    (2012, 6.71875),
                    (2016, 7.5625),
                    (2017, 5.078125),
                ],
            ),
            (
                PrivateDonations,
                &[
                    (2007, 8.75 * (1.0 + 0.05 * 5.0 / 3.0) * 1.2 * 1.8),
                    (2008, 7.7),
                    (2017, 17.71875),
                    (2018, 8.75 * (1.0 + 0.05 * 16.0 / 3.0) * 1.1),
                ],
            ),
            (
                PublicFunding,
                &[
                    (2002, 4.5),
                    (2003, 10.5525),
                    (2008, 10.815),
                    (2009, 4.6575),
                    (2012, 5.5125),
                    (2021, 3.285),
                    (2022, 4.95),
                ],
            ),
            (EventRevenue, &[(2004, 2.04), (2005, 1.2875)]),
            (TrainingRevenue, &[(2009, 0.75), (2020, 0.795)]),
            (Loans, &[(2002, 1.25), (2003, 0.751875), (2005, 0.50375)]),
            (TotalExpenses, &[(2002, 33.25), (2005, 24.7)]),
            (StaffExpenses, &[(2012, 9.84375), (2013, 8.26875)]),
            (
                CampaignExpenses,
                &[(2003, 3.15625), (2006, 11.7), (2007, 19.6875)],
            ),
            (CommunicationExpenses, &[(2005, 3.75), (2020, 4.0125)]),
            (OperatingExpenses, &[(2022, 3.3)]),
            (TrainingExpenses, &[(2007, 1.25), (2018, 1.3125)]),
            (LoanRepayments, &[(2015, 0.78)]),
            (
                BudgetExecutionRate,
                &[
                    (2005, 0.85),
                    (2006, 0.88),
                    (2012, 0.88),
                    (2013, 0.82),
                    (2018, 0.87),
                ],
            ),
            (
                MembershipRevenueRatio,
                &[(2007, 0.28), (2008, 0.25), (2017, 0.22), (2018, 0.18)],
            ),
            (
                PublicFundingDependency,
                &[(2007, 0.25), (2012, 0.32), (2017, 0.45), (2018, 0.38)],
            ),
            (
                FinancialBalance,
                &[(2002, -0.15), (2003, 0.08), (2004, 0.02)],
            ),
            (Debt, &[(2002, 15.625), (2003, 15.9375), (2004, 14.34375)]),
            (CommunicationInvestment, &[(2020, 2.18)]),
            (DigitalInvestment, &[(2011, 1.5), (2022, 1.68)]),
            (TrainingInvestment, &[(2018, 1.06)]),
            (ResearchInvestment, &[(2014, 0.75), (2025, 0.7875)]),
            (InternationalInvestment, &[(2020, 0.52)]),
        ];
        assert_eq!(table.len(), Series::ALL.len());
        for (series, cells) in table {
            assert_cells(&ds, *series, cells);
        }
    }

    #[test]
    fn members_go_negative_after_2018() {
        let ds = generate(&noise_free()).unwrap();
        let members = |year| ds.value(year, Series::Members).unwrap();
        assert!(members(2018) > 0.0);
        for (i, year) in (2019..=2022).enumerate() {
            let expected = 200_000.0 * (1.0 - 0.18 * (17 + i) as f64 / 3.0);
            assert!((members(year) - expected).abs() < 1e-6, "{year}");
            assert!(members(year) < 0.0, "{year}");
        }
        assert!(members(2023) > 0.0);
    }

    #[test]
    fn floor_is_opt_in() {
        let years: Vec<i32> = (2002..=2005).collect();
        let rule = SeriesRule::new(
            Series::Members,
            Base::Absolute { value: 100.0 },
            Growth::Linear {
                rate: Schedule::constant(-1.0),
                per: 1.0,
            },
        );
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let raw = rule.evaluate(&years, 100.0, &mut rng).unwrap();
        assert_eq!(raw, [100.0, 0.0, -100.0, -200.0]);
        let floored = rule.floor(0.0).evaluate(&years, 100.0, &mut rng).unwrap();
        assert_eq!(floored, [100.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn election_years_run_a_deficit() {
        let ds = run(&profile_2002_2025()).unwrap();
        for year in [2002, 2007, 2012, 2017, 2022] {
            assert!(ds.value(year, Series::FinancialBalance).unwrap() < 0.0);
        }
    }

    #[test]
    fn compound_growth_accumulates() {
        let rule = SeriesRule::new(
            Series::Debt,
            Base::Absolute { value: 10.0 },
            Growth::Compound {
                rate: Schedule::constant(0.1).when(YearMatch::year(2001), -0.5),
            },
        );
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let v = rule.evaluate(&[2000, 2001, 2002], 10.0, &mut rng).unwrap();
        assert!((v[0] - 11.0).abs() < 1e-9);
        assert!((v[1] - 5.5).abs() < 1e-9);
        assert!((v[2] - 6.05).abs() < 1e-9);
    }

    #[test]
    fn ramp_is_flat_before_start() {
        let g = Growth::Ramp {
            from: 2010,
            rate: 0.06,
            per: 10.0,
        };
        let mut level = 1.0;
        assert_eq!(g.factor(0, 2009, &mut level), 1.0);
        assert_eq!(g.factor(8, 2010, &mut level), 1.0);
        assert!((g.factor(18, 2020, &mut level) - 1.06).abs() < 1e-12);
    }

    #[test]
    fn trends_scale_only_named_cells() {
        let mut p = profile_2002_2025();
        p.events.clear();
        let raw = generate(&p).unwrap();
        let mut ds = raw.clone();
        let events = vec![
            TrendEvent::new("split", YearMatch::between(2008, 2009))
                .scale(Series::PrivateDonations, 0.75)
                .scale(Series::TotalRevenue, 0.9),
            TrendEvent::new("before range", YearMatch::year(1990)).scale(Series::Debt, 2.0),
        ];
        assert_eq!(apply_trends(&mut ds, &events), 4);
        let before = raw.value(2008, Series::PrivateDonations).unwrap();
        let after = ds.value(2008, Series::PrivateDonations).unwrap();
        assert!((after - before * 0.75).abs() < 1e-9);
        assert_eq!(
            ds.series(Series::Debt).unwrap(),
            raw.series(Series::Debt).unwrap()
        );
        assert_eq!(
            ds.value(2010, Series::TotalRevenue),
            raw.value(2010, Series::TotalRevenue)
        );
    }

    #[test]
    fn default_events_cover_2017_collapse() {
        let mut p = profile_2002_2025();
        let events = std::mem::take(&mut p.events);
        let raw = generate(&p).unwrap();
        let mut ds = raw.clone();
        apply_trends(&mut ds, &events);
        let r = ds.value(2017, Series::NationalOfficials).unwrap()
            / raw.value(2017, Series::NationalOfficials).unwrap();
        assert!((r - 0.35).abs() < 1e-9);
    }

    #[test]
    fn duplicate_rule_rejected() {
        let mut p = profile_2002_2025();
        let dup = p.rules[0].clone();
        p.rules.push(dup);
        assert!(matches!(
            validate_profile(&p),
            Err(GenError::Validation(ValidationError::DuplicateSeries(Series::Members)))
        ));
    }

    #[test]
    fn missing_rule_rejected() {
        let mut p = profile_2002_2025();
        p.rules.retain(|r| r.series != Series::Debt);
        assert!(matches!(
            validate_profile(&p),
            Err(GenError::Validation(ValidationError::MissingSeries(Series::Debt)))
        ));
    }

    #[test]
    fn negative_noise_rejected() {
        let mut p = profile_2002_2025();
        p.rules[2].noise = Some(-0.1);
        assert!(matches!(
            validate_profile(&p),
            Err(GenError::Validation(ValidationError::NegativeNoise(_)))
        ));
    }

    #[test]
    fn zero_divisor_rejected() {
        let mut p = profile_2002_2025();
        p.rules[0].growth = Growth::Linear {
            rate: Schedule::constant(0.1),
            per: 0.0,
        };
        assert!(matches!(
            validate_profile(&p),
            Err(GenError::InvalidRule {
                series: Series::Members,
                ..
            })
        ));
    }

    proptest! {
        #[test]
        fn noise_free_rule_is_deterministic(
            base in 0.1f64..1e6,
            rate in -0.2f64..0.2,
            seed in any::<u64>()
        ) {
            let rule = SeriesRule::new(
                Series::OperatingExpenses,
                Base::Absolute { value: base },
                Growth::Linear { rate: Schedule::constant(rate), per: 4.0 },
            );
            let years: Vec<i32> = (2002..=2025).collect();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let v = rule.evaluate(&years, base, &mut rng).unwrap();
            for (i, x) in v.iter().enumerate() {
                let expected = base * (1.0 + rate * i as f64 / 4.0);
                prop_assert!((x - expected).abs() <= 1e-9 * expected.abs().max(1.0));
            }
        }

        #[test]
        fn any_seed_generates_finite_data(seed in any::<u64>()) {
            let mut p = Profile::default();
            p.seed = seed;
            let ds = run(&p).unwrap();
            for (_, col) in ds.columns() {
                prop_assert!(col.iter().all(|v| v.is_finite()));
            }
        }
    }
}
