//! Organization profile: parameters, rule table and event table.
//!
//! The default profile encodes the hand-tuned UMP / Les Républicains
//! scenario over 2002–2025. Profiles can also be read from YAML.

use finsim_core::{Schedule, Series, YearMatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::{Base, GenError, Growth, SeriesRule, TrendEvent};

/// Legislative and presidential election years.
const ELECTIONS: [i32; 5] = [2002, 2007, 2012, 2017, 2022];

fn default_seed() -> u64 {
    42
}

/// A dated event listed in the text report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub year: i32,
    pub text: String,
}

/// Everything needed to generate and describe one organization's dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Full organization name.
    pub name: String,
    /// Short tag used in output file names.
    pub slug: String,
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Budget base in millions of euros.
    pub budget_base: f64,
    pub members_base: f64,
    #[serde(default)]
    pub orientation: String,
    #[serde(default)]
    pub target_electorate: Vec<String>,
    #[serde(default)]
    pub funding_sources: Vec<String>,
    pub rules: Vec<SeriesRule>,
    #[serde(default)]
    pub events: Vec<TrendEvent>,
    /// Year labels drawn on the revenue chart.
    #[serde(default)]
    pub annotations: BTreeMap<i32, String>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Profile {
    pub fn from_yaml_str(text: &str) -> Result<Self, GenError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, GenError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Read a profile from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GenError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let profile = Self::from_yaml_str(&text)?;
        info!(path = %path.display(), profile = %profile.name, "loaded profile");
        Ok(profile)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GenError> {
        fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    pub fn rule(&self, series: Series) -> Option<&SeriesRule> {
        self.rules.iter().find(|r| r.series == series)
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Union pour un Mouvement Populaire (UMP)".to_string(),
            slug: "UMP".to_string(),
            start_year: 2002,
            end_year: 2025,
            seed: default_seed(),
            budget_base: 25.0,
            members_base: 200_000.0,
            orientation: "right".to_string(),
            target_electorate: strings(&["executives", "entrepreneurs", "retirees", "rural"]),
            funding_sources: strings(&[
                "membership fees",
                "donations",
                "public funding",
                "events",
                "training",
            ]),
            rules: ump_rules(),
            events: ump_events(),
            annotations: [
                (2002, "UMP founded"),
                (2007, "Sarkozy"),
                (2012, "Defeat"),
                (2015, "LR"),
                (2017, "Defeat"),
                (2022, "Presidential"),
            ]
            .into_iter()
            .map(|(y, s)| (y, s.to_string()))
            .collect(),
            milestones: [
                (2002, "UMP founded, Jacques Chirac re-elected"),
                (2007, "Nicolas Sarkozy elected"),
                (2012, "Presidential defeat against François Hollande"),
                (2014, "Bygmalion affair"),
                (2015, "Renamed Les Républicains"),
                (2016, "Primary of the right and centre"),
                (2017, "Presidential defeat and parliamentary collapse"),
                (2020, "COVID-19 crisis and digital shift"),
                (2022, "Presidential and legislative elections"),
            ]
            .into_iter()
            .map(|(year, text)| Milestone {
                year,
                text: text.to_string(),
            })
            .collect(),
            recommendations: strings(&[
                "Diversify funding sources",
                "Strengthen membership fee collection",
                "Develop digital fundraising",
                "Optimize the expense structure",
                "Invest in cadre training",
                "Strengthen the local presence",
                "Improve financial transparency",
                "Build partnerships with civil society",
            ]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn budget(share: f64) -> Base {
    Base::Budget { share }
}

fn absolute(value: f64) -> Base {
    Base::Absolute { value }
}

fn linear(rate: Schedule, per: f64) -> Growth {
    Growth::Linear { rate, per }
}

fn ramp(from: i32, rate: f64) -> Growth {
    Growth::Ramp {
        from,
        rate,
        per: 10.0,
    }
}

fn elections(value: f64) -> Schedule {
    Schedule::constant(1.0).when(YearMatch::one_of(&ELECTIONS), value)
}

fn until(to: i32) -> YearMatch {
    YearMatch::Until { to }
}

fn ump_rules() -> Vec<SeriesRule> {
    use Series::*;

    let between = YearMatch::between;
    let one_of = YearMatch::one_of;
    vec![
        SeriesRule::new(
            Members,
            Base::Members { share: 1.0 },
            linear(
                Schedule::constant(0.03)
                    .when(between(2002, 2007), 0.15)
                    .when(between(2007, 2012), 0.08)
                    .when(between(2012, 2014), -0.12)
                    .when(between(2014, 2016), 0.05)
                    .when(between(2017, 2022), -0.18),
                3.0,
            ),
        )
        .noise(0.08),
        SeriesRule::new(
            DepartmentalFederations,
            absolute(100.0),
            linear(
                Schedule::constant(-0.005)
                    .when(until(2007), 0.02)
                    .when(until(2012), 0.01),
                4.0,
            ),
        ),
        SeriesRule::new(
            LocalOfficials,
            absolute(50_000.0),
            linear(
                Schedule::constant(-0.02)
                    .when(until(2007), 0.03)
                    .when(until(2014), -0.01),
                5.0,
            ),
        )
        .times(Schedule::constant(1.0).when(one_of(&[2001, 2008, 2014, 2020]), 1.15))
        .noise(0.06),
        SeriesRule::new(
            NationalOfficials,
            absolute(300.0),
            linear(Schedule::constant(-0.02), 2.0),
        )
        .times(
            Schedule::constant(1.0)
                .when(one_of(&[2002, 2007]), 1.4)
                .when(YearMatch::year(2012), 0.7)
                .when(YearMatch::year(2017), 0.4)
                .when(YearMatch::year(2022), 0.6),
        )
        .noise(0.12),
        SeriesRule::new(
            TotalRevenue,
            budget(1.0),
            linear(
                Schedule::constant(0.05)
                    .when(between(2002, 2007), 0.12)
                    .when(between(2008, 2012), 0.04)
                    .when(between(2013, 2016), 0.08)
                    .when(between(2017, 2021), -0.10),
                3.0,
            ),
        )
        .noise(0.10),
        SeriesRule::new(
            MembershipFees,
            budget(0.25),
            linear(
                Schedule::constant(-0.05)
                    .when(until(2007), 0.10)
                    .when(until(2012), 0.03)
                    .when(until(2016), 0.06),
                4.0,
            ),
        )
        .noise(0.08),
        SeriesRule::new(
            PrivateDonations,
            budget(0.35),
            linear(Schedule::constant(0.05), 3.0),
        )
        .times(
            Schedule::constant(1.1)
                .when(until(2007), 1.2)
                .when(until(2012), 0.8)
                .when(until(2017), 0.9),
        )
        .times(elections(1.8))
        .noise(0.15),
        SeriesRule::new(
            PublicFunding,
            budget(0.30),
            linear(Schedule::constant(0.02), 4.0),
        )
        .times(
            Schedule::constant(0.6)
                .when(between(2003, 2008), 1.4)
                .when(between(2012, 2016), 0.7)
                .when(between(2017, 2021), 0.4),
        )
        .noise(0.08),
        SeriesRule::new(
            EventRevenue,
            budget(0.05),
            linear(Schedule::constant(0.03), 3.0),
        )
        .times(
            Schedule::constant(1.0)
                .when(one_of(&[2002, 2004, 2006, 2010, 2014, 2016, 2021]), 1.6),
        )
        .noise(0.12),
        SeriesRule::new(TrainingRevenue, budget(0.03), ramp(2010, 0.06))
            .noise(0.10),
        SeriesRule::new(Loans, budget(0.02), linear(Schedule::constant(0.01), 4.0))
            .times(elections(2.5).when(one_of(&[2003, 2008, 2013, 2018]), 1.5))
            .noise(0.20),
        SeriesRule::new(
            TotalExpenses,
            budget(0.95),
            linear(Schedule::constant(0.04), 3.0),
        )
        .times(elections(1.4))
        .noise(0.08),
        SeriesRule::new(
            StaffExpenses,
            budget(0.35),
            linear(Schedule::constant(-0.02).when(until(2012), 0.05), 4.0),
        )
        .noise(0.06),
        SeriesRule::new(
            CampaignExpenses,
            budget(0.25),
            linear(Schedule::constant(0.03), 3.0),
        )
        .times(
            Schedule::constant(0.5)
                .when(one_of(&ELECTIONS), 3.0)
                .when(one_of(&[2001, 2006, 2011, 2016, 2021]), 1.8),
        )
        .noise(0.25),
        SeriesRule::new(CommunicationExpenses, budget(0.15), ramp(2010, 0.07))
            .noise(0.12),
        SeriesRule::new(
            OperatingExpenses,
            budget(0.12),
            linear(Schedule::constant(0.02), 4.0),
        )
        .noise(0.05),
        SeriesRule::new(TrainingExpenses, budget(0.05), ramp(2008, 0.05))
            .noise(0.10),
        SeriesRule::new(LoanRepayments, budget(0.03), ramp(2010, 0.08))
            .noise(0.15),
        SeriesRule::new(BudgetExecutionRate, absolute(1.0), Growth::Flat)
            .times(
                Schedule::constant(0.87)
                    .when(until(2005), 0.85)
                    .when(until(2012), 0.88)
                    .when(until(2017), 0.82),
            )
            .noise(0.04),
        SeriesRule::new(MembershipRevenueRatio, absolute(1.0), Growth::Flat)
            .times(
                Schedule::constant(0.18)
                    .when(until(2007), 0.28)
                    .when(until(2012), 0.25)
                    .when(until(2017), 0.22),
            )
            .noise(0.05),
        SeriesRule::new(PublicFundingDependency, absolute(1.0), Growth::Flat)
            .times(
                Schedule::constant(0.38)
                    .when(until(2007), 0.25)
                    .when(until(2012), 0.32)
                    .when(until(2017), 0.45),
            )
            .noise(0.06),
        SeriesRule::new(FinancialBalance, absolute(1.0), Growth::Flat)
            .times(
                Schedule::constant(0.02)
                    .when(one_of(&ELECTIONS), -0.15)
                    .when(one_of(&[2003, 2008, 2013, 2018, 2023]), 0.08),
            )
            .noise(0.10),
        SeriesRule::new(
            Debt,
            budget(0.5),
            Growth::Compound {
                rate: Schedule::constant(0.02)
                    .when(one_of(&ELECTIONS), 0.25)
                    .when(one_of(&[2004, 2009, 2014, 2019, 2024]), -0.10),
            },
        )
        .noise(0.08),
        SeriesRule::new(CommunicationInvestment, budget(0.08), ramp(2010, 0.09))
            .noise(0.14),
        SeriesRule::new(DigitalInvestment, budget(0.06), ramp(2012, 0.12))
            .noise(0.18),
        SeriesRule::new(TrainingInvestment, budget(0.04), ramp(2008, 0.06))
            .noise(0.12),
        SeriesRule::new(ResearchInvestment, budget(0.03), ramp(2015, 0.05))
            .noise(0.15),
        SeriesRule::new(InternationalInvestment, budget(0.02), ramp(2010, 0.04))
            .noise(0.20),
    ]
}

fn ump_events() -> Vec<TrendEvent> {
    use Series::*;

    let year = YearMatch::year;
    vec![
        TrendEvent::new("UMP founded", year(2002))
            .scale(TotalRevenue, 1.8)
            .scale(Members, 1.5),
        TrendEvent::new("Chirac re-elected", year(2002))
            .scale(PrivateDonations, 2.2)
            .scale(CampaignExpenses, 2.5),
        TrendEvent::new("Sarkozy elected", year(2007))
            .scale(TotalRevenue, 1.4)
            .scale(CampaignExpenses, 2.8),
        TrendEvent::new("Financial crisis", YearMatch::between(2008, 2009))
            .scale(PrivateDonations, 0.75)
            .scale(TotalRevenue, 0.90),
        TrendEvent::new("Presidential defeat 2012", year(2012))
            .scale(PublicFunding, 0.65)
            .scale(Members, 0.88),
        TrendEvent::new("Bygmalion affair", year(2014))
            .scale(PrivateDonations, 0.60)
            .scale(TotalRevenue, 0.85)
            .scale(Debt, 1.4),
        TrendEvent::new("Renamed Les Républicains", year(2015))
            .scale(CommunicationInvestment, 1.6)
            .scale(CommunicationExpenses, 1.4),
        TrendEvent::new("Primary 2016", year(2016))
            .scale(TotalRevenue, 1.3)
            .scale(CampaignExpenses, 1.8),
        TrendEvent::new("Presidential defeat 2017", year(2017))
            .scale(PublicFunding, 0.45)
            .scale(Members, 0.78)
            .scale(NationalOfficials, 0.35),
        TrendEvent::new("COVID-19", year(2020))
            .scale(EventRevenue, 0.3)
            .scale(DigitalInvestment, 1.5),
        TrendEvent::new("Presidential election 2022", year(2022))
            .scale(CampaignExpenses, 2.2)
            .scale(PrivateDonations, 1.8),
    ]
}
