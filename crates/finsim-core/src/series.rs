//! The closed catalogue of generated columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

/// Measurement unit of a series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Head count (members, officials, federations).
    Count,
    /// Millions of euros.
    MillionEuros,
    /// Dimensionless ratio, usually in [0, 1].
    Ratio,
}

/// One numeric column of the dataset.
///
/// Declaration order is the export order, and `Ord` follows it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    Members,
    DepartmentalFederations,
    LocalOfficials,
    NationalOfficials,
    TotalRevenue,
    MembershipFees,
    PrivateDonations,
    PublicFunding,
    EventRevenue,
    TrainingRevenue,
    Loans,
    TotalExpenses,
    StaffExpenses,
    CampaignExpenses,
    CommunicationExpenses,
    OperatingExpenses,
    TrainingExpenses,
    LoanRepayments,
    BudgetExecutionRate,
    MembershipRevenueRatio,
    PublicFundingDependency,
    FinancialBalance,
    Debt,
    CommunicationInvestment,
    DigitalInvestment,
    TrainingInvestment,
    ResearchInvestment,
    InternationalInvestment,
}

impl Series {
    /// Every series, in export order.
    pub const ALL: [Series; 28] = [
        Series::Members,
        Series::DepartmentalFederations,
        Series::LocalOfficials,
        Series::NationalOfficials,
        Series::TotalRevenue,
        Series::MembershipFees,
        Series::PrivateDonations,
        Series::PublicFunding,
        Series::EventRevenue,
        Series::TrainingRevenue,
        Series::Loans,
        Series::TotalExpenses,
        Series::StaffExpenses,
        Series::CampaignExpenses,
        Series::CommunicationExpenses,
        Series::OperatingExpenses,
        Series::TrainingExpenses,
        Series::LoanRepayments,
        Series::BudgetExecutionRate,
        Series::MembershipRevenueRatio,
        Series::PublicFundingDependency,
        Series::FinancialBalance,
        Series::Debt,
        Series::CommunicationInvestment,
        Series::DigitalInvestment,
        Series::TrainingInvestment,
        Series::ResearchInvestment,
        Series::InternationalInvestment,
    ];

    /// Stable column name used in exported files.
    pub fn column(self) -> &'static str {
        match self {
            Series::Members => "members",
            Series::DepartmentalFederations => "departmental_federations",
            Series::LocalOfficials => "local_officials",
            Series::NationalOfficials => "national_officials",
            Series::TotalRevenue => "total_revenue",
            Series::MembershipFees => "membership_fees",
            Series::PrivateDonations => "private_donations",
            Series::PublicFunding => "public_funding",
            Series::EventRevenue => "event_revenue",
            Series::TrainingRevenue => "training_revenue",
            Series::Loans => "loans",
            Series::TotalExpenses => "total_expenses",
            Series::StaffExpenses => "staff_expenses",
            Series::CampaignExpenses => "campaign_expenses",
            Series::CommunicationExpenses => "communication_expenses",
            Series::OperatingExpenses => "operating_expenses",
            Series::TrainingExpenses => "training_expenses",
            Series::LoanRepayments => "loan_repayments",
            Series::BudgetExecutionRate => "budget_execution_rate",
            Series::MembershipRevenueRatio => "membership_revenue_ratio",
            Series::PublicFundingDependency => "public_funding_dependency",
            Series::FinancialBalance => "financial_balance",
            Series::Debt => "debt",
            Series::CommunicationInvestment => "communication_investment",
            Series::DigitalInvestment => "digital_investment",
            Series::TrainingInvestment => "training_investment",
            Series::ResearchInvestment => "research_investment",
            Series::InternationalInvestment => "international_investment",
        }
    }

    /// Human-readable label for charts and reports.
    pub fn label(self) -> &'static str {
        match self {
            Series::Members => "Members",
            Series::DepartmentalFederations => "Departmental federations",
            Series::LocalOfficials => "Local officials",
            Series::NationalOfficials => "National officials",
            Series::TotalRevenue => "Total revenue",
            Series::MembershipFees => "Membership fees",
            Series::PrivateDonations => "Private donations",
            Series::PublicFunding => "Public funding",
            Series::EventRevenue => "Events",
            Series::TrainingRevenue => "Training",
            Series::Loans => "Loans",
            Series::TotalExpenses => "Total expenses",
            Series::StaffExpenses => "Staff",
            Series::CampaignExpenses => "Campaigns",
            Series::CommunicationExpenses => "Communication",
            Series::OperatingExpenses => "Operations",
            Series::TrainingExpenses => "Training",
            Series::LoanRepayments => "Loan repayments",
            Series::BudgetExecutionRate => "Budget execution rate",
            Series::MembershipRevenueRatio => "Membership fees / revenue",
            Series::PublicFundingDependency => "Public funding dependency",
            Series::FinancialBalance => "Financial balance",
            Series::Debt => "Debt",
            Series::CommunicationInvestment => "Communication",
            Series::DigitalInvestment => "Digital",
            Series::TrainingInvestment => "Training",
            Series::ResearchInvestment => "Research",
            Series::InternationalInvestment => "International",
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            Series::Members
            | Series::DepartmentalFederations
            | Series::LocalOfficials
            | Series::NationalOfficials => Unit::Count,
            Series::BudgetExecutionRate
            | Series::MembershipRevenueRatio
            | Series::PublicFundingDependency
            | Series::FinancialBalance => Unit::Ratio,
            _ => Unit::MillionEuros,
        }
    }

    /// Reverse of [`Series::column`].
    pub fn from_column(name: &str) -> Option<Series> {
        Series::ALL.iter().copied().find(|s| s.column() == name)
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Series {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Series::from_column(s).ok_or_else(|| ValidationError::UnknownSeries(s.to_string()))
    }
}
