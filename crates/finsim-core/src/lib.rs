#![deny(warnings)]

//! Core data model for finsim.
//!
//! Defines the series catalogue, year predicates and schedules used by the
//! generator rules, and the year-keyed [`Dataset`] table shared by export
//! and reporting.

mod series;

pub use series::{Series, Unit};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Earliest supported year.
pub const MIN_YEAR: i32 = 1970;
/// Latest supported year.
pub const MAX_YEAR: i32 = 2100;

/// Validation errors for the data model.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Year outside supported range [1970, 2100].
    #[error("year {0} is out of supported range [1970, 2100]")]
    YearOutOfRange(i32),
    /// Start year after end year.
    #[error("empty year range {start}..={end}")]
    EmptyRange { start: i32, end: i32 },
    /// Numeric field must be finite.
    #[error("non-finite value in {0}")]
    NonFinite(String),
    /// Noise standard deviation must be >= 0.
    #[error("negative noise deviation for {0}")]
    NegativeNoise(Series),
    /// Column length differs from the number of years.
    #[error("series {series} has {actual} values, expected {expected}")]
    LengthMismatch {
        series: Series,
        expected: usize,
        actual: usize,
    },
    /// Column name not in the catalogue.
    #[error("unknown series: {0}")]
    UnknownSeries(String),
    /// Same series defined twice.
    #[error("duplicate series: {0}")]
    DuplicateSeries(Series),
    /// Series required but absent.
    #[error("missing series: {0}")]
    MissingSeries(Series),
    /// Year keys must be strictly increasing.
    #[error("year {next} follows {prev}; years must be strictly increasing")]
    UnorderedYears { prev: i32, next: i32 },
}

/// Validate an inclusive year range.
pub fn validate_year_range(start: i32, end: i32) -> Result<(), ValidationError> {
    for y in [start, end] {
        if !(MIN_YEAR..=MAX_YEAR).contains(&y) {
            return Err(ValidationError::YearOutOfRange(y));
        }
    }
    if start > end {
        return Err(ValidationError::EmptyRange { start, end });
    }
    Ok(())
}

/// Validate a list of year keys: each in range, strictly increasing.
pub fn validate_years(years: &[i32]) -> Result<(), ValidationError> {
    for y in years {
        if !(MIN_YEAR..=MAX_YEAR).contains(y) {
            return Err(ValidationError::YearOutOfRange(*y));
        }
    }
    if let Some(w) = years.windows(2).find(|w| w[0] >= w[1]) {
        return Err(ValidationError::UnorderedYears {
            prev: w[0],
            next: w[1],
        });
    }
    Ok(())
}

/// Predicate over calendar years.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YearMatch {
    /// `from..=to`.
    Between { from: i32, to: i32 },
    /// Every year up to and including `to`.
    Until { to: i32 },
    /// Every year from `from` on.
    Since { from: i32 },
    /// An explicit set of years.
    OneOf { years: Vec<i32> },
    Always,
}

impl YearMatch {
    pub fn year(year: i32) -> Self {
        YearMatch::OneOf { years: vec![year] }
    }

    pub fn between(from: i32, to: i32) -> Self {
        YearMatch::Between { from, to }
    }

    pub fn one_of(years: &[i32]) -> Self {
        YearMatch::OneOf {
            years: years.to_vec(),
        }
    }

    pub fn matches(&self, year: i32) -> bool {
        match self {
            YearMatch::Between { from, to } => (*from..=*to).contains(&year),
            YearMatch::Until { to } => year <= *to,
            YearMatch::Since { from } => year >= *from,
            YearMatch::OneOf { years } => years.contains(&year),
            YearMatch::Always => true,
        }
    }
}

/// One `(when, value)` entry of a [`Schedule`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRule {
    pub when: YearMatch,
    pub value: f64,
}

/// Piecewise value over years: the first matching rule wins, otherwise
/// `default` applies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ScheduleRule>,
    pub default: f64,
}

impl Schedule {
    pub fn constant(value: f64) -> Self {
        Self {
            rules: Vec::new(),
            default: value,
        }
    }

    /// Append a rule; earlier rules take precedence.
    pub fn when(mut self, when: YearMatch, value: f64) -> Self {
        self.rules.push(ScheduleRule { when, value });
        self
    }

    /// Value in effect for `year`.
    pub fn at(&self, year: i32) -> f64 {
        self.rules
            .iter()
            .find(|r| r.when.matches(year))
            .map(|r| r.value)
            .unwrap_or(self.default)
    }

    /// Every value the schedule can produce.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rules
            .iter()
            .map(|r| r.value)
            .chain(std::iter::once(self.default))
    }

    pub fn is_finite(&self) -> bool {
        self.values().all(f64::is_finite)
    }
}

/// Annual table keyed by year with one `f64` column per [`Series`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    years: Vec<i32>,
    columns: BTreeMap<Series, Vec<f64>>,
}

impl Dataset {
    /// Empty table over the given years.
    pub fn new(years: Vec<i32>) -> Self {
        Self {
            years,
            columns: BTreeMap::new(),
        }
    }

    /// Empty table over `years` after checking them with [`validate_years`].
    pub fn try_new(years: Vec<i32>) -> Result<Self, ValidationError> {
        validate_years(&years)?;
        Ok(Self::new(years))
    }

    /// Empty table over `start..=end` after validating the range.
    pub fn for_range(start: i32, end: i32) -> Result<Self, ValidationError> {
        validate_year_range(start, end)?;
        Ok(Self::new((start..=end).collect()))
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Insert or replace a column. Its length must match the year count.
    pub fn insert(&mut self, series: Series, values: Vec<f64>) -> Result<(), ValidationError> {
        if values.len() != self.years.len() {
            return Err(ValidationError::LengthMismatch {
                series,
                expected: self.years.len(),
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::NonFinite(series.to_string()));
        }
        if self.columns.insert(series, values).is_some() {
            debug!(%series, "replaced existing column");
        }
        Ok(())
    }

    pub fn series(&self, series: Series) -> Option<&[f64]> {
        self.columns.get(&series).map(Vec::as_slice)
    }

    /// Like [`Dataset::series`] but absence is an error.
    pub fn require(&self, series: Series) -> Result<&[f64], ValidationError> {
        self.series(series).ok_or(ValidationError::MissingSeries(series))
    }

    /// Present columns in export order.
    pub fn columns(&self) -> impl Iterator<Item = (Series, &[f64])> + '_ {
        self.columns.iter().map(|(s, v)| (*s, v.as_slice()))
    }

    /// True when every catalogued series is present.
    pub fn is_complete(&self) -> bool {
        Series::ALL.iter().all(|s| self.columns.contains_key(s))
    }

    pub fn position(&self, year: i32) -> Option<usize> {
        self.years.iter().position(|y| *y == year)
    }

    pub fn value(&self, year: i32, series: Series) -> Option<f64> {
        let idx = self.position(year)?;
        self.columns.get(&series).map(|v| v[idx])
    }

    /// Multiply one cell by `factor`. Returns false when the year or the
    /// series is absent.
    pub fn scale(&mut self, year: i32, series: Series, factor: f64) -> bool {
        let Some(idx) = self.position(year) else {
            return false;
        };
        match self.columns.get_mut(&series) {
            Some(col) => {
                col[idx] *= factor;
                true
            }
            None => false,
        }
    }

    pub fn first(&self, series: Series) -> Option<f64> {
        self.series(series).and_then(|v| v.first().copied())
    }

    pub fn last(&self, series: Series) -> Option<f64> {
        self.series(series).and_then(|v| v.last().copied())
    }

    /// Arithmetic mean of a column; `None` when absent or empty.
    pub fn mean(&self, series: Series) -> Option<f64> {
        let v = self.series(series)?;
        if v.is_empty() {
            return None;
        }
        Some(v.iter().sum::<f64>() / v.len() as f64)
    }
}
