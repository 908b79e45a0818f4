//! Reference values that drive the projection of remaining activities.
//!
//! Three sources exist per field line: the manually set target, the catalog
//! average, and the total calculated from what has been executed so far.
//! One source is chosen per axis (cost, days).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::ledger::{ActivityLedger, FieldLine};
use crate::month::Month;
use crate::schema::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathSource {
    Target,
    Average,
    Total,
}

impl PathSource {
    /// Row order of the path-selection record.
    pub const ALL: [PathSource; 3] = [PathSource::Target, PathSource::Average, PathSource::Total];

    pub fn as_str(self) -> &'static str {
        match self {
            PathSource::Target => path::TARGET,
            PathSource::Average => path::AVERAGE,
            PathSource::Total => path::TOTAL,
        }
    }
}

impl FromStr for PathSource {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            path::TARGET => Ok(PathSource::Target),
            path::AVERAGE => Ok(PathSource::Average),
            path::TOTAL => Ok(PathSource::Total),
            _ => Err(ForecastError::InvalidPath(format!(
                "'{s}'. Must be one of {:?}",
                path::ALL
            ))),
        }
    }
}

impl fmt::Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved driver values for one forecast run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferencePath {
    pub cost_path: PathSource,
    pub day_path: PathSource,
    pub cost_value: f64,
    pub day_value: f64,
}

/// Target values typed into the path-selection record; they take precedence
/// over the line's own targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TargetOverride {
    pub cost: Option<f64>,
    pub days: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Cost,
    Days,
}

impl Axis {
    fn label(self) -> &'static str {
        match self {
            Axis::Cost => "cost",
            Axis::Days => "days",
        }
    }
}

pub struct ReferenceResolver<'a> {
    ledger: &'a ActivityLedger,
    targets: TargetOverride,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(ledger: &'a ActivityLedger) -> Self {
        Self {
            ledger,
            targets: TargetOverride::default(),
        }
    }

    pub fn with_targets(mut self, targets: TargetOverride) -> Self {
        self.targets = targets;
        self
    }

    /// Average unit cost of the line's catalog for `year`:
    /// total catalog cost / total catalog activity count.
    pub fn get_afe_cost_avr(&self, field_line: &str, year: i32) -> Result<f64, ForecastError> {
        let line = self.year_line(field_line, year)?;
        let (cost, count) = line
            .planned
            .iter()
            .fold((0.0, 0.0), |(c, n), p| (c + p.planned_cost, n + p.planned_count));
        divide(cost, count, || {
            format!("'{field_line}' {year} has no catalog activities to average cost over")
        })
    }

    /// Catalog cost-per-activity-expected of the month, verbatim.
    pub fn get_cpae_by_month(&self, field_line: &str, month: Month) -> Result<f64, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        Ok(line.planned(month).map_or(0.0, |p| p.cpae))
    }

    /// Resolve the (cost, days) pair from path ids such as "target" or "average".
    pub fn resolve(
        &self,
        field_line: &str,
        cost_path_id: &str,
        day_path_id: &str,
    ) -> Result<ReferencePath, ForecastError> {
        let cost_path: PathSource = cost_path_id.parse()?;
        let day_path: PathSource = day_path_id.parse()?;
        self.resolve_sources(field_line, cost_path, day_path)
    }

    pub fn resolve_sources(
        &self,
        field_line: &str,
        cost_path: PathSource,
        day_path: PathSource,
    ) -> Result<ReferencePath, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        let cost_value = self.value(line, cost_path, Axis::Cost)?;
        let day_value = self.value(line, day_path, Axis::Days)?;
        tracing::debug!(
            field_line,
            %cost_path,
            %day_path,
            cost_value,
            day_value,
            "Resolved reference path"
        );
        Ok(ReferencePath {
            cost_path,
            day_path,
            cost_value,
            day_value,
        })
    }

    fn value(&self, line: &FieldLine, source: PathSource, axis: Axis) -> Result<f64, ForecastError> {
        match source {
            PathSource::Target => {
                let (overridden, own) = match axis {
                    Axis::Cost => (self.targets.cost, line.reference.target_cost),
                    Axis::Days => (self.targets.days, line.reference.target_days),
                };
                overridden.or(own).ok_or_else(|| {
                    ForecastError::DataNotFound(format!(
                        "target {} for field line '{}'",
                        axis.label(),
                        line.name
                    ))
                })
            }
            PathSource::Average => {
                let (numerator, count) = line.planned.iter().fold((0.0, 0.0), |(v, n), p| {
                    let value = match axis {
                        Axis::Cost => p.planned_cost,
                        Axis::Days => p.planned_days,
                    };
                    (v + value, n + p.planned_count)
                });
                divide(numerator, count, || {
                    format!(
                        "average {} of '{}': catalog activity count is zero",
                        axis.label(),
                        line.name
                    )
                })
            }
            PathSource::Total => {
                let (numerator, count) = line
                    .executed
                    .iter()
                    .filter(|a| a.is_final)
                    .try_fold((0.0, 0.0), |(v, n), a| {
                        let value = match axis {
                            Axis::Cost => a.real_cost,
                            Axis::Days => a.real_days,
                        };
                        match value {
                            Some(value) if value.is_finite() => Ok((v + value, n + 1.0)),
                            _ => Err(ForecastError::InvalidData(format!(
                                "final execution of well '{}' on '{}' has no real {}",
                                a.well,
                                line.name,
                                axis.label()
                            ))),
                        }
                    })?;
                divide(numerator, count, || {
                    format!(
                        "total {} of '{}': no final executed activities",
                        axis.label(),
                        line.name
                    )
                })
            }
        }
    }

    fn year_line(&self, field_line: &str, year: i32) -> Result<&'a FieldLine, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        if line.year != year {
            return Err(ForecastError::DataNotFound(format!(
                "field line '{field_line}' for year {year}"
            )));
        }
        Ok(line)
    }
}

fn divide(numerator: f64, denominator: f64, context: impl FnOnce() -> String) -> Result<f64, ForecastError> {
    if denominator == 0.0 {
        return Err(ForecastError::DivisionByZero(context()));
    }
    Ok(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::{ledger_x, line_x};

    #[test]
    fn average_cost_divides_catalog_cost_by_activity_count() {
        let ledger = ledger_x();
        let resolver = ReferenceResolver::new(&ledger);
        // 500 of catalog cost over 3 + 2 activities
        assert_eq!(resolver.get_afe_cost_avr("X", 2024).expect("avg"), 100.0);
    }

    #[test]
    fn zero_activity_count_is_division_by_zero() {
        let mut line = line_x();
        for p in &mut line.planned {
            p.planned_count = 0.0;
        }
        line.executed.clear();
        let ledger = ActivityLedger::from_lines(2024, [line]);
        let resolver = ReferenceResolver::new(&ledger);

        let avr = resolver.get_afe_cost_avr("X", 2024);
        assert!(matches!(avr, Err(ForecastError::DivisionByZero(_))));

        let resolved = resolver.resolve("X", "average", "target");
        assert!(matches!(resolved, Err(ForecastError::DivisionByZero(_))));

        let resolved = resolver.resolve("X", "target", "total");
        assert!(matches!(resolved, Err(ForecastError::DivisionByZero(_))));
    }

    #[test]
    fn cpae_is_a_lookup() {
        let ledger = ledger_x();
        let resolver = ReferenceResolver::new(&ledger);
        assert_eq!(resolver.get_cpae_by_month("X", Month::January).expect("cpae"), 100.0);
        assert_eq!(resolver.get_cpae_by_month("X", Month::June).expect("cpae"), 0.0);
    }

    #[test]
    fn resolves_each_source() {
        let ledger = ledger_x();
        let resolver = ReferenceResolver::new(&ledger);

        let target = resolver.resolve("X", "target", "TARGET").expect("target");
        assert_eq!((target.cost_value, target.day_value), (80.0, 3.0));

        let average = resolver.resolve("X", "average", "average").expect("average");
        assert_eq!((average.cost_value, average.day_value), (100.0, 4.0));

        // final executions: 50 and 70, 5 days each
        let total = resolver.resolve("X", "total", "total").expect("total");
        assert_eq!((total.cost_value, total.day_value), (60.0, 5.0));
    }

    #[test]
    fn total_path_rejects_final_rows_without_values() {
        let mut line = line_x();
        for activity in &mut line.executed {
            activity.real_days = None;
        }
        let ledger = ActivityLedger::from_lines(2024, [line]);
        let resolver = ReferenceResolver::new(&ledger);

        assert!(matches!(
            resolver.resolve("X", "total", "total"),
            Err(ForecastError::InvalidData(_))
        ));
        // the cost axis alone is still complete
        let mixed = resolver.resolve("X", "total", "target").expect("mixed");
        assert_eq!(mixed.cost_value, 60.0);
    }

    #[test]
    fn override_takes_precedence_over_line_targets() {
        let ledger = ledger_x();
        let resolver = ReferenceResolver::new(&ledger).with_targets(TargetOverride {
            cost: Some(120.0),
            days: None,
        });
        let target = resolver.resolve("X", "target", "target").expect("target");
        assert_eq!((target.cost_value, target.day_value), (120.0, 3.0));
    }

    #[test]
    fn unknown_path_id_is_invalid_path() {
        let ledger = ledger_x();
        let resolver = ReferenceResolver::new(&ledger);
        assert!(matches!(
            resolver.resolve("X", "median", "average"),
            Err(ForecastError::InvalidPath(_))
        ));
        assert!(matches!(
            resolver.resolve("Y", "average", "average"),
            Err(ForecastError::DataNotFound(_))
        ));
    }
}
