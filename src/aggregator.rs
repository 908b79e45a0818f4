//! Month-level aggregation over the activity ledger.

use crate::error::ForecastError;
use crate::ledger::{ActivityLedger, FieldLine};
use crate::month::Month;

pub struct MonthlyAggregator<'a> {
    ledger: &'a ActivityLedger,
}

impl<'a> MonthlyAggregator<'a> {
    pub fn new(ledger: &'a ActivityLedger) -> Self {
        Self { ledger }
    }

    pub fn get_executed_count_by_month(&self, month: Month, field_line: &str) -> Result<u32, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        Ok(line.final_executed(month).count() as u32)
    }

    pub fn get_scheduled_count_by_month(&self, month: Month, field_line: &str) -> Result<u32, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        Ok(line.validated_scheduled(month).count() as u32)
    }

    /// Real cost of the month's final executions; 0.0 when there are none.
    ///
    /// A final execution without a usable cost makes the month invalid
    /// rather than silently under-reporting it.
    pub fn get_total_real_cost_by_month(&self, month: Month, field_line: &str) -> Result<f64, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        real_cost(line, month)
    }

    /// Real cost accumulated from January through `month`.
    pub fn get_accumulated_cost_by_month(&self, month: Month, field_line: &str) -> Result<f64, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        month
            .through()
            .try_fold(0.0, |acc, m| -> Result<f64, ForecastError> {
                Ok(acc + real_cost(line, m)?)
            })
    }

    pub fn get_total_scheduled_executed_activities_cost_by_month(
        &self,
        month: Month,
        field_line: &str,
    ) -> Result<f64, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        line.validated_scheduled(month)
            .try_fold(0.0, |acc, a| match a.net_total_cost {
                Some(cost) if cost.is_finite() => Ok(acc + cost),
                _ => Err(ForecastError::InvalidData(format!(
                    "validated schedule of well '{}' in {} has no net total cost",
                    a.well, month
                ))),
            })
    }

    /// Carry-forward budget of the month.
    ///
    /// The approved annual budget is allocated by the planned distribution
    /// (evenly when nothing is planned). January receives its allocation; each
    /// later month receives its allocation plus what the previous month left
    /// unspent (previous budget minus previous real cost).
    ///
    /// A month whose real cost cannot be aggregated spends nothing, the same
    /// way it contributes nothing to a forecast run.
    pub fn get_budget_by_month(&self, field_line: &str, month: Month) -> Result<f64, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        let mut budget = 0.0;
        for m in month.through() {
            let carried = match m.previous() {
                Some(prev) => budget - spent(line, prev),
                None => 0.0,
            };
            budget = carried + allocation(line, m);
        }
        Ok(budget)
    }
}

fn spent(line: &FieldLine, month: Month) -> f64 {
    real_cost(line, month).unwrap_or_else(|e| {
        tracing::warn!(field_line = %line.name, %month, error = %e, "Failed month carries no spend");
        0.0
    })
}

fn real_cost(line: &FieldLine, month: Month) -> Result<f64, ForecastError> {
    line.final_executed(month)
        .try_fold(0.0, |acc, a| match a.real_cost {
            Some(cost) if cost.is_finite() => Ok(acc + cost),
            _ => Err(ForecastError::InvalidData(format!(
                "final execution of well '{}' in {} has no real cost",
                a.well, month
            ))),
        })
}

fn allocation(line: &FieldLine, month: Month) -> f64 {
    let approved = line.reference.approved_budget;
    let total_planned: f64 = line.planned.iter().map(|p| p.planned_count).sum();
    if total_planned > 0.0 {
        approved * line.planned_count(month) / total_planned
    } else {
        approved / Month::ALL.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::{executed, ledger_x, line_x};

    #[test]
    fn real_cost_counts_final_rows_only() {
        let ledger = ledger_x();
        let agg = MonthlyAggregator::new(&ledger);
        assert_eq!(agg.get_total_real_cost_by_month(Month::January, "X").expect("cost"), 120.0);
        assert_eq!(agg.get_executed_count_by_month(Month::January, "X").expect("count"), 2);
        assert_eq!(agg.get_total_real_cost_by_month(Month::May, "X").expect("cost"), 0.0);
    }

    #[test]
    fn accumulation_follows_calendar_order() {
        let mut line = line_x();
        // Source rows deliberately out of calendar order.
        line.executed.insert(0, executed("X", "W-7", Month::March, "final", 30.0));
        line.executed.push(executed("X", "W-8", Month::February, "final", 10.0));
        let ledger = ActivityLedger::from_lines(2024, [line]);
        let agg = MonthlyAggregator::new(&ledger);

        assert_eq!(agg.get_accumulated_cost_by_month(Month::January, "X").expect("acc"), 120.0);
        assert_eq!(agg.get_accumulated_cost_by_month(Month::February, "X").expect("acc"), 130.0);
        assert_eq!(agg.get_accumulated_cost_by_month(Month::March, "X").expect("acc"), 160.0);

        let mut previous = 0.0;
        for month in Month::ALL {
            let acc = agg.get_accumulated_cost_by_month(month, "X").expect("acc");
            assert!(acc >= previous);
            previous = acc;
        }
    }

    #[test]
    fn scheduled_cost_counts_validated_rows_only() {
        let ledger = ledger_x();
        let agg = MonthlyAggregator::new(&ledger);
        assert_eq!(
            agg.get_total_scheduled_executed_activities_cost_by_month(Month::February, "X")
                .expect("scheduled"),
            110.0
        );
        assert_eq!(agg.get_scheduled_count_by_month(Month::February, "X").expect("count"), 1);
    }

    #[test]
    fn budget_carries_unspent_amount_forward() {
        let ledger = ledger_x();
        let agg = MonthlyAggregator::new(&ledger);
        // 1000 approved, planned 3 / 2 => 600 / 400 allocation
        assert_eq!(agg.get_budget_by_month("X", Month::January).expect("budget"), 600.0);
        // 600 - 120 spent in January + 400
        assert_eq!(agg.get_budget_by_month("X", Month::February).expect("budget"), 880.0);
        // nothing allocated nor spent afterwards
        assert_eq!(agg.get_budget_by_month("X", Month::March).expect("budget"), 880.0);
    }

    #[test]
    fn budget_is_spread_evenly_without_a_plan() {
        let mut line = line_x();
        line.planned.clear();
        line.executed.clear();
        line.reference.approved_budget = 1200.0;
        let ledger = ActivityLedger::from_lines(2024, [line]);
        let agg = MonthlyAggregator::new(&ledger);
        assert_eq!(agg.get_budget_by_month("X", Month::January).expect("budget"), 100.0);
        assert_eq!(agg.get_budget_by_month("X", Month::December).expect("budget"), 1200.0);
    }

    #[test]
    fn failed_month_carries_budget_without_spend() {
        let mut line = line_x();
        line.executed[0].real_cost = None;
        let ledger = ActivityLedger::from_lines(2024, [line]);
        let agg = MonthlyAggregator::new(&ledger);
        // 600 allocated in January, nothing counted as spent, + 400
        assert_eq!(agg.get_budget_by_month("X", Month::February).expect("budget"), 1000.0);
    }

    #[test]
    fn final_row_without_cost_is_invalid() {
        let mut line = line_x();
        line.executed[0].real_cost = None;
        let ledger = ActivityLedger::from_lines(2024, [line]);
        let agg = MonthlyAggregator::new(&ledger);
        assert!(matches!(
            agg.get_total_real_cost_by_month(Month::January, "X"),
            Err(ForecastError::InvalidData(_))
        ));
        assert_eq!(agg.get_total_real_cost_by_month(Month::February, "X").expect("cost"), 0.0);
    }
}
