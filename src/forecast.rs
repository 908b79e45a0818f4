//! Forecast engine.
//!
//! Each month of the year is either CLOSED (every planned activity has been
//! executed, so the forecast is the real cost) or OPEN (the real cost so far
//! plus the remaining planned activities priced at the resolved reference
//! cost). Months are evaluated January..December and accumulated into a
//! running cumulative forecast.
//!
//! The engine only reads the ledger. Independent requests can therefore be
//! evaluated in parallel against the same ledger; see [`ForecastEngine::run_batch`].

use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregator::MonthlyAggregator;
use crate::error::ForecastError;
use crate::ledger::{ActivityLedger, FieldLine};
use crate::month::Month;
use crate::reference::{ReferencePath, ReferenceResolver, TargetOverride};
use crate::schema::forecast as cols;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthState {
    Closed,
    Open,
}

impl MonthState {
    pub fn as_str(self) -> &'static str {
        match self {
            MonthState::Closed => "closed",
            MonthState::Open => "open",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyForecastRow {
    pub month: Month,
    pub state: MonthState,
    pub planned_activities: f64,
    pub executed_activities: u32,
    pub scheduled_activities: u32,
    pub remaining_activities: f64,
    pub real_cost: f64,
    pub scheduled_cost: f64,
    pub forecast_cost: f64,
    pub cumulative_forecast: f64,
    pub projected_days: f64,
    pub budget: f64,
    pub budget_deviation: f64,
    pub afe_baseline: f64,
    pub afe_deviation: f64,
    /// Set when a figure of the month could not be aggregated. A real-cost
    /// failure zeroes the month's forecast; a scheduled-cost failure only
    /// zeroes `scheduled_cost`.
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub planned_total: f64,
    pub executed_total: u32,
    pub scheduled_total: u32,
    pub approved_budget: f64,
    pub afe_budget: Option<f64>,
    pub real_cost: f64,
    pub forecast_cost: f64,
    pub remaining_budget: f64,
    pub failed_months: Vec<Month>,
}

/// Result of one forecast request, annotated with the reference values used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRun {
    pub field_line: String,
    pub year: i32,
    pub reference: ReferencePath,
    pub rows: Vec<MonthlyForecastRow>,
    pub summary: BudgetSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub field_line: String,
    pub cost_path: String,
    pub day_path: String,
}

impl ForecastRequest {
    pub fn new(
        field_line: impl Into<String>,
        cost_path: impl Into<String>,
        day_path: impl Into<String>,
    ) -> Self {
        Self {
            field_line: field_line.into(),
            cost_path: cost_path.into(),
            day_path: day_path.into(),
        }
    }
}

/// Month figures that depend only on the ledger and the resolved path.
struct MonthFigures {
    state: MonthState,
    planned: f64,
    executed: u32,
    scheduled: u32,
    remaining: f64,
    real_cost: f64,
    scheduled_cost: f64,
    scheduled_failure: Option<String>,
    forecast_cost: f64,
    projected_days: f64,
}

pub struct ForecastEngine<'a> {
    ledger: &'a ActivityLedger,
    targets: TargetOverride,
}

impl<'a> ForecastEngine<'a> {
    pub fn new(ledger: &'a ActivityLedger) -> Self {
        Self {
            ledger,
            targets: TargetOverride::default(),
        }
    }

    /// Use target values from the path-selection record instead of the
    /// line's own targets.
    pub fn with_targets(mut self, targets: TargetOverride) -> Self {
        self.targets = targets;
        self
    }

    pub fn resolver(&self) -> ReferenceResolver<'a> {
        ReferenceResolver::new(self.ledger).with_targets(self.targets)
    }

    pub fn aggregator(&self) -> MonthlyAggregator<'a> {
        MonthlyAggregator::new(self.ledger)
    }

    pub fn month_state(&self, month: Month, field_line: &str) -> Result<MonthState, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        let executed = line.final_executed(month).count() as u32;
        Ok(state_of(line.planned_count(month), executed))
    }

    /// Forecast cost of a single month for the given path pair.
    pub fn get_projected_adjusted_by_month(
        &self,
        month: Month,
        field_line: &str,
        cost_path_id: &str,
        day_path_id: &str,
    ) -> Result<f64, ForecastError> {
        let reference = self.resolver().resolve(field_line, cost_path_id, day_path_id)?;
        Ok(self.month_figures(month, field_line, &reference)?.forecast_cost)
    }

    /// Carry-forward budget of the month minus its forecast cost.
    pub fn budget_deviation(
        &self,
        month: Month,
        field_line: &str,
        cost_path_id: &str,
        day_path_id: &str,
    ) -> Result<f64, ForecastError> {
        let budget = self.aggregator().get_budget_by_month(field_line, month)?;
        let forecast = self.get_projected_adjusted_by_month(month, field_line, cost_path_id, day_path_id)?;
        Ok(budget - forecast)
    }

    /// AFE baseline of the month (planned activities × CPAE) minus its forecast cost.
    pub fn afe_deviation(
        &self,
        month: Month,
        field_line: &str,
        cost_path_id: &str,
        day_path_id: &str,
    ) -> Result<f64, ForecastError> {
        let baseline = self.afe_baseline(month, field_line)?;
        let forecast = self.get_projected_adjusted_by_month(month, field_line, cost_path_id, day_path_id)?;
        Ok(baseline - forecast)
    }

    /// Full-year forecast of a field line.
    ///
    /// Resolver failures (unknown path, zero denominator) fail the request. A
    /// month whose figures cannot be aggregated is flagged in its row and the
    /// run goes on.
    pub fn generate_forecast_by_path(
        &self,
        field_line: &str,
        cost_path_id: &str,
        day_path_id: &str,
    ) -> Result<ForecastRun, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        let reference = self.resolver().resolve(field_line, cost_path_id, day_path_id)?;
        let aggregator = self.aggregator();

        let mut rows: Vec<MonthlyForecastRow> = Vec::with_capacity(Month::ALL.len());
        let mut cumulative = 0.0;

        for month in Month::ALL {
            let budget = aggregator.get_budget_by_month(field_line, month)?;
            let afe_baseline = self.afe_baseline(month, field_line)?;

            let row = match self.month_figures(month, field_line, &reference) {
                Ok(f) => {
                    cumulative += f.forecast_cost;
                    tracing::debug!(
                        field_line,
                        %month,
                        state = f.state.as_str(),
                        forecast = f.forecast_cost,
                        "Projected month"
                    );
                    MonthlyForecastRow {
                        month,
                        state: f.state,
                        planned_activities: f.planned,
                        executed_activities: f.executed,
                        scheduled_activities: f.scheduled,
                        remaining_activities: f.remaining,
                        real_cost: f.real_cost,
                        scheduled_cost: f.scheduled_cost,
                        forecast_cost: f.forecast_cost,
                        cumulative_forecast: cumulative,
                        projected_days: f.projected_days,
                        budget,
                        budget_deviation: budget - f.forecast_cost,
                        afe_baseline,
                        afe_deviation: afe_baseline - f.forecast_cost,
                        failure: f.scheduled_failure,
                    }
                }
                Err(e) => {
                    tracing::warn!(field_line, %month, error = %e, "Month could not be aggregated");
                    failed_row(line, month, cumulative, budget, afe_baseline, e.to_string())
                }
            };
            rows.push(row);
        }

        let summary = summarize(line, &rows);
        tracing::info!(
            field_line,
            cost_path = %reference.cost_path,
            day_path = %reference.day_path,
            forecast_cost = summary.forecast_cost,
            failed_months = summary.failed_months.len(),
            "Forecast generated"
        );

        Ok(ForecastRun {
            field_line: line.name.clone(),
            year: line.year,
            reference,
            rows,
            summary,
        })
    }

    pub fn run(&self, request: &ForecastRequest) -> Result<ForecastRun, ForecastError> {
        self.generate_forecast_by_path(&request.field_line, &request.cost_path, &request.day_path)
    }

    /// Evaluate independent requests in parallel. Results keep request order;
    /// one failing request does not affect the others.
    pub fn run_batch(&self, requests: &[ForecastRequest]) -> Vec<Result<ForecastRun, ForecastError>> {
        requests.par_iter().map(|r| self.run(r)).collect()
    }

    /// The same path pair for every field line of the ledger.
    pub fn run_all_lines(
        &self,
        cost_path_id: &str,
        day_path_id: &str,
    ) -> Vec<Result<ForecastRun, ForecastError>> {
        let requests: Vec<ForecastRequest> = self
            .ledger
            .field_lines()
            .map(|l| ForecastRequest::new(l.name.clone(), cost_path_id, day_path_id))
            .collect();
        self.run_batch(&requests)
    }

    // ── Private helpers ─────────────────────────────────────────────────────

    fn afe_baseline(&self, month: Month, field_line: &str) -> Result<f64, ForecastError> {
        let line = self.ledger.field_line(field_line)?;
        let cpae = self.resolver().get_cpae_by_month(field_line, month)?;
        Ok(line.planned_count(month) * cpae)
    }

    fn month_figures(
        &self,
        month: Month,
        field_line: &str,
        reference: &ReferencePath,
    ) -> Result<MonthFigures, ForecastError> {
        let aggregator = self.aggregator();
        let line = self.ledger.field_line(field_line)?;

        let planned = line.planned_count(month);
        let executed = aggregator.get_executed_count_by_month(month, field_line)?;
        let scheduled = aggregator.get_scheduled_count_by_month(month, field_line)?;
        let real_cost = aggregator.get_total_real_cost_by_month(month, field_line)?;
        let (scheduled_cost, scheduled_failure) = match aggregator
            .get_total_scheduled_executed_activities_cost_by_month(month, field_line)
        {
            Ok(cost) => (cost, None),
            Err(e) => {
                tracing::warn!(field_line, %month, error = %e, "Scheduled cost could not be aggregated");
                (0.0, Some(e.to_string()))
            }
        };

        let state = state_of(planned, executed);
        let remaining = match state {
            MonthState::Closed => 0.0,
            MonthState::Open => (planned - f64::from(executed)).max(0.0),
        };

        Ok(MonthFigures {
            state,
            planned,
            executed,
            scheduled,
            remaining,
            real_cost,
            scheduled_cost,
            scheduled_failure,
            forecast_cost: real_cost + remaining * reference.cost_value,
            projected_days: remaining * reference.day_value,
        })
    }
}

fn state_of(planned: f64, executed: u32) -> MonthState {
    if f64::from(executed) >= planned {
        MonthState::Closed
    } else {
        MonthState::Open
    }
}

fn failed_row(
    line: &FieldLine,
    month: Month,
    cumulative: f64,
    budget: f64,
    afe_baseline: f64,
    failure: String,
) -> MonthlyForecastRow {
    let planned = line.planned_count(month);
    let executed = line.final_executed(month).count() as u32;
    MonthlyForecastRow {
        month,
        state: state_of(planned, executed),
        planned_activities: planned,
        executed_activities: executed,
        scheduled_activities: line.validated_scheduled(month).count() as u32,
        remaining_activities: 0.0,
        real_cost: 0.0,
        scheduled_cost: 0.0,
        forecast_cost: 0.0,
        cumulative_forecast: cumulative,
        projected_days: 0.0,
        budget,
        budget_deviation: budget,
        afe_baseline,
        afe_deviation: afe_baseline,
        failure: Some(failure),
    }
}

fn summarize(line: &FieldLine, rows: &[MonthlyForecastRow]) -> BudgetSummary {
    let approved_budget = line.reference.approved_budget;
    let forecast_cost = rows.last().map_or(0.0, |r| r.cumulative_forecast);
    BudgetSummary {
        planned_total: rows.iter().map(|r| r.planned_activities).sum(),
        executed_total: rows.iter().map(|r| r.executed_activities).sum(),
        scheduled_total: rows.iter().map(|r| r.scheduled_activities).sum(),
        approved_budget,
        afe_budget: line.reference.afe_budget,
        real_cost: rows.iter().map(|r| r.real_cost).sum(),
        forecast_cost,
        remaining_budget: approved_budget - forecast_cost,
        failed_months: rows
            .iter()
            .filter(|r| r.failure.is_some())
            .map(|r| r.month)
            .collect(),
    }
}

// ── Output ──────────────────────────────────────────────────────────────────

impl ForecastRun {
    pub fn to_json(&self) -> Result<String, ForecastError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Monthly rows as a DataFrame, one row per calendar month.
    pub fn to_frame(&self) -> Result<DataFrame, ForecastError> {
        fn floats(rows: &[MonthlyForecastRow], f: impl Fn(&MonthlyForecastRow) -> f64) -> Vec<f64> {
            rows.iter().map(f).collect()
        }
        let rows = &self.rows;

        let columns: Vec<Column> = vec![
            Column::new(
                cols::MONTH.into(),
                rows.iter().map(|r| r.month.to_string()).collect::<Vec<_>>(),
            ),
            Column::new(
                cols::STATE.into(),
                rows.iter().map(|r| r.state.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(cols::PLANNED_ACTIVITIES.into(), floats(rows, |r| r.planned_activities)),
            Column::new(
                cols::EXECUTED_ACTIVITIES.into(),
                rows.iter().map(|r| r.executed_activities).collect::<Vec<_>>(),
            ),
            Column::new(
                cols::SCHEDULED_ACTIVITIES.into(),
                rows.iter().map(|r| r.scheduled_activities).collect::<Vec<_>>(),
            ),
            Column::new(cols::REMAINING_ACTIVITIES.into(), floats(rows, |r| r.remaining_activities)),
            Column::new(cols::REAL_COST.into(), floats(rows, |r| r.real_cost)),
            Column::new(cols::SCHEDULED_COST.into(), floats(rows, |r| r.scheduled_cost)),
            Column::new(cols::FORECAST_COST.into(), floats(rows, |r| r.forecast_cost)),
            Column::new(cols::CUMULATIVE_FORECAST.into(), floats(rows, |r| r.cumulative_forecast)),
            Column::new(cols::PROJECTED_DAYS.into(), floats(rows, |r| r.projected_days)),
            Column::new(cols::BUDGET.into(), floats(rows, |r| r.budget)),
            Column::new(cols::BUDGET_DEVIATION.into(), floats(rows, |r| r.budget_deviation)),
            Column::new(cols::AFE_BASELINE.into(), floats(rows, |r| r.afe_baseline)),
            Column::new(cols::AFE_DEVIATION.into(), floats(rows, |r| r.afe_deviation)),
            Column::new(
                cols::FAILURE.into(),
                rows.iter().map(|r| r.failure.clone()).collect::<Vec<_>>(),
            ),
        ];

        Ok(DataFrame::new(columns)?)
    }
}
