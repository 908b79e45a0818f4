//! Activity ledger: the per-line catalog of planned activities plus the raw
//! executed and scheduled activity records for one reporting year.
//!
//! The ledger is built once per reporting cycle and never mutated afterwards;
//! every query below is a read-only view.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::ForecastError;
use crate::frame::{
    float_cells, has_column, optional_float_cells, optional_string_cells, require_columns,
    string_cells,
};
use crate::month::Month;
use crate::schema::{executed, line, plan, scheduled};

/// Catalog row for one (field line, month, year).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedActivity {
    pub field_line: String,
    pub year: i32,
    pub month: Month,
    pub planned_count: f64,
    pub planned_cost: f64,
    pub planned_days: f64,
    /// Cost per activity expected.
    pub cpae: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutedActivity {
    pub well: String,
    pub field_line: String,
    pub month: Month,
    pub status: String,
    pub is_final: bool,
    pub real_cost: Option<f64>,
    pub real_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledActivity {
    pub well: String,
    pub field_line: String,
    pub month: Month,
    pub validation: String,
    pub is_validated: bool,
    pub net_total_cost: Option<f64>,
}

/// Budget figures and manually set targets of a line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineReference {
    pub approved_budget: f64,
    pub afe_budget: Option<f64>,
    pub target_cost: Option<f64>,
    pub target_days: Option<f64>,
}

/// Planned count of one month, as handed out by the distribution query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyPlan {
    pub month: Month,
    pub planned_count: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldLine {
    pub name: String,
    pub year: i32,
    pub planned: Vec<PlannedActivity>,
    pub executed: Vec<ExecutedActivity>,
    pub scheduled: Vec<ScheduledActivity>,
    pub reference: LineReference,
}

impl FieldLine {
    pub fn new(name: impl Into<String>, year: i32) -> Self {
        Self {
            name: name.into(),
            year,
            planned: Vec::new(),
            executed: Vec::new(),
            scheduled: Vec::new(),
            reference: LineReference::default(),
        }
    }

    /// Months present in the plan, in calendar order.
    pub fn months(&self) -> Vec<Month> {
        let mut months: Vec<Month> = self.planned.iter().map(|p| p.month).collect();
        months.sort();
        months.dedup();
        months
    }

    pub fn planned(&self, month: Month) -> Option<&PlannedActivity> {
        self.planned.iter().find(|p| p.month == month)
    }

    pub fn planned_count(&self, month: Month) -> f64 {
        self.planned(month).map_or(0.0, |p| p.planned_count)
    }

    pub fn final_executed(&self, month: Month) -> impl Iterator<Item = &ExecutedActivity> {
        self.executed
            .iter()
            .filter(move |a| a.month == month && a.is_final)
    }

    pub fn validated_scheduled(&self, month: Month) -> impl Iterator<Item = &ScheduledActivity> {
        self.scheduled
            .iter()
            .filter(move |a| a.month == month && a.is_validated)
    }

    /// Merge a catalog row, summing duplicates of the same month.
    fn add_planned(&mut self, row: PlannedActivity) {
        match self.planned.iter_mut().find(|p| p.month == row.month) {
            Some(existing) => {
                tracing::debug!(
                    field_line = %self.name,
                    month = %row.month,
                    "Duplicate plan row, summing"
                );
                existing.planned_count += row.planned_count;
                existing.planned_cost += row.planned_cost;
                existing.planned_days += row.planned_days;
                existing.cpae = row.cpae;
            }
            None => self.planned.push(row),
        }
    }
}

/// Input frames of one reporting cycle.
pub struct LedgerFrames<'a> {
    pub plan: &'a DataFrame,
    pub lines: &'a DataFrame,
    pub executed: &'a DataFrame,
    pub scheduled: &'a DataFrame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityLedger {
    year: i32,
    lines: BTreeMap<String, FieldLine>,
}

impl ActivityLedger {
    pub fn from_lines(year: i32, lines: impl IntoIterator<Item = FieldLine>) -> Self {
        let lines = lines.into_iter().map(|l| (l.name.clone(), l)).collect();
        Self { year, lines }
    }

    /// Build the ledger from tabulated report rows.
    ///
    /// Required columns:
    ///     plan:      field_line, year, month, planned_count
    ///     lines:     field_line, approved_budget
    ///     executed:  well, field_line, month (or date), status, real_cost
    ///     scheduled: well, field_line, month (or date), validation, net_total_cost
    /// Optional columns are read when present; any other column is ignored.
    /// Rows carrying a `year` different from `year` are dropped.
    pub fn from_frames(
        year: i32,
        frames: LedgerFrames<'_>,
        config: &EngineConfig,
    ) -> Result<Self, ForecastError> {
        let mut ledger = Self {
            year,
            lines: BTreeMap::new(),
        };

        ledger.ingest_plan(frames.plan)?;
        ledger.ingest_lines(frames.lines)?;
        ledger.ingest_executed(frames.executed, config)?;
        ledger.ingest_scheduled(frames.scheduled, config)?;

        for field_line in ledger.lines.values_mut() {
            field_line.planned.sort_by_key(|p| p.month);
        }

        tracing::info!(
            year,
            field_lines = ledger.lines.len(),
            executed_rows = ledger.lines.values().map(|l| l.executed.len()).sum::<usize>(),
            scheduled_rows = ledger.lines.values().map(|l| l.scheduled.len()).sum::<usize>(),
            "Activity ledger loaded"
        );
        Ok(ledger)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn field_lines(&self) -> impl Iterator<Item = &FieldLine> {
        self.lines.values()
    }

    pub fn field_line(&self, name: &str) -> Result<&FieldLine, ForecastError> {
        self.lines
            .get(name)
            .ok_or_else(|| ForecastError::DataNotFound(format!("field line '{name}'")))
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Planned activities of every month of the year in calendar order.
    /// Months without a catalog row report zero.
    pub fn get_distributed_initial_planned_activities(
        &self,
        field_line: &str,
    ) -> Result<Vec<MonthlyPlan>, ForecastError> {
        let line = self.field_line(field_line)?;
        Ok(Month::ALL
            .iter()
            .map(|&month| MonthlyPlan {
                month,
                planned_count: line.planned_count(month),
            })
            .collect())
    }

    /// Final executed activities of the month, in source order.
    pub fn get_executed_activities_and_cost_by_month(
        &self,
        month: Month,
        field_line: &str,
    ) -> Result<Vec<&ExecutedActivity>, ForecastError> {
        Ok(self.field_line(field_line)?.final_executed(month).collect())
    }

    /// Validated scheduled activities of the month, in source order.
    pub fn get_df_scheduled_executed_activities_validated(
        &self,
        month: Month,
        field_line: &str,
    ) -> Result<Vec<&ScheduledActivity>, ForecastError> {
        Ok(self
            .field_line(field_line)?
            .validated_scheduled(month)
            .collect())
    }

    // ── Ingestion ───────────────────────────────────────────────────────────

    fn line_mut(&mut self, name: &str) -> &mut FieldLine {
        let year = self.year;
        self.lines
            .entry(name.to_string())
            .or_insert_with(|| FieldLine::new(name, year))
    }

    /// Returns how many rows were skipped for lacking a field line, year or month.
    fn ingest_plan(&mut self, df: &DataFrame) -> Result<usize, ForecastError> {
        require_columns(
            df,
            &[plan::FIELD_LINE, plan::YEAR, plan::MONTH, plan::PLANNED_COUNT],
        )?;
        let names = string_cells(df, plan::FIELD_LINE)?;
        let years = float_cells(df, plan::YEAR)?;
        let months = string_cells(df, plan::MONTH)?;
        let counts = float_cells(df, plan::PLANNED_COUNT)?;
        let costs = optional_float_cells(df, plan::PLANNED_COST)?;
        let days = optional_float_cells(df, plan::PLANNED_DAYS)?;
        let cpae = optional_float_cells(df, plan::CPAE)?;

        let mut skipped = 0usize;
        for i in 0..df.height() {
            let Some(year) = years[i] else {
                skipped += 1;
                continue;
            };
            if year != f64::from(self.year) {
                continue;
            }
            let (Some(name), Some(month)) = (&names[i], parse_month(months[i].as_deref())) else {
                skipped += 1;
                continue;
            };
            let planned_count = counts[i].unwrap_or(0.0);
            if planned_count < 0.0 || !planned_count.is_finite() {
                return Err(ForecastError::InvalidData(format!(
                    "planned_count must be >= 0, got {planned_count} for '{name}' {month} (row {i})"
                )));
            }
            let row = PlannedActivity {
                field_line: name.clone(),
                year: self.year,
                month,
                planned_count,
                planned_cost: costs[i].unwrap_or(0.0),
                planned_days: days[i].unwrap_or(0.0),
                cpae: cpae[i].unwrap_or(0.0),
            };
            self.line_mut(name).add_planned(row);
        }
        warn_skipped("plan", skipped);
        Ok(skipped)
    }

    fn ingest_lines(&mut self, df: &DataFrame) -> Result<(), ForecastError> {
        require_columns(df, &[line::FIELD_LINE, line::APPROVED_BUDGET])?;
        let names = string_cells(df, line::FIELD_LINE)?;
        let years = optional_float_cells(df, line::YEAR)?;
        let budgets = float_cells(df, line::APPROVED_BUDGET)?;
        let afe = optional_float_cells(df, line::AFE_BUDGET)?;
        let target_cost = optional_float_cells(df, line::TARGET_COST)?;
        let target_days = optional_float_cells(df, line::TARGET_DAYS)?;
        let year_filter = has_column(df, line::YEAR);

        for i in 0..df.height() {
            if year_filter && years[i] != Some(f64::from(self.year)) {
                continue;
            }
            let Some(name) = &names[i] else {
                warn_skipped("lines", 1);
                continue;
            };
            self.line_mut(name).reference = LineReference {
                approved_budget: budgets[i].unwrap_or(0.0),
                afe_budget: afe[i],
                target_cost: target_cost[i],
                target_days: target_days[i],
            };
        }
        Ok(())
    }

    fn ingest_executed(&mut self, df: &DataFrame, config: &EngineConfig) -> Result<(), ForecastError> {
        require_columns(
            df,
            &[
                executed::WELL,
                executed::FIELD_LINE,
                executed::STATUS,
                executed::REAL_COST,
            ],
        )?;
        let wells = string_cells(df, executed::WELL)?;
        let names = string_cells(df, executed::FIELD_LINE)?;
        let months = month_cells(df, executed::MONTH, executed::DATE)?;
        let keep = year_mask(df, executed::YEAR, self.year)?;
        let statuses = optional_string_cells(df, executed::STATUS)?;
        let costs = float_cells(df, executed::REAL_COST)?;
        let days = optional_float_cells(df, executed::REAL_DAYS)?;

        let mut skipped = 0usize;
        for i in 0..df.height() {
            if !keep[i] {
                continue;
            }
            let (Some(name), Some(month)) = (&names[i], months[i]) else {
                skipped += 1;
                continue;
            };
            let status = statuses[i].clone().unwrap_or_default();
            let row = ExecutedActivity {
                well: wells[i].clone().unwrap_or_default(),
                field_line: name.clone(),
                month,
                is_final: config.is_final(&status),
                status,
                real_cost: costs[i],
                real_days: days[i],
            };
            self.line_mut(name).executed.push(row);
        }
        warn_skipped("executed", skipped);
        Ok(())
    }

    fn ingest_scheduled(&mut self, df: &DataFrame, config: &EngineConfig) -> Result<(), ForecastError> {
        require_columns(
            df,
            &[
                scheduled::WELL,
                scheduled::FIELD_LINE,
                scheduled::VALIDATION,
                scheduled::NET_TOTAL_COST,
            ],
        )?;
        let wells = string_cells(df, scheduled::WELL)?;
        let names = string_cells(df, scheduled::FIELD_LINE)?;
        let months = month_cells(df, scheduled::MONTH, scheduled::DATE)?;
        let keep = year_mask(df, scheduled::YEAR, self.year)?;
        let validations = optional_string_cells(df, scheduled::VALIDATION)?;
        let costs = float_cells(df, scheduled::NET_TOTAL_COST)?;

        let mut skipped = 0usize;
        for i in 0..df.height() {
            if !keep[i] {
                continue;
            }
            let (Some(name), Some(month)) = (&names[i], months[i]) else {
                skipped += 1;
                continue;
            };
            let validation = validations[i].clone().unwrap_or_default();
            let row = ScheduledActivity {
                well: wells[i].clone().unwrap_or_default(),
                field_line: name.clone(),
                month,
                is_validated: config.is_validated(&validation),
                validation,
                net_total_cost: costs[i],
            };
            self.line_mut(name).scheduled.push(row);
        }
        warn_skipped("scheduled", skipped);
        Ok(())
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

fn parse_month(raw: Option<&str>) -> Option<Month> {
    raw.and_then(|m| m.parse::<Month>().ok())
}

/// Month of each row from the month column, or from the date column when the
/// month column is absent or the cell is empty.
fn month_cells(
    df: &DataFrame,
    month_col: &str,
    date_col: &str,
) -> Result<Vec<Option<Month>>, ForecastError> {
    if !has_column(df, month_col) && !has_column(df, date_col) {
        return Err(ForecastError::MissingColumn(format!("{month_col} or {date_col}")));
    }
    let months = optional_string_cells(df, month_col)?;
    let dates = optional_string_cells(df, date_col)?;
    Ok(months
        .iter()
        .zip(dates.iter())
        .map(|(m, d)| {
            parse_month(m.as_deref()).or_else(|| d.as_deref().and_then(Month::from_date_str))
        })
        .collect())
}

/// Rows to keep: all of them when there is no year column, otherwise only
/// those of the ledger year.
fn year_mask(df: &DataFrame, year_col: &str, year: i32) -> Result<Vec<bool>, ForecastError> {
    if !has_column(df, year_col) {
        return Ok(vec![true; df.height()]);
    }
    Ok(float_cells(df, year_col)?
        .into_iter()
        .map(|y| y == Some(f64::from(year)))
        .collect())
}

fn warn_skipped(table: &str, skipped: usize) {
    if skipped > 0 {
        tracing::warn!(table, skipped, "Rows without field line, year or month were skipped");
    }
}

// ── Test fixtures ───────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn frames() -> (DataFrame, DataFrame, DataFrame, DataFrame) {
        let plan = df!(
            "field_line" => ["1.10 Services", "1.10 Services", "1.10 Services", "Artificial Lift"],
            "year" => ["2024", "2024", "2023", "2024"],
            "month" => ["Feb", "1", "Jan", "March"],
            "planned_count" => ["2", "3", "7", "1"],
            "planned_cost" => ["200", "300", "700", "50"],
            "rig" => ["R1", "R1", "R2", "R3"]
        )
        .expect("plan");
        let lines = df!(
            "field_line" => ["1.10 Services", "Artificial Lift"],
            "approved_budget" => [1000.0, 400.0],
            "target_cost" => [Some(80.0), None]
        )
        .expect("lines");
        let executed = df!(
            "well" => ["W-1", "W-2", "W-3", "W-9"],
            "field_line" => ["1.10 Services", "1.10 Services", "1.10 Services", ""],
            "date" => ["2024-01-10", "2024-01-12", "2024-01-20", "2024-01-21"],
            "status" => ["Final", "in-progress", "final", "final"],
            "real_cost" => ["50", "999", "70", "10"],
            "b_and_h" => ["1", "2", "3", "4"]
        )
        .expect("executed");
        let scheduled = df!(
            "well" => ["W-4", "W-5"],
            "field_line" => ["1.10 Services", "1.10 Services"],
            "month" => [2i32, 2],
            "year" => [2024i32, 2025],
            "validation" => ["validated", "validated"],
            "net_total_cost" => [110.0, 90.0]
        )
        .expect("scheduled");
        (plan, lines, executed, scheduled)
    }

    fn load() -> ActivityLedger {
        let (plan, lines, executed, scheduled) = frames();
        ActivityLedger::from_frames(
            2024,
            LedgerFrames {
                plan: &plan,
                lines: &lines,
                executed: &executed,
                scheduled: &scheduled,
            },
            &EngineConfig::default(),
        )
        .expect("ledger")
    }

    #[test]
    fn ingests_frames_ignoring_extra_columns_and_other_years() {
        let ledger = load();
        let services = ledger.field_line("1.10 Services").expect("line");

        assert_eq!(services.months(), vec![Month::January, Month::February]);
        assert_eq!(services.planned_count(Month::January), 3.0);
        assert_eq!(services.reference.approved_budget, 1000.0);
        assert_eq!(services.reference.target_cost, Some(80.0));
        assert_eq!(services.executed.len(), 3);
        assert_eq!(services.scheduled.len(), 1);

        let lift = ledger.field_line("Artificial Lift").expect("line");
        assert_eq!(lift.reference.target_cost, None);
        assert_eq!(ledger.field_lines().count(), 2);
    }

    #[test]
    fn distribution_is_calendar_ordered_with_zero_months() {
        let ledger = load();
        let plan = ledger
            .get_distributed_initial_planned_activities("1.10 Services")
            .expect("plan");

        assert_eq!(plan.len(), 12);
        assert_eq!(plan[0].month, Month::January);
        assert_eq!(plan[0].planned_count, 3.0);
        assert_eq!(plan[1].planned_count, 2.0);
        assert!(plan[2..].iter().all(|p| p.planned_count == 0.0));
    }

    #[test]
    fn unknown_line_is_data_not_found() {
        let ledger = load();
        assert!(matches!(
            ledger.get_distributed_initial_planned_activities("Nope"),
            Err(ForecastError::DataNotFound(_))
        ));
        assert!(matches!(
            ledger.get_executed_activities_and_cost_by_month(Month::January, "Nope"),
            Err(ForecastError::DataNotFound(_))
        ));
    }

    #[test]
    fn executed_view_keeps_final_rows_in_source_order() {
        let ledger = ledger_x();
        let wells: Vec<&str> = ledger
            .get_executed_activities_and_cost_by_month(Month::January, "X")
            .expect("executed")
            .iter()
            .map(|a| a.well.as_str())
            .collect();
        assert_eq!(wells, vec!["W-1", "W-3"]);

        let loaded = load();
        let wells: Vec<&str> = loaded
            .get_executed_activities_and_cost_by_month(Month::January, "1.10 Services")
            .expect("executed")
            .iter()
            .map(|a| a.well.as_str())
            .collect();
        assert_eq!(wells, vec!["W-1", "W-3"]);
    }

    #[test]
    fn scheduled_view_keeps_validated_rows() {
        let ledger = ledger_x();
        let rows = ledger
            .get_df_scheduled_executed_activities_validated(Month::February, "X")
            .expect("scheduled");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].well, "W-4");
        assert!(ledger
            .get_df_scheduled_executed_activities_validated(Month::March, "X")
            .expect("scheduled")
            .is_empty());
    }

    #[test]
    fn duplicate_plan_rows_are_summed() {
        let plan = df!(
            "field_line" => ["X", "X"],
            "year" => [2024i32, 2024],
            "month" => ["Jan", "January"],
            "planned_count" => [1.0, 2.0]
        )
        .expect("plan");
        let lines = df!("field_line" => ["X"], "approved_budget" => [10.0]).expect("lines");
        let executed = df!(
            "well" => ["W"], "field_line" => ["X"], "month" => ["Jan"],
            "status" => ["final"], "real_cost" => [1.0]
        )
        .expect("executed");
        let scheduled = df!(
            "well" => ["W"], "field_line" => ["X"], "month" => ["Jan"],
            "validation" => ["pending"], "net_total_cost" => [1.0]
        )
        .expect("scheduled");

        let ledger = ActivityLedger::from_frames(
            2024,
            LedgerFrames {
                plan: &plan,
                lines: &lines,
                executed: &executed,
                scheduled: &scheduled,
            },
            &EngineConfig::default(),
        )
        .expect("ledger");
        assert_eq!(
            ledger.field_line("X").expect("line").planned_count(Month::January),
            3.0
        );
    }

    #[test]
    fn plan_rows_without_year_are_skipped() {
        let plan = df!(
            "field_line" => ["X", "X", "X"],
            "year" => [Some(2024i32), None, Some(2023)],
            "month" => ["Jan", "Feb", "Mar"],
            "planned_count" => [1.0, 2.0, 4.0]
        )
        .expect("plan");
        let mut ledger = ActivityLedger::from_lines(2024, []);
        // other years are filtered out, not skipped
        assert_eq!(ledger.ingest_plan(&plan).expect("plan"), 1);

        let line = ledger.field_line("X").expect("line");
        assert_eq!(line.planned_count(Month::January), 1.0);
        assert_eq!(line.planned_count(Month::February), 0.0);
        assert_eq!(line.planned_count(Month::March), 0.0);
    }

    #[test]
    fn negative_planned_count_is_rejected() {
        let plan = df!(
            "field_line" => ["X"], "year" => [2024i32], "month" => ["Jan"], "planned_count" => [-1.0]
        )
        .expect("plan");
        let (_, lines, executed, scheduled) = frames();
        let result = ActivityLedger::from_frames(
            2024,
            LedgerFrames {
                plan: &plan,
                lines: &lines,
                executed: &executed,
                scheduled: &scheduled,
            },
            &EngineConfig::default(),
        );
        assert!(matches!(result, Err(ForecastError::InvalidData(_))));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let (plan, lines, _, scheduled) = frames();
        let executed = df!("well" => ["W"], "field_line" => ["X"], "month" => ["Jan"]).expect("executed");
        let result = ActivityLedger::from_frames(
            2024,
            LedgerFrames {
                plan: &plan,
                lines: &lines,
                executed: &executed,
                scheduled: &scheduled,
            },
            &EngineConfig::default(),
        );
        assert!(matches!(result, Err(ForecastError::MissingColumn(c)) if c == "status"));
    }
}
