//! Python surface used by the desktop presentation layer.
//!
//! One explicit class, `ForecastModel`, exposes every engine operation so
//! callers never need to probe for method names.

use std::collections::HashMap;
use std::path::PathBuf;

use polars::prelude::*;
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::EngineConfig;
use crate::error::ForecastError;
use crate::forecast::{ForecastEngine, ForecastRequest, ForecastRun};
use crate::frame::read_csv_as_strings;
use crate::ledger::{ActivityLedger, LedgerFrames};
use crate::month::Month;
use crate::reference::PathSource;
use crate::schema::{executed, plan, scheduled};
use crate::selection::PathSelection;

#[pyclass]
pub struct ForecastModel {
    base_path: PathBuf,
    config: EngineConfig,
    plan: Option<DataFrame>,
    lines: Option<DataFrame>,
    executed: Option<DataFrame>,
    scheduled: Option<DataFrame>,
    ledger: Option<ActivityLedger>,
    selection: PathSelection,
}

#[pymethods]
impl ForecastModel {
    #[new]
    #[pyo3(signature = (base_path, config_file=None))]
    fn new(base_path: String, config_file: Option<&str>) -> PyResult<Self> {
        let base_path = PathBuf::from(base_path);
        let config = match config_file {
            Some(name) => EngineConfig::load_or_default(base_path.join(name))?,
            None => EngineConfig::default(),
        };
        Ok(Self {
            base_path,
            config,
            plan: None,
            lines: None,
            executed: None,
            scheduled: None,
            ledger: None,
            selection: PathSelection::default(),
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load any CSV into a Polars DataFrame with all columns as strings.
    /// Optionally rename columns via a map.
    #[pyo3(signature = (filename, rename=None))]
    fn load_csv(
        &self,
        filename: &str,
        rename: Option<HashMap<String, String>>,
    ) -> PyResult<PyDataFrame> {
        let df = self.read_csv(filename, rename)?;
        Ok(PyDataFrame(df))
    }

    /// Load the planned-activity catalog.
    ///
    /// Required columns: field_line, year, month, planned_count
    /// Optional columns: planned_cost, planned_days, cpae
    #[pyo3(signature = (filename=None))]
    fn load_plan(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let fname = filename.map_or_else(|| self.config.plan_file.clone(), str::to_string);
        let df = self.read_csv(&fname, None)?;
        self.plan = Some(df.clone());
        self.ledger = None;
        Ok(PyDataFrame(df))
    }

    /// Load per-line budget and target figures.
    ///
    /// Required columns: field_line, approved_budget
    /// Optional columns: year, afe_budget, target_cost, target_days
    #[pyo3(signature = (filename=None))]
    fn load_lines(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let fname = filename.map_or_else(|| self.config.lines_file.clone(), str::to_string);
        let df = self.read_csv(&fname, None)?;
        self.lines = Some(df.clone());
        self.ledger = None;
        Ok(PyDataFrame(df))
    }

    /// Load executed activities.
    ///
    /// Required columns: well, field_line, month or date, status, real_cost
    #[pyo3(signature = (filename=None))]
    fn load_executed(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let fname = filename.map_or_else(|| self.config.executed_file.clone(), str::to_string);
        let df = self.read_csv(&fname, None)?;
        self.executed = Some(df.clone());
        self.ledger = None;
        Ok(PyDataFrame(df))
    }

    /// Load scheduled activities.
    ///
    /// Required columns: well, field_line, month or date, validation, net_total_cost
    #[pyo3(signature = (filename=None))]
    fn load_scheduled(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let fname = filename.map_or_else(|| self.config.scheduled_file.clone(), str::to_string);
        let df = self.read_csv(&fname, None)?;
        self.scheduled = Some(df.clone());
        self.ledger = None;
        Ok(PyDataFrame(df))
    }

    /// Hand over frames already tabulated on the Python side.
    fn set_frames(
        &mut self,
        plan: PyDataFrame,
        lines: PyDataFrame,
        executed: PyDataFrame,
        scheduled: PyDataFrame,
    ) {
        self.plan = Some(plan.0);
        self.lines = Some(lines.0);
        self.executed = Some(executed.0);
        self.scheduled = Some(scheduled.0);
        self.ledger = None;
    }

    /// Build the ledger for `year` from the loaded frames.
    /// Returns the field line names.
    fn build_ledger(&mut self, year: i32) -> PyResult<Vec<String>> {
        let frames = LedgerFrames {
            plan: loaded(&self.plan, "plan")?,
            lines: loaded(&self.lines, "lines")?,
            executed: loaded(&self.executed, "executed")?,
            scheduled: loaded(&self.scheduled, "scheduled")?,
        };
        let ledger = ActivityLedger::from_frames(year, frames, &self.config)?;
        let names = ledger.field_lines().map(|l| l.name.clone()).collect();
        self.ledger = Some(ledger);
        Ok(names)
    }

    fn field_lines(&self) -> PyResult<Vec<String>> {
        Ok(self.ledger()?.field_lines().map(|l| l.name.clone()).collect())
    }

    // ── Ledger views ────────────────────────────────────────────────────────

    fn planned_distribution(&self, field_line: &str) -> PyResult<PyDataFrame> {
        let plan_rows = self
            .ledger()?
            .get_distributed_initial_planned_activities(field_line)?;
        let df = DataFrame::new(vec![
            Column::new(
                plan::MONTH.into(),
                plan_rows.iter().map(|p| p.month.to_string()).collect::<Vec<_>>(),
            ),
            Column::new(
                plan::PLANNED_COUNT.into(),
                plan_rows.iter().map(|p| p.planned_count).collect::<Vec<_>>(),
            ),
        ])
        .map_err(ForecastError::from)?;
        Ok(PyDataFrame(df))
    }

    fn executed_by_month(&self, month: &str, field_line: &str) -> PyResult<PyDataFrame> {
        let month: Month = month.parse()?;
        let rows = self
            .ledger()?
            .get_executed_activities_and_cost_by_month(month, field_line)?;
        let df = DataFrame::new(vec![
            Column::new(
                executed::WELL.into(),
                rows.iter().map(|a| a.well.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                executed::STATUS.into(),
                rows.iter().map(|a| a.status.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                executed::REAL_COST.into(),
                rows.iter().map(|a| a.real_cost).collect::<Vec<_>>(),
            ),
        ])
        .map_err(ForecastError::from)?;
        Ok(PyDataFrame(df))
    }

    fn scheduled_by_month(&self, month: &str, field_line: &str) -> PyResult<PyDataFrame> {
        let month: Month = month.parse()?;
        let rows = self
            .ledger()?
            .get_df_scheduled_executed_activities_validated(month, field_line)?;
        let df = DataFrame::new(vec![
            Column::new(
                scheduled::WELL.into(),
                rows.iter().map(|a| a.well.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                scheduled::VALIDATION.into(),
                rows.iter().map(|a| a.validation.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                scheduled::NET_TOTAL_COST.into(),
                rows.iter().map(|a| a.net_total_cost).collect::<Vec<_>>(),
            ),
        ])
        .map_err(ForecastError::from)?;
        Ok(PyDataFrame(df))
    }

    // ── Reference values and aggregates ─────────────────────────────────────

    fn afe_cost_avr(&self, field_line: &str, year: i32) -> PyResult<f64> {
        Ok(self.engine()?.resolver().get_afe_cost_avr(field_line, year)?)
    }

    fn cpae_by_month(&self, field_line: &str, month: &str) -> PyResult<f64> {
        Ok(self
            .engine()?
            .resolver()
            .get_cpae_by_month(field_line, month.parse()?)?)
    }

    /// Resolved (cost_value, day_value) of a path pair.
    fn resolve_path(&self, field_line: &str, cost_path: &str, day_path: &str) -> PyResult<(f64, f64)> {
        let reference = self.engine()?.resolver().resolve(field_line, cost_path, day_path)?;
        Ok((reference.cost_value, reference.day_value))
    }

    fn real_cost_by_month(&self, month: &str, field_line: &str) -> PyResult<f64> {
        Ok(self
            .engine()?
            .aggregator()
            .get_total_real_cost_by_month(month.parse()?, field_line)?)
    }

    fn accumulated_cost_by_month(&self, month: &str, field_line: &str) -> PyResult<f64> {
        Ok(self
            .engine()?
            .aggregator()
            .get_accumulated_cost_by_month(month.parse()?, field_line)?)
    }

    fn scheduled_cost_by_month(&self, month: &str, field_line: &str) -> PyResult<f64> {
        Ok(self
            .engine()?
            .aggregator()
            .get_total_scheduled_executed_activities_cost_by_month(month.parse()?, field_line)?)
    }

    fn budget_by_month(&self, field_line: &str, month: &str) -> PyResult<f64> {
        Ok(self
            .engine()?
            .aggregator()
            .get_budget_by_month(field_line, month.parse()?)?)
    }

    // ── Forecast ────────────────────────────────────────────────────────────

    fn projected_adjusted_by_month(
        &self,
        month: &str,
        field_line: &str,
        cost_path: &str,
        day_path: &str,
    ) -> PyResult<f64> {
        Ok(self.engine()?.get_projected_adjusted_by_month(
            month.parse()?,
            field_line,
            cost_path,
            day_path,
        )?)
    }

    /// Monthly forecast rows of a field line for a path pair.
    fn generate_forecast_by_path(
        &self,
        field_line: &str,
        cost_path: &str,
        day_path: &str,
    ) -> PyResult<PyDataFrame> {
        let run = self
            .engine()?
            .generate_forecast_by_path(field_line, cost_path, day_path)?;
        Ok(PyDataFrame(run.to_frame()?))
    }

    /// Full run (resolved values, rows, budget summary) as a JSON string.
    fn forecast_json(&self, field_line: &str, cost_path: &str, day_path: &str) -> PyResult<String> {
        let run = self
            .engine()?
            .generate_forecast_by_path(field_line, cost_path, day_path)?;
        Ok(run.to_json()?)
    }

    /// Evaluate many (field_line, cost_path, day_path) requests in parallel
    /// without holding the GIL.
    ///
    /// Returns one (ok, payload) tuple per request, in request order: the run
    /// as JSON when ok, the error message otherwise.
    fn generate_batch(
        &self,
        py: Python<'_>,
        requests: Vec<(String, String, String)>,
    ) -> PyResult<Vec<(bool, String)>> {
        let engine = self.engine()?;
        let requests: Vec<ForecastRequest> = requests
            .into_iter()
            .map(|(line, cost, day)| ForecastRequest::new(line, cost, day))
            .collect();

        let results = py.allow_threads(|| engine.run_batch(&requests));
        Ok(results.into_iter().map(batch_payload).collect())
    }

    /// Forecast of a field line using the persisted path selection.
    fn forecast_selected(&self, field_line: &str) -> PyResult<PyDataFrame> {
        let request = self.selection.request(field_line)?;
        let run = self.engine()?.run(&request)?;
        Ok(PyDataFrame(run.to_frame()?))
    }

    // ── Path selection ──────────────────────────────────────────────────────

    #[pyo3(signature = (filename=None))]
    fn load_path_selection(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let path = self.selection_path(filename);
        self.selection = PathSelection::load(&path)?;
        Ok(PyDataFrame(self.selection.to_frame()?))
    }

    #[pyo3(signature = (filename=None))]
    fn save_path_selection(&self, filename: Option<&str>) -> PyResult<()> {
        let path = self.selection_path(filename);
        Ok(self.selection.save(&path)?)
    }

    fn select_cost_path(&mut self, path_id: &str) -> PyResult<()> {
        let source: PathSource = path_id.parse()?;
        self.selection.select_cost(source);
        Ok(())
    }

    fn select_day_path(&mut self, path_id: &str) -> PyResult<()> {
        let source: PathSource = path_id.parse()?;
        self.selection.select_days(source);
        Ok(())
    }

    fn set_path_values(&mut self, path_id: &str, cost_value: &str, day_value: &str) -> PyResult<()> {
        let source: PathSource = path_id.parse()?;
        self.selection.set_values(source, cost_value, day_value);
        Ok(())
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn selection_df(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.selection.to_frame()?))
    }

    #[getter]
    fn year(&self) -> Option<i32> {
        self.ledger.as_ref().map(ActivityLedger::year)
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

impl ForecastModel {
    /// Read a CSV relative to the base path, applying an optional column rename.
    fn read_csv(
        &self,
        filename: &str,
        rename: Option<HashMap<String, String>>,
    ) -> Result<DataFrame, ForecastError> {
        let mut df = read_csv_as_strings(&self.base_path.join(filename))?;
        if let Some(map) = rename {
            let old: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
            let new: Vec<&str> = map.values().map(|s| s.as_str()).collect();
            df = df.lazy().rename(old, new, true).collect()?;
        }
        Ok(df)
    }

    fn ledger(&self) -> Result<&ActivityLedger, ForecastError> {
        self.ledger
            .as_ref()
            .ok_or_else(|| ForecastError::DataNotFound("ledger not built; call build_ledger".into()))
    }

    fn engine(&self) -> Result<ForecastEngine<'_>, ForecastError> {
        Ok(ForecastEngine::new(self.ledger()?).with_targets(self.selection.target_override()))
    }

    fn selection_path(&self, filename: Option<&str>) -> PathBuf {
        self.base_path
            .join(filename.unwrap_or(self.config.selection_file.as_str()))
    }
}

fn loaded<'a>(df: &'a Option<DataFrame>, name: &str) -> Result<&'a DataFrame, ForecastError> {
    df.as_ref()
        .ok_or_else(|| ForecastError::DataNotFound(format!("{name} frame not loaded")))
}

fn batch_payload(result: Result<ForecastRun, ForecastError>) -> (bool, String) {
    match result.and_then(|run| run.to_json()) {
        Ok(json) => (true, json),
        Err(e) => (false, e.to_string()),
    }
}
