//! Field-line CAPEX forecast engine.
//!
//! Reconciles planned, executed and scheduled activities of each field line
//! into monthly and cumulative cost forecasts and budget deviations for one
//! reporting year.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod forecast;
pub mod frame;
pub mod ledger;
pub mod month;
pub mod reference;
pub mod schema;
pub mod selection;

#[cfg(feature = "python")]
mod python;

pub use aggregator::MonthlyAggregator;
pub use config::EngineConfig;
pub use error::ForecastError;
pub use forecast::{
    BudgetSummary, ForecastEngine, ForecastRequest, ForecastRun, MonthState, MonthlyForecastRow,
};
pub use ledger::{
    ActivityLedger, ExecutedActivity, FieldLine, LedgerFrames, LineReference, MonthlyPlan,
    PlannedActivity, ScheduledActivity,
};
pub use month::Month;
pub use reference::{PathSource, ReferencePath, ReferenceResolver, TargetOverride};
pub use selection::{PathRow, PathSelection};

#[cfg(feature = "python")]
mod py_module {
    use pyo3::prelude::*;
    use pyo3::types::PyModule;

    use crate::python::ForecastModel;
    use crate::schema;

    /// Export schema constants as Python submodules
    fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Plan
        let plan = PyModule::new(m.py(), "plan")?;
        plan.add("FIELD_LINE", schema::plan::FIELD_LINE)?;
        plan.add("YEAR", schema::plan::YEAR)?;
        plan.add("MONTH", schema::plan::MONTH)?;
        plan.add("PLANNED_COUNT", schema::plan::PLANNED_COUNT)?;
        plan.add("PLANNED_COST", schema::plan::PLANNED_COST)?;
        plan.add("PLANNED_DAYS", schema::plan::PLANNED_DAYS)?;
        plan.add("CPAE", schema::plan::CPAE)?;
        m.add_submodule(&plan)?;

        // Line
        let line = PyModule::new(m.py(), "line")?;
        line.add("FIELD_LINE", schema::line::FIELD_LINE)?;
        line.add("YEAR", schema::line::YEAR)?;
        line.add("APPROVED_BUDGET", schema::line::APPROVED_BUDGET)?;
        line.add("AFE_BUDGET", schema::line::AFE_BUDGET)?;
        line.add("TARGET_COST", schema::line::TARGET_COST)?;
        line.add("TARGET_DAYS", schema::line::TARGET_DAYS)?;
        m.add_submodule(&line)?;

        // Executed
        let executed = PyModule::new(m.py(), "executed")?;
        executed.add("WELL", schema::executed::WELL)?;
        executed.add("FIELD_LINE", schema::executed::FIELD_LINE)?;
        executed.add("YEAR", schema::executed::YEAR)?;
        executed.add("MONTH", schema::executed::MONTH)?;
        executed.add("DATE", schema::executed::DATE)?;
        executed.add("STATUS", schema::executed::STATUS)?;
        executed.add("REAL_COST", schema::executed::REAL_COST)?;
        executed.add("REAL_DAYS", schema::executed::REAL_DAYS)?;
        m.add_submodule(&executed)?;

        // Scheduled
        let scheduled = PyModule::new(m.py(), "scheduled")?;
        scheduled.add("WELL", schema::scheduled::WELL)?;
        scheduled.add("FIELD_LINE", schema::scheduled::FIELD_LINE)?;
        scheduled.add("YEAR", schema::scheduled::YEAR)?;
        scheduled.add("MONTH", schema::scheduled::MONTH)?;
        scheduled.add("DATE", schema::scheduled::DATE)?;
        scheduled.add("VALIDATION", schema::scheduled::VALIDATION)?;
        scheduled.add("NET_TOTAL_COST", schema::scheduled::NET_TOTAL_COST)?;
        m.add_submodule(&scheduled)?;

        // Path ids
        let path = PyModule::new(m.py(), "path")?;
        path.add("TARGET", schema::path::TARGET)?;
        path.add("AVERAGE", schema::path::AVERAGE)?;
        path.add("TOTAL", schema::path::TOTAL)?;
        m.add_submodule(&path)?;

        // Selection file
        let selection = PyModule::new(m.py(), "selection")?;
        selection.add("COST_PATH", schema::selection::COST_PATH)?;
        selection.add("COST_SELECTED", schema::selection::COST_SELECTED)?;
        selection.add("DAY_PATH", schema::selection::DAY_PATH)?;
        selection.add("DAY_SELECTED", schema::selection::DAY_SELECTED)?;
        m.add_submodule(&selection)?;

        // Forecast output
        let forecast = PyModule::new(m.py(), "forecast")?;
        forecast.add("MONTH", schema::forecast::MONTH)?;
        forecast.add("STATE", schema::forecast::STATE)?;
        forecast.add("PLANNED_ACTIVITIES", schema::forecast::PLANNED_ACTIVITIES)?;
        forecast.add("EXECUTED_ACTIVITIES", schema::forecast::EXECUTED_ACTIVITIES)?;
        forecast.add("SCHEDULED_ACTIVITIES", schema::forecast::SCHEDULED_ACTIVITIES)?;
        forecast.add("REMAINING_ACTIVITIES", schema::forecast::REMAINING_ACTIVITIES)?;
        forecast.add("REAL_COST", schema::forecast::REAL_COST)?;
        forecast.add("SCHEDULED_COST", schema::forecast::SCHEDULED_COST)?;
        forecast.add("FORECAST_COST", schema::forecast::FORECAST_COST)?;
        forecast.add("CUMULATIVE_FORECAST", schema::forecast::CUMULATIVE_FORECAST)?;
        forecast.add("PROJECTED_DAYS", schema::forecast::PROJECTED_DAYS)?;
        forecast.add("BUDGET", schema::forecast::BUDGET)?;
        forecast.add("BUDGET_DEVIATION", schema::forecast::BUDGET_DEVIATION)?;
        forecast.add("AFE_BASELINE", schema::forecast::AFE_BASELINE)?;
        forecast.add("AFE_DEVIATION", schema::forecast::AFE_DEVIATION)?;
        forecast.add("FAILURE", schema::forecast::FAILURE)?;
        m.add_submodule(&forecast)?;

        Ok(())
    }

    #[pymodule]
    fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<ForecastModel>()?;
        add_schema_exports(m)?;
        Ok(())
    }
}
