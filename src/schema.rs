/// Column-name constants for the forecast inputs and outputs.
/// Single source of truth - exported to Python via PyO3.

// ── Planned activity catalog columns ────────────────────────────────────────
pub mod plan {
    pub const FIELD_LINE: &str = "field_line";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const PLANNED_COUNT: &str = "planned_count";
    pub const PLANNED_COST: &str = "planned_cost";
    pub const PLANNED_DAYS: &str = "planned_days";
    pub const CPAE: &str = "cpae";
}

// ── Per-line reference columns ──────────────────────────────────────────────
pub mod line {
    pub const FIELD_LINE: &str = "field_line";
    pub const YEAR: &str = "year";
    pub const APPROVED_BUDGET: &str = "approved_budget";
    pub const AFE_BUDGET: &str = "afe_budget";
    pub const TARGET_COST: &str = "target_cost";
    pub const TARGET_DAYS: &str = "target_days";
}

// ── Executed activity columns ───────────────────────────────────────────────
pub mod executed {
    pub const WELL: &str = "well";
    pub const FIELD_LINE: &str = "field_line";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const DATE: &str = "date";
    pub const STATUS: &str = "status";
    pub const REAL_COST: &str = "real_cost";
    pub const REAL_DAYS: &str = "real_days";
}

// ── Scheduled activity columns ──────────────────────────────────────────────
pub mod scheduled {
    pub const WELL: &str = "well";
    pub const FIELD_LINE: &str = "field_line";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const DATE: &str = "date";
    pub const VALIDATION: &str = "validation";
    pub const NET_TOTAL_COST: &str = "net_total_cost";
}

// ── Status values ───────────────────────────────────────────────────────────
pub mod status {
    pub const FINAL: &str = "final";
    pub const VALIDATED: &str = "validated";
}

// ── Reference path ids ──────────────────────────────────────────────────────
pub mod path {
    pub const TARGET: &str = "target";
    pub const AVERAGE: &str = "average";
    pub const TOTAL: &str = "total";

    pub const ALL: [&str; 3] = [TARGET, AVERAGE, TOTAL];
}

// ── Path-selection file columns ─────────────────────────────────────────────
pub mod selection {
    pub const COST_PATH: &str = "Ruta Costos";
    pub const COST_SELECTED: &str = "Validacion Costos";
    pub const DAY_PATH: &str = "Ruta Dias";
    pub const DAY_SELECTED: &str = "Validacion Dias";

    pub const ALL: [&str; 4] = [COST_PATH, COST_SELECTED, DAY_PATH, DAY_SELECTED];
}

// ── Forecast output columns ─────────────────────────────────────────────────
pub mod forecast {
    pub const MONTH: &str = "month";
    pub const STATE: &str = "state";
    pub const PLANNED_ACTIVITIES: &str = "planned_activities";
    pub const EXECUTED_ACTIVITIES: &str = "executed_activities";
    pub const SCHEDULED_ACTIVITIES: &str = "scheduled_activities";
    pub const REMAINING_ACTIVITIES: &str = "remaining_activities";
    pub const REAL_COST: &str = "real_cost";
    pub const SCHEDULED_COST: &str = "scheduled_cost";
    pub const FORECAST_COST: &str = "forecast_cost";
    pub const CUMULATIVE_FORECAST: &str = "cumulative_forecast";
    pub const PROJECTED_DAYS: &str = "projected_days";
    pub const BUDGET: &str = "budget";
    pub const BUDGET_DEVIATION: &str = "budget_deviation";
    pub const AFE_BASELINE: &str = "afe_baseline";
    pub const AFE_DEVIATION: &str = "afe_deviation";
    pub const FAILURE: &str = "failure";
}
