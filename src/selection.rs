//! Forecast path selection and its flat-file persistence.
//!
//! The record has exactly three rows (target, average, total). Each row
//! carries a cost value and a days value as typed by the operator, and at
//! most one row per axis is selected. Selection is stored per axis as a
//! single [`PathSource`], so two selected rows cannot be represented.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;

use crate::error::ForecastError;
use crate::forecast::ForecastRequest;
use crate::frame::{optional_string_cells, parse_bool, parse_float, read_csv_as_strings};
use crate::reference::{PathSource, TargetOverride};
use crate::schema::selection as cols;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathRow {
    pub cost_value: String,
    pub day_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathSelection {
    rows: [PathRow; 3],
    cost: Option<PathSource>,
    days: Option<PathSource>,
}

impl PathSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cost(&self) -> Option<PathSource> {
        self.cost
    }

    pub fn days(&self) -> Option<PathSource> {
        self.days
    }

    /// Select the cost path, replacing any previous selection.
    pub fn select_cost(&mut self, source: PathSource) {
        self.cost = Some(source);
    }

    /// Select the days path, replacing any previous selection.
    pub fn select_days(&mut self, source: PathSource) {
        self.days = Some(source);
    }

    pub fn clear(&mut self) {
        self.cost = None;
        self.days = None;
    }

    pub fn row(&self, source: PathSource) -> &PathRow {
        &self.rows[index_of(source)]
    }

    pub fn set_values(&mut self, source: PathSource, cost_value: impl Into<String>, day_value: impl Into<String>) {
        self.rows[index_of(source)] = PathRow {
            cost_value: cost_value.into(),
            day_value: day_value.into(),
        };
    }

    /// The selected (cost, days) pair; both axes must be selected.
    pub fn selected_pair(&self) -> Result<(PathSource, PathSource), ForecastError> {
        match (self.cost, self.days) {
            (Some(cost), Some(days)) => Ok((cost, days)),
            (None, _) => Err(ForecastError::InvalidPath("no cost path selected".into())),
            (_, None) => Err(ForecastError::InvalidPath("no days path selected".into())),
        }
    }

    /// Forecast request for `field_line` using the selected pair.
    pub fn request(&self, field_line: &str) -> Result<ForecastRequest, ForecastError> {
        let (cost, days) = self.selected_pair()?;
        Ok(ForecastRequest::new(field_line, cost.as_str(), days.as_str()))
    }

    /// Target values typed into the target row, when they parse as numbers.
    pub fn target_override(&self) -> TargetOverride {
        let row = self.row(PathSource::Target);
        TargetOverride {
            cost: parse_float(&row.cost_value),
            days: parse_float(&row.day_value),
        }
    }

    // ── Tabular form ────────────────────────────────────────────────────────

    /// Read the record from a frame with the four selection columns.
    ///
    /// Missing columns and null or NaN cells read as unselected / empty.
    /// Fewer than three rows are padded; rows beyond the third are ignored.
    /// More than one selected row on an axis is a [`ForecastError::ValidationConflict`].
    pub fn from_frame(df: &DataFrame) -> Result<Self, ForecastError> {
        let cost_values = optional_string_cells(df, cols::COST_PATH)?;
        let cost_flags = optional_string_cells(df, cols::COST_SELECTED)?;
        let day_values = optional_string_cells(df, cols::DAY_PATH)?;
        let day_flags = optional_string_cells(df, cols::DAY_SELECTED)?;

        if df.height() > PathSource::ALL.len() {
            tracing::warn!(rows = df.height(), "Path selection has extra rows, ignoring them");
        }

        let mut selection = Self::default();
        let mut cost_selected = Vec::new();
        let mut days_selected = Vec::new();
        for (i, source) in PathSource::ALL.into_iter().enumerate().take(df.height()) {
            selection.rows[i] = PathRow {
                cost_value: cost_values[i].clone().unwrap_or_default(),
                day_value: day_values[i].clone().unwrap_or_default(),
            };
            if parse_bool(cost_flags[i].as_deref()) {
                cost_selected.push(source);
            }
            if parse_bool(day_flags[i].as_deref()) {
                days_selected.push(source);
            }
        }

        selection.cost = exclusive(cols::COST_SELECTED, &cost_selected)?;
        selection.days = exclusive(cols::DAY_SELECTED, &days_selected)?;
        Ok(selection)
    }

    pub fn to_frame(&self) -> Result<DataFrame, ForecastError> {
        let flag = |selected: Option<PathSource>, source: PathSource| {
            if selected == Some(source) { "True" } else { "False" }
        };
        let columns: Vec<Column> = vec![
            Column::new(
                cols::COST_PATH.into(),
                self.rows.iter().map(|r| r.cost_value.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                cols::COST_SELECTED.into(),
                PathSource::ALL.iter().map(|&s| flag(self.cost, s)).collect::<Vec<_>>(),
            ),
            Column::new(
                cols::DAY_PATH.into(),
                self.rows.iter().map(|r| r.day_value.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                cols::DAY_SELECTED.into(),
                PathSource::ALL.iter().map(|&s| flag(self.days, s)).collect::<Vec<_>>(),
            ),
        ];
        Ok(DataFrame::new(columns)?)
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    /// Load the record; a missing file means nothing selected.
    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No path selection file, starting unselected");
            return Ok(Self::default());
        }
        let df = read_csv_as_strings(path)?;
        Self::from_frame(&df)
    }

    pub fn save(&self, path: &Path) -> Result<(), ForecastError> {
        let mut df = self.to_frame()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        tracing::debug!(path = %path.display(), "Path selection saved");
        Ok(())
    }
}

fn index_of(source: PathSource) -> usize {
    match source {
        PathSource::Target => 0,
        PathSource::Average => 1,
        PathSource::Total => 2,
    }
}

fn exclusive(column: &str, selected: &[PathSource]) -> Result<Option<PathSource>, ForecastError> {
    match selected {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        many => Err(ForecastError::ValidationConflict(format!(
            "{} rows selected in '{column}': {:?}",
            many.len(),
            many
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const HEADER: &str = "Ruta Costos,Validacion Costos,Ruta Dias,Validacion Dias\n";

    fn write(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("path_selection.csv");
        fs::write(&path, format!("{HEADER}{body}")).expect("write");
        path
    }

    #[test]
    fn missing_file_is_all_unselected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let selection = PathSelection::load(&dir.path().join("absent.csv")).expect("load");
        assert_eq!(selection, PathSelection::default());
        assert!(matches!(
            selection.selected_pair(),
            Err(ForecastError::InvalidPath(_))
        ));
    }

    #[test]
    fn missing_cell_reads_as_unselected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "80,True,3,\n,False,,True\nnan,False,NaN,False\n");
        let selection = PathSelection::load(&path).expect("load");

        assert_eq!(selection.cost(), Some(PathSource::Target));
        assert_eq!(selection.days(), Some(PathSource::Average));
        assert_eq!(selection.row(PathSource::Target).cost_value, "80");
        assert_eq!(selection.row(PathSource::Total).day_value, "");
        assert_eq!(
            selection.target_override(),
            TargetOverride {
                cost: Some(80.0),
                days: Some(3.0)
            }
        );
    }

    #[test]
    fn missing_column_and_short_file_are_padded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("short.csv");
        fs::write(&path, "Ruta Costos,Validacion Costos\n1,False\n2,True\n").expect("write");
        let selection = PathSelection::load(&path).expect("load");

        assert_eq!(selection.cost(), Some(PathSource::Average));
        assert_eq!(selection.days(), None);
        assert_eq!(selection.row(PathSource::Total), &PathRow::default());
    }

    #[test]
    fn two_selected_rows_are_a_conflict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, ",True,,False\n,True,,True\n,False,,False\n");
        assert!(matches!(
            PathSelection::load(&path),
            Err(ForecastError::ValidationConflict(_))
        ));
    }

    #[test]
    fn selecting_replaces_previous_choice() {
        let mut selection = PathSelection::new();
        selection.select_cost(PathSource::Target);
        selection.select_cost(PathSource::Total);
        selection.select_days(PathSource::Average);
        assert_eq!(
            selection.selected_pair().expect("pair"),
            (PathSource::Total, PathSource::Average)
        );
        let request = selection.request("X").expect("request");
        assert_eq!(request, ForecastRequest::new("X", "total", "average"));
    }

    #[test]
    fn save_then_load_restores_the_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("path_selection.csv");

        let mut selection = PathSelection::new();
        selection.set_values(PathSource::Target, "95.5", "4");
        selection.set_values(PathSource::Average, "100", "4");
        selection.select_cost(PathSource::Target);
        selection.select_days(PathSource::Average);
        selection.save(&path).expect("save");

        let frame = selection.to_frame().expect("frame");
        assert_eq!(frame.height(), 3);

        let loaded = PathSelection::load(&path).expect("load");
        assert_eq!(loaded, selection);
    }
}
