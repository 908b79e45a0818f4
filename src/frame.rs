//! DataFrame helpers shared by ingestion and the selection file.
//!
//! Report extracts arrive as all-string CSVs, while frames handed over from
//! Python usually carry typed columns. Both are normalised here into plain
//! per-row cells.

use std::path::Path;

use polars::prelude::*;

use crate::error::ForecastError;

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names.
pub fn read_csv_as_strings(path: &Path) -> Result<DataFrame, ForecastError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), ForecastError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(ForecastError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// String cells of a column, trimmed. Empty, "nan" and null cells are `None`.
pub fn string_cells(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, ForecastError> {
    let column = df.column(name)?;
    let cast = column.cast(&DataType::String)?;
    let cells = cast
        .str()?
        .into_iter()
        .map(|v| v.and_then(clean_cell))
        .collect();
    Ok(cells)
}

/// Like [`string_cells`], but a missing column yields all-`None` cells.
pub fn optional_string_cells(
    df: &DataFrame,
    name: &str,
) -> Result<Vec<Option<String>>, ForecastError> {
    if has_column(df, name) {
        string_cells(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

/// Numeric cells of a column. String columns are trimmed and parsed;
/// unparseable, empty and NaN cells are `None`.
pub fn float_cells(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, ForecastError> {
    let column = df.column(name)?;
    if matches!(column.dtype(), DataType::String) {
        let cells = column
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_float))
            .collect();
        return Ok(cells);
    }

    let cast = column.cast(&DataType::Float64)?;
    let cells = cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(cells)
}

pub fn optional_float_cells(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, ForecastError> {
    if has_column(df, name) {
        float_cells(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

pub fn parse_float(raw: &str) -> Option<f64> {
    clean_cell(raw)?.parse::<f64>().ok().filter(|x| !x.is_nan())
}

/// Boolean cell as written by spreadsheets and pandas ("True", "1", "1.0", "si").
pub fn parse_bool(raw: Option<&str>) -> bool {
    match raw.and_then(clean_cell) {
        Some(v) => matches!(
            v.to_lowercase().as_str(),
            "true" | "1" | "1.0" | "yes" | "si" | "sí" | "x"
        ),
        None => false,
    }
}

fn clean_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_columns_are_parsed_as_floats() {
        let df = df!("cost" => [Some(" 12.5 "), Some(""), Some("NaN"), None, Some("abc")])
            .expect("frame");
        let cells = float_cells(&df, "cost").expect("cells");
        assert_eq!(cells, vec![Some(12.5), None, None, None, None]);
    }

    #[test]
    fn numeric_columns_are_cast() {
        let df = df!("count" => [1i32, 2, 3]).expect("frame");
        let cells = float_cells(&df, "count").expect("cells");
        assert_eq!(cells, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn missing_optional_column_is_all_none() {
        let df = df!("a" => ["x", "y"]).expect("frame");
        assert_eq!(optional_float_cells(&df, "b").expect("cells"), vec![None, None]);
        assert!(matches!(
            require_columns(&df, &["a", "b"]),
            Err(ForecastError::MissingColumn(c)) if c == "b"
        ));
    }

    #[test]
    fn bool_cells_tolerate_spreadsheet_spellings() {
        assert!(parse_bool(Some("True")));
        assert!(parse_bool(Some(" 1.0 ")));
        assert!(!parse_bool(Some("False")));
        assert!(!parse_bool(Some("nan")));
        assert!(!parse_bool(None));
    }
}
