use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Data not found: {0}")]
    DataNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Validation conflict: {0}")]
    ValidationConflict(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "python")]
mod py {
    use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError, PyZeroDivisionError};
    use pyo3::PyErr;

    use super::ForecastError;

    impl From<ForecastError> for PyErr {
        fn from(err: ForecastError) -> PyErr {
            match err {
                ForecastError::DataNotFound(_) => PyKeyError::new_err(err.to_string()),
                ForecastError::DivisionByZero(_) => PyZeroDivisionError::new_err(err.to_string()),
                ForecastError::InvalidPath(_)
                | ForecastError::ValidationConflict(_)
                | ForecastError::MissingColumn(_)
                | ForecastError::InvalidData(_) => PyValueError::new_err(err.to_string()),
                _ => PyRuntimeError::new_err(err.to_string()),
            }
        }
    }
}
