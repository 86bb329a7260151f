use thiserror::Error;

/// Errors produced while loading a dataset or deriving a chart from it.
#[derive(Debug, Error)]
pub enum ChartError {
    /// The dataset does not have the shape the charts rely on.
    #[error("malformed dataset: {0}")]
    DataFormat(String),
    /// A unit selection or plan was requested for zero measurements.
    #[error("no measurements to {0}")]
    EmptyInput(&'static str),
    #[error("unit '{0}' is not available in this dataset")]
    UnknownUnit(String),
    #[error("variable '{0}' does not occur in this dataset")]
    UnknownVariable(String),
    #[error("invalid view configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid query option: {0}")]
    Query(String),
    #[error("failed to render chart: {0}")]
    Render(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChartError>;
