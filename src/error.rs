use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Missing required variable(s) in SILO response: {}", .variables.join(", "))]
    MissingVariable { variables: Vec<String> },

    #[error("Cannot calculate {statistic}: {reason}")]
    UndefinedStatistic {
        statistic: &'static str,
        reason: String,
    },

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
