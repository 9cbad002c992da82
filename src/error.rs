use thiserror::Error;

/// Errors raised while reading inputs or writing outputs.
///
/// The scheduling engine never returns these; a placement that cannot be
/// made is reported through counters, not errors.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{file}: required column '{column}' not found")]
    MissingColumn { file: String, column: String },

    #[error("no usable {what} found")]
    EmptyInput { what: String },

    #[error("unknown player id: {id}")]
    UnknownPlayer { id: String },
}
