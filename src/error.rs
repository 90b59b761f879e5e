use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Metric, Source};

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Run aborted: {0}")]
    RunAborted(String),
}

impl From<config::ConfigError> for EtlError {
    fn from(e: config::ConfigError) -> Self {
        EtlError::Config(e.to_string())
    }
}

/// A failed fetch for one (source, location, date).
#[derive(Error, Debug)]
#[error("{origin} fetch failed for {location} on {date}: {kind}")]
pub struct FetchError {
    pub origin: Source,
    pub location: String,
    pub date: NaiveDate,
    #[source]
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(origin: Source, location: impl Into<String>, date: NaiveDate, kind: FetchErrorKind) -> Self {
        Self {
            origin,
            location: location.into(),
            date,
            kind,
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchErrorKind {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("no API key configured")]
    MissingApiKey,

    #[error("hourly history unavailable and date is too old for a current-conditions snapshot")]
    HistoryUnavailable,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("no samples to aggregate")]
    EmptySampleSet,

    #[error("non-finite value {value} for {metric}")]
    NonFiniteValue { metric: Metric, value: f64 },

    #[error("unexpected metric {metric} in {source_name} batch")]
    UnexpectedMetric { metric: Metric, source_name: Source },
}

/// A failed write of one unified reading.
#[derive(Error, Debug)]
#[error("load failed for {location} on {date}: {kind}")]
pub struct LoadError {
    pub location: String,
    pub date: NaiveDate,
    #[source]
    pub kind: LoadErrorKind,
}

impl LoadError {
    pub fn new(location: impl Into<String>, date: NaiveDate, kind: LoadErrorKind) -> Self {
        Self {
            location: location.into(),
            date,
            kind,
        }
    }

    /// The store itself is unreachable, so no later load can succeed either.
    pub fn is_connectivity(&self) -> bool {
        matches!(self.kind, LoadErrorKind::Connectivity(_))
    }
}

#[derive(Error, Debug)]
pub enum LoadErrorKind {
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("store unreachable: {0}")]
    Connectivity(String),

    #[error("column range violation: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("column type mismatch: {0}")]
    Type(String),

    #[error("{0}")]
    Other(String),
}

impl From<sqlx::Error> for LoadErrorKind {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => {
                if db.is_foreign_key_violation() {
                    LoadErrorKind::ForeignKey(db.message().to_string())
                } else if db.is_unique_violation() || db.is_check_violation() {
                    LoadErrorKind::Constraint(db.message().to_string())
                } else {
                    LoadErrorKind::Other(db.message().to_string())
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => LoadErrorKind::Connectivity(e.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => LoadErrorKind::Type(e.to_string()),
            other => LoadErrorKind::Other(other.to_string()),
        }
    }
}
