use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Failures talking to the Ryot GraphQL API.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("Response is not a GraphQL document: {0}")]
    InvalidBody(#[source] serde_json::Error),
    #[error("GraphQL API error: {}", .0.join("; "))]
    GraphQl(Vec<String>),
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Decode errors mean the payload shape changed under us; everything else is
    /// a transient read failure the caller may degrade.
    pub fn is_decode(&self) -> bool {
        matches!(self, SourceError::Decode { .. })
    }
}

/// Failures talking to the InfluxDB HTTP API.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("Failed to parse query response: {0}")]
    Csv(#[from] csv::Error),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Query response has no {0} column")]
    MissingColumn(&'static str),
    #[error("Invalid point: {0}")]
    InvalidPoint(String),
}

/// Errors that end a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to open InfluxDB session: {0}")]
    Connect(#[source] SinkError),
    #[error("Failed to reset measurements: {0}")]
    Reset(#[source] SinkError),
    #[error("Failed to query existing workout ids: {0}")]
    Reconcile(#[source] SinkError),
    #[error("Malformed details for workout {workout_id}: {source}")]
    MalformedWorkout {
        workout_id: String,
        #[source]
        source: SourceError,
    },
    #[error("Failed to write workout {workout_id}: {source}")]
    Write {
        workout_id: String,
        #[source]
        source: SinkError,
    },
    #[error("Failed to serialize dry-run sample: {0}")]
    Sample(#[from] serde_json::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;
pub type SinkResult<T> = Result<T, SinkError>;
