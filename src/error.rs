use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid consensus timestamp {value:?} on transaction {transaction_id}")]
    InvalidTimestamp {
        transaction_id: String,
        value: String,
    },

    #[error("page loader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
