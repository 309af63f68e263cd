/// All errors that can be returned by a `HistorySource` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No execution with the given id (and run id, when one was given).
    #[error("execution not found: {execution_id}{}", run_suffix(.run_id))]
    ExecutionNotFound {
        execution_id: String,
        run_id: Option<String>,
    },

    /// A stored record could not be parsed.
    #[error("invalid history record in {location}: {message}")]
    InvalidRecord { location: String, message: String },

    /// A backend-specific failure (I/O, connection, ...).
    #[error("history backend error: {0}")]
    Backend(String),
}

fn run_suffix(run_id: &Option<String>) -> String {
    run_id
        .as_deref()
        .map(|r| format!("/{}", r))
        .unwrap_or_default()
}
