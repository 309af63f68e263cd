/// Reasons a reconstruction pass cannot produce a history.
///
/// Reconstruction is all-or-nothing: either variant means no events are
/// returned for the execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconstructError {
    /// The log contradicts itself: unknown or repeated schedule ids, a
    /// state scheduled with no pending transition, undecodable payloads.
    #[error("malformed history{}{}: {reason}", at_event(.event_id), for_state(.state_id))]
    MalformedHistory {
        /// Primitive event id where the problem surfaced.
        event_id: Option<i64>,
        state_id: Option<String>,
        reason: String,
    },

    /// The execution does not belong to the state-based workflow abstraction.
    #[error("unsupported execution: {reason}")]
    UnsupportedExecution { reason: String },
}

impl ReconstructError {
    pub(crate) fn malformed(event_id: i64, reason: impl Into<String>) -> Self {
        ReconstructError::MalformedHistory {
            event_id: Some(event_id),
            state_id: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_for_state(
        event_id: i64,
        state_id: &str,
        reason: impl Into<String>,
    ) -> Self {
        ReconstructError::MalformedHistory {
            event_id: Some(event_id),
            state_id: Some(state_id.to_string()),
            reason: reason.into(),
        }
    }
}

fn at_event(event_id: &Option<i64>) -> String {
    event_id.map(|id| format!(" at event {}", id)).unwrap_or_default()
}

fn for_state(state_id: &Option<String>) -> String {
    state_id
        .as_deref()
        .map(|s| format!(" (state '{}')", s))
        .unwrap_or_default()
}
