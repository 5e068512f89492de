use crate::records::StoreError;

/// Terminal outcome of a failed submission. `Display` is the message shown
/// to the user; technical detail is logged where the failure happens.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Rejected before any network call. Never retried.
    #[error("{0}")]
    Validation(String),

    #[error("User must be logged in to analyze crops")]
    AuthenticationRequired,

    /// Upload or classification kept failing until the attempts ran out.
    #[error("{message}")]
    Transient { attempts: u32, message: String },

    /// The classifier answered but the result could not be stored. The
    /// uploaded image has already been removed (best-effort).
    #[error("Failed to save analysis results")]
    Persistence {
        #[source]
        source: StoreError,
    },

    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
