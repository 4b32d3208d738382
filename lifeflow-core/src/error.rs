use thiserror::Error;

/// Errors surfaced by the lifecycle flow engine.
///
/// Only `Configuration` is expected to reach callers during normal operation;
/// every other condition is absorbed by the component that detects it.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Structural defect detected while building a flow, or at run time under
    /// the `Throw` unmapped-outcome policy.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The capability resolver had no registration for a step or trigger.
    #[error("no registration found for '{handle}'")]
    Resolution { handle: String },

    /// Cooperative cancellation was observed; the run did not produce an
    /// outcome.
    #[error("'{scope}' was cancelled")]
    Cancelled { scope: String },

    /// A lifecycle flow completed with the `Failure` outcome while fail-fast
    /// was configured for its section.
    #[error("flow '{flow}' completed with Failure outcome")]
    FlowFailed { flow: String },
}

impl LifecycleError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
