use std::borrow::Cow;
use std::fmt;

use crate::LifecycleError;

/// Named result a step reports after executing.
///
/// Outcomes compare by exact string equality. `SUCCESS` and `FAILURE` exist by
/// convention; any step may report any named outcome and the flow's transition
/// table decides what it means.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Outcome(Cow<'static, str>);

impl Outcome {
    pub const SUCCESS: Outcome = Outcome(Cow::Borrowed("Success"));
    pub const FAILURE: Outcome = Outcome(Cow::Borrowed("Failure"));

    /// Creates a custom outcome. Blank names are rejected.
    pub fn custom(name: impl Into<String>) -> Result<Self, LifecycleError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LifecycleError::config("outcome name cannot be blank"));
        }
        Ok(Self(Cow::Owned(name)))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    pub fn is_failure(&self) -> bool {
        *self == Self::FAILURE
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
