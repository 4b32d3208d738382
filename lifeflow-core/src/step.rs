use std::any::{type_name, TypeId};
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use lifeflow_context::FlowContext;
use tokio_util::sync::CancellationToken;

use crate::Outcome;

/// One unit of work within a flow.
///
/// A step reports an [`Outcome`]; returning an error is allowed and is
/// normalized to [`Outcome::FAILURE`] by the executor, so implementations do
/// not need to catch their own failures.
#[async_trait]
pub trait FlowStep<C: FlowContext>: Send + Sync {
    async fn execute(&self, ctx: &C, cancel: &CancellationToken) -> Result<Outcome>;
}

/// Opaque identifier of a step implementation.
///
/// The fully-qualified type name doubles as the step's key within a flow, so
/// one implementation appears in a flow graph at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepHandle {
    type_id: TypeId,
    name: &'static str,
}

impl StepHandle {
    pub fn of<S: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }

    /// Step key within a flow definition.
    pub fn key(&self) -> &'static str {
        self.name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl fmt::Display for StepHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
