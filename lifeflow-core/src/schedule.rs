use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use lifeflow_context::ScheduledContext;
use tokio_util::sync::CancellationToken;

use crate::FlowDefinition;

/// Delay-provider consulted before each scheduled flow iteration.
///
/// A failing computation does not stop the scheduling loop; the runner
/// substitutes its configured fallback delay instead.
#[async_trait]
pub trait ScheduleTrigger: Send + Sync {
    async fn next_delay(&self, ctx: &ScheduledContext, cancel: &CancellationToken)
        -> Result<Duration>;
}

/// Opaque identifier of a trigger implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerHandle {
    type_id: TypeId,
    name: &'static str,
}

impl TriggerHandle {
    pub fn of<T: ScheduleTrigger + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl fmt::Display for TriggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Association of one flow definition with its trigger and overlap policy.
///
/// Built once when a scheduled flow is committed; lives for the process
/// lifetime and is never mutated.
#[derive(Debug, Clone)]
pub struct ScheduledFlowBinding {
    flow_name: String,
    trigger: TriggerHandle,
    flow: Arc<FlowDefinition<ScheduledContext>>,
    no_overlap: bool,
}

impl ScheduledFlowBinding {
    pub(crate) fn new(
        flow_name: String,
        trigger: TriggerHandle,
        flow: Arc<FlowDefinition<ScheduledContext>>,
        no_overlap: bool,
    ) -> Self {
        Self {
            flow_name,
            trigger,
            flow,
            no_overlap,
        }
    }

    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    pub fn trigger(&self) -> TriggerHandle {
        self.trigger
    }

    pub fn flow(&self) -> &FlowDefinition<ScheduledContext> {
        &self.flow
    }

    pub fn no_overlap(&self) -> bool {
        self.no_overlap
    }
}
