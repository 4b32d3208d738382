use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use lifeflow_context::FlowContext;

use crate::{FlowStep, LifecycleError, ScheduleTrigger, StepHandle, TriggerHandle};

/// Capability-resolution port for step instances.
///
/// The engine asks for a concrete step by handle instead of constructing one
/// itself; anything from an explicit registry to a full dependency-injection
/// container can sit behind this trait.
pub trait StepResolver<C: FlowContext>: Send + Sync {
    fn resolve_step(&self, handle: &StepHandle) -> Result<Arc<dyn FlowStep<C>>, LifecycleError>;
}

/// Capability-resolution port for trigger instances.
pub trait TriggerResolver: Send + Sync {
    fn resolve_trigger(
        &self,
        handle: &TriggerHandle,
    ) -> Result<Arc<dyn ScheduleTrigger>, LifecycleError>;
}

/// Explicit registry of step instances, keyed by implementation type.
pub struct StepRegistry<C: FlowContext> {
    steps: HashMap<TypeId, Arc<dyn FlowStep<C>>>,
}

impl<C: FlowContext> StepRegistry<C> {
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
        }
    }

    pub fn register<S>(&mut self, step: S) -> &mut Self
    where
        S: FlowStep<C> + 'static,
    {
        self.steps.insert(TypeId::of::<S>(), Arc::new(step));
        self
    }
}

impl<C: FlowContext> Default for StepRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: FlowContext> StepResolver<C> for StepRegistry<C> {
    fn resolve_step(&self, handle: &StepHandle) -> Result<Arc<dyn FlowStep<C>>, LifecycleError> {
        self.steps
            .get(&handle.type_id())
            .cloned()
            .ok_or_else(|| LifecycleError::Resolution {
                handle: handle.key().to_string(),
            })
    }
}

/// Explicit registry of trigger instances, keyed by implementation type.
#[derive(Default)]
pub struct TriggerRegistry {
    triggers: HashMap<TypeId, Arc<dyn ScheduleTrigger>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, trigger: T) -> &mut Self
    where
        T: ScheduleTrigger + 'static,
    {
        self.triggers.insert(TypeId::of::<T>(), Arc::new(trigger));
        self
    }
}

impl TriggerResolver for TriggerRegistry {
    fn resolve_trigger(
        &self,
        handle: &TriggerHandle,
    ) -> Result<Arc<dyn ScheduleTrigger>, LifecycleError> {
        self.triggers
            .get(&handle.type_id())
            .cloned()
            .ok_or_else(|| LifecycleError::Resolution {
                handle: handle.name().to_string(),
            })
    }
}
