use std::collections::HashSet;
use std::sync::Arc;

use lifeflow_context::{FlowContext, ScheduledContext};

use crate::{
    FlowBuilder, FlowDefinition, FlowStep, LifecycleError, Outcome, ScheduleTrigger,
    ScheduledFlowBinding, StepId, TriggerHandle,
};

/// Ordered collection of the flows declared for one lifecycle section.
///
/// Flow names are unique within a section; flows run in declaration order.
pub struct FlowSet<C: FlowContext> {
    names: HashSet<String>,
    flows: Vec<Arc<FlowDefinition<C>>>,
}

impl<C: FlowContext> FlowSet<C> {
    pub fn new() -> Self {
        Self {
            names: HashSet::new(),
            flows: Vec::new(),
        }
    }

    /// Reserves `name` and returns a builder for it. Blank or already-declared
    /// names are rejected.
    pub fn define(&mut self, name: &str) -> Result<FlowBuilder<C>, LifecycleError> {
        reserve_name(&mut self.names, name)?;
        Ok(FlowBuilder::new(name))
    }

    /// Completes the builder and stores its definition.
    pub fn commit(&mut self, builder: FlowBuilder<C>) -> Result<(), LifecycleError> {
        let definition = builder.complete()?;
        self.flows.push(Arc::new(definition));
        Ok(())
    }

    pub fn flows(&self) -> &[Arc<FlowDefinition<C>>] {
        &self.flows
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn into_flows(self) -> Vec<Arc<FlowDefinition<C>>> {
        self.flows
    }
}

impl<C: FlowContext> Default for FlowSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one scheduled flow: the step graph plus its trigger and
/// overlap policy.
pub struct ScheduledFlowBuilder {
    inner: FlowBuilder<ScheduledContext>,
    trigger: Option<TriggerHandle>,
    no_overlap: bool,
}

impl ScheduledFlowBuilder {
    fn new(name: &str) -> Self {
        Self {
            inner: FlowBuilder::new(name),
            trigger: None,
            no_overlap: false,
        }
    }

    /// Assigns the trigger that provides delays between runs. Reassigning a
    /// different trigger is a configuration error.
    pub fn on_schedule<T>(&mut self) -> Result<&mut Self, LifecycleError>
    where
        T: ScheduleTrigger + 'static,
    {
        let handle = TriggerHandle::of::<T>();
        if let Some(existing) = self.trigger {
            if existing != handle {
                return Err(LifecycleError::config(format!(
                    "scheduled flow '{}' already has trigger '{existing}'",
                    self.inner.name()
                )));
            }
        }
        self.trigger = Some(handle);
        Ok(self)
    }

    /// Skips an iteration instead of starting a second concurrent run.
    pub fn no_overlap(&mut self) -> &mut Self {
        self.no_overlap = true;
        self
    }

    pub fn begin_with<S>(&mut self) -> Result<StepId, LifecycleError>
    where
        S: FlowStep<ScheduledContext> + 'static,
    {
        self.inner.begin_with::<S>()
    }

    pub fn get_or_create<S>(&mut self) -> StepId
    where
        S: FlowStep<ScheduledContext> + 'static,
    {
        self.inner.get_or_create::<S>()
    }

    pub fn connect(
        &mut self,
        from: StepId,
        outcome: Outcome,
        to: StepId,
    ) -> Result<(), LifecycleError> {
        self.inner.connect(from, outcome, to)
    }
}

/// Ordered collection of scheduled flow bindings.
pub struct ScheduledFlowSet {
    names: HashSet<String>,
    bindings: Vec<Arc<ScheduledFlowBinding>>,
}

impl ScheduledFlowSet {
    pub fn new() -> Self {
        Self {
            names: HashSet::new(),
            bindings: Vec::new(),
        }
    }

    pub fn define(&mut self, name: &str) -> Result<ScheduledFlowBuilder, LifecycleError> {
        reserve_name(&mut self.names, name)?;
        Ok(ScheduledFlowBuilder::new(name))
    }

    /// Completes the builder into a binding. A trigger must have been
    /// declared via [`ScheduledFlowBuilder::on_schedule`].
    pub fn commit(&mut self, builder: ScheduledFlowBuilder) -> Result<(), LifecycleError> {
        let ScheduledFlowBuilder {
            inner,
            trigger,
            no_overlap,
        } = builder;
        let trigger = trigger.ok_or_else(|| {
            LifecycleError::config(format!(
                "scheduled flow '{}' must declare a trigger via on_schedule()",
                inner.name()
            ))
        })?;
        let definition = inner.complete()?;
        let flow_name = definition.name().to_string();
        self.bindings.push(Arc::new(ScheduledFlowBinding::new(
            flow_name,
            trigger,
            Arc::new(definition),
            no_overlap,
        )));
        Ok(())
    }

    pub fn bindings(&self) -> &[Arc<ScheduledFlowBinding>] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn into_bindings(self) -> Vec<Arc<ScheduledFlowBinding>> {
        self.bindings
    }
}

impl Default for ScheduledFlowSet {
    fn default() -> Self {
        Self::new()
    }
}

fn reserve_name(names: &mut HashSet<String>, name: &str) -> Result<(), LifecycleError> {
    if name.trim().is_empty() {
        return Err(LifecycleError::config("flow name cannot be blank"));
    }
    if !names.insert(name.to_string()) {
        return Err(LifecycleError::config(format!(
            "flow '{name}' is already defined"
        )));
    }
    Ok(())
}
