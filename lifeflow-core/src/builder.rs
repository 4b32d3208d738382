use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;

use lifeflow_context::FlowContext;

use crate::{FlowDefinition, FlowStep, LifecycleError, Outcome, StepDefinition, StepHandle};

/// Cursor naming one step inside a [`FlowBuilder`]. Cheap to copy; stays valid
/// for the lifetime of the builder that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepId(usize);

#[derive(Debug)]
struct StepNode {
    handle: StepHandle,
    transitions: HashMap<Outcome, StepId>,
}

/// Mutable construction surface for one flow graph.
///
/// Declare a start step, connect steps with outcome-labeled transitions, then
/// freeze the graph with [`complete`](Self::complete). All structural
/// validation runs there, once, so malformed flows are rejected at
/// configuration time instead of mid-run. `complete` consumes the builder, so
/// a flow cannot be completed twice.
#[derive(Debug)]
pub struct FlowBuilder<C: FlowContext> {
    name: String,
    nodes: Vec<StepNode>,
    index: HashMap<TypeId, StepId>,
    start: Option<StepId>,
    _context: PhantomData<fn(&C)>,
}

impl<C: FlowContext> FlowBuilder<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            start: None,
            _context: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares the flow's start step. Fails if one was already declared.
    pub fn begin_with<S>(&mut self) -> Result<StepId, LifecycleError>
    where
        S: FlowStep<C> + 'static,
    {
        if self.start.is_some() {
            return Err(LifecycleError::config(format!(
                "flow '{}' already has a starting step",
                self.name
            )));
        }
        let id = self.get_or_create::<S>();
        self.start = Some(id);
        Ok(id)
    }

    /// Idempotent step lookup: redeclaring the same implementation returns the
    /// same node, so a step can be a transition target any number of times.
    pub fn get_or_create<S>(&mut self) -> StepId
    where
        S: FlowStep<C> + 'static,
    {
        let handle = StepHandle::of::<S>();
        if let Some(&id) = self.index.get(&handle.type_id()) {
            return id;
        }
        let id = StepId(self.nodes.len());
        self.nodes.push(StepNode {
            handle,
            transitions: HashMap::new(),
        });
        self.index.insert(handle.type_id(), id);
        id
    }

    /// Maps `outcome` on `from` to `to`. Each outcome may be mapped at most
    /// once per step.
    pub fn connect(
        &mut self,
        from: StepId,
        outcome: Outcome,
        to: StepId,
    ) -> Result<(), LifecycleError> {
        if to.0 >= self.nodes.len() {
            return Err(LifecycleError::config(format!(
                "flow '{}' transition target is not a step of this flow",
                self.name
            )));
        }
        let node = self.nodes.get_mut(from.0).ok_or_else(|| {
            LifecycleError::config(format!(
                "flow '{}' transition source is not a step of this flow",
                self.name
            ))
        })?;
        if node.transitions.contains_key(&outcome) {
            return Err(LifecycleError::config(format!(
                "outcome '{}' already mapped for step '{}'",
                outcome, node.handle
            )));
        }
        node.transitions.insert(outcome, to);
        Ok(())
    }

    /// Freezes the graph into an immutable [`FlowDefinition`].
    ///
    /// Validation order: declared start step, transition targets, acyclicity.
    pub fn complete(self) -> Result<FlowDefinition<C>, LifecycleError> {
        let start = self.start.ok_or_else(|| {
            LifecycleError::config(format!(
                "flow '{}' must declare a starting step",
                self.name
            ))
        })?;

        let mut steps = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let transitions = node
                .transitions
                .iter()
                .map(|(outcome, id)| (outcome.clone(), self.nodes[id.0].handle.key()))
                .collect();
            steps.insert(
                node.handle.key(),
                StepDefinition::new(node.handle, transitions),
            );
        }

        validate_targets(&self.name, &steps)?;
        validate_acyclic(&self.name, &steps)?;

        Ok(FlowDefinition::new(
            self.name,
            self.nodes[start.0].handle.key(),
            steps,
        ))
    }
}

pub(crate) fn validate_targets(
    flow: &str,
    steps: &HashMap<&'static str, StepDefinition>,
) -> Result<(), LifecycleError> {
    for definition in steps.values() {
        for target in definition.targets() {
            if !steps.contains_key(target) {
                return Err(LifecycleError::config(format!(
                    "flow '{flow}' transition references undefined step '{target}'"
                )));
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first traversal from every step with a three-color scheme; revisiting
/// an in-progress node means the transition graph has a cycle.
pub(crate) fn validate_acyclic(
    flow: &str,
    steps: &HashMap<&'static str, StepDefinition>,
) -> Result<(), LifecycleError> {
    let mut marks: HashMap<&'static str, Mark> =
        steps.keys().map(|&key| (key, Mark::Unvisited)).collect();

    let keys: Vec<&'static str> = steps.keys().copied().collect();
    for key in keys {
        if marks[key] == Mark::Unvisited {
            visit(flow, key, steps, &mut marks)?;
        }
    }
    Ok(())
}

fn visit(
    flow: &str,
    key: &'static str,
    steps: &HashMap<&'static str, StepDefinition>,
    marks: &mut HashMap<&'static str, Mark>,
) -> Result<(), LifecycleError> {
    marks.insert(key, Mark::InProgress);

    for next in steps[key].targets() {
        match marks[next] {
            Mark::InProgress => {
                return Err(LifecycleError::config(format!(
                    "cycle detected in flow '{flow}' involving step '{}'",
                    steps[key].handle()
                )));
            }
            Mark::Unvisited => visit(flow, next, steps, marks)?,
            Mark::Done => {}
        }
    }

    marks.insert(key, Mark::Done);
    Ok(())
}
