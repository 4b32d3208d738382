use std::collections::HashMap;
use std::marker::PhantomData;

use crate::{Outcome, StepHandle};

/// Immutable description of one step within a flow: its implementation handle
/// and the outcome-labeled transitions leaving it.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    handle: StepHandle,
    transitions: HashMap<Outcome, &'static str>,
}

impl StepDefinition {
    pub(crate) fn new(handle: StepHandle, transitions: HashMap<Outcome, &'static str>) -> Self {
        Self {
            handle,
            transitions,
        }
    }

    pub fn handle(&self) -> StepHandle {
        self.handle
    }

    /// Next step key for the given outcome, if one is mapped.
    pub fn next(&self, outcome: &Outcome) -> Option<&'static str> {
        self.transitions.get(outcome).copied()
    }

    pub(crate) fn targets(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.transitions.values().copied()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }
}

/// Immutable, validated flow graph: a name, a start step, and the step map.
///
/// Validation happens once in [`FlowBuilder::complete`](crate::FlowBuilder);
/// definitions are safely shared across concurrent executions afterwards. The
/// `C` parameter pins the context type the flow's steps were declared against.
#[derive(Debug)]
pub struct FlowDefinition<C> {
    name: String,
    start_key: &'static str,
    steps: HashMap<&'static str, StepDefinition>,
    _context: PhantomData<fn(&C)>,
}

impl<C> FlowDefinition<C> {
    pub(crate) fn new(
        name: String,
        start_key: &'static str,
        steps: HashMap<&'static str, StepDefinition>,
    ) -> Self {
        Self {
            name,
            start_key,
            steps,
            _context: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_key(&self) -> &'static str {
        self.start_key
    }

    pub fn step(&self, key: &str) -> Option<&StepDefinition> {
        self.steps.get(key)
    }

    /// Number of steps declared in this flow.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}
