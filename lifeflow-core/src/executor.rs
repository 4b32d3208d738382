use std::sync::Arc;
use std::time::Instant;

use lifeflow_context::FlowContext;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::events::{EventHub, Section, StepExecutedEvent, StepExecutingEvent};
use crate::{FlowDefinition, LifecycleError, Outcome, StepDefinition, StepResolver};

/// Behavior when a step reports an outcome its transition table does not map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmappedOutcomePolicy {
    /// Terminate the walk; the unmapped outcome becomes the final outcome.
    #[default]
    StopFlow,
    /// Follow the `Failure` transition when one exists; stop otherwise.
    TreatAsFailure,
    /// Treat the unmapped outcome as a configuration defect and abort.
    Throw,
}

/// Drives one flow definition to completion for a given context.
///
/// The executor converts step errors into the `Failure` outcome instead of
/// propagating them; a single misbehaving step cannot crash the walk.
/// Termination within one pass over the steps is guaranteed because the graph
/// was validated acyclic when it was built.
pub struct FlowExecutor<C: FlowContext> {
    resolver: Arc<dyn StepResolver<C>>,
    policy: UnmappedOutcomePolicy,
    log_step_errors: bool,
    log_unmapped_outcomes: bool,
}

impl<C: FlowContext> FlowExecutor<C> {
    pub fn new(resolver: Arc<dyn StepResolver<C>>) -> Self {
        Self {
            resolver,
            policy: UnmappedOutcomePolicy::default(),
            log_step_errors: true,
            log_unmapped_outcomes: false,
        }
    }

    pub fn with_policy(mut self, policy: UnmappedOutcomePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn log_step_errors(mut self, enabled: bool) -> Self {
        self.log_step_errors = enabled;
        self
    }

    pub fn log_unmapped_outcomes(mut self, enabled: bool) -> Self {
        self.log_unmapped_outcomes = enabled;
        self
    }

    /// Walks `flow` from its start step and returns the final outcome.
    ///
    /// `section` tags the step notifications; scheduled runs pass `None` and
    /// emit none. Cancellation observed between steps aborts the walk with
    /// [`LifecycleError::Cancelled`] rather than an outcome.
    pub async fn execute(
        &self,
        flow: &FlowDefinition<C>,
        ctx: &C,
        section: Option<Section>,
        events: &EventHub,
        cancel: &CancellationToken,
    ) -> Result<Outcome, LifecycleError> {
        let mut current = Some(flow.start_key());
        let mut last = Outcome::SUCCESS;

        while let Some(key) = current {
            if cancel.is_cancelled() {
                return Err(LifecycleError::Cancelled {
                    scope: flow.name().to_string(),
                });
            }

            let step_def = flow.step(key).ok_or_else(|| {
                LifecycleError::config(format!(
                    "step '{key}' not found within flow '{}'",
                    flow.name()
                ))
            })?;

            if let Some(section) = section {
                events
                    .emit_step_executing(
                        section,
                        StepExecutingEvent {
                            section,
                            flow: flow.name().to_string(),
                            step: step_def.handle(),
                        },
                    )
                    .await;
            }

            let step = self.resolver.resolve_step(&step_def.handle())?;
            let started = Instant::now();
            let (outcome, step_error) = match step.execute(ctx, cancel).await {
                Ok(outcome) => (outcome, None),
                Err(err) => {
                    if self.log_step_errors {
                        error!(
                            trace_id = %ctx.trace_id(),
                            flow = %flow.name(),
                            step = %step_def.handle(),
                            error = %err,
                            "flow step failed"
                        );
                    }
                    (Outcome::FAILURE, Some(Arc::new(err)))
                }
            };
            let duration = started.elapsed();

            if step_error.is_none() && outcome == Outcome::FAILURE && self.log_step_errors {
                warn!(
                    trace_id = %ctx.trace_id(),
                    flow = %flow.name(),
                    step = %step_def.handle(),
                    "flow step returned Failure"
                );
            }

            if let Some(section) = section {
                events
                    .emit_step_executed(
                        section,
                        StepExecutedEvent {
                            section,
                            flow: flow.name().to_string(),
                            step: step_def.handle(),
                            outcome: outcome.clone(),
                            duration,
                            error: step_error.clone(),
                        },
                    )
                    .await;
            }

            last = outcome.clone();

            current = match step_def.next(&outcome) {
                Some(next) => Some(next),
                None => self.unmapped(flow, step_def, &outcome)?,
            };
        }

        Ok(last)
    }

    fn unmapped(
        &self,
        flow: &FlowDefinition<C>,
        step_def: &StepDefinition,
        outcome: &Outcome,
    ) -> Result<Option<&'static str>, LifecycleError> {
        match self.policy {
            UnmappedOutcomePolicy::StopFlow => {
                if self.log_unmapped_outcomes {
                    warn!(
                        flow = %flow.name(),
                        step = %step_def.handle(),
                        outcome = %outcome,
                        "unmapped outcome, flow stops"
                    );
                }
                Ok(None)
            }
            UnmappedOutcomePolicy::TreatAsFailure => match step_def.next(&Outcome::FAILURE) {
                Some(next) => Ok(Some(next)),
                None => {
                    if self.log_unmapped_outcomes {
                        warn!(
                            flow = %flow.name(),
                            step = %step_def.handle(),
                            outcome = %outcome,
                            "unmapped outcome has no Failure transition, flow stops"
                        );
                    }
                    Ok(None)
                }
            },
            UnmappedOutcomePolicy::Throw => Err(LifecycleError::config(format!(
                "flow '{}' outcome '{outcome}' from step '{}' is not mapped",
                flow.name(),
                step_def.handle()
            ))),
        }
    }
}
