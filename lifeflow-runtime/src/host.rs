use std::sync::Arc;

use lifeflow_context::{
    FlowContext, HostEnv, ScheduledContext, ShutdownContext, StartupContext,
};
use lifeflow_core::{
    EventHub, FlowDefinition, FlowExecutor, LifecycleError, Outcome, Section, StepRegistry,
    StepResolver, TriggerRegistry, TriggerResolver,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{LifecycleOptions, ScheduledRunner};

/// Capability resolvers the runner pulls step and trigger instances from,
/// plus the host environment description handed to every context.
pub struct LifecycleServices {
    pub startup_steps: Arc<dyn StepResolver<StartupContext>>,
    pub shutdown_steps: Arc<dyn StepResolver<ShutdownContext>>,
    pub scheduled_steps: Arc<dyn StepResolver<ScheduledContext>>,
    pub triggers: Arc<dyn TriggerResolver>,
    pub env: Arc<HostEnv>,
}

impl Default for LifecycleServices {
    fn default() -> Self {
        Self {
            startup_steps: Arc::new(StepRegistry::<StartupContext>::new()),
            shutdown_steps: Arc::new(StepRegistry::<ShutdownContext>::new()),
            scheduled_steps: Arc::new(StepRegistry::<ScheduledContext>::new()),
            triggers: Arc::new(TriggerRegistry::new()),
            env: Arc::new(HostEnv::default()),
        }
    }
}

/// Host-facing entry point: runs the startup section, the shutdown section,
/// and the scheduled loops against one set of options and services.
pub struct LifecycleRunner {
    startup_flows: Vec<Arc<FlowDefinition<StartupContext>>>,
    shutdown_flows: Vec<Arc<FlowDefinition<ShutdownContext>>>,
    startup_executor: FlowExecutor<StartupContext>,
    shutdown_executor: FlowExecutor<ShutdownContext>,
    scheduled: ScheduledRunner,
    events: Arc<EventHub>,
    env: Arc<HostEnv>,
    fail_fast_on_startup: bool,
    fail_fast_on_shutdown: bool,
}

impl LifecycleRunner {
    pub fn new(options: LifecycleOptions, services: LifecycleServices) -> Self {
        let LifecycleOptions {
            startup,
            shutdown,
            scheduled,
            events,
            unmapped_outcome_policy,
            fail_fast_on_startup,
            fail_fast_on_shutdown,
            log_step_errors,
            log_unmapped_outcomes,
            trigger_failure_delay,
        } = options;

        let events = Arc::new(events);

        let startup_executor = FlowExecutor::new(services.startup_steps)
            .with_policy(unmapped_outcome_policy)
            .log_step_errors(log_step_errors)
            .log_unmapped_outcomes(log_unmapped_outcomes);
        let shutdown_executor = FlowExecutor::new(services.shutdown_steps)
            .with_policy(unmapped_outcome_policy)
            .log_step_errors(log_step_errors)
            .log_unmapped_outcomes(log_unmapped_outcomes);
        let scheduled_executor = FlowExecutor::new(services.scheduled_steps)
            .with_policy(unmapped_outcome_policy)
            .log_step_errors(log_step_errors)
            .log_unmapped_outcomes(log_unmapped_outcomes);

        let scheduled = ScheduledRunner::new(
            scheduled.into_bindings(),
            scheduled_executor,
            services.triggers,
            services.env.clone(),
            events.clone(),
            trigger_failure_delay,
        );

        Self {
            startup_flows: startup.into_flows(),
            shutdown_flows: shutdown.into_flows(),
            startup_executor,
            shutdown_executor,
            scheduled,
            events,
            env: services.env,
            fail_fast_on_startup,
            fail_fast_on_shutdown,
        }
    }

    /// Runs every startup flow sequentially in declaration order.
    pub async fn run_startup(&self, cancel: &CancellationToken) -> Result<(), LifecycleError> {
        if self.startup_flows.is_empty() {
            return Ok(());
        }
        let ctx = StartupContext::new(self.env.clone());
        self.run_section(
            &self.startup_flows,
            &self.startup_executor,
            &ctx,
            Section::Startup,
            self.fail_fast_on_startup,
            cancel,
        )
        .await
    }

    /// Runs every shutdown flow sequentially in declaration order.
    pub async fn run_shutdown(&self, cancel: &CancellationToken) -> Result<(), LifecycleError> {
        if self.shutdown_flows.is_empty() {
            return Ok(());
        }
        let ctx = ShutdownContext::new(self.env.clone());
        self.run_section(
            &self.shutdown_flows,
            &self.shutdown_executor,
            &ctx,
            Section::Shutdown,
            self.fail_fast_on_shutdown,
            cancel,
        )
        .await
    }

    /// Drives the scheduled loops for the life of the token.
    pub async fn run_scheduled(&self, cancel: CancellationToken) {
        self.scheduled.run(cancel).await;
    }

    async fn run_section<C: FlowContext>(
        &self,
        flows: &[Arc<FlowDefinition<C>>],
        executor: &FlowExecutor<C>,
        ctx: &C,
        section: Section,
        fail_fast: bool,
        cancel: &CancellationToken,
    ) -> Result<(), LifecycleError> {
        if cancel.is_cancelled() {
            return Err(LifecycleError::Cancelled {
                scope: section.to_string(),
            });
        }

        self.events.emit_before_flows(section).await;
        info!(section = %section, count = flows.len(), "running lifecycle flows");

        let mut failures = 0usize;
        for flow in flows {
            match executor
                .execute(flow, ctx, Some(section), &self.events, cancel)
                .await
            {
                Ok(outcome) if outcome == Outcome::FAILURE => {
                    warn!(
                        section = %section,
                        flow = %flow.name(),
                        "flow completed with Failure outcome"
                    );
                    if fail_fast {
                        return Err(LifecycleError::FlowFailed {
                            flow: flow.name().to_string(),
                        });
                    }
                    failures += 1;
                }
                Ok(_) => {}
                Err(err @ LifecycleError::Cancelled { .. }) => return Err(err),
                Err(err) => {
                    if fail_fast {
                        return Err(err);
                    }
                    error!(
                        section = %section,
                        flow = %flow.name(),
                        error = %err,
                        "flow failed"
                    );
                    failures += 1;
                }
            }
        }

        info!(section = %section, "completed lifecycle flows");
        self.events.emit_after_flows(section).await;

        if failures > 0 {
            warn!(
                section = %section,
                count = failures,
                "lifecycle flows reported failures"
            );
        }
        Ok(())
    }
}
