use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lifeflow_context::{HostEnv, ScheduledContext};
use lifeflow_core::{
    EventHub, FlowExecutor, LifecycleError, ScheduledFlowBinding, TriggerResolver,
};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Runs every scheduled flow binding on its own indefinite loop.
///
/// Loops start together and run independently until the cancellation token
/// fires. A failing trigger, a failing iteration, or a skipped overlapping run
/// never terminates a loop; each condition is logged and the loop continues.
pub struct ScheduledRunner {
    bindings: Vec<Arc<ScheduledFlowBinding>>,
    executor: FlowExecutor<ScheduledContext>,
    triggers: Arc<dyn TriggerResolver>,
    env: Arc<HostEnv>,
    events: Arc<EventHub>,
    trigger_failure_delay: Duration,
    // Per-flow-name overlap guards, created lazily and kept for the process
    // lifetime. Loops sharing a flow name share the guard.
    guards: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ScheduledRunner {
    pub(crate) fn new(
        bindings: Vec<Arc<ScheduledFlowBinding>>,
        executor: FlowExecutor<ScheduledContext>,
        triggers: Arc<dyn TriggerResolver>,
        env: Arc<HostEnv>,
        events: Arc<EventHub>,
        trigger_failure_delay: Duration,
    ) -> Self {
        Self {
            bindings,
            executor,
            triggers,
            env,
            events,
            trigger_failure_delay,
            guards: Mutex::new(HashMap::new()),
        }
    }

    /// Drives every binding until cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        if self.bindings.is_empty() {
            return;
        }
        let loops = self
            .bindings
            .iter()
            .map(|binding| self.run_binding(binding, cancel.clone()));
        futures::future::join_all(loops).await;
    }

    pub(crate) async fn run_binding(
        &self,
        binding: &ScheduledFlowBinding,
        cancel: CancellationToken,
    ) {
        let guard = if binding.no_overlap() {
            Some(self.guard_for(binding.flow_name()).await)
        } else {
            None
        };

        while !cancel.is_cancelled() {
            let delay = self.next_delay(binding, &cancel).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            // Zero-timeout acquire: a run still in progress means this
            // iteration is skipped, not queued.
            let _permit = match &guard {
                Some(semaphore) => match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!(
                            flow = %binding.flow_name(),
                            "scheduled run skipped, previous run still in progress"
                        );
                        continue;
                    }
                },
                None => None,
            };

            let ctx = ScheduledContext::new(self.env.clone(), binding.flow_name());
            match self
                .executor
                .execute(binding.flow(), &ctx, None, &self.events, &cancel)
                .await
            {
                Ok(outcome) => {
                    debug!(
                        flow = %binding.flow_name(),
                        outcome = %outcome,
                        "scheduled flow completed"
                    );
                }
                Err(LifecycleError::Cancelled { .. }) => {}
                Err(err) => {
                    error!(
                        flow = %binding.flow_name(),
                        error = %err,
                        "scheduled flow failed"
                    );
                }
            }
            // The owned permit drops here, releasing the guard on every path.
        }
    }

    async fn next_delay(&self, binding: &ScheduledFlowBinding, cancel: &CancellationToken) -> Duration {
        let ctx = ScheduledContext::new(self.env.clone(), binding.flow_name());
        let computed: anyhow::Result<Duration> = async {
            let trigger = self.triggers.resolve_trigger(&binding.trigger())?;
            Ok(trigger.next_delay(&ctx, cancel).await?)
        }
        .await;

        match computed {
            Ok(delay) => delay,
            Err(err) => {
                error!(
                    flow = %binding.flow_name(),
                    error = %err,
                    fallback_secs = self.trigger_failure_delay.as_secs(),
                    "schedule trigger failed, using fallback delay"
                );
                self.trigger_failure_delay
            }
        }
    }

    pub(crate) async fn guard_for(&self, flow_name: &str) -> Arc<Semaphore> {
        let mut guards = self.guards.lock().await;
        guards
            .entry(flow_name.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }
}
