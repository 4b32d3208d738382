use std::time::Duration;

use lifeflow_context::{ShutdownContext, StartupContext};
use lifeflow_core::{EventHub, FlowSet, ScheduledFlowSet, UnmappedOutcomePolicy};

/// Configuration for startup, shutdown, and scheduled flows plus behavior
/// flags.
///
/// Startup defaults to fail-fast so a broken startup flow stops the host;
/// shutdown defaults to log-and-continue so a failing cleanup step never
/// blocks process termination.
pub struct LifecycleOptions {
    pub startup: FlowSet<StartupContext>,
    pub shutdown: FlowSet<ShutdownContext>,
    pub scheduled: ScheduledFlowSet,
    pub events: EventHub,
    pub unmapped_outcome_policy: UnmappedOutcomePolicy,
    pub fail_fast_on_startup: bool,
    pub fail_fast_on_shutdown: bool,
    pub log_step_errors: bool,
    pub log_unmapped_outcomes: bool,
    /// Delay substituted when a schedule trigger fails to produce one.
    pub trigger_failure_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            startup: FlowSet::new(),
            shutdown: FlowSet::new(),
            scheduled: ScheduledFlowSet::new(),
            events: EventHub::new(),
            unmapped_outcome_policy: UnmappedOutcomePolicy::StopFlow,
            fail_fast_on_startup: true,
            fail_fast_on_shutdown: false,
            log_step_errors: true,
            log_unmapped_outcomes: false,
            trigger_failure_delay: Duration::from_secs(60),
        }
    }
}

impl LifecycleOptions {
    pub fn new() -> Self {
        Self::default()
    }
}
