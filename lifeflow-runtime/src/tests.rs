use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use lifeflow_context::{HostEnv, ScheduledContext};
use lifeflow_core::{
    EventHub, FlowExecutor, FlowStep, Outcome, ScheduleTrigger, ScheduledFlowSet, StepRegistry,
    TriggerRegistry,
};
use tokio_util::sync::CancellationToken;

use crate::ScheduledRunner;

struct TickStep {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl FlowStep<ScheduledContext> for TickStep {
    async fn execute(
        &self,
        _ctx: &ScheduledContext,
        _cancel: &CancellationToken,
    ) -> Result<Outcome> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(Outcome::SUCCESS)
    }
}

struct SlowStep {
    runs: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

#[async_trait]
impl FlowStep<ScheduledContext> for SlowStep {
    async fn execute(
        &self,
        _ctx: &ScheduledContext,
        _cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(Outcome::SUCCESS)
    }
}

struct ShortTrigger {
    delay: Duration,
}

#[async_trait]
impl ScheduleTrigger for ShortTrigger {
    async fn next_delay(
        &self,
        _ctx: &ScheduledContext,
        _cancel: &CancellationToken,
    ) -> Result<Duration> {
        Ok(self.delay)
    }
}

struct BrokenTrigger;

#[async_trait]
impl ScheduleTrigger for BrokenTrigger {
    async fn next_delay(
        &self,
        _ctx: &ScheduledContext,
        _cancel: &CancellationToken,
    ) -> Result<Duration> {
        anyhow::bail!("no delay available")
    }
}

fn build_runner<S, T>(
    flow_name: &str,
    step: S,
    trigger: T,
    no_overlap: bool,
    fallback: Duration,
) -> ScheduledRunner
where
    S: FlowStep<ScheduledContext> + 'static,
    T: ScheduleTrigger + 'static,
{
    let mut scheduled = ScheduledFlowSet::new();
    let mut flow = scheduled.define(flow_name).unwrap();
    flow.on_schedule::<T>().unwrap();
    if no_overlap {
        flow.no_overlap();
    }
    flow.begin_with::<S>().unwrap();
    scheduled.commit(flow).unwrap();

    let mut steps = StepRegistry::new();
    steps.register(step);
    let mut triggers = TriggerRegistry::new();
    triggers.register(trigger);

    ScheduledRunner::new(
        scheduled.into_bindings(),
        FlowExecutor::new(Arc::new(steps)),
        Arc::new(triggers),
        Arc::new(HostEnv::default()),
        Arc::new(EventHub::new()),
        fallback,
    )
}

#[tokio::test]
async fn broken_trigger_falls_back_and_the_loop_survives() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runner = Arc::new(build_runner(
        "Fallback",
        TickStep { runs: runs.clone() },
        BrokenTrigger,
        false,
        Duration::from_millis(20),
    ));

    let cancel = CancellationToken::new();
    let handle = {
        let runner = runner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(250)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert!(
        runs.load(Ordering::SeqCst) >= 3,
        "expected at least three fallback-paced executions, got {}",
        runs.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn held_guard_skips_iterations_without_executing() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runner = Arc::new(build_runner(
        "Guarded",
        TickStep { runs: runs.clone() },
        ShortTrigger {
            delay: Duration::from_millis(10),
        },
        true,
        Duration::from_secs(60),
    ));

    let guard = runner.guard_for("Guarded").await;
    let permit = guard.clone().try_acquire_owned().unwrap();

    let cancel = CancellationToken::new();
    let handle = {
        let runner = runner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 0, "held guard must skip runs");

    drop(permit);
    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert!(runs.load(Ordering::SeqCst) >= 1, "released guard must allow runs");
}

#[tokio::test]
async fn no_overlap_loops_sharing_a_name_never_run_concurrently() {
    let runs = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let runner = Arc::new(build_runner(
        "Exclusive",
        SlowStep {
            runs: runs.clone(),
            in_flight: in_flight.clone(),
            max_in_flight: max_in_flight.clone(),
        },
        ShortTrigger {
            delay: Duration::from_millis(5),
        },
        true,
        Duration::from_secs(60),
    ));

    let cancel = CancellationToken::new();
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let runner = runner.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { runner.run(cancel).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(runs.load(Ordering::SeqCst) >= 2);
    assert_eq!(
        max_in_flight.load(Ordering::SeqCst),
        1,
        "overlap guard must prevent concurrent entry"
    );
}

#[tokio::test]
async fn guards_are_shared_per_flow_name() {
    let runner = build_runner(
        "Shared",
        TickStep {
            runs: Arc::new(AtomicUsize::new(0)),
        },
        ShortTrigger {
            delay: Duration::from_secs(1),
        },
        true,
        Duration::from_secs(60),
    );

    let first = runner.guard_for("Shared").await;
    let second = runner.guard_for("Shared").await;
    let other = runner.guard_for("Other").await;

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &other));
}

#[tokio::test]
async fn cancellation_during_the_wait_ends_the_loop_cleanly() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runner = Arc::new(build_runner(
        "Sleepy",
        TickStep { runs: runs.clone() },
        ShortTrigger {
            delay: Duration::from_secs(30),
        },
        false,
        Duration::from_secs(60),
    ));

    let cancel = CancellationToken::new();
    let handle = {
        let runner = runner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop must end promptly on cancellation")
        .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}
