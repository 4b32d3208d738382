use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::error;

use crate::{Outcome, StepHandle};

/// Lifecycle section a flow batch belongs to. Scheduled runs carry no section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Startup,
    Shutdown,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Startup => f.write_str("startup"),
            Section::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Future returned by an event listener.
pub type ListenerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

type Listener<E> = Box<dyn Fn(E) -> ListenerFuture + Send + Sync>;

/// Raised before and after the full batch of a section's flows runs.
#[derive(Debug, Clone)]
pub struct FlowsEvent {
    pub section: Section,
}

/// Raised immediately before a step executes.
#[derive(Debug, Clone)]
pub struct StepExecutingEvent {
    pub section: Section,
    pub flow: String,
    pub step: StepHandle,
}

/// Raised after a step executes, carrying its outcome, elapsed duration, and
/// the captured error if the step failed.
#[derive(Debug, Clone)]
pub struct StepExecutedEvent {
    pub section: Section,
    pub flow: String,
    pub step: StepHandle,
    pub outcome: Outcome,
    pub duration: Duration,
    pub error: Option<Arc<anyhow::Error>>,
}

#[derive(Default)]
struct SectionListeners {
    before_flows: Vec<Listener<FlowsEvent>>,
    after_flows: Vec<Listener<FlowsEvent>>,
    step_executing: Vec<Listener<StepExecutingEvent>>,
    step_executed: Vec<Listener<StepExecutedEvent>>,
}

/// Fan-out point for lifecycle notifications.
///
/// Listeners are invoked in registration order; a failing listener is logged
/// and never prevents the remaining listeners, or the flow itself, from
/// proceeding. Listeners are observation-only and cannot influence outcomes
/// or transitions.
#[derive(Default)]
pub struct EventHub {
    startup: SectionListeners,
    shutdown: SectionListeners,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self, section: Section) -> &SectionListeners {
        match section {
            Section::Startup => &self.startup,
            Section::Shutdown => &self.shutdown,
        }
    }

    fn listeners_mut(&mut self, section: Section) -> &mut SectionListeners {
        match section {
            Section::Startup => &mut self.startup,
            Section::Shutdown => &mut self.shutdown,
        }
    }

    pub fn on_before_flows<F, Fut>(&mut self, section: Section, listener: F) -> &mut Self
    where
        F: Fn(FlowsEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.listeners_mut(section)
            .before_flows
            .push(Box::new(move |event| Box::pin(listener(event))));
        self
    }

    pub fn on_after_flows<F, Fut>(&mut self, section: Section, listener: F) -> &mut Self
    where
        F: Fn(FlowsEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.listeners_mut(section)
            .after_flows
            .push(Box::new(move |event| Box::pin(listener(event))));
        self
    }

    pub fn on_step_executing<F, Fut>(&mut self, section: Section, listener: F) -> &mut Self
    where
        F: Fn(StepExecutingEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.listeners_mut(section)
            .step_executing
            .push(Box::new(move |event| Box::pin(listener(event))));
        self
    }

    pub fn on_step_executed<F, Fut>(&mut self, section: Section, listener: F) -> &mut Self
    where
        F: Fn(StepExecutedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.listeners_mut(section)
            .step_executed
            .push(Box::new(move |event| Box::pin(listener(event))));
        self
    }

    pub async fn emit_before_flows(&self, section: Section) {
        dispatch(
            &self.listeners(section).before_flows,
            FlowsEvent { section },
            section,
            "before_flows",
        )
        .await;
    }

    pub async fn emit_after_flows(&self, section: Section) {
        dispatch(
            &self.listeners(section).after_flows,
            FlowsEvent { section },
            section,
            "after_flows",
        )
        .await;
    }

    pub async fn emit_step_executing(&self, section: Section, event: StepExecutingEvent) {
        dispatch(
            &self.listeners(section).step_executing,
            event,
            section,
            "step_executing",
        )
        .await;
    }

    pub async fn emit_step_executed(&self, section: Section, event: StepExecutedEvent) {
        dispatch(
            &self.listeners(section).step_executed,
            event,
            section,
            "step_executed",
        )
        .await;
    }
}

async fn dispatch<E: Clone>(listeners: &[Listener<E>], event: E, section: Section, kind: &str) {
    for (index, listener) in listeners.iter().enumerate() {
        if let Err(err) = listener(event.clone()).await {
            error!(
                section = %section,
                event = kind,
                listener = index,
                error = %err,
                "lifecycle event listener failed"
            );
        }
    }
}
