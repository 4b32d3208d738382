//! # LifeFlow Core
//!
//! Flow definition, validation, and execution for lifecycle flows: directed
//! graphs of steps connected by outcome-labeled transitions, walked by an
//! executor that never lets a misbehaving step crash the run.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod definition;
mod error;
mod events;
mod executor;
mod outcome;
mod registry;
mod schedule;
mod sections;
mod step;


pub use builder::{FlowBuilder, StepId};
pub use definition::{FlowDefinition, StepDefinition};
pub use error::LifecycleError;
pub use events::{
    EventHub, FlowsEvent, ListenerFuture, Section, StepExecutedEvent, StepExecutingEvent,
};
pub use executor::{FlowExecutor, UnmappedOutcomePolicy};
pub use outcome::Outcome;
pub use registry::{StepRegistry, StepResolver, TriggerRegistry, TriggerResolver};
pub use schedule::{ScheduleTrigger, ScheduledFlowBinding, TriggerHandle};
pub use sections::{FlowSet, ScheduledFlowBuilder, ScheduledFlowSet};
pub use step::{FlowStep, StepHandle};

/// Prelude module for core functionality
pub mod prelude {
    pub use crate::{
        EventHub, FlowBuilder, FlowDefinition, FlowExecutor, FlowSet, FlowStep, LifecycleError,
        Outcome, ScheduleTrigger, ScheduledFlowSet, Section, StepHandle, StepRegistry,
        TriggerRegistry, UnmappedOutcomePolicy,
    };
    pub use lifeflow_context::{
        FlowContext, HostEnv, ScheduledContext, ShutdownContext, StartupContext,
    };
}
