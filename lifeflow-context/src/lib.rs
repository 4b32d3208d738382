//! # LifeFlow Context
//!
//! Execution contexts threaded through lifecycle flow steps and triggers.

use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// Ambient description of the hosting process, shared by every context.
#[derive(Debug, Clone)]
pub struct HostEnv {
    pub app_name: String,
    pub environment: String,
}

impl HostEnv {
    pub fn new(app_name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            environment: environment.into(),
        }
    }
}

impl Default for HostEnv {
    fn default() -> Self {
        Self::new("lifeflow", "production")
    }
}

/// Marker contract for contexts that can be threaded through a flow run.
///
/// The engine never inspects a context beyond these accessors; everything else
/// a step needs travels inside the concrete context type.
pub trait FlowContext: Send + Sync + 'static {
    fn env(&self) -> &HostEnv;

    /// Trace id tying together every record emitted for one logical run.
    fn trace_id(&self) -> &str;
}

/// Context handed to startup flow steps. One per startup pass.
#[derive(Debug, Clone)]
pub struct StartupContext {
    env: Arc<HostEnv>,
    trace_id: String,
}

impl StartupContext {
    pub fn new(env: Arc<HostEnv>) -> Self {
        Self {
            env,
            trace_id: Uuid::new_v4().to_string(),
        }
    }
}

impl FlowContext for StartupContext {
    fn env(&self) -> &HostEnv {
        &self.env
    }

    fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

/// Context handed to shutdown flow steps. One per shutdown pass.
#[derive(Debug, Clone)]
pub struct ShutdownContext {
    env: Arc<HostEnv>,
    trace_id: String,
}

impl ShutdownContext {
    pub fn new(env: Arc<HostEnv>) -> Self {
        Self {
            env,
            trace_id: Uuid::new_v4().to_string(),
        }
    }
}

impl FlowContext for ShutdownContext {
    fn env(&self) -> &HostEnv {
        &self.env
    }

    fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

/// Context handed to scheduled flow steps and triggers.
///
/// A fresh one is built for every scheduled iteration, stamped with the moment
/// the iteration was admitted.
#[derive(Debug, Clone)]
pub struct ScheduledContext {
    env: Arc<HostEnv>,
    trace_id: String,
    flow_name: String,
    scheduled_at: SystemTime,
}

impl ScheduledContext {
    pub fn new(env: Arc<HostEnv>, flow_name: impl Into<String>) -> Self {
        Self {
            env,
            trace_id: Uuid::new_v4().to_string(),
            flow_name: flow_name.into(),
            scheduled_at: SystemTime::now(),
        }
    }

    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    pub fn scheduled_at(&self) -> SystemTime {
        self.scheduled_at
    }
}

impl FlowContext for ScheduledContext {
    fn env(&self) -> &HostEnv {
        &self.env
    }

    fn trace_id(&self) -> &str {
        &self.trace_id
    }
}
