//! # LifeFlow - Lifecycle Flow Orchestration
//!
//! LifeFlow runs ordered, conditionally-branching units of work during three
//! phases of a long-running process: startup, shutdown, and recurring
//! scheduled intervals. Each flow is a validated directed graph of steps
//! connected by outcome-labeled transitions.
//!
//! ## Quick Start
//!
//! ```rust
//! use lifeflow::prelude::*;
//! use async_trait::async_trait;
//!
//! struct SayHello;
//!
//! #[async_trait]
//! impl FlowStep<StartupContext> for SayHello {
//!     async fn execute(
//!         &self,
//!         _ctx: &StartupContext,
//!         _cancel: &CancellationToken,
//!     ) -> anyhow::Result<Outcome> {
//!         println!("hello");
//!         Ok(Outcome::SUCCESS)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut options = LifecycleOptions::new();
//!     let mut flow = options.startup.define("Greet")?;
//!     flow.begin_with::<SayHello>()?;
//!     options.startup.commit(flow)?;
//!
//!     let mut services = LifecycleServices::default();
//!     let mut steps = StepRegistry::new();
//!     steps.register(SayHello);
//!     services.startup_steps = std::sync::Arc::new(steps);
//!
//!     let runner = LifecycleRunner::new(options, services);
//!     runner.run_startup(&CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use lifeflow_context as context;
pub use lifeflow_core::*;
pub use lifeflow_runtime as runtime;

/// Tracing setup for hosts that do not bring their own subscriber.
pub mod telemetry {
    /// Initialize a tracing subscriber driven by `RUST_LOG`.
    pub fn init_tracing() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }
}

/// Prelude module for easy imports
pub mod prelude {
    pub use lifeflow_context::{
        FlowContext, HostEnv, ScheduledContext, ShutdownContext, StartupContext,
    };
    pub use lifeflow_core::prelude::*;
    pub use lifeflow_runtime::{
        LifecycleOptions, LifecycleRunner, LifecycleServices, ScheduledRunner,
    };
    pub use tokio_util::sync::CancellationToken;
}
