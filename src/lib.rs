//! # spark-fiber
//!
//! Incremental, interruptible UI reconciler.
//!
//! Given a declarative element tree, spark-fiber keeps a host tree (DOM-like,
//! terminal cells, anything behind [`HostRenderer`]) in sync with it, doing the
//! diff in small units of work that fit inside host-granted time slices.
//!
//! ## Architecture
//!
//! Every tree position is a fiber record in a generational arena. Each cycle
//! builds a work-in-progress tree beside the committed one, linking every
//! reused position back to its predecessor through `alternate`:
//!
//! ```text
//! render()/schedule_update() → UpdateQueue → begin/complete (sliced) → commit
//! ```
//!
//! Nothing reaches the host until the whole working tree is complete, and then
//! everything reaches it in one uninterrupted commit.
//!
//! ## Modules
//!
//! - [`types`] - Elements, props, values, host/component/instance handles
//! - [`engine`] - Fiber records and the arena they live in
//! - [`reconciler`] - Work loop, begin/complete/commit phases, update queue
//! - [`component`] - Component definitions and instance runtime
//! - [`renderer`] - Host renderer boundary, property diffing, in-memory host
//! - [`scheduler`] - Deadlines and the idle task
//! - [`config`] - Timing configuration
//! - [`error`] - Error types

pub mod component;
pub mod config;
pub mod engine;
pub mod error;
pub mod reconciler;
pub mod renderer;
pub mod scheduler;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use component::{component_fn, Component, ComponentRegistry, ComponentRuntime, FnComponent};

pub use config::ReconcilerConfig;

pub use engine::{EffectTag, Fiber, FiberArena, FiberId, FiberTag, StateNode};

pub use error::{HostError, ReconcileError, RenderError};

pub use reconciler::{
    AppliedEffect, CommitReport, Reconciler, SliceReport, SliceStatus, UpdateQueue, UpdateRequest,
};

pub use renderer::{diff_props, HostOp, HostRenderer, HostSnapshot, MemoryHost, PropChange};

pub use scheduler::{Deadline, IdleTask, SliceDeadline, UnitBudget};
