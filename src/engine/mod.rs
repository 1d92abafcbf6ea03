//! Fiber Engine - The persistent tree model.
//!
//! The engine holds the data structures the reconciler works on:
//! - Fiber: one tree position for one cycle (type, props, links, effects)
//! - FiberArena: slot storage with generational handles
//!
//! # Architecture
//!
//! Fibers are NOT linked objects. They are records in one arena, linked by
//! handles:
//!
//! ```text
//! committed tree            work-in-progress tree
//! root ◄──────alternate──── root'
//!  └─ div ◄───alternate────  └─ div'      (Update)
//!      └─ span ◄─alternate──     └─ span' (Update)
//! ```
//!
//! The committed tree is read, never rewritten, while the next tree is built
//! beside it; the only writes it sees are Deletion tags and state patches,
//! both of which an aborted cycle rolls back.

mod arena;
mod fiber;

pub use arena::*;
pub use fiber::*;
