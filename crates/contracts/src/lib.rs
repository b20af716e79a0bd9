//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Ownership Model
//! - A `FrameBuffer` is moved, never cloned, across a disposal boundary
//! - Exactly one component may dispose of a buffer at any instant
//! - Handoff points: queue send, pool recycle, explicit drop

mod blueprint;
mod error;
mod frame;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use sink::*;
