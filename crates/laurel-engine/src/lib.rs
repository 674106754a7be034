//! The achievement lifecycle engine.
//!
//! [`LifecycleEngine`] orchestrates every change to an achievement across the
//! content store and the reference store: it authorizes the caller, enforces
//! the status state machine, writes to both stores in a fixed order, and
//! compensates when the second write fails. It holds no mutable state of its
//! own; concurrent reviewers are serialised by the reference store's
//! conditional writes.

mod assemble;
mod lifecycle;

pub mod error;

pub use error::{Error, Result};
pub use lifecycle::{DEFAULT_CALL_TIMEOUT, EngineConfig, LifecycleEngine, NewAchievement};
