//! The conversation core: per-user serialization, reply templates, and the
//! orchestrator that drives every inbound event.

pub mod locks;
pub mod orchestrator;
pub mod replies;

pub use locks::UserLocks;
pub use orchestrator::{Orchestrator, OrchestratorSettings};
