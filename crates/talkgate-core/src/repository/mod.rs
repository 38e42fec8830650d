//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (talkgate-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod capture;
pub mod entitlement;
pub mod history;
pub mod prompt;
pub mod session;
