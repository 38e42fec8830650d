//! Shared domain types for Talkgate.
//!
//! This crate contains the domain types used across the Talkgate workspace:
//! entitlements, conversation sessions, history turns, topic prompts, capture
//! records, transport events, LLM request shapes, configuration, and the
//! error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod capture;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod event;
pub mod history;
pub mod llm;
pub mod prompt;
pub mod session;
