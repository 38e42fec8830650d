//! Business logic and repository trait definitions for Talkgate.
//!
//! This crate defines the "ports" (repository traits and the `LlmProvider`
//! trait) that the infrastructure layer implements, plus the services and
//! the conversation orchestrator built on them. It depends only on
//! `talkgate-types` -- never on `talkgate-infra` or any database/IO crate.

pub mod conversation;
pub mod llm;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
