//! Infrastructure layer for Talkgate.
//!
//! Contains implementations of the ports defined in `talkgate-core`: SQLite
//! repositories, the OpenAI-compatible completion gateway, and config loading.

pub mod config;
pub mod llm;
pub mod sqlite;
