//! Tracing setup for Talkgate: structured `fmt` logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
