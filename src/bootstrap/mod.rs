//! Bootstrap layer — modules that run before the assistant starts.
//!
//! - **logger** — tracing-subscriber initialisation.

pub mod logger;
