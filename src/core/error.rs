//! Startup errors.
//!
//! [`AppError`] is the only error that ends the process, and it is only raised
//! while loading config and building the module registry. Everything that can
//! go wrong during a conversation (scan, resolution, git, LLM) has its own
//! enum and is turned into reply text by the dispatch layer.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Unreadable or invalid configuration file or value.
    #[error("config error: {0}")]
    Config(String),

    #[error("project root is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// The module set cannot be routed: no fallback, bad priorities, mode
    /// mismatch.
    #[error("module registry error: {0}")]
    Registry(String),

    #[error("llm provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
