//! parley — a modular voice assistant core.
//!
//! Every recognized utterance goes through the [`modules::TriggerRouter`] to
//! a module, whose conversational life-cycle the [`modules::ModeController`]
//! drives. The largest module, [`project`], indexes a source tree, resolves
//! spoken file names against it and builds bounded LLM context.

pub mod bootstrap;
pub mod console;
pub mod core;
pub mod llm;
pub mod modules;
pub mod output;
pub mod process;
pub mod project;
pub mod prompt;

pub use core::{config, error};
pub use bootstrap::logger;
