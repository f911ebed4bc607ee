//! Conversation modules and the routing engine that drives them.
//!
//! ```text
//! utterance ─▶ TriggerRouter ─▶ ModeController ─▶ Module::{enter, handle, confirm, cancel, exit}
//! ```
//!
//! Modules are a closed set, dispatched through the [`Module`] enum. Each one
//! owns its session state; the controller decides, from the module's
//! [`ModeKind`], when that state is created and torn down.

pub mod calendar;
pub mod chat;
pub mod coding;
pub mod controller;
pub mod descriptor;
pub mod phrases;
pub mod router;
pub mod terminal;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::llm::{LlmProvider, ProviderError};
use crate::project::ProjectModule;

pub use controller::{ModeController, Response};
pub use descriptor::{ModeKind, ModuleDescriptor};
pub use router::{Selection, TriggerRouter};

/// How the user is talking to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Voice,
    Typed,
}

/// What the module wants after producing a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The module is finished; control returns to global routing.
    Done,
    /// Keep routing input to this module.
    Continue,
    /// A pending action awaits confirm or cancel.
    Pending,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub outcome: Outcome,
    /// Requested switch of input mode, reported to the console.
    pub input_mode: Option<InputMode>,
}

impl Reply {
    pub fn done(text: impl Into<String>) -> Self {
        Self { text: text.into(), outcome: Outcome::Done, input_mode: None }
    }

    pub fn stay(text: impl Into<String>) -> Self {
        Self { text: text.into(), outcome: Outcome::Continue, input_mode: None }
    }

    pub fn pending(text: impl Into<String>) -> Self {
        Self { text: text.into(), outcome: Outcome::Pending, input_mode: None }
    }
}

/// One recognized utterance on its way through dispatch.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    /// As recognized, original casing.
    pub utterance: &'a str,
    /// See [`phrases::normalize`].
    pub normalized: &'a str,
    /// Cancelled when the user says "stop" while the turn is running.
    pub interrupt: &'a CancellationToken,
}

/// Collaborators shared by all modules.
#[derive(Debug, Clone)]
pub struct Services {
    pub llm: LlmProvider,
    pub config: Arc<Config>,
}

impl Services {
    pub fn new(llm: LlmProvider, config: Arc<Config>) -> Self {
        Self { llm, config }
    }

    /// Ask the LLM, giving up early if the turn is interrupted. `None` means
    /// interrupted.
    pub async fn complete(
        &self,
        content: &str,
        system: &str,
        max_tokens: u32,
        interrupt: &CancellationToken,
    ) -> Option<Result<String, ProviderError>> {
        tokio::select! {
            biased;

            _ = interrupt.cancelled() => {
                info!("llm request interrupted");
                None
            }
            result = self.llm.complete(content, Some(system), max_tokens) => {
                if let Err(e) = &result {
                    warn!(provider = self.llm.name(), error = %e, "llm request failed");
                }
                Some(result)
            }
        }
    }
}

/// User-facing text for a failed or interrupted LLM call.
pub fn llm_failure_text(result: Option<ProviderError>) -> String {
    match result {
        None => "Stopped.".to_string(),
        Some(e) => format!("Sorry, the language model is unavailable right now ({e})."),
    }
}

/// Every module the assistant knows.
#[derive(Debug)]
pub enum Module {
    Chat(chat::ChatModule),
    Calendar(calendar::CalendarModule),
    Coding(coding::CodingModule),
    Terminal(terminal::TerminalModule),
    Project(Box<ProjectModule>),
}

impl Module {
    pub fn name(&self) -> &'static str {
        match self {
            Module::Chat(_) => chat::NAME,
            Module::Calendar(_) => calendar::NAME,
            Module::Coding(_) => coding::NAME,
            Module::Terminal(_) => terminal::NAME,
            Module::Project(_) => crate::project::NAME,
        }
    }

    /// Built-in descriptor before any `[modules.<name>]` record is applied.
    pub fn descriptor(&self) -> ModuleDescriptor {
        match self {
            Module::Chat(_) => chat::descriptor(),
            Module::Calendar(_) => calendar::descriptor(),
            Module::Coding(_) => coding::descriptor(),
            Module::Terminal(_) => terminal::descriptor(),
            Module::Project(_) => crate::project::descriptor(),
        }
    }

    /// First utterance after routing selected this module.
    pub async fn enter(&mut self, turn: Turn<'_>, services: &Services) -> Reply {
        match self {
            Module::Chat(m) => m.handle(turn, services).await,
            Module::Calendar(m) => m.enter(turn),
            Module::Coding(m) => m.enter(turn, services).await,
            Module::Terminal(m) => m.enter(turn),
            Module::Project(m) => m.enter(turn, services).await,
        }
    }

    /// A later utterance while the module is active.
    pub async fn handle(&mut self, turn: Turn<'_>, services: &Services) -> Reply {
        match self {
            Module::Chat(m) => m.handle(turn, services).await,
            Module::Calendar(m) => m.handle(turn),
            Module::Coding(m) => m.handle(turn, services).await,
            Module::Terminal(m) => m.handle(turn),
            Module::Project(m) => m.handle(turn, services).await,
        }
    }

    /// Description of the action awaiting confirmation, if any.
    pub fn pending(&self) -> Option<&str> {
        match self {
            Module::Terminal(m) => m.pending(),
            _ => None,
        }
    }

    pub async fn confirm(&mut self, turn: Turn<'_>, services: &Services) -> Reply {
        match self {
            Module::Terminal(m) => m.confirm(turn, services).await,
            _ => Reply::done("Nothing to confirm."),
        }
    }

    pub fn cancel(&mut self) -> Reply {
        match self {
            Module::Terminal(m) => m.cancel(),
            _ => Reply::done("Nothing to cancel."),
        }
    }

    /// Tear down session state and return the farewell line.
    pub fn exit(&mut self) -> String {
        match self {
            Module::Chat(_) => String::new(),
            Module::Calendar(m) => m.exit(),
            Module::Coding(m) => m.exit(),
            Module::Terminal(m) => m.exit(),
            Module::Project(m) => m.exit(),
        }
    }
}

/// Build the enabled modules in registration order, each with its
/// configured descriptor.
pub fn registry(config: &Config) -> Result<Vec<(Module, ModuleDescriptor)>, AppError> {
    let all = [
        Module::Chat(chat::ChatModule::new()),
        Module::Calendar(calendar::CalendarModule::new()),
        Module::Coding(coding::CodingModule::new()),
        Module::Terminal(terminal::TerminalModule::new()),
        Module::Project(Box::new(ProjectModule::new())),
    ];

    for name in config.modules.keys() {
        if !all.iter().any(|m| m.name() == name) {
            warn!(module = %name, "config has a record for an unknown module, ignored");
        }
    }

    let mut out = Vec::new();
    for module in all {
        let record = config.module_record(module.name());
        if !record.enabled {
            info!(module = module.name(), "module disabled by config");
            continue;
        }
        let mut descriptor = module.descriptor();
        descriptor.apply(&record)?;
        out.push((module, descriptor));
    }
    Ok(out)
}
