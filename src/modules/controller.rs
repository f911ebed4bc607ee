//! Per-mode conversational state machine.
//!
//! The controller owns the module registry and the currently active module.
//! It is driven one utterance at a time; the next call only starts after the
//! previous one returned.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AppError;

use super::descriptor::ModeKind;
use super::router::{Selection, TriggerRouter};
use super::{phrases, InputMode, Module, ModuleDescriptor, Outcome, Reply, Services, Turn};

/// Result of one dispatched utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub input_mode: Option<InputMode>,
    /// The user asked to end the program.
    pub shutdown: bool,
}

impl Response {
    fn say(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }
}

pub struct ModeController {
    router: TriggerRouter,
    /// Registration order; indices match the router's.
    modules: Vec<Module>,
    services: Services,
    active: Option<usize>,
}

impl ModeController {
    /// Build from the configured registry. Registry problems are fatal.
    pub fn new(services: Services) -> Result<Self, AppError> {
        let registry = super::registry(&services.config)?;
        Self::with_modules(registry, services)
    }

    pub fn with_modules(registry: Vec<(Module, ModuleDescriptor)>, services: Services) -> Result<Self, AppError> {
        let (modules, descriptors): (Vec<Module>, Vec<ModuleDescriptor>) = registry.into_iter().unzip();
        let router = TriggerRouter::new(descriptors)?;
        for d in router.descriptors() {
            info!(module = %d.name, priority = d.priority, mode = %d.mode, triggers = d.triggers.len(), "module registered");
        }
        Ok(Self { router, modules, services, active: None })
    }

    /// Name of the module holding the conversation, if any.
    pub fn active_module(&self) -> Option<&str> {
        self.active.and_then(|i| self.router.descriptor(i)).map(|d| d.name.as_str())
    }

    pub fn router(&self) -> &TriggerRouter {
        &self.router
    }

    /// Route and run one utterance.
    pub async fn dispatch(&mut self, utterance: &str, interrupt: &CancellationToken) -> Response {
        let normalized = phrases::normalize(utterance);
        if normalized.is_empty() {
            return Response::default();
        }

        if self.active.is_none() && phrases::is_shutdown(&normalized) {
            info!("shutdown requested");
            return Response { text: "Goodbye.".into(), input_mode: None, shutdown: true };
        }

        let turn = Turn { utterance: utterance.trim(), normalized: &normalized, interrupt };
        let selection = self.router.select(&normalized, self.active);
        debug!(?selection, utterance = %turn.utterance, "routed");

        match selection {
            Selection::Exit(index) => {
                let farewell = self.modules[index].exit();
                info!(module = self.name(index), "left module");
                self.active = None;
                Response::say(farewell)
            }
            Selection::Continue(index) => {
                let reply = self.continue_in(index, turn).await;
                self.settle(index, reply)
            }
            Selection::Enter(index) => {
                info!(module = self.name(index), "entered module");
                let reply = self.modules[index].enter(turn, &self.services).await;
                self.settle(index, reply)
            }
        }
    }

    async fn continue_in(&mut self, index: usize, turn: Turn<'_>) -> Reply {
        let module = &mut self.modules[index];
        let Some(pending) = module.pending().map(str::to_string) else {
            return module.handle(turn, &self.services).await;
        };

        if phrases::is_confirm(turn.normalized) {
            module.confirm(turn, &self.services).await
        } else if phrases::is_cancel(turn.normalized) {
            module.cancel()
        } else {
            // Anything else keeps the action pending.
            Reply::pending(format!("Still waiting on `{pending}`. Say \"do it\" to run it or \"cancel\" to drop it."))
        }
    }

    /// Apply the mode kind's transition rules to `reply`.
    fn settle(&mut self, index: usize, reply: Reply) -> Response {
        let mode = self.router.descriptor(index).map(|d| d.mode).unwrap_or(ModeKind::SingleTurn);
        let stays = match mode {
            ModeKind::SingleTurn => false,
            ModeKind::MultiTurn | ModeKind::Continuous => reply.outcome != Outcome::Done,
            ModeKind::Confirmation => reply.outcome != Outcome::Done,
        };

        if stays {
            self.active = Some(index);
        } else {
            if mode != ModeKind::SingleTurn {
                // Completion tears the session down like an exit phrase; the
                // module's own reply is the last word.
                self.modules[index].exit();
                info!(module = self.name(index), "module finished");
            }
            self.active = None;
        }

        Response { text: reply.text, input_mode: reply.input_mode, shutdown: false }
    }

    fn name(&self, index: usize) -> &str {
        self.router.descriptor(index).map(|d| d.name.as_str()).unwrap_or("?")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::llm::LlmProvider;
    use std::sync::Arc;

    fn controller(dir: &std::path::Path) -> ModeController {
        let config = Arc::new(Config::test_default(dir));
        ModeController::new(Services::new(LlmProvider::Dummy(DummyProvider), config)).unwrap()
    }

    #[tokio::test]
    async fn fallback_is_single_turn() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path());
        let token = CancellationToken::new();
        let r = c.dispatch("what is the capital of France", &token).await;
        assert!(r.text.contains("[echo]"));
        assert_eq!(c.active_module(), None);
    }

    #[tokio::test]
    async fn shutdown_only_at_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path());
        let token = CancellationToken::new();

        c.dispatch("calendar", &token).await;
        assert_eq!(c.active_module(), Some("calendar"));
        // Inside a module "quit" leaves the module.
        let r = c.dispatch("quit", &token).await;
        assert!(!r.shutdown);
        assert_eq!(c.active_module(), None);

        assert!(c.dispatch("tot ziens", &token).await.shutdown);
    }

    #[tokio::test]
    async fn multi_turn_completes_and_returns() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path());
        let token = CancellationToken::new();

        let r = c.dispatch("add to calendar", &token).await;
        assert!(r.text.contains("What"));
        assert_eq!(c.active_module(), Some("calendar"));
        c.dispatch("dentist", &token).await;
        assert_eq!(c.active_module(), Some("calendar"));
        let r = c.dispatch("tomorrow at 10", &token).await;
        assert!(r.text.contains("dentist"));
        assert_eq!(c.active_module(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn confirmation_keeps_pending_until_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path());
        let token = CancellationToken::new();

        let r = c.dispatch("run command echo hello", &token).await;
        assert!(r.text.contains("echo hello"));
        assert_eq!(c.active_module(), Some("terminal"));

        let r = c.dispatch("what does it do", &token).await;
        assert!(r.text.contains("echo hello"));
        assert_eq!(c.active_module(), Some("terminal"));

        let r = c.dispatch("do it", &token).await;
        assert!(r.text.contains("hello"));
        assert_eq!(c.active_module(), None);
    }

    #[tokio::test]
    async fn cancel_discards_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path());
        let token = CancellationToken::new();

        c.dispatch("terminal disk space", &token).await;
        let r = c.dispatch("annuleer", &token).await;
        assert!(r.text.contains("Cancelled"));
        assert_eq!(c.active_module(), None);
    }

    #[tokio::test]
    async fn exit_phrase_discards_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = controller(dir.path());
        let token = CancellationToken::new();

        c.dispatch("run command ls", &token).await;
        c.dispatch("done", &token).await;
        assert_eq!(c.active_module(), None);
        // A confirm word now goes through routing, not to the old command.
        let r = c.dispatch("do it", &token).await;
        assert!(r.text.contains("[echo]"));
    }
}
