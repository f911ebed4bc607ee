//! Terminal: proposes a shell command and runs it once confirmed.

use std::time::Duration;

use tokio::process::Command;
use tracing::info;

use crate::process::{self, RunError};

use super::{phrases, ModeKind, ModuleDescriptor, Reply, Services, Turn};

pub const NAME: &str = "terminal";

const TRIGGERS: &[&str] =
    &["run command", "terminal", "execute", "shell", "run terminal", "command line", "voer uit", "commando"];

/// Stripped from the utterance to leave the command itself. Longest first.
const COMMAND_PREFIXES: &[&str] =
    &["run terminal", "run command", "command line", "voer uit", "commando", "execute", "terminal", "command", "shell", "run"];

/// Spoken names for common commands.
const ALIASES: &[(&str, &str)] = &[
    ("disk space", "df -h"),
    ("disk usage", "df -h"),
    ("list files", "ls -la"),
    ("current directory", "pwd"),
    ("where am i", "pwd"),
    ("date", "date"),
    ("memory", "free -h"),
    ("uptime", "uptime"),
    ("git status", "git status"),
];

/// Output lines shown in the reply.
const SHOWN_LINES: usize = 30;

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(NAME, TRIGGERS, 75, ModeKind::Confirmation)
}

#[derive(Debug, Default)]
pub struct TerminalModule {
    pending: Option<String>,
}

impl TerminalModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn enter(&mut self, turn: Turn<'_>) -> Reply {
        self.pending = None;
        match phrases::strip_prefix(turn.utterance, turn.normalized, COMMAND_PREFIXES).filter(|c| !c.is_empty()) {
            Some(command) => self.propose(command),
            None => Reply::stay("Which command should I run?"),
        }
    }

    pub fn handle(&mut self, turn: Turn<'_>) -> Reply {
        self.propose(turn.utterance.trim())
    }

    fn propose(&mut self, spoken: &str) -> Reply {
        let lowered = phrases::normalize(spoken);
        let command = ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map(|(_, cmd)| cmd.to_string())
            .unwrap_or_else(|| spoken.to_string());
        let text = format!("Run `{command}`? Say \"do it\" or \"cancel\".");
        self.pending = Some(command);
        Reply::pending(text)
    }

    pub async fn confirm(&mut self, turn: Turn<'_>, services: &Services) -> Reply {
        let Some(command) = self.pending.take() else {
            return Reply::done("Nothing to run.");
        };
        let config = &services.config;
        info!(%command, cwd = %config.project.root.display(), "running confirmed command");

        let mut cmd = shell(&command);
        cmd.current_dir(&config.project.root);
        let timeout = Duration::from_secs(config.terminal.timeout_seconds);

        let result = tokio::select! {
            biased;

            _ = turn.interrupt.cancelled() => return Reply::done("Stopped."),
            result = process::run_with_timeout(cmd, timeout) => result,
        };

        match result {
            Ok(output) => {
                let mut body = output.stdout.trim_end().to_string();
                if !output.success() {
                    let stderr = output.stderr.trim_end();
                    if !stderr.is_empty() {
                        if !body.is_empty() {
                            body.push('\n');
                        }
                        body.push_str(stderr);
                    }
                }
                let mut text = clip_lines(&body);
                if output.truncated {
                    text.push_str("\n(output truncated)");
                }
                match output.code {
                    Some(0) if text.is_empty() => Reply::done("Done, no output."),
                    Some(0) => Reply::done(text),
                    Some(code) => Reply::done(format!("Exit code {code}.\n{text}").trim_end().to_string()),
                    None => Reply::done("The command was killed."),
                }
            }
            Err(RunError::TimedOut(d)) => Reply::done(format!("The command timed out after {}s.", d.as_secs())),
            Err(e) => Reply::done(format!("Could not run the command: {e}")),
        }
    }

    pub fn cancel(&mut self) -> Reply {
        match self.pending.take() {
            Some(command) => Reply::done(format!("Cancelled `{command}`.")),
            None => Reply::done("Nothing to cancel."),
        }
    }

    pub fn exit(&mut self) -> String {
        match self.pending.take() {
            Some(_) => "Command discarded.".to_string(),
            None => "Leaving the terminal.".to_string(),
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(not(unix))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

fn clip_lines(text: &str) -> String {
    let total = text.lines().count();
    if total <= SHOWN_LINES {
        return text.to_string();
    }
    let mut out: Vec<&str> = text.lines().take(SHOWN_LINES).collect();
    let more = format!("... ({} more lines)", total - SHOWN_LINES);
    out.push(&more);
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn turn<'a>(text: &'a str, norm: &'a str, token: &'a CancellationToken) -> Turn<'a> {
        Turn { utterance: text, normalized: norm, interrupt: token }
    }

    #[test]
    fn aliases_and_prefixes() {
        let token = CancellationToken::new();
        let mut t = TerminalModule::new();
        t.enter(turn("terminal disk space", "terminal disk space", &token));
        assert_eq!(t.pending(), Some("df -h"));

        t.enter(turn("Run command ls -la src", "run command ls -la src", &token));
        assert_eq!(t.pending(), Some("ls -la src"));
    }

    #[test]
    fn dutch_prefixes() {
        let token = CancellationToken::new();
        let mut t = TerminalModule::new();
        t.enter(turn("Voer uit ls -la", "voer uit ls -la", &token));
        assert_eq!(t.pending(), Some("ls -la"));

        t.enter(turn("commando schijfruimte", "commando schijfruimte", &token));
        assert_eq!(t.pending(), Some("schijfruimte"));
    }

    #[test]
    fn asks_when_no_command_given() {
        let token = CancellationToken::new();
        let mut t = TerminalModule::new();
        let reply = t.enter(turn("terminal", "terminal", &token));
        assert_eq!(t.pending(), None);
        assert_eq!(reply.outcome, crate::modules::Outcome::Continue);
        t.handle(turn("current directory", "current directory", &token));
        assert_eq!(t.pending(), Some("pwd"));
    }

    #[test]
    fn cancel_clears() {
        let token = CancellationToken::new();
        let mut t = TerminalModule::new();
        t.enter(turn("shell uptime", "shell uptime", &token));
        assert_eq!(t.cancel().text, "Cancelled `uptime`.");
        assert!(t.pending().is_none());
    }

    #[test]
    fn long_output_is_clipped() {
        let text: String = (0..40).map(|i| format!("{i}\n")).collect();
        let clipped = clip_lines(text.trim_end());
        assert!(clipped.ends_with("... (10 more lines)"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn confirmed_command_runs_in_project_root() {
        use crate::config::Config;
        use crate::llm::providers::dummy::DummyProvider;
        use crate::llm::LlmProvider;
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let services = Services::new(LlmProvider::Dummy(DummyProvider), Arc::new(Config::test_default(dir.path())));
        let token = CancellationToken::new();

        let mut t = TerminalModule::new();
        t.enter(turn("run command ls", "run command ls", &token));
        let reply = t.confirm(turn("do it", "do it", &token), &services).await;
        assert!(reply.text.contains("marker.txt"));

        t.enter(turn("run command exit 3", "run command exit 3", &token));
        let reply = t.confirm(turn("do it", "do it", &token), &services).await;
        assert!(reply.text.starts_with("Exit code 3."));
    }
}
