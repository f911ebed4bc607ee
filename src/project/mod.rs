//! Project mode: explore a source tree and ask the LLM about it.
//!
//! ```text
//! enter ──▶ scan ──▶ ProjectSession ──▶ commands … ──▶ exit (session dropped)
//!                     ├── index: Arc<ProjectIndex>   replaced whole on rescan
//!                     ├── loaded: LoadedFileSet      open / close / close all
//!                     └── git: GitCollaborator       status / diff / log
//! ```
//!
//! A session exists only between entry and exit. The index is never patched:
//! a rescan builds a complete new index and swaps it in, and an interrupted
//! scan leaves the previous one published.

pub mod commands;
pub mod context;
pub mod git;
pub mod index;
pub mod loaded;
pub mod resolver;
pub mod symbols;
pub mod tree;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ProjectConfig;
use crate::modules::{llm_failure_text, InputMode, ModeKind, ModuleDescriptor, Reply, Services, Turn};
use crate::prompt;

use commands::ProjectCommand;
use git::GitCollaborator;
use index::{ProjectIndex, ScanError, ScanOptions};
use loaded::{LoadError, LoadedFile, LoadedFileSet};
use resolver::{FileMatch, ResolveError};

pub const NAME: &str = "project";

const TRIGGERS: &[&str] = &[
    "project mode",
    "scan project",
    "explore project",
    "project explorer",
    "open project",
    "show project",
    "projectmodus",
    "project openen",
    "verken project",
];

/// Hits listed by `find`.
const FIND_LIMIT: usize = 15;
const LOG_LIMIT: usize = 10;

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(NAME, TRIGGERS, 86, ModeKind::Continuous)
}

/// State of one project-mode session.
#[derive(Debug)]
struct ProjectSession {
    id: Uuid,
    index: Arc<ProjectIndex>,
    loaded: LoadedFileSet,
    git: GitCollaborator,
    git_available: bool,
    /// Candidates from the last ambiguous open, numbered from 1.
    choices: Option<Vec<FileMatch>>,
}

#[derive(Debug, Default)]
pub struct ProjectModule {
    session: Option<ProjectSession>,
}

impl ProjectModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files in the current index, 0 outside a session.
    pub fn indexed_files(&self) -> usize {
        self.session.as_ref().map(|s| s.index.files.len()).unwrap_or(0)
    }

    pub async fn enter(&mut self, turn: Turn<'_>, services: &Services) -> Reply {
        let config = &services.config.project;
        let root = config.root.clone();
        if !root.is_dir() {
            return Reply::done(format!("Project root {} is not a directory.", root.display()));
        }

        let mut session = ProjectSession {
            id: Uuid::now_v7(),
            index: Arc::new(ProjectIndex::empty(&root)),
            loaded: LoadedFileSet::new(),
            git: GitCollaborator::new(&root, config.git_timeout()),
            git_available: false,
            choices: None,
        };
        info!(session = %session.id, root = %root.display(), "project session started");

        let mut lines = Vec::new();
        if config.auto_scan {
            lines.push(session.rescan(config, turn.interrupt).await);
        } else {
            lines.push(format!("Project mode in {}. Say \"rescan\" to index it.", session.index.root_name()));
        }
        session.git_available = session.git.is_available().await;
        if !session.git_available {
            lines.push("Git is not available here.".to_string());
        }
        lines.push("Say \"help\" for commands, \"done\" to leave.".to_string());

        self.session = Some(session);
        Reply::stay(lines.join("\n"))
    }

    pub async fn handle(&mut self, turn: Turn<'_>, services: &Services) -> Reply {
        let Some(session) = self.session.as_mut() else {
            return self.enter(turn, services).await;
        };

        let command = commands::parse(turn.utterance, turn.normalized, session.choices.is_some());
        if !matches!(command, ProjectCommand::Choose(_)) {
            session.choices = None;
        }
        session.run(command, turn, services).await
    }

    pub fn exit(&mut self) -> String {
        match self.session.take() {
            Some(session) => {
                info!(session = %session.id, loaded = session.loaded.len(), "project session closed");
                format!("Leaving project mode ({}).", session.index.root_name())
            }
            None => "Leaving project mode.".to_string(),
        }
    }
}

impl ProjectSession {
    async fn run(&mut self, command: ProjectCommand, turn: Turn<'_>, services: &Services) -> Reply {
        let config = &services.config.project;
        match command {
            ProjectCommand::Tree => Reply::stay(self.tree()),
            ProjectCommand::Rescan => {
                let text = self.rescan(config, turn.interrupt).await;
                self.git_available = self.git.is_available().await;
                Reply::stay(text)
            }
            ProjectCommand::Find(query) => Reply::stay(self.find(&query)),
            ProjectCommand::Open(name) => Reply::stay(self.open(&name, config)),
            ProjectCommand::Choose(n) => Reply::stay(self.choose(n, config)),
            ProjectCommand::Close(name) => Reply::stay(match self.loaded.remove_matching(&name) {
                Some(file) => format!("Closed {}.", file.basename()),
                None => format!("No loaded file matching '{name}'."),
            }),
            ProjectCommand::CloseAll => {
                let n = self.loaded.clear();
                Reply::stay(if n == 0 { "Nothing was loaded.".to_string() } else { format!("All files closed ({n}).") })
            }
            ProjectCommand::Loaded => Reply::stay(self.loaded_listing()),
            ProjectCommand::GitStatus => Reply::stay(match self.git.status().await {
                Ok(status) if status.is_clean() => status.to_string(),
                Ok(status) => format!("Uncommitted changes: {}.\n{}", status.counts(), status.to_string().trim_end()),
                Err(e) => format!("Git is unavailable: {e}."),
            }),
            ProjectCommand::GitDiff(name) => Reply::stay(self.diff(name.as_deref()).await),
            ProjectCommand::GitLog => Reply::stay(match self.git.log(LOG_LIMIT).await {
                Ok(commits) if commits.is_empty() => "No commits yet.".to_string(),
                Ok(commits) => {
                    let lines: Vec<String> = commits.iter().map(|c| format!("  {} {}", c.hash, c.summary)).collect();
                    format!("Last {} commits:\n{}", commits.len(), lines.join("\n"))
                }
                Err(e) => format!("Git is unavailable: {e}."),
            }),
            ProjectCommand::InputMode(mode) => {
                let text = match mode {
                    InputMode::Typed => "Typed input. Still in project mode.",
                    InputMode::Voice => "Voice input. Still in project mode.",
                };
                Reply { input_mode: Some(mode), ..Reply::stay(text) }
            }
            ProjectCommand::Help => Reply::stay(commands::HELP_TEXT),
            ProjectCommand::Ask(question) => Reply::stay(self.ask(&question, turn, services).await),
        }
    }

    /// Build a new index and publish it only when complete.
    async fn rescan(&mut self, config: &ProjectConfig, interrupt: &CancellationToken) -> String {
        let root = self.index.root.clone();
        let options = ScanOptions::from_config(config);
        match index::scan(root, options, interrupt.clone()).await {
            Ok(fresh) => {
                let stats = fresh.stats.clone();
                self.index = Arc::new(fresh);
                let dropped = self.loaded.reconcile(&self.index);
                info!(
                    session = %self.id,
                    files = stats.files,
                    skipped_extension = stats.skipped_extension,
                    skipped_size = stats.skipped_size,
                    skipped_binary = stats.skipped_binary,
                    unreadable = stats.unreadable,
                    "project index published"
                );
                let mut text = format!("Indexed {}: {}.", self.index.root_name(), tree::totals_line(&self.index));
                if !dropped.is_empty() {
                    text.push_str(&format!("\nNo longer available, closed: {}.", dropped.join(", ")));
                }
                text
            }
            Err(ScanError::Cancelled) => {
                warn!(session = %self.id, "scan interrupted, previous index kept");
                format!("Scan stopped. Keeping the previous index ({} files).", self.index.files.len())
            }
            Err(e) => format!("Cannot scan: {e}."),
        }
    }

    fn tree(&self) -> String {
        if self.index.is_empty() {
            return "No files indexed. Say \"rescan\" to scan the project.".to_string();
        }
        tree::ascii_tree(&self.index)
    }

    fn find(&self, query: &str) -> String {
        let hits = resolver::search(query, &self.index);
        if hits.is_empty() {
            return format!("Nothing matches '{query}'.");
        }
        let mut lines = vec![format!("{} match(es) for '{query}':", hits.len())];
        for hit in hits.iter().take(FIND_LIMIT) {
            let location = match hit.line {
                Some(line) => format!("{}:{line}", hit.rel_path),
                None => hit.rel_path.clone(),
            };
            lines.push(format!("  [{}] {}  {location}", hit.kind.marker(), hit.name));
        }
        if hits.len() > FIND_LIMIT {
            lines.push(format!("  ... and {} more", hits.len() - FIND_LIMIT));
        }
        lines.join("\n")
    }

    fn open(&mut self, name: &str, config: &ProjectConfig) -> String {
        match resolver::resolve(name, &self.index) {
            Ok(found) => self.load(&found, config),
            Err(ResolveError::Ambiguous { tier, candidates }) => {
                let mut lines = vec![format!("{} files match '{name}' by {tier}:", candidates.len())];
                lines.extend(candidates.iter().enumerate().map(|(i, c)| format!("  {}. {}", i + 1, c.rel_path)));
                lines.push("Say the number of the one to open.".to_string());
                self.choices = Some(candidates);
                lines.join("\n")
            }
            Err(ResolveError::NotFound(_)) => {
                format!("Couldn't find a file matching '{name}'. Say \"show project\" to see the files.")
            }
        }
    }

    fn choose(&mut self, n: usize, config: &ProjectConfig) -> String {
        let Some(choices) = &self.choices else {
            return "There is nothing to choose from.".to_string();
        };
        let count = choices.len();
        let picked = n.checked_sub(1).and_then(|i| choices.get(i)).cloned();
        match picked {
            Some(found) => {
                self.choices = None;
                self.load(&found, config)
            }
            None => format!("Pick a number between 1 and {count}."),
        }
    }

    fn load(&mut self, found: &FileMatch, config: &ProjectConfig) -> String {
        match LoadedFile::read(found, config.max_file_size) {
            Ok(file) => {
                let mut text = format!("Loaded {} ({} lines).", file.rel_path, file.lines);
                if file.oversized {
                    text.push_str(&format!(
                        "\nWarning: this file is larger than {} bytes and uses a lot of context.",
                        config.max_file_size
                    ));
                }
                if file.clipped {
                    text.push_str(&format!("\nOnly the first {} KB were read.", file.text.len() / 1024));
                }
                text.push('\n');
                text.push_str(&file.preview());
                info!(session = %self.id, file = %file.rel_path, tier = %found.tier, "file loaded");
                if !self.loaded.insert(file) {
                    text.insert_str(0, "Reloaded. ");
                }
                text
            }
            Err(LoadError::Binary) => format!("{} looks like a binary file, not loaded.", found.rel_path),
            Err(e) => format!("Could not load {}: {e}.", found.rel_path),
        }
    }

    fn loaded_listing(&self) -> String {
        if self.loaded.is_empty() {
            return "No files loaded. Say \"open\" and a file name to load one.".to_string();
        }
        let mut lines =
            vec![format!("{} file(s) loaded, {} lines:", self.loaded.len(), self.loaded.total_lines())];
        lines.extend(self.loaded.iter().map(|f| format!("  {}  ({} lines)", f.rel_path, f.lines)));
        lines.join("\n")
    }

    async fn diff(&self, name: Option<&str>) -> String {
        let path = match name {
            None => None,
            Some(name) => match resolver::resolve(name, &self.index) {
                Ok(found) => Some(found.rel_path),
                Err(e) => return format!("Cannot diff '{name}': {e}."),
            },
        };
        match self.git.diff_summary(path.as_deref()).await {
            Ok(diff) if diff.is_empty() => "No unstaged changes.".to_string(),
            Ok(diff) => diff,
            Err(e) => format!("Git is unavailable: {e}."),
        }
    }

    /// Git state folded into the LLM context, when enabled and reachable.
    async fn git_context(&self, config: &ProjectConfig) -> Option<String> {
        if !config.include_git_in_context || !self.git_available {
            return None;
        }
        let status = match self.git.status().await {
            Ok(status) => status,
            Err(e) => {
                warn!(session = %self.id, error = %e, "git status skipped for context");
                return None;
            }
        };
        let mut text = status.to_string();
        match self.git.diff_summary(None).await {
            Ok(diff) if !diff.is_empty() => {
                text.push('\n');
                text.push_str(&diff);
            }
            Ok(_) => {}
            Err(e) => warn!(session = %self.id, error = %e, "git diff skipped for context"),
        }
        Some(text)
    }

    async fn ask(&mut self, question: &str, turn: Turn<'_>, services: &Services) -> String {
        let config = &services.config;
        let mut notes = Vec::new();

        let dropped = self.loaded.refresh();
        if !dropped.is_empty() {
            notes.push(format!("No longer on disk, closed: {}.", dropped.join(", ")));
        }

        let git = self.git_context(&config.project).await;
        let assembled = context::build(&self.index, &self.loaded, git.as_deref(), config.project.max_prompt_chars);
        let system =
            prompt::preamble(&config.prompts_dir, &config.name, NAME).append(assembled.text.as_str()).build();

        let answer = match services.complete(question, &system, config.project.max_tokens, turn.interrupt).await {
            Some(Ok(answer)) => answer,
            Some(Err(e)) => llm_failure_text(Some(e)),
            None => llm_failure_text(None),
        };
        notes.push(answer);

        if assembled.truncated || assembled.tree_summarized {
            let note = if assembled.omitted_files.is_empty() {
                "(Context was trimmed to fit the budget.)".to_string()
            } else {
                format!("(Context was trimmed to fit the budget; left out: {}.)", assembled.omitted_files.join(", "))
            };
            notes.push(note);
        }
        notes.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::llm::LlmProvider;
    use crate::modules::{phrases, Outcome};
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        services: Services,
        token: CancellationToken,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("modules/project")).unwrap();
        fs::create_dir_all(root.join("modules/chat")).unwrap();
        fs::write(root.join("modules/project/module.py"), "class ProjectModule:\n    def scan(self):\n        pass\n")
            .unwrap();
        fs::write(root.join("modules/chat/module.py"), "class ChatModule:\n    pass\n").unwrap();
        fs::write(root.join("main.py"), "def main():\n    pass\n").unwrap();
        let services = Services::new(LlmProvider::Dummy(DummyProvider), Arc::new(Config::test_default(root)));
        Fixture { _dir: dir, services, token: CancellationToken::new() }
    }

    async fn say(module: &mut ProjectModule, f: &Fixture, text: &str) -> Reply {
        let norm = phrases::normalize(text);
        module.handle(Turn { utterance: text, normalized: &norm, interrupt: &f.token }, &f.services).await
    }

    async fn entered(f: &Fixture) -> ProjectModule {
        let mut module = ProjectModule::new();
        let reply = module
            .enter(Turn { utterance: "project mode", normalized: "project mode", interrupt: &f.token }, &f.services)
            .await;
        assert_eq!(reply.outcome, Outcome::Continue);
        assert!(reply.text.contains("3 files"), "{}", reply.text);
        module
    }

    #[tokio::test]
    async fn ambiguous_open_then_ordinal() {
        let f = fixture();
        let mut m = entered(&f).await;

        let reply = say(&mut m, &f, "open module.py").await;
        assert!(reply.text.contains("1. modules/chat/module.py"));
        assert!(reply.text.contains("2. modules/project/module.py"));

        let reply = say(&mut m, &f, "the second one").await;
        assert!(reply.text.starts_with("Loaded modules/project/module.py (3 lines)"));

        let reply = say(&mut m, &f, "what's loaded").await;
        assert!(reply.text.contains("1 file(s) loaded"));
    }

    #[tokio::test]
    async fn free_text_carries_context_and_question() {
        let f = fixture();
        let mut m = entered(&f).await;
        say(&mut m, &f, "open ProjectModule").await;

        // The dummy provider echoes only the user content.
        let reply = say(&mut m, &f, "What does scan do?").await;
        assert_eq!(reply.text, "[echo] What does scan do?");
    }

    #[tokio::test]
    async fn rescan_drops_deleted_files() {
        let f = fixture();
        let mut m = entered(&f).await;
        say(&mut m, &f, "open main.py").await;
        fs::remove_file(f.services.config.project.root.join("main.py")).unwrap();

        let reply = say(&mut m, &f, "rescan").await;
        assert!(reply.text.contains("2 files"));
        assert!(reply.text.contains("closed: main.py"));
        assert!(say(&mut m, &f, "loaded").await.text.starts_with("No files loaded"));
    }

    #[tokio::test]
    async fn interrupted_rescan_keeps_previous_index() {
        let f = fixture();
        let mut m = entered(&f).await;
        f.token.cancel();
        let reply = say(&mut m, &f, "rescan").await;
        assert!(reply.text.contains("Keeping the previous index (3 files)"), "{}", reply.text);
        assert_eq!(m.indexed_files(), 3);
    }

    #[tokio::test]
    async fn input_mode_switch_stays_in_mode() {
        let f = fixture();
        let mut m = entered(&f).await;
        let reply = say(&mut m, &f, "type").await;
        assert_eq!(reply.input_mode, Some(InputMode::Typed));
        assert_eq!(reply.outcome, Outcome::Continue);
    }

    #[tokio::test]
    async fn find_and_not_found() {
        let f = fixture();
        let mut m = entered(&f).await;
        let reply = say(&mut m, &f, "find module").await;
        assert!(reply.text.contains("[C] ProjectModule  modules/project/module.py:1"));
        let reply = say(&mut m, &f, "open nonexistent_thing").await;
        assert!(reply.text.starts_with("Couldn't find a file matching"));
    }

    /// A session whose `git` is a shell script: status reports one change and
    /// diff fails.
    #[cfg(unix)]
    fn session_with_scripted_git(f: &Fixture) -> ProjectSession {
        let root = &f.services.config.project.root;
        let script = "case \"$1\" in \
            status) printf ' M main.py\\n?? notes.txt\\n' ;; \
            diff) echo 'fatal: bad revision' >&2; exit 2 ;; \
            *) echo true ;; \
            esac";
        ProjectSession {
            id: Uuid::now_v7(),
            index: Arc::new(ProjectIndex::empty(root)),
            loaded: LoadedFileSet::new(),
            git: GitCollaborator::new(root, std::time::Duration::from_secs(5)).with_program("sh", &["-c", script, "git"]),
            git_available: true,
            choices: None,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_diff_keeps_status_in_context() {
        let f = fixture();
        let session = session_with_scripted_git(&f);
        let text = session.git_context(&f.services.config.project).await.expect("git context");
        assert!(text.contains("M main.py"), "{text}");
        assert!(!text.contains("fatal"), "{text}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn git_status_reply_leads_with_counts() {
        let f = fixture();
        let mut m = ProjectModule { session: Some(session_with_scripted_git(&f)) };
        let reply = say(&mut m, &f, "what changed").await;
        assert!(reply.text.starts_with("Uncommitted changes: 1 modified, 1 untracked.\n"), "{}", reply.text);
        assert!(reply.text.contains("  ? notes.txt"));
    }

    #[tokio::test]
    async fn exit_drops_session() {
        let f = fixture();
        let mut m = entered(&f).await;
        assert_eq!(m.exit(), format!("Leaving project mode ({}).", f.services.config.project.root.file_name().unwrap().to_string_lossy()));
        assert_eq!(m.indexed_files(), 0);
    }
}
