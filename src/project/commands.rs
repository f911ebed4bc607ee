//! Project-mode command surface.

use crate::modules::phrases::{self, strip_prefix};
use crate::modules::InputMode;

const TREE: &[&str] = &["show project", "project tree", "show tree", "what files are here", "list files"];
const RESCAN: &[&str] = &["rescan", "scan again", "scan project", "re-scan", "refresh", "index again"];
const FIND: &[&str] = &["find", "where is", "search for", "search", "locate"];
const ADD: &[&str] = &["also open", "add"];
const OPEN: &[&str] = &["open"];
const CLOSE_ALL: &[&str] = &["close all", "clear all", "unload all"];
const CLOSE: &[&str] = &["close", "unload"];
const LOADED: &[&str] = &["what's loaded", "whats loaded", "loaded files", "show loaded", "list loaded", "loaded"];
const GIT_STATUS: &[&str] = &["git status", "what changed", "status", "show status", "changes"];
const GIT_DIFF: &[&str] = &["git diff", "show diff", "show changes", "review changes", "diff"];
const GIT_LOG: &[&str] = &["git log", "recent commits", "show log", "commit history", "log"];
const HELP: &[&str] = &["help", "commands", "what can i say"];

pub const HELP_TEXT: &str = "Project commands:
  show project / project tree     file tree
  find <name>                     search files and symbols
  open <name> / also open <name>  load a file into context
  close <name> / close all        unload files
  what's loaded                   list loaded files
  rescan                          index the project again
  git status / git diff / git log repository state
  type / voice                    switch input mode
  done                            leave project mode
Anything else is a question about the loaded code.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectCommand {
    Tree,
    Rescan,
    Find(String),
    /// Load a file; `open` and `also open` both add to the loaded set.
    Open(String),
    Close(String),
    CloseAll,
    Loaded,
    GitStatus,
    /// Optional spoken file name to limit the diff to.
    GitDiff(Option<String>),
    GitLog,
    InputMode(InputMode),
    Help,
    /// Pick from the last ambiguous open.
    Choose(usize),
    /// Free text for the language model.
    Ask(String),
}

/// Parse one utterance. `choosing` enables bare ordinals ("2", "second").
pub fn parse(utterance: &str, normalized: &str, choosing: bool) -> ProjectCommand {
    if choosing && let Some(n) = phrases::ordinal(normalized) {
        return ProjectCommand::Choose(n);
    }
    if let Some(mode) = phrases::input_mode(normalized) {
        return ProjectCommand::InputMode(mode);
    }

    let is = |set: &[&str]| set.contains(&normalized);
    if is(TREE) {
        return ProjectCommand::Tree;
    }
    if is(RESCAN) {
        return ProjectCommand::Rescan;
    }
    if is(CLOSE_ALL) {
        return ProjectCommand::CloseAll;
    }
    if is(LOADED) {
        return ProjectCommand::Loaded;
    }
    if is(GIT_STATUS) {
        return ProjectCommand::GitStatus;
    }
    if is(GIT_DIFF) {
        return ProjectCommand::GitDiff(None);
    }
    if is(GIT_LOG) {
        return ProjectCommand::GitLog;
    }
    if is(HELP) {
        return ProjectCommand::Help;
    }

    let arg = |set: &[&str]| strip_prefix(utterance, normalized, set).filter(|a| !a.is_empty()).map(str::to_string);
    if let Some(path) = arg(&["git diff"]) {
        return ProjectCommand::GitDiff(Some(path));
    }
    if let Some(query) = arg(FIND) {
        return ProjectCommand::Find(query);
    }
    if let Some(name) = arg(ADD).or_else(|| arg(OPEN)) {
        return ProjectCommand::Open(name);
    }
    if let Some(name) = arg(CLOSE) {
        return ProjectCommand::Close(name);
    }

    ProjectCommand::Ask(utterance.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> ProjectCommand {
        parse(text, &phrases::normalize(text), false)
    }

    #[test]
    fn fixed_phrases() {
        assert_eq!(p("Show project"), ProjectCommand::Tree);
        assert_eq!(p("scan again"), ProjectCommand::Rescan);
        assert_eq!(p("What's loaded?"), ProjectCommand::Loaded);
        assert_eq!(p("close all"), ProjectCommand::CloseAll);
        assert_eq!(p("what changed"), ProjectCommand::GitStatus);
        assert_eq!(p("show changes"), ProjectCommand::GitDiff(None));
        assert_eq!(p("recent commits"), ProjectCommand::GitLog);
        assert_eq!(p("typ"), ProjectCommand::InputMode(InputMode::Typed));
    }

    #[test]
    fn commands_with_arguments_keep_case() {
        assert_eq!(p("open ProjectModule"), ProjectCommand::Open("ProjectModule".into()));
        assert_eq!(p("also open config.py"), ProjectCommand::Open("config.py".into()));
        assert_eq!(p("add utils"), ProjectCommand::Open("utils".into()));
        assert_eq!(p("where is Scanner"), ProjectCommand::Find("Scanner".into()));
        assert_eq!(p("close module.py"), ProjectCommand::Close("module.py".into()));
        assert_eq!(p("git diff src/main.rs"), ProjectCommand::GitDiff(Some("src/main.rs".into())));
    }

    #[test]
    fn free_text_is_a_question() {
        assert_eq!(p("How does the resolver pick a file?"), ProjectCommand::Ask("How does the resolver pick a file?".into()));
        // A bare verb without an argument is not a command.
        assert_eq!(p("open"), ProjectCommand::Ask("open".into()));
    }

    #[test]
    fn ordinals_only_while_choosing() {
        assert_eq!(parse("second", "second", true), ProjectCommand::Choose(2));
        assert_eq!(parse("2", "2", false), ProjectCommand::Ask("2".into()));
    }
}
