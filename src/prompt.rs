//! Layered system prompts.
//!
//! Prompts are assembled from plain-text fragments under the configured
//! prompts directory (`config/prompts/` by default). Each layer is appended
//! in order; a missing file falls back to a built-in text so the assistant
//! still works from any working directory.
//!
//! ## Layer ordering convention
//!
//! ```text
//! 0. id.md        — assistant persona (who it is)
//! 1. <module>.md  — module instructions (chat.md, coding.md, project.md)
//! 2. <body>       — per-request text appended by the caller
//! ```
//!
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all layers are joined.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const SEPARATOR: &str = "\n\n";

const BUILTIN_ID: &str = "You are {{name}}, a voice assistant. Replies are read aloud or shown in a \
terminal, so keep them short and plain.";

const BUILTIN_CHAT: &str = "Answer general questions briefly and directly. Use the recent \
conversation when the user refers back to it.";

const BUILTIN_CODING: &str = "You are pair programming with the user. Give concrete, minimal code \
and explain it in one or two sentences.";

const BUILTIN_PROJECT: &str = "You are a concise programming assistant with project awareness.

RULES:
1. Answer about the loaded files and the project tree you are given.
2. Reference files by their relative path.
3. Keep answers short; show only the code that matters.
4. If something is not in the context, say so instead of guessing.
5. Suggest which file to open when more context is needed.

CONTEXT FORMAT:
[PROJECT: name] starts the file listing, [FILE: path] starts a loaded file, [GIT] starts the repository state.

RESPONSE STYLE:
Plain sentences first, code blocks only when they help.";

fn builtin(filename: &str) -> Option<&'static str> {
    match filename {
        "id.md" => Some(BUILTIN_ID),
        "chat.md" => Some(BUILTIN_CHAT),
        "coding.md" => Some(BUILTIN_CODING),
        "project.md" => Some(BUILTIN_PROJECT),
        _ => None,
    }
}

/// Fluent builder that assembles a layered prompt from template files.
///
/// ```
/// use parley::prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new("/nonexistent")
///     .append("Question: {{question}}")
///     .var("question", "where is main?")
///     .build();
/// assert_eq!(prompt, "Question: where is main?");
/// ```
pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self { prompts_dir: prompts_dir.into(), parts: Vec::new(), vars: HashMap::new() }
    }

    /// Append a layer by loading `filename` from the prompts directory,
    /// falling back to the built-in text for known layers. Unknown missing
    /// layers are skipped.
    pub fn layer(mut self, filename: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(_) => {
                tracing::debug!("prompt: layer '{}' not found, using built-in", path.display());
                builtin(filename).map(str::to_string)
            }
        };
        if let Some(text) = text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                self.parts.push(trimmed.to_string());
            }
        }
        self
    }

    /// Directly append a text fragment.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
        self
    }

    /// Register a single `{{key}}` substitution.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Assemble all layers, join with blank lines, and apply variable substitution.
    pub fn build(self) -> String {
        let mut prompt = self.parts.join(SEPARATOR);
        for (k, v) in &self.vars {
            let placeholder = format!("{{{{{}}}}}", k);
            prompt = prompt.replace(&placeholder, v);
        }
        prompt
    }
}

/// Persona layer plus the `<module>.md` layer, with `{{name}}` bound to the
/// assistant name.
pub fn preamble(prompts_dir: impl AsRef<Path>, assistant: &str, module: &str) -> PromptBuilder {
    PromptBuilder::new(prompts_dir.as_ref())
        .layer("id.md")
        .layer(&format!("{module}.md"))
        .var("name", assistant)
}
