//! Resolved configuration types consumed by the rest of the crate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM collaborator configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"`, `"openai"`).
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// A `[modules.<name>]` registration record.
///
/// Every field is optional on top of the module's built-in descriptor: a
/// record only needs the keys it changes.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub enabled: bool,
    pub triggers: Option<Vec<String>>,
    pub priority: Option<i32>,
    /// Declared mode kind, checked against the module at startup.
    pub mode: Option<String>,
}

impl Default for ModuleRecord {
    fn default() -> Self {
        Self { enabled: true, triggers: None, priority: None, mode: None }
    }
}

/// Project-mode settings (`[project]`).
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Directory scanned on entry. Defaults to the working directory.
    pub root: PathBuf,
    /// Character ceiling for the assembled LLM context.
    pub max_prompt_chars: usize,
    /// Files larger than this many bytes are not indexed.
    pub max_file_size: u64,
    /// Lowercase extensions with a leading dot (`".rs"`).
    pub extensions: Vec<String>,
    /// Directory names that are never descended into. `*.suffix` matches by suffix.
    pub ignore_dirs: Vec<String>,
    pub auto_scan: bool,
    /// Response token limit passed to the LLM.
    pub max_tokens: u32,
    pub git_timeout_seconds: u64,
    pub include_git_in_context: bool,
}

impl ProjectConfig {
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_seconds)
    }
}

/// Coding-module settings (`[coding]`).
#[derive(Debug, Clone)]
pub struct CodingConfig {
    /// Response token limit passed to the LLM.
    pub max_tokens: u32,
}

/// Terminal-module settings (`[terminal]`).
#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub timeout_seconds: u64,
}

/// Fully-resolved assistant configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// Directory holding the layered prompt fragments.
    pub prompts_dir: PathBuf,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY` — never sourced from TOML.
    pub llm_api_key: Option<String>,
    /// Registration records keyed by module name.
    pub modules: HashMap<String, ModuleRecord>,
    pub project: ProjectConfig,
    pub coding: CodingConfig,
    pub terminal: TerminalConfig,
}

impl Config {
    /// Registration record for `name`, or the all-defaults record.
    pub fn module_record(&self, name: &str) -> ModuleRecord {
        self.modules.get(name).cloned().unwrap_or_default()
    }
}
