//! Raw TOML shape — `serde` target before resolution.
//!
//! Every section carries serde defaults, so an empty file (or no file at all)
//! yields a usable configuration.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub assistant: RawAssistant,
    #[serde(default)]
    pub llm: RawLlm,
    /// `[modules.<name>]` — one registration record per module.
    #[serde(default)]
    pub modules: HashMap<String, RawModuleEntry>,
    #[serde(default)]
    pub project: RawProject,
    #[serde(default)]
    pub coding: RawCoding,
    #[serde(default)]
    pub terminal: RawTerminal,
}

#[derive(Deserialize)]
pub(super) struct RawAssistant {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: String,
}

impl Default for RawAssistant {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_file: None,
            prompts_dir: default_prompts_dir(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
pub(super) struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawModuleEntry {
    /// Defaults to `true`; set to `false` to disable without removing the section.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub triggers: Option<Vec<String>>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct RawProject {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
    #[serde(default = "default_true")]
    pub auto_scan: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_git_timeout_seconds")]
    pub git_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub include_git_in_context: bool,
}

impl Default for RawProject {
    fn default() -> Self {
        Self {
            root: None,
            max_prompt_chars: default_max_prompt_chars(),
            max_file_size: default_max_file_size(),
            extensions: default_extensions(),
            ignore_dirs: default_ignore_dirs(),
            auto_scan: true,
            max_tokens: default_max_tokens(),
            git_timeout_seconds: default_git_timeout_seconds(),
            include_git_in_context: true,
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawCoding {
    #[serde(default = "default_coding_max_tokens")]
    pub max_tokens: u32,
}

impl Default for RawCoding {
    fn default() -> Self {
        Self { max_tokens: default_coding_max_tokens() }
    }
}

#[derive(Deserialize)]
pub(super) struct RawTerminal {
    #[serde(default = "default_terminal_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawTerminal {
    fn default() -> Self {
        Self { timeout_seconds: default_terminal_timeout_seconds() }
    }
}

pub(super) fn default_name() -> String { "parley".to_string() }
pub(super) fn default_log_level() -> String { "info".to_string() }
pub(super) fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_llm_provider() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.3 }
fn default_openai_timeout_seconds() -> u64 { 60 }
fn default_max_prompt_chars() -> usize { 32_000 }
fn default_max_file_size() -> u64 { 100_000 }
fn default_max_tokens() -> u32 { 4_000 }
fn default_git_timeout_seconds() -> u64 { 10 }
fn default_coding_max_tokens() -> u32 { 2_000 }
fn default_terminal_timeout_seconds() -> u64 { 30 }

pub(super) fn default_extensions() -> Vec<String> {
    [
        ".py", ".js", ".ts", ".jsx", ".tsx", ".go", ".rs", ".java", ".c", ".cpp", ".h", ".hpp",
        ".cs", ".rb", ".php", ".yaml", ".yml", ".toml", ".json", ".md", ".txt", ".cfg", ".ini",
        ".sh", ".bash", ".html", ".css", ".sql",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub(super) fn default_ignore_dirs() -> Vec<String> {
    [
        ".git", "__pycache__", "node_modules", "venv", ".venv", "env", ".mypy_cache",
        ".pytest_cache", ".tox", "dist", "build", "target", ".eggs", "*.egg-info", ".idea",
        ".vscode",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}
