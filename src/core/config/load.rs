//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies `PARLEY_LOG_LEVEL` and `PARLEY_PROJECT_ROOT` overrides.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

use super::raw::RawConfig;
use super::types::*;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Deep-merge two TOML values.
/// Tables merge recursively; any other overlay value replaces the base value.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// merged value. `visited` catches circular chains.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from `config_path`, or `config/default.toml` when present,
/// then apply env-var overrides. With neither, built-in defaults are used.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let log_level_override = env::var("PARLEY_LOG_LEVEL").ok();
    let root_override = env::var("PARLEY_PROJECT_ROOT").ok();

    let path = match config_path {
        Some(p) => Some(PathBuf::from(p)),
        None => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
    };

    match path {
        Some(p) => load_from(&p, log_level_override.as_deref(), root_override.as_deref()),
        None => resolve(RawConfig::default(), log_level_override.as_deref(), root_override.as_deref()),
    }
}

/// Loader with explicit overrides. Tests pass overrides directly instead of
/// mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    root_override: Option<&str>,
) -> Result<Config, AppError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed = RawConfig::deserialize(merged_val).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    resolve(parsed, log_level_override, root_override)
}

/// Built-in defaults with no file and no overrides.
#[cfg(test)]
pub(super) fn defaults() -> Result<Config, AppError> {
    resolve(RawConfig::default(), None, None)
}

fn resolve(
    parsed: RawConfig,
    log_level_override: Option<&str>,
    root_override: Option<&str>,
) -> Result<Config, AppError> {
    let a = parsed.assistant;
    let p = parsed.project;

    let root = match root_override.map(str::to_string).or(p.root) {
        Some(r) => {
            let root = expand_home(&r);
            if !root.is_dir() {
                return Err(AppError::InvalidRoot(root));
            }
            root
        }
        None => env::current_dir()
            .map_err(|e| AppError::Config(format!("cannot resolve working directory: {e}")))?,
    };

    for (key, value) in [
        ("project.max_prompt_chars", p.max_prompt_chars as u64),
        ("project.git_timeout_seconds", p.git_timeout_seconds),
        ("coding.max_tokens", u64::from(parsed.coding.max_tokens)),
        ("terminal.timeout_seconds", parsed.terminal.timeout_seconds),
    ] {
        if value == 0 {
            return Err(AppError::Config(format!("{key} must be positive")));
        }
    }

    let modules = parsed
        .modules
        .into_iter()
        .map(|(name, entry)| {
            let record = ModuleRecord {
                enabled: entry.enabled,
                triggers: entry.triggers,
                priority: entry.priority,
                mode: entry.mode,
            };
            (name, record)
        })
        .collect();

    Ok(Config {
        name: a.name,
        log_level: log_level_override.unwrap_or(&a.log_level).to_string(),
        log_file: a.log_file.as_deref().map(expand_home),
        prompts_dir: expand_home(&a.prompts_dir),
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        llm_api_key: env::var("LLM_API_KEY").ok(),
        modules,
        project: ProjectConfig {
            root,
            max_prompt_chars: p.max_prompt_chars,
            max_file_size: p.max_file_size,
            extensions: p.extensions.iter().map(|e| normalize_extension(e)).collect(),
            ignore_dirs: p.ignore_dirs,
            auto_scan: p.auto_scan,
            max_tokens: p.max_tokens,
            git_timeout_seconds: p.git_timeout_seconds,
            include_git_in_context: p.include_git_in_context,
        },
        coding: CodingConfig { max_tokens: parsed.coding.max_tokens },
        terminal: TerminalConfig { timeout_seconds: parsed.terminal.timeout_seconds },
    })
}

/// `"RS"`, `"rs"` and `".rs"` all become `".rs"`. An empty entry stays empty
/// and matches files without an extension.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
