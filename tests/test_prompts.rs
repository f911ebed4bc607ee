//! Tests for the prompt files shipped under config/prompts

use std::fs;

use parley::prompt::{preamble, PromptBuilder};

#[test]
fn test_prompt_files_exist() {
    for name in ["id.md", "chat.md", "coding.md", "project.md"] {
        let path = format!("config/prompts/{name}");
        assert!(fs::metadata(&path).is_ok(), "{name} prompt file missing");
    }
}

#[test]
fn test_id_prompt_template_vars() {
    let text = fs::read_to_string("config/prompts/id.md").unwrap();
    assert!(text.contains("{{name}}"), "id.md should contain {{name}} variable");
}

#[test]
fn test_project_prompt_describes_context_format() {
    let text = fs::read_to_string("config/prompts/project.md").unwrap();
    assert!(text.contains("RULES:"));
    assert!(text.contains("[PROJECT: name]"));
    assert!(text.contains("[FILE: path]"));
    assert!(text.contains("[GIT]"));
}

#[test]
fn test_preamble_reads_shipped_files() {
    let prompt = preamble("config/prompts", "Ada", "project").build();
    assert!(prompt.starts_with("You are Ada, a voice assistant."));
    assert!(prompt.contains("You are Ada, a concise programming assistant"));
    assert!(!prompt.contains("{{name}}"));
}

#[test]
fn test_default_config_parses() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = parley::config::load_from(
        std::path::Path::new("config/default.toml"),
        None,
        Some(dir.path().to_str().unwrap()),
    )
    .unwrap();
    assert_eq!(cfg.llm.provider, "dummy");
    assert_eq!(cfg.project.root, dir.path());
    assert!(cfg.module_record("project").enabled);
    let chat = PromptBuilder::new(&cfg.prompts_dir).layer("chat.md").build();
    assert!(chat.starts_with("Answer general questions"));
}
