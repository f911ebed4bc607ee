//! General Q&A. The fallback module: takes anything nobody else claims.

use std::collections::VecDeque;

use crate::prompt;

use super::{llm_failure_text, ModeKind, ModuleDescriptor, Reply, Services, Turn};

pub const NAME: &str = "chat";

/// Messages kept for context (user and assistant combined).
const HISTORY_LIMIT: usize = 10;
const MAX_TOKENS: u32 = 750;

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(NAME, &[], 10, ModeKind::SingleTurn).fallback()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    User,
    Assistant,
}

#[derive(Debug, Default)]
pub struct ChatModule {
    history: VecDeque<(Role, String)>,
}

impl ChatModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&mut self, role: Role, text: &str) {
        self.history.push_back((role, text.to_string()));
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    fn render_request(&self, question: &str) -> String {
        if self.history.is_empty() {
            return question.to_string();
        }
        let mut out = String::from("Recent conversation:\n");
        for (role, text) in &self.history {
            let who = match role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            out.push_str(&format!("{who}: {text}\n"));
        }
        out.push_str(&format!("\nUser: {question}"));
        out
    }

    pub async fn handle(&mut self, turn: Turn<'_>, services: &Services) -> Reply {
        let config = &services.config;
        let system = prompt::preamble(&config.prompts_dir, &config.name, NAME).build();
        let request = self.render_request(turn.utterance);

        match services.complete(&request, &system, MAX_TOKENS, turn.interrupt).await {
            Some(Ok(answer)) => {
                self.remember(Role::User, turn.utterance);
                self.remember(Role::Assistant, &answer);
                Reply::done(answer)
            }
            Some(Err(e)) => Reply::done(llm_failure_text(Some(e))),
            None => Reply::done(llm_failure_text(None)),
        }
    }
}
