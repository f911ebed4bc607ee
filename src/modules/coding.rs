//! Pair-programming conversation. Stays active until an exit phrase.

use crate::prompt;

use super::{llm_failure_text, phrases, ModeKind, ModuleDescriptor, Reply, Services, Turn};

pub const NAME: &str = "coding";

const TRIGGERS: &[&str] = &[
    "join me",
    "code with me",
    "help me code",
    "pair program",
    "coding mode",
    "programming mode",
    "let's code",
    "lets code",
    "start coding",
    "laten we programmeren",
    "codeer met mij",
    "programmeren",
];

const HISTORY_LIMIT: usize = 20;

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(NAME, TRIGGERS, 85, ModeKind::MultiTurn)
}

#[derive(Debug, Default)]
pub struct CodingModule {
    /// `(user, assistant)` exchanges, oldest first.
    history: Vec<(String, String)>,
}

impl CodingModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(&mut self, turn: Turn<'_>, services: &Services) -> Reply {
        self.history.clear();
        match phrases::strip_prefix(turn.utterance, turn.normalized, TRIGGERS).filter(|r| !r.is_empty()) {
            Some(question) => self.ask(question, turn, services).await,
            None => Reply::stay("Coding mode. What are we working on? Say \"done\" when finished."),
        }
    }

    pub async fn handle(&mut self, turn: Turn<'_>, services: &Services) -> Reply {
        self.ask(turn.utterance, turn, services).await
    }

    async fn ask(&mut self, question: &str, turn: Turn<'_>, services: &Services) -> Reply {
        let config = &services.config;
        let system = prompt::preamble(&config.prompts_dir, &config.name, NAME).build();

        let mut request = String::new();
        for (user, assistant) in &self.history {
            request.push_str(&format!("User: {user}\nAssistant: {assistant}\n\n"));
        }
        request.push_str(question);

        match services.complete(&request, &system, config.coding.max_tokens, turn.interrupt).await {
            Some(Ok(answer)) => {
                self.history.push((question.to_string(), answer.clone()));
                if self.history.len() > HISTORY_LIMIT {
                    self.history.remove(0);
                }
                Reply::stay(answer)
            }
            Some(Err(e)) => Reply::stay(llm_failure_text(Some(e))),
            None => Reply::stay(llm_failure_text(None)),
        }
    }

    pub fn exit(&mut self) -> String {
        self.history.clear();
        "Leaving coding mode.".to_string()
    }
}
