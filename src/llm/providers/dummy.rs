//! Dummy LLM provider: echoes input back prefixed with `[echo]`.
//! Lets the whole mode controller run without an API key.

use crate::llm::ProviderError;

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, content: &str) -> Result<String, ProviderError> {
        Ok(format!("[echo] {content}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;

    #[tokio::test]
    async fn complete_prefixes_echo() {
        let p = DummyProvider;
        assert_eq!(p.complete("hello").await.unwrap(), "[echo] hello");
    }

    #[tokio::test]
    async fn enum_dispatch_ignores_system_prompt() {
        let p = LlmProvider::Dummy(DummyProvider);
        let reply = p.complete("question", Some("be brief"), 10).await.unwrap();
        assert_eq!(reply, "[echo] question");
    }
}
