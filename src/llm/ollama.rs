use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    models::ModelOptions,
};

const DEFAULT_OLLAMA_PORT: u16 = 11434;

pub struct OllamaClient {
    client: Ollama,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String, temperature: f32) -> Result<Self> {
        let (host, port) = split_base_url(base_url)?;
        let client = Ollama::new(host, port);

        Ok(Self {
            client,
            model,
            temperature,
        })
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatMessageRequest::new(self.model.clone(), messages)
            .options(ModelOptions::default().temperature(self.temperature));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }
}

/// Split `scheme://host[:port][/]` into the `scheme://host` and port pair
/// expected by [`Ollama::new`]
fn split_base_url(base_url: &str) -> Result<(String, u16)> {
    let (scheme, rest) = base_url
        .split_once("://")
        .ok_or_else(|| AppError::Config(format!("Invalid Ollama URL: {}", base_url)))?;
    let authority = rest.trim_end_matches('/');

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid Ollama port in: {}", base_url)))?;
            (host, port)
        }
        None => (authority, DEFAULT_OLLAMA_PORT),
    };

    if host.is_empty() {
        return Err(AppError::Config(format!("Invalid Ollama URL: {}", base_url)));
    }

    Ok((format!("{}://{}", scheme, host), port))
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parsing_full() {
        let (host, port) = split_base_url("http://localhost:11434").unwrap();
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn test_url_parsing_no_port() {
        let (host, port) = split_base_url("https://ollama.internal/").unwrap();
        assert_eq!(host, "https://ollama.internal");
        assert_eq!(port, DEFAULT_OLLAMA_PORT);
    }

    #[test]
    fn test_url_parsing_custom_port() {
        let (host, port) = split_base_url("http://192.168.1.100:8080").unwrap();
        assert_eq!(host, "http://192.168.1.100");
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_url_parsing_rejects_garbage() {
        assert!(split_base_url("localhost:11434").is_err());
        assert!(split_base_url("http://localhost:abc").is_err());
        assert!(split_base_url("http://").is_err());
    }
}
