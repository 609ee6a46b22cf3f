//! Language model backends. The pipeline only sees [`LanguageModel`].

use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::Ollama;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{body_preview, Error, Result};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:latest";

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Runs one completion: `system` carries the agent persona, `prompt` the task.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;

    /// Short `provider:model` label for logs.
    fn describe(&self) -> String;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions endpoint.
pub struct OpenAiModel {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiModel {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("OPENAI_API_KEY is not set".into()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "chat completion request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                service: "OpenAI",
                status,
                body: body_preview(&body),
            });
        }

        let data: ChatResponse = response.json().await?;
        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("completion returned no content".into()))
    }

    fn describe(&self) -> String {
        format!("openai:{}", self.model)
    }
}

/// Local model served by Ollama.
pub struct OllamaModel {
    client: Ollama,
    model: String,
    timeout: Duration,
}

impl OllamaModel {
    pub fn new(url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let parsed =
            Url::parse(url).map_err(|e| Error::Config(format!("invalid Ollama URL {url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| Error::Config(format!("Ollama URL {url} has no host")))?;
        let port = parsed.port_or_known_default().unwrap_or(11434);
        let client = Ollama::builder()
            .host(format!("{}://{}", parsed.scheme(), host).as_str())
            .port(port)
            .build();
        Ok(Self {
            client,
            model: model.to_string(),
            timeout,
        })
    }

    /// Checks that the Ollama daemon answers. Only used for a startup notice.
    pub async fn probe(&self) {
        match self.client.list_local_models().await {
            Ok(models) => info!(model = %self.model, installed = models.len(), "Ollama available"),
            Err(e) => warn!(error = %e, "Ollama not reachable, searches will fail until it is"),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = GenerationRequest::new(self.model.clone(), format!("{system}\n\n{prompt}"));
        debug!(model = %self.model, prompt_chars = prompt.len(), "Ollama generation request");

        match tokio::time::timeout(self.timeout, self.client.generate(request)).await {
            Ok(Ok(response)) => Ok(response.response),
            Ok(Err(e)) => Err(Error::Llm(e.to_string())),
            Err(_) => Err(Error::Llm(format!(
                "Ollama did not answer within {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("ollama:{}", self.model)
    }
}
