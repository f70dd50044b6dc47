//! OpenAI-compatible LLM backend.
//!
//! Implements both collaborator traits (generation and fact extraction)
//! over a chat-completions endpoint. Works against OpenAI or any
//! compatible service (Groq, Ollama, vLLM). The core never retries;
//! failures and timeouts surface to the caller.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::{FactExtractor, GenerationBackend, GenerationTask};
use crate::config::Config;
use crate::context::GenerationMode;
use crate::error::{Error, Result};

/// Default OpenAI API base URL
const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Configuration for the OpenAI-compatible backend
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (optional for local services like Ollama)
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    /// Sampling temperature for style-matching and series modes
    pub similar_temperature: f32,
    /// Sampling temperature for contrast mode - runs hotter on purpose
    pub different_temperature: f32,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, config: &Config) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            model: model.into(),
            timeout: config.backend_timeout,
            similar_temperature: config.similar_mode_temperature,
            different_temperature: config.different_mode_temperature,
        }
    }

    /// Read API key, model and optional base URL from the environment
    pub fn from_env(config: &Config) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::config("OPENAI_API_KEY environment variable not set"))?;
        let model =
            std::env::var("PLUME_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let mut cfg = Self::new(api_key, model, config);
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            cfg.base_url = base;
        }
        Ok(cfg)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// OpenAI-compatible chat-completions client
pub struct OpenAiBackend {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| Error::config(format!("Invalid API key: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    async fn complete(&self, prompt: String, temperature: f32) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::generation(format!("Backend timed out: {}", e))
                } else {
                    Error::generation(format!("Backend request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "Backend returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Malformed backend response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::generation("Backend returned no choices"))
    }

    fn temperature_for(&self, mode: GenerationMode) -> f32 {
        match mode {
            GenerationMode::Different => self.config.different_temperature,
            _ => self.config.similar_temperature,
        }
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn generate(&self, task: &GenerationTask) -> Result<String> {
        let prompt = build_generation_prompt(task);
        tracing::debug!(mode = %task.mode, model = %self.config.model, "Generating post");
        self.complete(prompt, self.temperature_for(task.mode)).await
    }
}

#[async_trait]
impl FactExtractor for OpenAiBackend {
    async fn extract(&self, topic: &str, body: &str) -> Result<Vec<String>> {
        let prompt = build_extraction_prompt(topic, body);
        let raw = self
            .complete(prompt, self.config.similar_temperature)
            .await
            .map_err(|e| Error::fact_extraction(e.to_string()))?;

        // The prompt demands a bare JSON array of strings
        let trimmed = raw.trim().trim_start_matches("```json").trim_matches('`').trim();
        serde_json::from_str::<Vec<String>>(trimmed)
            .map_err(|e| Error::fact_extraction(format!("Unparseable extraction output: {}", e)))
    }
}

fn build_generation_prompt(task: &GenerationTask) -> String {
    let mode_instruction = match task.mode {
        GenerationMode::Similar | GenerationMode::SeriesStart => {
            "Write in the same voice as the writing examples below, if any are given."
        }
        GenerationMode::Different => {
            "The context below lists topics and patterns this user has already used. \
             Take a fresh angle: do NOT imitate them."
        }
        GenerationMode::SeriesContinue => {
            "This post continues a series. Stay consistent with every established fact \
             below and reference the series naturally."
        }
    };

    format!(
        "You are a professional social media ghostwriter.\n\
         Write one post about: {topic}\n\n\
         Tone: {tone}\n\
         Audience: {audience}\n\
         Length: {length}\n\
         {emoji}\n\
         {hashtags}\n\n\
         {mode_instruction}\n\n\
         {context}\n\
         Return only the post text, nothing else.",
        topic = task.topic,
        tone = task.style.tone,
        audience = task.style.audience,
        length = task.style.length,
        emoji = task.style.emoji_instruction(),
        hashtags = task.style.hashtag_instruction(),
        mode_instruction = mode_instruction,
        context = task.context.format_for_prompt(),
    )
}

fn build_extraction_prompt(topic: &str, body: &str) -> String {
    format!(
        "Extract the atomic facts from this social media post: every statistic, \
         claim, example, and conclusion it establishes. Return a JSON array of \
         short strings and nothing else.\n\n\
         Topic: {}\n\nPost:\n{}",
        topic, body
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StyleOptions;
    use crate::context::GenerationContext;
    use crate::post::{Audience, LengthClass, Tone};

    fn task(mode: GenerationMode, context: GenerationContext) -> GenerationTask {
        GenerationTask {
            mode,
            topic: "Remote work".to_string(),
            context,
            style: StyleOptions {
                tone: Tone::Professional,
                audience: Audience::Engineers,
                length: LengthClass::Medium,
                include_emoji: false,
                include_hashtags: true,
                num_hashtags: 2,
            },
        }
    }

    #[test]
    fn different_mode_prompt_marks_context_as_contrast() {
        let ctx = GenerationContext::Avoid {
            topics: vec![],
            patterns: vec![],
        };
        let prompt = build_generation_prompt(&task(GenerationMode::Different, ctx));
        assert!(prompt.contains("do NOT imitate"));
        assert!(prompt.contains("Include exactly 2 relevant hashtags"));
        assert!(prompt.contains("Do NOT use any emojis"));
    }

    #[test]
    fn series_prompt_carries_continuation_instruction() {
        let ctx = GenerationContext::Series {
            facts: vec![],
            summaries: vec!["Post 1: Remote work".to_string()],
            next_order: 2,
        };
        let prompt = build_generation_prompt(&task(GenerationMode::SeriesContinue, ctx));
        assert!(prompt.contains("continues a series"));
        assert!(prompt.contains("Post 1: Remote work"));
    }
}
