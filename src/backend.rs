//! External collaborator interfaces: text generation and fact extraction.
//!
//! The core treats both as opaque functions; it never retries them
//! internally. Retry policy belongs to the caller of the core.

use async_trait::async_trait;

use crate::context::{GenerationContext, GenerationMode};
use crate::error::Result;
use crate::post::{Audience, LengthClass, Tone};

/// Style attributes passed through to the generation backend
#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub tone: Tone,
    pub audience: Audience,
    pub length: LengthClass,
    pub include_emoji: bool,
    pub include_hashtags: bool,
    pub num_hashtags: u8,
}

impl StyleOptions {
    /// Instruction line for emoji usage
    pub fn emoji_instruction(&self) -> &'static str {
        if self.include_emoji {
            "Use 2-4 relevant emojis strategically placed"
        } else {
            "Do NOT use any emojis"
        }
    }

    /// Instruction line for hashtag usage
    pub fn hashtag_instruction(&self) -> String {
        if self.include_hashtags {
            format!(
                "Include exactly {} relevant hashtags at the end",
                self.num_hashtags
            )
        } else {
            "Do NOT include any hashtags".to_string()
        }
    }
}

/// One generation call: the mode, the topic, the assembled memory context,
/// and the requested style
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub mode: GenerationMode,
    pub topic: String,
    pub context: GenerationContext,
    pub style: StyleOptions,
}

/// Produces the body text of a post. May fail transiently (timeout, rate
/// limit) or permanently (invalid request); either way the error surfaces
/// as `Error::GenerationBackend`.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, task: &GenerationTask) -> Result<String>;
}

/// Extracts atomic facts (statistics, arguments, examples, conclusions)
/// from one post's body
#[async_trait]
pub trait FactExtractor: Send + Sync {
    async fn extract(&self, topic: &str, body: &str) -> Result<Vec<String>>;
}
