//! Post data model: the persisted unit of generated content plus the
//! request/result types that travel through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Minimum topic length in characters
pub const MIN_TOPIC_LEN: usize = 3;
/// Maximum topic length in characters
pub const MAX_TOPIC_LEN: usize = 500;

/// Tone of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Casual,
    Storytelling,
    Inspirational,
    Educational,
    Humorous,
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tone::Professional => write!(f, "professional"),
            Tone::Casual => write!(f, "casual"),
            Tone::Storytelling => write!(f, "storytelling"),
            Tone::Inspirational => write!(f, "inspirational"),
            Tone::Educational => write!(f, "educational"),
            Tone::Humorous => write!(f, "humorous"),
        }
    }
}

impl std::str::FromStr for Tone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "professional" => Ok(Tone::Professional),
            "casual" => Ok(Tone::Casual),
            "storytelling" => Ok(Tone::Storytelling),
            "inspirational" => Ok(Tone::Inspirational),
            "educational" => Ok(Tone::Educational),
            "humorous" => Ok(Tone::Humorous),
            other => Err(Error::validation(format!("Unknown tone: {}", other))),
        }
    }
}

/// Target audience of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Recruiters,
    Engineers,
    Founders,
    Marketers,
    General,
    Students,
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::Recruiters => write!(f, "recruiters"),
            Audience::Engineers => write!(f, "engineers"),
            Audience::Founders => write!(f, "founders"),
            Audience::Marketers => write!(f, "marketers"),
            Audience::General => write!(f, "general"),
            Audience::Students => write!(f, "students"),
        }
    }
}

impl std::str::FromStr for Audience {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "recruiters" => Ok(Audience::Recruiters),
            "engineers" => Ok(Audience::Engineers),
            "founders" => Ok(Audience::Founders),
            "marketers" => Ok(Audience::Marketers),
            "general" => Ok(Audience::General),
            "students" => Ok(Audience::Students),
            other => Err(Error::validation(format!("Unknown audience: {}", other))),
        }
    }
}

/// Length class of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthClass {
    Short,
    Medium,
    Long,
}

impl LengthClass {
    /// Approximate character bounds for this length class
    pub fn char_bounds(&self) -> (usize, usize) {
        match self {
            LengthClass::Short => (100, 300),
            LengthClass::Medium => (300, 800),
            LengthClass::Long => (800, 2000),
        }
    }
}

impl std::fmt::Display for LengthClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthClass::Short => write!(f, "short"),
            LengthClass::Medium => write!(f, "medium"),
            LengthClass::Long => write!(f, "long"),
        }
    }
}

impl std::str::FromStr for LengthClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "short" => Ok(LengthClass::Short),
            "medium" => Ok(LengthClass::Medium),
            "long" => Ok(LengthClass::Long),
            other => Err(Error::validation(format!("Unknown length: {}", other))),
        }
    }
}

/// How the memory should shape a standalone post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleMode {
    /// Match the user's past writing style
    #[default]
    Similar,
    /// Actively avoid past topics and patterns
    Different,
}

impl std::fmt::Display for StyleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleMode::Similar => write!(f, "similar"),
            StyleMode::Different => write!(f, "different"),
        }
    }
}

/// Compose the document string that gets embedded for a post.
///
/// The same topic and body must always reproduce the same document, so
/// re-embedding after a model upgrade or an audit stays deterministic.
pub fn embedding_document(topic: &str, body: &str) -> String {
    format!("Topic: {}\n\nPost: {}", topic, body)
}

/// A persisted, immutable post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique post ID, assigned at creation
    pub id: Uuid,

    /// Owning user. Similarity search never crosses owners.
    pub owner: String,

    pub topic: String,
    pub body: String,
    pub tone: Tone,
    pub audience: Audience,
    pub length: LengthClass,

    /// Series this post belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,

    /// 1-based position within the series; present iff `series_id` is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_order: Option<u32>,

    pub created_at: DateTime<Utc>,
}

impl Post {
    /// The document string this post was embedded from
    pub fn document(&self) -> String {
        embedding_document(&self.topic, &self.body)
    }
}

/// A post about to be inserted. The store assigns the ID, the timestamp,
/// and (when `series_order` is `None`) the next order in the series.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub owner: String,
    pub topic: String,
    pub body: String,
    pub tone: Tone,
    pub audience: Audience,
    pub length: LengthClass,
    pub series_id: Option<String>,
    /// Leave `None` to let the store compute `max(existing) + 1` atomically.
    /// A supplied value is validated against that computation.
    pub series_order: Option<u32>,
}

impl NewPost {
    pub fn document(&self) -> String {
        embedding_document(&self.topic, &self.body)
    }

    /// Validate the structural constraints that do not need store access
    pub fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() {
            return Err(Error::validation("Owner must not be empty"));
        }
        let topic_len = self.topic.chars().count();
        if !(MIN_TOPIC_LEN..=MAX_TOPIC_LEN).contains(&topic_len) {
            return Err(Error::validation(format!(
                "Topic length {} outside [{}, {}]",
                topic_len, MIN_TOPIC_LEN, MAX_TOPIC_LEN
            )));
        }
        if self.series_order.is_some() && self.series_id.is_none() {
            return Err(Error::validation(
                "series_order requires a series_id",
            ));
        }
        if self.series_order == Some(0) {
            return Err(Error::validation("series_order starts at 1"));
        }
        Ok(())
    }
}

/// A single hit from a similarity search, most similar first in result order
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityMatch {
    pub post: Post,
    /// Cosine similarity in [0, 1], higher is more similar
    pub score: f32,
}

impl SimilarityMatch {
    pub fn topic(&self) -> &str {
        &self.post.topic
    }
}

/// Summary of one series owned by a user
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub series_id: String,
    pub total_posts: usize,
    pub first_topic: String,
    pub last_topic: String,
    pub created_at: DateTime<Utc>,
}

/// A request to generate one post
#[derive(Debug, Clone, Deserialize)]
pub struct PostRequest {
    pub owner: String,
    pub topic: String,

    #[serde(default = "default_tone")]
    pub tone: Tone,
    #[serde(default = "default_audience")]
    pub audience: Audience,
    #[serde(default = "default_length")]
    pub length: LengthClass,
    #[serde(default)]
    pub style_mode: StyleMode,

    #[serde(default = "default_true")]
    pub include_emoji: bool,
    #[serde(default = "default_true")]
    pub include_hashtags: bool,
    #[serde(default = "default_num_hashtags")]
    pub num_hashtags: u8,

    #[serde(default)]
    pub is_series: bool,
    #[serde(default)]
    pub series_id: Option<String>,
}

fn default_tone() -> Tone {
    Tone::Professional
}

fn default_audience() -> Audience {
    Audience::General
}

fn default_length() -> LengthClass {
    LengthClass::Medium
}

fn default_true() -> bool {
    true
}

fn default_num_hashtags() -> u8 {
    3
}

impl PostRequest {
    /// Validate the request before doing any work
    pub fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() {
            return Err(Error::validation("Owner must not be empty"));
        }
        let topic_len = self.topic.chars().count();
        if !(MIN_TOPIC_LEN..=MAX_TOPIC_LEN).contains(&topic_len) {
            return Err(Error::validation(format!(
                "Topic length {} outside [{}, {}]",
                topic_len, MIN_TOPIC_LEN, MAX_TOPIC_LEN
            )));
        }
        if self.num_hashtags > 10 {
            return Err(Error::validation("num_hashtags must be at most 10"));
        }
        if self.series_id.is_some() && !self.is_series {
            return Err(Error::validation(
                "series_id given but is_series is false",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(topic: &str) -> PostRequest {
        PostRequest {
            owner: "u1".to_string(),
            topic: topic.to_string(),
            tone: Tone::Professional,
            audience: Audience::General,
            length: LengthClass::Medium,
            style_mode: StyleMode::Similar,
            include_emoji: true,
            include_hashtags: true,
            num_hashtags: 3,
            is_series: false,
            series_id: None,
        }
    }

    #[test]
    fn document_is_reproducible() {
        let a = embedding_document("Remote work", "Some body");
        let b = embedding_document("Remote work", "Some body");
        assert_eq!(a, b);
        assert_eq!(a, "Topic: Remote work\n\nPost: Some body");
    }

    #[test]
    fn topic_length_bounds() {
        assert!(request("ab").validate().is_err());
        assert!(request("abc").validate().is_ok());
        assert!(request(&"x".repeat(500)).validate().is_ok());
        assert!(request(&"x".repeat(501)).validate().is_err());
    }

    #[test]
    fn empty_owner_rejected() {
        let mut req = request("valid topic");
        req.owner = "  ".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn series_id_requires_is_series() {
        let mut req = request("valid topic");
        req.series_id = Some("s1".to_string());
        assert!(req.validate().is_err());
        req.is_series = true;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn enum_round_trips() {
        for tone in [
            Tone::Professional,
            Tone::Casual,
            Tone::Storytelling,
            Tone::Inspirational,
            Tone::Educational,
            Tone::Humorous,
        ] {
            assert_eq!(tone.to_string().parse::<Tone>().unwrap(), tone);
        }
        assert!("angry".parse::<Tone>().is_err());
    }
}
