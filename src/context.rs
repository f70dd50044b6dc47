//! Context building: selects and shapes retrieved memory for the
//! generation backend, per mode.

use std::sync::Arc;

use crate::classifier::matches_above_threshold;
use crate::error::{Error, Result};
use crate::facts::{Fact, FactAggregator};
use crate::post::{Audience, LengthClass, SimilarityMatch, StyleMode, Tone};
use crate::storage::PostStore;

/// The four generation modes, decided once at request entry and carried
/// through context building and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Imitate the owner's past style
    Similar,
    /// Contrast with the owner's past topics and patterns
    Different,
    /// First post of a new series; seeds voice like Similar
    SeriesStart,
    /// Continuation of an existing series
    SeriesContinue,
}

impl GenerationMode {
    /// Routing decision, first match wins:
    /// series + id => continue; series without id => start; else style mode.
    pub fn route(is_series: bool, series_id: Option<&str>, style_mode: StyleMode) -> Self {
        match (is_series, series_id) {
            (true, Some(_)) => GenerationMode::SeriesContinue,
            (true, None) => GenerationMode::SeriesStart,
            (false, _) => match style_mode {
                StyleMode::Similar => GenerationMode::Similar,
                StyleMode::Different => GenerationMode::Different,
            },
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::Similar => write!(f, "similar"),
            GenerationMode::Different => write!(f, "different"),
            GenerationMode::SeriesStart => write!(f, "series_start"),
            GenerationMode::SeriesContinue => write!(f, "series_continue"),
        }
    }
}

/// A past post offered to the backend as a style example
#[derive(Debug, Clone)]
pub struct WritingExample {
    pub topic: String,
    pub body: String,
    pub tone: Tone,
    pub score: f32,
}

/// A past topic the backend must steer away from
#[derive(Debug, Clone)]
pub struct AvoidTopic {
    pub topic: String,
    pub score: f32,
}

/// A past style pattern the backend must steer away from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvoidPattern {
    pub tone: Tone,
    pub audience: Audience,
    pub length: LengthClass,
}

/// Context assembled for one generation call
#[derive(Debug, Clone)]
pub enum GenerationContext {
    /// Examples to imitate, plus the tones they establish
    Examples {
        examples: Vec<WritingExample>,
        tone_patterns: Vec<Tone>,
    },
    /// Topics and patterns to actively avoid. Kept distinct from
    /// `Examples` so the backend can never mistake contrast material
    /// for imitation material.
    Avoid {
        topics: Vec<AvoidTopic>,
        patterns: Vec<AvoidPattern>,
    },
    /// Facts established by earlier posts of the series, in series order,
    /// plus one-line summaries and the order this post will receive
    Series {
        facts: Vec<Fact>,
        summaries: Vec<String>,
        next_order: u32,
    },
}

impl GenerationContext {
    pub fn is_empty(&self) -> bool {
        match self {
            GenerationContext::Examples { examples, .. } => examples.is_empty(),
            GenerationContext::Avoid { topics, patterns } => {
                topics.is_empty() && patterns.is_empty()
            }
            GenerationContext::Series { facts, summaries, .. } => {
                facts.is_empty() && summaries.is_empty()
            }
        }
    }

    /// Render the context for prompt injection. Avoid-context is labelled
    /// as such; prompt consumers rely on that labelling.
    pub fn format_for_prompt(&self) -> String {
        let mut parts = Vec::new();

        match self {
            GenerationContext::Examples { examples, tone_patterns } => {
                if examples.is_empty() {
                    parts.push("No past examples available. Create fresh content.\n".to_string());
                } else {
                    parts.push("## Writing Examples To Imitate\n".to_string());
                    for (i, ex) in examples.iter().enumerate() {
                        parts.push(format!(
                            "### Example {} (Topic: {})\n{}\n",
                            i + 1,
                            ex.topic,
                            ex.body
                        ));
                    }
                    let tones: Vec<String> =
                        tone_patterns.iter().map(|t| t.to_string()).collect();
                    parts.push(format!("Established tones: {}\n", tones.join(", ")));
                }
            }
            GenerationContext::Avoid { topics, patterns } => {
                parts.push("## Topics To AVOID (do not imitate)\n".to_string());
                if topics.is_empty() {
                    parts.push("No previous topics to avoid.\n".to_string());
                }
                for t in topics {
                    parts.push(format!(
                        "- {} (similarity: {:.0}%)\n",
                        t.topic,
                        t.score * 100.0
                    ));
                }
                parts.push("## Patterns To AVOID\n".to_string());
                if patterns.is_empty() {
                    parts.push("No specific patterns to avoid.\n".to_string());
                }
                for p in patterns {
                    parts.push(format!(
                        "- Tone: {}, Audience: {}, Length: {}\n",
                        p.tone, p.audience, p.length
                    ));
                }
            }
            GenerationContext::Series { facts, summaries, next_order } => {
                parts.push(format!("## Series Continuation (this is post #{})\n", next_order));
                if summaries.is_empty() {
                    parts.push("This is the first post in the series.\n".to_string());
                } else {
                    for summary in summaries {
                        parts.push(format!("- {}\n", summary));
                    }
                }
                parts.push("## Established Facts (do not contradict)\n".to_string());
                if facts.is_empty() {
                    parts.push("No previous facts available.\n".to_string());
                }
                for fact in facts {
                    parts.push(format!("- [post {}] {}\n", fact.source_order, fact.text));
                }
            }
        }

        parts.join("")
    }
}

/// Result of a context build: the context itself plus the similarity
/// matches the build ran, so the orchestrator derives `topic_exists` and
/// the user message from the same search instead of issuing a second one.
#[derive(Debug, Clone)]
pub struct BuiltContext {
    pub context: GenerationContext,
    pub matches: Vec<SimilarityMatch>,
}

/// Assembles generation context from the post store and fact aggregator
pub struct ContextBuilder {
    store: Arc<dyn PostStore>,
    aggregator: FactAggregator,
    max_similar_posts: usize,
}

impl ContextBuilder {
    pub fn new(
        store: Arc<dyn PostStore>,
        aggregator: FactAggregator,
        max_similar_posts: usize,
    ) -> Self {
        Self {
            store,
            aggregator,
            max_similar_posts,
        }
    }

    /// Build context for one request. Fewer prior posts than the fan-out
    /// is fine, including zero: a cold start yields empty context.
    pub async fn build(
        &self,
        mode: GenerationMode,
        owner: &str,
        topic: &str,
        series_id: Option<&str>,
    ) -> Result<BuiltContext> {
        match mode {
            GenerationMode::Similar | GenerationMode::SeriesStart => {
                let matches = self.search(owner, topic).await?;
                Ok(BuiltContext {
                    context: similar_context(&matches),
                    matches,
                })
            }
            GenerationMode::Different => {
                let matches = self.search(owner, topic).await?;
                Ok(BuiltContext {
                    context: different_context(&matches),
                    matches,
                })
            }
            GenerationMode::SeriesContinue => {
                let sid = series_id.ok_or_else(|| {
                    Error::validation("Series continuation requires a series_id")
                })?;
                let posts = self.store.get_series(owner, sid).await?;
                if posts.is_empty() {
                    // Caller claimed continuation of a series that does not exist
                    return Err(Error::series_not_found(format!(
                        "No posts found for series {}",
                        sid
                    )));
                }
                let facts = self.aggregator.aggregate(&posts).await?;
                let summaries = posts
                    .iter()
                    .map(|p| format!("Post {}: {}", p.series_order.unwrap_or(0), p.topic))
                    .collect();
                Ok(BuiltContext {
                    context: GenerationContext::Series {
                        facts,
                        summaries,
                        next_order: posts.len() as u32 + 1,
                    },
                    matches: Vec::new(),
                })
            }
        }
    }

    async fn search(&self, owner: &str, topic: &str) -> Result<Vec<SimilarityMatch>> {
        self.store
            .search_similar(owner, topic, self.max_similar_posts, None)
            .await
    }
}

fn similar_context(matches: &[SimilarityMatch]) -> GenerationContext {
    let examples = matches
        .iter()
        .map(|m| WritingExample {
            topic: m.post.topic.clone(),
            body: m.post.body.clone(),
            tone: m.post.tone,
            score: m.score,
        })
        .collect();

    let mut tone_patterns: Vec<Tone> = Vec::new();
    for m in matches {
        if !tone_patterns.contains(&m.post.tone) {
            tone_patterns.push(m.post.tone);
        }
    }

    GenerationContext::Examples {
        examples,
        tone_patterns,
    }
}

fn different_context(matches: &[SimilarityMatch]) -> GenerationContext {
    let above = matches_above_threshold(matches);

    let topics = above
        .iter()
        .map(|m| AvoidTopic {
            topic: m.post.topic.clone(),
            score: m.score,
        })
        .collect();

    let mut patterns: Vec<AvoidPattern> = Vec::new();
    for m in &above {
        let pattern = AvoidPattern {
            tone: m.post.tone,
            audience: m.post.audience,
            length: m.post.length,
        };
        if !patterns.contains(&pattern) {
            patterns.push(pattern);
        }
    }

    GenerationContext::Avoid { topics, patterns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{Audience, LengthClass, Post, Tone};
    use chrono::Utc;
    use uuid::Uuid;

    fn matched(topic: &str, tone: Tone, score: f32) -> SimilarityMatch {
        SimilarityMatch {
            post: Post {
                id: Uuid::new_v4(),
                owner: "u1".to_string(),
                topic: topic.to_string(),
                body: format!("Body of {}", topic),
                tone,
                audience: Audience::Engineers,
                length: LengthClass::Medium,
                series_id: None,
                series_order: None,
                created_at: Utc::now(),
            },
            score,
        }
    }

    #[test]
    fn routing_priority() {
        assert_eq!(
            GenerationMode::route(true, Some("s1"), StyleMode::Different),
            GenerationMode::SeriesContinue
        );
        assert_eq!(
            GenerationMode::route(true, None, StyleMode::Different),
            GenerationMode::SeriesStart
        );
        assert_eq!(
            GenerationMode::route(false, None, StyleMode::Similar),
            GenerationMode::Similar
        );
        assert_eq!(
            GenerationMode::route(false, None, StyleMode::Different),
            GenerationMode::Different
        );
    }

    #[test]
    fn similar_context_dedupes_tones_in_order() {
        let matches = vec![
            matched("a", Tone::Casual, 0.9),
            matched("b", Tone::Professional, 0.8),
            matched("c", Tone::Casual, 0.7),
        ];
        match similar_context(&matches) {
            GenerationContext::Examples { examples, tone_patterns } => {
                assert_eq!(examples.len(), 3);
                assert_eq!(tone_patterns, vec![Tone::Casual, Tone::Professional]);
            }
            other => panic!("Expected examples context, got {:?}", other),
        }
    }

    #[test]
    fn different_context_only_keeps_threshold_matches() {
        let matches = vec![
            matched("covered before", Tone::Casual, 0.82),
            matched("barely related", Tone::Casual, 0.6),
        ];
        match different_context(&matches) {
            GenerationContext::Avoid { topics, patterns } => {
                assert_eq!(topics.len(), 1);
                assert_eq!(topics[0].topic, "covered before");
                assert_eq!(patterns.len(), 1);
            }
            other => panic!("Expected avoid context, got {:?}", other),
        }
    }

    #[test]
    fn avoid_context_is_labelled_in_prompt() {
        let ctx = different_context(&[matched("Remote work", Tone::Casual, 0.9)]);
        let rendered = ctx.format_for_prompt();
        assert!(rendered.contains("AVOID"));
        assert!(rendered.contains("Remote work"));
    }

    #[test]
    fn empty_contexts_are_tolerated() {
        assert!(similar_context(&[]).is_empty());
        assert!(different_context(&[]).is_empty());
        let rendered = similar_context(&[]).format_for_prompt();
        assert!(rendered.contains("No past examples"));
    }
}
