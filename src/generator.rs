//! Generation orchestration: routes a request to a mode, builds context,
//! invokes the backend, and persists the result.
//!
//! Per-request state machine:
//! routing -> context built -> generated -> persisted, failing out of any
//! step without partial writes. A post only ever reaches the store after a
//! successful generation, in one all-or-nothing insert.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::backend::{FactExtractor, GenerationBackend, GenerationTask, StyleOptions};
use crate::classifier::{self, matches_above_threshold};
use crate::config::Config;
use crate::context::{ContextBuilder, GenerationMode};
use crate::error::{Error, Result};
use crate::facts::FactAggregator;
use crate::post::{NewPost, Post, PostRequest, SeriesSummary, SimilarityMatch};
use crate::storage::PostStore;
use crate::validate;

/// A previously covered topic surfaced to the user
#[derive(Debug, Clone, Serialize)]
pub struct TopicInfo {
    pub topic: String,
    pub similarity_score: f32,
    pub created_at: DateTime<Utc>,
}

impl From<&SimilarityMatch> for TopicInfo {
    fn from(m: &SimilarityMatch) -> Self {
        Self {
            topic: m.post.topic.clone(),
            similarity_score: m.score,
            created_at: m.post.created_at,
        }
    }
}

/// Outcome of one generation request
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPost {
    pub post_id: Uuid,
    pub body: String,
    pub topic_exists: bool,
    pub similar_topics: Vec<TopicInfo>,
    pub message: String,
    pub series_id: Option<String>,
    pub series_order: Option<u32>,
    pub mode_used: GenerationMode,
    /// Soft validation warnings (length drift); never block persistence
    pub warnings: Vec<String>,
    pub generation_time_ms: u64,
}

/// One entry of an owner's post history
#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    pub post_id: Uuid,
    pub topic: String,
    /// First 200 characters of the body
    pub preview: String,
    pub tone: String,
    pub audience: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Post> for HistoryItem {
    fn from(post: &Post) -> Self {
        let preview: String = post.body.chars().take(200).collect();
        Self {
            post_id: post.id,
            topic: post.topic.clone(),
            preview,
            tone: post.tone.to_string(),
            audience: post.audience.to_string(),
            created_at: post.created_at,
        }
    }
}

/// An owner's post history with the total count
#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub owner: String,
    pub total_posts: usize,
    pub posts: Vec<HistoryItem>,
}

/// Top-level generator coordinating the store, the context builder, and
/// the external backends. One instance serves many concurrent requests;
/// it holds no per-request state.
pub struct PostGenerator {
    store: Arc<dyn PostStore>,
    backend: Arc<dyn GenerationBackend>,
    context_builder: ContextBuilder,
    config: Config,
}

impl PostGenerator {
    pub fn new(
        store: Arc<dyn PostStore>,
        backend: Arc<dyn GenerationBackend>,
        extractor: Arc<dyn FactExtractor>,
        config: Config,
    ) -> Self {
        let aggregator = FactAggregator::new(extractor, config.backend_timeout);
        let context_builder =
            ContextBuilder::new(store.clone(), aggregator, config.max_similar_posts);
        Self {
            store,
            backend,
            context_builder,
            config,
        }
    }

    /// Generate one post with memory-aware context and persist it
    pub async fn generate_post(&self, request: PostRequest) -> Result<GeneratedPost> {
        let started = Instant::now();
        request.validate()?;

        let mode = GenerationMode::route(
            request.is_series,
            request.series_id.as_deref(),
            request.style_mode,
        );
        tracing::info!(owner = %request.owner, mode = %mode, topic = %request.topic, "Routing request");

        let built = self
            .context_builder
            .build(mode, &request.owner, &request.topic, request.series_id.as_deref())
            .await?;

        // Novelty fields come from the same search the context was built
        // from; no second query.
        let top_match = built.matches.first();
        let topic_exists = top_match
            .map(|m| classifier::classify(m.score).topic_exists)
            .unwrap_or(false);
        let similar_topics: Vec<TopicInfo> = matches_above_threshold(&built.matches)
            .into_iter()
            .map(TopicInfo::from)
            .collect();

        let task = GenerationTask {
            mode,
            topic: request.topic.clone(),
            context: built.context,
            style: StyleOptions {
                tone: request.tone,
                audience: request.audience,
                length: request.length,
                include_emoji: request.include_emoji,
                include_hashtags: request.include_hashtags,
                num_hashtags: request.num_hashtags,
            },
        };

        let body = tokio::time::timeout(self.config.backend_timeout, self.backend.generate(&task))
            .await
            .map_err(|_| Error::generation("Generation backend timed out"))??;

        let warnings = validate::check_body(&body, request.length, &self.config)?;

        // Series metadata: a continuation reuses the caller's id, a start
        // mints a fresh one. The store assigns the order atomically.
        let series_id = match mode {
            GenerationMode::SeriesContinue => request.series_id.clone(),
            GenerationMode::SeriesStart => Some(Uuid::new_v4().to_string()),
            _ => None,
        };

        let stored = self
            .store
            .insert(NewPost {
                owner: request.owner.clone(),
                topic: request.topic.clone(),
                body: body.clone(),
                tone: request.tone,
                audience: request.audience,
                length: request.length,
                series_id,
                series_order: None,
            })
            .await?;

        let message = match mode {
            GenerationMode::SeriesContinue => format!(
                "Continuing series (Post #{}). Built on {} previous posts.",
                stored.series_order.unwrap_or(0),
                stored.series_order.unwrap_or(1) - 1
            ),
            GenerationMode::SeriesStart => format!(
                "Started new series (Post #1). Series ID: {}",
                stored.series_id.as_deref().unwrap_or_default()
            ),
            _ => classifier::topic_message(topic_exists, top_match, request.style_mode),
        };

        let elapsed = started.elapsed().as_millis() as u64;
        tracing::info!(
            owner = %stored.owner,
            post_id = %stored.id,
            mode = %mode,
            elapsed_ms = elapsed,
            "Post generated and persisted"
        );

        Ok(GeneratedPost {
            post_id: stored.id,
            body,
            topic_exists,
            similar_topics,
            message,
            series_id: stored.series_id,
            series_order: stored.series_order,
            mode_used: mode,
            warnings,
            generation_time_ms: elapsed,
        })
    }

    /// The owner's most recent posts, newest first
    pub async fn get_history(&self, owner: &str, limit: usize) -> Result<History> {
        let posts = self.store.list_history(owner, limit).await?;
        let total_posts = self.store.count_posts(owner).await?;
        Ok(History {
            owner: owner.to_string(),
            total_posts,
            posts: posts.iter().map(HistoryItem::from).collect(),
        })
    }

    /// Summaries of every series the owner has started
    pub async fn get_series_list(&self, owner: &str) -> Result<Vec<SeriesSummary>> {
        self.store.list_series(owner).await
    }
}
