//! Storage backends for plume-memory

use async_trait::async_trait;

use crate::error::Result;
use crate::post::{NewPost, Post, SeriesSummary, SimilarityMatch};

mod lance;
mod memory;

pub use lance::LanceStore;
pub use memory::InMemoryStore;

/// Owner-scoped post record store over a metadata-filtered vector index.
///
/// Implementations must guarantee:
/// - search never compares vectors across owners (the owner filter is
///   applied before ranking, not after);
/// - insert is all-or-nothing, and series order assignment is serialized
///   per store so concurrent continuations of one series never collide.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Persist a post and its embedding, returning the stored record.
    ///
    /// When `post.series_order` is `None` and a `series_id` is set, the
    /// next order in the series is assigned atomically. A supplied order
    /// must equal that computed value or the insert fails with
    /// `Error::Validation`.
    async fn insert(&self, post: NewPost) -> Result<Post>;

    /// Two-stage lookup: restrict to `owner` (and `series_id` when given)
    /// by exact metadata match, then rank by cosine similarity to
    /// `query_text`. Returns up to `k` matches, most similar first; fewer
    /// when fewer records match, empty when the owner has none.
    async fn search_similar(
        &self,
        owner: &str,
        query_text: &str,
        k: usize,
        series_id: Option<&str>,
    ) -> Result<Vec<SimilarityMatch>>;

    /// All posts for `owner` in the given series, ascending by
    /// `series_order`. Returns an empty vec when no such series exists;
    /// callers treat empty as "no such series".
    async fn get_series(&self, owner: &str, series_id: &str) -> Result<Vec<Post>>;

    /// Summaries of every distinct series owned by `owner`
    async fn list_series(&self, owner: &str) -> Result<Vec<SeriesSummary>>;

    /// The most recent `limit` posts for `owner`, descending by creation time
    async fn list_history(&self, owner: &str, limit: usize) -> Result<Vec<Post>>;

    /// Total posts for `owner`
    async fn count_posts(&self, owner: &str) -> Result<usize>;
}

/// Group an owner's posts into per-series summaries. Shared by store
/// implementations, which only differ in how they scan records.
pub(crate) fn summarize_series(mut posts: Vec<Post>) -> Vec<SeriesSummary> {
    use std::collections::BTreeMap;

    posts.retain(|p| p.series_id.is_some());
    posts.sort_by_key(|p| p.series_order.unwrap_or(0));

    let mut by_series: BTreeMap<String, Vec<Post>> = BTreeMap::new();
    for post in posts {
        let sid = post.series_id.clone().unwrap_or_default();
        by_series.entry(sid).or_default().push(post);
    }

    let mut summaries: Vec<SeriesSummary> = by_series
        .into_iter()
        .map(|(series_id, posts)| SeriesSummary {
            series_id,
            total_posts: posts.len(),
            first_topic: posts.first().map(|p| p.topic.clone()).unwrap_or_default(),
            last_topic: posts.last().map(|p| p.topic.clone()).unwrap_or_default(),
            created_at: posts
                .iter()
                .map(|p| p.created_at)
                .min()
                .unwrap_or_else(chrono::Utc::now),
        })
        .collect();

    summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    summaries
}
