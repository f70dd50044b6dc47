//! In-memory post store.
//!
//! Implements the full `PostStore` contract against a vec guarded by a
//! RwLock, with real cosine similarity over the configured embedding
//! provider. Deterministic and dependency-free, which makes it the store
//! of choice for tests; the contract is identical to `LanceStore`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::post::{NewPost, Post, SeriesSummary, SimilarityMatch};
use crate::storage::{summarize_series, PostStore};

/// In-memory store over a vec of (post, embedding) pairs
pub struct InMemoryStore {
    embedder: Arc<dyn EmbeddingProvider>,
    records: RwLock<Vec<(Post, Vec<f32>)>>,
}

impl InMemoryStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            records: RwLock::new(Vec::new()),
        }
    }
}

/// Cosine similarity of two equal-length vectors, clamped to [0, 1]
pub fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn insert(&self, post: NewPost) -> Result<Post> {
        post.validate()?;

        let embedding = self.embedder.embed(&post.document()).await?;
        if embedding.len() != self.embedder.dimensions() {
            return Err(Error::validation(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.embedder.dimensions(),
                embedding.len()
            )));
        }

        // Write lock covers order computation and the push, so concurrent
        // continuations of the same series serialize here.
        let mut records = self.records.write().await;

        let series_order = match &post.series_id {
            Some(sid) => {
                let next = records
                    .iter()
                    .filter(|(p, _)| {
                        p.owner == post.owner && p.series_id.as_deref() == Some(sid.as_str())
                    })
                    .filter_map(|(p, _)| p.series_order)
                    .max()
                    .unwrap_or(0)
                    + 1;
                if let Some(requested) = post.series_order {
                    if requested != next {
                        return Err(Error::validation(format!(
                            "series_order {} does not match next order {}",
                            requested, next
                        )));
                    }
                }
                Some(next)
            }
            None => None,
        };

        let stored = Post {
            id: Uuid::new_v4(),
            owner: post.owner,
            topic: post.topic,
            body: post.body,
            tone: post.tone,
            audience: post.audience,
            length: post.length,
            series_id: post.series_id,
            series_order,
            created_at: Utc::now(),
        };

        records.push((stored.clone(), embedding));
        Ok(stored)
    }

    async fn search_similar(
        &self,
        owner: &str,
        query_text: &str,
        k: usize,
        series_id: Option<&str>,
    ) -> Result<Vec<SimilarityMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(query_text).await?;
        let records = self.records.read().await;

        // Stage 1: exact metadata restriction. Stage 2: rank what's left.
        let mut matches: Vec<SimilarityMatch> = records
            .iter()
            .filter(|(p, _)| p.owner == owner)
            .filter(|(p, _)| series_id.is_none() || p.series_id.as_deref() == series_id)
            .map(|(p, v)| SimilarityMatch {
                post: p.clone(),
                score: cosine_score(&query, v),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(k);
        Ok(matches)
    }

    async fn get_series(&self, owner: &str, series_id: &str) -> Result<Vec<Post>> {
        let records = self.records.read().await;
        let mut posts: Vec<Post> = records
            .iter()
            .filter(|(p, _)| p.owner == owner && p.series_id.as_deref() == Some(series_id))
            .map(|(p, _)| p.clone())
            .collect();
        posts.sort_by_key(|p| p.series_order.unwrap_or(0));
        Ok(posts)
    }

    async fn list_series(&self, owner: &str) -> Result<Vec<SeriesSummary>> {
        let records = self.records.read().await;
        let posts: Vec<Post> = records
            .iter()
            .filter(|(p, _)| p.owner == owner)
            .map(|(p, _)| p.clone())
            .collect();
        Ok(summarize_series(posts))
    }

    async fn list_history(&self, owner: &str, limit: usize) -> Result<Vec<Post>> {
        let records = self.records.read().await;
        let mut posts: Vec<Post> = records
            .iter()
            .filter(|(p, _)| p.owner == owner)
            .map(|(p, _)| p.clone())
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit);
        Ok(posts)
    }

    async fn count_posts(&self, owner: &str) -> Result<usize> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|(p, _)| p.owner == owner).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{Audience, LengthClass, Tone};

    /// Deterministic embedder: maps known strings to fixed 2-d vectors so
    /// tests can engineer exact similarity scores.
    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            // Direction derived from a simple content hash, stable per text
            let h = text
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let angle = (h % 1000) as f32 / 1000.0 * std::f32::consts::PI;
            Ok(vec![angle.cos(), angle.sin()])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn new_post(owner: &str, topic: &str, series_id: Option<&str>) -> NewPost {
        NewPost {
            owner: owner.to_string(),
            topic: topic.to_string(),
            body: format!("Body for {}", topic),
            tone: Tone::Professional,
            audience: Audience::General,
            length: LengthClass::Medium,
            series_id: series_id.map(|s| s.to_string()),
            series_order: None,
        }
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new(Arc::new(FixedEmbedder))
    }

    #[tokio::test]
    async fn cosine_is_exact_at_engineered_scores() {
        let a = [1.0, 0.0];
        let b = [0.75, (1.0f32 - 0.75 * 0.75).sqrt()];
        assert!((cosine_score(&a, &b) - 0.75).abs() < 1e-6);
        assert_eq!(cosine_score(&a, &[-1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn search_never_crosses_owners() {
        let store = store();
        // Identical topics for two owners => identical embeddings
        store.insert(new_post("u1", "Remote work", None)).await.unwrap();
        store.insert(new_post("u2", "Remote work", None)).await.unwrap();

        let matches = store.search_similar("u1", "Remote work", 10, None).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].post.owner, "u1");
    }

    #[tokio::test]
    async fn series_order_is_contiguous_under_concurrency() {
        let store = Arc::new(store());
        store.insert(new_post("u1", "Series opener", Some("s1"))).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert(new_post("u1", &format!("Continuation {}", i), Some("s1")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let series = store.get_series("u1", "s1").await.unwrap();
        let orders: Vec<u32> = series.iter().filter_map(|p| p.series_order).collect();
        assert_eq!(orders, (1..=9).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn mismatched_requested_order_is_rejected() {
        let store = store();
        store.insert(new_post("u1", "Series opener", Some("s1"))).await.unwrap();

        let mut post = new_post("u1", "Wrong order", Some("s1"));
        post.series_order = Some(5);
        let err = store.insert(post).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // The failed insert left nothing behind
        assert_eq!(store.count_posts("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fewer_matches_than_k_is_fine() {
        let store = store();
        store.insert(new_post("u1", "Only one post", None)).await.unwrap();
        let matches = store.search_similar("u1", "anything", 3, None).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert!(store
            .search_similar("nobody", "anything", 3, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn history_is_most_recent_first() {
        let store = store();
        for i in 0..5 {
            store.insert(new_post("u1", &format!("Topic {}", i), None)).await.unwrap();
        }
        let history = store.list_history("u1", 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn series_summaries() {
        let store = store();
        store.insert(new_post("u1", "First in s1", Some("s1"))).await.unwrap();
        store.insert(new_post("u1", "Second in s1", Some("s1"))).await.unwrap();
        store.insert(new_post("u1", "Standalone", None)).await.unwrap();

        let summaries = store.list_series("u1").await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].series_id, "s1");
        assert_eq!(summaries[0].total_posts, 2);
        assert_eq!(summaries[0].first_topic, "First in s1");
        assert_eq!(summaries[0].last_topic, "Second in s1");
    }
}
