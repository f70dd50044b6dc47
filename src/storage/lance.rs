//! Vector storage using LanceDB: metadata pre-filter, then cosine ranking

use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lance_arrow::FixedSizeListArrayExt;
use lancedb::connect;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::post::{NewPost, Post, SeriesSummary, SimilarityMatch};
use crate::storage::{summarize_series, PostStore};

const TABLE_NAME: &str = "posts";

/// Upper bound on records scanned for non-vector listings
const SCAN_LIMIT: usize = 10_000;

/// LanceDB-backed post store
pub struct LanceStore {
    db: lancedb::Connection,
    embedder: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
    /// Serializes inserts so series order computation and the write are
    /// one atomic step per store.
    write_lock: Mutex<()>,
}

impl LanceStore {
    /// Open (or create) the posts table at the configured path
    pub async fn new(config: &Config, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let path = config.vector_db_path();
        let db = connect(
            path.to_str()
                .ok_or_else(|| Error::config("Vector db path is not valid UTF-8"))?,
        )
        .execute()
        .await
        .map_err(|e| Error::search(e.to_string()))?;

        let store = Self {
            db,
            embedder,
            dimensions: config.embedding_dimensions,
            write_lock: Mutex::new(()),
        };

        store.ensure_table().await?;
        Ok(store)
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("owner", DataType::Utf8, false),
            Field::new("topic", DataType::Utf8, false),
            Field::new("body", DataType::Utf8, false),
            Field::new("tone", DataType::Utf8, false),
            Field::new("audience", DataType::Utf8, false),
            Field::new("length", DataType::Utf8, false),
            Field::new("series_id", DataType::Utf8, true),
            Field::new("series_order", DataType::Int32, true),
            Field::new("created_at", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimensions as i32,
                ),
                false,
            ),
        ])
    }

    async fn ensure_table(&self) -> Result<()> {
        let tables = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| Error::search(e.to_string()))?;

        if !tables.contains(&TABLE_NAME.to_string()) {
            let schema = Arc::new(self.schema());
            let empty_batch = RecordBatch::new_empty(schema.clone());
            let reader = RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema);

            self.db
                .create_table(TABLE_NAME, Box::new(reader))
                .execute()
                .await
                .map_err(|e| Error::search(e.to_string()))?;
        }

        Ok(())
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| Error::search(e.to_string()))
    }

    /// Escape a string literal for a LanceDB filter expression
    fn quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn owner_filter(owner: &str, series_id: Option<&str>) -> String {
        match series_id {
            Some(sid) => format!(
                "owner = {} AND series_id = {}",
                Self::quote(owner),
                Self::quote(sid)
            ),
            None => format!("owner = {}", Self::quote(owner)),
        }
    }

    /// Scan posts matching a metadata filter, no vector ranking
    async fn scan(&self, filter: &str) -> Result<Vec<Post>> {
        let table = self.open_table().await?;
        let stream = table
            .query()
            .only_if(filter.to_string())
            .limit(SCAN_LIMIT)
            .execute()
            .await
            .map_err(|e| Error::search(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| Error::search(e.to_string()))?;

        let mut posts = Vec::new();
        for batch in batches {
            posts.extend(rows_to_posts(&batch)?.into_iter().map(|(post, _)| post));
        }
        Ok(posts)
    }

    /// Highest series_order in a series, 0 when the series is empty.
    /// Only called with the write lock held.
    async fn max_series_order(&self, owner: &str, series_id: &str) -> Result<u32> {
        let posts = self.scan(&Self::owner_filter(owner, Some(series_id))).await?;
        Ok(posts.iter().filter_map(|p| p.series_order).max().unwrap_or(0))
    }
}

#[async_trait]
impl PostStore for LanceStore {
    async fn insert(&self, post: NewPost) -> Result<Post> {
        post.validate()?;

        let embedding = self.embedder.embed(&post.document()).await?;
        if embedding.len() != self.dimensions {
            return Err(Error::validation(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        // Hold the write lock across order computation and the table add
        let _guard = self.write_lock.lock().await;

        let series_order = match &post.series_id {
            Some(sid) => {
                let next = self.max_series_order(&post.owner, sid).await? + 1;
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

        let schema = Arc::new(self.schema());
        let values = Float32Array::from(embedding);
        let vector_array = FixedSizeListArray::try_new_from_values(values, self.dimensions as i32)
            .map_err(|e: arrow_schema::ArrowError| Error::persistence(e.to_string()))?;

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![stored.id.to_string()])) as Arc<dyn Array>,
                Arc::new(StringArray::from(vec![stored.owner.clone()])),
                Arc::new(StringArray::from(vec![stored.topic.clone()])),
                Arc::new(StringArray::from(vec![stored.body.clone()])),
                Arc::new(StringArray::from(vec![stored.tone.to_string()])),
                Arc::new(StringArray::from(vec![stored.audience.to_string()])),
                Arc::new(StringArray::from(vec![stored.length.to_string()])),
                Arc::new(StringArray::from(vec![stored.series_id.clone()])),
                Arc::new(Int32Array::from(vec![stored
                    .series_order
                    .map(|o| o as i32)])),
                Arc::new(StringArray::from(vec![stored.created_at.to_rfc3339()])),
                Arc::new(vector_array),
            ],
        )
        .map_err(|e| Error::persistence(e.to_string()))?;

        let reader = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);
        let table = self.open_table().await?;
        table
            .add(Box::new(reader))
            .execute()
            .await
            .map_err(|e| Error::persistence(e.to_string()))?;

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

        let query_embedding = self.embedder.embed(query_text).await?;
        let table = self.open_table().await?;

        // Metadata restriction runs before ranking: the filter is part of
        // the query, never applied to a cross-owner result set.
        let stream = table
            .vector_search(query_embedding)
            .map_err(|e: lancedb::Error| Error::search(e.to_string()))?
            .distance_type(DistanceType::Cosine)
            .only_if(Self::owner_filter(owner, series_id))
            .limit(k)
            .execute()
            .await
            .map_err(|e: lancedb::Error| Error::search(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e: lancedb::Error| Error::search(e.to_string()))?;

        let mut matches = Vec::new();
        for batch in batches {
            for (post, distance) in rows_to_posts(&batch)? {
                let distance =
                    distance.ok_or_else(|| Error::search("Missing _distance column"))?;
                // Cosine distance is 1 - cos; clamp so the score stays in [0, 1]
                matches.push(SimilarityMatch {
                    post,
                    score: (1.0 - distance).clamp(0.0, 1.0),
                });
            }
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(matches)
    }

    async fn get_series(&self, owner: &str, series_id: &str) -> Result<Vec<Post>> {
        let mut posts = self.scan(&Self::owner_filter(owner, Some(series_id))).await?;
        posts.sort_by_key(|p| p.series_order.unwrap_or(0));
        Ok(posts)
    }

    async fn list_series(&self, owner: &str) -> Result<Vec<SeriesSummary>> {
        let posts = self.scan(&Self::owner_filter(owner, None)).await?;
        Ok(summarize_series(posts))
    }

    async fn list_history(&self, owner: &str, limit: usize) -> Result<Vec<Post>> {
        let mut posts = self.scan(&Self::owner_filter(owner, None)).await?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit);
        Ok(posts)
    }

    async fn count_posts(&self, owner: &str) -> Result<usize> {
        Ok(self.scan(&Self::owner_filter(owner, None)).await?.len())
    }
}

/// Decode a record batch into posts, with the `_distance` value when the
/// batch came from a vector search
fn rows_to_posts(batch: &RecordBatch) -> Result<Vec<(Post, Option<f32>)>> {
    fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
        batch
            .column_by_name(name)
            .ok_or_else(|| Error::search(format!("Missing {} column", name)))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| Error::search(format!("{} column is not StringArray", name)))
    }

    let ids = string_col(batch, "id")?;
    let owners = string_col(batch, "owner")?;
    let topics = string_col(batch, "topic")?;
    let bodies = string_col(batch, "body")?;
    let tones = string_col(batch, "tone")?;
    let audiences = string_col(batch, "audience")?;
    let lengths = string_col(batch, "length")?;
    let series_ids = string_col(batch, "series_id")?;
    let created_ats = string_col(batch, "created_at")?;

    let series_orders = batch
        .column_by_name("series_order")
        .ok_or_else(|| Error::search("Missing series_order column"))?
        .as_any()
        .downcast_ref::<Int32Array>()
        .ok_or_else(|| Error::search("series_order column is not Int32Array"))?;

    let distances = match batch.column_by_name("_distance") {
        Some(col) => Some(
            col.as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| Error::search("_distance column is not Float32Array"))?,
        ),
        None => None,
    };

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let post = Post {
            id: Uuid::parse_str(ids.value(i)).map_err(|e| Error::search(e.to_string()))?,
            owner: owners.value(i).to_string(),
            topic: topics.value(i).to_string(),
            body: bodies.value(i).to_string(),
            tone: tones.value(i).parse()?,
            audience: audiences.value(i).parse()?,
            length: lengths.value(i).parse()?,
            series_id: (!series_ids.is_null(i)).then(|| series_ids.value(i).to_string()),
            series_order: (!series_orders.is_null(i)).then(|| series_orders.value(i) as u32),
            created_at: chrono::DateTime::parse_from_rfc3339(created_ats.value(i))
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::search(e.to_string()))?,
        };
        rows.push((post, distances.map(|d| d.value(i))));
    }

    Ok(rows)
}
