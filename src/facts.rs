//! Fact aggregation for series continuity.
//!
//! Every prior post in a series is run through the extraction collaborator
//! and the resulting facts are concatenated in series order. Order is a
//! correctness property: later posts must not contradict facts established
//! earlier, and prompt context is order-sensitive, so extraction runs
//! sequentially and never reorders.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::FactExtractor;
use crate::error::{Error, Result};
use crate::post::Post;

/// An atomic claim extracted from one post's body. Derived per request,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    /// `series_order` of the post this fact came from
    pub source_order: u32,
    pub text: String,
}

/// Runs fact extraction over a series
pub struct FactAggregator {
    extractor: Arc<dyn FactExtractor>,
    timeout: Duration,
}

impl FactAggregator {
    pub fn new(extractor: Arc<dyn FactExtractor>, timeout: Duration) -> Self {
        Self { extractor, timeout }
    }

    /// Extract facts from every post, in series order. Duplicate facts
    /// across posts are kept. Any extraction failure aborts the whole
    /// aggregation: a partial fact set risks inconsistent continuity.
    pub async fn aggregate(&self, series_posts: &[Post]) -> Result<Vec<Fact>> {
        let mut facts = Vec::new();

        for post in series_posts {
            let order = post.series_order.unwrap_or(0);
            let extracted =
                tokio::time::timeout(self.timeout, self.extractor.extract(&post.topic, &post.body))
                    .await
                    .map_err(|_| {
                        Error::fact_extraction(format!(
                            "Extraction timed out for post {} of series",
                            order
                        ))
                    })??;

            tracing::debug!(
                post_id = %post.id,
                series_order = order,
                facts = extracted.len(),
                "Extracted facts"
            );

            facts.extend(extracted.into_iter().map(|text| Fact {
                source_order: order,
                text,
            }));
        }

        Ok(facts)
    }
}
