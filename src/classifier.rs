//! Similarity classification: turns a search score into a novelty verdict
//! and a user-facing message.

use crate::post::{SimilarityMatch, StyleMode};

/// Similarity score at or above which a prior post counts as "the same
/// topic". This is the single binary decision threshold; every call site
/// that branches on topic novelty keys off this constant.
pub const SIMILARITY_THRESHOLD: f32 = 0.75;

/// Band a similarity score falls into. Lower bounds are closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBand {
    /// [0.90, 1.00]
    NearIdentical,
    /// [0.75, 0.90)
    SimilarDifferentAngle,
    /// [0.50, 0.75)
    Related,
    /// [0, 0.50)
    Unrelated,
}

/// Verdict on whether the owner has covered a topic before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicNovelty {
    pub topic_exists: bool,
    pub band: SimilarityBand,
}

/// Classify a similarity score
pub fn classify(score: f32) -> TopicNovelty {
    let band = if score >= 0.90 {
        SimilarityBand::NearIdentical
    } else if score >= SIMILARITY_THRESHOLD {
        SimilarityBand::SimilarDifferentAngle
    } else if score >= 0.50 {
        SimilarityBand::Related
    } else {
        SimilarityBand::Unrelated
    };

    TopicNovelty {
        topic_exists: score >= SIMILARITY_THRESHOLD,
        band,
    }
}

/// Matches at or above the threshold, in search order
pub fn matches_above_threshold(matches: &[SimilarityMatch]) -> Vec<&SimilarityMatch> {
    matches
        .iter()
        .filter(|m| m.score >= SIMILARITY_THRESHOLD)
        .collect()
}

/// Build the user-facing message about topic history. Display only, never
/// used for control flow.
pub fn topic_message(
    topic_exists: bool,
    top_match: Option<&SimilarityMatch>,
    style_mode: StyleMode,
) -> String {
    let top = match (topic_exists, top_match) {
        (true, Some(top)) => top,
        _ => return "This is a fresh topic for you!".to_string(),
    };

    let percent = (top.score * 100.0).round() as u32;
    match style_mode {
        StyleMode::Similar => format!(
            "You've posted about '{}' before ({}% similar). I'll match your established style.",
            top.topic(),
            percent
        ),
        StyleMode::Different => format!(
            "You've posted about '{}' before ({}% similar). I'll bring a fresh angle.",
            top.topic(),
            percent
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{Audience, LengthClass, Post, Tone};
    use chrono::Utc;
    use uuid::Uuid;

    fn matched(topic: &str, score: f32) -> SimilarityMatch {
        SimilarityMatch {
            post: Post {
                id: Uuid::new_v4(),
                owner: "u1".to_string(),
                topic: topic.to_string(),
                body: "body".to_string(),
                tone: Tone::Professional,
                audience: Audience::General,
                length: LengthClass::Medium,
                series_id: None,
                series_order: None,
                created_at: Utc::now(),
            },
            score,
        }
    }

    #[test]
    fn threshold_is_closed_on_lower_edge() {
        assert!(classify(0.75).topic_exists);
        assert!(!classify(0.749999).topic_exists);
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(classify(1.0).band, SimilarityBand::NearIdentical);
        assert_eq!(classify(0.90).band, SimilarityBand::NearIdentical);
        assert_eq!(classify(0.89).band, SimilarityBand::SimilarDifferentAngle);
        assert_eq!(classify(0.75).band, SimilarityBand::SimilarDifferentAngle);
        assert_eq!(classify(0.74).band, SimilarityBand::Related);
        assert_eq!(classify(0.50).band, SimilarityBand::Related);
        assert_eq!(classify(0.49).band, SimilarityBand::Unrelated);
        assert_eq!(classify(0.0).band, SimilarityBand::Unrelated);
    }

    #[test]
    fn message_mentions_topic_and_rounded_percent() {
        let top = matched("Remote work", 0.824);
        let msg = topic_message(true, Some(&top), StyleMode::Different);
        assert!(msg.contains("Remote work"));
        assert!(msg.contains("82%"));
        assert!(msg.contains("fresh angle"));

        let msg = topic_message(true, Some(&top), StyleMode::Similar);
        assert!(msg.contains("established style"));
    }

    #[test]
    fn fresh_topic_message() {
        let msg = topic_message(false, None, StyleMode::Similar);
        assert_eq!(msg, "This is a fresh topic for you!");
    }

    #[test]
    fn filters_below_threshold() {
        let matches = vec![matched("a", 0.9), matched("b", 0.7), matched("c", 0.76)];
        let above = matches_above_threshold(&matches);
        assert_eq!(above.len(), 2);
        assert_eq!(above[0].topic(), "a");
        assert_eq!(above[1].topic(), "c");
    }
}
