//! Output validation for generated post bodies.
//!
//! Length checks are soft: a body outside the requested length class's
//! approximate bound is flagged and logged, never rejected. Only an empty
//! body is a hard failure, since there is nothing to persist.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::post::LengthClass;

/// Check a generated body. Returns human-readable warnings for soft
/// issues; errors only when the body is unusable.
pub fn check_body(body: &str, length: LengthClass, config: &Config) -> Result<Vec<String>> {
    if body.trim().is_empty() {
        return Err(Error::generation("Backend returned an empty body"));
    }

    let mut warnings = Vec::new();
    let chars = body.chars().count();

    let (min, max) = length.char_bounds();
    if chars < min {
        warnings.push(format!(
            "Generated post is shorter than the {} target ({} chars, expected at least {})",
            length, chars, min
        ));
    } else if chars > max {
        warnings.push(format!(
            "Generated post is longer than the {} target ({} chars, expected at most {})",
            length, chars, max
        ));
    }

    if chars < config.min_post_length {
        warnings.push(format!(
            "Generated post is below the platform minimum of {} chars",
            config.min_post_length
        ));
    }
    if chars > config.max_post_length {
        warnings.push(format!(
            "Generated post exceeds the platform limit of {} chars",
            config.max_post_length
        ));
    }

    for warning in &warnings {
        tracing::warn!(chars, length = %length, "{}", warning);
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_hard_failure() {
        let config = Config::default();
        assert!(check_body("   ", LengthClass::Short, &config).is_err());
    }

    #[test]
    fn out_of_bounds_length_is_soft() {
        let config = Config::default();
        let short_body = "Too short".to_string();
        let warnings = check_body(&short_body, LengthClass::Long, &config).unwrap();
        assert!(!warnings.is_empty());

        let fitting = "x".repeat(500);
        let warnings = check_body(&fitting, LengthClass::Medium, &config).unwrap();
        assert!(warnings.is_empty());
    }
}
