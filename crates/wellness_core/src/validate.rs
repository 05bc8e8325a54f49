//! crates/wellness_core/src/validate.rs
//!
//! Per-kind validation of the tokens remaining after command-word and
//! backdate extraction, producing a typed value or a typed rejection.

use crate::domain::{ActivityValue, EventKind};

/// Longest accepted free-text value, in characters.
pub const MAX_TEXT_LEN: usize = 4000;

/// Why a submitted value was rejected. The caller maps these to
/// kind-specific chat messages; nothing is persisted on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no value supplied")]
    MissingValue,
    #[error("value outside the accepted range")]
    OutOfRange,
    #[error("value could not be read as the expected type")]
    Format,
}

/// Validates `tokens` for `kind`. Numeric kinds read the first token and
/// ignore any trailing noise; text kinds join all tokens with single
/// spaces.
pub fn validate(kind: EventKind, tokens: &[&str]) -> Result<ActivityValue, ValidationError> {
    let first = *tokens.first().ok_or(ValidationError::MissingValue)?;

    match kind {
        EventKind::Meditation => {
            let minutes: i64 = first.parse().map_err(|_| ValidationError::Format)?;
            if !(5..=1440).contains(&minutes) {
                return Err(ValidationError::OutOfRange);
            }
            Ok(ActivityValue::Minutes(minutes))
        }
        EventKind::Anxiety | EventKind::Happiness => {
            let rating: i64 = first.parse().map_err(|_| ValidationError::Format)?;
            if !(0..=10).contains(&rating) {
                return Err(ValidationError::OutOfRange);
            }
            Ok(ActivityValue::Rating(rating))
        }
        EventKind::Sleep => {
            let hours: f64 = first.parse().map_err(|_| ValidationError::Format)?;
            if !(0.0..=24.0).contains(&hours) {
                return Err(ValidationError::OutOfRange);
            }
            Ok(ActivityValue::Hours(hours))
        }
        EventKind::Fasting => {
            let hours: f64 = first.parse().map_err(|_| ValidationError::Format)?;
            if !(hours >= 0.0) {
                return Err(ValidationError::OutOfRange);
            }
            Ok(ActivityValue::Hours(hours))
        }
        EventKind::Exercise | EventKind::Done | EventKind::Journal => {
            let text = tokens.join(" ");
            if text.is_empty() || text.chars().count() > MAX_TEXT_LEN {
                return Err(ValidationError::OutOfRange);
            }
            Ok(ActivityValue::Text(text))
        }
    }
}
