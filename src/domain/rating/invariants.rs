use crate::domain::{DomainError, DomainResult};

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 10;

/// Scores live on a 10-point scale
pub fn validate_score(score: i32) -> DomainResult<()> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(DomainError::ScoreOutOfRange {
            score,
            min: MIN_SCORE,
            max: MAX_SCORE,
        })
    }
}

/// Critical Rating Invariants:
///
/// 1. At most one rating per (user, series); a second write updates it
/// 2. A rating can only be written while the series is Finished for the user
/// 3. Score is within MIN_SCORE..=MAX_SCORE

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_bounds() {
        assert!(validate_score(1).is_ok());
        assert!(validate_score(10).is_ok());
        assert!(validate_score(0).is_err());
        assert!(validate_score(11).is_err());
    }
}
