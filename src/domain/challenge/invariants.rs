use super::entity::Challenge;
use crate::domain::{DomainError, DomainResult};

/// A challenge needs a positive target to ever be completable
pub fn validate_challenge(challenge: &Challenge) -> DomainResult<()> {
    if challenge.target_count == 0 {
        return Err(DomainError::InvariantViolation(format!(
            "Challenge {} ('{}') has a zero target",
            challenge.id, challenge.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_target_is_rejected() {
        let challenge = Challenge {
            id: 3,
            name: "Nothing".to_string(),
            category: "series".to_string(),
            target_count: 0,
        };
        assert!(validate_challenge(&challenge).is_err());
    }
}
