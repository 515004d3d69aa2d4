use crate::error::ApiError;

pub const MAX_LIMIT: usize = 100;

/// Rejects out-of-range `limit` query values instead of silently clamping.
pub fn validate_limit(limit: Option<usize>) -> Result<Option<usize>, ApiError> {
    match limit {
        Some(limit) if !(1..=MAX_LIMIT).contains(&limit) => Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        ))),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_missing_and_in_range_limits() {
        assert_eq!(validate_limit(None).unwrap(), None);
        assert_eq!(validate_limit(Some(1)).unwrap(), Some(1));
        assert_eq!(validate_limit(Some(MAX_LIMIT)).unwrap(), Some(MAX_LIMIT));
    }

    #[test]
    fn rejects_zero_and_oversized_limits() {
        assert!(matches!(validate_limit(Some(0)), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            validate_limit(Some(MAX_LIMIT + 1)),
            Err(ApiError::BadRequest(_))
        ));
    }
}
