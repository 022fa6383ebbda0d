use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum RatingError {
    #[error("rating must be a finite number")]
    NonFinite,

    #[error("rating must not be negative: {0}")]
    Negative(f64),
}

/// A validated `{ id, value }` pair submitted for an evaluation or assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating<Id> {
    id: Id,
    value: f64,
}

impl<Id: Copy> Rating<Id> {
    /// # Errors
    ///
    /// Returns `RatingError` if `value` is NaN, infinite or negative.
    pub fn new(id: Id, value: f64) -> Result<Self, RatingError> {
        if !value.is_finite() {
            return Err(RatingError::NonFinite);
        }
        if value < 0.0 {
            return Err(RatingError::Negative(value));
        }
        Ok(Self { id, value })
    }

    #[must_use]
    pub fn id(&self) -> Id {
        self.id
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EvaluationId;

    #[test]
    fn accepts_zero_and_positive_values() {
        let rating = Rating::new(EvaluationId::new(1), 0.0).unwrap();
        assert_eq!(rating.value(), 0.0);
        assert_eq!(rating.id(), EvaluationId::new(1));
        assert!(Rating::new(EvaluationId::new(1), 4.5).is_ok());
    }

    #[test]
    fn rejects_nan_infinite_and_negative() {
        assert_eq!(
            Rating::new(EvaluationId::new(1), f64::NAN).unwrap_err(),
            RatingError::NonFinite
        );
        assert_eq!(
            Rating::new(EvaluationId::new(1), f64::INFINITY).unwrap_err(),
            RatingError::NonFinite
        );
        assert_eq!(
            Rating::new(EvaluationId::new(1), -1.0).unwrap_err(),
            RatingError::Negative(-1.0)
        );
    }
}
