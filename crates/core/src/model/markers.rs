//! User-scoped join rows and the helpers that collapse them.
//!
//! The query layer returns every `user_<x>` relation as an array filtered to
//! the current user. Projection never keeps those arrays: touch relations
//! become a presence flag and rating relations become the first value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Presence-only join row ("the user reached this node").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TouchRow {
    #[must_use]
    pub fn at(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at: Some(created_at),
        }
    }
}

/// Join row carrying a numeric rating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RatingRow {
    #[must_use]
    pub fn new(value: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            value: Some(value),
            created_at: Some(created_at),
        }
    }
}

/// Join row carrying a free-text answer to a module question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRow {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AnswerRow {
    #[must_use]
    pub fn new(answer: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            answer: Some(answer.into()),
            created_at: Some(created_at),
        }
    }
}

/// True when the relation holds at least one row.
#[must_use]
pub fn is_present<T>(rows: &[T]) -> bool {
    !rows.is_empty()
}

/// Value of the first rating row, if any.
///
/// Only the first row is consulted; a first row without a value yields `None`
/// even if later rows carry one.
#[must_use]
pub fn first_value(rows: &[RatingRow]) -> Option<f64> {
    rows.first().and_then(|row| row.value)
}

/// Text of the first answer row, if any.
#[must_use]
pub fn first_answer(rows: &[AnswerRow]) -> Option<String> {
    rows.first().and_then(|row| row.answer.clone())
}

/// Deserialize an optional array, mapping a missing or `null` value to empty.
pub(crate) fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a scalar, mapping an explicit `null` to its default.
pub(crate) fn nullable_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
