use chrono::{DateTime, Utc};
use course_core::model::{AnswerRow, LocalizedText, RatingRow, TouchRow};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

/// Read an id column and wrap it in its newtype.
pub(crate) fn id_from_row<T>(
    row: &SqliteRow,
    column: &'static str,
    make: fn(u64) -> T,
) -> Result<T, StorageError> {
    let raw: i64 = row.try_get(column).map_err(ser)?;
    let value = u64::try_from(raw)
        .map_err(|_| StorageError::Serialization(format!("{column} sign overflow")))?;
    Ok(make(value))
}

pub(crate) fn optional_id_from_row<T>(
    row: &SqliteRow,
    column: &'static str,
    make: fn(u64) -> T,
) -> Result<Option<T>, StorageError> {
    let raw: Option<i64> = row.try_get(column).map_err(ser)?;
    raw.map(|v| {
        u64::try_from(v)
            .map(make)
            .map_err(|_| StorageError::Serialization(format!("{column} sign overflow")))
    })
    .transpose()
}

pub(crate) fn sort_order_to_i64(v: Option<u32>) -> Option<i64> {
    v.map(i64::from)
}

pub(crate) fn sort_order_from_row(row: &SqliteRow) -> Result<Option<u32>, StorageError> {
    let raw: Option<i64> = row.try_get("sort_order").map_err(ser)?;
    raw.map(|v| {
        u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid sort_order: {v}")))
    })
    .transpose()
}

/// Localized text columns hold the JSON form (string or locale map).
pub(crate) fn text_to_sql(text: &LocalizedText) -> Result<String, StorageError> {
    serde_json::to_string(text).map_err(ser)
}

pub(crate) fn optional_text_to_sql(
    text: Option<&LocalizedText>,
) -> Result<Option<String>, StorageError> {
    text.map(text_to_sql).transpose()
}

pub(crate) fn text_from_row(
    row: &SqliteRow,
    column: &'static str,
) -> Result<LocalizedText, StorageError> {
    let raw: String = row.try_get(column).map_err(ser)?;
    serde_json::from_str(&raw).map_err(ser)
}

pub(crate) fn optional_text_from_row(
    row: &SqliteRow,
    column: &'static str,
) -> Result<Option<LocalizedText>, StorageError> {
    let raw: Option<String> = row.try_get(column).map_err(ser)?;
    raw.map(|s| serde_json::from_str(&s).map_err(ser)).transpose()
}

fn created_at(row: &SqliteRow) -> Result<DateTime<Utc>, StorageError> {
    row.try_get("created_at").map_err(ser)
}

pub(crate) fn map_touch_row(row: &SqliteRow) -> Result<TouchRow, StorageError> {
    Ok(TouchRow::at(created_at(row)?))
}

pub(crate) fn map_rating_row(row: &SqliteRow) -> Result<RatingRow, StorageError> {
    Ok(RatingRow::new(
        row.try_get::<f64, _>("value").map_err(ser)?,
        created_at(row)?,
    ))
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<AnswerRow, StorageError> {
    Ok(AnswerRow::new(
        row.try_get::<String, _>("answer").map_err(ser)?,
        created_at(row)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflowing_ids_are_rejected() {
        assert!(id_to_i64("course_id", u64::MAX).is_err());
        assert_eq!(id_to_i64("course_id", 7).unwrap(), 7);
    }

    #[test]
    fn localized_text_keeps_its_shape() {
        let plain = LocalizedText::plain("Intro");
        assert_eq!(text_to_sql(&plain).unwrap(), "\"Intro\"");

        let map = LocalizedText::localized([("en", "Intro"), ("fr", "Introduction")]);
        let json = text_to_sql(&map).unwrap();
        let back: LocalizedText = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
