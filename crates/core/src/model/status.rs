use serde::{Deserialize, Serialize};

/// Tri-state progress of a course or module for the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ContentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::NotStarted => "not_started",
            ContentStatus::InProgress => "in_progress",
            ContentStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-only state carried by list items between an optimistic edit and
/// server confirmation. Never serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientFlags {
    /// The item is being dragged in a reorderable list.
    pub dragging: bool,
    /// A persistence call for this item has not been acknowledged yet.
    pub pending: bool,
}

impl ClientFlags {
    #[must_use]
    pub fn is_clear(&self) -> bool {
        !self.dragging && !self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ContentStatus::NotStarted).unwrap();
        assert_eq!(json, r#""not_started""#);
        assert_eq!(ContentStatus::InProgress.to_string(), "in_progress");
    }
}
