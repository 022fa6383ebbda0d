use serde::Serialize;

//
// ─── STEP TYPE ─────────────────────────────────────────────────────────────────
//

/// Content variant selected by a step's `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepType {
    /// `reading` (lessons) or `descriptive` (module steps).
    Reading,
    /// `questions`
    Questions,
    /// `evaluations` (lessons) or `subskill_evaluations` (module steps).
    Evaluations,
    /// `assessment` (lessons) or `skill_evaluation` (module steps).
    Assessment,
    /// Any tag this version does not know; such steps never count as complete.
    Unknown(String),
}

impl StepType {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "reading" | "descriptive" => Self::Reading,
            "questions" => Self::Questions,
            "evaluations" | "subskill_evaluations" => Self::Evaluations,
            "assessment" | "skill_evaluation" => Self::Assessment,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// Lesson-side tag; unknown steps keep their original tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Reading => "reading",
            Self::Questions => "questions",
            Self::Evaluations => "evaluations",
            Self::Assessment => "assessment",
            Self::Unknown(tag) => tag,
        }
    }
}

//
// ─── ITEM CAPABILITIES ────────────────────────────────────────────────────────
//

/// An item that the user answers (quiz question, module question).
pub trait Answerable {
    fn is_answered(&self) -> bool;
}

/// An item that the user rates (evaluation, assessment).
pub trait Rated {
    fn user_rating(&self) -> Option<f64>;

    fn is_rated(&self) -> bool {
        self.user_rating().is_some()
    }
}

//
// ─── STEP CONTENT ──────────────────────────────────────────────────────────────
//

/// Payload of a step; exactly one variant per step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "items", rename_all = "snake_case")]
pub enum StepContent<Q, E, A> {
    Reading,
    Questions(Vec<Q>),
    Evaluations(Vec<E>),
    Assessment(Option<A>),
    Unknown(String),
}

impl<Q, E, A> StepContent<Q, E, A> {
    #[must_use]
    pub fn step_type(&self) -> StepType {
        match self {
            Self::Reading => StepType::Reading,
            Self::Questions(_) => StepType::Questions,
            Self::Evaluations(_) => StepType::Evaluations,
            Self::Assessment(_) => StepType::Assessment,
            Self::Unknown(tag) => StepType::Unknown(tag.clone()),
        }
    }

    /// Number of answerable or rateable items carried by the step.
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::Reading | Self::Unknown(_) => 0,
            Self::Questions(items) => items.len(),
            Self::Evaluations(items) => items.len(),
            Self::Assessment(item) => usize::from(item.is_some()),
        }
    }
}

/// A lesson or module step as seen by the completion classifier.
pub trait Step {
    type Question: Answerable;
    type Evaluation: Rated;
    type Assessment: Rated;

    /// Whether the user's touch marker exists for this step.
    fn touched(&self) -> bool;

    fn content(&self) -> &StepContent<Self::Question, Self::Evaluation, Self::Assessment>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_map_to_variants() {
        assert_eq!(StepType::from_tag("reading"), StepType::Reading);
        assert_eq!(StepType::from_tag("descriptive"), StepType::Reading);
        assert_eq!(StepType::from_tag("questions"), StepType::Questions);
        assert_eq!(StepType::from_tag("evaluations"), StepType::Evaluations);
        assert_eq!(StepType::from_tag("subskill_evaluations"), StepType::Evaluations);
        assert_eq!(StepType::from_tag("assessment"), StepType::Assessment);
        assert_eq!(StepType::from_tag("skill_evaluation"), StepType::Assessment);
    }

    #[test]
    fn unknown_tag_keeps_its_text() {
        assert_eq!(
            StepType::from_tag("video"),
            StepType::Unknown("video".to_string())
        );
        assert_eq!(StepType::from_tag(""), StepType::Unknown(String::new()));
        assert_eq!(StepType::from_tag("video").as_str(), "video");
    }

    #[test]
    fn module_tags_read_as_lesson_tags() {
        assert_eq!(StepType::from_tag("descriptive").as_str(), "reading");
        assert_eq!(StepType::from_tag("skill_evaluation").as_str(), "assessment");
    }

    #[test]
    fn item_count_per_variant() {
        type Content = StepContent<u8, u8, u8>;
        assert_eq!(Content::Reading.item_count(), 0);
        assert_eq!(Content::Questions(vec![1, 2]).item_count(), 2);
        assert_eq!(Content::Assessment(None).item_count(), 0);
        assert_eq!(Content::Assessment(Some(1)).item_count(), 1);
    }
}
