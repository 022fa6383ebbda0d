use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl ParseIdError {
    /// Name of the identifier type that failed to parse.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "`")]
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map($name::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

entity_id!(
    /// Identifier of the signed-in learner whose markers scope a projection.
    UserId
);
entity_id!(
    /// Unique identifier for a Course
    CourseId
);
entity_id!(
    /// Unique identifier for a Lesson inside a course
    LessonId
);
entity_id!(
    /// Unique identifier for a lesson Question
    QuestionId
);
entity_id!(
    /// Unique identifier for an answer Option of a question
    OptionId
);
entity_id!(
    /// Unique identifier for a lesson Evaluation item
    EvaluationId
);
entity_id!(
    /// Unique identifier for a lesson Assessment
    AssessmentId
);
entity_id!(
    /// Unique identifier for a Skill
    SkillId
);
entity_id!(
    /// Unique identifier for a Subskill
    SubskillId
);
entity_id!(
    /// Unique identifier for a content Creator
    CreatorId
);
entity_id!(
    /// Unique identifier for a Module
    ModuleId
);
entity_id!(
    /// Unique identifier for a step inside a module
    ModuleStepId
);
entity_id!(
    /// Unique identifier for a question inside a module step
    ModuleQuestionId
);
entity_id!(
    /// Unique identifier for a skill evaluation inside a module step
    SkillEvaluationId
);
entity_id!(
    /// Unique identifier for a subskill evaluation inside a module step
    SubskillEvaluationId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_id_display() {
        let id = CourseId::new(42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_course_id_debug_names_the_kind() {
        assert_eq!(format!("{:?}", CourseId::new(7)), "CourseId(7)");
        assert_eq!(format!("{:?}", ModuleStepId::new(3)), "ModuleStepId(3)");
    }

    #[test]
    fn test_lesson_id_from_str() {
        let id: LessonId = "123".parse().unwrap();
        assert_eq!(id, LessonId::new(123));
    }

    #[test]
    fn test_option_id_from_str_trims_whitespace() {
        let id: OptionId = " 9 ".parse().unwrap();
        assert_eq!(id, OptionId::new(9));
    }

    #[test]
    fn test_module_id_from_str_invalid() {
        let err = "not-a-number".parse::<ModuleId>().unwrap_err();
        assert_eq!(err.kind(), "ModuleId");
        assert_eq!(err.to_string(), "failed to parse ModuleId from string");
    }

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&EvaluationId::new(5)).unwrap();
        assert_eq!(json, "5");
        let parsed: EvaluationId = serde_json::from_str("5").unwrap();
        assert_eq!(parsed, EvaluationId::new(5));
    }
}
