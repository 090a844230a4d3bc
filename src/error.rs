//! Error types for configuration, predicate evaluation and predicate synthesis.

use thiserror::Error;

use crate::data::Weekday;

/// Result type for setup operations that may reject the configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fatal problems detected before any search begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("periods per day must be at least 1")]
    NoPeriods,

    #[error("no subjects configured")]
    NoSubjects,

    #[error("no rooms configured")]
    NoRooms,

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("teacher '{teacher}' is not qualified for any subject")]
    TeacherWithoutSubjects { teacher: String },

    #[error("teacher '{teacher}' is qualified for unknown subject '{subject}'")]
    UnknownTeacherSubject { teacher: String, subject: String },

    #[error("subject '{subject}' has no qualified teacher")]
    NoQualifiedTeacher { subject: String },

    #[error("room booking names unknown room '{room}'")]
    UnknownRoom { room: String },

    #[error("period {period} is outside 1..={periods_per_day}")]
    PeriodOutOfRange { period: u32, periods_per_day: u32 },

    #[error("every room is booked on {day} period {period}")]
    NoRoomAvailable { day: Weekday, period: u32 },

    #[error("constraint {index}: unknown subject '{subject}'")]
    UnknownRuleSubject { index: usize, subject: String },

    #[error("constraint {index}: {message}")]
    MalformedRule { index: usize, message: String },

    #[error("expected {expected} predicates for {expected} constraints, got {actual}")]
    PredicateCountMismatch { expected: usize, actual: usize },

    #[error("constraint {index} could not be synthesized: {source}")]
    Synthesis {
        index: usize,
        #[source]
        source: SynthesisError,
    },

    #[error("independent-day search needs a candidate budget, timeout or result limit")]
    UnboundedSearch,
}

/// A predicate could not produce a verdict for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("predicate '{name}' failed: {message}")]
    Failed { name: String, message: String },

    #[error("predicate '{name}' panicked: {message}")]
    Panicked { name: String, message: String },
}

impl PredicateError {
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn panicked(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// The external synthesis collaborator could not produce a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("no rule returned")]
    Missing,

    #[error("malformed rule: {0}")]
    Malformed(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}
