//! Boundary to the service that turns free-text constraints into rules.
//!
//! The service itself lives outside this crate. It receives a
//! [`SynthesisRequest`] per constraint and answers with a [`Rule`]; the
//! rule is compiled here, so a malformed answer fails setup instead of
//! silently passing every candidate.

use log::{debug, info};
use serde::Serialize;

use crate::data::{SchoolConfig, Timetable, TimetableSkeleton};
use crate::error::{ConfigError, ConfigResult, SynthesisError};
use crate::registry::Predicate;
use crate::rules::Rule;

/// Everything the synthesis service is told about one constraint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    /// 1-based position of the constraint.
    pub index: usize,
    pub function_name: String,
    pub constraint: String,
    pub teachers: Vec<String>,
    pub periods_per_day: u32,
    pub subjects: Vec<String>,
    pub rooms: Vec<String>,
    pub skeleton: TimetableSkeleton,
}

impl SynthesisRequest {
    pub fn new(
        config: &SchoolConfig,
        skeleton: &TimetableSkeleton,
        index: usize,
        constraint: impl Into<String>,
    ) -> Self {
        Self {
            index,
            function_name: format!("constraint{index}"),
            constraint: constraint.into(),
            teachers: config
                .teachers
                .iter()
                .map(|t| {
                    format!(
                        "{}: {}, max {} hours per week",
                        t.name,
                        t.subjects.join(", "),
                        t.max_hours
                    )
                })
                .collect(),
            periods_per_day: config.periods_per_day,
            subjects: config.subjects.iter().map(|s| s.name.clone()).collect(),
            rooms: config.rooms.clone(),
            skeleton: skeleton.clone(),
        }
    }

    /// Plain-text rendering of the request for text-based services.
    pub fn context(&self) -> String {
        format!(
            "Teachers, their subjects and weekly maximum hours:\n{}\n\n\
             The number of periods per day is {}.\n\
             The subjects taught are {}.\n\
             The rooms available are {}.\n\n\
             The timetable has this shape:\n{}\n\n\
             Constraint {} ({}): \"{}\"",
            self.teachers.join("\n"),
            self.periods_per_day,
            self.subjects.join(", "),
            self.rooms.join(", "),
            self.skeleton,
            self.index,
            self.function_name,
            self.constraint
        )
    }
}

/// The external service producing one rule per constraint text.
pub trait PredicateSynthesizer {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<Rule, SynthesisError>;
}

/// Rules already produced ahead of time, handed out by constraint position.
#[derive(Debug, Clone, Default)]
pub struct Presynthesized {
    rules: Vec<Rule>,
}

impl Presynthesized {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

impl PredicateSynthesizer for Presynthesized {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<Rule, SynthesisError> {
        request
            .index
            .checked_sub(1)
            .and_then(|i| self.rules.get(i))
            .cloned()
            .ok_or(SynthesisError::Missing)
    }
}

/// Synthesizes and compiles one predicate per constraint, in input order.
pub fn bind_constraints(
    config: &SchoolConfig,
    constraints: &[String],
    synthesizer: &dyn PredicateSynthesizer,
) -> ConfigResult<Vec<Box<dyn Predicate>>> {
    info!("Binding {} external constraints", constraints.len());
    let skeleton = Timetable::empty_skeleton(config.periods_per_day);

    constraints
        .iter()
        .enumerate()
        .map(|(i, text)| -> ConfigResult<Box<dyn Predicate>> {
            let index = i + 1;
            let request = SynthesisRequest::new(config, &skeleton, index, text.as_str());
            let rule = synthesizer
                .synthesize(&request)
                .map_err(|source| ConfigError::Synthesis { index, source })?;
            debug!("{} <- \"{}\": {:?}", request.function_name, text, rule);
            let predicate = rule.compile(index, config)?;
            Ok(Box::new(predicate))
        })
        .collect()
}
