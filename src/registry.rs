//! Predicates and the ordered registry the validator runs them from.

use itertools::Itertools;
use log::debug;

use crate::data::{SchoolConfig, Timetable, weekly_counts};
use crate::error::{ConfigError, ConfigResult, PredicateError};

/// A pure rule over a timetable.
///
/// Implementations must not keep mutable state between calls: the same
/// predicate instance is shared by every search worker.
pub trait Predicate: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(true)` when the timetable satisfies the rule.
    fn check(&self, timetable: &Timetable) -> Result<bool, PredicateError>;
}

/// Adapts a plain closure into a [`Predicate`].
pub struct FnPredicate<F> {
    name: String,
    f: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&Timetable) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Timetable) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, timetable: &Timetable) -> Result<bool, PredicateError> {
        Ok((self.f)(timetable))
    }
}

/// Every subject meets its weekly minimum.
pub struct MinHoursPerSubject {
    minimums: Vec<(String, u32)>,
}

impl MinHoursPerSubject {
    pub fn new(config: &SchoolConfig) -> Self {
        Self {
            minimums: config
                .subjects
                .iter()
                .map(|s| (s.name.clone(), s.min_hours))
                .collect(),
        }
    }
}

impl Predicate for MinHoursPerSubject {
    fn name(&self) -> &str {
        "min_hours_per_subject"
    }

    fn check(&self, timetable: &Timetable) -> Result<bool, PredicateError> {
        let counts = weekly_counts(timetable, |slot| &*slot.subject);
        Ok(self
            .minimums
            .iter()
            .all(|(subject, min)| counts.get(subject.as_str()).copied().unwrap_or(0) >= *min))
    }
}

/// No teacher exceeds their weekly maximum.
pub struct MaxHoursPerTeacher {
    maximums: Vec<(String, u32)>,
}

impl MaxHoursPerTeacher {
    pub fn new(config: &SchoolConfig) -> Self {
        Self {
            maximums: config
                .teachers
                .iter()
                .map(|t| (t.name.clone(), t.max_hours))
                .collect(),
        }
    }
}

impl Predicate for MaxHoursPerTeacher {
    fn name(&self) -> &str {
        "max_hours_per_teacher"
    }

    fn check(&self, timetable: &Timetable) -> Result<bool, PredicateError> {
        let counts = weekly_counts(timetable, |slot| &*slot.teacher);
        Ok(self
            .maximums
            .iter()
            .all(|(teacher, max)| counts.get(teacher.as_str()).copied().unwrap_or(0) <= *max))
    }
}

/// Each day teaches at least a third as many distinct subjects as it has periods.
pub struct DiverseSubjectsPerDay;

impl Predicate for DiverseSubjectsPerDay {
    fn name(&self) -> &str {
        "diverse_subjects_per_day"
    }

    fn check(&self, timetable: &Timetable) -> Result<bool, PredicateError> {
        Ok(timetable.days().all(|(_, slots)| {
            let distinct = slots.iter().map(|slot| &*slot.subject).unique().count();
            distinct >= slots.len() / 3
        }))
    }
}

/// Built-in predicates followed by externally supplied ones, in registration order.
#[derive(Default)]
pub struct ConstraintRegistry {
    builtins: Vec<Box<dyn Predicate>>,
    external: Vec<Box<dyn Predicate>>,
}

impl ConstraintRegistry {
    /// A registry with no predicates at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the three structural rules in their fixed order.
    pub fn with_builtins(config: &SchoolConfig) -> Self {
        Self {
            builtins: vec![
                Box::new(MinHoursPerSubject::new(config)),
                Box::new(MaxHoursPerTeacher::new(config)),
                Box::new(DiverseSubjectsPerDay),
            ],
            external: Vec::new(),
        }
    }

    pub fn register(&mut self, predicate: Box<dyn Predicate>) {
        debug!("Registering predicate '{}'", predicate.name());
        self.external.push(predicate);
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Timetable) -> bool + Send + Sync + 'static,
    {
        self.register(Box::new(FnPredicate::new(name, f)));
    }

    /// Binds one predicate per constraint description, by position.
    pub fn bind_external(
        &mut self,
        descriptions: &[String],
        predicates: Vec<Box<dyn Predicate>>,
    ) -> ConfigResult<()> {
        if descriptions.len() != predicates.len() {
            return Err(ConfigError::PredicateCountMismatch {
                expected: descriptions.len(),
                actual: predicates.len(),
            });
        }
        for (description, predicate) in descriptions.iter().zip(predicates) {
            debug!("Binding '{}' to \"{}\"", predicate.name(), description);
            self.register(predicate);
        }
        Ok(())
    }

    /// All predicates in evaluation order.
    pub fn predicates(&self) -> impl Iterator<Item = &dyn Predicate> {
        self.builtins
            .iter()
            .chain(self.external.iter())
            .map(|p| p.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.predicates().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.builtins.len() + self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
