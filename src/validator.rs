//! Runs registered predicates against a timetable, stopping at the first failure.

use log::{trace, warn};
use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use crate::data::Timetable;
use crate::error::PredicateError;
use crate::registry::ConstraintRegistry;

/// Outcome of checking one timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Predicate at this position returned false.
    Rejected { predicate: usize },
    /// Predicate at this position errored or panicked.
    Faulted {
        predicate: usize,
        error: PredicateError,
    },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

#[derive(Clone, Copy)]
pub struct Validator<'r> {
    registry: &'r ConstraintRegistry,
}

impl<'r> Validator<'r> {
    pub fn new(registry: &'r ConstraintRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r ConstraintRegistry {
        self.registry
    }

    /// True only when every predicate holds.
    pub fn validate(&self, timetable: &Timetable) -> bool {
        self.check(timetable).is_accepted()
    }

    /// Evaluates predicates in registry order. Later predicates are not
    /// invoked once one rejects or faults.
    pub fn check(&self, timetable: &Timetable) -> Verdict {
        for (position, predicate) in self.registry.predicates().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| predicate.check(timetable)))
                .unwrap_or_else(|payload| {
                    Err(PredicateError::panicked(predicate.name(), panic_message(&*payload)))
                });
            match outcome {
                Ok(true) => {}
                Ok(false) => return Verdict::Rejected { predicate: position },
                Err(error) => {
                    return Verdict::Faulted {
                        predicate: position,
                        error,
                    };
                }
            }
        }
        Verdict::Accepted
    }

    /// [`Validator::check`] with diagnostics naming the candidate.
    pub fn check_candidate(&self, timetable: &Timetable, candidate: impl Display) -> Verdict {
        let verdict = self.check(timetable);
        match &verdict {
            Verdict::Accepted => trace!("Candidate {candidate} accepted"),
            Verdict::Rejected { predicate } => trace!(
                "Candidate {candidate} rejected by '{}'",
                self.name_at(*predicate)
            ),
            Verdict::Faulted { predicate, error } => warn!(
                "Candidate {candidate} treated as invalid: predicate '{}' faulted: {error}",
                self.name_at(*predicate)
            ),
        }
        verdict
    }

    fn name_at(&self, position: usize) -> &str {
        self.registry
            .predicates()
            .nth(position)
            .map(|p| p.name())
            .unwrap_or("?")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SlotAssignment;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn timetable() -> Timetable {
        Timetable::from_pattern(&[SlotAssignment {
            subject: "Math".into(),
            teacher: "Alice".into(),
            room: "101".into(),
        }])
    }

    fn counted(registry: &mut ConstraintRegistry, name: &str, result: bool) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry.register_fn(name, move |_: &Timetable| {
            counter.fetch_add(1, Ordering::SeqCst);
            result
        });
        calls
    }

    #[test]
    fn empty_registry_accepts() {
        let registry = ConstraintRegistry::new();
        assert!(Validator::new(&registry).validate(&timetable()));
    }

    #[test]
    fn stops_at_first_failing_predicate() {
        let mut registry = ConstraintRegistry::new();
        let first = counted(&mut registry, "first", true);
        let second = counted(&mut registry, "second", false);
        let third = counted(&mut registry, "third", true);

        let validator = Validator::new(&registry);
        assert_eq!(validator.check(&timetable()), Verdict::Rejected { predicate: 1 });
        assert!(!validator.validate(&timetable()));
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert_eq!(third.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_predicate_faults_without_unwinding() {
        let mut registry = ConstraintRegistry::new();
        registry.register_fn("explodes", |_: &Timetable| panic!("boom"));
        let after = counted(&mut registry, "after", true);

        let verdict = Validator::new(&registry).check_candidate(&timetable(), 7);
        assert_eq!(
            verdict,
            Verdict::Faulted {
                predicate: 0,
                error: PredicateError::panicked("explodes", "boom"),
            }
        );
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }
}
