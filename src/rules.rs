//! Declarative rules for externally supplied constraints.
//!
//! Constraint authors describe a rule as data; [`Rule::compile`] checks it
//! against the configuration and turns it into a [`Predicate`]. Nothing
//! outside this closed set of rule kinds is ever executed.

use serde::{Deserialize, Serialize};

use crate::data::{Period, PeriodSlot, SchoolConfig, Timetable, Weekday};
use crate::error::{ConfigError, ConfigResult, PredicateError};
use crate::registry::Predicate;

/// The weekdays a rule applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DaySelector {
    #[default]
    All,
    Only(Vec<Weekday>),
    Except(Vec<Weekday>),
}

impl DaySelector {
    pub fn selects(&self, day: Weekday) -> bool {
        match self {
            DaySelector::All => true,
            DaySelector::Only(days) => days.contains(&day),
            DaySelector::Except(days) => !days.contains(&day),
        }
    }
}

/// A period addressed from the start or the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PeriodRef {
    /// 1-based period number.
    Index(Period),
    /// 0 is the last period, 1 the one before it.
    FromEnd(u32),
}

impl PeriodRef {
    /// 0-based slot position in a day of `len` periods.
    fn position(self, len: usize) -> Option<usize> {
        match self {
            PeriodRef::Index(p) => (p as usize).checked_sub(1).filter(|&i| i < len),
            PeriodRef::FromEnd(n) => len.checked_sub(n as usize + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Rule {
    /// Every occurrence of `subject` falls within periods `from..=to`.
    SubjectWithinPeriods {
        subject: String,
        from: Period,
        to: Period,
        #[serde(default)]
        days: DaySelector,
    },
    /// `subject` occupies `period`.
    SubjectAtPeriod {
        subject: String,
        period: PeriodRef,
        #[serde(default)]
        days: DaySelector,
    },
    /// `first` is immediately followed by `second` at least once.
    SubjectBefore {
        first: String,
        second: String,
        #[serde(default)]
        days: DaySelector,
    },
    /// `first` is never immediately followed by `second`.
    NotSubjectBefore {
        first: String,
        second: String,
        #[serde(default)]
        days: DaySelector,
    },
    /// `subject` appears at most `max` times a day.
    MaxPerDay {
        subject: String,
        max: u32,
        #[serde(default)]
        days: DaySelector,
    },
    /// Every nested rule holds.
    AllOf { rules: Vec<Rule> },
}

impl Rule {
    /// Checks subject names and periods, then wraps the rule as `constraint<index>`.
    pub fn compile(self, index: usize, config: &SchoolConfig) -> ConfigResult<RulePredicate> {
        self.check_against(index, config)?;
        Ok(RulePredicate {
            name: format!("constraint{index}"),
            rule: self,
        })
    }

    fn check_against(&self, index: usize, config: &SchoolConfig) -> ConfigResult<()> {
        let known = |subject: &String| {
            config
                .subject_index(subject)
                .map(|_| ())
                .ok_or_else(|| ConfigError::UnknownRuleSubject {
                    index,
                    subject: subject.clone(),
                })
        };
        let malformed = |message: String| ConfigError::MalformedRule { index, message };

        match self {
            Rule::SubjectWithinPeriods {
                subject, from, to, ..
            } => {
                known(subject)?;
                for period in [*from, *to] {
                    config
                        .check_period(period)
                        .map_err(|e| malformed(e.to_string()))?;
                }
                if from > to {
                    return Err(malformed(format!("empty period range {from}..={to}")));
                }
            }
            Rule::SubjectAtPeriod {
                subject, period, ..
            } => {
                known(subject)?;
                if period.position(config.periods_per_day as usize).is_none() {
                    return Err(malformed(format!(
                        "{period:?} is outside a day of {} periods",
                        config.periods_per_day
                    )));
                }
            }
            Rule::SubjectBefore { first, second, .. }
            | Rule::NotSubjectBefore { first, second, .. } => {
                known(first)?;
                known(second)?;
            }
            Rule::MaxPerDay { subject, .. } => known(subject)?,
            Rule::AllOf { rules } => {
                for rule in rules {
                    rule.check_against(index, config)?;
                }
            }
        }
        Ok(())
    }

    fn holds(&self, name: &str, timetable: &Timetable) -> Result<bool, PredicateError> {
        match self {
            Rule::SubjectWithinPeriods {
                subject,
                from,
                to,
                days,
            } => Ok(selected_days(timetable, days).flatten().all(|slot| {
                !teaches(slot, subject) || (*from..=*to).contains(&slot.period)
            })),
            Rule::SubjectAtPeriod {
                subject,
                period,
                days,
            } => {
                for slots in selected_days(timetable, days) {
                    let pos = period.position(slots.len()).ok_or_else(|| {
                        PredicateError::failed(
                            name,
                            format!("{period:?} missing from a day of {} periods", slots.len()),
                        )
                    })?;
                    if !teaches(&slots[pos], subject) {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Rule::SubjectBefore {
                first,
                second,
                days,
            } => Ok(selected_days(timetable, days).all(|slots| adjacent(slots, first, second))),
            Rule::NotSubjectBefore {
                first,
                second,
                days,
            } => Ok(selected_days(timetable, days).all(|slots| !adjacent(slots, first, second))),
            Rule::MaxPerDay { subject, max, days } => {
                Ok(selected_days(timetable, days).all(|slots| {
                    slots.iter().filter(|s| teaches(s, subject)).count() <= *max as usize
                }))
            }
            Rule::AllOf { rules } => {
                for rule in rules {
                    if !rule.holds(name, timetable)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

fn selected_days<'t>(
    timetable: &'t Timetable,
    days: &'t DaySelector,
) -> impl Iterator<Item = &'t [PeriodSlot]> {
    timetable
        .days()
        .filter(move |(day, _)| days.selects(*day))
        .map(|(_, slots)| slots)
}

fn teaches(slot: &PeriodSlot, subject: &str) -> bool {
    &*slot.subject == subject
}

fn adjacent(slots: &[PeriodSlot], first: &str, second: &str) -> bool {
    slots
        .windows(2)
        .any(|pair| &*pair[0].subject == first && &*pair[1].subject == second)
}

/// A compiled [`Rule`] bound to its deterministic name.
#[derive(Debug, Clone)]
pub struct RulePredicate {
    name: String,
    rule: Rule,
}

impl RulePredicate {
    pub fn rule(&self) -> &Rule {
        &self.rule
    }
}

impl Predicate for RulePredicate {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, timetable: &Timetable) -> Result<bool, PredicateError> {
        self.rule.holds(&self.name, timetable)
    }
}
