use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Period numbers are 1-based and bounded by `periods_per_day`.
pub type Period = u32;

/// The five teaching days of a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A subject with its weekly minimum.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub name: String,
    pub min_hours: u32,
}

/// A teacher, the subjects they may teach and their weekly maximum.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub name: String,
    pub subjects: Vec<String>,
    pub max_hours: u32,
}

/// A room already taken by another class at a given slot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBooking {
    pub room: String,
    pub day: Weekday,
    pub period: Period,
}

/// The static input of a run. Loaded once and never mutated.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolConfig {
    pub teachers: Vec<Teacher>,
    pub subjects: Vec<Subject>,
    pub rooms: Vec<String>,
    pub periods_per_day: u32,
    #[serde(default)]
    pub room_bookings: Vec<RoomBooking>,
}

impl SchoolConfig {
    /// Rejects configurations that can never yield a well-formed timetable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.periods_per_day == 0 {
            return Err(ConfigError::NoPeriods);
        }
        if self.subjects.is_empty() {
            return Err(ConfigError::NoSubjects);
        }
        if self.rooms.is_empty() {
            return Err(ConfigError::NoRooms);
        }

        check_unique("subject", self.subjects.iter().map(|s| s.name.as_str()))?;
        check_unique("teacher", self.teachers.iter().map(|t| t.name.as_str()))?;
        check_unique("room", self.rooms.iter().map(String::as_str))?;

        let subjects: HashSet<&str> = self.subjects.iter().map(|s| s.name.as_str()).collect();
        for teacher in &self.teachers {
            if teacher.subjects.is_empty() {
                return Err(ConfigError::TeacherWithoutSubjects {
                    teacher: teacher.name.clone(),
                });
            }
            if let Some(unknown) = teacher
                .subjects
                .iter()
                .find(|s| !subjects.contains(s.as_str()))
            {
                return Err(ConfigError::UnknownTeacherSubject {
                    teacher: teacher.name.clone(),
                    subject: unknown.clone(),
                });
            }
        }
        for subject in &self.subjects {
            if self.first_qualified_teacher(&subject.name).is_none() {
                return Err(ConfigError::NoQualifiedTeacher {
                    subject: subject.name.clone(),
                });
            }
        }

        for booking in &self.room_bookings {
            if !self.rooms.contains(&booking.room) {
                return Err(ConfigError::UnknownRoom {
                    room: booking.room.clone(),
                });
            }
            self.check_period(booking.period)?;
        }
        Ok(())
    }

    /// First teacher in configuration order qualified for `subject`.
    pub fn first_qualified_teacher(&self, subject: &str) -> Option<&Teacher> {
        self.teachers
            .iter()
            .find(|t| t.subjects.iter().any(|s| s == subject))
    }

    pub fn subject_index(&self, name: &str) -> Option<usize> {
        self.subjects.iter().position(|s| s.name == name)
    }

    pub fn check_period(&self, period: Period) -> ConfigResult<()> {
        if period == 0 || period > self.periods_per_day {
            return Err(ConfigError::PeriodOutOfRange {
                period,
                periods_per_day: self.periods_per_day,
            });
        }
        Ok(())
    }
}

fn check_unique<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// One (subject, teacher, room) entry of a day-pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub subject: Arc<str>,
    pub teacher: Arc<str>,
    pub room: Arc<str>,
}

/// A filled period of a timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSlot {
    pub period: Period,
    pub subject: Arc<str>,
    pub teacher: Arc<str>,
    pub room: Arc<str>,
}

/// A week of period slots, Monday to Friday.
///
/// Constructors do not validate anything; that is the job of
/// [`crate::validator::Validator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timetable {
    days: [Vec<PeriodSlot>; 5],
}

impl Timetable {
    /// Replicates one day-pattern across every weekday.
    pub fn from_pattern(pattern: &[SlotAssignment]) -> Self {
        let day: Vec<PeriodSlot> = pattern
            .iter()
            .zip(1..)
            .map(|(a, period)| PeriodSlot {
                period,
                subject: Arc::clone(&a.subject),
                teacher: Arc::clone(&a.teacher),
                room: Arc::clone(&a.room),
            })
            .collect();
        Self {
            days: std::array::from_fn(|_| day.clone()),
        }
    }

    /// Builds a timetable whose weekdays are independent of each other.
    pub fn from_days(days: [Vec<PeriodSlot>; 5]) -> Self {
        Self { days }
    }

    /// Shape-only placeholder, see [`TimetableSkeleton`].
    pub fn empty_skeleton(periods_per_day: u32) -> TimetableSkeleton {
        TimetableSkeleton::empty(periods_per_day)
    }

    pub fn day(&self, day: Weekday) -> &[PeriodSlot] {
        &self.days[day.index()]
    }

    pub fn days(&self) -> impl Iterator<Item = (Weekday, &[PeriodSlot])> {
        Weekday::ALL
            .into_iter()
            .map(move |d| (d, self.days[d.index()].as_slice()))
    }

    /// Every slot of the week, Monday first.
    pub fn slots(&self) -> impl Iterator<Item = &PeriodSlot> {
        self.days.iter().flatten()
    }
}

impl Serialize for Timetable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for (day, slots) in self.days() {
            map.serialize_entry(day.name(), slots)?;
        }
        map.end()
    }
}

/// A period record with nothing assigned yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkeletonSlot {
    pub period: Period,
    pub subject: Option<String>,
    pub teacher: Option<String>,
    pub room: Option<String>,
}

/// The shape of a timetable with every field unset.
///
/// Only used to describe the timetable layout to predicate authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TimetableSkeleton {
    days: BTreeMap<Weekday, Vec<SkeletonSlot>>,
}

impl TimetableSkeleton {
    pub fn empty(periods_per_day: u32) -> Self {
        let days = Weekday::ALL
            .into_iter()
            .map(|day| {
                let slots = (1..=periods_per_day)
                    .map(|period| SkeletonSlot {
                        period,
                        subject: None,
                        teacher: None,
                        room: None,
                    })
                    .collect();
                (day, slots)
            })
            .collect();
        Self { days }
    }

    pub fn day(&self, day: Weekday) -> &[SkeletonSlot] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for TimetableSkeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for (day, slots) in &self.days {
            writeln!(f, "    \"{day}\": [")?;
            for slot in slots {
                writeln!(
                    f,
                    "        {{\"period\": {}, \"subject\": null, \"teacher\": null, \"room\": null}},",
                    slot.period
                )?;
            }
            writeln!(f, "    ],")?;
        }
        write!(f, "}}")
    }
}

/// Why a search stopped before exhausting its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CancelReason {
    CandidateBudget,
    Timeout,
    External,
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Termination {
    /// Every candidate was examined.
    Exhausted,
    /// A budget or the caller stopped the search early.
    Cancelled { reason: CancelReason },
    /// The requested number of valid timetables was reached.
    ResultLimit,
}

impl Termination {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Termination::Cancelled { .. })
    }
}

/// Outcome counters for one registered predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateStats {
    pub name: String,
    pub rejected: u64,
    pub faulted: u64,
    /// Subject indices of the earliest candidate this predicate faulted on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_fault: Option<Vec<usize>>,
}

impl fmt::Display for PredicateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] rejected {}, faulted {}",
            self.name, self.rejected, self.faulted
        )
    }
}

/// The final output of a search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    pub timetables: Vec<Timetable>,
    pub examined: u64,
    pub termination: Termination,
    pub elapsed: Duration,
    pub predicates: Vec<PredicateStats>,
}

/// Counts slots per key over the whole week.
pub(crate) fn weekly_counts<'a>(
    timetable: &'a Timetable,
    key: impl Fn(&'a PeriodSlot) -> &'a str,
) -> HashMap<&'a str, u32> {
    let mut counts = HashMap::new();
    for slot in timetable.slots() {
        *counts.entry(key(slot)).or_insert(0) += 1;
    }
    counts
}
