//! Turns candidates (subject indices) into timetables.
//!
//! Teachers and rooms are derived, never searched over: every subject gets the
//! first qualified teacher in configuration order, and every (weekday, period)
//! slot gets the first room not already booked by another class.

use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use crate::data::{PeriodSlot, SchoolConfig, SlotAssignment, Timetable, Weekday};
use crate::error::{ConfigError, ConfigResult};
use crate::generator::Strategy;

/// Room per (weekday, period), each room holding one class per slot.
#[derive(Debug, Clone)]
pub struct RoomAllocation {
    rooms: [Vec<Arc<str>>; 5],
    uniform: bool,
}

impl RoomAllocation {
    pub fn new(config: &SchoolConfig) -> ConfigResult<Self> {
        let booked: HashSet<(&str, Weekday, u32)> = config
            .room_bookings
            .iter()
            .map(|b| (b.room.as_str(), b.day, b.period))
            .collect();

        let mut rooms: [Vec<Arc<str>>; 5] = Default::default();
        for day in Weekday::ALL {
            for period in 1..=config.periods_per_day {
                let free = config
                    .rooms
                    .iter()
                    .find(|room| !booked.contains(&(room.as_str(), day, period)))
                    .ok_or(ConfigError::NoRoomAvailable { day, period })?;
                rooms[day.index()].push(Arc::from(free.as_str()));
            }
        }
        let uniform = rooms.iter().all(|day| day == &rooms[0]);
        Ok(Self { rooms, uniform })
    }

    /// 0-based `position` within the day.
    pub fn room(&self, day: Weekday, position: usize) -> &Arc<str> {
        &self.rooms[day.index()][position]
    }

    /// True when every weekday uses the same room sequence.
    pub fn is_uniform(&self) -> bool {
        self.uniform
    }
}

/// Setup-time lookup tables shared read-only by all search workers.
#[derive(Debug, Clone)]
pub struct Resolver {
    subjects: Vec<Arc<str>>,
    teachers: Vec<Arc<str>>,
    rooms: RoomAllocation,
    periods_per_day: usize,
}

impl Resolver {
    pub fn new(config: &SchoolConfig) -> ConfigResult<Self> {
        let mut subjects = Vec::with_capacity(config.subjects.len());
        let mut teachers = Vec::with_capacity(config.subjects.len());
        for subject in &config.subjects {
            let teacher = config
                .first_qualified_teacher(&subject.name)
                .ok_or_else(|| ConfigError::NoQualifiedTeacher {
                    subject: subject.name.clone(),
                })?;
            debug!("{} is taught by {}", subject.name, teacher.name);
            subjects.push(Arc::from(subject.name.as_str()));
            teachers.push(Arc::from(teacher.name.as_str()));
        }
        Ok(Self {
            subjects,
            teachers,
            rooms: RoomAllocation::new(config)?,
            periods_per_day: config.periods_per_day as usize,
        })
    }

    pub fn subject(&self, index: usize) -> &Arc<str> {
        &self.subjects[index]
    }

    pub fn teacher(&self, subject: usize) -> &Arc<str> {
        &self.teachers[subject]
    }

    pub fn rooms(&self) -> &RoomAllocation {
        &self.rooms
    }

    /// Builds the timetable for one candidate produced under `strategy`.
    pub fn instantiate(&self, candidate: &[usize], strategy: Strategy) -> Timetable {
        match strategy {
            Strategy::UniformWeek if self.rooms.is_uniform() => {
                let pattern: Vec<SlotAssignment> = candidate
                    .iter()
                    .enumerate()
                    .map(|(position, &subject)| SlotAssignment {
                        subject: Arc::clone(self.subject(subject)),
                        teacher: Arc::clone(self.teacher(subject)),
                        room: Arc::clone(self.rooms.room(Weekday::Monday, position)),
                    })
                    .collect();
                Timetable::from_pattern(&pattern)
            }
            Strategy::UniformWeek => {
                Timetable::from_days(std::array::from_fn(|d| self.day(Weekday::ALL[d], candidate)))
            }
            Strategy::IndependentDays => {
                let mut chunks = candidate.chunks(self.periods_per_day);
                Timetable::from_days(std::array::from_fn(|d| {
                    self.day(Weekday::ALL[d], chunks.next().unwrap_or_default())
                }))
            }
        }
    }

    fn day(&self, day: Weekday, subjects: &[usize]) -> Vec<PeriodSlot> {
        subjects
            .iter()
            .zip(1..)
            .enumerate()
            .map(|(position, (&subject, period))| PeriodSlot {
                period,
                subject: Arc::clone(self.subject(subject)),
                teacher: Arc::clone(self.teacher(subject)),
                room: Arc::clone(self.rooms.room(day, position)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RoomBooking;

    fn config() -> SchoolConfig {
        serde_json::from_value(serde_json::json!({
            "teachers": [
                {"name": "Cindy", "subjects": ["Biology", "Chemistry"], "maxHours": 10},
                {"name": "Carl", "subjects": ["Chemistry"], "maxHours": 10}
            ],
            "subjects": [
                {"name": "Biology", "minHours": 0},
                {"name": "Chemistry", "minHours": 0}
            ],
            "rooms": ["101", "102"],
            "periodsPerDay": 2
        }))
        .unwrap()
    }

    #[test]
    fn first_qualified_teacher_and_first_room() {
        let resolver = Resolver::new(&config()).unwrap();
        let tt = resolver.instantiate(&[1, 0], Strategy::UniformWeek);
        for (_, slots) in tt.days() {
            assert_eq!(&*slots[0].subject, "Chemistry");
            assert_eq!(&*slots[0].teacher, "Cindy");
            assert_eq!(&*slots[1].room, "101");
        }
    }

    #[test]
    fn booked_rooms_are_skipped_per_slot() {
        let mut c = config();
        c.room_bookings.push(RoomBooking {
            room: "101".into(),
            day: Weekday::Wednesday,
            period: 2,
        });
        let resolver = Resolver::new(&c).unwrap();
        assert!(!resolver.rooms().is_uniform());
        let tt = resolver.instantiate(&[0, 0], Strategy::UniformWeek);
        assert_eq!(&*tt.day(Weekday::Wednesday)[1].room, "102");
        assert_eq!(&*tt.day(Weekday::Wednesday)[0].room, "101");
        assert_eq!(&*tt.day(Weekday::Thursday)[1].room, "101");
    }

    #[test]
    fn fully_booked_slot_is_a_config_error() {
        let mut c = config();
        for room in ["101", "102"] {
            c.room_bookings.push(RoomBooking {
                room: room.into(),
                day: Weekday::Friday,
                period: 1,
            });
        }
        assert_eq!(
            Resolver::new(&c).unwrap_err().to_string(),
            "every room is booked on Friday period 1"
        );
    }

    #[test]
    fn independent_days_split_the_candidate() {
        let resolver = Resolver::new(&config()).unwrap();
        let candidate = [0, 0, 0, 1, 1, 0, 1, 1, 0, 0];
        let tt = resolver.instantiate(&candidate, Strategy::IndependentDays);
        assert_eq!(&*tt.day(Weekday::Tuesday)[1].subject, "Chemistry");
        assert_eq!(&*tt.day(Weekday::Wednesday)[0].subject, "Chemistry");
        assert_eq!(&*tt.day(Weekday::Friday)[1].subject, "Biology");
    }
}
