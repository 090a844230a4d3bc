//! Candidate enumeration.
//!
//! A candidate is a sequence of subject indices. Under [`Strategy::UniformWeek`]
//! the sequence is one day-pattern of `periods_per_day` entries copied onto every
//! weekday; under [`Strategy::IndependentDays`] it holds all five days back to back.
//!
//! # Complexity
//!
//! The space holds `|subjects| ^ length` candidates and is enumerated in full
//! unless a budget stops it. Eight subjects over nine periods already give
//! 8^9 = 134,217,728 uniform candidates; independent days raise that to 8^45.
//! Callers should always pass a [`crate::search::SearchLimits`] for anything
//! beyond toy inputs.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::{SchoolConfig, Weekday};

/// How day-patterns map onto the week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// One pattern repeated Monday to Friday.
    #[default]
    UniformWeek,
    /// A separate pattern per weekday.
    IndependentDays,
}

impl Strategy {
    pub fn pattern_length(self, periods_per_day: u32) -> usize {
        match self {
            Strategy::UniformWeek => periods_per_day as usize,
            Strategy::IndependentDays => periods_per_day as usize * Weekday::ALL.len(),
        }
    }
}

/// Lexicographic Cartesian product of `0..radix` taken `length` times,
/// optionally restricted to sequences starting with a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateGenerator {
    radix: usize,
    length: usize,
    prefix: Vec<usize>,
}

impl CandidateGenerator {
    pub fn new(radix: usize, length: usize) -> Self {
        Self {
            radix,
            length,
            prefix: Vec::new(),
        }
    }

    pub fn for_config(config: &SchoolConfig, strategy: Strategy) -> Self {
        Self::new(
            config.subjects.len(),
            strategy.pattern_length(config.periods_per_day),
        )
    }

    pub fn radix(&self) -> usize {
        self.radix
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn prefix(&self) -> &[usize] {
        &self.prefix
    }

    /// Number of candidates this generator yields, `None` past `u128::MAX`.
    pub fn space_size(&self) -> Option<u128> {
        let free = u32::try_from(self.length - self.prefix.len()).ok()?;
        (self.radix as u128).checked_pow(free)
    }

    /// Where `candidate` sits in the full enumeration, independent of any prefix.
    pub fn position<'a>(&self, candidate: &'a [usize]) -> Position<'a> {
        Position {
            radix: self.radix,
            digits: candidate,
        }
    }

    /// Starts a fresh pass over the candidates.
    pub fn iter(&self) -> Candidates {
        Candidates::new(self)
    }

    /// Splits the space on its first `depth` positions.
    ///
    /// The partitions are disjoint, and concatenating their output in the
    /// returned order reproduces [`CandidateGenerator::iter`] exactly.
    pub fn partitions(&self, depth: usize) -> Vec<CandidateGenerator> {
        let depth = depth.min(self.length - self.prefix.len());
        if depth == 0 {
            return vec![self.clone()];
        }
        (0..depth)
            .map(|_| 0..self.radix)
            .multi_cartesian_product()
            .map(|tail| {
                let mut prefix = self.prefix.clone();
                prefix.extend(tail);
                CandidateGenerator {
                    radix: self.radix,
                    length: self.length,
                    prefix,
                }
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a CandidateGenerator {
    type Item = Vec<usize>;
    type IntoIter = Candidates;

    fn into_iter(self) -> Candidates {
        self.iter()
    }
}

/// A candidate together with its lexicographic index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position<'a> {
    radix: usize,
    digits: &'a [usize],
}

impl Position<'_> {
    /// 0-based index in the enumeration, `None` past `u128::MAX`.
    pub fn index(&self) -> Option<u128> {
        self.digits.iter().try_fold(0u128, |acc, &digit| {
            acc.checked_mul(self.radix as u128)?
                .checked_add(digit as u128)
        })
    }

    pub fn digits(&self) -> &[usize] {
        self.digits
    }
}

impl fmt::Display for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(index) => write!(f, "#{index} {:?}", self.digits),
            None => write!(f, "{:?}", self.digits),
        }
    }
}

/// Odometer over the free positions of a [`CandidateGenerator`].
#[derive(Debug, Clone)]
pub struct Candidates {
    digits: Vec<usize>,
    fixed: usize,
    radix: usize,
    done: bool,
}

impl Candidates {
    fn new(generator: &CandidateGenerator) -> Self {
        let fixed = generator.prefix.len();
        let mut digits = generator.prefix.clone();
        digits.resize(generator.length, 0);
        Self {
            digits,
            fixed,
            radix: generator.radix,
            done: generator.radix == 0 && generator.length > fixed,
        }
    }
}

impl Iterator for Candidates {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let current = self.digits.clone();

        // advance the rightmost free digit, carrying leftwards
        let mut pos = self.digits.len();
        loop {
            if pos == self.fixed {
                self.done = true;
                break;
            }
            pos -= 1;
            self.digits[pos] += 1;
            if self.digits[pos] < self.radix {
                break;
            }
            self.digits[pos] = 0;
        }
        Some(current)
    }
}
