//! Weekly class timetable search.
//!
//! Candidate timetables are enumerated exhaustively by [`generator`],
//! instantiated by [`resolve`], and kept only when every predicate in the
//! [`registry`] accepts them. There is no objective function and no
//! backtracking: [`search::search`] is a flat generate-and-test loop whose
//! cost grows as `|subjects| ^ periods_per_day`, so real inputs need the
//! budgets in [`search::SearchLimits`].

pub mod data;
pub mod error;
pub mod generator;
pub mod registry;
pub mod resolve;
pub mod rules;
pub mod search;
pub mod server;
pub mod synthesis;
pub mod validator;

pub use data::{SchoolConfig, SearchReport, Termination, Timetable};
pub use error::{ConfigError, PredicateError, SynthesisError};
pub use registry::{ConstraintRegistry, Predicate};
pub use search::{SearchLimits, SearchOptions, search};
pub use validator::{Validator, Verdict};
