//! Generate-and-test search over the candidate space.

use log::{info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::data::{
    CancelReason, PredicateStats, SchoolConfig, SearchReport, Termination, Timetable,
};
use crate::error::{ConfigError, ConfigResult};
use crate::generator::{CandidateGenerator, Strategy};
use crate::registry::ConstraintRegistry;
use crate::resolve::Resolver;
use crate::validator::{Validator, Verdict};

/// Caller-imposed bounds on an otherwise exponential search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchLimits {
    /// Candidates examined before cancelling.
    pub max_candidates: Option<u64>,
    /// Wall-clock time before cancelling.
    pub timeout: Option<Duration>,
    /// Stop once this many valid timetables are found.
    pub max_results: Option<usize>,
}

impl SearchLimits {
    pub fn is_unbounded(&self) -> bool {
        self.max_candidates.is_none() && self.timeout.is_none() && self.max_results.is_none()
    }
}

/// Search configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use timetable_search::search::SearchOptions;
///
/// let options = SearchOptions::default()
///     .with_max_candidates(1_000_000)
///     .with_timeout(Duration::from_secs(30))
///     .with_parallel(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub strategy: Strategy,
    pub limits: SearchLimits,
    /// Set to `true` from another thread to stop the search.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Spread prefix partitions over the rayon pool.
    pub parallel: bool,
}

impl SearchOptions {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_candidates(mut self, n: u64) -> Self {
        self.limits.max_candidates = Some(n);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.limits.timeout = Some(timeout);
        self
    }

    pub fn with_max_results(mut self, n: usize) -> Self {
        self.limits.max_results = Some(n);
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// State shared by every worker of one search.
struct Shared<'a> {
    options: &'a SearchOptions,
    resolver: &'a Resolver,
    validator: Validator<'a>,
    started: Instant,
    examined: AtomicU64,
    found: AtomicUsize,
    halted: OnceLock<Termination>,
}

impl Shared<'_> {
    fn halt(&self, termination: Termination) {
        let _ = self.halted.set(termination);
    }

    /// Counts one more candidate against the budget, or halts when a limit is hit.
    fn claim(&self) -> bool {
        if self.halted.get().is_some() {
            return false;
        }
        if self
            .options
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            self.halt(Termination::Cancelled {
                reason: CancelReason::External,
            });
            return false;
        }
        if self
            .options
            .limits
            .timeout
            .is_some_and(|timeout| self.started.elapsed() >= timeout)
        {
            self.halt(Termination::Cancelled {
                reason: CancelReason::Timeout,
            });
            return false;
        }
        let max = self.options.limits.max_candidates.unwrap_or(u64::MAX);
        let claimed = self
            .examined
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok();
        if !claimed {
            self.halt(Termination::Cancelled {
                reason: CancelReason::CandidateBudget,
            });
        }
        claimed
    }
}

/// Valid timetables and per-predicate counters from one partition.
struct PartitionOutcome {
    timetables: Vec<Timetable>,
    rejected: Vec<u64>,
    faulted: Vec<u64>,
    first_fault: Vec<Option<Vec<usize>>>,
}

fn run_partition(generator: &CandidateGenerator, shared: &Shared<'_>) -> PartitionOutcome {
    let predicates = shared.validator.registry().len();
    let mut outcome = PartitionOutcome {
        timetables: Vec::new(),
        rejected: vec![0; predicates],
        faulted: vec![0; predicates],
        first_fault: vec![None; predicates],
    };

    for candidate in generator.iter() {
        if !shared.claim() {
            break;
        }
        let timetable = shared.resolver.instantiate(&candidate, shared.options.strategy);
        let position = generator.position(&candidate);
        match shared.validator.check_candidate(&timetable, position) {
            Verdict::Accepted => {
                outcome.timetables.push(timetable);
                let found = shared.found.fetch_add(1, Ordering::Relaxed) + 1;
                if shared.options.limits.max_results.is_some_and(|max| found >= max) {
                    shared.halt(Termination::ResultLimit);
                }
            }
            Verdict::Rejected { predicate } => outcome.rejected[predicate] += 1,
            Verdict::Faulted { predicate, .. } => {
                outcome.faulted[predicate] += 1;
                outcome.first_fault[predicate].get_or_insert(candidate);
            }
        }
    }
    outcome
}

/// Smallest prefix depth giving every rayon worker several partitions.
fn partition_depth(generator: &CandidateGenerator) -> usize {
    let wanted = rayon::current_num_threads() * 4;
    let mut depth = 0;
    let mut count = 1usize;
    while count < wanted && depth < generator.length() && generator.radix() > 1 {
        count = count.saturating_mul(generator.radix());
        depth += 1;
    }
    depth
}

/// Enumerates candidates, keeping every timetable that passes all predicates.
///
/// The configuration is validated first; any [`ConfigError`] aborts before a
/// single candidate is generated. Timetables come back in the lexicographic
/// order of the candidate enumeration, also when `options.parallel` is set.
/// Under limits a parallel run may examine a different subset of candidates
/// than a sequential one.
pub fn search(
    config: &SchoolConfig,
    registry: &ConstraintRegistry,
    options: &SearchOptions,
) -> ConfigResult<SearchReport> {
    config.validate()?;
    if options.strategy == Strategy::IndependentDays
        && options.limits.is_unbounded()
        && options.cancel.is_none()
    {
        return Err(ConfigError::UnboundedSearch);
    }

    let resolver = Resolver::new(config)?;
    let generator = CandidateGenerator::for_config(config, options.strategy);
    info!(
        "Searching {} candidates ({:?}, {} predicates, parallel: {})",
        generator
            .space_size()
            .map_or_else(|| "more than 2^128".to_string(), |n| n.to_string()),
        options.strategy,
        registry.len(),
        options.parallel
    );

    let shared = Shared {
        options,
        resolver: &resolver,
        validator: Validator::new(registry),
        started: Instant::now(),
        examined: AtomicU64::new(0),
        found: AtomicUsize::new(0),
        halted: OnceLock::new(),
    };
    if options.limits.max_results == Some(0) {
        shared.halt(Termination::ResultLimit);
    }

    let outcomes: Vec<PartitionOutcome> = if options.parallel {
        generator
            .partitions(partition_depth(&generator))
            .par_iter()
            .map(|partition| run_partition(partition, &shared))
            .collect()
    } else {
        vec![run_partition(&generator, &shared)]
    };

    let mut predicates: Vec<PredicateStats> = registry
        .names()
        .into_iter()
        .map(|name| PredicateStats {
            name,
            ..Default::default()
        })
        .collect();
    let mut timetables = Vec::new();
    for outcome in outcomes {
        timetables.extend(outcome.timetables);
        for (stats, ((rejected, faulted), first_fault)) in predicates.iter_mut().zip(
            outcome
                .rejected
                .into_iter()
                .zip(outcome.faulted)
                .zip(outcome.first_fault),
        ) {
            stats.rejected += rejected;
            stats.faulted += faulted;
            if stats.first_fault.is_none() {
                stats.first_fault = first_fault;
            }
        }
    }
    if let Some(max) = options.limits.max_results {
        timetables.truncate(max);
    }

    let termination = shared.halted.get().copied().unwrap_or(Termination::Exhausted);
    let examined = shared.examined.load(Ordering::Relaxed);
    let elapsed = shared.started.elapsed();
    if termination.is_cancelled() {
        warn!("Search cancelled ({termination:?}) after {examined} candidates");
    }
    info!(
        "Found {} valid timetables among {} candidates in {:.2?}",
        timetables.len(),
        examined,
        elapsed
    );

    Ok(SearchReport {
        timetables,
        examined,
        termination,
        elapsed,
        predicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(subjects: usize, periods: u32) -> SchoolConfig {
        let names: Vec<String> = (0..subjects).map(|i| format!("S{i}")).collect();
        serde_json::from_value(serde_json::json!({
            "teachers": [{"name": "T", "subjects": names, "maxHours": 1000}],
            "subjects": names
                .iter()
                .map(|n| serde_json::json!({"name": n, "minHours": 0}))
                .collect::<Vec<_>>(),
            "rooms": ["101"],
            "periodsPerDay": periods
        }))
        .unwrap()
    }

    #[test]
    fn examines_the_whole_space_without_limits() {
        let registry = ConstraintRegistry::new();
        let report = search(&config(3, 4), &registry, &SearchOptions::default()).unwrap();
        assert_eq!(report.examined, 81);
        assert_eq!(report.timetables.len(), 81);
        assert_eq!(report.termination, Termination::Exhausted);
    }

    #[test]
    fn budget_equal_to_space_is_not_a_cancellation() {
        let options = SearchOptions::default().with_max_candidates(81);
        let report = search(&config(3, 4), &ConstraintRegistry::new(), &options).unwrap();
        assert_eq!(report.termination, Termination::Exhausted);

        let options = SearchOptions::default().with_max_candidates(80);
        let report = search(&config(3, 4), &ConstraintRegistry::new(), &options).unwrap();
        assert_eq!(report.examined, 80);
        assert_eq!(
            report.termination,
            Termination::Cancelled {
                reason: CancelReason::CandidateBudget
            }
        );
    }

    #[test]
    fn external_flag_and_timeout_cancel() {
        let flag = Arc::new(AtomicBool::new(true));
        let options = SearchOptions::default().with_cancel(flag);
        let report = search(&config(2, 2), &ConstraintRegistry::new(), &options).unwrap();
        assert_eq!(report.examined, 0);
        assert_eq!(
            report.termination,
            Termination::Cancelled {
                reason: CancelReason::External
            }
        );

        let options = SearchOptions::default().with_timeout(Duration::ZERO);
        let report = search(&config(2, 2), &ConstraintRegistry::new(), &options).unwrap();
        assert_eq!(
            report.termination,
            Termination::Cancelled {
                reason: CancelReason::Timeout
            }
        );
    }

    #[test]
    fn zero_result_limit_examines_nothing() {
        let options = SearchOptions::default().with_max_results(0);
        let report = search(&config(3, 4), &ConstraintRegistry::new(), &options).unwrap();
        assert_eq!(report.examined, 0);
        assert!(report.timetables.is_empty());
        assert_eq!(report.termination, Termination::ResultLimit);

        let parallel = options.with_parallel(true);
        let report = search(&config(3, 4), &ConstraintRegistry::new(), &parallel).unwrap();
        assert_eq!(report.examined, 0);
    }

    #[test]
    fn independent_days_require_a_bound() {
        let options = SearchOptions::default().with_strategy(Strategy::IndependentDays);
        assert_eq!(
            search(&config(2, 1), &ConstraintRegistry::new(), &options).unwrap_err(),
            ConfigError::UnboundedSearch
        );
    }

    #[test]
    fn config_errors_abort_before_search() {
        let mut c = config(2, 2);
        c.rooms.clear();
        assert_eq!(
            search(&c, &ConstraintRegistry::new(), &SearchOptions::default()).unwrap_err(),
            ConfigError::NoRooms
        );
    }

    #[test]
    fn partition_depth_covers_the_pool() {
        let generator = CandidateGenerator::new(8, 9);
        let depth = partition_depth(&generator);
        assert!(8usize.pow(depth as u32) >= rayon::current_num_threads() * 4);
        assert_eq!(partition_depth(&CandidateGenerator::new(1, 9)), 0);
    }
}
