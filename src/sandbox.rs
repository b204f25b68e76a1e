//! Sandboxed execution of compiled formulas.
//!
//! The sandbox enforces three independent limits on every run: a fuel
//! budget inside the VM, a wall-clock deadline enforced by abandoning the
//! worker thread, and a cap on concurrent workers. It also owns the two
//! caches: compiled formulas keyed by source, and scores keyed by source
//! and board fingerprint.

mod cache;
mod worker;

pub use cache::CacheStats;

use crate::analysis::BoardAnalysis;
use crate::board::{Coord, source_key};
use crate::error::ExecError;
use crate::formula::{CompiledFormula, Snapshot, compile_formula};
use cache::BoundedCache;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use worker::{Gate, ReturnValue, WorkerVerdict, run_on_worker};

/// Limits and capacities for a [`Sandbox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Wall-clock budget per execution, in milliseconds.
    pub time_budget_ms: u64,
    /// VM fuel budget per execution.
    pub fuel_budget: u64,
    /// Maximum concurrent worker threads, abandoned workers included.
    pub max_in_flight: usize,
    /// Instruction ceiling for compiled formulas.
    pub max_program_ops: usize,
    /// Capacity of the compiled-formula cache.
    pub formula_cache_size: usize,
    /// Capacity of the score result cache.
    pub result_cache_size: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            time_budget_ms: 100,
            fuel_budget: 2_000_000,
            max_in_flight: 4,
            max_program_ops: 4096,
            formula_cache_size: 64,
            result_cache_size: 256,
        }
    }
}

/// The outcome of a successful sandboxed execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// The returned score, rounded to the nearest integer.
    pub score: i64,
    /// Wall-clock time the execution took. For a cache hit this is the
    /// original execution's time.
    pub elapsed: Duration,
    /// Tiles the formula highlighted, in call order.
    pub highlights: Vec<Coord>,
    /// Whether the score came from the result cache.
    pub cached: bool,
}

/// [`ExecutionResult`] plus VM internals, for the debug path.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugReport {
    /// The normal execution result.
    pub result: ExecutionResult,
    /// Fuel consumed by the run.
    pub fuel_used: u64,
    /// Total instructions in the compiled program.
    pub program_ops: usize,
}

#[derive(Debug, Clone)]
struct CachedScore {
    score: i64,
    elapsed: Duration,
    highlights: Vec<Coord>,
}

/// Sandboxed formula executor with compile and result caches.
#[derive(Debug)]
pub struct Sandbox {
    config: SandboxConfig,
    formulas: Mutex<BoundedCache<u64, CompiledFormula>>,
    results: Mutex<BoundedCache<(u64, u128), CachedScore>>,
    gate: Arc<Gate>,
}

impl Sandbox {
    /// Create a sandbox with the given limits.
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            formulas: Mutex::new(BoundedCache::new(config.formula_cache_size)),
            results: Mutex::new(BoundedCache::new(config.result_cache_size)),
            gate: Gate::new(config.max_in_flight),
        }
    }

    /// Compile formula source, or return the cached artifact.
    ///
    /// Failed compilations are cached too, so repeated validation of a bad
    /// formula does not recompile it.
    pub fn compile(&self, source: &str) -> CompiledFormula {
        let key = source_key(source);
        let mut formulas = lock(&self.formulas);
        if let Some(compiled) = formulas.get(&key) {
            if compiled.source == source {
                return compiled.clone();
            }
        }
        let compiled = compile_formula(source, self.config.max_program_ops);
        formulas.insert(key, compiled.clone());
        compiled
    }

    /// Execute formula source against an analyzed board.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::NotCompiled`] for source that fails validation,
    /// and the trap, timeout, or worker failure otherwise.
    pub fn execute(
        &self,
        source: &str,
        analysis: &BoardAnalysis,
    ) -> Result<ExecutionResult, ExecError> {
        self.execute_inner(source, analysis).map(|(result, _)| result)
    }

    /// Execute like [`Sandbox::execute`], also reporting VM internals.
    ///
    /// The debug path bypasses the result cache so the fuel figure always
    /// describes a real run.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Sandbox::execute`].
    pub fn execute_debug(
        &self,
        source: &str,
        analysis: &BoardAnalysis,
    ) -> Result<DebugReport, ExecError> {
        let compiled = self.compile(source);
        let Some(program) = compiled.program.clone() else {
            return Err(ExecError::NotCompiled);
        };
        let program_ops = program.op_count();
        let (result, fuel_left) = self.run_fresh(program, analysis)?;
        Ok(DebugReport {
            result,
            fuel_used: self.config.fuel_budget - fuel_left,
            program_ops,
        })
    }

    /// Current cache occupancy and hit counters.
    pub fn cache_stats(&self) -> CacheStats {
        let formulas = lock(&self.formulas);
        let results = lock(&self.results);
        CacheStats {
            formula_entries: formulas.len(),
            formula_hits: formulas.hits(),
            formula_misses: formulas.misses(),
            result_entries: results.len(),
            result_hits: results.hits(),
            result_misses: results.misses(),
        }
    }

    /// Drop all cached formulas and results.
    pub fn clear_caches(&self) {
        lock(&self.formulas).clear();
        lock(&self.results).clear();
    }

    fn execute_inner(
        &self,
        source: &str,
        analysis: &BoardAnalysis,
    ) -> Result<(ExecutionResult, u64), ExecError> {
        let compiled = self.compile(source);
        let Some(program) = compiled.program.clone() else {
            return Err(ExecError::NotCompiled);
        };

        let key = (source_key(source), analysis.fingerprint);
        if let Some(hit) = lock(&self.results).get(&key) {
            let result = ExecutionResult {
                score: hit.score,
                elapsed: hit.elapsed,
                highlights: hit.highlights.clone(),
                cached: true,
            };
            return Ok((result, self.config.fuel_budget));
        }

        let (result, fuel_left) = self.run_fresh(program, analysis)?;
        lock(&self.results).insert(
            key,
            CachedScore {
                score: result.score,
                elapsed: result.elapsed,
                highlights: result.highlights.clone(),
            },
        );
        Ok((result, fuel_left))
    }

    fn run_fresh(
        &self,
        program: Arc<crate::formula::Program>,
        analysis: &BoardAnalysis,
    ) -> Result<(ExecutionResult, u64), ExecError> {
        let snapshot = Snapshot::from_analysis(analysis);
        let deadline = Duration::from_millis(self.config.time_budget_ms);
        let started = Instant::now();
        let verdict = run_on_worker(
            &self.gate,
            program,
            snapshot,
            self.config.fuel_budget,
            deadline,
        );
        let elapsed = started.elapsed();

        match verdict {
            WorkerVerdict::Done(Ok(outcome)) => {
                let score = finite_score(outcome.value)?;
                let result = ExecutionResult {
                    score,
                    elapsed,
                    highlights: outcome.highlights,
                    cached: false,
                };
                Ok((result, outcome.fuel_left))
            }
            WorkerVerdict::Done(Err(trap)) => Err(ExecError::Trap(trap)),
            WorkerVerdict::Deadline => Err(ExecError::Timeout {
                budget_ms: self.config.time_budget_ms,
            }),
            WorkerVerdict::Lost => Err(ExecError::WorkerLost),
        }
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn finite_score(value: ReturnValue) -> Result<i64, ExecError> {
    match value {
        ReturnValue::Num(n) if n.is_finite() => Ok(n.round() as i64),
        ReturnValue::Num(_) => Err(ExecError::NonNumericResult("a non-finite number".to_string())),
        ReturnValue::Other(type_name) => Err(ExecError::NonNumericResult(type_name.to_string())),
    }
}
