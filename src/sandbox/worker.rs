//! Worker threads for formula execution.
//!
//! Each execution runs on its own thread so the caller can abandon it at
//! the wall-clock deadline without cooperation. An abandoned worker keeps
//! burning fuel until the VM traps, so the fuel budget bounds how long it
//! can outlive its caller. A counting gate bounds how many workers exist
//! at once, abandoned ones included.

use crate::board::Coord;
use crate::error::VmResult;
use crate::formula::{Program, Snapshot, Value, run};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// The entry point's return value, flattened to a thread-safe shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ReturnValue {
    /// A numeric score.
    Num(f64),
    /// Anything else, by type name.
    Other(&'static str),
}

/// What a worker reports back on success.
#[derive(Debug)]
pub(crate) struct WorkerOutcome {
    pub(crate) value: ReturnValue,
    pub(crate) highlights: Vec<Coord>,
    pub(crate) fuel_left: u64,
}

/// What the caller saw happen to a worker.
#[derive(Debug)]
pub(crate) enum WorkerVerdict {
    /// The worker finished within the deadline.
    Done(VmResult<WorkerOutcome>),
    /// The deadline passed; the worker was abandoned.
    Deadline,
    /// The worker thread died without reporting.
    Lost,
}

/// Counting gate limiting concurrent workers.
#[derive(Debug)]
pub(crate) struct Gate {
    count: Mutex<usize>,
    freed: Condvar,
    limit: usize,
}

impl Gate {
    pub(crate) fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            count: Mutex::new(0),
            freed: Condvar::new(),
            limit: limit.max(1),
        })
    }

    /// Block until a worker slot is free, then claim it.
    fn acquire(self: &Arc<Self>) -> Permit {
        let mut count = match self.count.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while *count >= self.limit {
            count = match self.freed.wait(count) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        *count += 1;
        Permit {
            gate: Arc::clone(self),
        }
    }

    fn release(&self) {
        let mut count = match self.count.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *count = count.saturating_sub(1);
        drop(count);
        self.freed.notify_one();
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        match self.count.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// RAII slot claim; released when the worker thread finishes.
#[derive(Debug)]
struct Permit {
    gate: Arc<Gate>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// Run a program on a fresh worker thread and wait for the deadline.
///
/// The permit travels into the worker, so a timed-out worker still counts
/// against the gate until its fuel runs out.
pub(crate) fn run_on_worker(
    gate: &Arc<Gate>,
    program: Arc<Program>,
    snapshot: Snapshot,
    fuel: u64,
    deadline: Duration,
) -> WorkerVerdict {
    let permit = gate.acquire();
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("formula-worker".to_string())
        .spawn(move || {
            let _permit = permit;
            let reply = run(&program, &snapshot, fuel).map(|outcome| WorkerOutcome {
                value: flatten(&outcome.value),
                highlights: outcome.highlights,
                fuel_left: outcome.fuel_left,
            });
            // The receiver may already have given up; that is fine.
            let _ = tx.send(reply);
        });
    if spawned.is_err() {
        return WorkerVerdict::Lost;
    }

    match rx.recv_timeout(deadline) {
        Ok(reply) => WorkerVerdict::Done(reply),
        Err(RecvTimeoutError::Timeout) => WorkerVerdict::Deadline,
        Err(RecvTimeoutError::Disconnected) => WorkerVerdict::Lost,
    }
}

fn flatten(value: &Value) -> ReturnValue {
    match value {
        Value::Num(n) => ReturnValue::Num(*n),
        other => ReturnValue::Other(other.type_name()),
    }
}
