//! Error types for formula compilation and sandboxed execution.

use std::fmt;

/// A source-position-tagged compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable problem description.
    pub message: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl Diagnostic {
    /// Create a new diagnostic at the given position.
    #[must_use]
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Errors produced while turning formula source into an executable program.
///
/// All variants are recoverable and reported to the formula author at
/// edit time; none of them reach the execution runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The required `calculateScore` entry point is absent from the source.
    MissingEntryPoint,
    /// The source failed to lex or parse.
    Syntax(Diagnostic),
    /// The source matched a denylisted pattern (dynamic evaluation, timers,
    /// network, storage, or global-object access).
    Forbidden {
        /// The denylisted identifier that was found.
        pattern: String,
        /// 1-based source line of the occurrence.
        line: u32,
        /// 1-based source column of the occurrence.
        column: u32,
    },
    /// The compiled program exceeds the instruction ceiling.
    TooComplex {
        /// Number of instructions the program compiled to.
        ops: usize,
        /// The configured ceiling.
        limit: usize,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEntryPoint => {
                write!(f, "formula must define a calculateScore function")
            }
            Self::Syntax(d) => write!(f, "syntax error at {d}"),
            Self::Forbidden {
                pattern,
                line,
                column,
            } => write!(
                f,
                "forbidden pattern '{pattern}' at {line}:{column}: formulas may not \
                 use dynamic evaluation, timers, network, storage, or global objects"
            ),
            Self::TooComplex { ops, limit } => {
                write!(f, "formula too complex: {ops} instructions (limit {limit})")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Traps that abort formula execution inside the VM.
///
/// A trap never panics the host; it is surfaced as an [`ExecError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    /// The fuel budget was exhausted.
    FuelExhausted,
    /// An operation was applied to a value of the wrong type.
    TypeError(String),
    /// An undefined variable, field, or function was referenced.
    Undefined(String),
    /// A function was called with the wrong number of arguments.
    Arity {
        /// Function that was called.
        name: String,
        /// Number of parameters it declares.
        expected: u8,
        /// Number of arguments it received.
        got: u8,
    },
    /// The value stack or call stack grew past its limit.
    StackOverflow,
    /// A value or frame was needed but the stack was empty. Indicates a
    /// code-generation bug, not a property of the formula.
    StackUnderflow,
    /// A list index was out of range.
    IndexOutOfRange {
        /// The index that was requested.
        index: i64,
        /// Length of the indexed list.
        len: usize,
    },
    /// Division or modulo by zero.
    DivisionByZero,
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FuelExhausted => write!(f, "fuel budget exhausted"),
            Self::TypeError(msg) => write!(f, "type error: {msg}"),
            Self::Undefined(name) => write!(f, "undefined name: {name}"),
            Self::Arity {
                name,
                expected,
                got,
            } => write!(f, "{name} expects {expected} arguments, got {got}"),
            Self::StackOverflow => write!(f, "stack overflow"),
            Self::StackUnderflow => write!(f, "stack underflow"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for list of length {len}")
            }
            Self::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

impl std::error::Error for Trap {}

/// Errors produced while executing a compiled formula in the sandbox.
///
/// Every variant recovers to a default score of 0; execution errors are
/// never propagated as a crash of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The formula trapped inside the VM.
    Trap(Trap),
    /// The formula returned a non-finite or non-numeric value.
    NonNumericResult(String),
    /// The wall-clock budget was exceeded and the execution abandoned.
    Timeout {
        /// The budget that was exceeded, in milliseconds.
        budget_ms: u64,
    },
    /// The worker died before producing a result.
    WorkerLost,
    /// The formula artifact failed compilation and cannot be executed.
    NotCompiled,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trap(t) => write!(f, "execution error: {t}"),
            Self::NonNumericResult(what) => {
                write!(f, "formula must return a finite number, got {what}")
            }
            Self::Timeout { budget_ms } => {
                write!(f, "formula exceeded the {budget_ms} ms execution budget")
            }
            Self::WorkerLost => write!(f, "execution worker died before responding"),
            Self::NotCompiled => write!(f, "formula did not compile successfully"),
        }
    }
}

impl std::error::Error for ExecError {}

impl From<Trap> for ExecError {
    fn from(t: Trap) -> Self {
        Self::Trap(t)
    }
}

/// Result type for VM execution steps.
pub type VmResult<T> = Result<T, Trap>;
