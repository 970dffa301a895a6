//! Error taxonomy, the trap stack, and the throw protocol.
//!
//! Per the data model, **throws are not errors**: `break`, `continue`,
//! `return`, `quit`, and user-defined throws are first-class control flow
//! that must be explicitly caught by name. Everything else that can abort an
//! expression is an [`EvalError`] and propagates through [`Signal::Error`]
//! until a trap boundary ([`Interpreter::trapped`](crate::interp::Interpreter::trapped))
//! unwinds to it. Invariant violations (corrupted arena state, a dispatcher
//! returning a sentinel it isn't allowed to) are not representable as an
//! [`ErrorKind`] at all: those use `panic!` directly with a diagnostic dump,
//! bypassing this type entirely rather than being caught and recovered from.

use std::fmt;

use crate::cell::Cell;

/// Coarse taxonomy of recoverable failures, matching §7 of the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    /// Scanner refusal (malformed source handed to a collaborator).
    Syntax,
    /// Read/write of a frozen, protected, or held series.
    Access,
    /// Wrong number or kind of argument; end reached during a non-endable arg.
    ArityType,
    /// Word lookup on an unbound word, or a word with no assigned value.
    Binding,
    /// Out-of-memory, recursion, or other engine resource exhaustion.
    Resource,
    /// Application-raised error (`fail "..."` or a raised error object).
    User,
}

/// A recoverable runtime error: kind, message, and an optional "near" cell
/// for diagnostics (the value being processed when the failure occurred).
#[derive(Debug, Clone)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub near: Option<Cell>,
}

impl EvalError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            near: None,
        }
    }

    #[must_use]
    pub fn with_near(mut self, near: Cell) -> Self {
        self.near = Some(near);
        self
    }

    #[must_use]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    #[must_use]
    pub fn access(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Access, message)
    }

    #[must_use]
    pub fn arity_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArityType, message)
    }

    #[must_use]
    pub fn binding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Binding, message)
    }

    #[must_use]
    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resource, message)
    }

    #[must_use]
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::User, message)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(near) = &self.near {
            write!(f, " (near {near:?})")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

/// A first-class throw in flight: a name cell (identifying what is being
/// thrown — a word like `break`, `continue`, a bound function identity for
/// `return`, or a user `throw` label) paired with its carried value.
///
/// Throws travel through the same frame stack as errors but are never
/// caught by a trap boundary; only [`Thrown::catch_named`] (or a construct
/// built on it, like a loop's own `break` handling) extracts them.
#[derive(Debug, Clone)]
pub struct Thrown {
    pub name: Cell,
    pub value: Box<Cell>,
}

impl Thrown {
    #[must_use]
    pub fn new(name: Cell, value: Cell) -> Self {
        Self {
            name,
            value: Box::new(value),
        }
    }

    /// Extracts the carried value if `name` matches the thrown name exactly
    /// (by the name cell's bitwise/word identity), otherwise hands the throw
    /// back unchanged for the caller to re-propagate.
    pub fn catch_named(self, name: &Cell) -> Result<Cell, Self> {
        if self.name.same_identity(name) {
            Ok(*self.value)
        } else {
            Err(self)
        }
    }
}

/// Everything that can unwind evaluation of an expression: a recoverable
/// error, or an in-flight throw.
#[derive(Debug, Clone)]
pub enum Signal {
    Error(EvalError),
    Thrown(Thrown),
}

impl From<EvalError> for Signal {
    fn from(err: EvalError) -> Self {
        Self::Error(err)
    }
}

impl From<Thrown> for Signal {
    fn from(thrown: Thrown) -> Self {
        Self::Thrown(thrown)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => write!(f, "{e}"),
            Self::Thrown(t) => write!(f, "thrown value escaped catch: {:?}", t.name),
        }
    }
}

/// Result of any operation that can fail or throw.
pub type EvalResult<T> = Result<T, Signal>;

/// A snapshot of every counter a trap boundary must restore on `fail`:
/// data-stack depth, guard-stack depth, frame-stack depth, and the count of
/// still-manual (unmanaged) series allocated since the trap was pushed.
///
/// Mirrors `push_trap`/`fail` from §6: "snapshots data-stack depth, mold
/// buffer length, manuals list, frame top, guard depth; fail unwinds to the
/// nearest trap, restoring all snapshotted counters and freeing frames/manuals
/// accumulated in between."
#[derive(Debug, Clone, Copy)]
pub struct TrapSnapshot {
    pub(crate) dsp: usize,
    pub(crate) guard_depth: usize,
    pub(crate) frame_depth: usize,
    pub(crate) manuals_len: usize,
}
