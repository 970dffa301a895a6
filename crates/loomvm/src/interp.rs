//! The interpreter: the arena, symbol table, data stack, frame stack, and
//! resource limits bundled into one handle, plus the trap-boundary protocol
//! (§6) that `fail` unwinds to.
//!
//! One `Interpreter` is a self-contained evaluation universe — nothing in
//! this crate reaches into process-global state. Embedding multiple
//! interpreters (e.g. one per sandboxed script) is just creating more than
//! one of these.

use crate::arena::{Arena, NodeId};
use crate::config::ResourceLimits;
use crate::context::Context;
use crate::error::{EvalResult, Signal, TrapSnapshot};
use crate::frame::FrameStack;
use crate::gc::SignalState;
use crate::stack::DataStack;
use crate::symbol::Interns;

pub struct Interpreter {
    pub arena: Arena,
    pub interns: Interns,
    pub stack: DataStack,
    pub frames: FrameStack,
    pub limits: ResourceLimits,
    pub signals: SignalState,
    /// Fallback binding target for a word with no binding of its own. A
    /// full lexical binder is an external collaborator (the scanner/loader
    /// stub here never binds anything); this stands in for it so words
    /// scanned from loose source text still resolve somewhere, the way a
    /// host's top-level REPL binds unbound input to its user context.
    pub user_context: Context,
    /// Depth-only trap markers; the full snapshot lives on the caller's
    /// stack via [`Interpreter::trapped`], this just lets nested traps see
    /// how deep they're nested for diagnostics.
    trap_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::default())
    }

    #[must_use]
    pub fn with_limits(limits: ResourceLimits) -> Self {
        let mut arena = Arena::new();
        let user_context = Context::new(&mut arena);
        Self {
            arena,
            interns: Interns::new(),
            stack: DataStack::new(),
            frames: FrameStack::new(),
            limits,
            signals: SignalState::new(),
            user_context,
            trap_depth: 0,
        }
    }

    /// Snapshots every counter a trap boundary must restore on `fail` (§6).
    #[must_use]
    pub fn snapshot(&mut self) -> TrapSnapshot {
        self.trap_depth += 1;
        TrapSnapshot {
            dsp: self.stack.depth(),
            guard_depth: self.arena.guard_depth(),
            frame_depth: self.frames.depth(),
            manuals_len: self.arena.manuals_len(),
        }
    }

    /// Restores a snapshot taken earlier, discarding anything pushed,
    /// guarded, framed, or manually allocated since.
    pub fn unwind_to(&mut self, snapshot: TrapSnapshot) {
        self.trap_depth = self.trap_depth.saturating_sub(1);
        self.stack.drop_to(snapshot.dsp);
        self.arena.truncate_guards(snapshot.guard_depth);
        self.frames.truncate_to(snapshot.frame_depth);
        self.arena.truncate_manuals(snapshot.manuals_len);
    }

    /// Runs `body`, restoring every snapshotted counter if it returns an
    /// error or throw (the trap-boundary half of §6: "fail unwinds to the
    /// nearest trap, restoring all snapshotted counters and freeing
    /// frames/manuals accumulated in between").
    ///
    /// # Errors
    /// Returns whatever `body` returned on failure, after unwinding.
    pub fn trapped<T>(&mut self, body: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        let snapshot = self.snapshot();
        match body(self) {
            Ok(value) => {
                self.trap_depth = self.trap_depth.saturating_sub(1);
                Ok(value)
            }
            Err(signal) => {
                tracing::debug!(target: "loomvm.trap", depth = self.trap_depth, "unwinding");
                self.unwind_to(snapshot);
                Err(signal)
            }
        }
    }

    /// Collection roots external to the arena itself: the data stack and any
    /// live frames' working cells. Handed to [`Arena::collect`] together
    /// with the guard stack (which the arena tracks on its own).
    #[must_use]
    pub fn gc_roots(&self) -> Vec<NodeId> {
        let mut roots = Vec::new();
        for i in 0..self.stack.depth() {
            roots.extend(crate::arena::cell_root(self.stack.at(i)));
        }
        let mut frame = self.frames.current();
        while let Some(f) = frame {
            roots.extend(crate::arena::cell_root(&f.out));
            roots.extend(crate::arena::cell_root(&f.spare));
            if let Some(varlist) = f.varlist {
                roots.push(varlist);
            }
            if let Some(original) = f.original {
                roots.push(original);
            }
            frame = f.prior.as_deref();
        }
        roots
    }

    /// Runs a collection if due, using [`Interpreter::gc_roots`] plus the
    /// arena's own guard stack. Only safe to call between expressions.
    pub fn maybe_collect(&mut self) {
        let roots = self.gc_roots();
        crate::gc::maybe_collect(&mut self.arena, &mut self.signals, &roots);
    }

    /// Scans `source` and evaluates it as a single top-level program,
    /// returning the value of its last expression (or `void` if empty).
    ///
    /// # Errors
    /// Returns a syntax error from the scanner, or any evaluation error or
    /// uncaught throw.
    pub fn run_source(&mut self, source: &str) -> EvalResult<crate::cell::Cell> {
        tracing::trace!(target: "loomvm.eval", len = source.len(), "run_source");
        let node = crate::reader::scan(source, &mut self.arena, &mut self.interns)
            .map_err(Signal::Error)?;
        crate::evaluator::run_array(self, node, crate::binding::Specifier::Unbound)
    }
}
