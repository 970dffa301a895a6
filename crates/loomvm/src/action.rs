//! Action dispatch's static half: parameter lists, quoting classes, and the
//! dispatcher contract (§4.I). The other half — fulfillment, refinements,
//! pickups, deferred enfix — lives in [`crate::dispatch`].
//!
//! An action is its parameter list (what a caller must/may supply) plus a
//! dispatcher: a function that consumes the fulfilled argument slots out of
//! a running [`Frame`](crate::frame::Frame) and produces a result. A
//! specialization narrows another action's parameter list by pre-filling
//! some slots; it keeps a "specialty" link back to the action it narrows so
//! reflection (`words-of`, `parameters-of`) can still see the full shape.

use crate::arena::NodeId;
use crate::cell::{Cell, TypesetBits};
use crate::error::EvalResult;
use crate::frame::Frame;
use crate::interp::Interpreter;
use crate::symbol::Symbol;

/// How a parameter's argument cell is obtained from the feed (§4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamClass {
    /// Fully evaluated, participates in enfix lookahead.
    Normal,
    /// Fully evaluated, but does *not* perform lookahead first (used for an
    /// enfix operator's own left argument).
    Tight,
    /// Takes the next value literally, no evaluation, no lookahead.
    HardQuote,
    /// Takes the next value literally unless it's a group, in which case the
    /// group is evaluated and its result substituted.
    SoftQuote,
    /// A named flag (`/only`-style refinement); present means true, and may
    /// introduce its own trailing arguments.
    Refinement,
    /// Local to the action body; never supplied by a caller, always starts
    /// as blank.
    Local,
    /// The pseudo-parameter carrying the action's advertised return type,
    /// unified with `Local` at the fulfillment level per the Open Question
    /// recorded in the design ledger.
    Return,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParamFlags: u8 {
        /// Accepts reaching the end of the feed instead of failing.
        const ENDABLE = 1 << 0;
        /// A variadic-feed parameter allowed to be entirely absent from a
        /// call with no trailing `<opt>` marker forcing null instead.
        const SKIPPABLE = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: Symbol,
    pub class: ParamClass,
    pub flags: ParamFlags,
    pub typeset: TypesetBits,
}

impl ParamSpec {
    #[must_use]
    pub fn new(name: Symbol, class: ParamClass) -> Self {
        Self {
            name,
            class,
            flags: ParamFlags::empty(),
            typeset: TypesetBits::default(),
        }
    }

    #[must_use]
    pub fn endable(mut self) -> Self {
        self.flags.insert(ParamFlags::ENDABLE);
        self
    }

    #[must_use]
    pub fn skippable(mut self) -> Self {
        self.flags.insert(ParamFlags::SKIPPABLE);
        self
    }

    #[must_use]
    pub fn is_endable(&self) -> bool {
        self.flags.contains(ParamFlags::ENDABLE)
    }

    #[must_use]
    pub fn is_skippable(&self) -> bool {
        self.flags.contains(ParamFlags::SKIPPABLE)
    }
}

/// Sentinel outcomes a dispatcher returns instead of a bare value, the way
/// §6 enumerates `REDO_CHECKED` / `REDO_UNCHECKED` / `THROWN` / `INVISIBLE` /
/// `REFERENCE` / `IMMEDIATE` / `UNHANDLED`.
pub enum DispatchOutcome {
    /// Ordinary return value, already in `frame.out`.
    Done,
    /// Re-run fulfillment and dispatch from the top with the current
    /// argument slots, re-typechecking them (used by `ADAPT`-style
    /// pre-phases that rewrite arguments before the real call).
    RedoChecked,
    /// Same, but skip re-typechecking the slots (the adapter already knows
    /// they're valid).
    RedoUnchecked,
    /// A throw escaped the dispatcher; propagate without further dispatch.
    Thrown(crate::error::Thrown),
    /// This call contributes nothing to `out`; the caller's previous value
    /// (if any) is preserved, and enfix lookahead may still see past it.
    Invisible,
    /// The dispatcher handed back a direct reference into a series (e.g.
    /// `pick`) rather than a value to copy; the engine copies it out.
    Reference(Cell),
    /// The dispatcher produced a self-evaluating value and wants dispatch
    /// skipped for it entirely (used by datatype constructors).
    Immediate(Cell),
    /// This dispatcher declines to handle the call; the engine falls back
    /// to the specialty action underneath, if any.
    Unhandled,
}

pub type DispatchResult = EvalResult<DispatchOutcome>;

/// A dispatcher: given the interpreter and the frame whose argument slots
/// were just fulfilled, produces a result (written to `frame.out`) or one of
/// the sentinel [`DispatchOutcome`]s.
pub type Dispatcher = fn(&mut Interpreter, &mut Frame) -> DispatchResult;

/// An action: its parameter list and dispatcher, plus (for specializations)
/// pre-filled argument slots and a link to the action being specialized.
pub struct Action {
    pub params: Vec<ParamSpec>,
    pub dispatcher: Dispatcher,
    /// Parallel to `params`; `Some` means this slot is pre-filled by a
    /// specialization and the caller does not supply it.
    pub specialized: Vec<Option<Cell>>,
    /// The action being narrowed, if this is a specialization/adaptation.
    pub specialty: Option<NodeId>,
    pub label: Option<Symbol>,
    /// Called with the word to its left as a first, already-evaluated
    /// argument instead of starting a fresh expression (§4.G).
    pub enfix: bool,
    /// Only meaningful when `enfix` is set: this call waits for any
    /// non-deferred enfix chain to the left to finish binding before it
    /// takes its left argument (`then`/`else`-style words, as opposed to
    /// ordinary infix operators).
    pub defers: bool,
}

impl Action {
    #[must_use]
    pub fn new(params: Vec<ParamSpec>, dispatcher: Dispatcher) -> Self {
        let len = params.len();
        Self {
            params,
            dispatcher,
            specialized: vec![None; len],
            specialty: None,
            label: None,
            enfix: false,
            defers: false,
        }
    }

    #[must_use]
    pub fn enfixed(mut self) -> Self {
        self.enfix = true;
        self
    }

    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.enfix = true;
        self.defers = true;
        self
    }

    #[must_use]
    pub fn specialize(mut self, specialty_of: NodeId, slot: usize, value: Cell) -> Self {
        self.specialized[slot] = Some(value);
        self.specialty = Some(specialty_of);
        self
    }

    #[must_use]
    pub fn find_param(&self, name: Symbol) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !matches!(p.class, ParamClass::Local | ParamClass::Return))
            .count()
    }
}
