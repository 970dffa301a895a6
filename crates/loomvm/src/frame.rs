//! The frame: one level of the evaluator's call stack (§4.F). A frame
//! drives a [`Feed`] forward, accumulating a result in `out`, and — while
//! an action call is being fulfilled — tracks which parameter and argument
//! slot it's currently filling plus a possible "special" source for
//! pickups.
//!
//! Frames form a singly linked stack via `prior`, matching the source
//! project's chained-not-array frame stack (a running frame's varlist can
//! outlive a sibling's without disturbing its position, which an array of
//! frames couldn't offer).

use crate::arena::NodeId;
use crate::cell::Cell;
use crate::feed::Feed;
use crate::symbol::Symbol;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameFlags: u8 {
        /// This frame is fulfilling an action call's arguments (as opposed
        /// to evaluating a bare expression with no action in progress).
        const FULFILLING = 1 << 0;
        /// Currently in the out-of-order refinement pickup phase: `special`
        /// points at the varlist being walked a second time.
        const DOING_PICKUPS = 1 << 1;
    }
}

/// One level of the call stack.
pub struct Frame {
    /// Accumulates the result of the expression(s) this frame is
    /// evaluating.
    pub out: Cell,
    pub feed: Feed,
    pub prior: Option<Box<Frame>>,
    /// Data-stack depth when this frame was pushed, restored on pop/fail.
    pub dsp_orig: usize,
    /// Count of expressions evaluated by this frame so far (diagnostics).
    pub expr_index: usize,
    /// The action node being called, if this frame represents a call.
    pub original: Option<NodeId>,
    pub opt_label: Option<Symbol>,
    /// This call's own instance varlist — what a relative word inside the
    /// action's body resolves against via `Specifier::Frame`.
    pub varlist: Option<NodeId>,
    /// Archetype cell for `varlist`, cached so dispatch doesn't need to
    /// round-trip through the arena for it every step.
    pub rootvar: Cell,
    pub param_index: usize,
    pub arg_index: usize,
    /// Source varlist for refinement pickups (§4.I): when out-of-order
    /// refinements are hit, the frame walks this a second time to fill the
    /// trailing args it skipped the first pass.
    pub special: Option<NodeId>,
    /// Accumulated quote depth to re-apply to the call's result, from
    /// quoting the action word itself (`'foo arg` calls `foo` and quotes
    /// its result once more).
    pub requotes: u32,
    pub spare: Cell,
    pub flags: FrameFlags,
}

impl Frame {
    #[must_use]
    pub fn new(feed: Feed, dsp_orig: usize) -> Self {
        Self {
            out: Cell::void(),
            feed,
            prior: None,
            dsp_orig,
            expr_index: 0,
            original: None,
            opt_label: None,
            varlist: None,
            rootvar: Cell::blank(),
            param_index: 0,
            arg_index: 0,
            special: None,
            requotes: 0,
            spare: Cell::blank(),
            flags: FrameFlags::empty(),
        }
    }

    #[must_use]
    pub fn is_fulfilling(&self) -> bool {
        self.flags.contains(FrameFlags::FULFILLING)
    }

    #[must_use]
    pub fn is_doing_pickups(&self) -> bool {
        self.flags.contains(FrameFlags::DOING_PICKUPS)
    }

    pub fn begin_pickups(&mut self, special: NodeId) {
        self.flags.insert(FrameFlags::DOING_PICKUPS);
        self.special = Some(special);
    }

    pub fn end_pickups(&mut self) {
        self.flags.remove(FrameFlags::DOING_PICKUPS);
    }
}

/// The frame stack itself: a chain of [`Frame`]s, topmost first.
#[derive(Default)]
pub struct FrameStack {
    top: Option<Box<Frame>>,
    depth: usize,
}

impl FrameStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn push(&mut self, mut frame: Frame) {
        frame.prior = self.top.take();
        self.top = Some(Box::new(frame));
        self.depth += 1;
    }

    /// Pops the topmost frame, returning it.
    ///
    /// # Panics
    /// Panics if the stack is empty.
    pub fn pop(&mut self) -> Frame {
        let mut top = self.top.take().expect("frame stack underflow");
        self.top = top.prior.take();
        self.depth -= 1;
        *top
    }

    #[must_use]
    pub fn current(&self) -> Option<&Frame> {
        self.top.as_deref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Frame> {
        self.top.as_deref_mut()
    }

    /// Truncates the stack back to `depth`, discarding frames pushed since
    /// (the frame-stack half of trap unwinding).
    pub fn truncate_to(&mut self, depth: usize) {
        while self.depth > depth {
            self.pop();
        }
    }
}
