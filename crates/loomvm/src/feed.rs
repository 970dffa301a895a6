//! The feed: a uniform one-token-lookahead cursor over either a cell array
//! or a C-variadic-style sequence of raw fragments (§4.E). The evaluator
//! never reads "the next cell" directly; it always asks the feed, so array
//! evaluation and variadic evaluation (used by native calls that build a
//! block argument out of loose Rust/host values on the fly) share one
//! fetch/lookahead implementation.

use std::collections::VecDeque;

use crate::arena::{Arena, NodeId};
use crate::binding::Specifier;
use crate::cell::Cell;
use crate::symbol::Interns;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FeedFlags: u8 {
        /// No more cells: `value` holds an end marker.
        const AT_END = 1 << 0;
        /// The constness wave (§4.C) is active; every fetched cell gets
        /// `CONST` OR'd onto its flags unless it opted out via `mutable`.
        const CONST = 1 << 1;
    }
}

/// One element of a feed's variadic tail, not yet materialized into cells.
pub enum VariadicItem {
    /// Raw source text, scanned into cells lazily the first time the feed's
    /// cursor reaches it.
    Utf8Fragment(String),
    /// An already-formed cell, spliced in as literal source (still subject
    /// to ordinary evaluation — e.g. a word spliced this way still looks
    /// itself up).
    CellPointer(Cell),
    /// An already-*evaluated* result, spliced in so the evaluator treats it
    /// as inert regardless of its kind (skips a second evaluation pass).
    InstructionSingular(Cell),
}

enum SourceFrame {
    Array { node: NodeId, index: usize },
    Spliced { cells: Vec<Cell>, index: usize, inert: bool },
}

/// A one-token-lookahead cursor. `value` always holds the cell the
/// evaluator is currently looking at (or an end marker); `gotten` caches a
/// word lookup performed during lookahead so dispatch doesn't repeat it.
pub struct Feed {
    stack: Vec<SourceFrame>,
    variadic_queue: VecDeque<VariadicItem>,
    pub value: Cell,
    pub gotten: Option<Cell>,
    pub specifier: Specifier,
    flags: FeedFlags,
}

impl Feed {
    /// Builds a feed over a block/group array already materialized in the
    /// arena, positioned before its first element.
    #[must_use]
    pub fn from_array(arena: &mut Arena, node: NodeId, specifier: Specifier) -> Self {
        let mut feed = Self {
            stack: vec![SourceFrame::Array { node, index: 0 }],
            variadic_queue: VecDeque::new(),
            value: Cell::end(),
            gotten: None,
            specifier,
            flags: FeedFlags::empty(),
        };
        feed.fetch_next(arena);
        feed
    }

    /// Builds a feed over a variadic sequence (no backing array node), the
    /// way a native assembling arguments out of host values would.
    #[must_use]
    pub fn from_variadic(items: Vec<VariadicItem>, arena: &mut Arena, specifier: Specifier) -> Self {
        let mut feed = Self {
            stack: Vec::new(),
            variadic_queue: items.into_iter().collect(),
            value: Cell::end(),
            gotten: None,
            specifier,
            flags: FeedFlags::empty(),
        };
        feed.fetch_next(arena);
        feed
    }

    #[must_use]
    pub fn is_const(&self) -> bool {
        self.flags.contains(FeedFlags::CONST)
    }

    pub fn set_const(&mut self, on: bool) {
        self.flags.set(FeedFlags::CONST, on);
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.flags.contains(FeedFlags::AT_END)
    }

    /// Materializes the next queued variadic item into a source frame, if
    /// any remain. `interns`/`arena` are only consulted when a
    /// `Utf8Fragment` needs scanning (it may contain nested blocks, which
    /// need arena allocation just like top-level source does).
    fn materialize_next_variadic(&mut self, arena: &mut Arena, interns: &mut Interns) -> bool {
        let Some(item) = self.variadic_queue.pop_front() else {
            return false;
        };
        let frame = match item {
            VariadicItem::Utf8Fragment(text) => {
                let cells = crate::reader::scan_fragment(&text, arena, interns);
                SourceFrame::Spliced {
                    cells,
                    index: 0,
                    inert: false,
                }
            }
            VariadicItem::CellPointer(cell) => SourceFrame::Spliced {
                cells: vec![cell],
                index: 0,
                inert: false,
            },
            VariadicItem::InstructionSingular(cell) => SourceFrame::Spliced {
                cells: vec![cell],
                index: 0,
                inert: true,
            },
        };
        self.stack.push(frame);
        true
    }

    /// Advances the cursor by one cell, applying the constness wave if
    /// active.
    pub fn fetch_next(&mut self, arena: &mut Arena) {
        self.fetch_next_with_interns(arena, &mut Interns::new());
    }

    pub fn fetch_next_with_interns(&mut self, arena: &mut Arena, interns: &mut Interns) {
        self.gotten = None;
        loop {
            match self.stack.last_mut() {
                Some(SourceFrame::Array { node, index }) => {
                    let series = arena.series(*node);
                    if let Some(cells) = series.as_cells() {
                        if *index < cells.len() {
                            let mut cell = cells[*index];
                            *index += 1;
                            if self.is_const() {
                                cell.apply_const_wave();
                            }
                            self.value = cell;
                            self.flags.remove(FeedFlags::AT_END);
                            return;
                        }
                    }
                    self.stack.pop();
                }
                Some(SourceFrame::Spliced { cells, index, .. }) => {
                    if *index < cells.len() {
                        let mut cell = cells[*index];
                        *index += 1;
                        if self.is_const() {
                            cell.apply_const_wave();
                        }
                        self.value = cell;
                        self.flags.remove(FeedFlags::AT_END);
                        return;
                    }
                    self.stack.pop();
                }
                None => {
                    if self.materialize_next_variadic(arena, interns) {
                        continue;
                    }
                    self.value = Cell::end();
                    self.flags.insert(FeedFlags::AT_END);
                    return;
                }
            }
        }
    }

    /// True if the current value came from a splice marked as an already
    /// evaluated "instruction singular" — the evaluator must treat it as
    /// inert even if its kind would normally dispatch.
    #[must_use]
    pub fn current_is_pre_evaluated(&self) -> bool {
        matches!(self.stack.last(), Some(SourceFrame::Spliced { inert: true, .. }))
    }
}
