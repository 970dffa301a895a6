//! The series container (§4.B): a variable-width vector abstraction. Width
//! 0 means "array of cells" (blocks, groups, paths, contexts' varlists,
//! paramlists); width > 0 means "bytes" (text, binary, bitset).
//!
//! Physical storage carries `bias`/`used`/`rest` bookkeeping the way the
//! source project does: `bias` slots of slack at the front let a prepend
//! (`insert` at index 0) avoid reallocating and re-shifting the whole body,
//! `used` is the logical element count, `rest` is the total slot count
//! (`bias + used + slack-at-tail + terminator`).

use crate::cell::Cell;
use crate::error::EvalError;

bitflags::bitflags! {
    /// Series lifecycle/protection state (§4.B: "manual, managed, frozen,
    /// protected, held"). `manual`/`managed` are tracked by the owning
    /// [`Arena`](crate::arena::Arena) node entry, not here; the remaining
    /// three are properties of the series content itself and survive
    /// independent of who owns the node. There is no separate
    /// "inaccessible" state here: a stale frame varlist is represented by
    /// the varlist simply not being referenced as a GC root, not by a flag
    /// on the series itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SeriesFlags: u8 {
        /// Permanently read-only; cannot be un-frozen.
        const FROZEN = 1 << 0;
        /// Read-only until explicitly un-protected.
        const PROTECTED = 1 << 1;
        /// Temporarily read-locked while an evaluation step holds a cursor
        /// into it (the array being evaluated by a frame's feed).
        const HELD = 1 << 2;
    }
}

enum Storage {
    Cells(Vec<Cell>),
    Bytes(Vec<u8>),
}

/// A single series: either an array of cells or a run of bytes, with the
/// head-slack bookkeeping that makes `insert` at the head cheap.
pub struct Series {
    flags: SeriesFlags,
    storage: Storage,
    /// Unused slack before the first live element.
    bias: usize,
    /// Count of live elements (excludes bias slack, tail slack, terminator).
    used: usize,
    /// Link to a paired series: a varlist's companion is its keylist, a
    /// paramlist's companion is its details array. `None` for ordinary
    /// blocks/strings that aren't half of such a pair.
    companion: Option<crate::arena::NodeId>,
}

impl Series {
    /// Creates an empty cell-array series with room for `capacity` elements
    /// before the next expansion.
    #[must_use]
    pub fn new_array(capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity + 1);
        data.push(Cell::end());
        Self {
            flags: SeriesFlags::empty(),
            storage: Storage::Cells(data),
            bias: 0,
            used: 0,
            companion: None,
        }
    }

    /// Creates an empty byte series (text/binary/bitset) with room for
    /// `capacity` bytes before the next expansion.
    #[must_use]
    pub fn new_bytes(capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity + 1);
        data.push(0);
        Self {
            flags: SeriesFlags::empty(),
            storage: Storage::Bytes(data),
            bias: 0,
            used: 0,
            companion: None,
        }
    }

    #[must_use]
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        let mut series = Self::new_array(cells.len());
        for cell in cells {
            series.push_cell(cell).expect("freshly created series cannot be protected");
        }
        series
    }

    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut series = Self::new_bytes(text.len());
        for byte in text.bytes() {
            series.push_byte(byte).expect("freshly created series cannot be protected");
        }
        series
    }

    #[must_use]
    pub fn width_is_cells(&self) -> bool {
        matches!(self.storage, Storage::Cells(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.used
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    #[must_use]
    pub fn bias(&self) -> usize {
        self.bias
    }

    /// Total slot count, including bias slack and the terminator, the way
    /// the source project's `rest` field does.
    #[must_use]
    pub fn rest(&self) -> usize {
        match &self.storage {
            Storage::Cells(v) => v.len(),
            Storage::Bytes(v) => v.len(),
        }
    }

    #[must_use]
    pub fn flags(&self) -> SeriesFlags {
        self.flags
    }

    #[must_use]
    pub fn companion(&self) -> Option<crate::arena::NodeId> {
        self.companion
    }

    pub fn set_companion(&mut self, node: crate::arena::NodeId) {
        self.companion = Some(node);
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.flags.contains(SeriesFlags::FROZEN)
    }

    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.flags.contains(SeriesFlags::PROTECTED) || self.is_frozen()
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.flags.contains(SeriesFlags::HELD)
    }

    pub fn freeze(&mut self) {
        self.flags.insert(SeriesFlags::FROZEN);
    }

    pub fn protect(&mut self) {
        self.flags.insert(SeriesFlags::PROTECTED);
    }

    pub fn unprotect(&mut self) {
        self.flags.remove(SeriesFlags::PROTECTED);
    }

    /// Pushes a hold, making the series temporarily read-only for the
    /// duration of an evaluation step that is iterating over it. Holds
    /// nest; callers must balance every `hold` with a `release_hold`.
    pub fn hold(&mut self) {
        self.flags.insert(SeriesFlags::HELD);
    }

    pub fn release_hold(&mut self) {
        self.flags.remove(SeriesFlags::HELD);
    }

    /// Checks the read-only/liveness states a mutation must pass, producing
    /// the access error the spec calls for on the first one hit.
    fn check_mutable(&self) -> Result<(), EvalError> {
        if self.is_held() {
            return Err(EvalError::access("series is held by an evaluation step in progress"));
        }
        if self.is_frozen() {
            return Err(EvalError::access("series is frozen"));
        }
        if self.is_protected() {
            return Err(EvalError::access("series is protected"));
        }
        Ok(())
    }

    #[must_use]
    pub fn as_cells(&self) -> Option<&[Cell]> {
        match &self.storage {
            Storage::Cells(v) => Some(&v[self.bias..self.bias + self.used]),
            Storage::Bytes(_) => None,
        }
    }

    pub fn cells_mut(&mut self) -> Result<&mut [Cell], EvalError> {
        self.check_mutable()?;
        let bias = self.bias;
        let used = self.used;
        match &mut self.storage {
            Storage::Cells(v) => Ok(&mut v[bias..bias + used]),
            Storage::Bytes(_) => Err(EvalError::arity_type("series is not a cell array")),
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.storage {
            Storage::Bytes(v) => Some(&v[self.bias..self.bias + self.used]),
            Storage::Cells(_) => None,
        }
    }

    /// Reads the element at logical `index`, failing with an arity/type
    /// error on an out-of-range index rather than panicking.
    pub fn at(&self, index: usize) -> Result<&Cell, EvalError> {
        match &self.storage {
            Storage::Cells(v) => v
                .get(self.bias + index)
                .filter(|_| index < self.used)
                .ok_or_else(|| EvalError::arity_type("series index out of range")),
            Storage::Bytes(_) => Err(EvalError::arity_type("series is not a cell array")),
        }
    }

    #[must_use]
    pub fn head(&self) -> usize {
        0
    }

    #[must_use]
    pub fn tail(&self) -> usize {
        self.used
    }

    #[must_use]
    pub fn last(&self) -> Option<&Cell> {
        self.as_cells().and_then(|c| c.last())
    }

    /// Appends one cell at the logical tail, expanding if the tail slack is
    /// exhausted.
    pub fn push_cell(&mut self, cell: Cell) -> Result<(), EvalError> {
        self.check_mutable()?;
        let Storage::Cells(v) = &mut self.storage else {
            return Err(EvalError::arity_type("series is not a cell array"));
        };
        let term_index = self.bias + self.used;
        if term_index + 1 >= v.len() {
            v.reserve(8);
            v.resize(v.len() + 8, Cell::end());
        }
        v[term_index] = cell;
        v[term_index + 1] = Cell::end();
        self.used += 1;
        Ok(())
    }

    pub fn push_byte(&mut self, byte: u8) -> Result<(), EvalError> {
        self.check_mutable()?;
        let Storage::Bytes(v) = &mut self.storage else {
            return Err(EvalError::arity_type("series is not a byte series"));
        };
        let term_index = self.bias + self.used;
        if term_index + 1 >= v.len() {
            v.reserve(16);
            v.resize(v.len() + 16, 0);
        }
        v[term_index] = byte;
        v[term_index + 1] = 0;
        self.used += 1;
        Ok(())
    }

    /// Inserts at the logical head, consuming bias slack when available
    /// instead of shifting the whole body (the amortized-prepend case the
    /// bias field exists for).
    pub fn insert_head_cell(&mut self, cell: Cell) -> Result<(), EvalError> {
        self.check_mutable()?;
        let Storage::Cells(v) = &mut self.storage else {
            return Err(EvalError::arity_type("series is not a cell array"));
        };
        if self.bias == 0 {
            let slack = 8;
            let mut grown = Vec::with_capacity(v.len() + slack);
            grown.resize(slack, Cell::end());
            grown.extend_from_slice(v);
            *v = grown;
            self.bias = slack;
        }
        self.bias -= 1;
        v[self.bias] = cell;
        self.used += 1;
        Ok(())
    }

    /// Grows the tail's reserved slack by at least `extra` slots without
    /// changing `used`, mirroring `Expand_Tail` ahead of a batch append.
    pub fn expand_tail(&mut self, extra: usize) -> Result<(), EvalError> {
        self.check_mutable()?;
        match &mut self.storage {
            Storage::Cells(v) => {
                let needed = self.bias + self.used + extra + 1;
                if v.len() < needed {
                    v.resize(needed, Cell::end());
                }
            }
            Storage::Bytes(v) => {
                let needed = self.bias + self.used + extra + 1;
                if v.len() < needed {
                    v.resize(needed, 0);
                }
            }
        }
        Ok(())
    }
}
