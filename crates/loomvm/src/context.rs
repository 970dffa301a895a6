//! Contexts: the keylist/varlist array pair backing objects, modules, error
//! objects, and (via [`crate::action`]) the "details" twin of a paramlist.
//!
//! A context is two parallel cell-array series of equal length: the
//! *keylist* holds a word cell per slot naming it, the *varlist* holds the
//! corresponding value in the same slot. Slot 0 of the varlist is the
//! context's archetype: a `context!`-kind cell whose own binding points back
//! at this same varlist, so copying a context's archetype into a word cell
//! is enough to bind that word specifically to it.

use crate::arena::{Arena, NodeId};
use crate::binding::WordBinding;
use crate::cell::{Cell, CellData};
use crate::error::EvalError;
use crate::series::Series;
use crate::symbol::Symbol;

/// A handle bundling a context's keylist and varlist node ids. Cheap to
/// copy; the real state lives in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub keylist: NodeId,
    pub varlist: NodeId,
}

impl Context {
    /// Allocates a new, empty context (both series start managed since a
    /// context is never meaningfully "manual" — it's reachable the moment
    /// its archetype cell exists).
    pub fn new(arena: &mut Arena) -> Self {
        let keylist = arena.alloc_series(Series::new_array(4));
        let varlist = arena.alloc_series(Series::new_array(4));
        arena.series_mut(keylist).set_companion(varlist);
        arena.series_mut(varlist).set_companion(keylist);
        arena.manage(keylist);
        arena.manage(varlist);
        let archetype = Cell::new(CellData::Context(varlist));
        arena
            .series_mut(varlist)
            .push_cell(archetype)
            .expect("fresh varlist cannot be protected");
        arena
            .series_mut(keylist)
            .push_cell(Cell::blank())
            .expect("fresh keylist cannot be protected");
        Self { keylist, varlist }
    }

    #[must_use]
    pub fn archetype(self) -> Cell {
        Cell::new(CellData::Context(self.varlist))
    }

    #[must_use]
    pub fn len(self, arena: &Arena) -> usize {
        arena.series(self.varlist).len().saturating_sub(1)
    }

    #[must_use]
    pub fn is_empty(self, arena: &Arena) -> bool {
        self.len(arena) == 0
    }

    /// Appends a new key/value slot. Returns the slot index (0 is the
    /// archetype, so the first real key lands at index 1).
    pub fn append(self, arena: &mut Arena, key: Symbol, value: Cell) -> Result<usize, EvalError> {
        arena.series_mut(self.keylist).push_cell(Cell::word(key))?;
        arena.series_mut(self.varlist).push_cell(value)?;
        Ok(arena.series(self.varlist).len() - 1)
    }

    /// Finds the slot index of `key`, if bound in this context.
    #[must_use]
    pub fn find(self, arena: &Arena, key: Symbol) -> Option<usize> {
        let keys = arena.series(self.keylist).as_cells()?;
        keys.iter().skip(1).position(|cell| match cell.data {
            CellData::Word(sym, _) => sym == key,
            _ => false,
        }).map(|i| i + 1)
    }

    pub fn get(self, arena: &Arena, key: Symbol) -> Option<Cell> {
        let slot = self.find(arena, key)?;
        arena.series(self.varlist).at(slot).ok().copied()
    }

    pub fn set(self, arena: &mut Arena, key: Symbol, value: Cell) -> Result<(), EvalError> {
        match self.find(arena, key) {
            Some(slot) => {
                let cells = arena.series_mut(self.varlist).cells_mut()?;
                cells[slot] = value;
                Ok(())
            }
            None => {
                self.append(arena, key, value)?;
                Ok(())
            }
        }
    }

    /// Binds a word cell specifically to this context, in place.
    pub fn bind_word(self, word: &mut Cell) {
        match &mut word.data {
            CellData::Word(_, binding) | CellData::SetWord(_, binding) | CellData::GetWord(_, binding) => {
                *binding = WordBinding::Specific(self.varlist);
            }
            _ => {}
        }
    }
}
