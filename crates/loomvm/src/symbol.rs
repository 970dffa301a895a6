//! Word interning: every word, set-word, get-word, refinement name, and
//! context key is represented as a [`Symbol`], an index into a process-global
//! string table. Two words with the same spelling always intern to the same
//! `Symbol`, so binding comparisons are integer comparisons rather than
//! string comparisons.

use ahash::AHashMap;

/// Interned word identity. Cheap to copy, cheap to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    fn index(self) -> usize {
        self.0 as usize
    }

    /// Constructs a `Symbol` without going through an `Interns` table.
    /// Only meaningful for tests that need a stand-in symbol and don't care
    /// about its spelling.
    #[cfg(test)]
    #[must_use]
    pub fn from_test_id(id: u32) -> Self {
        Self(id)
    }
}

/// The process-global (per-[`Interpreter`](crate::Interpreter)) symbol table.
///
/// Interning is append-only: symbols are never removed, since a `Symbol` may
/// be latent in a binding or paramlist key well after the source text that
/// produced it has been dropped.
#[derive(Debug, Default)]
pub struct Interns {
    strings: Vec<Box<str>>,
    lookup: AHashMap<Box<str>, Symbol>,
}

impl Interns {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text`, returning its existing `Symbol` if already known.
    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(&sym) = self.lookup.get(text) {
            return sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(text.into());
        self.lookup.insert(text.into(), sym);
        sym
    }

    /// Returns the spelling of an interned symbol.
    ///
    /// # Panics
    /// Panics if `sym` was not produced by this table.
    #[must_use]
    pub fn spelling(&self, sym: Symbol) -> &str {
        &self.strings[sym.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut interns = Interns::new();
        let a = interns.intern("foo");
        let b = interns.intern("foo");
        let c = interns.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interns.spelling(a), "foo");
        assert_eq!(interns.spelling(c), "bar");
    }
}
