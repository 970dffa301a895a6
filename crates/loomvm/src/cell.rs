//! The uniform value cell.
//!
//! Every runtime value — block, word, integer, action, context, and so on —
//! is represented by a [`Cell`]: a small, fixed-size, tagged value. Cells are
//! moved and copied by value; anything too large to fit inline (array
//! contents, string bytes, parameter lists) lives in a [`Series`](crate::series::Series)
//! owned by the [`Arena`](crate::arena::Arena) and referenced by [`NodeId`].
//!
//! The source project packs `kind`, `quote_depth`, and a flag byte into a
//! hand-rolled header word shared by four pointer-sized slots. Rust gives us
//! a sum type with niche optimization for free, so here the "header word" is
//! just the enum discriminant of [`CellData`] plus two narrow side fields
//! (`flags`, `quote_depth`) — same information, no manual bit-packing.

use crate::arena::NodeId;
use crate::binding::WordBinding;
use crate::symbol::Symbol;

bitflags::bitflags! {
    /// Per-cell flags. Maps directly onto the header flags of §3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u16 {
        /// Read-only; mutating operations fail with an access error.
        const PROTECTED = 1 << 0;
        /// This action cell was invoked from the right of its first argument.
        const ENFIXED = 1 << 1;
        /// The value came literally from source text, not computed.
        const UNEVALUATED = 1 << 2;
        /// Part of the constness wave (§4.C); mutation requires `mutable` first.
        const CONST = 1 << 3;
        /// Set by `mutable`; suppresses the constness wave on copies.
        const EXPLICITLY_MUTABLE = 1 << 4;
        /// Rendering hint: a newline preceded this cell in its source array.
        const NEWLINE_BEFORE = 1 << 5;
        /// Engine-private: this arg slot has already been typechecked (used
        /// during specialization/pickup fulfillment to avoid re-checking).
        const ARG_MARKED_CHECKED = 1 << 6;
        /// Engine-private: `out` holds a stale value from a prior step,
        /// preserved across an invisible so a following enfix can still see it.
        const OUT_MARKED_STALE = 1 << 7;
    }
}

/// Number of header bits reserved for an inline quote depth. Depths that
/// would overflow this many bits escape into a heap-allocated pairing node
/// (see [`Cell::quote`]), matching the "quote round-trip" testable property.
pub const QUOTE_DEPTH_BITS: u32 = 4;
/// Largest quote depth representable without escaping to a pairing.
pub const MAX_INLINE_QUOTE_DEPTH: u8 = (1 << QUOTE_DEPTH_BITS) - 1;

/// The enumerated type tag. Mirrors `kind` from §3 exactly; `End` is the
/// sentinel used by series terminators and is never produced by ordinary
/// evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Kind {
    End,
    Blank,
    Null,
    Void,
    Logic,
    Integer,
    Decimal,
    Date,
    Time,
    Pair,
    Word,
    SetWord,
    GetWord,
    Block,
    Group,
    Path,
    SetPath,
    GetPath,
    Text,
    Binary,
    Bitset,
    Map,
    Context,
    Action,
    Frame,
    Typeset,
    Handle,
}

/// The payload. Discriminant IS the `kind` tag (§9 design note); width stays
/// at most two machine words per variant so `Cell` stays cheap to move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellData {
    End,
    Blank,
    Null,
    Void,
    Logic(bool),
    Integer(i64),
    /// Decimal formatting/arithmetic is an external collaborator (§1); the
    /// cell only carries the bit pattern.
    Decimal(f64),
    /// Opaque y/m/d/zone bits; date arithmetic is out of scope.
    Date(DateBits),
    /// Opaque bits; time-of-day arithmetic is out of scope.
    Time(i64),
    /// Either two immediate numbers packed inline, or (once one side needs
    /// heap backing) a pairing node — kept as a node reference either way
    /// for uniformity.
    Pair(NodeId),
    Word(Symbol, WordBinding),
    SetWord(Symbol, WordBinding),
    GetWord(Symbol, WordBinding),
    /// Array series holding this block's elements.
    Block(NodeId),
    Group(NodeId),
    Path(NodeId),
    SetPath(NodeId),
    GetPath(NodeId),
    /// Byte-width series holding UTF-8 text.
    Text(NodeId),
    Binary(NodeId),
    Bitset(NodeId),
    Map(NodeId),
    /// Context node (paired keylist/varlist); see [`crate::context`].
    Context(NodeId),
    /// Action node (paramlist/details); see [`crate::action`].
    Action(NodeId),
    /// Frame-style context: a running call's varlist, named as its own kind
    /// per §3 so `type-of` distinguishes it from an ordinary object.
    Frame(NodeId),
    Typeset(TypesetBits),
    Handle(HandleId),
    /// A cell whose literal quote depth exceeded [`MAX_INLINE_QUOTE_DEPTH`];
    /// the pairing node holds `[depth-as-integer, inner cell at depth 0]`.
    QuoteEscape(NodeId),
}

/// Opaque date bits; the scanner/numeric-format collaborator owns their
/// meaning. We only need equality and copyability here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateBits {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub zone_minutes: i16,
}

/// High bits of a typeset: which `Kind`s it admits, as a bitmask indexed by
/// `Kind as u32`. Bounded above 64 kinds would need a second word; our
/// enumeration fits comfortably in one `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypesetBits(pub u64);

impl TypesetBits {
    #[must_use]
    pub fn single(kind: Kind) -> Self {
        Self(1 << kind as u32)
    }

    #[must_use]
    pub fn contains(self, kind: Kind) -> bool {
        self.0 & (1 << kind as u32) != 0
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// An opaque host handle (per §1, the host platform layer is an external
/// collaborator; we only carry its identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

/// The uniform value cell: four machine words' worth of tagged value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub(crate) flags: CellFlags,
    pub(crate) quote_depth: u8,
    pub(crate) data: CellData,
}

impl Cell {
    #[must_use]
    pub fn new(data: CellData) -> Self {
        Self {
            flags: CellFlags::empty(),
            quote_depth: 0,
            data,
        }
    }

    #[must_use]
    pub fn end() -> Self {
        Self::new(CellData::End)
    }

    #[must_use]
    pub fn blank() -> Self {
        Self::new(CellData::Blank)
    }

    #[must_use]
    pub fn null() -> Self {
        Self::new(CellData::Null)
    }

    #[must_use]
    pub fn void() -> Self {
        Self::new(CellData::Void)
    }

    #[must_use]
    pub fn logic(b: bool) -> Self {
        Self::new(CellData::Logic(b))
    }

    #[must_use]
    pub fn integer(v: i64) -> Self {
        Self::new(CellData::Integer(v))
    }

    #[must_use]
    pub fn word(sym: Symbol) -> Self {
        Self::new(CellData::Word(sym, WordBinding::Unbound))
    }

    #[must_use]
    pub fn set_word(sym: Symbol) -> Self {
        Self::new(CellData::SetWord(sym, WordBinding::Unbound))
    }

    #[must_use]
    pub fn get_word(sym: Symbol) -> Self {
        Self::new(CellData::GetWord(sym, WordBinding::Unbound))
    }

    #[must_use]
    pub fn block(node: NodeId) -> Self {
        Self::new(CellData::Block(node))
    }

    #[must_use]
    pub fn group(node: NodeId) -> Self {
        Self::new(CellData::Group(node))
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self.data, CellData::End)
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self.data {
            CellData::Integer(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_logic(&self) -> Option<bool> {
        match self.data {
            CellData::Logic(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        match &self.data {
            CellData::End => Kind::End,
            CellData::Blank => Kind::Blank,
            CellData::Null => Kind::Null,
            CellData::Void => Kind::Void,
            CellData::Logic(_) => Kind::Logic,
            CellData::Integer(_) => Kind::Integer,
            CellData::Decimal(_) => Kind::Decimal,
            CellData::Date(_) => Kind::Date,
            CellData::Time(_) => Kind::Time,
            CellData::Pair(_) => Kind::Pair,
            CellData::Word(..) => Kind::Word,
            CellData::SetWord(..) => Kind::SetWord,
            CellData::GetWord(..) => Kind::GetWord,
            CellData::Block(_) => Kind::Block,
            CellData::Group(_) => Kind::Group,
            CellData::Path(_) => Kind::Path,
            CellData::SetPath(_) => Kind::SetPath,
            CellData::GetPath(_) => Kind::GetPath,
            CellData::Text(_) => Kind::Text,
            CellData::Binary(_) => Kind::Binary,
            CellData::Bitset(_) => Kind::Bitset,
            CellData::Map(_) => Kind::Map,
            CellData::Context(_) => Kind::Context,
            CellData::Action(_) => Kind::Action,
            CellData::Frame(_) => Kind::Frame,
            CellData::Typeset(_) => Kind::Typeset,
            CellData::Handle(_) => Kind::Handle,
            // A quote-escaped cell renders as whatever its *inner* kind is,
            // with the depth applied; callers should unquote before asking.
            CellData::QuoteEscape(_) => Kind::Block,
        }
    }

    /// True for kinds that self-evaluate: copied to `out` unconditionally by
    /// `LOOKAHEAD_START` without further dispatch (§4.G).
    #[must_use]
    pub fn is_inert(&self) -> bool {
        matches!(
            self.kind(),
            Kind::Blank
                | Kind::Null
                | Kind::Void
                | Kind::Logic
                | Kind::Integer
                | Kind::Decimal
                | Kind::Date
                | Kind::Time
                | Kind::Pair
                | Kind::Block
                | Kind::Text
                | Kind::Binary
                | Kind::Bitset
                | Kind::Map
                | Kind::Context
                | Kind::Typeset
                | Kind::Handle
        ) && self.quote_depth == 0
    }

    #[must_use]
    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    pub fn set_flag(&mut self, flag: CellFlags, on: bool) {
        self.flags.set(flag, on);
    }

    #[must_use]
    pub fn is_enfixed(&self) -> bool {
        self.flags.contains(CellFlags::ENFIXED)
    }

    #[must_use]
    pub fn is_const(&self) -> bool {
        self.flags.contains(CellFlags::CONST) && !self.flags.contains(CellFlags::EXPLICITLY_MUTABLE)
    }

    /// Applies the "wave of constness" (§4.C): a frame fetching with `const`
    /// set ORs it onto every cell it produces, unless that cell has already
    /// opted out via `mutable`.
    pub fn apply_const_wave(&mut self) {
        if !self.flags.contains(CellFlags::EXPLICITLY_MUTABLE) {
            self.flags.insert(CellFlags::CONST);
        }
    }

    /// Sets `explicitly_mutable`, inverting the constness wave for this cell
    /// and anything copied from it.
    pub fn make_mutable(&mut self) {
        self.flags.insert(CellFlags::EXPLICITLY_MUTABLE);
        self.flags.remove(CellFlags::CONST);
    }

    #[must_use]
    pub fn quote_depth(&self) -> u32 {
        if self.quote_depth == u8::MAX {
            // Escaped: depth lives in the pairing, not in this field. Callers
            // needing the exact number should go through `unquote`.
            u32::from(MAX_INLINE_QUOTE_DEPTH) + 1
        } else {
            u32::from(self.quote_depth)
        }
    }

    /// Adds one level of literal quoting. Past [`MAX_INLINE_QUOTE_DEPTH`],
    /// escapes into a pairing node holding `[depth, base value at depth 0]`.
    #[must_use]
    pub fn quote(mut self, arena: &mut crate::arena::Arena) -> Self {
        match &self.data {
            CellData::QuoteEscape(node) => {
                let (depth, base) = arena.read_quote_pairing(*node);
                let node = arena.alloc_quote_pairing(depth + 1, base);
                Self {
                    flags: self.flags,
                    quote_depth: u8::MAX,
                    data: CellData::QuoteEscape(node),
                }
            }
            _ if self.quote_depth == MAX_INLINE_QUOTE_DEPTH => {
                let base = Self {
                    flags: self.flags,
                    quote_depth: 0,
                    data: self.data,
                };
                let node = arena.alloc_quote_pairing(u32::from(MAX_INLINE_QUOTE_DEPTH) + 1, base);
                Self {
                    flags: self.flags,
                    quote_depth: u8::MAX,
                    data: CellData::QuoteEscape(node),
                }
            }
            _ => {
                self.quote_depth += 1;
                self
            }
        }
    }

    /// Removes one level of literal quoting. Panics if already at depth 0;
    /// callers must check `quote_depth() > 0` first (this mirrors the source
    /// project's debug-only assertion, promoted to a hard invariant here).
    #[must_use]
    pub fn unquote(self, arena: &mut crate::arena::Arena) -> Self {
        match self.data {
            CellData::QuoteEscape(node) => {
                let (depth, base) = arena.read_quote_pairing(node);
                assert!(depth > 0, "unquote called on depth-0 cell");
                let new_depth = depth - 1;
                if new_depth <= u32::from(MAX_INLINE_QUOTE_DEPTH) {
                    Self {
                        flags: self.flags,
                        quote_depth: new_depth as u8,
                        data: base.data,
                    }
                } else {
                    let node = arena.alloc_quote_pairing(new_depth, base);
                    Self {
                        flags: self.flags,
                        quote_depth: u8::MAX,
                        data: CellData::QuoteEscape(node),
                    }
                }
            }
            _ => {
                assert!(self.quote_depth > 0, "unquote called on depth-0 cell");
                Self {
                    quote_depth: self.quote_depth - 1,
                    ..self
                }
            }
        }
    }

    /// Compares two cells by the kind of identity the throw protocol needs:
    /// same name in the sense of "the same binding/word/kind", used by
    /// `catch` to decide whether a thrown name matches.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        match (&self.data, &other.data) {
            (CellData::Word(a, _), CellData::Word(b, _)) => a == b,
            (CellData::Action(a), CellData::Action(b)) => a == b,
            (CellData::Blank, CellData::Blank) => true,
            _ => self == other,
        }
    }

    /// Returns a copy with the mask from the cell-preservation testable
    /// property applied: engine-private and provenance flags are cleared,
    /// kind/quote_depth/const/protected (of the *source*) are carried.
    ///
    /// `protected` on the *destination* is a property of where the cell is
    /// being written, not of the value being copied, so callers that need a
    /// protected destination set it themselves after calling this.
    #[must_use]
    pub fn copy_value(&self) -> Self {
        let mut flags = self.flags;
        flags.remove(CellFlags::ENFIXED | CellFlags::UNEVALUATED | CellFlags::ARG_MARKED_CHECKED | CellFlags::OUT_MARKED_STALE);
        Self {
            flags,
            quote_depth: self.quote_depth,
            data: self.data,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}
