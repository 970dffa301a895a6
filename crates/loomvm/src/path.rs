//! Path evaluation (`path!`/`set-path!`/`get-path!`): a chain of word or
//! integer segments walked one at a time against a context or a block.
//!
//! Full path dispatch — refinement paths into an action's own parameter
//! list, path groups (`obj/(expr)`), and the invoke-vs-fetch distinction for
//! a final segment that resolves to an action — is an external
//! collaborator here. What's implemented is the common case every
//! object-field and block-index access goes through: `obj/field`,
//! `blk/1`, and assignment through either.

use crate::arena::NodeId;
use crate::binding::Specifier;
use crate::cell::{Cell, CellData};
use crate::context::Context;
use crate::error::{EvalError, EvalResult, Signal};
use crate::interp::Interpreter;
use crate::symbol::Symbol;

#[derive(Clone, Copy)]
enum Segment {
    Name(Symbol),
    Index(i64),
}

fn segment_of(cell: Cell) -> Result<Segment, EvalError> {
    match cell.data {
        CellData::Word(sym, _) => Ok(Segment::Name(sym)),
        CellData::Integer(i) => Ok(Segment::Index(i)),
        _ => Err(EvalError::arity_type("path segment must be a word or an integer")),
    }
}

fn context_of(interp: &Interpreter, varlist: NodeId) -> Context {
    let keylist = interp
        .arena
        .series(varlist)
        .companion()
        .expect("varlist missing its keylist companion");
    Context { keylist, varlist }
}

fn index_of(i: i64) -> Result<usize, EvalError> {
    usize::try_from(i - 1).map_err(|_| EvalError::arity_type("block index must be 1 or greater"))
}

fn pick(interp: &Interpreter, base: Cell, segment: Segment) -> Result<Cell, EvalError> {
    match (base.data, segment) {
        (CellData::Context(varlist), Segment::Name(sym)) => context_of(interp, varlist)
            .get(&interp.arena, sym)
            .ok_or_else(|| EvalError::binding(format!("`{}` is not a field of this object", interp.interns.spelling(sym)))),
        (CellData::Block(node), Segment::Index(i)) => {
            interp.arena.series(node).at(index_of(i)?).copied()
        }
        _ => Err(EvalError::arity_type("path segment does not apply to this value's kind")),
    }
}

fn poke(interp: &mut Interpreter, base: Cell, segment: Segment, value: Cell) -> Result<(), EvalError> {
    match (base.data, segment) {
        (CellData::Context(varlist), Segment::Name(sym)) => context_of(interp, varlist).set(&mut interp.arena, sym, value),
        (CellData::Block(node), Segment::Index(i)) => {
            let idx = index_of(i)?;
            let cells = interp.arena.series_mut(node).cells_mut()?;
            let slot = cells.get_mut(idx).ok_or_else(|| EvalError::arity_type("block index out of range"))?;
            *slot = value;
            Ok(())
        }
        _ => Err(EvalError::arity_type("path segment does not apply to this value's kind")),
    }
}

/// Looks up a path's first segment (always a word) and converts the rest of
/// its array into [`Segment`]s.
fn root_and_segments(interp: &Interpreter, node: NodeId, specifier: Specifier) -> EvalResult<(Cell, Vec<Segment>)> {
    let cells = interp
        .arena
        .series(node)
        .as_cells()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Signal::Error(EvalError::arity_type("path has no segments")))?
        .to_vec();
    let (head, rest) = cells.split_first().expect("checked non-empty above");
    let CellData::Word(root_sym, root_binding) = head.data else {
        return Err(Signal::Error(EvalError::arity_type("path must start with a word")));
    };
    let root = crate::evaluator::lookup_word(interp, root_sym, root_binding, specifier)?;
    let segs = rest
        .iter()
        .map(|c| segment_of(*c))
        .collect::<Result<Vec<_>, _>>()
        .map_err(Signal::Error)?;
    Ok((root, segs))
}

/// Fetches the value a `path!`/`get-path!` names, without invoking it even
/// if the final segment resolves to an action.
///
/// # Errors
/// A binding error for a missing field or unbound root word, or an
/// arity/type error for an out-of-range index or a segment that doesn't
/// apply to its base value's kind.
pub fn eval_path_get(interp: &mut Interpreter, node: NodeId, specifier: Specifier) -> EvalResult<Cell> {
    let (mut base, segs) = root_and_segments(interp, node, specifier)?;
    for seg in segs {
        base = pick(interp, base, seg).map_err(Signal::Error)?;
    }
    Ok(base)
}

/// Assigns `value` through a `set-path!`'s segment chain: every segment but
/// the last picks a container, the last pokes `value` into it.
///
/// # Errors
/// Same as [`eval_path_get`], plus an arity/type error for a bare root word
/// with no further segment to assign through.
pub fn eval_path_set(interp: &mut Interpreter, node: NodeId, specifier: Specifier, value: Cell) -> EvalResult<()> {
    let (base, segs) = root_and_segments(interp, node, specifier)?;
    let Some((last, init)) = segs.split_last() else {
        return Err(Signal::Error(EvalError::arity_type("set-path has no segment to assign")));
    };
    let mut container = base;
    for seg in init {
        container = pick(interp, container, *seg).map_err(Signal::Error)?;
    }
    poke(interp, container, *last, value).map_err(Signal::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Interpreter;

    fn make_path(interp: &mut Interpreter, segments: &[Cell]) -> NodeId {
        let node = interp.arena.alloc_series(crate::series::Series::from_cells(segments.to_vec()));
        interp.arena.manage(node);
        node
    }

    #[test]
    fn get_path_reads_an_object_field() {
        let mut interp = Interpreter::new();
        let ctx = Context::new(&mut interp.arena);
        let field = interp.interns.intern("x");
        ctx.append(&mut interp.arena, field, Cell::integer(9)).unwrap();
        let obj_sym = interp.interns.intern("obj");
        interp.user_context.set(&mut interp.arena, obj_sym, ctx.archetype()).unwrap();

        let node = make_path(&mut interp, &[Cell::word(obj_sym), Cell::word(field)]);
        let result = eval_path_get(&mut interp, node, Specifier::Unbound).unwrap();
        assert_eq!(result.as_integer(), Some(9));
    }

    #[test]
    fn set_path_writes_a_block_index() {
        let mut interp = Interpreter::new();
        let block_node = interp.arena.alloc_series(crate::series::Series::from_cells(vec![Cell::integer(1), Cell::integer(2)]));
        interp.arena.manage(block_node);
        let blk_sym = interp.interns.intern("blk");
        interp
            .user_context
            .set(&mut interp.arena, blk_sym, Cell::block(block_node))
            .unwrap();

        let node = make_path(&mut interp, &[Cell::word(blk_sym), Cell::integer(2)]);
        eval_path_set(&mut interp, node, Specifier::Unbound, Cell::integer(99)).unwrap();

        let cells = interp.arena.series(block_node).as_cells().unwrap();
        assert_eq!(cells[1].as_integer(), Some(99));
    }

    #[test]
    fn get_path_on_unknown_field_is_a_binding_error() {
        let mut interp = Interpreter::new();
        let ctx = Context::new(&mut interp.arena);
        let obj_sym = interp.interns.intern("obj");
        interp.user_context.set(&mut interp.arena, obj_sym, ctx.archetype()).unwrap();
        let missing = interp.interns.intern("missing");

        let node = make_path(&mut interp, &[Cell::word(obj_sym), Cell::word(missing)]);
        let err = eval_path_get(&mut interp, node, Specifier::Unbound).unwrap_err();
        let Signal::Error(e) = err else { panic!("expected an EvalError") };
        assert_eq!(e.kind, crate::error::ErrorKind::Binding);
    }
}
