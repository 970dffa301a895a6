//! The evaluator: the stackable, frame-driven main loop (§4.G).
//!
//! There is no operator precedence table. An expression proceeds strictly
//! left to right: a primary value is produced, then the feed is peeked one
//! token ahead to see whether the next word is an enfix action wanting to
//! pull the value just produced in as its own left argument. `1 + 2 * 3`
//! therefore means `(1 + 2) * 3`, matching a plain left-to-right read of
//! the source rather than arithmetic's usual binding order.
//!
//! A non-deferred enfix chain is consumed greedily; at most one deferred
//! enfix call (the `then`/`else` style, which waits for that chain to
//! settle before taking its left argument) follows once the chain runs
//! dry — but only at the top of a call, not while fulfilling a `Normal`
//! argument on behalf of an outer call, where a deferred call is left
//! unconsumed for the outer call to pick up instead (`eval_one_fulfilling`).
//! Full Ren-C deferred-enfix scheduling additionally interacts with function
//! composition and `|`-barriers in ways this simplifies away.

use crate::action::DispatchOutcome;
use crate::arena::NodeId;
use crate::binding::{ResolvedBinding, Specifier, WordBinding};
use crate::cell::{Cell, CellData};
use crate::context::Context;
use crate::error::{EvalError, EvalResult, Signal};
use crate::feed::Feed;
use crate::frame::Frame;
use crate::interp::Interpreter;
use crate::symbol::Symbol;

/// Reconstructs a context handle from a bare varlist id via its companion
/// link, the way every context-bearing cell (archetype, word binding,
/// specifier) only ever carries the varlist half.
fn context_of(interp: &Interpreter, varlist: NodeId) -> Context {
    let keylist = interp
        .arena
        .series(varlist)
        .companion()
        .expect("varlist missing its keylist companion");
    Context { keylist, varlist }
}

/// Resolves a word's binding against `specifier`, falling back to the
/// interpreter's user context when unbound (standing in for the external
/// lexical binder, which would otherwise have bound it at scan time).
fn binding_varlist(interp: &Interpreter, binding: WordBinding, specifier: Specifier) -> NodeId {
    match crate::binding::resolve(binding, specifier) {
        ResolvedBinding::Varlist(node) => node,
        ResolvedBinding::Unbound => interp.user_context.varlist,
    }
}

pub(crate) fn lookup_word(interp: &Interpreter, sym: Symbol, binding: WordBinding, specifier: Specifier) -> EvalResult<Cell> {
    let varlist = binding_varlist(interp, binding, specifier);
    let ctx = context_of(interp, varlist);
    ctx.get(&interp.arena, sym).ok_or_else(|| {
        Signal::Error(EvalError::binding(format!(
            "`{}` has no value",
            interp.interns.spelling(sym)
        )))
    })
}

fn set_word(interp: &mut Interpreter, sym: Symbol, binding: WordBinding, specifier: Specifier, value: Cell) -> EvalResult<()> {
    let varlist = binding_varlist(interp, binding, specifier);
    let ctx = context_of(interp, varlist);
    ctx.set(&mut interp.arena, sym, value).map_err(Signal::Error)
}

fn apply_requotes(mut cell: Cell, requotes: u32, arena: &mut crate::arena::Arena) -> Cell {
    for _ in 0..requotes {
        cell = cell.quote(arena);
    }
    cell
}

/// Turns a dispatcher's outcome (plus the value it wrote, if any) into the
/// expression's result: an ordinary value is re-quoted by the calling
/// word's own quote depth, an invisible call preserves whatever the caller
/// already had, a reference is copied out, an immediate value skips
/// re-dispatch entirely. `Unhandled` with nothing underneath it is an
/// error: there is no dispatcher left that claims to implement the call.
fn finish_call(interp: &mut Interpreter, outcome: DispatchOutcome, value: Cell, requotes: u32, prior_out: Cell) -> EvalResult<Cell> {
    match outcome {
        DispatchOutcome::Done => Ok(apply_requotes(value, requotes, &mut interp.arena)),
        DispatchOutcome::Invisible => Ok(prior_out),
        DispatchOutcome::Reference(cell) => Ok(apply_requotes(cell.copy_value(), requotes, &mut interp.arena)),
        DispatchOutcome::Immediate(cell) => Ok(apply_requotes(cell, requotes, &mut interp.arena)),
        DispatchOutcome::Unhandled => Err(Signal::Error(EvalError::arity_type(
            "action has no dispatcher that handles this call",
        ))),
        DispatchOutcome::RedoChecked | DispatchOutcome::RedoUnchecked => {
            unreachable!("dispatch::run_dispatcher resolves redo outcomes before returning")
        }
        DispatchOutcome::Thrown(_) => unreachable!("dispatch::run_dispatcher converts Thrown to Err"),
    }
}

/// Evaluates every expression in `node` (a block or group array) in turn,
/// returning the last one's value, or `void` if the array is empty.
///
/// Pushes a bookkeeping [`Frame`] purely so frame-depth limits and trap
/// unwinding see this level of nesting; the [`Feed`] actually driving
/// evaluation is kept as a local rather than that frame's own feed, since
/// nothing here needs to resume mid-expression the way a debugger or a
/// function-body evaluator would — that level of frame resumability is an
/// external collaborator's concern, not this call's.
///
/// # Errors
/// Propagates any error or uncaught throw raised while evaluating `node`'s
/// contents, or a resource error if the frame-depth limit is exceeded.
pub fn run_array(interp: &mut Interpreter, node: NodeId, specifier: Specifier) -> EvalResult<Cell> {
    interp.limits.check_frame_depth(interp.frames.depth() + 1)?;
    let dsp_orig = interp.stack.depth();
    let placeholder = Feed::from_variadic(Vec::new(), &mut interp.arena, specifier);
    interp.frames.push(Frame::new(placeholder, dsp_orig));

    let mut feed = Feed::from_array(&mut interp.arena, node, specifier);
    let mut result = Cell::void();
    loop {
        if feed.at_end() {
            break;
        }
        match eval_one(interp, &mut feed, result) {
            Ok(value) => result = value,
            Err(signal) => {
                interp.frames.pop();
                return Err(signal);
            }
        }
    }
    interp.frames.pop();
    Ok(result)
}

/// Evaluates one full expression: a primary value, then as much of an
/// enfix chain as applies (§4.G's lookahead/dispatch/lookahead loop).
/// `prior_out` is the value the surrounding context already had
/// accumulated, handed to an invisible call landing in primary position
/// (e.g. a leading comment) so it passes through unchanged.
///
/// Always willing to take one trailing deferred enfix call once the
/// non-deferred chain runs dry. Callers fulfilling an outer call's own
/// argument go through [`eval_one_fulfilling`] instead, which leaves a
/// deferred call unconsumed for the outer frame to pick up.
pub fn eval_one(interp: &mut Interpreter, feed: &mut Feed, prior_out: Cell) -> EvalResult<Cell> {
    eval_one_inner(interp, feed, prior_out, true)
}

/// Like [`eval_one`], but for a `Normal`-class argument being fulfilled on
/// behalf of an outer call (§4.G state 3, §4.I "deferred enfix"): a
/// deferred enfix action peeked here is left in the feed rather than
/// dispatched, so it runs against the outer call's fully-fulfilled result
/// instead of this argument alone.
fn eval_one_fulfilling(interp: &mut Interpreter, feed: &mut Feed, prior_out: Cell) -> EvalResult<Cell> {
    eval_one_inner(interp, feed, prior_out, false)
}

fn eval_one_inner(interp: &mut Interpreter, feed: &mut Feed, prior_out: Cell, take_trailing_deferred: bool) -> EvalResult<Cell> {
    let mut out = eval_primary(interp, feed, prior_out)?;

    loop {
        match peek_enfix(interp, feed) {
            Some((action_node, label, requotes)) if !interp.arena.action(action_node).defers => {
                feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
                out = dispatch_enfix(interp, action_node, label, requotes, feed, out)?;
            }
            _ => break,
        }
    }

    if take_trailing_deferred {
        if let Some((action_node, label, requotes)) = peek_enfix(interp, feed) {
            feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
            out = dispatch_enfix(interp, action_node, label, requotes, feed, out)?;
        }
    }

    Ok(out)
}

/// Looks at (without permanently consuming, beyond what reading already
/// does) the feed's current token. If it's a word bound to an enfix
/// action, returns that action's node, the word used as the call's label,
/// and its quote depth.
fn peek_enfix(interp: &mut Interpreter, feed: &mut Feed) -> Option<(NodeId, Option<Symbol>, u32)> {
    if feed.at_end() {
        return None;
    }
    let CellData::Word(sym, binding) = feed.value.data else {
        return None;
    };
    let requotes = feed.value.quote_depth();
    let varlist = binding_varlist(interp, binding, feed.specifier);
    let ctx = context_of(interp, varlist);
    let value = ctx.get(&interp.arena, sym)?;
    feed.gotten = Some(value);
    let CellData::Action(action_node) = value.data else {
        return None;
    };
    if !interp.arena.action(action_node).enfix {
        return None;
    }
    Some((action_node, Some(sym), requotes))
}

fn dispatch_enfix(
    interp: &mut Interpreter,
    action_node: NodeId,
    label: Option<Symbol>,
    requotes: u32,
    feed: &mut Feed,
    left: Cell,
) -> EvalResult<Cell> {
    let (outcome, result) = crate::dispatch::call_enfix(interp, action_node, label, left, feed, eval_arg)?;
    finish_call(interp, outcome, result, requotes, left)
}

/// Bridges [`crate::dispatch::EvalOne`]'s `(interp, feed, tight)` shape to
/// the evaluator: `tight` asks for exactly one primary value with no enfix
/// lookahead (so an ordinary operator's right-hand argument doesn't
/// greedily pull in the next enfix call itself, which is what keeps
/// `1 + 2 * 3` left-to-right instead of grouping as `1 + (2 * 3)`). A
/// `Normal` argument still takes its own non-deferred enfix chain, but
/// leaves a deferred call for the outer call we're fulfilling an argument
/// for, per `eval_one_fulfilling`.
fn eval_arg(interp: &mut Interpreter, feed: &mut Feed, tight: bool) -> EvalResult<Cell> {
    if tight {
        eval_primary(interp, feed, Cell::void())
    } else {
        eval_one_fulfilling(interp, feed, Cell::void())
    }
}

fn eval_primary(interp: &mut Interpreter, feed: &mut Feed, prior_out: Cell) -> EvalResult<Cell> {
    if feed.at_end() {
        return Ok(Cell::void());
    }
    let cell = feed.value;
    let requotes = cell.quote_depth();
    match cell.data {
        CellData::Word(sym, binding) => {
            feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
            eval_word(interp, sym, binding, feed, requotes, prior_out)
        }
        CellData::SetWord(sym, binding) => {
            feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
            let value = eval_one(interp, feed, Cell::void())?;
            set_word(interp, sym, binding, feed.specifier, value.copy_value())?;
            Ok(value)
        }
        CellData::GetWord(sym, binding) => {
            feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
            let value = lookup_word(interp, sym, binding, feed.specifier)?;
            Ok(apply_requotes(value.copy_value(), requotes, &mut interp.arena))
        }
        CellData::Group(node) => {
            feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
            let specifier = feed.specifier;
            let value = run_array(interp, node, specifier)?;
            Ok(apply_requotes(value, requotes, &mut interp.arena))
        }
        CellData::Path(node) | CellData::GetPath(node) => {
            let specifier = feed.specifier;
            feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
            let value = crate::path::eval_path_get(interp, node, specifier)?;
            Ok(apply_requotes(value.copy_value(), requotes, &mut interp.arena))
        }
        CellData::SetPath(node) => {
            let specifier = feed.specifier;
            feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
            let value = eval_one(interp, feed, Cell::void())?;
            crate::path::eval_path_set(interp, node, specifier, value.copy_value())?;
            Ok(value)
        }
        _ => {
            feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
            Ok(cell.copy_value())
        }
    }
}

fn eval_word(
    interp: &mut Interpreter,
    sym: Symbol,
    binding: WordBinding,
    feed: &mut Feed,
    requotes: u32,
    prior_out: Cell,
) -> EvalResult<Cell> {
    let value = lookup_word(interp, sym, binding, feed.specifier)?;
    match value.data {
        CellData::Action(action_node) => {
            if interp.arena.action(action_node).enfix {
                return Err(Signal::Error(EvalError::arity_type(format!(
                    "`{}` is enfixed and can only be reached through lookahead, not as a primary",
                    interp.interns.spelling(sym)
                ))));
            }
            let (outcome, result) = crate::dispatch::call(interp, action_node, Some(sym), feed, eval_arg)?;
            finish_call(interp, outcome, result, requotes, prior_out)
        }
        _ => Ok(apply_requotes(value.copy_value(), requotes, &mut interp.arena)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ParamClass, ParamSpec};
    use crate::frame::Frame as RunFrame;

    fn def(interp: &mut Interpreter, name: &str, action: Action) {
        let node = interp.arena.alloc_action(action);
        interp.arena.manage(node);
        let sym = interp.interns.intern(name);
        interp
            .user_context
            .set(&mut interp.arena, sym, Cell::new(CellData::Action(node)))
            .unwrap();
    }

    fn plus_dispatcher(interp: &mut Interpreter, frame: &mut RunFrame) -> crate::action::DispatchResult {
        let a = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
        let b = interp.stack.at(frame.dsp_orig + 1).as_integer().unwrap();
        frame.out = Cell::integer(a + b);
        Ok(DispatchOutcome::Done)
    }

    fn times_dispatcher(interp: &mut Interpreter, frame: &mut RunFrame) -> crate::action::DispatchResult {
        let a = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
        let b = interp.stack.at(frame.dsp_orig + 1).as_integer().unwrap();
        frame.out = Cell::integer(a * b);
        Ok(DispatchOutcome::Done)
    }

    fn install_arithmetic(interp: &mut Interpreter) {
        let a = interp.interns.intern("a");
        let b = interp.interns.intern("b");
        // `b` is tight so an operator's right-hand argument doesn't itself
        // swallow the next enfix call in the feed (see `eval_arg`).
        def(
            interp,
            "+",
            Action::new(vec![ParamSpec::new(a, ParamClass::Normal), ParamSpec::new(b, ParamClass::Tight)], plus_dispatcher)
                .enfixed(),
        );
        def(
            interp,
            "*",
            Action::new(vec![ParamSpec::new(a, ParamClass::Normal), ParamSpec::new(b, ParamClass::Tight)], times_dispatcher)
                .enfixed(),
        );
    }

    #[test]
    fn left_to_right_enfix_has_no_precedence() {
        let mut interp = Interpreter::new();
        install_arithmetic(&mut interp);
        let result = interp.run_source("1 + 2 * 3").unwrap();
        assert_eq!(result.as_integer(), Some(9));
    }

    #[test]
    fn set_word_then_plain_word_round_trips() {
        let mut interp = Interpreter::new();
        let result = interp.run_source("x: 5 x").unwrap();
        assert_eq!(result.as_integer(), Some(5));
    }

    #[test]
    fn group_evaluates_to_its_last_expression() {
        let mut interp = Interpreter::new();
        install_arithmetic(&mut interp);
        let result = interp.run_source("(1 + 2) * 10").unwrap();
        assert_eq!(result.as_integer(), Some(30));
    }

    #[test]
    fn unbound_word_is_a_binding_error() {
        let mut interp = Interpreter::new();
        let err = interp.run_source("nonexistent").unwrap_err();
        let Signal::Error(e) = err else {
            panic!("expected an EvalError, got a throw");
        };
        assert_eq!(e.kind, crate::error::ErrorKind::Binding);
    }
}
