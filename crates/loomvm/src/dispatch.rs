//! Action dispatch's dynamic half: argument fulfillment, refinements and
//! their out-of-order pickups, and the call/return mechanics (§4.I). Static
//! shape (parameter classes, the dispatcher contract) lives in
//! [`crate::action`].
//!
//! Fulfillment walks the caller's feed once, left to right. A refinement
//! encountered while the cursor is still at or before its declared position
//! is fulfilled in place; one encountered after the cursor has already
//! passed its owned argument slots is deferred to a second "pickups" pass,
//! which drains the remaining feed tokens — in the order the refinements
//! were invoked — into the slots that were skipped the first time.

use crate::action::{DispatchOutcome, ParamClass, ParamSpec};
use crate::arena::NodeId;
use crate::cell::{Cell, CellData};
use crate::error::{EvalError, EvalResult, Signal};
use crate::feed::Feed;
use crate::frame::Frame;
use crate::interp::Interpreter;
use crate::symbol::{Interns, Symbol};

/// A callback into the evaluator for `Normal`/`Tight` parameters. The `bool`
/// is `tight`: when true, evaluate exactly one primary value with no enfix
/// lookahead (so an enfix operator's own right-hand argument doesn't
/// greedily swallow the next enfix call in the feed); when false, run a
/// full sub-expression including its own lookahead. Passed in rather than
/// called directly to avoid a circular module dependency between `dispatch`
/// and `evaluator`.
pub type EvalOne<'a> = dyn FnMut(&mut Interpreter, &mut Feed, bool) -> EvalResult<Cell> + 'a;

/// Which refinement (if any) owns a given parameter slot: the refinement's
/// own trailing arguments belong to it and are only fulfilled while it is
/// present.
fn owners(params: &[ParamSpec]) -> Vec<Option<usize>> {
    let mut owner = vec![None; params.len()];
    let mut current: Option<usize> = None;
    for (i, p) in params.iter().enumerate() {
        match p.class {
            ParamClass::Refinement => current = Some(i),
            ParamClass::Local | ParamClass::Return => current = None,
            _ => owner[i] = current,
        }
    }
    owner
}

fn refinement_symbol(interns: &Interns, name: Symbol) -> bool {
    interns.spelling(name).starts_with('/')
}

fn find_refinement(params: &[ParamSpec], interns: &Interns, word: Symbol) -> Option<usize> {
    let spelling = interns.spelling(word);
    params
        .iter()
        .position(|p| matches!(p.class, ParamClass::Refinement) && format!("/{}", interns.spelling(p.name)) == spelling)
}

/// Reads one argument value for `param` out of `feed`, applying its quoting
/// class.
///
/// # Errors
/// Returns an arity/type error if the feed ends on a non-endable parameter.
fn fulfill_one(param: &ParamSpec, feed: &mut Feed, interp: &mut Interpreter, eval_one: &mut EvalOne<'_>) -> EvalResult<Cell> {
    if feed.at_end() {
        if param.is_endable() {
            return Ok(Cell::null());
        }
        return Err(Signal::Error(EvalError::arity_type(format!(
            "end of input while filling parameter `{}`",
            interp.interns.spelling(param.name)
        ))));
    }
    match param.class {
        ParamClass::HardQuote => {
            let cell = feed.value;
            feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
            Ok(cell)
        }
        ParamClass::SoftQuote => {
            if let CellData::Group(node) = feed.value.data {
                let specifier = feed.specifier;
                feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
                crate::evaluator::run_array(interp, node, specifier)
            } else {
                let cell = feed.value;
                feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
                Ok(cell)
            }
        }
        ParamClass::Normal => eval_one(interp, feed, false),
        ParamClass::Tight => eval_one(interp, feed, true),
        ParamClass::Local | ParamClass::Return | ParamClass::Refinement => unreachable!(
            "fulfill_one is never called for a local/return/refinement slot directly"
        ),
    }
}

/// Fulfills every parameter of an action (described by `params`/`specialized`,
/// copied out of its [`crate::action::Action`] by the caller to sidestep an
/// arena borrow held across dispatcher-internal evaluation). Consumes values
/// from `feed`; returns the fulfilled argument vector, parallel to `params`.
///
/// # Errors
/// Propagates any error or throw raised while evaluating an argument.
pub fn fulfill(
    params: &[ParamSpec],
    specialized: &[Option<Cell>],
    feed: &mut Feed,
    interp: &mut Interpreter,
    eval_one: &mut EvalOne<'_>,
) -> EvalResult<Vec<Cell>> {
    let n = params.len();
    let owner = owners(params);
    let mut args: Vec<Cell> = vec![Cell::blank(); n];
    let mut filled = vec![false; n];
    let mut present = vec![false; n];
    let mut pending: Vec<usize> = Vec::new();

    for (i, spec) in specialized.iter().enumerate() {
        if let Some(value) = spec {
            args[i] = *value;
            filled[i] = true;
        }
    }

    let mut cursor = 0usize;
    let is_active = |i: usize, owner: &[Option<usize>], present: &[bool], pending: &[usize]| -> bool {
        match owner[i] {
            None => true,
            Some(r) => present[r] && !pending.contains(&r),
        }
    };

    'pass1: loop {
        while cursor < n
            && (filled[cursor] || matches!(params[cursor].class, ParamClass::Local | ParamClass::Return | ParamClass::Refinement) || !is_active(cursor, &owner, &present, &pending))
        {
            if matches!(params[cursor].class, ParamClass::Local | ParamClass::Return) {
                filled[cursor] = true;
            }
            cursor += 1;
        }
        if cursor >= n {
            break 'pass1;
        }
        // A refinement word can appear regardless of where `cursor` is —
        // its owned args aren't necessarily the next open slot. Can't read
        // one off an exhausted feed, so this only applies while there's a
        // value left to look at; an exhausted feed falls straight through
        // to `fulfill_one`, which is what actually decides whether the
        // still-open slot at `cursor` is allowed to end here.
        if !feed.at_end() {
            if let CellData::Word(word, _) = feed.value.data {
                if refinement_symbol(&interp.interns, word) {
                    if let Some(r) = find_refinement(params, &interp.interns, word) {
                        feed.fetch_next_with_interns(&mut interp.arena, &mut interp.interns);
                        present[r] = true;
                        filled[r] = true;
                        args[r] = Cell::logic(true);
                        if r > cursor {
                            // Its own slot hasn't been visited yet: nothing to
                            // defer, cursor will reach its owned args in order.
                        } else {
                            pending.push(r);
                        }
                        continue;
                    }
                }
            }
        }
        let value = fulfill_one(&params[cursor], feed, interp, eval_one)?;
        args[cursor] = value;
        filled[cursor] = true;
        cursor += 1;
    }

    for r in pending {
        for i in 0..n {
            if owner[i] == Some(r) && !filled[i] {
                let value = fulfill_one(&params[i], feed, interp, eval_one)?;
                args[i] = value;
                filled[i] = true;
            }
        }
    }

    for (i, spec) in params.iter().enumerate() {
        if !filled[i] {
            args[i] = match spec.class {
                ParamClass::Refinement => Cell::logic(false),
                _ => Cell::blank(),
            };
        }
    }

    Ok(args)
}

/// Pushes `args` onto the data stack under a fresh bookkeeping frame and
/// runs `action_node`'s dispatcher, looping on `RedoChecked`/`RedoUnchecked`
/// and falling back to the specialty action underneath on `Unhandled`.
/// `Thrown` is converted to the corresponding `Err` here rather than handed
/// back as an outcome, since nothing past this point should see it as
/// anything but unwinding control flow.
fn run_dispatcher(
    interp: &mut Interpreter,
    action_node: NodeId,
    label: Option<Symbol>,
    args: Vec<Cell>,
    feed_specifier: crate::binding::Specifier,
) -> EvalResult<(DispatchOutcome, Cell)> {
    let dsp_orig = interp.stack.depth();
    for arg in &args {
        interp.stack.push(*arg);
    }
    let placeholder = Feed::from_variadic(Vec::new(), &mut interp.arena, feed_specifier);
    let mut frame = Frame::new(placeholder, dsp_orig);
    frame.original = Some(action_node);
    frame.opt_label = label;
    interp.frames.push(frame);

    let outcome_result = loop {
        let dispatcher = interp.arena.action(action_node).dispatcher;
        let result = {
            let frame_ref = interp.frames.current_mut().expect("just pushed");
            dispatcher(interp, frame_ref)
        };
        match result {
            Ok(DispatchOutcome::RedoChecked | DispatchOutcome::RedoUnchecked) => continue,
            other => break other,
        }
    };
    let popped = interp.frames.pop();
    interp.stack.drop_to(dsp_orig);

    match outcome_result? {
        DispatchOutcome::Thrown(thrown) => Err(Signal::Thrown(thrown)),
        DispatchOutcome::Unhandled => match interp.arena.action(action_node).specialty {
            Some(specialty) => run_dispatcher(interp, specialty, label, args, feed_specifier),
            None => {
                tracing::warn!(target: "loomvm.dispatch", ?label, "unhandled with no specialty to fall back to");
                Ok((DispatchOutcome::Unhandled, popped.out))
            }
        },
        other => Ok((other, popped.out)),
    }
}

/// Fulfills `action_node`'s parameters from `feed` and runs its dispatcher,
/// producing the call's outcome and the value (if any) it wrote to `out`.
/// The caller re-quotes an ordinary result per the calling word's own quote
/// depth and interprets `Invisible`/`Reference`/`Immediate`; `dispatch::call`
/// only runs fulfillment and dispatch.
///
/// # Errors
/// Propagates any error, throw, or resource-limit failure encountered while
/// fulfilling arguments or running the dispatcher.
pub fn call(
    interp: &mut Interpreter,
    action_node: NodeId,
    label: Option<Symbol>,
    feed: &mut Feed,
    mut eval_one: impl FnMut(&mut Interpreter, &mut Feed, bool) -> EvalResult<Cell>,
) -> EvalResult<(DispatchOutcome, Cell)> {
    interp.limits.check_frame_depth(interp.frames.depth() + 1)?;
    let (params, specialized) = {
        let action = interp.arena.action(action_node);
        (action.params.clone(), action.specialized.clone())
    };
    let args = fulfill(&params, &specialized, feed, interp, &mut eval_one)?;
    let specifier = feed.specifier;
    run_dispatcher(interp, action_node, label, args, specifier)
}

/// Like [`call`], but for an enfix dispatch (§4.G): `left` is the
/// already-evaluated value standing to the word's left, and pre-fills the
/// action's first parameter slot the way a specialization would instead of
/// being read off `feed`.
///
/// # Errors
/// Same as [`call`].
pub fn call_enfix(
    interp: &mut Interpreter,
    action_node: NodeId,
    label: Option<Symbol>,
    left: Cell,
    feed: &mut Feed,
    mut eval_one: impl FnMut(&mut Interpreter, &mut Feed, bool) -> EvalResult<Cell>,
) -> EvalResult<(DispatchOutcome, Cell)> {
    interp.limits.check_frame_depth(interp.frames.depth() + 1)?;
    let (params, mut specialized) = {
        let action = interp.arena.action(action_node);
        (action.params.clone(), action.specialized.clone())
    };
    if let Some(slot) = specialized.first_mut() {
        *slot = Some(left);
    }
    let args = fulfill(&params, &specialized, feed, interp, &mut eval_one)?;
    let specifier = feed.specifier;
    run_dispatcher(interp, action_node, label, args, specifier)
}
