//! Shared fixtures for the integration tests: action constructors and a
//! handful of toy dispatchers, in the same style as `evaluator.rs`'s own
//! test module and `evaluator_bench.rs`'s `bind_enfix` helper.
#![allow(dead_code)]

use loomvm::action::{Action, DispatchResult, ParamClass, ParamSpec};
use loomvm::cell::{Cell, CellData};
use loomvm::frame::Frame;
use loomvm::Interpreter;

pub use loomvm::action::DispatchOutcome;

type Dispatch = loomvm::action::Dispatcher;

fn install(interp: &mut Interpreter, name: &str, action: Action) {
    let node = interp.arena.alloc_action(action);
    interp.arena.manage(node);
    let sym = interp.interns.intern(name);
    interp
        .user_context
        .set(&mut interp.arena, sym, Cell::new(CellData::Action(node)))
        .unwrap();
}

pub fn bind_prefix(interp: &mut Interpreter, name: &str, params: Vec<ParamSpec>, dispatcher: Dispatch) {
    install(interp, name, Action::new(params, dispatcher));
}

pub fn bind_enfix(interp: &mut Interpreter, name: &str, params: Vec<ParamSpec>, dispatcher: Dispatch) {
    install(interp, name, Action::new(params, dispatcher).enfixed());
}

pub fn bind_deferred(interp: &mut Interpreter, name: &str, params: Vec<ParamSpec>, dispatcher: Dispatch) {
    install(interp, name, Action::new(params, dispatcher).deferred());
}

/// Installs `+` and `*` as left-to-right, tight-right-hand enfix arithmetic —
/// the smallest action set that exercises a real enfix chain with no
/// precedence table.
pub fn install_arithmetic(interp: &mut Interpreter) {
    let a = interp.interns.intern("a");
    let b = interp.interns.intern("b");
    bind_enfix(
        interp,
        "+",
        vec![ParamSpec::new(a, ParamClass::Normal), ParamSpec::new(b, ParamClass::Tight)],
        plus_dispatcher,
    );
    let a2 = interp.interns.intern("a");
    let b2 = interp.interns.intern("b");
    bind_enfix(
        interp,
        "*",
        vec![ParamSpec::new(a2, ParamClass::Normal), ParamSpec::new(b2, ParamClass::Tight)],
        times_dispatcher,
    );
}

pub fn plus_dispatcher(interp: &mut Interpreter, frame: &mut Frame) -> DispatchResult {
    let a = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
    let b = interp.stack.at(frame.dsp_orig + 1).as_integer().unwrap();
    frame.out = Cell::integer(a + b);
    Ok(DispatchOutcome::Done)
}

pub fn times_dispatcher(interp: &mut Interpreter, frame: &mut Frame) -> DispatchResult {
    let a = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
    let b = interp.stack.at(frame.dsp_orig + 1).as_integer().unwrap();
    frame.out = Cell::integer(a * b);
    Ok(DispatchOutcome::Done)
}

/// A deferred enfix action that ignores its left argument and returns its
/// right one, the way `then`/`else` pass through a branch's value.
pub fn then_dispatcher(interp: &mut Interpreter, frame: &mut Frame) -> DispatchResult {
    let left = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
    let right = interp.stack.at(frame.dsp_orig + 1).as_integer().unwrap();
    frame.out = Cell::integer(left * 1000 + right);
    Ok(DispatchOutcome::Done)
}

/// Takes no arguments and contributes nothing to the expression's result —
/// the invisible-call fixture (a no-op comment-like action).
pub fn skip_dispatcher(_interp: &mut Interpreter, frame: &mut Frame) -> DispatchResult {
    frame.out = Cell::blank();
    Ok(DispatchOutcome::Invisible)
}

pub fn inc_dispatcher(interp: &mut Interpreter, frame: &mut Frame) -> DispatchResult {
    let v = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
    frame.out = Cell::integer(v + 1);
    Ok(DispatchOutcome::Done)
}

/// `tag x /only y`: `x`/`y` are hard-quoted, `only` is a refinement whose
/// presence folds into the result so a test can see it was actually set.
pub fn tag_dispatcher(interp: &mut Interpreter, frame: &mut Frame) -> DispatchResult {
    let x = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
    let only = interp.stack.at(frame.dsp_orig + 1).as_logic().unwrap();
    let y = interp.stack.at(frame.dsp_orig + 2).as_integer().unwrap();
    frame.out = Cell::integer(x * 100 + i64::from(only) * 10 + y);
    Ok(DispatchOutcome::Done)
}

pub fn install_tag(interp: &mut Interpreter) {
    let x = interp.interns.intern("x");
    let only = interp.interns.intern("only");
    let y = interp.interns.intern("y");
    bind_prefix(
        interp,
        "tag",
        vec![
            ParamSpec::new(x, ParamClass::HardQuote),
            ParamSpec::new(only, ParamClass::Refinement),
            ParamSpec::new(y, ParamClass::HardQuote),
        ],
        tag_dispatcher,
    );
}

/// `flag x /only`: a refinement with no trailing argument of its own, so
/// `only`'s presence doesn't gate any parameter past it the way `tag`'s `y`
/// does. Omitting `/only` entirely is valid here (it just defaults to false).
pub fn flag_dispatcher(interp: &mut Interpreter, frame: &mut Frame) -> DispatchResult {
    let x = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
    let only = interp.stack.at(frame.dsp_orig + 1).as_logic().unwrap();
    frame.out = Cell::integer(x * 10 + i64::from(only));
    Ok(DispatchOutcome::Done)
}

pub fn install_flag(interp: &mut Interpreter) {
    let x = interp.interns.intern("x");
    let only = interp.interns.intern("only");
    bind_prefix(
        interp,
        "flag",
        vec![ParamSpec::new(x, ParamClass::HardQuote), ParamSpec::new(only, ParamClass::Refinement)],
        flag_dispatcher,
    );
}
