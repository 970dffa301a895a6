//! End-to-end scenarios exercising the evaluator and dispatch machinery
//! through their public entry points: no operator precedence, deferred
//! enfix, invisibles, quoting a call's result, path get/set, a frozen-series
//! access error, out-of-order refinement pickups, and feed equivalence.

mod common;

use loomvm::binding::Specifier;
use loomvm::cell::{Cell, CellData};
use loomvm::context::Context;
use loomvm::error::{ErrorKind, Signal};
use loomvm::feed::{Feed, VariadicItem};
use loomvm::series::Series;
use loomvm::Interpreter;

#[test]
fn no_precedence_table_reads_strictly_left_to_right() {
    let mut interp = Interpreter::new();
    common::install_arithmetic(&mut interp);

    // `1 + 2 * 3` means `(1 + 2) * 3`, not `1 + (2 * 3)`.
    let result = interp.run_source("1 + 2 * 3").unwrap();
    assert_eq!(result.as_integer(), Some(9));

    // Same rule from the other end: `2 * 3 + 4` means `(2 * 3) + 4`.
    let result = interp.run_source("2 * 3 + 4").unwrap();
    assert_eq!(result.as_integer(), Some(10));
}

#[test]
fn deferred_enfix_waits_for_the_non_deferred_chain_to_settle() {
    let mut interp = Interpreter::new();
    common::install_arithmetic(&mut interp);
    let left = interp.interns.intern("left");
    let right = interp.interns.intern("right");
    common::bind_deferred(
        &mut interp,
        "then",
        vec![
            loomvm::action::ParamSpec::new(left, loomvm::action::ParamClass::Normal),
            loomvm::action::ParamSpec::new(right, loomvm::action::ParamClass::Tight),
        ],
        common::then_dispatcher,
    );

    // `1 + 2` settles to 3 via the non-deferred `+` chain first; only once
    // that chain runs dry does the deferred `then` take 3 as its left side.
    let result = interp.run_source("1 + 2 then 99").unwrap();
    assert_eq!(result.as_integer(), Some(3 * 1000 + 99));
}

#[test]
fn deferred_enfix_is_left_for_the_outer_call_when_fulfilling_a_normal_argument() {
    let mut interp = Interpreter::new();
    common::bind_prefix(
        &mut interp,
        "inc",
        vec![loomvm::action::ParamSpec::new(
            interp.interns.intern("v"),
            loomvm::action::ParamClass::Normal,
        )],
        common::inc_dispatcher,
    );
    let left = interp.interns.intern("left");
    let right = interp.interns.intern("right");
    common::bind_deferred(
        &mut interp,
        "then",
        vec![
            loomvm::action::ParamSpec::new(left, loomvm::action::ParamClass::Normal),
            loomvm::action::ParamSpec::new(right, loomvm::action::ParamClass::Tight),
        ],
        common::then_dispatcher,
    );

    // `inc`'s single `Normal` argument is itself being fulfilled on behalf
    // of an outer call, so the nested evaluation filling that argument must
    // not swallow the deferred `then` itself: `inc` sees only `1`, produces
    // `2`, and `then` runs against that settled result afterward.
    let result = interp.run_source("inc 1 then 2").unwrap();
    assert_eq!(result.as_integer(), Some(2 * 1000 + 2));
}

#[test]
fn reaching_an_enfixed_action_directly_is_an_expression_barrier_violation() {
    let mut interp = Interpreter::new();
    common::install_arithmetic(&mut interp);

    // `+` is enfixed; encountering it as a primary (not via lookahead after
    // a left-hand value) is a barrier violation, not an ordinary prefix call.
    let err = interp.run_source("+ 1 2").unwrap_err();
    let Signal::Error(e) = err else { panic!("expected an EvalError") };
    assert_eq!(e.kind, ErrorKind::ArityType);
}

#[test]
fn invisible_call_passes_through_to_the_next_tight_add() {
    let mut interp = Interpreter::new();
    common::install_arithmetic(&mut interp);
    common::bind_prefix(&mut interp, "skip", vec![], common::skip_dispatcher);

    // `skip` contributes nothing to the result; `+` must still see `1` (the
    // value produced before `skip` ran) as its left argument, not whatever
    // `skip` itself wrote to its frame's `out`.
    let result = interp.run_source("1 skip + 2").unwrap();
    assert_eq!(result.as_integer(), Some(3));
}

#[test]
fn quoting_a_call_s_word_quotes_its_result_once_more() {
    let mut interp = Interpreter::new();
    common::bind_prefix(
        &mut interp,
        "inc",
        vec![loomvm::action::ParamSpec::new(
            interp.interns.intern("v"),
            loomvm::action::ParamClass::Normal,
        )],
        common::inc_dispatcher,
    );
    let inc_sym = interp.interns.intern("inc");

    // `'inc 5` still calls `inc`, but quotes the call's result once more
    // (frame.rs's own `requotes` doc comment), rather than treating `inc`
    // as an inert literal the way a bare quoted non-callable value is.
    let quoted_inc = Cell::word(inc_sym).quote(&mut interp.arena);
    let node = interp
        .arena
        .alloc_series(Series::from_cells(vec![quoted_inc, Cell::integer(5)]));
    interp.arena.manage(node);

    let result = loomvm::evaluator::run_array(&mut interp, node, Specifier::Unbound).unwrap();
    assert_eq!(result.as_integer(), Some(6));
    assert_eq!(result.quote_depth(), 1);
}

#[test]
fn quoting_a_plain_bound_word_quotes_its_value() {
    let mut interp = Interpreter::new();
    let x = interp.interns.intern("x");
    interp.user_context.set(&mut interp.arena, x, Cell::integer(10)).unwrap();

    let node = interp
        .arena
        .alloc_series(Series::from_cells(vec![Cell::word(x).quote(&mut interp.arena)]));
    interp.arena.manage(node);

    let result = loomvm::evaluator::run_array(&mut interp, node, Specifier::Unbound).unwrap();
    assert_eq!(result.as_integer(), Some(10));
    assert_eq!(result.quote_depth(), 1);
}

#[test]
fn object_path_get_and_set_round_trip_through_run_array() {
    let mut interp = Interpreter::new();
    let ctx = Context::new(&mut interp.arena);
    let field = interp.interns.intern("x");
    ctx.append(&mut interp.arena, field, Cell::integer(9)).unwrap();
    let obj = interp.interns.intern("obj");
    interp.user_context.set(&mut interp.arena, obj, ctx.archetype()).unwrap();

    // The scanner never produces path cells (§4.J's scope note); a path
    // only reaches the evaluator via direct arena construction.
    let get_path_node = interp
        .arena
        .alloc_series(Series::from_cells(vec![Cell::word(obj), Cell::word(field)]));
    interp.arena.manage(get_path_node);
    let get_expr = interp
        .arena
        .alloc_series(Series::from_cells(vec![Cell::new(CellData::Path(get_path_node))]));
    interp.arena.manage(get_expr);
    let result = loomvm::evaluator::run_array(&mut interp, get_expr, Specifier::Unbound).unwrap();
    assert_eq!(result.as_integer(), Some(9));

    let set_path_node = interp
        .arena
        .alloc_series(Series::from_cells(vec![Cell::word(obj), Cell::word(field)]));
    interp.arena.manage(set_path_node);
    let set_expr = interp.arena.alloc_series(Series::from_cells(vec![
        Cell::new(CellData::SetPath(set_path_node)),
        Cell::integer(42),
    ]));
    interp.arena.manage(set_expr);
    loomvm::evaluator::run_array(&mut interp, set_expr, Specifier::Unbound).unwrap();

    assert_eq!(ctx.get(&interp.arena, field), Some(Cell::integer(42)));
}

#[test]
fn set_path_into_a_frozen_block_is_an_access_error() {
    let mut interp = Interpreter::new();
    let block_node = interp
        .arena
        .alloc_series(Series::from_cells(vec![Cell::integer(1), Cell::integer(2)]));
    interp.arena.manage(block_node);
    interp.arena.series_mut(block_node).freeze();
    let blk = interp.interns.intern("blk");
    interp.user_context.set(&mut interp.arena, blk, Cell::block(block_node)).unwrap();

    let path_node = interp
        .arena
        .alloc_series(Series::from_cells(vec![Cell::word(blk), Cell::integer(1)]));
    interp.arena.manage(path_node);

    let err = loomvm::path::eval_path_set(&mut interp, path_node, Specifier::Unbound, Cell::integer(99)).unwrap_err();
    let Signal::Error(e) = err else { panic!("expected an EvalError") };
    assert_eq!(e.kind, ErrorKind::Access);
}

#[test]
fn out_of_order_refinement_pickup_matches_in_order_call() {
    let mut interp = Interpreter::new();
    common::install_tag(&mut interp);

    let in_order = interp.run_source("tag 1 /only 2").unwrap();
    assert_eq!(in_order.as_integer(), Some(112));

    let mut interp = Interpreter::new();
    common::install_tag(&mut interp);
    let out_of_order = interp.run_source("tag /only 1 2").unwrap();
    assert_eq!(out_of_order.as_integer(), Some(112));
}

#[test]
fn omitted_refinement_defaults_to_false() {
    let mut interp = Interpreter::new();
    common::install_flag(&mut interp);
    let result = interp.run_source("flag 1").unwrap();
    assert_eq!(result.as_integer(), Some(10));
}

#[test]
fn refinement_named_ahead_of_its_own_slot_still_finds_its_owner() {
    let mut interp = Interpreter::new();
    common::install_flag(&mut interp);
    let in_order = interp.run_source("flag 1 /only").unwrap();
    let out_of_order = interp.run_source("flag /only 1").unwrap();
    assert_eq!(in_order.as_integer(), Some(11));
    assert_eq!(out_of_order.as_integer(), Some(11));
}

#[test]
fn array_feed_and_variadic_fragment_feed_agree() {
    let mut interp = Interpreter::new();
    common::install_arithmetic(&mut interp);
    let via_array = interp.run_source("1 + 2 * 3").unwrap();
    assert_eq!(via_array.as_integer(), Some(9));

    let items = vec![VariadicItem::Utf8Fragment("1 + 2 * 3".to_string())];
    let mut feed = Feed::from_variadic(items, &mut interp.arena, Specifier::Unbound);
    let via_variadic = loomvm::evaluator::eval_one(&mut interp, &mut feed, Cell::void()).unwrap();
    assert_eq!(via_variadic.as_integer(), via_array.as_integer());
}

#[test]
fn variadic_cell_pointer_splices_as_ordinary_source() {
    let mut interp = Interpreter::new();
    let items = vec![VariadicItem::CellPointer(Cell::integer(7))];
    let mut feed = Feed::from_variadic(items, &mut interp.arena, Specifier::Unbound);
    let result = loomvm::evaluator::eval_one(&mut interp, &mut feed, Cell::void()).unwrap();
    assert_eq!(result.as_integer(), Some(7));
}
