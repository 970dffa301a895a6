#[cfg(not(codspeed))]
use criterion::{Criterion, black_box, criterion_group, criterion_main};
#[cfg(codspeed)]
use codspeed_criterion_compat::{Criterion, black_box, criterion_group, criterion_main};

use loomvm::action::{Action, DispatchOutcome, DispatchResult, ParamClass, ParamSpec};
use loomvm::binding::Specifier;
use loomvm::cell::{Cell, CellData};
use loomvm::frame::Frame;
use loomvm::series::Series;
use loomvm::{Context, Interpreter};

fn plus_dispatcher(interp: &mut Interpreter, frame: &mut Frame) -> DispatchResult {
    let a = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
    let b = interp.stack.at(frame.dsp_orig + 1).as_integer().unwrap();
    frame.out = Cell::integer(a + b);
    Ok(DispatchOutcome::Done)
}

fn times_dispatcher(interp: &mut Interpreter, frame: &mut Frame) -> DispatchResult {
    let a = interp.stack.at(frame.dsp_orig).as_integer().unwrap();
    let b = interp.stack.at(frame.dsp_orig + 1).as_integer().unwrap();
    frame.out = Cell::integer(a * b);
    Ok(DispatchOutcome::Done)
}

/// A fresh interpreter with `+` and `*` bound as enfix arithmetic, the
/// smallest action set that exercises a real enfix dispatch chain.
fn bind_enfix(interp: &mut Interpreter, name: &str, dispatcher: loomvm::action::Dispatcher) {
    let a = interp.interns.intern("a");
    let b = interp.interns.intern("b");
    let action = Action::new(
        vec![ParamSpec::new(a, ParamClass::Normal), ParamSpec::new(b, ParamClass::Tight)],
        dispatcher,
    )
    .enfixed();
    let node = interp.arena.alloc_action(action);
    interp.arena.manage(node);
    let sym = interp.interns.intern(name);
    interp
        .user_context
        .set(&mut interp.arena, sym, Cell::new(CellData::Action(node)))
        .unwrap();
}

fn arithmetic_interp() -> Interpreter {
    let mut interp = Interpreter::new();
    bind_enfix(&mut interp, "+", plus_dispatcher);
    bind_enfix(&mut interp, "*", times_dispatcher);
    interp
}

fn bench_enfix_chain(c: &mut Criterion) {
    c.bench_function("enfix_chain__1+2*3", |b| {
        b.iter_batched(
            arithmetic_interp,
            |mut interp| {
                let result = interp.run_source("1 + 2 * 3 + 4 * 5").unwrap();
                black_box(result);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_set_word_lookup(c: &mut Criterion) {
    c.bench_function("set_word_then_lookup", |b| {
        b.iter_batched(
            Interpreter::new,
            |mut interp| {
                let result = interp.run_source("x: 5 x").unwrap();
                black_box(result);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_object_field_path(c: &mut Criterion) {
    c.bench_function("get_path_object_field", |b| {
        b.iter_batched(
            || {
                let mut interp = Interpreter::new();
                let ctx = Context::new(&mut interp.arena);
                let field = interp.interns.intern("x");
                ctx.append(&mut interp.arena, field, Cell::integer(9)).unwrap();
                let obj = interp.interns.intern("obj");
                interp.user_context.set(&mut interp.arena, obj, ctx.archetype()).unwrap();
                let path_node = interp
                    .arena
                    .alloc_series(Series::from_cells(vec![Cell::word(obj), Cell::word(field)]));
                interp.arena.manage(path_node);
                (interp, path_node)
            },
            |(mut interp, path_node)| {
                let result = loomvm::path::eval_path_get(&mut interp, path_node, Specifier::Unbound).unwrap();
                black_box(result);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

#[cfg(not(codspeed))]
criterion_group!(benches, bench_enfix_chain, bench_set_word_lookup, bench_object_field_path);
#[cfg(codspeed)]
criterion_group!(benches, bench_enfix_chain, bench_set_word_lookup, bench_object_field_path);

criterion_main!(benches);
