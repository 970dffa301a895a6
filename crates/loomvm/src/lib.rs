#![doc = include_str!("../../../README.md")]
#![expect(clippy::module_name_repetitions, reason = "NodeId/Interns/etc. read fine repeated at call sites")]
#![expect(clippy::missing_errors_doc, reason = "Result-returning fns are self-explanatory from EvalError's taxonomy")]

pub mod action;
pub mod arena;
pub mod binding;
pub mod cell;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod feed;
pub mod frame;
pub mod gc;
pub mod interp;
pub mod path;
pub mod reader;
pub mod series;
pub mod stack;
pub mod symbol;

pub use crate::{
    action::{Action, DispatchOutcome, ParamClass, ParamSpec},
    arena::{Arena, NodeId},
    binding::{Specifier, WordBinding},
    cell::{Cell, CellData, Kind},
    context::Context,
    error::{ErrorKind, EvalError, EvalResult, Signal, Thrown},
    interp::Interpreter,
    symbol::{Interns, Symbol},
};
