//! A small Python-like toy language: function definitions containing
//! arithmetic expression statements, parsed by a runtime-built SLR
//! table over an indentation-aware token stream.

pub mod ast;
pub mod lang;

pub use crate::ast::{BinOp, Expr, FuncDef, Module, ModuleStmt, Stmt};
pub use crate::lang::{lang_parser, parse_module, precedence, rules, token_defs, NodeValue};
