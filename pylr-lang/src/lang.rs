//! Token definitions, production rules, and precedence for the toy
//! language, wired into a [`pylr::Parser`].

use crate::ast::{BinOp, Expr, FuncDef, Module, ModuleStmt, Stmt};
use once_cell::sync::Lazy;
use pylr::{
    symbols, Assoc, GrammarError, IndentLexer, LexToken, Parser, Precedence, Rule, SyntaxError,
    TokenDef, TokenDefs,
};
use std::collections::HashMap;

/// The semantic value flowing through the parse stack: shifted tokens
/// and every partially built AST layer.
#[derive(Debug, Clone)]
pub enum NodeValue {
    Token(LexToken),
    Module(Module),
    Stmts(Vec<ModuleStmt>),
    ModuleStmt(ModuleStmt),
    Suite(Vec<Stmt>),
    Stmt(Stmt),
    Expr(Expr),
}

impl From<LexToken> for NodeValue {
    fn from(token: LexToken) -> Self {
        NodeValue::Token(token)
    }
}

static RESERVED_NAMES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("def", "DEF")]));

/// Reclassifies a matched name into its reserved-word terminal.
fn reserved_name(_lexer: &IndentLexer, mut token: LexToken) -> LexToken {
    if let Some(&symbol) = RESERVED_NAMES.get(token.value.as_str()) {
        token.symbol = symbol.into();
    }
    token
}

/// The token map. Order matters: ties between patterns of equal match
/// length go to the earlier entry, so `NAME` outranks the keyword
/// patterns and the rewrite promotes reserved words afterwards.
pub fn token_defs() -> TokenDefs {
    let mut defs = TokenDefs::new();

    // Values
    defs.insert("INT".into(), TokenDef::new(r"\d+"));
    defs.insert(
        "NAME".into(),
        TokenDef::with_rewrite(r"[a-zA-Z_][a-zA-Z0-9_]*", reserved_name),
    );

    // Binary operators
    defs.insert("ADD".into(), TokenDef::new(r"\+"));
    defs.insert("SUB".into(), TokenDef::new(r"-"));
    defs.insert("MUL".into(), TokenDef::new(r"\*"));
    defs.insert("DIV".into(), TokenDef::new(r"/"));

    // Containers
    defs.insert("LPAR".into(), TokenDef::new(r"\("));
    defs.insert("RPAR".into(), TokenDef::new(r"\)"));

    // Misc
    defs.insert("DEF".into(), TokenDef::new(r"def"));
    defs.insert("NEWLINE".into(), TokenDef::new(r"\n+"));
    defs.insert("COLON".into(), TokenDef::new(r":"));

    defs
}

fn bin_expr(op: BinOp) -> impl Fn(Vec<NodeValue>) -> NodeValue {
    move |mut values| {
        let Some(NodeValue::Expr(rhs)) = values.pop() else {
            unreachable!()
        };
        values.pop();
        let Some(NodeValue::Expr(lhs)) = values.pop() else {
            unreachable!()
        };
        NodeValue::Expr(Expr::Bin {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }
}

/// The production rules. The first rule is the start rule and builds the
/// [`Module`] root when the parse is accepted.
pub fn rules() -> Vec<Rule<NodeValue>> {
    vec![
        // Entry point
        Rule::new("module", &["module_stmt_list"], |mut values| {
            let Some(NodeValue::Stmts(body)) = values.pop() else {
                unreachable!()
            };
            NodeValue::Module(Module { body })
        }),
        Rule::new("module_stmt_list", &["module_stmt"], |mut values| {
            let Some(NodeValue::ModuleStmt(stmt)) = values.pop() else {
                unreachable!()
            };
            NodeValue::Stmts(vec![stmt])
        }),
        Rule::new(
            "module_stmt_list",
            &["module_stmt_list", "module_stmt"],
            |mut values| {
                let Some(NodeValue::ModuleStmt(stmt)) = values.pop() else {
                    unreachable!()
                };
                let Some(NodeValue::Stmts(mut body)) = values.pop() else {
                    unreachable!()
                };
                body.push(stmt);
                NodeValue::Stmts(body)
            },
        ),
        Rule::passthrough("module_stmt", &["func_def"]),
        Rule::new("module_stmt", &["func_stmt"], |mut values| {
            let Some(NodeValue::Stmt(stmt)) = values.pop() else {
                unreachable!()
            };
            NodeValue::ModuleStmt(ModuleStmt::Stmt(stmt))
        }),
        Rule::new("module_stmt", &["NEWLINE"], |_| {
            NodeValue::ModuleStmt(ModuleStmt::Blank)
        }),
        // Functions
        Rule::new(
            "func_def",
            &["DEF", "NAME", "LPAR", "RPAR", "COLON", "func_suite"],
            |values| {
                let mut values = values.into_iter();
                values.next();
                let Some(NodeValue::Token(name)) = values.next() else {
                    unreachable!()
                };
                let Some(NodeValue::Suite(suite)) = values.last() else {
                    unreachable!()
                };
                NodeValue::ModuleStmt(ModuleStmt::FuncDef(FuncDef {
                    name: name.value,
                    suite,
                }))
            },
        ),
        Rule::new(
            "func_suite",
            &["NEWLINE", symbols::INDENT, "func_stmts", symbols::DEDENT],
            |mut values| {
                values.pop();
                let Some(suite @ NodeValue::Suite(_)) = values.pop() else {
                    unreachable!()
                };
                suite
            },
        ),
        Rule::new("func_stmts", &["func_stmt"], |mut values| {
            let Some(NodeValue::Stmt(stmt)) = values.pop() else {
                unreachable!()
            };
            NodeValue::Suite(vec![stmt])
        }),
        Rule::new("func_stmts", &["func_stmts", "func_stmt"], |mut values| {
            let Some(NodeValue::Stmt(stmt)) = values.pop() else {
                unreachable!()
            };
            let Some(NodeValue::Suite(mut suite)) = values.pop() else {
                unreachable!()
            };
            suite.push(stmt);
            NodeValue::Suite(suite)
        }),
        Rule::new("func_stmt", &["simple_func_stmt", "NEWLINE"], |mut values| {
            values.pop();
            match values.pop() {
                Some(stmt @ NodeValue::Stmt(_)) => stmt,
                _ => unreachable!(),
            }
        }),
        Rule::passthrough("simple_func_stmt", &["expr_stmt"]),
        // Simple statements - one line
        Rule::new("expr_stmt", &["expr"], |mut values| {
            let Some(NodeValue::Expr(expr)) = values.pop() else {
                unreachable!()
            };
            NodeValue::Stmt(Stmt::Expr(expr))
        }),
        // Binary expressions
        Rule::new("expr", &["expr", "SUB", "expr"], bin_expr(BinOp::Sub)),
        Rule::new("expr", &["expr", "ADD", "expr"], bin_expr(BinOp::Add)),
        Rule::new("expr", &["expr", "MUL", "expr"], bin_expr(BinOp::Mul)),
        Rule::new("expr", &["expr", "DIV", "expr"], bin_expr(BinOp::Div)),
        // Atoms
        Rule::new("expr", &["NAME"], |mut values| {
            let Some(NodeValue::Token(token)) = values.pop() else {
                unreachable!()
            };
            NodeValue::Expr(Expr::Name(token.value))
        }),
        Rule::new("expr", &["INT"], |mut values| {
            let Some(NodeValue::Token(token)) = values.pop() else {
                unreachable!()
            };
            NodeValue::Expr(Expr::Int(token.value.parse().unwrap_or_default()))
        }),
    ]
}

/// Addition and subtraction bind loosest and group left; multiplication
/// and division bind tighter and group right.
pub fn precedence() -> Precedence {
    Precedence::new()
        .level(Assoc::Left, &["ADD", "SUB"])
        .level(Assoc::Right, &["MUL", "DIV"])
}

/// Builds the language parser.
pub fn lang_parser() -> Result<Parser<NodeValue>, GrammarError> {
    let lexer = IndentLexer::new(token_defs())?;
    Parser::new(lexer, rules(), precedence())
}

/// Parses `source` into its [`Module`] root.
pub fn parse_module(parser: &mut Parser<NodeValue>, source: &str) -> Result<Module, SyntaxError> {
    match parser.parse(source)? {
        NodeValue::Module(module) => Ok(module),
        _ => Err(SyntaxError::Internal("start rule built a non-module value")),
    }
}
