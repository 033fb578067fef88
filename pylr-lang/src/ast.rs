//! The abstract syntax tree of the toy language.
//!
//! Nodes are plain tagged variants; reducers build them bottom-up and
//! ownership flows into the enclosing node, up to the [`Module`] root.
//! `Display` renders the line-oriented form the dumper prints.

use smartstring::alias::String;
use std::fmt;

/// The root of a parsed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub body: Vec<ModuleStmt>,
}

/// One top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleStmt {
    FuncDef(FuncDef),
    Stmt(Stmt),
    /// A line holding nothing but its newline.
    Blank,
}

/// A function definition and its indented suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDef {
    pub name: String,
    pub suite: Vec<Stmt>,
}

/// A simple one-line statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Name(String),
    Bin {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

impl Module {
    /// The rendered source lines of every statement in the body.
    pub fn lines(&self) -> Vec<std::string::String> {
        let mut lines = Vec::new();
        for stmt in &self.body {
            match stmt {
                ModuleStmt::FuncDef(def) => lines.extend(def.lines()),
                ModuleStmt::Stmt(stmt) => lines.push(stmt.to_string()),
                ModuleStmt::Blank => lines.push(std::string::String::new()),
            }
        }
        lines
    }
}

impl FuncDef {
    pub fn lines(&self) -> Vec<std::string::String> {
        let mut lines = vec![format!("def {}():", self.name)];
        for stmt in &self.suite {
            lines.push(format!("    {}", stmt));
        }
        lines
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Expr(expr) => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(value) => write!(f, "{}", value),
            Expr::Name(name) => write!(f, "{}", name),
            Expr::Bin { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
        }
    }
}
