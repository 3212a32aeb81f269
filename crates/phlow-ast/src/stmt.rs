//! Statement nodes.

use crate::expr::{Expr, FnParam};

/// A statement, its starting line, and any docblock type comment
/// attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
    /// `@var` docblock immediately above the statement, if any.
    pub doc: Option<TypeComment>,
}

/// Parsed `@var` annotation: a type string and an optional variable name.
///
/// `/** @var Foo $bar */` carries both; `/** @var Foo */` applies to the
/// assignment it precedes.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeComment {
    pub ty: String,
    pub var: Option<String>,
}

/// `if` with its full chain of `elseif` arms and optional `else`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then: Vec<Stmt>,
    pub elseifs: Vec<ElseIf>,
    pub otherwise: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// One `case` arm; `cond` is `None` for `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub cond: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// One `catch` clause. `class` is `None` when the source had no usable
/// class name.
#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    pub class: Option<crate::name::Name>,
    pub var: String,
    pub body: Vec<Stmt>,
    pub line: u32,
}

/// `const NAME = value;` item, also used for class constants.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstItem {
    pub name: String,
    pub value: Expr,
}

/// One variable of a `static $a = ...;` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticVar {
    pub name: String,
    pub default: Option<Expr>,
}

/// A function declared in statement position, including nested ones.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<FnParam>,
    pub return_type: Option<String>,
    pub body: Vec<Stmt>,
}

/// One import of a `use` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UseItem {
    pub path: String,
    pub alias: Option<String>,
}

/// One property of a class-level property declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyItem {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    If(IfStmt),
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Expr>,
        cond: Vec<Expr>,
        step: Vec<Expr>,
        body: Vec<Stmt>,
    },
    /// `foreach (source as $key => $value)`; `key_var` is `None` without
    /// the key form.
    Foreach {
        source: Expr,
        key_var: Option<String>,
        value_var: String,
        body: Vec<Stmt>,
    },
    Switch {
        cond: Expr,
        cases: Vec<Case>,
    },
    TryCatch {
        body: Vec<Stmt>,
        catches: Vec<Catch>,
        finally: Option<Vec<Stmt>>,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Break,
    Continue,
    Echo(Vec<Expr>),
    Const(Vec<ConstItem>),
    /// `static $a = 1, $b;` inside a function body.
    StaticVars(Vec<StaticVar>),
    /// `global $a, $b;`.
    Global(Vec<String>),
    Unset(Vec<Expr>),
    FunctionDecl(FunctionDecl),
    Use(Vec<UseItem>),
    /// `namespace Foo;` or a braced namespace block.
    Namespace {
        name: Option<String>,
        body: Vec<Stmt>,
    },
    /// Class-level `public $a = 1, $b;` forwarded by a class walker.
    PropertyDecl(Vec<PropertyItem>),
    ClassConstDecl(Vec<ConstItem>),
    /// Empty statement.
    Nop,
    /// Literal output between `?>` and `<?php`.
    InlineHtml(String),
}

impl Stmt {
    pub fn new(kind: StmtKind, line: u32) -> Self {
        Stmt {
            kind,
            line,
            doc: None,
        }
    }

    pub fn with_doc(mut self, doc: TypeComment) -> Self {
        self.doc = Some(doc);
        self
    }

    pub fn expr(expr: Expr) -> Self {
        let line = expr.line;
        Stmt::new(StmtKind::Expr(expr), line)
    }

    pub fn if_then(cond: Expr, then: Vec<Stmt>, line: u32) -> Self {
        Stmt::new(
            StmtKind::If(IfStmt {
                cond,
                then,
                elseifs: Vec::new(),
                otherwise: None,
            }),
            line,
        )
    }

    pub fn if_else(cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>, line: u32) -> Self {
        Stmt::new(
            StmtKind::If(IfStmt {
                cond,
                then,
                elseifs: Vec::new(),
                otherwise: Some(otherwise),
            }),
            line,
        )
    }

    pub fn while_loop(cond: Expr, body: Vec<Stmt>, line: u32) -> Self {
        Stmt::new(StmtKind::While { cond, body }, line)
    }

    pub fn ret(value: Expr, line: u32) -> Self {
        Stmt::new(StmtKind::Return(Some(value)), line)
    }

    pub fn ret_void(line: u32) -> Self {
        Stmt::new(StmtKind::Return(None), line)
    }

    pub fn throw(value: Expr, line: u32) -> Self {
        Stmt::new(StmtKind::Throw(value), line)
    }

    pub fn brk(line: u32) -> Self {
        Stmt::new(StmtKind::Break, line)
    }

    pub fn cont(line: u32) -> Self {
        Stmt::new(StmtKind::Continue, line)
    }

    pub fn nop(line: u32) -> Self {
        Stmt::new(StmtKind::Nop, line)
    }
}
