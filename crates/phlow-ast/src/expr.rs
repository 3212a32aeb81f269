//! Expression nodes.

use crate::name::Name;
use crate::stmt::Stmt;

/// An expression with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

/// Binary operators the checker distinguishes.
///
/// Short-circuit and comparison operators drive narrowing; the rest are kept
/// so arbitrary arithmetic recurses without a catch-all node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `&&` - narrows its right operand by the left's assertions.
    And,
    /// `||` - narrows its right operand by the negated left assertions.
    Or,
    /// `.` string concatenation.
    Concat,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Greater,
    GreaterOrEqual,
    Smaller,
    SmallerOrEqual,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Cast target kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
}

/// A member name after `->`: fixed in source or computed at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberName {
    Fixed(String),
    Dynamic(Box<Expr>),
}

/// Callee of a function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Name(Name),
    Dynamic(Box<Expr>),
}

/// Class position of `new`, `instanceof`, and static access.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    Name(Name),
    Dynamic(Box<Expr>),
}

/// One element of an array literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
}

/// Declared parameter of a function, method, or closure.
#[derive(Debug, Clone, PartialEq)]
pub struct FnParam {
    pub name: String,
    /// Declared or documented type, unparsed (`"array"`, `"Foo|null"`).
    pub ty: Option<String>,
    pub by_ref: bool,
}

/// One captured variable in a closure `use (...)` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureUse {
    pub var: String,
    pub by_ref: bool,
}

/// Closure literal: parameters, captures, body.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub params: Vec<FnParam>,
    pub uses: Vec<ClosureUse>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `$name`. The sigil is not stored.
    Variable(String),
    /// `target = value`.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Compound assignment (`+=`, `.=`, ...). The target is read, not rebound.
    AssignOp {
        target: Box<Expr>,
        op: BinOp,
        value: Box<Expr>,
    },
    /// `target = &value` - both sides degrade to unknown types.
    AssignRef {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `list($a, , $b)` destructuring target. Holes are `None`.
    List(Vec<Option<Expr>>),
    /// `target[dim]`; `target[]` when `dim` is `None`.
    ArrayDimFetch {
        target: Box<Expr>,
        dim: Option<Box<Expr>>,
    },
    /// `target->name`.
    PropertyFetch {
        target: Box<Expr>,
        name: MemberName,
    },
    /// `Class::$name`.
    StaticPropertyFetch {
        class: ClassRef,
        name: String,
    },
    /// `target->name(args)`.
    MethodCall {
        target: Box<Expr>,
        name: MemberName,
        args: Vec<Expr>,
    },
    /// `Class::name(args)`.
    StaticCall {
        class: ClassRef,
        name: String,
        args: Vec<Expr>,
    },
    /// `name(args)`.
    FuncCall {
        name: Callee,
        args: Vec<Expr>,
    },
    /// `new Class(args)`.
    New {
        class: ClassRef,
        args: Vec<Expr>,
    },
    /// Bare constant: `null`, `true`, `MY_CONST`.
    ConstFetch(Name),
    /// `Class::CONST`.
    ClassConstFetch {
        class: ClassRef,
        name: String,
    },
    Int(i64),
    Float(f64),
    Str(String),
    /// Double-quoted string with interpolated parts.
    InterpolatedString(Vec<Expr>),
    /// `__FILE__`, `__LINE__`, and friends. Inert for flow purposes.
    MagicConst,
    Array(Vec<ArrayItem>),
    /// `cond ? then : otherwise`; `then` is `None` for the short form.
    Ternary {
        cond: Box<Expr>,
        then: Option<Box<Expr>>,
        otherwise: Box<Expr>,
    },
    BooleanNot(Box<Expr>),
    BitwiseNot(Box<Expr>),
    UnaryMinus(Box<Expr>),
    UnaryPlus(Box<Expr>),
    /// `@expr` error suppression.
    Suppress(Box<Expr>),
    PreInc(Box<Expr>),
    PreDec(Box<Expr>),
    PostInc(Box<Expr>),
    PostDec(Box<Expr>),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `target instanceof Class`.
    Instanceof {
        target: Box<Expr>,
        class: ClassRef,
    },
    Cast {
        kind: CastKind,
        value: Box<Expr>,
    },
    /// `isset($a, $b->c)`.
    Isset(Vec<Expr>),
    /// `empty(expr)`.
    Empty(Box<Expr>),
    Clone(Box<Expr>),
    Closure(Box<Closure>),
    /// `exit` / `die`, with an optional status expression.
    Exit(Option<Box<Expr>>),
    Eval(Box<Expr>),
    /// Backtick execution; parts as in an interpolated string.
    ShellExec(Vec<Expr>),
    Print(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Expr { kind, line }
    }

    // Convenience constructors for hosts and tests that build trees by hand.

    pub fn var(name: impl Into<String>, line: u32) -> Self {
        Expr::new(ExprKind::Variable(name.into()), line)
    }

    pub fn str_lit(value: impl Into<String>, line: u32) -> Self {
        Expr::new(ExprKind::Str(value.into()), line)
    }

    pub fn int(value: i64, line: u32) -> Self {
        Expr::new(ExprKind::Int(value), line)
    }

    pub fn null(line: u32) -> Self {
        Expr::new(ExprKind::ConstFetch(Name::new("null")), line)
    }

    pub fn true_(line: u32) -> Self {
        Expr::new(ExprKind::ConstFetch(Name::new("true")), line)
    }

    pub fn false_(line: u32) -> Self {
        Expr::new(ExprKind::ConstFetch(Name::new("false")), line)
    }

    pub fn assign(target: Expr, value: Expr, line: u32) -> Self {
        Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
            line,
        )
    }

    /// `$name = value`.
    pub fn assign_var(name: impl Into<String>, value: Expr, line: u32) -> Self {
        Expr::assign(Expr::var(name, line), value, line)
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr, line: u32) -> Self {
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            line,
        )
    }

    pub fn not(value: Expr, line: u32) -> Self {
        Expr::new(ExprKind::BooleanNot(Box::new(value)), line)
    }

    /// `$name->property` on a bare-variable receiver.
    pub fn prop(receiver: impl Into<String>, property: impl Into<String>, line: u32) -> Self {
        Expr::new(
            ExprKind::PropertyFetch {
                target: Box::new(Expr::var(receiver, line)),
                name: MemberName::Fixed(property.into()),
            },
            line,
        )
    }

    pub fn func_call(name: impl Into<String>, args: Vec<Expr>, line: u32) -> Self {
        Expr::new(
            ExprKind::FuncCall {
                name: Callee::Name(Name::new(name)),
                args,
            },
            line,
        )
    }

    pub fn method_call(
        target: Expr,
        name: impl Into<String>,
        args: Vec<Expr>,
        line: u32,
    ) -> Self {
        Expr::new(
            ExprKind::MethodCall {
                target: Box::new(target),
                name: MemberName::Fixed(name.into()),
                args,
            },
            line,
        )
    }

    pub fn static_call(
        class: impl Into<String>,
        name: impl Into<String>,
        args: Vec<Expr>,
        line: u32,
    ) -> Self {
        Expr::new(
            ExprKind::StaticCall {
                class: ClassRef::Name(Name::new(class)),
                name: name.into(),
                args,
            },
            line,
        )
    }

    pub fn new_object(class: impl Into<String>, args: Vec<Expr>, line: u32) -> Self {
        Expr::new(
            ExprKind::New {
                class: ClassRef::Name(Name::new(class)),
                args,
            },
            line,
        )
    }

    pub fn instance_of(target: Expr, class: impl Into<String>, line: u32) -> Self {
        Expr::new(
            ExprKind::Instanceof {
                target: Box::new(target),
                class: ClassRef::Name(Name::new(class)),
            },
            line,
        )
    }

    pub fn isset(vars: Vec<Expr>, line: u32) -> Self {
        Expr::new(ExprKind::Isset(vars), line)
    }

    pub fn array_dim(target: Expr, dim: Option<Expr>, line: u32) -> Self {
        Expr::new(
            ExprKind::ArrayDimFetch {
                target: Box::new(target),
                dim: dim.map(Box::new),
            },
            line,
        )
    }

    pub fn ternary(cond: Expr, then: Option<Expr>, otherwise: Expr, line: u32) -> Self {
        Expr::new(
            ExprKind::Ternary {
                cond: Box::new(cond),
                then: then.map(Box::new),
                otherwise: Box::new(otherwise),
            },
            line,
        )
    }
}
