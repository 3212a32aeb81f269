//! Syntax tree for the checked language.
//!
//! The checker does not parse source text; a host front end produces this
//! tree. The node set is closed on purpose: statement and expression kinds
//! are tagged enums so the checker dispatches with exhaustive `match` and a
//! newly added kind is a compile error at every dispatch site, not a runtime
//! fallthrough.
//!
//! Nodes carry the source line they start on. That is the only position
//! information the checker consumes (diagnostics are line-oriented).

pub mod expr;
pub mod lvalue;
pub mod name;
pub mod stmt;

pub use expr::{
    ArrayItem, BinOp, Callee, CastKind, ClassRef, Closure, ClosureUse, Expr, ExprKind, FnParam,
    MemberName,
};
pub use lvalue::var_id;
pub use name::Name;
pub use stmt::{
    Case, Catch, ConstItem, ElseIf, FunctionDecl, IfStmt, PropertyItem, StaticVar, Stmt, StmtKind,
    TypeComment, UseItem,
};
