//! Classifying whether a block leaves its enclosing scope.

use phlow_ast::{Stmt, StmtKind};

/// Decides whether a statement list always transfers control out of the
/// block it ends.
///
/// The two flags select which jumps count as leaving: branch merging wants
/// `break`/`continue` to count (the arm contributes nothing to the
/// continuation), while guard-and-return recovery only cares about hard
/// exits.
pub trait TerminationOracle {
    fn leaves_block(&self, stmts: &[Stmt], count_break: bool, count_continue: bool) -> bool;
}

/// Syntactic termination: looks at the last real statement, recursing into
/// a trailing `if` only when every arm is present and leaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockTermination;

impl TerminationOracle for BlockTermination {
    fn leaves_block(&self, stmts: &[Stmt], count_break: bool, count_continue: bool) -> bool {
        for stmt in stmts.iter().rev() {
            match &stmt.kind {
                StmtKind::Nop => continue,
                StmtKind::Return(_) | StmtKind::Throw(_) => return true,
                StmtKind::Break => return count_break,
                StmtKind::Continue => return count_continue,
                StmtKind::If(if_stmt) => {
                    let Some(otherwise) = &if_stmt.otherwise else {
                        return false;
                    };
                    return self.leaves_block(&if_stmt.then, count_break, count_continue)
                        && self.leaves_block(otherwise, count_break, count_continue)
                        && if_stmt
                            .elseifs
                            .iter()
                            .all(|arm| self.leaves_block(&arm.body, count_break, count_continue));
                }
                _ => return false,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phlow_ast::Expr;

    #[test]
    fn trailing_nops_are_skipped() {
        let stmts = vec![Stmt::ret_void(1), Stmt::nop(2)];
        assert!(BlockTermination.leaves_block(&stmts, true, true));
    }

    #[test]
    fn jumps_count_only_when_asked() {
        let stmts = vec![Stmt::brk(1)];
        assert!(BlockTermination.leaves_block(&stmts, true, true));
        assert!(!BlockTermination.leaves_block(&stmts, false, false));
    }

    #[test]
    fn full_if_chains_leave_when_every_arm_does() {
        let both = vec![Stmt::if_else(
            Expr::var("a", 1),
            vec![Stmt::ret_void(2)],
            vec![Stmt::throw(Expr::var("e", 4), 4)],
            1,
        )];
        assert!(BlockTermination.leaves_block(&both, false, false));

        let no_else = vec![Stmt::if_then(Expr::var("a", 1), vec![Stmt::ret_void(2)], 1)];
        assert!(!BlockTermination.leaves_block(&no_else, false, false));
    }
}
