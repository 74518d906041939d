//! Expression operator matchers for `$and`, `$or` and `$nor`.
//!
//! The combinators never look inside their operands; they call back into the evaluator
//! for each sub-expression and short-circuit left to right.

use tracing::trace;

use docmatch_core::query::Expr;


/// `$and`: every sub-expression matches. Vacuously true when empty.
pub fn all_of(exprs: &[Expr], mut evaluate: impl FnMut(&Expr) -> bool) -> bool {
    let matched = exprs.iter().all(|expr| evaluate(expr));
    trace!(operator = "$and", clauses = exprs.len(), matched, "applied expression operator");
    matched
}

/// `$or`: at least one sub-expression matches.
pub fn any_of(exprs: &[Expr], mut evaluate: impl FnMut(&Expr) -> bool) -> bool {
    let matched = exprs.iter().any(|expr| evaluate(expr));
    trace!(operator = "$or", clauses = exprs.len(), matched, "applied expression operator");
    matched
}

/// `$nor`: no sub-expression matches.
pub fn none_of(exprs: &[Expr], mut evaluate: impl FnMut(&Expr) -> bool) -> bool {
    let matched = !exprs.iter().any(|expr| evaluate(expr));
    trace!(operator = "$nor", clauses = exprs.len(), matched, "applied expression operator");
    matched
}
