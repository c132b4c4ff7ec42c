//! Boolean algebra of user predicates and precedence predicates.
//!
//! Semantic contexts ride along on configurations and are only evaluated
//! against the recognizer when prediction needs a verdict. `AND`/`OR`
//! operands are deduplicated and kept sorted so structurally equal
//! formulas compare equal.

use std::sync::Arc;

use once_cell::sync::Lazy;
use perdix_atn::RuleIndex;
use smallvec::SmallVec;

use crate::tree::CtxRef;

static NONE: Lazy<Arc<SemanticContext>> = Lazy::new(|| Arc::new(SemanticContext::None));

/// Callbacks prediction needs from the surrounding parser.
pub trait Recognizer {
    /// Evaluate user predicate `pred_index` of `rule`. Context-dependent
    /// predicates receive the local rule context.
    fn sempred(&mut self, ctx: Option<&CtxRef>, rule: RuleIndex, pred_index: usize) -> bool;

    /// Whether the current precedence allows an operator of `precedence`.
    fn precpred(&self, ctx: Option<&CtxRef>, precedence: u32) -> bool;

    /// Current parser precedence; keys precedence-DFA start states.
    fn precedence(&self) -> u32 {
        0
    }

    /// Run embedded action `action_index` of `rule`. Most recognizers
    /// have none.
    fn action(&mut self, _ctx: Option<&CtxRef>, _rule: RuleIndex, _action_index: usize) {}
}

/// A predicate formula attached to a configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemanticContext {
    /// Always true; the default for unpredicated configurations.
    None,
    Predicate {
        rule: RuleIndex,
        pred_index: usize,
        is_ctx_dependent: bool,
    },
    PrecedencePredicate {
        precedence: u32,
    },
    And(Vec<SemanticContext>),
    Or(Vec<SemanticContext>),
}

impl SemanticContext {
    /// The always-true sentinel.
    pub fn none() -> Arc<SemanticContext> {
        NONE.clone()
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, SemanticContext::None)
    }

    /// Conjunction, short-circuiting against the sentinel and flattening
    /// nested `And` nodes. Of several precedence predicates only the
    /// least restrictive survives.
    pub fn and(a: &Arc<SemanticContext>, b: &Arc<SemanticContext>) -> Arc<SemanticContext> {
        if a.is_none() {
            return b.clone();
        }
        if b.is_none() {
            return a.clone();
        }
        let mut operands: SmallVec<[SemanticContext; 4]> = SmallVec::new();
        flatten_into(a, true, &mut operands);
        flatten_into(b, true, &mut operands);
        let reduced = reduce_precedence(operands, |x, y| x.min(y));
        build(reduced, SemanticContext::And)
    }

    /// Disjunction; dual of [`SemanticContext::and`]. `None` absorbs the
    /// other operand; the most permissive precedence predicate survives.
    pub fn or(a: &Arc<SemanticContext>, b: &Arc<SemanticContext>) -> Arc<SemanticContext> {
        if a.is_none() || b.is_none() {
            return SemanticContext::none();
        }
        let mut operands: SmallVec<[SemanticContext; 4]> = SmallVec::new();
        flatten_into(a, false, &mut operands);
        flatten_into(b, false, &mut operands);
        let reduced = reduce_precedence(operands, |x, y| x.max(y));
        build(reduced, SemanticContext::Or)
    }

    /// Evaluate to a boolean against the recognizer.
    pub fn eval<R: Recognizer>(&self, recognizer: &mut R, ctx: Option<&CtxRef>) -> bool {
        match self {
            SemanticContext::None => true,
            SemanticContext::Predicate {
                rule,
                pred_index,
                is_ctx_dependent,
            } => {
                let local = if *is_ctx_dependent { ctx } else { None };
                recognizer.sempred(local, *rule, *pred_index)
            }
            SemanticContext::PrecedencePredicate { precedence } => {
                recognizer.precpred(ctx, *precedence)
            }
            SemanticContext::And(ops) => ops.iter().all(|op| op.eval(recognizer, ctx)),
            SemanticContext::Or(ops) => ops.iter().any(|op| op.eval(recognizer, ctx)),
        }
    }

    /// Fold precedence predicates against the current parser precedence.
    ///
    /// Returns the always-true sentinel when everything held and no user
    /// predicates remain, `None` when a precedence predicate failed, or a
    /// simplified formula with the precedence predicates dropped.
    pub fn eval_precedence<R: Recognizer>(
        self: &Arc<Self>,
        recognizer: &R,
        ctx: Option<&CtxRef>,
    ) -> Option<Arc<SemanticContext>> {
        match &**self {
            SemanticContext::None | SemanticContext::Predicate { .. } => Some(self.clone()),
            SemanticContext::PrecedencePredicate { precedence } => {
                if recognizer.precpred(ctx, *precedence) {
                    Some(SemanticContext::none())
                } else {
                    None
                }
            }
            SemanticContext::And(ops) => {
                let mut result = SemanticContext::none();
                let mut changed = false;
                for op in ops {
                    let arc = Arc::new(op.clone());
                    let evaluated = arc.eval_precedence(recognizer, ctx)?;
                    changed |= *evaluated != *op;
                    result = SemanticContext::and(&result, &evaluated);
                }
                if changed { Some(result) } else { Some(self.clone()) }
            }
            SemanticContext::Or(ops) => {
                let mut result: Option<Arc<SemanticContext>> = None;
                let mut changed = false;
                for op in ops {
                    let arc = Arc::new(op.clone());
                    match arc.eval_precedence(recognizer, ctx) {
                        Some(evaluated) => {
                            if evaluated.is_none() {
                                // One branch is unconditionally true.
                                return Some(SemanticContext::none());
                            }
                            changed |= *evaluated != *op;
                            result = Some(match result {
                                Some(acc) => SemanticContext::or(&acc, &evaluated),
                                None => evaluated,
                            });
                        }
                        None => changed = true,
                    }
                }
                if !changed {
                    return Some(self.clone());
                }
                result
            }
        }
    }
}

fn flatten_into(
    ctx: &Arc<SemanticContext>,
    conjunction: bool,
    out: &mut SmallVec<[SemanticContext; 4]>,
) {
    match (&**ctx, conjunction) {
        (SemanticContext::And(ops), true) | (SemanticContext::Or(ops), false) => {
            out.extend(ops.iter().cloned())
        }
        _ => out.push((**ctx).clone()),
    }
}

/// Keep at most one precedence predicate, combined with `pick`.
fn reduce_precedence(
    operands: SmallVec<[SemanticContext; 4]>,
    pick: impl Fn(u32, u32) -> u32,
) -> SmallVec<[SemanticContext; 4]> {
    let mut best: Option<u32> = None;
    let mut rest: SmallVec<[SemanticContext; 4]> = SmallVec::new();
    for op in operands {
        match op {
            SemanticContext::PrecedencePredicate { precedence } => {
                best = Some(best.map_or(precedence, |b| pick(b, precedence)));
            }
            other => rest.push(other),
        }
    }
    if let Some(precedence) = best {
        rest.push(SemanticContext::PrecedencePredicate { precedence });
    }
    rest
}

fn build(
    mut operands: SmallVec<[SemanticContext; 4]>,
    make: impl Fn(Vec<SemanticContext>) -> SemanticContext,
) -> Arc<SemanticContext> {
    operands.sort();
    operands.dedup();
    match operands.len() {
        0 => SemanticContext::none(),
        1 => Arc::new(operands.into_iter().next().unwrap()),
        _ => Arc::new(make(operands.into_vec())),
    }
}
