//! The ATN-walking interpreter.
//!
//! Drives a parse by stepping through ATN states, asking the simulator
//! for an alternative at every decision, matching tokens, and building an
//! interpreter rule-context tree. Left-recursive rules are unrolled with
//! an explicit parent stack; recognition errors are caught at the state
//! visit, recorded on the context, and handed to the error strategy.

use std::sync::Arc;

use perdix_atn::{Atn, RuleIndex, StateKind, StateNumber, Transition};
use perdix_core::interval::IntervalSet;
use perdix_core::stream::TokenStream;
use perdix_core::token::{EOF, MIN_USER_TOKEN_TYPE, Token, TokenType};
use perdix_core::vocabulary::Vocabulary;

use crate::dfa::DfaCache;
use crate::error::RecognitionError;
use crate::prediction::PredictionMode;
use crate::semantic::Recognizer;
use crate::simulator::ParserAtnSimulator;
use crate::strategy::{
    DefaultErrorStrategy, ErrorStrategy, ParserOps, SYNTHETIC_TOKEN_INDEX,
};
use crate::trace::{NoopTracer, Tracer};
use crate::tree::{self, CtxRef, ParseTree};

/// User predicate callback: `(local ctx, rule, predicate index) -> bool`.
pub type SempredFn = Box<dyn FnMut(Option<&CtxRef>, RuleIndex, usize) -> bool>;
/// Embedded action callback: `(local ctx, rule, action index)`.
pub type ActionFn = Box<dyn FnMut(Option<&CtxRef>, RuleIndex, usize)>;

/// Recognizer half of the interpreter: predicate/action callbacks plus
/// the precedence stack. Split out so prediction can borrow it alongside
/// the input stream.
pub struct Callbacks {
    sempred: Option<SempredFn>,
    action: Option<ActionFn>,
    precedence_stack: Vec<u32>,
}

impl Callbacks {
    fn new() -> Self {
        Self {
            sempred: None,
            action: None,
            precedence_stack: Vec::new(),
        }
    }
}

impl Recognizer for Callbacks {
    fn sempred(&mut self, ctx: Option<&CtxRef>, rule: RuleIndex, pred_index: usize) -> bool {
        match &mut self.sempred {
            Some(f) => f(ctx, rule, pred_index),
            // Without a handler predicates are vacuously true, matching
            // an interpreter that has no generated code to consult.
            None => true,
        }
    }

    fn precpred(&self, _ctx: Option<&CtxRef>, precedence: u32) -> bool {
        precedence >= self.precedence_stack.last().copied().unwrap_or(0)
    }

    fn precedence(&self) -> u32 {
        self.precedence_stack.last().copied().unwrap_or(0)
    }

    fn action(&mut self, ctx: Option<&CtxRef>, rule: RuleIndex, action_index: usize) {
        if let Some(f) = &mut self.action {
            f(ctx, rule, action_index);
        }
    }
}

/// One-shot forced alternative for a decision at an exact input index.
#[derive(Clone, Copy, Debug)]
struct DecisionOverride {
    decision: usize,
    input_index: usize,
    alt: usize,
    reached: bool,
}

/// Builder for [`Interpreter`] instances.
pub struct InterpreterBuilder<S> {
    atn: Arc<Atn>,
    input: S,
    rule_names: Vec<String>,
    vocabulary: Vocabulary,
    cache: Option<Arc<DfaCache>>,
    strategy: Box<dyn ErrorStrategy>,
    tracer: Box<dyn Tracer>,
    prediction_mode: PredictionMode,
    sempred: Option<SempredFn>,
    action: Option<ActionFn>,
}

impl<S: TokenStream> InterpreterBuilder<S> {
    pub fn rule_names(mut self, names: &[&str]) -> Self {
        self.rule_names = names.iter().map(|n| (*n).to_string()).collect();
        self
    }

    pub fn vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Share prediction caches with other parsers over the same network.
    pub fn shared_cache(mut self, cache: Arc<DfaCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn strategy(mut self, strategy: Box<dyn ErrorStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn tracer(mut self, tracer: Box<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn prediction_mode(mut self, mode: PredictionMode) -> Self {
        self.prediction_mode = mode;
        self
    }

    /// Install the user predicate evaluator.
    pub fn sempred(
        mut self,
        f: impl FnMut(Option<&CtxRef>, RuleIndex, usize) -> bool + 'static,
    ) -> Self {
        self.sempred = Some(Box::new(f));
        self
    }

    /// Install the embedded action handler.
    pub fn action(mut self, f: impl FnMut(Option<&CtxRef>, RuleIndex, usize) + 'static) -> Self {
        self.action = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Interpreter<S> {
        let cache = self.cache.unwrap_or_else(|| DfaCache::new(&self.atn));
        let mut sim = ParserAtnSimulator::new(self.atn.clone(), cache);
        sim.set_prediction_mode(self.prediction_mode);
        let mut callbacks = Callbacks::new();
        callbacks.sempred = self.sempred;
        callbacks.action = self.action;
        Interpreter {
            atn: self.atn,
            rule_names: self.rule_names,
            vocabulary: self.vocabulary,
            input: self.input,
            sim,
            callbacks,
            strategy: Some(self.strategy),
            tracer: self.tracer,
            state: 0,
            ctx: None,
            root: None,
            parent_stack: Vec::new(),
            override_: None,
            errors: Vec::new(),
        }
    }
}

/// An ATN-driven parser.
pub struct Interpreter<S> {
    atn: Arc<Atn>,
    rule_names: Vec<String>,
    vocabulary: Vocabulary,
    input: S,
    sim: ParserAtnSimulator,
    callbacks: Callbacks,
    /// Taken out while a strategy callback runs.
    strategy: Option<Box<dyn ErrorStrategy>>,
    tracer: Box<dyn Tracer>,
    state: StateNumber,
    ctx: Option<CtxRef>,
    /// Keeps the tree root alive (parent links are weak).
    root: Option<CtxRef>,
    /// `(parent ctx, invoking state)` pairs for left-recursion
    /// unrolling. Only recursion entry pushes and stop-state unrolls
    /// touch this.
    parent_stack: Vec<(Option<CtxRef>, Option<StateNumber>)>,
    override_: Option<DecisionOverride>,
    errors: Vec<RecognitionError>,
}

impl<S: TokenStream> Interpreter<S> {
    pub fn builder(atn: Arc<Atn>, input: S) -> InterpreterBuilder<S> {
        InterpreterBuilder {
            atn,
            input,
            rule_names: Vec::new(),
            vocabulary: Vocabulary::default(),
            cache: None,
            strategy: Box::new(DefaultErrorStrategy::new()),
            tracer: Box::new(NoopTracer),
            prediction_mode: PredictionMode::default(),
            sempred: None,
            action: None,
        }
    }

    /// Errors reported (and recovered from) during the last parse.
    pub fn errors(&self) -> &[RecognitionError] {
        &self.errors
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn rule_names(&self) -> &[String] {
        &self.rule_names
    }

    pub fn simulator(&self) -> &ParserAtnSimulator {
        &self.sim
    }

    /// Force alternative `alt` the next time `decision` is predicted at
    /// exactly `input_index`. Applies once. If recovery skips past the
    /// index before the decision is reached, the override stays armed
    /// but never fires.
    pub fn add_decision_override(&mut self, decision: usize, input_index: usize, alt: usize) {
        self.override_ = Some(DecisionOverride {
            decision,
            input_index,
            alt,
            reached: false,
        });
    }

    /// Rewind the input and clear parse state for a reparse. Keeps the
    /// DFA cache and re-arms any decision override.
    pub fn reset(&mut self) {
        self.input.seek(0);
        self.ctx = None;
        self.root = None;
        self.parent_stack.clear();
        self.callbacks.precedence_stack.clear();
        self.errors.clear();
        if let Some(o) = &mut self.override_ {
            o.reached = false;
        }
        if let Some(strategy) = &mut self.strategy {
            strategy.reset();
        }
    }

    /// Parse `start_rule`, returning the tree root. Recovered errors are
    /// collected in [`errors`](Self::errors); an `Err` means the error
    /// strategy gave up.
    pub fn parse(&mut self, start_rule: RuleIndex) -> Result<CtxRef, RecognitionError> {
        self.ctx = None;
        self.parent_stack.clear();
        self.callbacks.precedence_stack.clear();

        let start_state = self.atn.rule_start_state(start_rule);
        let left_recursive = self.atn.is_precedence_rule(start_rule);

        let root = tree::new_ctx(None, None, start_rule);
        self.root = Some(root.clone());
        if left_recursive {
            self.enter_recursion_rule(root.clone(), start_state, 0);
        } else {
            self.enter_rule(root.clone(), start_state);
        }

        loop {
            let p = self.state;
            if self.atn.state(p).is_rule_stop() {
                let at_root = self
                    .ctx
                    .as_ref()
                    .is_none_or(|c| c.borrow().invoking_state.is_none());
                if at_root {
                    if left_recursive {
                        let result = self.ctx.clone().expect("recursion context present");
                        let (parent, _) = self
                            .parent_stack
                            .pop()
                            .expect("recursion parent for root unroll");
                        self.unroll_recursion_contexts(parent);
                        return Ok(result);
                    }
                    self.exit_rule();
                    return Ok(root);
                }
                self.visit_rule_stop_state(p);
                continue;
            }

            if let Err(error) = self.visit_state(p) {
                self.state = self.atn.rule_stop_state(self.atn.state(p).rule);
                if let Some(ctx) = &self.ctx {
                    ctx.borrow_mut().exception = Some(error.clone());
                }
                self.with_strategy(|s, parser| {
                    s.report_error(parser, &error);
                    Ok(())
                })?;
                self.recover(&error)?;
            }
        }
    }

    /// Dump the last parse tree.
    pub fn tree_string(&self, root: &CtxRef) -> String {
        tree::to_string_tree(&ParseTree::Rule(root.clone()), &self.rule_names)
    }

    // ----- per-step dispatch --------------------------------------------

    fn visit_state(&mut self, p: StateNumber) -> Result<(), RecognitionError> {
        let state = self.atn.state(p);
        let alt = if state.transitions.len() > 1 {
            self.visit_decision_state(p)?
        } else {
            1
        };

        let transition = self.atn.state(p).transitions[alt - 1].clone();
        match &transition {
            Transition::Epsilon { .. } => {
                // Entering another round of a left-recursive loop starts
                // a fresh recursion context (unless taking the exit
                // branch).
                if self.atn.state(p).is_precedence_decision()
                    && !matches!(
                        self.atn.state(transition.target()).kind,
                        StateKind::LoopEnd { .. }
                    )
                {
                    let (parent, invoking) = self
                        .parent_stack
                        .last()
                        .cloned()
                        .expect("recursion parent inside precedence loop");
                    let rule = self
                        .ctx
                        .as_ref()
                        .expect("context inside precedence loop")
                        .borrow()
                        .rule;
                    let localctx = tree::new_ctx(parent.as_ref(), invoking, rule);
                    self.push_new_recursion_context(
                        localctx,
                        self.atn.rule_start_state(rule),
                    );
                }
            }
            Transition::Atom { label, .. } => {
                self.match_token(*label)?;
            }
            Transition::Range { .. } | Transition::Set { .. } | Transition::NotSet { .. } => {
                let la = self.input.la(1);
                if !transition.matches(la, MIN_USER_TOKEN_TYPE, self.atn.max_token_type) {
                    let token = self.with_strategy(|s, parser| s.recover_inline(parser))?;
                    if token.index == SYNTHETIC_TOKEN_INDEX {
                        self.push_error_node(token);
                    }
                }
                self.match_wildcard()?;
            }
            Transition::Wildcard { .. } => {
                self.match_wildcard()?;
            }
            Transition::Rule {
                target,
                rule,
                precedence,
                ..
            } => {
                let new_ctx = tree::new_ctx(self.ctx.as_ref(), Some(p), *rule);
                if self.atn.is_precedence_rule(*rule) {
                    self.enter_recursion_rule(new_ctx, *target, *precedence);
                } else {
                    self.enter_rule(new_ctx, *target);
                }
                return Ok(());
            }
            Transition::Predicate {
                rule, pred_index, ..
            } => {
                let ctx = self.ctx.clone();
                if !self.callbacks.sempred(ctx.as_ref(), *rule, *pred_index) {
                    return Err(self.failed_predicate(Some(*pred_index), format!(
                        "predicate {{{pred_index}}} failed"
                    )));
                }
            }
            Transition::PrecedencePredicate { precedence, .. } => {
                let ctx = self.ctx.clone();
                if !self.callbacks.precpred(ctx.as_ref(), *precedence) {
                    return Err(self.failed_predicate(
                        None,
                        format!("precpred(ctx, {precedence}) failed"),
                    ));
                }
            }
            Transition::Action {
                rule, action_index, ..
            } => {
                let ctx = self.ctx.clone();
                self.callbacks.action(ctx.as_ref(), *rule, *action_index);
            }
        }

        self.state = transition.target();
        Ok(())
    }

    fn visit_decision_state(&mut self, p: StateNumber) -> Result<usize, RecognitionError> {
        let decision = self
            .atn
            .state(p)
            .decision
            .expect("multi-alternative state owns a decision");

        self.with_strategy(|s, parser| s.sync(parser))?;

        if let Some(o) = &mut self.override_
            && !o.reached
            && o.decision == decision
            && o.input_index == self.input.index()
        {
            o.reached = true;
            return Ok(o.alt);
        }

        self.sim.adaptive_predict(
            &mut self.input,
            decision,
            self.ctx.as_ref(),
            &mut self.callbacks,
            &mut *self.tracer,
        )
    }

    fn visit_rule_stop_state(&mut self, p: StateNumber) {
        let rule = self.atn.state(p).rule;
        if self.atn.is_precedence_rule(rule) {
            let (parent, invoking) = self
                .parent_stack
                .pop()
                .expect("recursion parent at precedence rule stop");
            self.unroll_recursion_contexts(parent);
            self.state = invoking.expect("non-root recursion has an invoking state");
        } else {
            self.exit_rule();
        }

        // Resume at the follow state of the call we just returned from.
        self.state = self.atn.rule_follow(self.state);
    }

    // ----- rule entry/exit and recursion --------------------------------

    fn enter_rule(&mut self, ctx: CtxRef, state: StateNumber) {
        self.state = state;
        ctx.borrow_mut().start = self.input.lt(1).cloned();
        if let Some(parent) = ctx.borrow().parent_ctx() {
            parent.borrow_mut().add_child(ParseTree::Rule(ctx.clone()));
        }
        self.ctx = Some(ctx);
    }

    fn exit_rule(&mut self) {
        let ctx = self.ctx.take().expect("exit_rule with a context");
        ctx.borrow_mut().stop = self.input.lt(-1).cloned();
        if let Some(invoking) = ctx.borrow().invoking_state {
            self.state = invoking;
        }
        self.ctx = ctx.borrow().parent_ctx();
    }

    fn enter_recursion_rule(&mut self, ctx: CtxRef, state: StateNumber, precedence: u32) {
        self.parent_stack
            .push((self.ctx.clone(), ctx.borrow().invoking_state));
        self.callbacks.precedence_stack.push(precedence);
        self.state = state;
        ctx.borrow_mut().start = self.input.lt(1).cloned();
        self.ctx = Some(ctx);
    }

    /// One more round of recursion: the current context becomes the left
    /// operand of a fresh context at the same rule.
    fn push_new_recursion_context(&mut self, localctx: CtxRef, state: StateNumber) {
        let previous = self.ctx.take().expect("recursion context present");
        {
            let mut prev = previous.borrow_mut();
            prev.parent = Some(std::rc::Rc::downgrade(&localctx));
            prev.invoking_state = Some(state);
            prev.stop = self.input.lt(-1).cloned();
        }
        localctx.borrow_mut().start = previous.borrow().start.clone();
        localctx
            .borrow_mut()
            .add_child(ParseTree::Rule(previous));
        self.ctx = Some(localctx);
    }

    fn unroll_recursion_contexts(&mut self, parent: Option<CtxRef>) {
        self.callbacks.precedence_stack.pop();
        let retctx = self.ctx.take().expect("recursion context to unroll");
        retctx.borrow_mut().stop = self.input.lt(-1).cloned();

        retctx.borrow_mut().parent = parent.as_ref().map(std::rc::Rc::downgrade);
        if let Some(parent) = &parent {
            parent.borrow_mut().add_child(ParseTree::Rule(retctx));
        }
        self.ctx = parent;
    }

    // ----- token matching -----------------------------------------------

    fn match_token(&mut self, ttype: TokenType) -> Result<(), RecognitionError> {
        if self.input.la(1) == ttype {
            self.with_strategy(|s, parser| {
                s.report_match(parser);
                Ok(())
            })?;
            self.consume_internal();
            return Ok(());
        }
        let token = self.with_strategy(|s, parser| s.recover_inline(parser))?;
        if token.index == SYNTHETIC_TOKEN_INDEX {
            self.push_error_node(token);
        }
        Ok(())
    }

    fn match_wildcard(&mut self) -> Result<(), RecognitionError> {
        if self.input.la(1) > 0 {
            self.consume_internal();
            return Ok(());
        }
        let token = self.with_strategy(|s, parser| s.recover_inline(parser))?;
        if token.index == SYNTHETIC_TOKEN_INDEX {
            self.push_error_node(token);
        }
        Ok(())
    }

    fn consume_internal(&mut self) -> Token {
        let token = self
            .input
            .lt(1)
            .cloned()
            .unwrap_or_else(Token::eof);
        if token.token_type != EOF {
            self.input.consume();
        }
        let as_error = self
            .strategy
            .as_ref()
            .is_some_and(|s| s.in_error_recovery_mode());
        if let Some(ctx) = &self.ctx {
            ctx.borrow_mut().add_child(if as_error {
                ParseTree::Error(token.clone())
            } else {
                ParseTree::Terminal(token.clone())
            });
        }
        token
    }

    // ----- errors --------------------------------------------------------

    fn failed_predicate(&mut self, pred_index: Option<usize>, message: String) -> RecognitionError {
        RecognitionError::FailedPredicate {
            offending: self.input.lt(1).cloned().unwrap_or_else(Token::eof),
            rule: self.atn.state(self.state).rule,
            state: self.state,
            pred_index,
            message,
        }
    }

    fn recover(&mut self, error: &RecognitionError) -> Result<(), RecognitionError> {
        let before = self.input.index();
        self.with_strategy(|s, parser| s.recover(parser, error))?;
        if self.input.index() == before
            && let Some(offending) = error.offending_token()
        {
            // Recovery consumed nothing; pin the offending token into
            // the tree so progress is visible.
            self.push_error_node(offending.clone());
        }
        Ok(())
    }

    /// Run a strategy callback with the strategy temporarily detached so
    /// it can borrow the interpreter as [`ParserOps`].
    fn with_strategy<O>(
        &mut self,
        f: impl FnOnce(&mut dyn ErrorStrategy, &mut dyn ParserOps) -> Result<O, RecognitionError>,
    ) -> Result<O, RecognitionError> {
        let mut strategy = self.strategy.take().expect("strategy installed");
        let result = f(&mut *strategy, self);
        self.strategy = Some(strategy);
        result
    }

    fn push_error_node(&mut self, token: Token) {
        if let Some(ctx) = &self.ctx {
            ctx.borrow_mut().add_child(ParseTree::Error(token));
        }
    }
}

impl<S: TokenStream> ParserOps for Interpreter<S> {
    fn atn(&self) -> &Atn {
        &self.atn
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn current_state(&self) -> StateNumber {
        self.state
    }

    fn current_rule(&self) -> RuleIndex {
        self.atn.state(self.state).rule
    }

    fn la(&mut self, k: isize) -> TokenType {
        self.input.la(k)
    }

    fn current_token(&mut self) -> Token {
        self.input.lt(1).cloned().unwrap_or_else(Token::eof)
    }

    fn input_index(&self) -> usize {
        self.input.index()
    }

    fn consume_current(&mut self, as_error: bool) -> Token {
        let token = self
            .input
            .lt(1)
            .cloned()
            .unwrap_or_else(Token::eof);
        if token.token_type != EOF {
            self.input.consume();
        }
        if let Some(ctx) = &self.ctx {
            ctx.borrow_mut().add_child(if as_error {
                ParseTree::Error(token.clone())
            } else {
                ParseTree::Terminal(token.clone())
            });
        }
        token
    }

    fn expected_tokens(&self) -> IntervalSet {
        let chain = self.rule_invocation_chain();
        self.atn.expected_tokens(self.state, chain)
    }

    fn rule_invocation_chain(&self) -> Vec<StateNumber> {
        self.ctx.as_ref().map(tree::invoking_chain).unwrap_or_default()
    }

    fn add_error_node(&mut self, token: Token) {
        self.push_error_node(token);
    }

    fn notify_error(&mut self, error: &RecognitionError) {
        self.tracer.syntax_error(error);
        self.errors.push(error.clone());
    }
}
