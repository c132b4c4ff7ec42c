//! Adaptive LL(*) prediction.
//!
//! `adaptive_predict` answers "which alternative?" for one decision:
//! first by walking the decision's DFA over the lookahead, then (on a
//! cache miss) by simulating the ATN under SLL, and finally by retrying
//! under full context when SLL hits a conflict. Every simulation step is
//! memoized back into the shared DFA, so the expensive paths run once per
//! distinct lookahead shape.
//!
//! The simulator owns no parse state: each call works off the input
//! stream (restored on every exit), the caller's rule context, and a
//! call-local merge cache.

use std::sync::Arc;

use perdix_atn::{Atn, INVALID_ALT, StateNumber, Transition};
use perdix_core::bitset::BitSet;
use perdix_core::token::{EOF, Token, TokenType};
use perdix_core::stream::TokenStream;
use rustc_hash::FxHashSet;

use crate::config::AtnConfig;
use crate::config_set::ConfigSet;
use crate::context::{EMPTY_RETURN_STATE, MergeCache, PredictionContext};
use crate::dfa::{Dfa, DfaCache, DfaEdge, DfaState};
use crate::error::RecognitionError;
use crate::prediction::{self, PredictionMode};
use crate::semantic::{Recognizer, SemanticContext};
use crate::trace::Tracer;
use crate::tree::{self, CtxRef};

/// The prediction engine for one parser.
///
/// Cheap to construct; the expensive shared state (the per-decision DFAs
/// and the context interner) lives in the [`DfaCache`] and is shared by
/// every simulator over the same network.
pub struct ParserAtnSimulator {
    atn: Arc<Atn>,
    cache: Arc<DfaCache>,
    prediction_mode: PredictionMode,
}

impl ParserAtnSimulator {
    pub fn new(atn: Arc<Atn>, cache: Arc<DfaCache>) -> Self {
        Self {
            atn,
            cache,
            prediction_mode: PredictionMode::default(),
        }
    }

    pub fn atn(&self) -> &Arc<Atn> {
        &self.atn
    }

    pub fn shared_cache(&self) -> &Arc<DfaCache> {
        &self.cache
    }

    pub fn prediction_mode(&self) -> PredictionMode {
        self.prediction_mode
    }

    pub fn set_prediction_mode(&mut self, mode: PredictionMode) {
        self.prediction_mode = mode;
    }

    /// Predict the alternative taken at `decision` from the current
    /// input position. The stream is marked on entry and restored to the
    /// entry index on every exit path, success or error.
    pub fn adaptive_predict<S, R, T>(
        &self,
        input: &mut S,
        decision: usize,
        outer_ctx: Option<&CtxRef>,
        recognizer: &mut R,
        tracer: &mut T,
    ) -> Result<usize, RecognitionError>
    where
        S: TokenStream,
        R: Recognizer,
        T: Tracer + ?Sized,
    {
        let marker = input.mark();
        let start_index = input.index();
        tracer.predict_enter(decision, start_index);

        let result = {
            let mut run = Prediction {
                atn: self.atn.clone(),
                mode: self.prediction_mode,
                cache: &self.cache,
                dfa: self.cache.dfa(decision),
                input: &mut *input,
                recognizer: &mut *recognizer,
                tracer: &mut *tracer,
                outer_ctx,
                start_index,
                merge_cache: MergeCache::new(),
            };
            run.run()
        };

        input.seek(start_index);
        input.release(marker);
        if let Ok(alt) = result {
            tracer.predict_exit(decision, alt);
        }
        result
    }
}

/// State of one `adaptive_predict` call.
struct Prediction<'a, S, R, T: ?Sized> {
    atn: Arc<Atn>,
    mode: PredictionMode,
    cache: &'a DfaCache,
    dfa: &'a Dfa,
    input: &'a mut S,
    recognizer: &'a mut R,
    tracer: &'a mut T,
    outer_ctx: Option<&'a CtxRef>,
    start_index: usize,
    merge_cache: MergeCache,
}

impl<S, R, T> Prediction<'_, S, R, T>
where
    S: TokenStream,
    R: Recognizer,
    T: Tracer + ?Sized,
{
    fn run(&mut self) -> Result<usize, RecognitionError> {
        let s0 = if self.dfa.is_precedence_dfa {
            self.dfa
                .precedence_start_state(self.recognizer.precedence())
        } else {
            self.dfa.s0()
        };

        let s0 = match s0 {
            Some(s0) => s0,
            None => {
                // Cold decision: build the SLL start state under the
                // wildcard (empty) context.
                let s0_closure = self.compute_start_state(self.dfa.atn_start_state, false);
                if self.dfa.is_precedence_dfa {
                    let filtered = s0_closure.apply_precedence_filter(
                        self.recognizer,
                        self.outer_ctx,
                        &mut self.merge_cache,
                    );
                    let state = self.add_dfa_state(filtered);
                    self.dfa
                        .set_precedence_start_state(self.recognizer.precedence(), state)
                } else {
                    let state = self.add_dfa_state(s0_closure);
                    self.dfa.set_s0(state)
                }
            }
        };

        self.exec_atn(s0)
    }

    /// SLL loop: walk/extend the DFA until an accept, a conflict, or a
    /// dead end.
    fn exec_atn(&mut self, s0: Arc<DfaState>) -> Result<usize, RecognitionError> {
        let mut previous = s0;
        let mut t = self.input.la(1);

        loop {
            let edge = match previous.edge(t) {
                Some(edge) => {
                    self.tracer.dfa_edge(self.dfa.decision, t);
                    edge
                }
                None => self.compute_target(&previous, t),
            };

            let d = match edge {
                DfaEdge::Error => {
                    let err = self.no_viable_alt(&previous.configs);
                    self.input.seek(self.start_index);
                    let alt = self.syn_valid_or_sem_invalid_alt(&previous.configs);
                    if alt != INVALID_ALT {
                        return Ok(alt);
                    }
                    return Err(err);
                }
                DfaEdge::State(d) => d,
            };

            if d.requires_full_context && self.mode != PredictionMode::Sll {
                let mut conflicting = d
                    .configs
                    .conflicting_alts
                    .clone()
                    .unwrap_or_else(|| d.configs.alts());
                if let Some(predicates) = &d.predicates {
                    let conflict_index = self.input.index();
                    if conflict_index != self.start_index {
                        self.input.seek(self.start_index);
                    }
                    let alts = self.eval_predicates(predicates, true);
                    if alts.cardinality() == 1 {
                        return Ok(alts.min().unwrap());
                    }
                    if conflict_index != self.start_index {
                        // Restore for the full-context retry below.
                        self.input.seek(conflict_index);
                    }
                    conflicting = alts;
                }

                self.tracer.attempting_full_context(
                    self.dfa.decision,
                    &conflicting,
                    self.start_index,
                    self.input.index(),
                );
                let s0_full = self.compute_start_state(self.dfa.atn_start_state, true);
                return self.exec_atn_with_full_context(s0_full);
            }

            if d.is_accept {
                let Some(predicates) = &d.predicates else {
                    return Ok(d.prediction);
                };
                let stop_index = self.input.index();
                self.input.seek(self.start_index);
                let alts = self.eval_predicates(predicates, true);
                return match alts.cardinality() {
                    0 => Err(self.no_viable_alt(&d.configs)),
                    1 => Ok(alts.min().unwrap()),
                    _ => {
                        self.tracer.ambiguity(
                            self.dfa.decision,
                            false,
                            &alts,
                            self.start_index,
                            stop_index,
                        );
                        Ok(alts.min().unwrap())
                    }
                };
            }

            previous = d;
            if t != EOF {
                self.input.consume();
                t = self.input.la(1);
            }
        }
    }

    /// Extend the DFA by one symbol from `previous`.
    fn compute_target(&mut self, previous: &Arc<DfaState>, t: TokenType) -> DfaEdge {
        let Some(mut reach) = self.compute_reach_set(&previous.configs, t, false) else {
            previous.set_edge(t, DfaEdge::Error);
            return DfaEdge::Error;
        };

        let mut is_accept = false;
        let mut prediction = INVALID_ALT;
        let mut requires_full_context = false;

        let predicted = reach.compute_unique_alt();
        if predicted != INVALID_ALT {
            reach.unique_alt = predicted;
            is_accept = true;
            prediction = predicted;
        } else if prediction::has_sll_conflict_terminating_prediction(self.mode, &self.atn, &reach)
        {
            // SLL cannot disambiguate no matter how much further it
            // looks; full context takes over from here.
            let conflicting = prediction::get_alts(&reach.conflicting_alt_subsets());
            prediction = conflicting.min().expect("conflict set is non-empty");
            reach.unique_alt = INVALID_ALT;
            reach.conflicting_alts = Some(conflicting);
            requires_full_context = true;
            is_accept = true;
        }

        let mut predicates = None;
        if is_accept && reach.has_semantic_context {
            let nalts = self
                .atn
                .state(self.dfa.atn_start_state)
                .transitions
                .len();
            let alts_to_collect = if reach.unique_alt != INVALID_ALT {
                let mut only = BitSet::new();
                only.set(reach.unique_alt);
                only
            } else {
                reach
                    .conflicting_alts
                    .clone()
                    .expect("conflicting alts set for predicated conflict")
            };
            match self.preds_for_ambig_alts(&alts_to_collect, &reach, nalts) {
                Some(alt_to_pred) => {
                    predicates = predicate_predictions(&alts_to_collect, &alt_to_pred);
                    // Predicated accepts resolve at prediction time, not
                    // from the cached alternative.
                    prediction = INVALID_ALT;
                }
                None => {
                    prediction = alts_to_collect.min().expect("alts to collect non-empty");
                }
            }
        }

        reach.optimize_contexts(self.cache.context_cache());
        let mut candidate = DfaState::new(reach);
        candidate.is_accept = is_accept;
        candidate.prediction = prediction;
        candidate.requires_full_context = requires_full_context;
        candidate.predicates = predicates;

        let (d, added) = self.dfa.add_state(candidate);
        if added {
            self.tracer.dfa_state_added(self.dfa.decision);
        }
        previous.set_edge(t, DfaEdge::State(d.clone()));
        DfaEdge::State(d)
    }

    /// Full-context loop, entered after an SLL conflict. Empty stacks
    /// are no longer wildcards, so configurations that differ only in
    /// caller are kept apart and real ambiguities separate from context
    /// splitting.
    fn exec_atn_with_full_context(
        &mut self,
        s0: ConfigSet,
    ) -> Result<usize, RecognitionError> {
        let mut found_exact_ambig = false;
        let mut previous = s0;
        self.input.seek(self.start_index);
        let mut t = self.input.la(1);

        let (predicted_alt, reach) = loop {
            let Some(mut reach) = self.compute_reach_set(&previous, t, true) else {
                let err = self.no_viable_alt(&previous);
                self.input.seek(self.start_index);
                let alt = self.syn_valid_or_sem_invalid_alt(&previous);
                if alt != INVALID_ALT {
                    return Ok(alt);
                }
                return Err(err);
            };

            let alt_subsets = reach.conflicting_alt_subsets();
            reach.unique_alt = reach.compute_unique_alt();
            if reach.unique_alt != INVALID_ALT {
                break (reach.unique_alt, reach);
            }
            if self.mode != PredictionMode::LlExactAmbigDetection {
                let alt = prediction::resolves_to_just_one_viable_alt(&alt_subsets);
                if alt != INVALID_ALT {
                    break (alt, reach);
                }
            } else if prediction::all_subsets_conflict(&alt_subsets)
                && prediction::all_subsets_equal(&alt_subsets)
            {
                found_exact_ambig = true;
                break (
                    prediction::get_alts(&alt_subsets)
                        .min()
                        .expect("conflicting subsets are non-empty"),
                    reach,
                );
            }

            previous = reach;
            if t != EOF {
                self.input.consume();
                t = self.input.la(1);
            }
        };

        if reach.unique_alt != INVALID_ALT {
            self.tracer.context_sensitivity(
                self.dfa.decision,
                predicted_alt,
                self.start_index,
                self.input.index(),
            );
            return Ok(predicted_alt);
        }

        self.tracer.ambiguity(
            self.dfa.decision,
            found_exact_ambig,
            &reach.alts(),
            self.start_index,
            self.input.index(),
        );
        Ok(predicted_alt)
    }

    /// Configurations after consuming `t` from `closure_set`, epsilon-
    /// expanded.
    fn compute_reach_set(
        &mut self,
        closure_set: &ConfigSet,
        t: TokenType,
        full_ctx: bool,
    ) -> Option<ConfigSet> {
        let atn = self.atn.clone();
        let mut intermediate = ConfigSet::new(full_ctx);
        let mut skipped_stop: Vec<AtnConfig> = Vec::new();

        for config in closure_set.iter() {
            if atn.state(config.state).is_rule_stop() {
                debug_assert!(config.context.is_empty());
                // End of the start rule; only EOF (or the outer context,
                // in full-ctx mode) can extend this hypothesis.
                if full_ctx || t == EOF {
                    skipped_stop.push(config.clone());
                }
                continue;
            }
            for trans in &atn.state(config.state).transitions {
                if trans.matches(t, 0, atn.max_token_type) {
                    intermediate.add(config.transform(trans.target()), &mut self.merge_cache);
                }
            }
        }

        // If every surviving hypothesis already agrees, skip the closure.
        let mut used_intermediate = false;
        let mut reach = if skipped_stop.is_empty()
            && t != EOF
            && (intermediate.len() == 1 || intermediate.compute_unique_alt() != INVALID_ALT)
        {
            used_intermediate = true;
            intermediate.clone()
        } else {
            let mut reach = ConfigSet::new(full_ctx);
            let mut busy = FxHashSet::default();
            let treat_eof_as_epsilon = t == EOF;
            let seeds: Vec<AtnConfig> = intermediate.iter().cloned().collect();
            for config in seeds {
                self.closure(config, &mut reach, &mut busy, false, full_ctx, treat_eof_as_epsilon);
            }
            reach
        };

        if t == EOF {
            // At end of input only completed hypotheses count.
            reach = reach.rule_stop_configs(&atn, used_intermediate, &mut self.merge_cache);
        }

        if !skipped_stop.is_empty()
            && (!full_ctx || !prediction::has_config_in_rule_stop_state(&atn, &reach))
        {
            for config in skipped_stop {
                reach.add(config, &mut self.merge_cache);
            }
        }

        if reach.is_empty() {
            return None;
        }
        Some(reach)
    }

    /// Initial closure of a decision state. SLL uses the wildcard empty
    /// stack; full context starts from the caller chain.
    fn compute_start_state(&mut self, p: StateNumber, full_ctx: bool) -> ConfigSet {
        let atn = self.atn.clone();
        let initial_context = if full_ctx {
            let mut chain = self
                .outer_ctx
                .map(tree::invoking_chain)
                .unwrap_or_default();
            chain.reverse(); // outermost first
            PredictionContext::from_invoking_states(&atn, &chain)
        } else {
            PredictionContext::empty()
        };

        let mut configs = ConfigSet::new(full_ctx);
        for (i, trans) in atn.state(p).transitions.iter().enumerate() {
            let config = AtnConfig::new(trans.target(), i + 1, initial_context.clone());
            let mut busy = FxHashSet::default();
            self.closure(config, &mut configs, &mut busy, true, full_ctx, false);
        }
        configs
    }

    fn closure(
        &mut self,
        config: AtnConfig,
        configs: &mut ConfigSet,
        busy: &mut FxHashSet<AtnConfig>,
        collect_predicates: bool,
        full_ctx: bool,
        treat_eof_as_epsilon: bool,
    ) {
        self.closure_checking_stop_state(
            config,
            configs,
            busy,
            collect_predicates,
            full_ctx,
            0,
            treat_eof_as_epsilon,
        );
    }

    /// Closure dispatch for rule stop states: pop the context and return
    /// to callers, or, with an empty SLL stack, chase the injected
    /// follow edges into the outer context.
    #[allow(clippy::too_many_arguments)]
    fn closure_checking_stop_state(
        &mut self,
        config: AtnConfig,
        configs: &mut ConfigSet,
        busy: &mut FxHashSet<AtnConfig>,
        collect_predicates: bool,
        full_ctx: bool,
        depth: i32,
        treat_eof_as_epsilon: bool,
    ) {
        let atn = self.atn.clone();
        if atn.state(config.state).is_rule_stop() {
            if !config.context.is_empty() {
                for i in 0..config.context.len() {
                    if config.context.return_state(i) == EMPTY_RETURN_STATE {
                        if full_ctx {
                            let mut c = config.clone();
                            c.context = PredictionContext::empty();
                            configs.add(c, &mut self.merge_cache);
                            continue;
                        }
                        // Stack branch with no caller info: chase follow
                        // links like the plain empty-stack case.
                        self.closure_work(
                            config.clone(),
                            configs,
                            busy,
                            collect_predicates,
                            full_ctx,
                            depth,
                            treat_eof_as_epsilon,
                        );
                        continue;
                    }
                    let return_state = config.context.return_state(i);
                    let parent = config
                        .context
                        .parent(i)
                        .expect("non-empty branch has a parent")
                        .clone();
                    let mut c = AtnConfig::with_semantic(
                        return_state,
                        config.alt,
                        parent,
                        config.semantic_context.clone(),
                    );
                    // Popping a pushed frame may still leave us outside
                    // the entry context from an earlier fall-off.
                    c.reaches_into_outer_context = config.reaches_into_outer_context;
                    self.closure_checking_stop_state(
                        c,
                        configs,
                        busy,
                        collect_predicates,
                        full_ctx,
                        depth - 1,
                        treat_eof_as_epsilon,
                    );
                }
                return;
            }
            if full_ctx {
                // Reached the end of the start rule under full context.
                configs.add(config, &mut self.merge_cache);
                return;
            }
            // SLL with the wildcard empty stack: "no caller at all" is
            // one of the possibilities, so record the stopped hypothesis
            // before chasing follow links into hypothetical callers.
            configs.add(config.clone(), &mut self.merge_cache);
        }
        self.closure_work(
            config,
            configs,
            busy,
            collect_predicates,
            full_ctx,
            depth,
            treat_eof_as_epsilon,
        );
    }

    /// Epsilon expansion of one configuration.
    #[allow(clippy::too_many_arguments)]
    fn closure_work(
        &mut self,
        config: AtnConfig,
        configs: &mut ConfigSet,
        busy: &mut FxHashSet<AtnConfig>,
        collect_predicates: bool,
        full_ctx: bool,
        depth: i32,
        treat_eof_as_epsilon: bool,
    ) {
        let atn = self.atn.clone();
        let p = atn.state(config.state);
        if !p.epsilon_only_transitions {
            configs.add(config.clone(), &mut self.merge_cache);
        }

        for trans in &p.transitions {
            let continue_collecting =
                collect_predicates && !matches!(trans, Transition::Action { .. });
            let Some(mut c) = self.epsilon_target(
                &config,
                trans,
                continue_collecting,
                depth == 0,
                full_ctx,
                treat_eof_as_epsilon,
            ) else {
                continue;
            };

            let mut new_depth = depth;
            if p.is_rule_stop() {
                // Fell off the end of the decision entry rule into the
                // outer context (SLL wildcard stacks only).
                debug_assert!(!full_ctx);
                if self.dfa.is_precedence_dfa
                    && let Transition::Epsilon {
                        outermost_precedence_return: Some(returned_rule),
                        ..
                    } = trans
                    && *returned_rule == atn.state(self.dfa.atn_start_state).rule
                {
                    c.precedence_filter_suppressed = true;
                }
                c.reaches_into_outer_context += 1;
                if !busy.insert(c.clone()) {
                    // Right-recursive cycles revisit the same fall-off.
                    continue;
                }
                configs.dips_into_outer_context = true;
                new_depth -= 1;
            } else {
                if !trans.is_epsilon() && !busy.insert(c.clone()) {
                    // EOF-as-epsilon loops.
                    continue;
                }
                if matches!(trans, Transition::Rule { .. }) && new_depth >= 0 {
                    // Latch once depth goes negative: after stepping out
                    // of the entry context there is no way back in.
                    new_depth += 1;
                }
            }

            self.closure_checking_stop_state(
                c,
                configs,
                busy,
                continue_collecting,
                full_ctx,
                new_depth,
                treat_eof_as_epsilon,
            );
        }
    }

    /// Result of taking a non-consuming transition, if viable. Under
    /// full context, predicates are evaluated on the spot (with the
    /// input rewound to the decision point); under SLL they are
    /// collected into the configuration's semantic context.
    fn epsilon_target(
        &mut self,
        config: &AtnConfig,
        trans: &Transition,
        collect_predicates: bool,
        in_context: bool,
        full_ctx: bool,
        treat_eof_as_epsilon: bool,
    ) -> Option<AtnConfig> {
        match trans {
            Transition::Rule { target, follow, .. } => {
                let new_ctx = PredictionContext::singleton(config.context.clone(), *follow);
                Some(config.transform_with_context(*target, new_ctx))
            }
            Transition::PrecedencePredicate { target, precedence } => {
                if collect_predicates && in_context {
                    if full_ctx {
                        let holds = self.eval_at_start(|run| {
                            run.recognizer.precpred(run.outer_ctx, *precedence)
                        });
                        return holds.then(|| config.transform(*target));
                    }
                    let pred = Arc::new(SemanticContext::PrecedencePredicate {
                        precedence: *precedence,
                    });
                    let sem = SemanticContext::and(&config.semantic_context, &pred);
                    Some(config.transform_with_semantic(*target, sem))
                } else {
                    Some(config.transform(*target))
                }
            }
            Transition::Predicate {
                target,
                rule,
                pred_index,
                is_ctx_dependent,
            } => {
                if collect_predicates && (!is_ctx_dependent || in_context) {
                    if full_ctx {
                        let pred = SemanticContext::Predicate {
                            rule: *rule,
                            pred_index: *pred_index,
                            is_ctx_dependent: *is_ctx_dependent,
                        };
                        let holds =
                            self.eval_at_start(|run| pred.eval(run.recognizer, run.outer_ctx));
                        return holds.then(|| config.transform(*target));
                    }
                    let pred = Arc::new(SemanticContext::Predicate {
                        rule: *rule,
                        pred_index: *pred_index,
                        is_ctx_dependent: *is_ctx_dependent,
                    });
                    let sem = SemanticContext::and(&config.semantic_context, &pred);
                    Some(config.transform_with_semantic(*target, sem))
                } else {
                    Some(config.transform(*target))
                }
            }
            Transition::Action { target, .. } | Transition::Epsilon { target, .. } => {
                Some(config.transform(*target))
            }
            Transition::Atom { .. } | Transition::Range { .. } | Transition::Set { .. } => {
                if treat_eof_as_epsilon && trans.matches(EOF, 0, self.atn.max_token_type) {
                    return Some(config.transform(trans.target()));
                }
                None
            }
            Transition::NotSet { .. } | Transition::Wildcard { .. } => None,
        }
    }

    /// Evaluate a predicate with the input rewound to the decision
    /// point, restoring the position afterwards.
    fn eval_at_start(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let current = self.input.index();
        self.input.seek(self.start_index);
        let result = f(self);
        self.input.seek(current);
        result
    }

    /// Evaluate `(predicate, alt)` pairs against the outer context.
    /// `complete` keeps going after the first hit to collect every
    /// passing alternative.
    fn eval_predicates(
        &mut self,
        predicates: &[(Arc<SemanticContext>, usize)],
        complete: bool,
    ) -> BitSet {
        let mut passing = BitSet::new();
        for (pred, alt) in predicates {
            if pred.is_none() {
                passing.set(*alt);
                if !complete {
                    break;
                }
                continue;
            }
            if pred.eval(self.recognizer, self.outer_ctx) {
                passing.set(*alt);
                if !complete {
                    break;
                }
            }
        }
        passing
    }

    /// Union of semantic contexts per ambiguous alternative, indexed by
    /// alt; `None` when no alternative carries a real predicate.
    fn preds_for_ambig_alts(
        &self,
        ambig_alts: &BitSet,
        configs: &ConfigSet,
        nalts: usize,
    ) -> Option<Vec<Arc<SemanticContext>>> {
        let mut alt_to_pred: Vec<Option<Arc<SemanticContext>>> = vec![None; nalts + 1];
        for c in configs.iter() {
            if ambig_alts.get(c.alt) {
                alt_to_pred[c.alt] = Some(match alt_to_pred[c.alt].take() {
                    None => c.semantic_context.clone(),
                    Some(existing) => SemanticContext::or(&existing, &c.semantic_context),
                });
            }
        }

        let mut n_pred_alts = 0;
        let resolved: Vec<Arc<SemanticContext>> = alt_to_pred
            .into_iter()
            .map(|p| match p {
                None => SemanticContext::none(),
                Some(p) => {
                    if !p.is_none() {
                        n_pred_alts += 1;
                    }
                    p
                }
            })
            .collect();

        (n_pred_alts > 0).then_some(resolved)
    }

    /// Last-ditch resolution when prediction dead-ends: an alternative
    /// that already finished the decision entry rule parses at least as
    /// far as the conflict point, preferring semantically valid ones.
    fn syn_valid_or_sem_invalid_alt(&mut self, configs: &ConfigSet) -> usize {
        let atn = self.atn.clone();
        let (sem_valid, sem_invalid) = configs.split_by_semantic_validity(
            self.recognizer,
            self.outer_ctx,
            &mut self.merge_cache,
        );
        let alt = sem_valid.alt_finishing_entry_rule(&atn);
        if alt != INVALID_ALT {
            return alt;
        }
        if !sem_invalid.is_empty() {
            let alt = sem_invalid.alt_finishing_entry_rule(&atn);
            if alt != INVALID_ALT {
                return alt;
            }
        }
        INVALID_ALT
    }

    fn add_dfa_state(&mut self, mut configs: ConfigSet) -> Arc<DfaState> {
        configs.optimize_contexts(self.cache.context_cache());
        let (state, added) = self.dfa.add_state(DfaState::new(configs));
        if added {
            self.tracer.dfa_state_added(self.dfa.decision);
        }
        state
    }

    fn no_viable_alt(&mut self, configs: &ConfigSet) -> RecognitionError {
        let offending = self
            .input
            .lt(1)
            .cloned()
            .unwrap_or_else(Token::eof);
        let start = self.input.get(self.start_index).clone();
        let entry_state = self.dfa.atn_start_state;
        RecognitionError::NoViableAlt {
            offending,
            start,
            decision: self.dfa.decision,
            rule: self.atn.state(entry_state).rule,
            state: entry_state,
            configs: configs.clone(),
        }
    }
}

/// `(predicate, alt)` pairs for a predicated accept state; `None` when
/// every surviving predicate is the always-true sentinel.
fn predicate_predictions(
    ambig_alts: &BitSet,
    alt_to_pred: &[Arc<SemanticContext>],
) -> Option<Vec<(Arc<SemanticContext>, usize)>> {
    let mut pairs = Vec::new();
    let mut contains_predicate = false;
    for (alt, pred) in alt_to_pred.iter().enumerate().skip(1) {
        if ambig_alts.get(alt) {
            pairs.push((pred.clone(), alt));
        }
        if !pred.is_none() {
            contains_predicate = true;
        }
    }
    contains_predicate.then_some(pairs)
}
