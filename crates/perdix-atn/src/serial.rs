//! Wire format for compiled networks.
//!
//! A little-endian stream of 16-bit units:
//!
//! ```text
//! magic(2) version(1) fingerprint(8) grammar_kind(1) max_token_type(1)
//! num_states, per state:     tag rule arg1 arg2
//! num_rules,  per rule:      start stop token_type
//! num_sets,   per set:       num_intervals, (low high)*
//! num_edges,  per edge:      src target tag arg1 arg2 arg3
//! num_decisions, per:        state
//! ```
//!
//! Token types are stored shifted by [`TOKEN_BIAS`] so the negative
//! sentinels fit in a unit. The fingerprint pins the layout revision; the
//! decoder refuses anything it does not recognize.

use perdix_core::interval::IntervalSet;
use perdix_core::token::TokenType;
use thiserror::Error;

use crate::atn::{Atn, GrammarKind};
use crate::builder::{AtnBuildError, AtnBuilder};
use crate::state::{StateKind, StateNumber};
use crate::transition::Transition;

/// `b"PD"`, `b"AX"` as little-endian units.
pub const MAGIC: [u16; 2] = [0x4450, 0x5841];
/// Current format version.
pub const VERSION: u16 = 1;
/// Layout fingerprint of [`VERSION`].
pub const FINGERPRINT: [u16; 8] = [
    0x6b1a, 0x20c4, 0x9e71, 0x44d0, 0x8d03, 0xf5aa, 0x1c2e, 0x07b9,
];

/// Bias added to token types on the wire (`EOF = -1` encodes as 1).
const TOKEN_BIAS: i32 = 2;

/// Problems reading or writing the wire format.
#[derive(Debug, Error)]
pub enum AtnFormatError {
    #[error("bad magic: not a serialized network")]
    BadMagic,

    #[error("unsupported format version {0} (expected {VERSION})")]
    UnsupportedVersion(u16),

    #[error("unknown layout fingerprint")]
    UnknownFingerprint,

    #[error("stream truncated at unit {0}")]
    Truncated(usize),

    #[error("unknown state tag {tag} at state {state}")]
    UnknownStateTag { state: StateNumber, tag: u16 },

    #[error("unknown transition tag {tag} on edge {edge}")]
    UnknownTransitionTag { edge: usize, tag: u16 },

    #[error("set index {0} out of range")]
    BadSetIndex(usize),

    #[error("network too large for the wire format")]
    TooLarge,

    #[error(transparent)]
    Invalid(#[from] AtnBuildError),
}

/// Serialize a network.
pub fn encode(atn: &Atn) -> Result<Vec<u16>, AtnFormatError> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&FINGERPRINT);
    out.push(match atn.grammar_kind {
        GrammarKind::Parser => 0,
        GrammarKind::Lexer => 1,
    });
    out.push(unit(atn.max_token_type as usize)?);

    // Collect distinct labeled sets first so edges can reference them.
    fn set_index(set: &IntervalSet, sets: &mut Vec<IntervalSet>) -> usize {
        match sets.iter().position(|s| s == set) {
            Some(i) => i,
            None => {
                sets.push(set.clone());
                sets.len() - 1
            }
        }
    }
    let mut sets: Vec<IntervalSet> = Vec::new();
    for state in atn.states() {
        for t in &state.transitions {
            if let Transition::Set { set, .. } | Transition::NotSet { set, .. } = t {
                set_index(set, &mut sets);
            }
        }
    }

    out.push(unit(atn.states().len())?);
    for state in atn.states() {
        let (arg1, arg2) = match state.kind {
            StateKind::Basic
            | StateKind::RuleStop
            | StateKind::PlusLoopback
            | StateKind::StarLoopback
            | StateKind::TokensStart => (0, 0),
            StateKind::RuleStart { precedence_rule } => (precedence_rule as usize, 0),
            StateKind::BlockStart { end } | StateKind::StarBlockStart { end } => (end, 0),
            StateKind::PlusBlockStart { end, loopback } => (end, loopback),
            StateKind::BlockEnd { start } => (start, 0),
            StateKind::StarLoopEntry {
                loopback,
                precedence_decision,
            } => (loopback, precedence_decision as usize),
            StateKind::LoopEnd { loopback } => (loopback, 0),
        };
        out.push(state.kind.tag());
        out.push(unit(state.rule)?);
        out.push(unit(arg1)?);
        out.push(unit(arg2)?);
    }

    out.push(unit(atn.num_rules())?);
    for rule in 0..atn.num_rules() {
        out.push(unit(atn.rule_start_state(rule))?);
        out.push(unit(atn.rule_stop_state(rule))?);
        out.push(token_unit(atn.rule_token_type(rule)));
    }

    out.push(unit(sets.len())?);
    for set in &sets {
        out.push(unit(set.intervals().len())?);
        for iv in set.intervals() {
            out.push(token_unit(iv.low));
            out.push(token_unit(iv.high));
        }
    }

    let mut edges: Vec<[u16; 6]> = Vec::new();
    for state in atn.states() {
        for t in &state.transitions {
            let (arg1, arg2, arg3) = match t {
                Transition::Epsilon {
                    outermost_precedence_return,
                    ..
                } => (outermost_precedence_return.map_or(0, |r| r + 1), 0, 0),
                Transition::Wildcard { .. } => (0, 0, 0),
                Transition::Atom { label, .. } => (token_unit(*label) as usize, 0, 0),
                Transition::Range { low, high, .. } => {
                    (token_unit(*low) as usize, token_unit(*high) as usize, 0)
                }
                Transition::Set { set, .. } | Transition::NotSet { set, .. } => {
                    (set_index(set, &mut sets), 0, 0)
                }
                Transition::Rule {
                    rule,
                    precedence,
                    follow,
                    ..
                } => (*rule, *precedence as usize, *follow),
                Transition::Predicate {
                    rule,
                    pred_index,
                    is_ctx_dependent,
                    ..
                } => (*rule, *pred_index, *is_ctx_dependent as usize),
                Transition::PrecedencePredicate { precedence, .. } => {
                    (*precedence as usize, 0, 0)
                }
                Transition::Action {
                    rule,
                    action_index,
                    is_ctx_dependent,
                    ..
                } => (*rule, *action_index, *is_ctx_dependent as usize),
            };
            edges.push([
                unit(state.number)?,
                unit(t.target())?,
                t.tag(),
                unit(arg1)?,
                unit(arg2)?,
                unit(arg3)?,
            ]);
        }
    }
    out.push(unit(edges.len())?);
    for edge in &edges {
        out.extend_from_slice(edge);
    }

    out.push(unit(atn.num_decisions())?);
    for decision in 0..atn.num_decisions() {
        out.push(unit(atn.decision_state(decision))?);
    }

    Ok(out)
}

/// Deserialize a network, refusing unknown versions and layouts.
pub fn decode(units: &[u16]) -> Result<Atn, AtnFormatError> {
    let mut r = Reader { units, pos: 0 };

    if [r.next()?, r.next()?] != MAGIC {
        return Err(AtnFormatError::BadMagic);
    }
    let version = r.next()?;
    if version != VERSION {
        return Err(AtnFormatError::UnsupportedVersion(version));
    }
    let mut fingerprint = [0u16; 8];
    for f in &mut fingerprint {
        *f = r.next()?;
    }
    if fingerprint != FINGERPRINT {
        return Err(AtnFormatError::UnknownFingerprint);
    }

    let grammar_kind = if r.next()? == 0 {
        GrammarKind::Parser
    } else {
        GrammarKind::Lexer
    };
    let max_token_type = r.next()? as TokenType;
    let mut builder = AtnBuilder::new(grammar_kind, max_token_type);

    let num_states = r.next()? as usize;
    let mut state_meta = Vec::with_capacity(num_states);
    for state in 0..num_states {
        let tag = r.next()?;
        let rule = r.next()? as usize;
        let arg1 = r.next()? as usize;
        let arg2 = r.next()? as usize;
        let kind = match tag {
            0 => StateKind::Basic,
            1 => StateKind::RuleStart {
                precedence_rule: arg1 != 0,
            },
            2 => StateKind::RuleStop,
            3 => StateKind::BlockStart { end: arg1 },
            4 => StateKind::PlusBlockStart {
                end: arg1,
                loopback: arg2,
            },
            5 => StateKind::StarBlockStart { end: arg1 },
            6 => StateKind::BlockEnd { start: arg1 },
            7 => StateKind::PlusLoopback,
            8 => StateKind::StarLoopEntry {
                loopback: arg1,
                precedence_decision: arg2 != 0,
            },
            9 => StateKind::StarLoopback,
            10 => StateKind::TokensStart,
            11 => StateKind::LoopEnd { loopback: arg1 },
            _ => return Err(AtnFormatError::UnknownStateTag { state, tag }),
        };
        state_meta.push((rule, kind));
    }
    for &(rule, kind) in &state_meta {
        builder.add_state(rule, kind);
    }

    let num_rules = r.next()? as usize;
    let mut rule_tables = Vec::with_capacity(num_rules);
    for _ in 0..num_rules {
        let start = r.next()? as usize;
        let stop = r.next()? as usize;
        let token_type = untoken(r.next()?);
        rule_tables.push((start, stop, token_type));
    }
    builder.install_rule_tables(&rule_tables);

    let num_sets = r.next()? as usize;
    let mut sets = Vec::with_capacity(num_sets);
    for _ in 0..num_sets {
        let num_intervals = r.next()? as usize;
        let mut set = IntervalSet::new();
        for _ in 0..num_intervals {
            let low = untoken(r.next()?);
            let high = untoken(r.next()?);
            set.add_range(low, high);
        }
        sets.push(set);
    }

    let num_edges = r.next()? as usize;
    for edge in 0..num_edges {
        let src = r.next()? as usize;
        let target = r.next()? as usize;
        let tag = r.next()?;
        let arg1 = r.next()? as usize;
        let arg2 = r.next()? as usize;
        let arg3 = r.next()? as usize;
        let lookup_set = |i: usize| -> Result<IntervalSet, AtnFormatError> {
            sets.get(i).cloned().ok_or(AtnFormatError::BadSetIndex(i))
        };
        let transition = match tag {
            0 => Transition::Epsilon {
                target,
                outermost_precedence_return: (arg1 > 0).then(|| arg1 - 1),
            },
            1 => Transition::Atom {
                target,
                label: untoken(arg1 as u16),
            },
            2 => Transition::Range {
                target,
                low: untoken(arg1 as u16),
                high: untoken(arg2 as u16),
            },
            3 => Transition::Set {
                target,
                set: lookup_set(arg1)?,
            },
            4 => Transition::NotSet {
                target,
                set: lookup_set(arg1)?,
            },
            5 => Transition::Wildcard { target },
            6 => Transition::Rule {
                target,
                rule: arg1,
                precedence: arg2 as u32,
                follow: arg3,
            },
            7 => Transition::Predicate {
                target,
                rule: arg1,
                pred_index: arg2,
                is_ctx_dependent: arg3 != 0,
            },
            8 => Transition::PrecedencePredicate {
                target,
                precedence: arg1 as u32,
            },
            9 => Transition::Action {
                target,
                rule: arg1,
                action_index: arg2,
                is_ctx_dependent: arg3 != 0,
            },
            _ => return Err(AtnFormatError::UnknownTransitionTag { edge, tag }),
        };
        builder.add_transition(src, transition);
    }

    let num_decisions = r.next()? as usize;
    for _ in 0..num_decisions {
        let state = r.next()? as usize;
        builder.mark_decision(state);
    }

    Ok(builder.build()?)
}

struct Reader<'a> {
    units: &'a [u16],
    pos: usize,
}

impl Reader<'_> {
    fn next(&mut self) -> Result<u16, AtnFormatError> {
        let unit = self
            .units
            .get(self.pos)
            .copied()
            .ok_or(AtnFormatError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(unit)
    }
}

fn unit(value: usize) -> Result<u16, AtnFormatError> {
    u16::try_from(value).map_err(|_| AtnFormatError::TooLarge)
}

fn token_unit(t: TokenType) -> u16 {
    (t + TOKEN_BIAS) as u16
}

fn untoken(unit: u16) -> TokenType {
    unit as i32 - TOKEN_BIAS
}
