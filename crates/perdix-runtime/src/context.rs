//! Graph-structured prediction contexts.
//!
//! A prediction context is the call stack of a configuration, shared as a
//! DAG: equal prefixes are collapsed and suffixes shared, so millions of
//! configurations can reference a handful of context nodes. Nodes are
//! immutable once published; merging produces new shared nodes and is
//! memoized per prediction call.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use perdix_atn::{Atn, StateNumber};
use rustc_hash::{FxHashMap, FxHasher};

/// Return-state payload standing for "empty stack" inside array nodes.
pub const EMPTY_RETURN_STATE: usize = usize::MAX;

static EMPTY: Lazy<Arc<PredictionContext>> = Lazy::new(|| Arc::new(PredictionContext::Empty));

/// One node of the call-stack DAG.
///
/// `Array` parents and return states are parallel and sorted by return
/// state; an empty-stack branch appears as the trailing
/// ([`PredictionContext::Empty`], [`EMPTY_RETURN_STATE`]) pair.
#[derive(Debug)]
pub enum PredictionContext {
    /// The empty stack. In SLL mode it doubles as the wildcard "any
    /// caller" sentinel.
    Empty,
    Singleton {
        parent: Arc<PredictionContext>,
        return_state: usize,
        hash: u64,
    },
    Array {
        parents: Vec<Arc<PredictionContext>>,
        return_states: Vec<usize>,
        hash: u64,
    },
}

impl PredictionContext {
    /// The shared empty-stack sentinel.
    pub fn empty() -> Arc<PredictionContext> {
        EMPTY.clone()
    }

    /// A stack with `return_state` pushed on `parent`.
    pub fn singleton(parent: Arc<PredictionContext>, return_state: usize) -> Arc<PredictionContext> {
        debug_assert_ne!(return_state, EMPTY_RETURN_STATE);
        let hash = {
            let mut h = FxHasher::default();
            h.write_u64(parent.node_hash());
            h.write_usize(return_state);
            h.finish()
        };
        Arc::new(PredictionContext::Singleton {
            parent,
            return_state,
            hash,
        })
    }

    fn array(parents: Vec<Arc<PredictionContext>>, return_states: Vec<usize>) -> Arc<PredictionContext> {
        debug_assert_eq!(parents.len(), return_states.len());
        debug_assert!(return_states.is_sorted());
        let mut h = FxHasher::default();
        for (p, rs) in parents.iter().zip(&return_states) {
            h.write_u64(p.node_hash());
            h.write_usize(*rs);
        }
        Arc::new(PredictionContext::Array {
            parents,
            return_states,
            hash: h.finish(),
        })
    }

    /// Cached structural hash of this node.
    pub fn node_hash(&self) -> u64 {
        match self {
            PredictionContext::Empty => 0x9e37_79b9_7f4a_7c15,
            PredictionContext::Singleton { hash, .. } | PredictionContext::Array { hash, .. } => {
                *hash
            }
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PredictionContext::Empty)
    }

    /// Number of stack-top branches. The empty context counts as one
    /// branch whose payload is [`EMPTY_RETURN_STATE`].
    pub fn len(&self) -> usize {
        match self {
            PredictionContext::Empty | PredictionContext::Singleton { .. } => 1,
            PredictionContext::Array { return_states, .. } => return_states.len(),
        }
    }

    pub fn return_state(&self, index: usize) -> usize {
        match self {
            PredictionContext::Empty => EMPTY_RETURN_STATE,
            PredictionContext::Singleton { return_state, .. } => {
                debug_assert_eq!(index, 0);
                *return_state
            }
            PredictionContext::Array { return_states, .. } => return_states[index],
        }
    }

    pub fn parent(&self, index: usize) -> Option<&Arc<PredictionContext>> {
        match self {
            PredictionContext::Empty => None,
            PredictionContext::Singleton { parent, .. } => {
                debug_assert_eq!(index, 0);
                Some(parent)
            }
            PredictionContext::Array { parents, .. } => Some(&parents[index]),
        }
    }

    /// True iff an empty-stack leaf is reachable from the top branches.
    pub fn has_empty_path(&self) -> bool {
        // Sorted payloads put EMPTY_RETURN_STATE last.
        self.return_state(self.len() - 1) == EMPTY_RETURN_STATE
    }

    /// Build the full-context stack for `outer`: the chain of rule-call
    /// follow states, innermost last, derived from the invoking states of
    /// the surrounding rule contexts (outermost first).
    pub fn from_invoking_states(atn: &Atn, invoking_outermost_first: &[StateNumber]) -> Arc<Self> {
        let mut ctx = Self::empty();
        for &invoking in invoking_outermost_first {
            ctx = Self::singleton(ctx, atn.rule_follow(invoking));
        }
        ctx
    }
}

impl PartialEq for PredictionContext {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.node_hash() != other.node_hash() {
            return false;
        }
        match (self, other) {
            (PredictionContext::Empty, PredictionContext::Empty) => true,
            (
                PredictionContext::Singleton {
                    parent: pa,
                    return_state: ra,
                    ..
                },
                PredictionContext::Singleton {
                    parent: pb,
                    return_state: rb,
                    ..
                },
            ) => ra == rb && (Arc::ptr_eq(pa, pb) || pa == pb),
            (
                PredictionContext::Array {
                    parents: pa,
                    return_states: ra,
                    ..
                },
                PredictionContext::Array {
                    parents: pb,
                    return_states: rb,
                    ..
                },
            ) => {
                ra == rb
                    && pa
                        .iter()
                        .zip(pb)
                        .all(|(x, y)| Arc::ptr_eq(x, y) || x == y)
            }
            _ => false,
        }
    }
}

impl Eq for PredictionContext {}

impl Hash for PredictionContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.node_hash());
    }
}

/// Per-prediction memoization of merge results, keyed by operand identity.
#[derive(Default)]
pub struct MergeCache {
    map: FxHashMap<(usize, usize), Arc<PredictionContext>>,
}

impl MergeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &Arc<PredictionContext>, b: &Arc<PredictionContext>) -> (usize, usize) {
        (Arc::as_ptr(a) as usize, Arc::as_ptr(b) as usize)
    }

    fn get(&self, a: &Arc<PredictionContext>, b: &Arc<PredictionContext>) -> Option<Arc<PredictionContext>> {
        self.map
            .get(&Self::key(a, b))
            .or_else(|| self.map.get(&Self::key(b, a)))
            .cloned()
    }

    fn put(&mut self, a: &Arc<PredictionContext>, b: &Arc<PredictionContext>, r: Arc<PredictionContext>) {
        self.map.insert(Self::key(a, b), r);
    }
}

/// Merge two stacks, collapsing equal prefixes and sharing suffixes.
///
/// With `root_is_wildcard` (SLL), an empty-stack operand absorbs the
/// other; in full context the empty stack stays a distinct branch.
/// Idempotent and commutative up to structural equality.
pub fn merge(
    a: &Arc<PredictionContext>,
    b: &Arc<PredictionContext>,
    root_is_wildcard: bool,
    cache: &mut MergeCache,
) -> Arc<PredictionContext> {
    if Arc::ptr_eq(a, b) || a == b {
        return a.clone();
    }
    if let Some(hit) = cache.get(a, b) {
        return hit;
    }

    let singletonish =
        |c: &Arc<PredictionContext>| !matches!(&**c, PredictionContext::Array { .. });
    let result = if singletonish(a) && singletonish(b) {
        merge_singletons(a, b, root_is_wildcard, cache)
    } else if root_is_wildcard && a.is_empty() {
        a.clone()
    } else if root_is_wildcard && b.is_empty() {
        b.clone()
    } else {
        merge_arrays(&to_array(a), &to_array(b), root_is_wildcard, cache)
    };

    cache.put(a, b, result.clone());
    result
}

/// Branch view of a singleton-like node: `(parent, return_state)`, where
/// the empty context reads as `(Empty, EMPTY_RETURN_STATE)`.
fn singleton_view(c: &Arc<PredictionContext>) -> (Arc<PredictionContext>, usize) {
    match &**c {
        PredictionContext::Empty => (PredictionContext::empty(), EMPTY_RETURN_STATE),
        PredictionContext::Singleton {
            parent,
            return_state,
            ..
        } => (parent.clone(), *return_state),
        PredictionContext::Array { .. } => unreachable!("array is not singleton-like"),
    }
}

fn merge_singletons(
    a: &Arc<PredictionContext>,
    b: &Arc<PredictionContext>,
    root_is_wildcard: bool,
    cache: &mut MergeCache,
) -> Arc<PredictionContext> {
    // Root cases: one side is the empty stack.
    if a.is_empty() || b.is_empty() {
        if root_is_wildcard {
            // Wildcard absorbs anything.
            return PredictionContext::empty();
        }
        if a.is_empty() && b.is_empty() {
            return PredictionContext::empty();
        }
        // Keep the empty stack as a distinct trailing branch.
        let (parent, rs) = singleton_view(if a.is_empty() { b } else { a });
        return PredictionContext::array(
            vec![parent, PredictionContext::empty()],
            vec![rs, EMPTY_RETURN_STATE],
        );
    }

    let (pa, ra) = singleton_view(a);
    let (pb, rb) = singleton_view(b);

    if ra == rb {
        // Same stack top: merge what is underneath.
        let parent = merge(&pa, &pb, root_is_wildcard, cache);
        if Arc::ptr_eq(&parent, &pa) {
            return a.clone();
        }
        if Arc::ptr_eq(&parent, &pb) {
            return b.clone();
        }
        return PredictionContext::singleton(parent, ra);
    }

    // Different tops. If the parents agree, share them; either way the
    // result is a two-branch array sorted by return state.
    let shared_parent = (Arc::ptr_eq(&pa, &pb) || pa == pb).then(|| pa.clone());
    let (parents, payloads) = if let Some(p) = shared_parent {
        if ra < rb {
            (vec![p.clone(), p], vec![ra, rb])
        } else {
            (vec![p.clone(), p], vec![rb, ra])
        }
    } else if ra < rb {
        (vec![pa, pb], vec![ra, rb])
    } else {
        (vec![pb, pa], vec![rb, ra])
    };
    PredictionContext::array(parents, payloads)
}

/// View any node as parallel `(parents, return_states)` arrays.
fn to_array(c: &Arc<PredictionContext>) -> (Vec<Arc<PredictionContext>>, Vec<usize>) {
    match &**c {
        PredictionContext::Empty => (vec![PredictionContext::empty()], vec![EMPTY_RETURN_STATE]),
        PredictionContext::Singleton {
            parent,
            return_state,
            ..
        } => (vec![parent.clone()], vec![*return_state]),
        PredictionContext::Array {
            parents,
            return_states,
            ..
        } => (parents.clone(), return_states.clone()),
    }
}

fn merge_arrays(
    (a_parents, a_states): &(Vec<Arc<PredictionContext>>, Vec<usize>),
    (b_parents, b_states): &(Vec<Arc<PredictionContext>>, Vec<usize>),
    root_is_wildcard: bool,
    cache: &mut MergeCache,
) -> Arc<PredictionContext> {
    let mut parents = Vec::with_capacity(a_states.len() + b_states.len());
    let mut states = Vec::with_capacity(a_states.len() + b_states.len());

    // Merge-sort union keyed by return state; equal keys union parents.
    let (mut i, mut j) = (0, 0);
    while i < a_states.len() && j < b_states.len() {
        if a_states[i] == b_states[j] {
            let rs = a_states[i];
            let pa = &a_parents[i];
            let pb = &b_parents[j];
            let parent = if rs == EMPTY_RETURN_STATE || (Arc::ptr_eq(pa, pb) || pa == pb) {
                pa.clone()
            } else {
                merge(pa, pb, root_is_wildcard, cache)
            };
            parents.push(parent);
            states.push(rs);
            i += 1;
            j += 1;
        } else if a_states[i] < b_states[j] {
            parents.push(a_parents[i].clone());
            states.push(a_states[i]);
            i += 1;
        } else {
            parents.push(b_parents[j].clone());
            states.push(b_states[j]);
            j += 1;
        }
    }
    while i < a_states.len() {
        parents.push(a_parents[i].clone());
        states.push(a_states[i]);
        i += 1;
    }
    while j < b_states.len() {
        parents.push(b_parents[j].clone());
        states.push(b_states[j]);
        j += 1;
    }

    if states.len() == 1 {
        if states[0] == EMPTY_RETURN_STATE {
            return PredictionContext::empty();
        }
        return PredictionContext::singleton(parents[0].clone(), states[0]);
    }

    combine_common_parents(&mut parents);
    PredictionContext::array(parents, states)
}

/// Point structurally equal parents at one shared node so later merges
/// hit the pointer fast path.
fn combine_common_parents(parents: &mut [Arc<PredictionContext>]) {
    let mut unique: FxHashMap<u64, Vec<Arc<PredictionContext>>> = FxHashMap::default();
    for parent in parents.iter_mut() {
        let bucket = unique.entry(parent.node_hash()).or_default();
        match bucket.iter().find(|c| ***c == **parent) {
            Some(canonical) => *parent = canonical.clone(),
            None => bucket.push(parent.clone()),
        }
    }
}

/// Process-wide interner collapsing equal context subgraphs after
/// prediction. Nodes are compared structurally; the winner of a race is
/// whichever thread published first.
#[derive(Default)]
pub struct ContextCache {
    map: Mutex<FxHashMap<ContextKey, Arc<PredictionContext>>>,
}

#[derive(PartialEq, Eq)]
struct ContextKey(Arc<PredictionContext>);

impl Hash for ContextKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.node_hash());
    }
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn canonical(&self, ctx: &Arc<PredictionContext>) -> Option<Arc<PredictionContext>> {
        self.map.lock().unwrap().get(&ContextKey(ctx.clone())).cloned()
    }

    fn publish(&self, ctx: Arc<PredictionContext>) -> Arc<PredictionContext> {
        let mut map = self.map.lock().unwrap();
        map.entry(ContextKey(ctx.clone()))
            .or_insert(ctx)
            .clone()
    }

    /// Intern `ctx` and all nodes below it, returning the canonical
    /// graph. `visited` memoizes nodes already rewritten in this pass.
    pub fn get_cached(
        &self,
        ctx: &Arc<PredictionContext>,
        visited: &mut FxHashMap<usize, Arc<PredictionContext>>,
    ) -> Arc<PredictionContext> {
        if ctx.is_empty() {
            return ctx.clone();
        }
        let ptr = Arc::as_ptr(ctx) as usize;
        if let Some(hit) = visited.get(&ptr) {
            return hit.clone();
        }
        if let Some(existing) = self.canonical(ctx) {
            visited.insert(ptr, existing.clone());
            return existing;
        }

        let (rebuilt, changed) = match &**ctx {
            PredictionContext::Empty => unreachable!("handled above"),
            PredictionContext::Singleton {
                parent,
                return_state,
                ..
            } => {
                let cached_parent = self.get_cached(parent, visited);
                if Arc::ptr_eq(&cached_parent, parent) {
                    (ctx.clone(), false)
                } else {
                    (
                        PredictionContext::singleton(cached_parent, *return_state),
                        true,
                    )
                }
            }
            PredictionContext::Array {
                parents,
                return_states,
                ..
            } => {
                let cached_parents: Vec<_> =
                    parents.iter().map(|p| self.get_cached(p, visited)).collect();
                let changed = cached_parents
                    .iter()
                    .zip(parents)
                    .any(|(a, b)| !Arc::ptr_eq(a, b));
                if changed {
                    (
                        PredictionContext::array(cached_parents, return_states.clone()),
                        true,
                    )
                } else {
                    (ctx.clone(), false)
                }
            }
        };

        let canonical = self.publish(rebuilt);
        visited.insert(ptr, canonical.clone());
        if changed {
            visited.insert(Arc::as_ptr(&canonical) as usize, canonical.clone());
        }
        canonical
    }
}
