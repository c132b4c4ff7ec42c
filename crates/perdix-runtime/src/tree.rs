//! Parse-tree nodes built by the interpreter.
//!
//! Rule contexts form a tree with strong child links and weak parent
//! links; the interpreter pins the root (and the recursion parent stack)
//! so the whole tree stays alive during a parse.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use perdix_atn::{RuleIndex, StateNumber};
use perdix_core::token::Token;

use crate::error::RecognitionError;

/// Shared handle to a rule context.
pub type CtxRef = Rc<RefCell<RuleContext>>;

/// A rule-invocation node.
///
/// `invoking_state` is the caller's state whose rule transition entered
/// this context; the root context has none.
#[derive(Debug)]
pub struct RuleContext {
    pub parent: Option<Weak<RefCell<RuleContext>>>,
    pub invoking_state: Option<StateNumber>,
    pub rule: RuleIndex,
    pub start: Option<Token>,
    pub stop: Option<Token>,
    pub children: Vec<ParseTree>,
    /// Recognition error this context completed under, if any.
    pub exception: Option<RecognitionError>,
}

/// A child slot of a rule context.
#[derive(Clone, Debug)]
pub enum ParseTree {
    Rule(CtxRef),
    Terminal(Token),
    /// Token inserted or resynchronized by error recovery.
    Error(Token),
}

/// Create a context and link it under `parent` (weakly).
pub fn new_ctx(parent: Option<&CtxRef>, invoking_state: Option<StateNumber>, rule: RuleIndex) -> CtxRef {
    Rc::new(RefCell::new(RuleContext {
        parent: parent.map(Rc::downgrade),
        invoking_state,
        rule,
        start: None,
        stop: None,
        children: Vec::new(),
        exception: None,
    }))
}

impl RuleContext {
    pub fn add_child(&mut self, child: ParseTree) {
        self.children.push(child);
    }

    /// Parent handle, if the parent is still alive.
    pub fn parent_ctx(&self) -> Option<CtxRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }
}

/// Invoking states from `ctx` outward, innermost first. The root
/// context contributes nothing.
pub fn invoking_chain(ctx: &CtxRef) -> Vec<StateNumber> {
    let mut chain = Vec::new();
    let mut cursor = Some(ctx.clone());
    while let Some(current) = cursor {
        let node = current.borrow();
        if let Some(state) = node.invoking_state {
            chain.push(state);
        }
        cursor = node.parent_ctx();
    }
    chain
}

/// Lisp-style rendering, e.g. `(s x = 3)`.
pub fn to_string_tree(tree: &ParseTree, rule_names: &[String]) -> String {
    match tree {
        ParseTree::Terminal(token) | ParseTree::Error(token) => token.text.clone(),
        ParseTree::Rule(ctx) => {
            let node = ctx.borrow();
            let name = rule_names
                .get(node.rule)
                .map(String::as_str)
                .unwrap_or("<unknown>");
            if node.children.is_empty() {
                return name.to_string();
            }
            let mut out = format!("({name}");
            for child in &node.children {
                out.push(' ');
                out.push_str(&to_string_tree(child, rule_names));
            }
            out.push(')');
            out
        }
    }
}
