//! Generic depth-first CST walker driving all generators.
//!
//! The walk is iterative: an explicit stack holds each pending node together
//! with persistent snapshots of the generated-handle and state stacks that
//! were in force when it was scheduled. The snapshots are `im::Vector`s, so
//! pushing for one subtree never leaks into a sibling's view.
//!
//! Handlers are plain functions keyed by node name. A handler may expose a
//! new generated handle for its children, push a state frame, or stop descent
//! into its subtree. Nodes without a handler are transparent: children see
//! the same handle and state their parent saw.

use std::collections::HashMap;

use im::Vector;

use crate::grammar::cst::{CstNode, NodeName};
use crate::timing::{time, TimingInfo};

/// What a handler wants the walk to do next.
pub struct VisitOutcome<G, S> {
    /// New generated handle for this subtree; `None` keeps the parent's.
    pub generated: Option<G>,
    /// New state frame for this subtree; `None` keeps the parent's.
    pub state: Option<S>,
    /// When set, the node's children are not visited.
    pub stop: bool,
}

impl<G, S> VisitOutcome<G, S> {
    pub fn pass() -> Self {
        VisitOutcome {
            generated: None,
            state: None,
            stop: false,
        }
    }

    pub fn stop() -> Self {
        VisitOutcome {
            generated: None,
            state: None,
            stop: true,
        }
    }

    pub fn descend(generated: G) -> Self {
        VisitOutcome {
            generated: Some(generated),
            state: None,
            stop: false,
        }
    }

    pub fn with_state(mut self, state: S) -> Self {
        self.state = Some(state);
        self
    }
}

/// Everything a handler can see: the node, its CST ancestry (nearest first),
/// the innermost generated handle and state frame, and the full stacks of
/// both for handlers that need an outer ancestor's frame.
pub struct VisitInput<'t, G, S> {
    pub node: &'t CstNode,
    pub parents: &'t [&'t CstNode],
    pub generated: Option<&'t G>,
    pub state: Option<&'t S>,
    /// Every generated handle in force at this node, innermost first.
    pub generated_stack: &'t Vector<G>,
    /// Every state frame in force at this node, innermost first.
    pub state_stack: &'t Vector<S>,
}

impl<'t, G, S> VisitInput<'t, G, S> {
    /// The innermost generated handle; panics when none was installed.
    /// Handlers reached only below a handle-producing ancestor may use this.
    pub fn parent(&self) -> &G {
        self.generated
            .expect("visit handler requires a generated parent handle")
    }
}

pub type VisitFn<C, G, S> = fn(&mut C, VisitInput<'_, G, S>) -> VisitOutcome<G, S>;

/// Statistics from one walk.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkReport {
    /// Handler invocations (nodes without a handler are not counted).
    pub visits: usize,
    pub walk_time: TimingInfo,
}

/// A reusable handler table over a mutable builder context `C`.
pub struct TreeFold<C, G, S> {
    handlers: HashMap<NodeName, VisitFn<C, G, S>>,
}

impl<C, G: Clone, S: Clone> TreeFold<C, G, S> {
    pub fn new() -> Self {
        TreeFold {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for nodes named `name`, replacing any previous
    /// registration.
    pub fn on(mut self, name: NodeName, handler: VisitFn<C, G, S>) -> Self {
        self.handlers.insert(name, handler);
        self
    }

    /// Walks `root` pre-order, threading `ctx` through every handler.
    pub fn run(
        &self,
        root: &CstNode,
        ctx: &mut C,
        generated: Option<G>,
        state: Option<S>,
    ) -> WalkReport {
        struct Frame<'t, G, S> {
            node: &'t CstNode,
            parents: Vector<&'t CstNode>,
            generated: Vector<G>,
            states: Vector<S>,
        }

        let timer = time(Some("walk"));
        let mut visits = 0usize;

        let mut stack = vec![Frame {
            node: root,
            parents: Vector::new(),
            generated: generated.into_iter().collect(),
            states: state.into_iter().collect(),
        }];

        while let Some(frame) = stack.pop() {
            let Frame {
                node,
                parents,
                mut generated,
                mut states,
            } = frame;

            let mut stop = false;
            if let Some(handler) = self.handlers.get(&node.name()) {
                let parent_refs: Vec<&CstNode> = parents.iter().copied().collect();
                let input = VisitInput {
                    node,
                    parents: &parent_refs,
                    generated: generated.front(),
                    state: states.front(),
                    generated_stack: &generated,
                    state_stack: &states,
                };
                let outcome = handler(ctx, input);
                visits += 1;

                if let Some(handle) = outcome.generated {
                    generated.push_front(handle);
                }
                if let Some(state) = outcome.state {
                    states.push_front(state);
                }
                stop = outcome.stop;
            }

            if stop {
                continue;
            }

            let children = node.children();
            if children.is_empty() {
                continue;
            }

            let mut child_parents = parents.clone();
            child_parents.push_front(node);

            // Reverse so the stack pops children in source order.
            for (_, child) in children.iter().rev() {
                stack.push(Frame {
                    node: child,
                    parents: child_parents.clone(),
                    generated: generated.clone(),
                    states: states.clone(),
                });
            }
        }

        WalkReport {
            visits,
            walk_time: timer.stop(),
        }
    }
}

impl<C, G: Clone, S: Clone> Default for TreeFold<C, G, S> {
    fn default() -> Self {
        TreeFold::new()
    }
}
