use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use super::graph::{Graph, NodeId, Refresh};

type Effect = Box<dyn FnMut()>;

pub(crate) struct ReactionNode {
    graph: Graph,
    id: NodeId,
    effect: RefCell<Effect>,
}

impl ReactionNode {
    pub(crate) fn new(graph: Graph, id: NodeId, effect: Effect) -> Self {
        Self {
            graph,
            id,
            effect: RefCell::new(effect),
        }
    }

    fn run(&self) {
        self.graph.begin_tracking(self.id);
        match self.effect.try_borrow_mut() {
            Ok(mut effect) => effect(),
            Err(_) => warn!(
                reaction = %self.graph.label_of(self.id),
                "reaction re-entered itself; skipping nested run"
            ),
        }
        self.graph.end_tracking(self.id);
        trace!(reaction = %self.graph.label_of(self.id), "reaction ran");
    }
}

impl Refresh for ReactionNode {
    fn refresh(&self) {
        // Reactions always hold a value (the side effect already happened),
        // so only a changed dependency makes them run again.
        if self.graph.needs_rerun(self.id, true) {
            self.run();
        }
    }
}

impl Drop for ReactionNode {
    fn drop(&mut self) {
        self.graph.remove(self.id);
    }
}

/// Owner of one registered reaction.
///
/// Dropping the disposer (or calling [`Disposer::dispose`]) unregisters the
/// reaction and unlinks it from every cell it read.
#[must_use = "dropping a Disposer immediately unregisters its reaction"]
pub struct Disposer {
    node: Rc<ReactionNode>,
}

impl Disposer {
    pub(crate) fn new(node: Rc<ReactionNode>) -> Self {
        Self { node }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn dispose(self) {
        trace!(reaction = %self.node.graph.label_of(self.node.id), "disposing reaction");
        drop(self);
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("id", &self.node.id)
            .finish()
    }
}
