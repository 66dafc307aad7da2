use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::{error, trace, warn};

use super::cell::{DerivedCell, DerivedNode, Observable, RootCell};
use super::reaction::{Disposer, ReactionNode};
use crate::error::ChartResult;

/// Upper bound on reaction flush rounds before a feedback loop is cut off.
const MAX_REACTION_ITERATIONS: usize = 100;

/// Generational handle of one node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Freshness of a node. Ordering matters: marks only ever raise the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum NodeState {
    Clean,
    /// Some transitive dependency changed; direct dependencies must be checked.
    Check,
    /// A direct dependency changed.
    Dirty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Root,
    Derived,
    Reaction,
}

/// Type-erased hook the graph uses to pull a node up to date.
pub(crate) trait Refresh {
    fn refresh(&self);
}

pub(crate) type Edges = SmallVec<[NodeId; 4]>;

struct NodeEntry {
    kind: NodeKind,
    label: Cow<'static, str>,
    state: NodeState,
    computing: bool,
    dependencies: Edges,
    dependents: Edges,
    refresher: Option<Weak<dyn Refresh>>,
}

struct Slot {
    generation: u32,
    entry: Option<NodeEntry>,
}

/// Reads recorded while one derivation or reaction runs.
struct TrackingFrame {
    owner: Option<NodeId>,
    reads: Edges,
}

#[derive(Default)]
struct GraphState {
    slots: Vec<Slot>,
    free: Vec<u32>,
    frames: Vec<TrackingFrame>,
    batch_depth: usize,
    flushing: bool,
    pending: Vec<NodeId>,
}

impl GraphState {
    fn insert(&mut self, kind: NodeKind, label: Cow<'static, str>, state: NodeState) -> NodeId {
        let entry = NodeEntry {
            kind,
            label,
            state,
            computing: false,
            dependencies: Edges::new(),
            dependents: Edges::new(),
            refresher: None,
        };

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn entry(&self, id: NodeId) -> Option<&NodeEntry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut NodeEntry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    fn remove(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        let Some(entry) = slot.entry.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        for dependency in &entry.dependencies {
            if let Some(dep) = self.entry_mut(*dependency) {
                dep.dependents.retain(|d| *d != id);
            }
        }
        for dependent in &entry.dependents {
            if let Some(dep) = self.entry_mut(*dependent) {
                dep.dependencies.retain(|d| *d != id);
            }
        }
        self.pending.retain(|p| *p != id);
        trace!(node = %entry.label, "removed graph node");
    }

    fn mark(&mut self, id: NodeId, state: NodeState) {
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        if entry.state >= state {
            return;
        }
        let was_clean = entry.state == NodeState::Clean;
        entry.state = state;
        if !was_clean {
            // Dependents were already marked when this node first went stale.
            return;
        }
        let is_reaction = entry.kind == NodeKind::Reaction;
        let dependents = entry.dependents.clone();
        if is_reaction {
            self.pending.push(id);
        }
        for dependent in dependents {
            self.mark(dependent, NodeState::Check);
        }
    }

    fn mark_dependents(&mut self, id: NodeId, state: NodeState) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let dependents = entry.dependents.clone();
        for dependent in dependents {
            self.mark(dependent, state);
        }
    }

    fn rebind(&mut self, id: NodeId, reads: Edges) {
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        let previous = std::mem::replace(&mut entry.dependencies, reads.clone());

        for stale in previous.iter().filter(|old| !reads.contains(old)) {
            if let Some(dep) = self.entry_mut(*stale) {
                dep.dependents.retain(|d| *d != id);
            }
        }
        for fresh in reads.iter().filter(|new| !previous.contains(new)) {
            if let Some(dep) = self.entry_mut(*fresh) {
                dep.dependents.push(id);
            }
        }
    }
}

/// Handle to one computation graph.
///
/// Cloning the handle is cheap and every clone addresses the same arena.
/// All cells created from a graph must only be read through that graph.
#[derive(Clone, Default)]
pub struct Graph {
    state: Rc<RefCell<GraphState>>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Graph")
            .field("nodes", &(state.slots.len() - state.free.len()))
            .field("batch_depth", &state.batch_depth)
            .field("pending_reactions", &state.pending.len())
            .finish()
    }
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mutable input cell.
    pub fn root<T>(&self, label: impl Into<Cow<'static, str>>, initial: T) -> RootCell<T>
    where
        T: Clone + PartialEq + 'static,
    {
        let id = self
            .state
            .borrow_mut()
            .insert(NodeKind::Root, label.into(), NodeState::Clean);
        RootCell::new(self.clone(), id, initial)
    }

    /// Creates a memoized derivation.
    ///
    /// `compute` runs lazily on the first `get` and again only after one of
    /// the cells it read during its latest run changed. It must not write to
    /// roots.
    pub fn derived<T, F>(&self, label: impl Into<Cow<'static, str>>, compute: F) -> DerivedCell<T>
    where
        T: Clone + PartialEq + 'static,
        F: Fn() -> ChartResult<T> + 'static,
    {
        let id = self
            .state
            .borrow_mut()
            .insert(NodeKind::Derived, label.into(), NodeState::Dirty);
        let node = Rc::new(DerivedNode::new(self.clone(), id, Box::new(compute)));
        let refresher: Weak<dyn Refresh> = Rc::downgrade(&node) as Weak<dyn Refresh>;
        self.attach_refresher(id, refresher);
        DerivedCell::from_node(node)
    }

    /// Runs `effect` now and again whenever a cell it read changes.
    pub fn autorun<F>(&self, label: impl Into<Cow<'static, str>>, effect: F) -> Disposer
    where
        F: FnMut() + 'static,
    {
        let id = self
            .state
            .borrow_mut()
            .insert(NodeKind::Reaction, label.into(), NodeState::Dirty);
        let node = Rc::new(ReactionNode::new(self.clone(), id, Box::new(effect)));
        let refresher: Weak<dyn Refresh> = Rc::downgrade(&node) as Weak<dyn Refresh>;
        self.attach_refresher(id, refresher);
        node.refresh();
        Disposer::new(node)
    }

    /// Calls `callback` every time the value of `cell` changes after registration.
    ///
    /// Reads performed inside `callback` are not tracked.
    pub fn observe<T, C, F>(&self, cell: &C, mut callback: F) -> Disposer
    where
        T: 'static,
        C: Observable<T> + Clone + 'static,
        F: FnMut(&ChartResult<T>) + 'static,
    {
        let cell = cell.clone();
        let graph = self.clone();
        let mut primed = false;
        let label = format!("observe({})", self.label_of(cell.node_id()));
        self.autorun(label, move || {
            let value = cell.read();
            if primed {
                graph.untracked(|| callback(&value));
            } else {
                primed = true;
            }
        })
    }

    /// Applies every write made by `action` before any reaction runs.
    ///
    /// Nested actions join the outermost batch. Reads of derived cells inside
    /// the batch already see the writes made so far.
    pub fn run_action<R>(&self, action: impl FnOnce() -> R) -> R {
        let batch = BatchGuard::enter(self);
        let out = action();
        if batch.exit() == 0 {
            self.flush_reactions();
        }
        out
    }

    /// Runs `f` without recording its reads as dependencies of the caller.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        self.state.borrow_mut().frames.push(TrackingFrame {
            owner: None,
            reads: Edges::new(),
        });
        let out = f();
        self.state.borrow_mut().frames.pop();
        out
    }

    /// Number of live nodes (roots, derivations and reactions).
    #[must_use]
    pub fn node_count(&self) -> usize {
        let state = self.state.borrow();
        state.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    #[must_use]
    pub fn is_batching(&self) -> bool {
        self.state.borrow().batch_depth > 0
    }

    /// Number of dependency edges recorded for `id` during its latest run.
    #[must_use]
    pub fn dependency_count(&self, id: NodeId) -> usize {
        self.state
            .borrow()
            .entry(id)
            .map_or(0, |entry| entry.dependencies.len())
    }

    /// Number of nodes that read `id` during their latest run.
    #[must_use]
    pub fn dependent_count(&self, id: NodeId) -> usize {
        self.state
            .borrow()
            .entry(id)
            .map_or(0, |entry| entry.dependents.len())
    }

    pub(crate) fn label_of(&self, id: NodeId) -> String {
        self.state
            .borrow()
            .entry(id)
            .map_or_else(|| "<removed>".to_owned(), |entry| entry.label.to_string())
    }

    fn attach_refresher(&self, id: NodeId, refresher: Weak<dyn Refresh>) {
        if let Some(entry) = self.state.borrow_mut().entry_mut(id) {
            entry.refresher = Some(refresher);
        }
    }

    pub(crate) fn report_read(&self, id: NodeId) {
        let mut state = self.state.borrow_mut();
        if let Some(frame) = state.frames.last_mut() {
            if frame.owner.is_some() && frame.owner != Some(id) && !frame.reads.contains(&id) {
                frame.reads.push(id);
            }
        }
    }

    pub(crate) fn status(&self, id: NodeId) -> Option<(NodeState, bool)> {
        self.state
            .borrow()
            .entry(id)
            .map(|entry| (entry.state, entry.computing))
    }

    pub(crate) fn set_clean(&self, id: NodeId) {
        if let Some(entry) = self.state.borrow_mut().entry_mut(id) {
            entry.state = NodeState::Clean;
        }
    }

    pub(crate) fn dependencies(&self, id: NodeId) -> Edges {
        self.state
            .borrow()
            .entry(id)
            .map(|entry| entry.dependencies.clone())
            .unwrap_or_default()
    }

    /// Pulls a node up to date. Roots are always current.
    pub(crate) fn refresh_node(&self, id: NodeId) {
        let refresher = {
            let state = self.state.borrow();
            state
                .entry(id)
                .and_then(|entry| entry.refresher.as_ref())
                .and_then(Weak::upgrade)
        };
        if let Some(refresher) = refresher {
            refresher.refresh();
        }
    }

    /// Brings `id` up to date if any of its direct dependencies changed.
    ///
    /// Returns `true` when the caller has to rerun the node.
    pub(crate) fn needs_rerun(&self, id: NodeId, has_value: bool) -> bool {
        let Some((state, computing)) = self.status(id) else {
            return false;
        };
        if computing {
            return false;
        }
        match state {
            NodeState::Dirty => true,
            NodeState::Clean => !has_value,
            NodeState::Check => {
                for dependency in self.dependencies(id) {
                    self.refresh_node(dependency);
                    if matches!(self.status(id), Some((NodeState::Dirty, _))) {
                        return true;
                    }
                }
                self.set_clean(id);
                !has_value
            }
        }
    }

    pub(crate) fn begin_tracking(&self, id: NodeId) {
        let mut state = self.state.borrow_mut();
        if let Some(entry) = state.entry_mut(id) {
            entry.state = NodeState::Clean;
            entry.computing = true;
        }
        state.frames.push(TrackingFrame {
            owner: Some(id),
            reads: Edges::new(),
        });
    }

    /// Closes the frame opened by `begin_tracking` and swaps in the new edges.
    pub(crate) fn end_tracking(&self, id: NodeId) {
        let mut state = self.state.borrow_mut();
        let reads = match state.frames.pop() {
            Some(frame) if frame.owner == Some(id) => frame.reads,
            Some(frame) => {
                error!(
                    node = ?id,
                    owner = ?frame.owner,
                    "tracking frame mismatch; dropping recorded reads"
                );
                Edges::new()
            }
            None => Edges::new(),
        };
        if let Some(entry) = state.entry_mut(id) {
            entry.computing = false;
        }
        state.rebind(id, reads);
    }

    /// Called after a derivation produced a new value.
    pub(crate) fn mark_dependents_dirty(&self, id: NodeId) {
        let mut state = self.state.borrow_mut();
        let Some(entry) = state.entry(id) else {
            return;
        };
        let dependents = entry.dependents.clone();
        for dependent in dependents {
            // A reader that is running right now already gets the new value.
            if state.entry(dependent).is_some_and(|entry| entry.computing) {
                continue;
            }
            state.mark(dependent, NodeState::Dirty);
        }
    }

    pub(crate) fn root_changed(&self, id: NodeId) {
        {
            let mut state = self.state.borrow_mut();
            let owner = state.frames.last().and_then(|frame| frame.owner);
            if owner
                .and_then(|owner| state.entry(owner))
                .is_some_and(|entry| entry.kind == NodeKind::Derived)
            {
                let label = state
                    .entry(id)
                    .map_or_else(String::new, |entry| entry.label.to_string());
                warn!(root = %label, "root written while a derivation is running");
            }
            state.mark_dependents(id, NodeState::Dirty);
        }
        self.flush_reactions();
    }

    pub(crate) fn remove(&self, id: NodeId) {
        // A node can be dropped while the graph is mid-borrow only during
        // teardown of the graph itself; skip unlinking then.
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.remove(id);
        }
    }

    fn flush_reactions(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.batch_depth > 0 || state.flushing {
                return;
            }
            state.flushing = true;
        }

        let mut iterations = 0usize;
        loop {
            let pending = std::mem::take(&mut self.state.borrow_mut().pending);
            if pending.is_empty() {
                break;
            }
            iterations += 1;
            if iterations > MAX_REACTION_ITERATIONS {
                let mut state = self.state.borrow_mut();
                error!(
                    iterations,
                    pending = pending.len(),
                    "reactions kept invalidating each other; dropping pending runs"
                );
                for id in pending {
                    if let Some(entry) = state.entry_mut(id) {
                        entry.state = NodeState::Clean;
                    }
                }
                break;
            }
            for id in pending {
                self.refresh_node(id);
            }
        }

        self.state.borrow_mut().flushing = false;
    }
}

/// Keeps the batch depth balanced even if the action unwinds.
struct BatchGuard<'a> {
    graph: &'a Graph,
    active: bool,
}

impl<'a> BatchGuard<'a> {
    fn enter(graph: &'a Graph) -> Self {
        graph.state.borrow_mut().batch_depth += 1;
        Self {
            graph,
            active: true,
        }
    }

    fn exit(mut self) -> usize {
        self.active = false;
        let mut state = self.graph.state.borrow_mut();
        state.batch_depth = state.batch_depth.saturating_sub(1);
        state.batch_depth
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            if let Ok(mut state) = self.graph.state.try_borrow_mut() {
                state.batch_depth = state.batch_depth.saturating_sub(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_slots_are_reused_with_a_new_generation() {
        let mut state = GraphState::default();
        let first = state.insert(NodeKind::Root, "a".into(), NodeState::Clean);
        state.remove(first);
        let second = state.insert(NodeKind::Root, "b".into(), NodeState::Clean);

        assert_eq!(first.index, second.index);
        assert_ne!(first.generation, second.generation);
        assert!(state.entry(first).is_none());
        assert!(state.entry(second).is_some());
    }

    #[test]
    fn mark_escalates_direct_dependents_and_checks_transitive_ones() {
        let mut state = GraphState::default();
        let root = state.insert(NodeKind::Root, "root".into(), NodeState::Clean);
        let middle = state.insert(NodeKind::Derived, "middle".into(), NodeState::Clean);
        let leaf = state.insert(NodeKind::Reaction, "leaf".into(), NodeState::Clean);
        state.rebind(middle, Edges::from_slice(&[root]));
        state.rebind(leaf, Edges::from_slice(&[middle]));

        state.mark_dependents(root, NodeState::Dirty);

        assert_eq!(state.entry(middle).map(|e| e.state), Some(NodeState::Dirty));
        assert_eq!(state.entry(leaf).map(|e| e.state), Some(NodeState::Check));
        assert_eq!(state.pending, vec![leaf]);
    }

    #[test]
    fn rebind_drops_edges_that_were_not_read_again() {
        let mut state = GraphState::default();
        let a = state.insert(NodeKind::Root, "a".into(), NodeState::Clean);
        let b = state.insert(NodeKind::Root, "b".into(), NodeState::Clean);
        let node = state.insert(NodeKind::Derived, "node".into(), NodeState::Clean);

        state.rebind(node, Edges::from_slice(&[a, b]));
        state.rebind(node, Edges::from_slice(&[b]));

        assert!(state.entry(a).is_some_and(|e| e.dependents.is_empty()));
        assert_eq!(
            state.entry(b).map(|e| e.dependents.to_vec()),
            Some(vec![node])
        );
    }

    #[test]
    fn removing_a_node_unlinks_it_from_both_sides() {
        let mut state = GraphState::default();
        let root = state.insert(NodeKind::Root, "root".into(), NodeState::Clean);
        let middle = state.insert(NodeKind::Derived, "middle".into(), NodeState::Clean);
        let leaf = state.insert(NodeKind::Derived, "leaf".into(), NodeState::Clean);
        state.rebind(middle, Edges::from_slice(&[root]));
        state.rebind(leaf, Edges::from_slice(&[middle]));

        state.remove(middle);

        assert!(state.entry(root).is_some_and(|e| e.dependents.is_empty()));
        assert!(state.entry(leaf).is_some_and(|e| e.dependencies.is_empty()));
    }
}
