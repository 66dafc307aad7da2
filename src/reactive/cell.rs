use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{error, trace};

use super::graph::{Graph, NodeId, Refresh};
use crate::error::{ChartError, ChartResult};

/// Anything whose current value can be read (and tracked) through the graph.
pub trait Observable<T> {
    fn read(&self) -> ChartResult<T>;

    fn node_id(&self) -> NodeId;
}

/// Mutable input of the graph.
///
/// `set` marks every transitive reader stale but recomputes nothing.
pub struct RootCell<T> {
    inner: Rc<RootInner<T>>,
}

struct RootInner<T> {
    graph: Graph,
    id: NodeId,
    value: RefCell<T>,
}

impl<T> Drop for RootInner<T> {
    fn drop(&mut self) {
        self.graph.remove(self.id);
    }
}

impl<T> Clone for RootCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RootCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootCell")
            .field("id", &self.inner.id)
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

impl<T> RootCell<T>
where
    T: Clone + PartialEq + 'static,
{
    pub(crate) fn new(graph: Graph, id: NodeId, initial: T) -> Self {
        Self {
            inner: Rc::new(RootInner {
                graph,
                id,
                value: RefCell::new(initial),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.inner.graph.report_read(self.inner.id);
        self.inner.value.borrow().clone()
    }

    /// Reads the value by reference, still recording the dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.graph.report_read(self.inner.id);
        f(&self.inner.value.borrow())
    }

    /// Writes a new value. Equal values leave the graph untouched.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        trace!(root = %self.inner.graph.label_of(self.inner.id), "root cell updated");
        self.inner.graph.root_changed(self.inner.id);
    }

    /// Mutates the value in place and always invalidates readers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.inner.value.borrow_mut());
        self.inner.graph.root_changed(self.inner.id);
    }
}

impl<T> Observable<T> for RootCell<T>
where
    T: Clone + PartialEq + 'static,
{
    fn read(&self) -> ChartResult<T> {
        Ok(self.get())
    }

    fn node_id(&self) -> NodeId {
        self.inner.id
    }
}

/// Memoized value computed from other cells.
pub struct DerivedCell<T> {
    node: Rc<DerivedNode<T>>,
}

impl<T> Clone for DerivedCell<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DerivedCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedCell")
            .field("id", &self.node.id)
            .field("cached", &self.node.value.borrow())
            .field("recomputes", &self.node.recomputes.get())
            .finish()
    }
}

type Compute<T> = Box<dyn Fn() -> ChartResult<T>>;

pub(crate) struct DerivedNode<T> {
    graph: Graph,
    id: NodeId,
    compute: Compute<T>,
    value: RefCell<Option<ChartResult<T>>>,
    recomputes: Cell<u64>,
}

impl<T> Drop for DerivedNode<T> {
    fn drop(&mut self) {
        self.graph.remove(self.id);
    }
}

impl<T> DerivedNode<T>
where
    T: Clone + PartialEq + 'static,
{
    pub(crate) fn new(graph: Graph, id: NodeId, compute: Compute<T>) -> Self {
        Self {
            graph,
            id,
            compute,
            value: RefCell::new(None),
            recomputes: Cell::new(0),
        }
    }

    fn update_if_necessary(&self) {
        let has_value = self.value.borrow().is_some();
        if self.graph.needs_rerun(self.id, has_value) {
            self.recompute();
        }
    }

    fn recompute(&self) {
        self.graph.begin_tracking(self.id);
        let result = (self.compute)();
        self.graph.end_tracking(self.id);
        self.recomputes.set(self.recomputes.get() + 1);

        let changed = {
            let mut slot = self.value.borrow_mut();
            let changed = slot.as_ref() != Some(&result);
            *slot = Some(result);
            changed
        };
        trace!(
            node = %self.graph.label_of(self.id),
            changed,
            recomputes = self.recomputes.get(),
            "recomputed derived cell"
        );
        if changed {
            self.graph.mark_dependents_dirty(self.id);
        }
    }
}

impl<T> Refresh for DerivedNode<T>
where
    T: Clone + PartialEq + 'static,
{
    fn refresh(&self) {
        self.update_if_necessary();
    }
}

impl<T> DerivedCell<T>
where
    T: Clone + PartialEq + 'static,
{
    pub(crate) fn from_node(node: Rc<DerivedNode<T>>) -> Self {
        Self { node }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Returns the memoized value, recomputing first if an input changed.
    ///
    /// A failed computation is cached like a value and returned again until
    /// one of its inputs changes.
    pub fn get(&self) -> ChartResult<T> {
        let node = &self.node;
        node.graph.report_read(node.id);

        if matches!(node.graph.status(node.id), Some((_, true))) {
            let label = node.graph.label_of(node.id);
            error!(node = %label, "dependency cycle detected");
            return Err(ChartError::DependencyCycle { node: label });
        }

        node.update_if_necessary();
        match &*node.value.borrow() {
            Some(result) => result.clone(),
            None => Err(ChartError::InvalidData(format!(
                "derived cell `{}` has no value",
                node.graph.label_of(node.id)
            ))),
        }
    }

    /// How many times the derivation has run so far.
    #[must_use]
    pub fn recompute_count(&self) -> u64 {
        self.node.recomputes.get()
    }
}

impl<T> Observable<T> for DerivedCell<T>
where
    T: Clone + PartialEq + 'static,
{
    fn read(&self) -> ChartResult<T> {
        self.get()
    }

    fn node_id(&self) -> NodeId {
        self.node.id
    }
}
