//! Dependency-tracked computation graph.
//!
//! Inputs live in [`RootCell`]s, memoized derivations in [`DerivedCell`]s and
//! side effects in reactions created through [`Graph::autorun`] or
//! [`Graph::observe`]. Every cell is a node in one arena owned by a [`Graph`];
//! reads performed while a derivation runs are recorded as dependency edges
//! and replaced wholesale on each run.
//!
//! Invalidation is lazy. Writing a root only marks its dependents: direct
//! readers become dirty, transitive readers become possibly stale. Nothing is
//! recomputed until someone pulls a value with `get`, at which point the node
//! brings its own dependencies up to date first. A recomputed value equal to
//! the previous one stops the invalidation from travelling further.
//!
//! The graph is single-threaded (`Rc`/`RefCell`); recomputation always runs
//! synchronously on the caller's stack.

mod cell;
mod graph;
mod reaction;

pub use cell::{DerivedCell, Observable, RootCell};
pub use graph::{Graph, NodeId};
pub use reaction::Disposer;
