use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chart_studio::ChartError;
use chart_studio::reactive::{DerivedCell, Graph};

#[test]
fn derived_cells_are_lazy_and_memoized() {
    let graph = Graph::new();
    let a = graph.root("a", 2);
    let doubled = {
        let a = a.clone();
        graph.derived("doubled", move || Ok(a.get() * 2))
    };

    assert_eq!(doubled.recompute_count(), 0);
    assert_eq!(doubled.get(), Ok(4));
    assert_eq!(doubled.get(), Ok(4));
    assert_eq!(doubled.recompute_count(), 1);

    a.set(5);
    assert_eq!(doubled.recompute_count(), 1);
    assert_eq!(doubled.get(), Ok(10));
    assert_eq!(doubled.recompute_count(), 2);
}

#[test]
fn setting_an_equal_value_does_not_invalidate() {
    let graph = Graph::new();
    let a = graph.root("a", 1);
    let plus_one = {
        let a = a.clone();
        graph.derived("plus_one", move || Ok(a.get() + 1))
    };
    assert_eq!(plus_one.get(), Ok(2));

    a.set(1);
    assert_eq!(plus_one.get(), Ok(2));
    assert_eq!(plus_one.recompute_count(), 1);
}

#[test]
fn equal_intermediate_value_stops_propagation() {
    let graph = Graph::new();
    let value = graph.root("value", 3i32);
    let sign = {
        let value = value.clone();
        graph.derived("sign", move || Ok(value.get().signum()))
    };
    let label = {
        let sign = sign.clone();
        graph.derived("label", move || {
            Ok(if sign.get()? < 0 { "negative" } else { "non-negative" })
        })
    };

    assert_eq!(label.get(), Ok("non-negative"));
    value.set(7);
    assert_eq!(label.get(), Ok("non-negative"));
    assert_eq!(sign.recompute_count(), 2);
    assert_eq!(label.recompute_count(), 1);

    value.set(-1);
    assert_eq!(label.get(), Ok("negative"));
    assert_eq!(label.recompute_count(), 2);
}

#[test]
fn conditional_reads_only_depend_on_the_latest_branch() {
    let graph = Graph::new();
    let use_left = graph.root("use_left", true);
    let left = graph.root("left", 1);
    let right = graph.root("right", 100);
    let picked = {
        let (use_left, left, right) = (use_left.clone(), left.clone(), right.clone());
        graph.derived("picked", move || {
            Ok(if use_left.get() { left.get() } else { right.get() })
        })
    };

    assert_eq!(picked.get(), Ok(1));
    assert_eq!(graph.dependency_count(picked.id()), 2);

    right.set(200);
    assert_eq!(picked.get(), Ok(1));
    assert_eq!(picked.recompute_count(), 1);

    use_left.set(false);
    assert_eq!(picked.get(), Ok(200));
    assert_eq!(graph.dependent_count(left.id()), 0);

    left.set(2);
    assert_eq!(picked.get(), Ok(200));
    assert_eq!(picked.recompute_count(), 2);
}

#[test]
fn autorun_reruns_only_on_relevant_changes() {
    let graph = Graph::new();
    let a = graph.root("a", 1);
    let b = graph.root("b", 1);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let _disposer = {
        let a = a.clone();
        let seen = Rc::clone(&seen);
        graph.autorun("record_a", move || seen.borrow_mut().push(a.get()))
    };

    a.set(2);
    b.set(5);
    a.set(3);
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
}

#[test]
fn batched_writes_are_seen_together() {
    let graph = Graph::new();
    let a = graph.root("a", 0);
    let b = graph.root("b", 0);
    let observed = Rc::new(RefCell::new(Vec::new()));

    let _disposer = {
        let (a, b) = (a.clone(), b.clone());
        let observed = Rc::clone(&observed);
        graph.autorun("pair", move || observed.borrow_mut().push((a.get(), b.get())))
    };

    graph.run_action(|| {
        a.set(1);
        assert!(graph.is_batching());
        b.set(1);
    });
    graph.run_action(|| {
        graph.run_action(|| a.set(2));
        b.set(2);
    });

    assert_eq!(*observed.borrow(), vec![(0, 0), (1, 1), (2, 2)]);
}

#[test]
fn derived_reads_inside_a_batch_see_earlier_writes() {
    let graph = Graph::new();
    let a = graph.root("a", 1);
    let squared = {
        let a = a.clone();
        graph.derived("squared", move || Ok(a.get() * a.get()))
    };

    let inside = graph.run_action(|| {
        a.set(4);
        squared.get()
    });
    assert_eq!(inside, Ok(16));
}

#[test]
fn observe_skips_the_initial_value() {
    let graph = Graph::new();
    let mode = graph.root("mode", "desktop");
    let changes = Rc::new(RefCell::new(Vec::new()));

    let disposer = {
        let changes = Rc::clone(&changes);
        graph.observe(&mode, move |value| {
            if let Ok(value) = value {
                changes.borrow_mut().push(*value);
            }
        })
    };

    mode.set("mobile");
    mode.set("mobile");
    mode.set("desktop");
    disposer.dispose();
    mode.set("mobile");

    assert_eq!(*changes.borrow(), vec!["mobile", "desktop"]);
}

#[test]
fn observe_callback_reads_are_not_tracked() {
    let graph = Graph::new();
    let watched = graph.root("watched", 0);
    let other = graph.root("other", 0);
    let calls = Rc::new(Cell::new(0));

    let _disposer = {
        let other = other.clone();
        let calls = Rc::clone(&calls);
        graph.observe(&watched, move |_| {
            let _ = other.get();
            calls.set(calls.get() + 1);
        })
    };

    watched.set(1);
    other.set(1);
    assert_eq!(calls.get(), 1);
}

#[test]
fn reaction_reading_a_changed_derivation_runs_once() {
    let graph = Graph::new();
    let a = graph.root("a", 1);
    let doubled = {
        let a = a.clone();
        graph.derived("doubled", move || Ok(a.get() * 2))
    };
    let runs = Rc::new(Cell::new(0));

    let _disposer = {
        let doubled = doubled.clone();
        let runs = Rc::clone(&runs);
        graph.autorun("watch_doubled", move || {
            let _ = doubled.get();
            runs.set(runs.get() + 1);
        })
    };

    a.set(2);
    a.set(3);
    assert_eq!(runs.get(), 3);
}

#[test]
fn disposing_unlinks_the_reaction() {
    let graph = Graph::new();
    let a = graph.root("a", 0);
    let runs = Rc::new(Cell::new(0));

    let disposer = {
        let a = a.clone();
        let runs = Rc::clone(&runs);
        graph.autorun("count", move || {
            let _ = a.get();
            runs.set(runs.get() + 1);
        })
    };
    assert_eq!(graph.dependent_count(a.id()), 1);

    drop(disposer);
    a.set(1);
    assert_eq!(runs.get(), 1);
    assert_eq!(graph.dependent_count(a.id()), 0);
}

#[test]
fn dropping_a_derived_cell_frees_its_node() {
    let graph = Graph::new();
    let a = graph.root("a", 1);
    let before = graph.node_count();

    let derived = {
        let a = a.clone();
        graph.derived("temporary", move || Ok(a.get() + 1))
    };
    assert_eq!(derived.get(), Ok(2));
    assert_eq!(graph.node_count(), before + 1);
    assert_eq!(graph.dependent_count(a.id()), 1);

    drop(derived);
    assert_eq!(graph.node_count(), before);
    assert_eq!(graph.dependent_count(a.id()), 0);
}

#[test]
fn self_reading_derivation_reports_a_cycle() {
    let graph = Graph::new();
    let slot: Rc<RefCell<Option<DerivedCell<i32>>>> = Rc::new(RefCell::new(None));
    let cyclic = {
        let slot = Rc::clone(&slot);
        graph.derived("cyclic", move || {
            let inner = slot.borrow().clone();
            match inner {
                Some(cell) => Ok(cell.get()? + 1),
                None => Ok(0),
            }
        })
    };
    *slot.borrow_mut() = Some(cyclic.clone());

    assert!(matches!(
        cyclic.get(),
        Err(ChartError::DependencyCycle { node }) if node == "cyclic"
    ));

    // Break the Rc cycle so the node is released.
    slot.borrow_mut().take();
}

#[test]
fn mutually_reading_derivations_report_a_cycle() {
    let graph = Graph::new();
    let slot: Rc<RefCell<Option<DerivedCell<i32>>>> = Rc::new(RefCell::new(None));
    let a = {
        let slot = Rc::clone(&slot);
        graph.derived("a", move || {
            let b = slot.borrow().clone();
            match b {
                Some(b) => Ok(b.get()? + 1),
                None => Ok(0),
            }
        })
    };
    let b = {
        let a = a.clone();
        graph.derived("b", move || Ok(a.get()? + 1))
    };
    *slot.borrow_mut() = Some(b.clone());

    assert!(matches!(
        a.get(),
        Err(ChartError::DependencyCycle { node }) if node == "a"
    ));
    assert!(matches!(b.get(), Err(ChartError::DependencyCycle { .. })));
    assert_eq!(a.recompute_count(), 1);

    let settled = (a.recompute_count(), b.recompute_count());
    for _ in 0..3 {
        assert_eq!(a.get(), b.get());
    }
    assert_eq!((a.recompute_count(), b.recompute_count()), settled);

    slot.borrow_mut().take();
}

#[test]
fn errors_are_memoized_until_an_input_changes() {
    let graph = Graph::new();
    let divisor = graph.root("divisor", 0);
    let quotient = {
        let divisor = divisor.clone();
        graph.derived("quotient", move || {
            let divisor = divisor.get();
            if divisor == 0 {
                return Err(ChartError::InvalidData("division by zero".to_owned()));
            }
            Ok(100 / divisor)
        })
    };

    assert!(quotient.get().is_err());
    assert!(quotient.get().is_err());
    assert_eq!(quotient.recompute_count(), 1);

    divisor.set(4);
    assert_eq!(quotient.get(), Ok(25));
}

#[test]
fn runaway_reactions_are_cut_off() {
    let graph = Graph::new();
    let counter = graph.root("counter", 0u32);

    let _disposer = {
        let counter = counter.clone();
        graph.autorun("increment_forever", move || {
            let value = counter.get();
            counter.set(value + 1);
        })
    };

    assert!(counter.get() <= 102);
    counter.set(0);
    assert!(counter.get() <= 102);
}

#[test]
fn untracked_reads_do_not_create_edges() {
    let graph = Graph::new();
    let tracked = graph.root("tracked", 1);
    let hidden = graph.root("hidden", 10);
    let sum = {
        let (tracked, hidden, graph) = (tracked.clone(), hidden.clone(), graph.clone());
        graph.clone().derived("sum", move || {
            Ok(tracked.get() + graph.untracked(|| hidden.get()))
        })
    };

    assert_eq!(sum.get(), Ok(11));
    hidden.set(20);
    assert_eq!(sum.get(), Ok(11));
    tracked.set(2);
    assert_eq!(sum.get(), Ok(22));
}

#[test]
fn update_mutates_in_place_and_invalidates() {
    let graph = Graph::new();
    let items = graph.root("items", vec![1, 2]);
    let total = {
        let items = items.clone();
        graph.derived("total", move || Ok(items.with(|items| items.iter().sum::<i32>())))
    };

    assert_eq!(total.get(), Ok(3));
    items.update(|items| items.push(4));
    assert_eq!(total.get(), Ok(7));
}
