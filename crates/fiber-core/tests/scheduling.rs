use std::sync::Arc;
use std::time::Duration;

use fiber_core::{
    build, leaf, Element, HostError, PropValue, Props, RenderError, RenderRoot, Runtime,
    SchedulerConfig, WorkStatus,
};
use fiber_testing::{run_turns, CountingScheduler, HostOp, RecordingHost, UnitBudget};

fn list(len: usize) -> Element {
    build(
        "ol",
        Props::new(),
        (0..len).map(|i| leaf("li", Props::new().with("index", i as i64))),
    )
    .unwrap()
}

fn counted_root() -> (RenderRoot<RecordingHost>, usize, Arc<CountingScheduler>) {
    let scheduler = Arc::new(CountingScheduler::new());
    let (host, container) = RecordingHost::with_container("root");
    let root = RenderRoot::with_runtime(host, Runtime::new(scheduler.clone()));
    (root, container, scheduler)
}

#[test]
fn turns_yield_on_budget_and_commit_once() {
    let (mut root, container, scheduler) = counted_root();
    // root fiber, ol, five items
    root.render(list(5), container).unwrap();
    assert_eq!(scheduler.requests(), 1);

    let log = run_turns(&mut root, 3, 10).unwrap();
    assert!(log.settled);
    assert_eq!(log.turns, 3);
    assert_eq!(log.yields, 2);
    assert_eq!(log.commits.len(), 1);
    assert_eq!(log.commits[0].placed, 6);
    // One request from the render, one per yield.
    assert_eq!(scheduler.requests(), 3);
    assert_eq!(root.backend().children(container).len(), 1);
}

#[test]
fn every_turn_makes_progress_even_when_out_of_time() {
    let (mut root, container, _) = counted_root();
    root.render(list(2), container).unwrap();
    let log = run_turns(&mut root, 0, 10).unwrap();
    assert_eq!(log.turns, 4);
    assert_eq!(log.yields, 3);
    assert_eq!(log.commits.len(), 1);
}

#[test]
fn continuation_resumes_where_the_turn_stopped() {
    let (mut root, container, _) = counted_root();
    root.render(list(3), container).unwrap();

    let WorkStatus::Yielded(first) = root.perform_work(&UnitBudget::units(2)).unwrap() else {
        panic!("expected a yield");
    };
    assert_eq!(root.next_unit_of_work(), Some(first.next_fiber()));
    assert_eq!(root.fiber(first.next_fiber()).unwrap().label(), "li");

    let WorkStatus::Yielded(second) = root.resume(first, &UnitBudget::units(1)).unwrap() else {
        panic!("expected a yield");
    };
    assert_eq!(second.pass(), first.pass());
    assert_eq!(
        root.resume(first, &UnitBudget::units(100)),
        Err(RenderError::StaleContinuation)
    );
    assert!(matches!(
        root.resume(second, &UnitBudget::units(100)),
        Ok(WorkStatus::Committed(_))
    ));
    assert_eq!(root.perform_work(&UnitBudget::units(1)), Ok(WorkStatus::Idle));
}

#[test]
fn render_during_a_pass_is_rejected() {
    let (mut root, container, _) = counted_root();
    root.render(list(3), container).unwrap();
    let _ = root.perform_work(&UnitBudget::units(1)).unwrap();

    assert_eq!(root.render(list(1), container), Err(RenderError::PassInProgress));
    let reports = root.flush().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(root.backend().children(root.backend().children(container)[0]).len(), 3);
}

#[test]
fn yield_threshold_comes_from_config() {
    let (root, container, _) = counted_root();
    let config = SchedulerConfig::default().with_yield_threshold(Duration::from_millis(5));
    let mut root = root.with_config(config);
    root.render(list(1), container).unwrap();

    // 3ms left is below the 5ms threshold: one unit only.
    let status = root.perform_work(&|| Duration::from_millis(3)).unwrap();
    assert!(matches!(status, WorkStatus::Yielded(_)));
    let status = root.perform_work(&|| Duration::from_millis(5)).unwrap();
    assert!(matches!(status, WorkStatus::Committed(_)));
}

#[test]
fn backend_failure_abandons_the_pass() {
    let (mut root, container, _) = counted_root();
    root.render(list(1), container).unwrap();
    root.flush().unwrap();
    let committed = root.committed_fibers();

    root.backend_mut().fail_on(HostOp::CreateNode);
    root.render(list(2), container).unwrap();
    let err = root.flush().unwrap_err();
    assert!(
        matches!(err, RenderError::Host(HostError::Rejected { op: "create_node", .. })),
        "{err}"
    );
    assert!(root.work_in_progress().is_none());
    assert_eq!(root.committed_fibers(), committed);

    root.backend_mut().clear_failure();
    root.render(list(2), container).unwrap();
    root.flush().unwrap();
    let ol = root.backend().children(container)[0];
    assert_eq!(root.backend().children(ol).len(), 2);
}

#[test]
fn commit_is_not_transactional() {
    let (mut root, container, _) = counted_root();
    root.backend_mut().fail_on(HostOp::InsertChild);
    root.render(list(1), container).unwrap();
    assert!(root.flush().is_err());
    // Nodes made during traversal are released with the failed tree.
    assert_eq!(root.backend().count(HostOp::CreateNode), 2);
    assert_eq!(root.backend().count(HostOp::RemoveNode), 2);
    assert_eq!(root.backend().len(), 1);
    assert!(root.current_root().is_none());
    assert_eq!(root.fiber_count(), 0);
}

fn items(ids: &[&str]) -> Element {
    build(
        "ul",
        Props::new(),
        ids.iter().map(|id| leaf("li", Props::new().with("id", *id))),
    )
    .unwrap()
}

#[test]
fn root_remounts_after_a_failed_commit() {
    let (mut root, container, _) = counted_root();
    root.render(items(&["a", "b"]), container).unwrap();
    root.flush().unwrap();

    // Both items are removed before the span insert fails.
    root.backend_mut().fail_on(HostOp::InsertChild);
    let replacement = build("ul", Props::new(), [leaf("span", Props::new())]).unwrap();
    root.render(replacement, container).unwrap();
    let err = root.flush().unwrap_err();
    assert!(
        matches!(err, RenderError::Host(HostError::Rejected { op: "insert_child", .. })),
        "{err}"
    );
    assert!(root.current_root().is_none());
    assert!(root.work_in_progress().is_none());
    assert_eq!(root.fiber_count(), 0);
    assert!(root.backend().children(container).is_empty());
    assert_eq!(root.backend().len(), 1);

    root.backend_mut().clear_failure();
    root.render(items(&["a"]), container).unwrap();
    let reports = root.flush().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].placed, 2);
    assert_eq!(root.backend().children(container).len(), 1);
    let ul = root.backend().children(container)[0];
    assert_eq!(root.backend().children(ul).len(), 1);
    let li = root.backend().children(ul)[0];
    assert_eq!(
        root.backend().node(li).unwrap().attribute("id"),
        Some(&PropValue::from("a"))
    );

    // Diffing picks up from the remounted tree.
    root.render(items(&["a"]), container).unwrap();
    let reports = root.flush().unwrap();
    assert_eq!(reports[0].updated, 2);
    assert_eq!(reports[0].mutations, 0);
}
