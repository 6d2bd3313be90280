mod common;

use common::{board, controller, Reply};
use taskers::{
    ControllerOptions, Intent, NewTask, ReorderPreview, RollbackPolicy, SettleOutcome, TaskId,
};

fn revert() -> ControllerOptions {
    ControllerOptions {
        rollback: RollbackPolicy::Revert,
        ..ControllerOptions::default()
    }
}

#[tokio::test]
async fn test_drop_onto_empty_column_moves_task() {
    let (persistence, mut board_ctl) =
        controller(board(&["1", "2", "3"], &[]), ControllerOptions::default());

    assert!(board_ctl.drag_start("2"));
    assert!(board_ctl.drag_over("b"));
    let intent = board_ctl.drag_end();

    assert_eq!(
        intent,
        Intent::CrossColumnMove {
            task_id: "2".into(),
            source_column_id: "a".into(),
            target_column_id: "b".into(),
            index: 0,
        }
    );
    // optimistic: visible before persistence answers
    assert_eq!(board_ctl.snapshot().task_ids("a"), vec!["1", "3"]);
    assert_eq!(board_ctl.snapshot().task_ids("b"), vec!["2"]);
    assert!(board_ctl.drag_session().is_none());

    assert_eq!(board_ctl.settle_all().await, vec![SettleOutcome::Acknowledged]);
    assert_eq!(persistence.calls(), vec!["move proj 2 a->b@0"]);
}

#[tokio::test]
async fn test_drop_onto_later_task_reorders() {
    let (persistence, mut board_ctl) =
        controller(board(&["1", "2", "3"], &[]), ControllerOptions::default());

    board_ctl.drag_start("1");
    board_ctl.drag_over("3");
    let intent = board_ctl.drag_end();

    assert_eq!(
        intent,
        Intent::SameColumnReorder {
            column_id: "a".into(),
            task_id: "1".into(),
            new_index: 2,
        }
    );
    let order = board_ctl.snapshot().task_ids("a");
    assert_eq!(order, vec!["2", "3", "1"]);
    assert_eq!(order.iter().position(|id| *id == "1"), Some(2));

    board_ctl.settle_all().await;
    assert_eq!(persistence.calls(), vec!["reorder proj a 1@2"]);
}

#[tokio::test]
async fn test_release_over_nothing_dispatches_nothing() {
    let (persistence, mut board_ctl) =
        controller(board(&["1", "2"], &["3"]), ControllerOptions::default());
    let before = board_ctl.snapshot().clone();

    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.drag_leave();
    assert_eq!(board_ctl.view(), &before);
    assert_eq!(board_ctl.drag_end(), Intent::NoOp);

    assert_eq!(board_ctl.snapshot(), &before);
    assert!(board_ctl.drag_session().is_none());
    assert_eq!(board_ctl.in_flight(), 0);
    assert!(board_ctl.settle_all().await.is_empty());
    assert!(persistence.calls().is_empty());
}

#[tokio::test]
async fn test_drag_end_without_session_is_noop() {
    let (persistence, mut board_ctl) =
        controller(board(&["1"], &[]), ControllerOptions::default());
    assert_eq!(board_ctl.drag_end(), Intent::NoOp);
    assert!(!board_ctl.drag_start("missing"));
    assert_eq!(board_ctl.drag_end(), Intent::NoOp);
    assert!(persistence.calls().is_empty());
}

#[tokio::test]
async fn test_failed_commit_keeps_optimistic_state_by_default() {
    let (persistence, mut board_ctl) =
        controller(board(&["1", "2"], &[]), ControllerOptions::default());
    persistence.script("1", 0, Reply::Fail("offline".into()));

    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.drag_end();

    assert_eq!(board_ctl.next_settlement().await, Some(SettleOutcome::FailedKept));
    assert_eq!(board_ctl.snapshot().task_ids("b"), vec!["1"]);
    assert_eq!(board_ctl.notices().len(), 1);
    assert!(board_ctl.notices()[0].message.contains("offline"));
    assert!(board_ctl.drag_session().is_none());
}

#[tokio::test]
async fn test_failed_commit_reverts_under_revert_policy() {
    let start = board(&["1", "2"], &[]);
    let (persistence, mut board_ctl) = controller(start.clone(), revert());
    persistence.script("1", 0, Reply::Fail("offline".into()));

    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.drag_end();

    assert_eq!(board_ctl.next_settlement().await, Some(SettleOutcome::RolledBack));
    assert_eq!(board_ctl.snapshot(), &start);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_confirmation_is_stale() {
    let (persistence, mut board_ctl) =
        controller(board(&["1", "2"], &[]), ControllerOptions::default());
    // first drop answers late with a board that predates the second drop
    persistence.script("1", 50, Reply::Board(board(&["2"], &["1"])));
    persistence.script("2", 10, Reply::Ack);

    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.drag_end();
    board_ctl.drag_start("2");
    board_ctl.drag_over("b");
    board_ctl.drag_end();
    assert_eq!(board_ctl.snapshot().task_ids("b"), vec!["1", "2"]);

    let outcomes = board_ctl.settle_all().await;
    assert_eq!(outcomes, vec![SettleOutcome::Acknowledged, SettleOutcome::Stale]);
    assert_eq!(board_ctl.snapshot().task_ids("b"), vec!["1", "2"]);
}

#[tokio::test(start_paused = true)]
async fn test_newer_confirmation_waits_for_older_commit() {
    let (persistence, mut board_ctl) =
        controller(board(&["1", "2"], &[]), ControllerOptions::default());
    // the backend ran the second drop first, so its board lacks the first move
    persistence.script("1", 50, Reply::Board(board(&[], &["2", "1"])));
    persistence.script("2", 10, Reply::Board(board(&["1"], &["2"])));

    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.drag_end();
    board_ctl.drag_start("2");
    board_ctl.drag_over("b");
    board_ctl.drag_end();

    let outcomes = board_ctl.settle_all().await;
    assert_eq!(outcomes, vec![SettleOutcome::Stale, SettleOutcome::Stale]);
    assert!(board_ctl.snapshot().task_ids("a").is_empty());
    let mut moved = board_ctl.snapshot().task_ids("b");
    moved.sort_unstable();
    assert_eq!(moved, vec!["1", "2"]);
}

#[tokio::test]
async fn test_settlement_during_drag_refreshes_preview() {
    let (persistence, mut board_ctl) =
        controller(board(&["1", "2", "3"], &[]), ControllerOptions::default());
    persistence.script("1", 0, Reply::Board(board(&["2", "3"], &["1", "9"])));

    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.drag_end();
    board_ctl.drag_start("3");
    board_ctl.drag_over("b");
    assert_eq!(board_ctl.view().task_ids("b"), vec!["1", "3"]);

    assert_eq!(board_ctl.next_settlement().await, Some(SettleOutcome::Confirmed));
    assert_eq!(board_ctl.snapshot().task_ids("b"), vec!["1", "9"]);
    assert_eq!(board_ctl.view().task_ids("b"), vec!["1", "9", "3"]);
    assert_eq!(board_ctl.view().task_ids("a"), vec!["2"]);
    assert!(board_ctl.drag_session().is_some());
}

#[tokio::test]
async fn test_settlement_removing_dragged_task_cancels_drag() {
    let (persistence, mut board_ctl) =
        controller(board(&["1", "2", "3"], &[]), ControllerOptions::default());
    persistence.script("1", 0, Reply::Board(board(&["2"], &["1"])));

    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.drag_end();
    board_ctl.drag_start("3");
    board_ctl.drag_over("b");

    assert_eq!(board_ctl.next_settlement().await, Some(SettleOutcome::Confirmed));
    assert!(board_ctl.drag_session().is_none());
    assert_eq!(board_ctl.view(), board_ctl.snapshot());
    assert_eq!(board_ctl.drag_end(), Intent::NoOp);
}

#[tokio::test]
async fn test_confirmation_replaces_local_copy() {
    let (persistence, mut board_ctl) =
        controller(board(&["1", "2"], &[]), ControllerOptions::default());
    persistence.script("1", 0, Reply::Board(board(&["2"], &["1", "9"])));

    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.drag_end();

    assert_eq!(board_ctl.next_settlement().await, Some(SettleOutcome::Confirmed));
    assert_eq!(board_ctl.snapshot().task_ids("b"), vec!["1", "9"]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_rollback_is_skipped() {
    let (persistence, mut board_ctl) = controller(board(&["1", "2"], &[]), revert());
    persistence.script("1", 50, Reply::Fail("timeout".into()));

    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.drag_end();
    board_ctl.drag_start("2");
    board_ctl.drag_over("b");
    board_ctl.drag_end();

    let outcomes = board_ctl.settle_all().await;
    assert_eq!(outcomes, vec![SettleOutcome::Acknowledged, SettleOutcome::FailedStale]);
    assert_eq!(board_ctl.snapshot().task_ids("b"), vec!["1", "2"]);
}

#[tokio::test]
async fn test_preview_follows_hover_without_committing() {
    let options = ControllerOptions {
        reorder_preview: ReorderPreview::Live,
        ..ControllerOptions::default()
    };
    let (_persistence, mut board_ctl) = controller(board(&["1", "2", "3"], &["4"]), options);

    board_ctl.drag_start("3");
    board_ctl.drag_over("4");
    assert_eq!(board_ctl.view().task_ids("b"), vec!["3", "4"]);
    assert!(board_ctl.drag_session().unwrap().preview_applied);
    assert_eq!(board_ctl.snapshot().task_ids("a"), vec!["1", "2", "3"]);

    board_ctl.drag_over("1");
    assert_eq!(board_ctl.view().task_ids("a"), vec!["3", "1", "2"]);
    assert_eq!(board_ctl.view().task_ids("b"), vec!["4"]);

    board_ctl.drag_cancel();
    assert_eq!(board_ctl.view(), board_ctl.snapshot());
    assert_eq!(board_ctl.in_flight(), 0);
}

#[tokio::test]
async fn test_load_cancels_active_drag() {
    let (_persistence, mut board_ctl) =
        controller(board(&["1"], &[]), ControllerOptions::default());
    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    board_ctl.load(board(&[], &["1"]));
    assert!(board_ctl.drag_session().is_none());
    assert_eq!(board_ctl.drag_end(), Intent::NoOp);
    assert_eq!(board_ctl.snapshot().task_ids("b"), vec!["1"]);
}

#[tokio::test]
async fn test_add_and_delete_are_optimistic() {
    let (persistence, mut board_ctl) =
        controller(board(&["1"], &[]), ControllerOptions::default());

    let id = board_ctl
        .add_task(&"b".into(), NewTask::new("write tests").with_tag("qa"))
        .unwrap();
    assert_eq!(board_ctl.snapshot().task_ids("b"), vec![id.as_str()]);
    board_ctl.delete_task(&TaskId::from("1")).unwrap();
    assert!(board_ctl.snapshot().task_ids("a").is_empty());

    let outcomes = board_ctl.settle_all().await;
    assert_eq!(outcomes.len(), 2);
    assert_eq!(persistence.calls().len(), 2);
    assert!(board_ctl.delete_task(&TaskId::from("1")).is_err());
}

#[tokio::test]
async fn test_add_respects_task_limit() {
    let mut start = board(&["1"], &["2"]);
    start.columns[1].task_limit = Some(1);
    let (persistence, mut board_ctl) = controller(start, ControllerOptions {
        enforce_task_limits: true,
        ..ControllerOptions::default()
    });

    assert!(board_ctl.add_task(&"b".into(), NewTask::new("overflow")).is_err());
    board_ctl.drag_start("1");
    board_ctl.drag_over("b");
    assert_eq!(board_ctl.drag_end(), Intent::NoOp);
    assert!(persistence.calls().is_empty());
}
