// ==========================================
// 求解管理器 API - 集成测试
// ==========================================
// 职责: 验证提交/停止/查询/增量修改/回调的端到端行为
// ==========================================

mod helpers;

use helpers::test_data_builder::{at, two_task_problem};
use procedure_aps::config::SolverConfig;
use procedure_aps::domain::score::HardMediumSoftScore;
use procedure_aps::domain::solution::ScheduleSolution;
use procedure_aps::domain::time_slot::TimeSlot;
use procedure_aps::domain::types::SolverStatus;
use procedure_aps::engine::{ConstraintId, SolverEventListener};
use procedure_aps::{SolverError, SolverManager};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==========================================
// 测试辅助
// ==========================================

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Improved(HardMediumSoftScore),
    Finished(Option<HardMediumSoftScore>),
    Error(String),
}

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl SolverEventListener for RecordingListener {
    fn on_best_solution_improved(&self, _problem_id: &str, solution: &ScheduleSolution) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Improved(solution.score.unwrap()));
    }

    fn on_solving_finished(&self, _problem_id: &str, solution: Option<&ScheduleSolution>) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Finished(solution.and_then(|s| s.score)));
    }

    fn on_solving_error(&self, _problem_id: &str, cause: &str) {
        self.events.lock().unwrap().push(Event::Error(cause.to_string()));
    }
}

fn config(spent_ms: u64) -> SolverConfig {
    SolverConfig::default()
        .with_spent_limit(Duration::from_millis(spent_ms))
        .with_seed(7)
}

fn manager(spent_ms: u64) -> SolverManager {
    SolverManager::new(config(spent_ms)).unwrap()
}

async fn wait_finished(manager: &SolverManager, problem_id: &str) {
    tokio::time::timeout(Duration::from_secs(20), manager.wait_until_finished(problem_id))
        .await
        .expect("solver did not stop in time")
        .unwrap();
}

/// 等待构造阶段发布第一个解
async fn wait_first_solution(manager: &SolverManager, problem_id: &str) -> ScheduleSolution {
    for _ in 0..400 {
        if let Some(solution) = manager.best_solution(problem_id).unwrap() {
            return solution;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no solution published");
}

// ==========================================
// 提交 / 停止
// ==========================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submit_solves_and_keeps_slot_identities() {
    let manager = manager(300);
    let snapshot = two_task_problem().snapshot();
    let submitted: HashSet<String> = snapshot.slot_ids().into_iter().collect();

    manager.submit("P1", snapshot).unwrap();
    wait_finished(&manager, "P1").await;

    assert_eq!(manager.status("P1").unwrap(), SolverStatus::NotRunning);
    let solution = manager.best_solution("P1").unwrap().unwrap();
    assert_eq!(solution.status, SolverStatus::NotRunning);
    let returned: HashSet<String> = solution.slots.iter().map(|s| s.id.clone()).collect();
    assert_eq!(returned, submitted);
    assert!(solution.slots.iter().all(|s| s.maintenance_window_id.is_some()));
    assert!(solution.slots.iter().all(|s| s.start.is_some() && s.end.is_some()));

    let score = manager.score("P1").unwrap().unwrap();
    assert_eq!(score.hard, 0);
    assert!(manager.is_feasible("P1").unwrap());

    let explanation = manager.explain("P1").unwrap();
    assert_eq!(explanation.score, score);
    assert!(explanation.total_of(ConstraintId::CapacityOverrun).is_zero());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_improvements_are_monotone_and_finished_fires_once() {
    let manager = manager(300);
    let listener = Arc::new(RecordingListener::default());

    manager
        .submit_with_listener("P1", two_task_problem().snapshot(), listener.clone())
        .unwrap();
    wait_finished(&manager, "P1").await;
    // 重复 stop 不会再触发完成回调
    manager.stop("P1").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = listener.events();
    let improved: Vec<HardMediumSoftScore> = events
        .iter()
        .filter_map(|e| match e {
            Event::Improved(score) => Some(*score),
            _ => None,
        })
        .collect();
    assert!(!improved.is_empty());
    assert!(improved.windows(2).all(|w| w[1] > w[0]));

    let finished: Vec<&Event> = events
        .iter()
        .filter(|e| matches!(e, Event::Finished(_)))
        .collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(events.last(), Some(&Event::Finished(improved.last().copied())));
    assert!(!events.iter().any(|e| matches!(e, Event::Error(_))));

    let statistics = manager.statistics("P1").unwrap();
    assert_eq!(statistics.improvements, improved.len() as u64);
    assert!(statistics.moves_evaluated >= statistics.moves_accepted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_returns_promptly_and_resubmit_after_finish() {
    let manager = manager(60_000);
    manager.submit("P1", two_task_problem().snapshot()).unwrap();
    wait_first_solution(&manager, "P1").await;

    let err = manager
        .submit("P1", two_task_problem().snapshot())
        .unwrap_err();
    assert!(matches!(err, SolverError::AlreadyRunning { .. }));

    manager.stop("P1").unwrap();
    wait_finished(&manager, "P1").await;
    assert_eq!(manager.status("P1").unwrap(), SolverStatus::NotRunning);

    // 已结束的任务可以重新提交
    manager.submit("P1", two_task_problem().snapshot()).unwrap();
    manager.stop("P1").unwrap();
    wait_finished(&manager, "P1").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_best_score_limit_terminates() {
    let mut config = config(60_000);
    config.termination.best_score_limit = Some(HardMediumSoftScore::new(-1_000_000, 0, 0));
    let manager = SolverManager::new(config).unwrap();

    manager.submit("P1", two_task_problem().snapshot()).unwrap();
    wait_finished(&manager, "P1").await;

    assert!(manager.statistics("P1").unwrap().elapsed_ms < 60_000);
}

// ==========================================
// 错误
// ==========================================

#[tokio::test]
async fn test_unknown_problem_is_not_found() {
    let manager = manager(100);
    assert!(matches!(manager.stop("nope"), Err(SolverError::NotFound { .. })));
    assert!(matches!(manager.status("nope"), Err(SolverError::NotFound { .. })));
    assert!(matches!(
        manager.best_solution("nope"),
        Err(SolverError::NotFound { .. })
    ));
    assert!(matches!(
        manager.update("nope", Vec::new()),
        Err(SolverError::NotFound { .. })
    ));
}

#[test]
fn test_submit_without_runtime_fails() {
    let manager = manager(100);
    let err = manager
        .submit("P1", two_task_problem().snapshot())
        .unwrap_err();
    assert!(matches!(err, SolverError::Internal(_)));
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = SolverConfig::default();
    config.move_thread_count = 0;
    assert!(matches!(
        SolverManager::new(config),
        Err(SolverError::InvalidInput(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_input_state_is_queryable_right_after_submit() {
    let manager = manager(60_000);
    let snapshot = two_task_problem().snapshot();
    let submitted: HashSet<String> = snapshot.slot_ids().into_iter().collect();

    manager.submit("P1", snapshot).unwrap();
    manager.stop("P1").unwrap();
    let published = manager.best_solution("P1").unwrap().expect("输入状态应立即可查询");
    let ids: HashSet<String> = published.slots.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, submitted);
    assert!(manager.score("P1").unwrap().is_some());

    wait_finished(&manager, "P1").await;
    let finished = manager.best_solution("P1").unwrap().unwrap();
    let ids: HashSet<String> = finished.slots.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, submitted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_published_solution_keeps_derived_fields_consistent() {
    let manager = manager(300);
    manager.submit("P1", two_task_problem().snapshot()).unwrap();
    wait_finished(&manager, "P1").await;
    let solution = manager.best_solution("P1").unwrap().unwrap();

    for slot in &solution.slots {
        if let Some(start) = slot.start {
            let expected = start + chrono::Duration::minutes(slot.duration_minutes);
            assert_eq!(slot.end, Some(expected), "{} 的结束时间未随开工时间派生", slot.id);
        }
    }

    for window in &solution.maintenance_range {
        assert!(window.consumed_minutes >= 0, "{} 消耗为负", window.id);
        assert!(
            window.consumed_minutes <= window.capacity_minutes,
            "{} 消耗 {} 超出产能 {}",
            window.id,
            window.consumed_minutes,
            window.capacity_minutes
        );
    }

    for procedure in &solution.procedures {
        let placed: Vec<&TimeSlot> = solution
            .slots
            .iter()
            .filter(|s| s.procedure_id == procedure.id && s.start.is_some())
            .collect();
        let plan_start = placed.iter().filter_map(|s| s.start).min();
        let plan_end = placed.iter().filter_map(|s| s.end).max();
        assert_eq!(procedure.plan_start, plan_start, "{} 计划开始", procedure.id);
        assert_eq!(procedure.plan_end, plan_end, "{} 计划结束", procedure.id);
    }
}

// ==========================================
// 增量修改
// ==========================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_while_running_is_merged() {
    let manager = manager(60_000);
    manager.submit("P1", two_task_problem().snapshot()).unwrap();
    let first = wait_first_solution(&manager, "P1").await;

    let template = first.slot("S-T2-20").unwrap();
    let mut extra = TimeSlot::new(
        "S-T2-20-EXTRA",
        template.procedure_id.clone(),
        template.order_id.clone(),
        template.task_id.clone(),
        30,
    );
    extra.work_center_id = template.work_center_id.clone();
    manager.update("P1", vec![extra]).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    manager.stop("P1").unwrap();
    wait_finished(&manager, "P1").await;

    let solution = manager.best_solution("P1").unwrap().unwrap();
    assert_eq!(solution.slots.len(), 5);
    assert!(solution.slot("S-T2-20-EXTRA").is_some());
    assert!(manager.statistics("P1").unwrap().updates_merged >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_with_unknown_procedure_rejected_and_run_continues() {
    let manager = manager(60_000);
    let listener = Arc::new(RecordingListener::default());
    manager
        .submit_with_listener("P1", two_task_problem().snapshot(), listener.clone())
        .unwrap();
    let first = wait_first_solution(&manager, "P1").await;

    let mut stray = TimeSlot::new("S-STRAY", "NO-SUCH-PROC", "O1", "T1", 30);
    stray.work_center_id = Some("WC1".to_string());
    let result = manager.update("P1", vec![stray]);
    assert!(matches!(result, Err(SolverError::InvalidInput(_))), "{:?}", result);

    let mut misplaced = first.slots[0].clone();
    misplaced.maintenance_window_id = Some("NO-SUCH-WINDOW".to_string());
    let result = manager.update("P1", vec![misplaced]);
    assert!(matches!(result, Err(SolverError::InvalidInput(_))), "{:?}", result);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_ne!(manager.status("P1").unwrap(), SolverStatus::NotRunning);

    manager.stop("P1").unwrap();
    wait_finished(&manager, "P1").await;
    assert!(!listener
        .events()
        .iter()
        .any(|e| matches!(e, Event::Error(_))));
    let solution = manager.best_solution("P1").unwrap().unwrap();
    assert_eq!(solution.slots.len(), 4);
    assert!(solution.slot("S-STRAY").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_after_stop_rescores_published_solution() {
    let manager = manager(200);
    manager.submit("P1", two_task_problem().snapshot()).unwrap();
    wait_finished(&manager, "P1").await;

    let before = manager.best_solution("P1").unwrap().unwrap();
    // 把 T2 的后道工序人工拉到前道之前开工
    let mut moved = before.slot("S-T2-20").unwrap().clone();
    let window = before
        .maintenance_range
        .iter()
        .find(|w| w.work_center_id == "WC2" && w.date == at(0, 0, 0).date())
        .unwrap()
        .clone();
    moved.maintenance_window_id = Some(window.id.clone());
    moved.start = Some(at(0, 8, 0));
    moved.manual = true;
    manager.update("P1", vec![moved]).unwrap();

    let after = manager.best_solution("P1").unwrap().unwrap();
    let slot = after.slot("S-T2-20").unwrap();
    assert_eq!(slot.start, Some(at(0, 8, 0)));
    assert_eq!(slot.end, Some(at(0, 10, 0)));
    assert_eq!(after.slots.len(), before.slots.len());
    // 前道最早 08:00 开工, 必然晚于 08:00 完工
    assert!(manager.score("P1").unwrap().unwrap().medium < 0);
    assert_eq!(manager.explain("P1").unwrap().score, after.score.unwrap());
}

// ==========================================
// 校验 / 清理
// ==========================================

#[tokio::test]
async fn test_validate_delete_and_reset() {
    let manager = manager(100);

    let mut a = TimeSlot::new("A", "P", "O", "T", 200);
    a.work_center_id = Some("WC1".to_string());
    a.start = Some(at(0, 9, 0));
    a.manual = true;
    let outcome = manager.validate(ScheduleSolution {
        problem_id: "manual".to_string(),
        slots: vec![a],
        ..Default::default()
    });
    assert_eq!(outcome.violation_count, 1);

    manager.submit("P1", two_task_problem().snapshot()).unwrap();
    manager.submit("P2", two_task_problem().snapshot()).unwrap();
    manager.delete("P1").unwrap();
    assert!(matches!(manager.status("P1"), Err(SolverError::NotFound { .. })));
    assert!(matches!(manager.delete("P1"), Err(SolverError::NotFound { .. })));

    manager.reset().unwrap();
    assert!(matches!(manager.status("P2"), Err(SolverError::NotFound { .. })));
}
