// ==========================================
// 人工落位校验 - 集成测试
// ==========================================
// 场景: 同一工作中心同一天两个人工时间槽同时开工
// ==========================================

mod helpers;

use helpers::test_data_builder::{at, two_task_problem, ProblemBuilder};
use procedure_aps::domain::solution::ScheduleSolution;
use procedure_aps::engine::FeasibilityValidator;

fn manual_solution(builder: ProblemBuilder) -> ScheduleSolution {
    let data = builder.build();
    ScheduleSolution {
        problem_id: "validate".to_string(),
        slots: data.slots,
        procedures: data.facts.procedures,
        maintenance_range: data.maintenance_windows,
        ..Default::default()
    }
}

#[test]
fn test_same_start_reports_overlap_but_not_capacity() {
    let builder = ProblemBuilder::new()
        .work_center("W")
        .window("W-D0", "W", 0, 480)
        .task("T1", "O1", 0)
        .procedure("PA", "T1", 10, "W", 200, &[])
        .procedure("PB", "T1", 20, "W", 200, &[])
        .manual_slot("A", "PA", 200, at(0, 9, 0))
        .manual_slot("B", "PB", 200, at(0, 9, 0));
    let mut solution = manual_solution(builder);
    for slot in solution.slots.iter_mut() {
        slot.work_center_id = Some("W".to_string());
    }

    let outcome = FeasibilityValidator::new().validate(solution);

    assert!(!outcome.is_valid());
    assert_eq!(outcome.violation_count, 2);
    let a = outcome.solution.slot("A").unwrap();
    let b = outcome.solution.slot("B").unwrap();
    assert!(a.validation_message.as_deref().unwrap().contains("与时间槽 B 重叠 200 分钟"));
    assert!(b.validation_message.as_deref().unwrap().contains("与时间槽 A 重叠 200 分钟"));
    assert!(!a.validation_message.as_deref().unwrap().contains("产能不足"));
    // 缺失的窗口 ID 被补全
    assert_eq!(a.maintenance_window_id.as_deref(), Some("W-D0"));
}

#[test]
fn test_validation_is_idempotent() {
    let builder = ProblemBuilder::new()
        .work_center("W")
        .window_with_reserved("W-D0", "W", 0, 300, 60)
        .task("T1", "O1", 0)
        .procedure("PA", "T1", 10, "W", 200, &[])
        .procedure("PB", "T1", 20, "W", 100, &[])
        .manual_slot("A", "PA", 200, at(0, 8, 0))
        .manual_slot("B", "PB", 100, at(0, 12, 0));
    let mut solution = manual_solution(builder);
    for slot in solution.slots.iter_mut() {
        slot.work_center_id = Some("W".to_string());
    }

    let validator = FeasibilityValidator::new();
    let first = validator.validate(solution);
    let second = validator.validate(first.solution.clone());

    // 300 + 预占 60 > 300
    assert_eq!(first.violation_count, 2);
    assert_eq!(first.violation_count, second.violation_count);
    for (a, b) in first.solution.slots.iter().zip(second.solution.slots.iter()) {
        assert_eq!(a.validation_message, b.validation_message);
        assert!(a.validation_message.as_deref().unwrap().contains("产能不足"));
    }
}

#[test]
fn test_day_without_window_and_non_manual_ignored() {
    let mut solution = manual_solution(
        two_task_problem().manual_slot("M1", "T1-P10", 60, at(5, 9, 0)),
    );
    for slot in solution.slots.iter_mut() {
        slot.work_center_id = Some("WC1".to_string());
    }

    let outcome = FeasibilityValidator::new().validate(solution);

    assert_eq!(outcome.violation_count, 1);
    let message = outcome.solution.slot("M1").unwrap().validation_message.clone();
    assert!(message.unwrap().contains("无维护窗口"));
    assert!(outcome
        .solution
        .slots
        .iter()
        .filter(|s| !s.manual)
        .all(|s| s.validation_message.is_none()));
}
