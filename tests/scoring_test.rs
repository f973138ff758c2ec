// ==========================================
// 评分引擎 - 集成测试
// ==========================================
// 快照 → 工作状态 → 全量重算 → 评分/解释
// ==========================================

mod helpers;

use helpers::test_data_builder::{at, ProblemBuilder};
use procedure_aps::config::ConstraintWeights;
use procedure_aps::domain::score::HardMediumSoftScore;
use procedure_aps::domain::solution::ScheduleSnapshot;
use procedure_aps::engine::{
    ConstraintId, PropagationEngine, ScheduleScenario, ScheduleState, ScoreCalculator,
};

/// 按 (slot_id, window_id, start) 落位后构建状态
fn placed_state(
    mut snapshot: ScheduleSnapshot,
    placements: &[(&str, &str, chrono::NaiveDateTime)],
) -> ScheduleState {
    for (slot_id, window_id, start) in placements {
        let slot = snapshot
            .slots
            .iter_mut()
            .find(|s| s.id == *slot_id)
            .unwrap();
        slot.maintenance_window_id = Some(window_id.to_string());
        slot.start = Some(*start);
    }
    let mut state = ScheduleState::from_snapshot(snapshot).unwrap();
    PropagationEngine::new().rebuild(&mut state);
    state
}

fn precedence_problem() -> ProblemBuilder {
    ProblemBuilder::new()
        .work_center("WC1")
        .work_center("WC2")
        .window("WC1-D0", "WC1", 0, 480)
        .window("WC2-D0", "WC2", 0, 480)
        .task("T1", "O1", 0)
        .procedure("Y", "T1", 10, "WC1", 120, &[20])
        .procedure("X", "T1", 20, "WC2", 60, &[])
        .slot("SY", "Y", 1, 120)
        .slot("SX", "X", 1, 60)
}

#[test]
fn test_successor_starting_inside_predecessor_is_penalized_by_overlap() {
    let state = placed_state(
        precedence_problem().snapshot(),
        &[("SY", "WC1-D0", at(0, 9, 0)), ("SX", "WC2-D0", at(0, 10, 0))],
    );

    let explanation = ScoreCalculator::new(ConstraintWeights::default()).explain(&state);

    assert_eq!(
        explanation.total_of(ConstraintId::ProcedurePrecedence),
        HardMediumSoftScore::of_medium(-60)
    );
    assert_eq!(explanation.score.hard, 0);
    assert_eq!(explanation.score.medium, -60);
    let total = explanation
        .constraint_totals
        .iter()
        .find(|t| t.constraint_id == ConstraintId::ProcedurePrecedence)
        .unwrap();
    assert_eq!(total.match_count(), 1);
    assert_eq!(total.matches[0].entity_ids, vec!["Y".to_string(), "X".to_string()]);
}

#[test]
fn test_successor_after_predecessor_has_no_medium_penalty() {
    let state = placed_state(
        precedence_problem().snapshot(),
        &[("SY", "WC1-D0", at(0, 9, 0)), ("SX", "WC2-D0", at(0, 11, 0))],
    );

    let score = ScoreCalculator::new(ConstraintWeights::default()).calculate(&state);

    assert_eq!(score.hard, 0);
    assert_eq!(score.medium, 0);
    assert!(score.is_feasible());
}

#[test]
fn test_explanation_totals_sum_to_score() {
    let snapshot = ProblemBuilder::new()
        .work_center("WC1")
        .window("WC1-D0", "WC1", 0, 100)
        .task("T1", "O1", 3)
        .procedure("P1", "T1", 10, "WC1", 90, &[])
        .procedure("P2", "T1", 20, "WC1", 60, &[])
        .slot("S1", "P1", 1, 90)
        .slot("S2", "P2", 1, 60)
        .snapshot();
    let state = placed_state(
        snapshot,
        &[("S1", "WC1-D0", at(0, 8, 0)), ("S2", "WC1-D0", at(0, 9, 0))],
    );

    let calculator =
        ScoreCalculator::new(ConstraintWeights::for_scenario(ScheduleScenario::Emergency));
    let explanation = calculator.explain(&state);

    assert_eq!(explanation.score, calculator.calculate(&state));
    let summed = explanation
        .constraint_totals
        .iter()
        .fold(HardMediumSoftScore::ZERO, |acc, t| acc + t.total);
    assert_eq!(summed, explanation.score);
    // 150 > 100 产能超限, 08:00-09:30 与 09:00-10:00 重叠
    assert!(explanation.total_of(ConstraintId::CapacityOverrun).hard < 0);
    assert!(explanation.total_of(ConstraintId::WorkCenterOverlap).hard < 0);
    assert!(!explanation.score.is_feasible());
}
