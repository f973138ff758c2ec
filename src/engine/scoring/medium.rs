// ==========================================
// Medium 约束（工艺顺序 / 分片顺序 / 实际开工锚点）
// ==========================================

use crate::domain::time_slot::TimeSlot;
use crate::engine::scoring::{ConstraintId, ScoreCollector};
use crate::engine::state::ScheduleState;

/// 后道最早开始早于前道最晚结束（按重叠分钟）
///
/// 工序计划区间由传播引擎维护, 即 min(start) / max(end)
pub(super) fn procedure_precedence(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::ProcedurePrecedence) {
        return;
    }
    for (predecessor_id, successor_id) in state.graph.edges() {
        let (Some(predecessor), Some(successor)) =
            (state.procedure(predecessor_id), state.procedure(successor_id))
        else {
            continue;
        };
        let (Some(pred_end), Some(succ_start)) = (predecessor.plan_end, successor.plan_start)
        else {
            continue;
        };
        if succ_start < pred_end {
            let minutes = (pred_end - succ_start).num_minutes().max(1);
            collector.add(
                ConstraintId::ProcedurePrecedence,
                -minutes,
                &[predecessor_id, successor_id],
                || {
                    format!(
                        "工序 {} (第{}道) 在前道 {} (第{}道) 完工前 {} 分钟开始",
                        successor.id,
                        successor.procedure_no,
                        predecessor.id,
                        predecessor.procedure_no,
                        minutes
                    )
                },
            );
        }
    }
}

/// 分片顺序: 序号大的分片在序号小的分片结束前开始（按重叠分钟, 至少 1）
pub(super) fn slice_order(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::SliceOrder) {
        return;
    }
    for procedure in &state.procedures {
        let slices = placed_slices(state, &procedure.id);
        for pair in slices.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            let (Some(earlier_end), Some(later_start)) = (earlier.end, later.start) else {
                continue;
            };
            if later_start < earlier_end {
                let minutes = (earlier_end - later_start).num_minutes().max(1);
                collector.add(ConstraintId::SliceOrder, -minutes, &[&earlier.id, &later.id], || {
                    format!(
                        "工序 {} 第{}片在第{}片结束前 {} 分钟开始",
                        procedure.id, later.slice_index, earlier.slice_index, minutes
                    )
                });
            }
        }
    }
}

/// 开始时间早于工序实际开工时间（按提前分钟）
pub(super) fn real_start_anchor(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::RealStartAnchor) {
        return;
    }
    for slot in &state.slots {
        let Some(start) = slot.start else { continue };
        let Some(real_start) = state
            .procedure(&slot.procedure_id)
            .and_then(|p| p.real_start)
        else {
            continue;
        };
        if start < real_start {
            let minutes = (real_start - start).num_minutes().max(1);
            collector.add(ConstraintId::RealStartAnchor, -minutes, &[&slot.id, &slot.procedure_id], || {
                format!(
                    "时间槽 {} 开始于 {}, 早于工序实际开工 {} 共 {} 分钟",
                    slot.id, start, real_start, minutes
                )
            });
        }
    }
}

/// 某工序已落位的分片（按分片序号排序）
pub(crate) fn placed_slices<'a>(state: &'a ScheduleState, procedure_id: &str) -> Vec<&'a TimeSlot> {
    let mut slices: Vec<&TimeSlot> = state
        .slots_of_procedure(procedure_id)
        .iter()
        .map(|&i| &state.slots[i])
        .filter(|s| s.is_placed())
        .collect();
    slices.sort_by_key(|s| s.slice_index);
    slices
}

#[cfg(test)]
mod tests {
    use crate::config::constraint_weights::ConstraintWeights;
    use crate::domain::procedure::Procedure;
    use crate::domain::score::HardMediumSoftScore;
    use crate::engine::scoring::test_support::*;
    use crate::engine::scoring::{ConstraintId, ScoreCalculator};

    #[test]
    fn test_precedence_violation_minutes() {
        // P1 08:00-10:00, 后道 P2 09:00 开始 → 违反 60 分钟
        let procedures = vec![
            Procedure::new("P1", "T1", "O1", 10, Some("WC1"), 120).with_successors(&[20]),
            Procedure::new("P2", "T1", "O1", 20, Some("WC2"), 60),
        ];
        let slots = vec![
            placed("S1", "P1", "T1", "WC1", "MW1", at(2, 8, 0), 120),
            placed("S2", "P2", "T1", "WC2", "MW2", at(2, 9, 0), 60),
        ];
        let state = state_of(
            slots,
            vec![window("MW1", "WC1", 2, 480), window("MW2", "WC2", 2, 480)],
            procedures,
        );
        let explanation = ScoreCalculator::new(ConstraintWeights::default()).explain(&state);
        assert_eq!(explanation.score.medium, -60);
        assert_eq!(
            explanation.total_of(ConstraintId::ProcedurePrecedence),
            HardMediumSoftScore::of_medium(-60)
        );
    }

    #[test]
    fn test_slice_order_minimum_one_minute() {
        let procedures = vec![Procedure::new("P1", "T1", "O1", 10, Some("WC1"), 120)];
        let mut first = placed("S1", "P1", "T1", "WC1", "MW2", at(2, 8, 0), 60);
        first.slice_total = 2;
        let mut second = placed("S2", "P1", "T1", "WC1", "MW2", at(2, 8, 59), 60);
        second.slice_index = 2;
        second.slice_total = 2;

        let state = state_of(
            vec![first, second],
            vec![window("MW2", "WC1", 2, 480)],
            procedures,
        );
        let explanation = ScoreCalculator::new(ConstraintWeights::default()).explain(&state);
        assert_eq!(
            explanation.total_of(ConstraintId::SliceOrder),
            HardMediumSoftScore::of_medium(-1)
        );
    }

    #[test]
    fn test_real_start_anchor() {
        let procedures = vec![Procedure::new("P1", "T1", "O1", 10, Some("WC1"), 60)
            .with_real_start(at(2, 10, 0))];
        let slots = vec![placed("S1", "P1", "T1", "WC1", "MW1", at(2, 8, 30), 60)];
        let state = state_of(slots, vec![window("MW1", "WC1", 2, 480)], procedures);
        let explanation = ScoreCalculator::new(ConstraintWeights::default()).explain(&state);
        assert_eq!(
            explanation.total_of(ConstraintId::RealStartAnchor),
            HardMediumSoftScore::of_medium(-90)
        );
    }
}
