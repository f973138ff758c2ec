// ==========================================
// Hard 约束（可行性）
// ==========================================

use crate::domain::time_slot::TimeSlot;
use crate::engine::scoring::{ConstraintId, ScoreCollector};
use crate::engine::state::ScheduleState;
use chrono::NaiveDate;
use std::collections::HashMap;

/// 时间槽落在非本工作中心的窗口上（每槽计 1）
pub(super) fn work_center_mismatch(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::WorkCenterMismatch) {
        return;
    }
    for slot in &state.slots {
        let Some(window_id) = slot.maintenance_window_id.as_deref() else {
            continue;
        };
        let Some(window) = state.window(window_id) else {
            continue;
        };
        if slot.work_center_id.as_deref() != Some(window.work_center_id.as_str()) {
            collector.add(
                ConstraintId::WorkCenterMismatch,
                -1,
                &[&slot.id, window_id],
                || {
                    format!(
                        "时间槽 {} 绑定工作中心 {:?}, 却落在 {} 的窗口 {}",
                        slot.id, slot.work_center_id, window.work_center_id, window_id
                    )
                },
            );
        }
    }
}

/// 窗口超产能（预占用 + 分配时长 - 产能, 按分钟）
///
/// 按时间槽时长累计, 不取台账（台账拒绝了超限记账）
pub(super) fn capacity_overrun(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::CapacityOverrun) {
        return;
    }
    let mut demand: HashMap<&str, i64> = HashMap::new();
    for slot in &state.slots {
        if let Some(window_id) = slot.maintenance_window_id.as_deref() {
            *demand.entry(window_id).or_insert(0) += slot.duration_minutes;
        }
    }

    for window in &state.windows {
        let assigned = demand.get(window.id.as_str()).copied().unwrap_or(0);
        let over = window.reserved_minutes + assigned - window.capacity_minutes;
        if over > 0 {
            collector.add(ConstraintId::CapacityOverrun, -over, &[&window.id], || {
                format!(
                    "窗口 {} ({} {}) 超产能 {} 分钟: 预占 {} + 分配 {} > 产能 {}",
                    window.id,
                    window.work_center_id,
                    window.date,
                    over,
                    window.reserved_minutes,
                    assigned,
                    window.capacity_minutes
                )
            });
        }
    }
}

/// 同工作中心同日时间槽重叠（每对按重叠分钟; 并行槽豁免）
pub(super) fn work_center_overlap(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::WorkCenterOverlap) {
        return;
    }
    for group in placed_groups(&state.slots).values_mut() {
        group.sort_by_key(|s| s.start);
        for (i, a) in group.iter().enumerate() {
            if a.parallel {
                continue;
            }
            let Some(a_end) = a.end else { continue };
            for b in &group[i + 1..] {
                // 已按开始时间排序, 后续槽开始不早于 b
                if b.start.is_some_and(|b_start| b_start >= a_end) {
                    break;
                }
                if b.parallel {
                    continue;
                }
                let minutes = a.overlap_minutes(b);
                if minutes > 0 {
                    collector.add(ConstraintId::WorkCenterOverlap, -minutes, &[&a.id, &b.id], || {
                        format!(
                            "时间槽 {} 与 {} 在工作中心 {:?} 重叠 {} 分钟",
                            a.id, b.id, a.work_center_id, minutes
                        )
                    });
                }
            }
        }
    }
}

/// 已落位时间槽按 (工作中心, 日期) 分组
pub(crate) fn placed_groups(slots: &[TimeSlot]) -> HashMap<(&str, NaiveDate), Vec<&TimeSlot>> {
    let mut groups: HashMap<(&str, NaiveDate), Vec<&TimeSlot>> = HashMap::new();
    for slot in slots {
        if let (Some(wc), Some(date)) = (slot.work_center_id.as_deref(), slot.date()) {
            groups.entry((wc, date)).or_default().push(slot);
        }
    }
    groups
}
