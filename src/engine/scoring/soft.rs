// ==========================================
// Soft 约束（优化目标）
// ==========================================

use crate::engine::scoring::medium::placed_slices;
use crate::engine::scoring::{ConstraintId, ScoreCollector};
use crate::engine::state::ScheduleState;
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// 总跨度: 最早开始到最晚结束（分钟）
pub(super) fn makespan(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::Makespan) {
        return;
    }
    let first = state.slots.iter().filter_map(|s| s.start).min();
    let last = state.slots.iter().filter_map(|s| s.end).max();
    if let (Some(first), Some(last)) = (first, last) {
        let span = (last - first).num_minutes();
        collector.add(ConstraintId::Makespan, -span, &[], || {
            format!("总跨度 {} 分钟 ({} → {})", span, first, last)
        });
    }
}

/// 排产起点: 开始时间取值的最早值, 否则最早窗口开始时刻
pub(crate) fn horizon_start(state: &ScheduleState) -> Option<NaiveDateTime> {
    state
        .start_time_range
        .first()
        .copied()
        .or_else(|| state.windows.iter().map(|w| w.start_at()).min())
}

/// 尽早开工: 每个时间槽距排产起点的小时数 × (任务优先级 + 1)
pub(super) fn early_start(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::EarlyStart) {
        return;
    }
    let Some(horizon) = horizon_start(state) else {
        return;
    };
    for slot in &state.slots {
        let Some(start) = slot.start else { continue };
        let hours = (start - horizon).num_minutes().max(0) / 60;
        let factor = (state.task_priority(&slot.task_id) as i64 + 1).max(0);
        collector.add(ConstraintId::EarlyStart, -(hours * factor), &[&slot.id], || {
            format!(
                "时间槽 {} 距排产起点 {} 小时, 优先级系数 {}",
                slot.id, hours, factor
            )
        });
    }
}

/// 优先级完工顺序: 高优先级任务晚于低优先级任务完工（每对计 1）
pub(super) fn priority_finish_order(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::PriorityFinishOrder) {
        return;
    }
    let mut finish: HashMap<&str, NaiveDateTime> = HashMap::new();
    for slot in &state.slots {
        if let Some(end) = slot.end {
            finish
                .entry(slot.task_id.as_str())
                .and_modify(|e| *e = (*e).max(end))
                .or_insert(end);
        }
    }

    let mut tasks: Vec<(&str, i32, NaiveDateTime)> = finish
        .into_iter()
        .map(|(task_id, end)| (task_id, state.task_priority(task_id), end))
        .collect();
    // 优先级降序, 便于只比较 (高, 低) 对
    tasks.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    for (i, &(high_id, high_priority, high_end)) in tasks.iter().enumerate() {
        for &(low_id, low_priority, low_end) in &tasks[i + 1..] {
            if high_priority > low_priority && high_end > low_end {
                collector.add(ConstraintId::PriorityFinishOrder, -1, &[high_id, low_id], || {
                    format!(
                        "任务 {} (优先级 {}) 晚于任务 {} (优先级 {}) 完工",
                        high_id, high_priority, low_id, low_priority
                    )
                });
            }
        }
    }
}

/// 负荷均衡: 每个工作中心各日负荷与其日均负荷的绝对偏差之和（分钟）
pub(super) fn load_balance(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::LoadBalance) {
        return;
    }
    let mut window_load: HashMap<&str, i64> = HashMap::new();
    for slot in &state.slots {
        if let Some(window_id) = slot.maintenance_window_id.as_deref() {
            *window_load.entry(window_id).or_insert(0) += slot.duration_minutes;
        }
    }

    let mut by_work_center: HashMap<&str, Vec<i64>> = HashMap::new();
    for window in &state.windows {
        let load = window_load.get(window.id.as_str()).copied().unwrap_or(0);
        by_work_center
            .entry(window.work_center_id.as_str())
            .or_default()
            .push(load);
    }

    let mut work_centers: Vec<_> = by_work_center.into_iter().collect();
    work_centers.sort_by_key(|(wc, _)| *wc);
    for (work_center_id, loads) in work_centers {
        let total: i64 = loads.iter().sum();
        if total == 0 {
            continue;
        }
        let mean = total as f64 / loads.len() as f64;
        let deviation = loads
            .iter()
            .map(|&l| (l as f64 - mean).abs())
            .sum::<f64>()
            .round() as i64;
        collector.add(ConstraintId::LoadBalance, -deviation, &[work_center_id], || {
            format!(
                "工作中心 {} 日负荷偏差 {} 分钟（日均 {:.1} 分钟, {} 个窗口）",
                work_center_id,
                deviation,
                mean,
                loads.len()
            )
        });
    }
}

/// 分片连续性: 相邻分片之间的空闲天数
pub(super) fn slice_contiguity(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::SliceContiguity) {
        return;
    }
    for procedure in &state.procedures {
        let slices = placed_slices(state, &procedure.id);
        for pair in slices.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            let (Some(earlier_end), Some(later_start)) = (earlier.end, later.start) else {
                continue;
            };
            let idle_days = (later_start.date() - earlier_end.date()).num_days() - 1;
            if idle_days > 0 {
                collector.add(
                    ConstraintId::SliceContiguity,
                    -idle_days,
                    &[&earlier.id, &later.id],
                    || {
                        format!(
                            "工序 {} 第{}片与第{}片之间空闲 {} 天",
                            procedure.id, earlier.slice_index, later.slice_index, idle_days
                        )
                    },
                );
            }
        }
    }
}

/// 产能利用率: 每个已使用且未超产能的窗口, 奖励利用百分点
pub(super) fn capacity_utilization(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
    if !collector.enabled(ConstraintId::CapacityUtilization) {
        return;
    }
    let mut window_load: HashMap<&str, i64> = HashMap::new();
    for slot in &state.slots {
        if let Some(window_id) = slot.maintenance_window_id.as_deref() {
            *window_load.entry(window_id).or_insert(0) += slot.duration_minutes;
        }
    }

    for window in &state.windows {
        let Some(&load) = window_load.get(window.id.as_str()) else {
            continue;
        };
        let used = window.reserved_minutes + load;
        if load == 0 || window.capacity_minutes <= 0 || used > window.capacity_minutes {
            continue;
        }
        let percent = used * 100 / window.capacity_minutes;
        collector.add(ConstraintId::CapacityUtilization, percent, &[&window.id], || {
            format!(
                "窗口 {} 利用率 {}% ({}/{} 分钟)",
                window.id, percent, used, window.capacity_minutes
            )
        });
    }
}
