// ==========================================
// 工序排产求解核心 - 构造启发式
// ==========================================
// 顺序: 工序图层级 → 任务优先级（降序）→ 任务 → 分片序号
// 落位: First-Fit, 按日期遍历本工作中心窗口,
//       取台账余量足够、晚于前道/前片完工、且不与同机同日时间槽重叠的最早开始时间
// 兜底: 找不到完全可行的位置时放入余量最大的窗口（由评分判罚）
// ==========================================

use crate::domain::time_slot::TimeSlot;
use crate::engine::error::EngineResult;
use crate::engine::propagation::PropagationEngine;
use crate::engine::state::ScheduleState;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConstructionHeuristic {
    propagation: PropagationEngine,
}

impl ConstructionHeuristic {
    pub fn new() -> Self {
        Self {
            propagation: PropagationEngine::new(),
        }
    }

    /// 为所有未落位的可移动时间槽落位, 返回成功落位数
    #[instrument(skip(self, state), fields(slots = state.slots.len()))]
    pub fn run(&self, state: &mut ScheduleState) -> EngineResult<usize> {
        let order = self.placement_order(state);
        let predecessors = predecessor_map(state);

        let mut placed = 0usize;
        let mut fallback = 0usize;
        let mut skipped = 0usize;
        for slot_idx in order {
            match self.find_position(state, slot_idx, &predecessors) {
                Some((window_idx, start, feasible)) => {
                    self.propagation
                        .place(state, slot_idx, Some(window_idx), Some(start))?;
                    placed += 1;
                    if !feasible {
                        fallback += 1;
                    }
                }
                None => {
                    warn!(
                        slot_id = %state.slots[slot_idx].id,
                        work_center_id = ?state.slots[slot_idx].work_center_id,
                        "工作中心无可用维护窗口, 时间槽保持未落位"
                    );
                    skipped += 1;
                }
            }
        }

        info!(placed, fallback, skipped, "构造启发式完成");
        Ok(placed)
    }

    /// 待落位时间槽的处理顺序
    fn placement_order(&self, state: &ScheduleState) -> Vec<usize> {
        let mut order: Vec<usize> = state
            .movable_slots()
            .into_iter()
            .filter(|&i| state.slots[i].maintenance_window_id.is_none())
            .collect();
        order.sort_by(|&a, &b| {
            let (sa, sb) = (&state.slots[a], &state.slots[b]);
            state
                .graph
                .level(&sa.procedure_id)
                .cmp(&state.graph.level(&sb.procedure_id))
                .then_with(|| {
                    state
                        .task_priority(&sb.task_id)
                        .cmp(&state.task_priority(&sa.task_id))
                })
                .then_with(|| sa.task_id.cmp(&sb.task_id))
                .then_with(|| sa.procedure_id.cmp(&sb.procedure_id))
                .then_with(|| sa.slice_index.cmp(&sb.slice_index))
        });
        order
    }

    /// 返回 (窗口下标, 开始时间, 是否完全可行)
    fn find_position(
        &self,
        state: &ScheduleState,
        slot_idx: usize,
        predecessors: &HashMap<String, Vec<String>>,
    ) -> Option<(usize, NaiveDateTime, bool)> {
        let slot = &state.slots[slot_idx];
        let wc = slot.work_center_id.as_deref()?;
        let windows = state.windows_of_work_center(wc);
        if windows.is_empty() {
            return None;
        }
        let ready = ready_time(state, slot, predecessors);

        for &w in windows {
            let window = &state.windows[w];
            if window.end_at() <= ready.unwrap_or(window.start_at()) {
                continue;
            }
            let remaining = state.ledger.remaining(&window.id).unwrap_or(0);
            if remaining < slot.duration_minutes {
                continue;
            }

            let window_start = window.start_at();
            let earliest = ready.map_or(window_start, |r| r.max(window_start));
            let mut candidates: Vec<NaiveDateTime> = state
                .starts_on(window.date)
                .iter()
                .copied()
                .filter(|&t| t >= earliest && t < window.end_at())
                .collect();
            if candidates.is_empty() && earliest < window.end_at() {
                candidates.push(earliest);
            }

            let busy = busy_intervals(state, slot_idx, wc, window.date);
            for start in candidates {
                let end = start + Duration::minutes(slot.duration_minutes);
                if slot.parallel || !busy.iter().any(|&(s, e)| start < e && s < end) {
                    return Some((w, start, true));
                }
            }
        }

        // 兜底: 余量最大的窗口, 窗口开始时刻
        let w = windows
            .iter()
            .copied()
            .max_by_key(|&w| {
                (
                    state.ledger.remaining(&state.windows[w].id).unwrap_or(0),
                    std::cmp::Reverse(w),
                )
            })?;
        Some((w, state.windows[w].start_at(), false))
    }
}

/// 后道 → 前道列表（持有 ID, 落位过程中需要可变借用 state）
fn predecessor_map(state: &ScheduleState) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (pred, succ) in state.graph.edges() {
        map.entry(succ.to_string())
            .or_default()
            .push(pred.to_string());
    }
    map
}

/// 最早可开工时刻: 前道完工 / 本工序前片完工 / 实际开工时间 中的最大值
fn ready_time(
    state: &ScheduleState,
    slot: &TimeSlot,
    predecessors: &HashMap<String, Vec<String>>,
) -> Option<NaiveDateTime> {
    let mut ready: Option<NaiveDateTime> = None;
    let mut bump = |t: Option<NaiveDateTime>| {
        if let Some(t) = t {
            ready = Some(ready.map_or(t, |r| r.max(t)));
        }
    };

    if let Some(preds) = predecessors.get(&slot.procedure_id) {
        for pred in preds {
            bump(state.procedure(pred).and_then(|p| p.plan_end));
        }
    }
    for &i in state.slots_of_procedure(&slot.procedure_id) {
        let sibling = &state.slots[i];
        if sibling.slice_index < slot.slice_index {
            bump(sibling.end);
        }
    }
    bump(state.procedure(&slot.procedure_id).and_then(|p| p.real_start));
    ready
}

/// 同工作中心同日已占用的区间（并行槽不占用）
fn busy_intervals(
    state: &ScheduleState,
    slot_idx: usize,
    work_center_id: &str,
    date: chrono::NaiveDate,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    state
        .slots
        .iter()
        .enumerate()
        .filter(|(i, s)| {
            *i != slot_idx
                && !s.parallel
                && s.work_center_id.as_deref() == Some(work_center_id)
                && s.date() == Some(date)
        })
        .filter_map(|(_, s)| Some((s.start?, s.end?)))
        .collect()
}
