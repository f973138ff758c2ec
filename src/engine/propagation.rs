// ==========================================
// 工序排产求解核心 - 派生状态传播引擎
// ==========================================
// 职责: 决策字段写入后, 立即重算依赖它的派生字段
//   - 窗口变更: 释放旧窗口记账 → 新窗口有余量则记账 → start = 窗口日期 + 开始时钟
//   - 开始时间变更: end = start + duration
//   - 工序任一时间槽变更: plan_start/plan_end = min(start)/max(end)
// 红线: 单写者: 只有本引擎写 end / allocated_minutes / plan_* / 台账
//       派生字段之间不存在环（end 只依赖 start, 工序区间只依赖 start/end）
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::state::ScheduleState;
use chrono::NaiveDateTime;
use tracing::{debug, instrument};

/// 无状态引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagationEngine;

impl PropagationEngine {
    pub fn new() -> Self {
        Self
    }

    /// 维护窗口变更
    pub fn assign_window(
        &self,
        state: &mut ScheduleState,
        slot_idx: usize,
        window_idx: Option<usize>,
    ) -> EngineResult<()> {
        if slot_idx >= state.slots.len() {
            return Err(EngineError::SlotOutOfRange(slot_idx));
        }
        if let Some(w) = window_idx {
            if w >= state.windows.len() {
                return Err(EngineError::Internal(format!("窗口下标越界: {}", w)));
            }
        }

        // 1) 释放旧窗口的实际记账
        let (old_window, allocated) = {
            let slot = &state.slots[slot_idx];
            (slot.maintenance_window_id.clone(), slot.allocated_minutes)
        };
        if let Some(old_id) = old_window {
            if allocated > 0 {
                state.ledger.release(&old_id, allocated);
            }
        }

        // 2) 新窗口记账 + 推导开始时间
        let ledger = state.ledger.clone();
        let new_window = window_idx.map(|w| (state.windows[w].id.clone(), state.windows[w].start_at()));
        let slot = &mut state.slots[slot_idx];
        slot.allocated_minutes = 0;
        match new_window {
            Some((window_id, window_start)) => {
                if ledger.allocate(&window_id, slot.duration_minutes) {
                    slot.allocated_minutes = slot.duration_minutes;
                }
                slot.maintenance_window_id = Some(window_id);
                slot.start = Some(window_start);
            }
            None => {
                slot.maintenance_window_id = None;
                slot.start = None;
            }
        }
        slot.end = slot.computed_end();

        let procedure_id = slot.procedure_id.clone();
        self.recompute_plan_range(state, &procedure_id);
        Ok(())
    }

    /// 开始时间变更
    pub fn assign_start(
        &self,
        state: &mut ScheduleState,
        slot_idx: usize,
        start: Option<NaiveDateTime>,
    ) -> EngineResult<()> {
        let slot = state
            .slots
            .get_mut(slot_idx)
            .ok_or(EngineError::SlotOutOfRange(slot_idx))?;
        slot.start = start;
        slot.end = slot.computed_end();

        let procedure_id = slot.procedure_id.clone();
        self.recompute_plan_range(state, &procedure_id);
        Ok(())
    }

    /// 落位 = 窗口变更 + 开始时间变更（同一事务内完成）
    pub fn place(
        &self,
        state: &mut ScheduleState,
        slot_idx: usize,
        window_idx: Option<usize>,
        start: Option<NaiveDateTime>,
    ) -> EngineResult<()> {
        self.assign_window(state, slot_idx, window_idx)?;
        if window_idx.is_some() && start.is_some() {
            self.assign_start(state, slot_idx, start)?;
        }
        Ok(())
    }

    /// 工序计划起止 = 其已落位时间槽的 min(start) / max(end)
    pub fn recompute_plan_range(&self, state: &mut ScheduleState, procedure_id: &str) {
        let mut plan_start: Option<NaiveDateTime> = None;
        let mut plan_end: Option<NaiveDateTime> = None;
        for &i in state.slots_of_procedure(procedure_id) {
            let slot = &state.slots[i];
            if let Some(start) = slot.start {
                plan_start = Some(plan_start.map_or(start, |s| s.min(start)));
                if let Some(end) = slot.end {
                    plan_end = Some(plan_end.map_or(end, |e| e.max(end)));
                }
            }
        }

        if let Some(procedure) = state.procedure_mut(procedure_id) {
            procedure.plan_start = plan_start;
            procedure.plan_end = plan_end;
        }
    }

    /// 全量重算（台账归零到预占用 → 重放全部记账 → 重算全部派生字段）
    #[instrument(skip(self, state), fields(slots = state.slots.len()))]
    pub fn rebuild(&self, state: &mut ScheduleState) {
        state.ledger.reset();

        let ledger = state.ledger.clone();
        let window_starts: Vec<Option<NaiveDateTime>> = state
            .slots
            .iter()
            .map(|s| {
                s.maintenance_window_id
                    .as_deref()
                    .and_then(|id| state.window(id))
                    .map(|w| w.start_at())
            })
            .collect();

        let mut rejected = 0usize;
        for (slot, window_start) in state.slots.iter_mut().zip(window_starts) {
            slot.allocated_minutes = 0;
            if let Some(window_id) = &slot.maintenance_window_id {
                if ledger.allocate(window_id, slot.duration_minutes) {
                    slot.allocated_minutes = slot.duration_minutes;
                } else {
                    rejected += 1;
                }
                if slot.start.is_none() {
                    slot.start = window_start;
                }
            }
            slot.end = slot.computed_end();
        }

        let procedure_ids: Vec<String> = state.procedures.iter().map(|p| p.id.clone()).collect();
        for procedure_id in procedure_ids {
            self.recompute_plan_range(state, &procedure_id);
        }

        debug!(rejected, "派生状态全量重算完成");
    }
}
