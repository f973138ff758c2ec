// ==========================================
// 工序排产求解核心 - 求解工作状态
// ==========================================
// 职责: 持有一次求解中的可变实体 + 只读事实 + 索引
// 说明: 时间槽/工序派生字段/台账只在此处被修改,
//       修改入口统一走 PropagationEngine
// ==========================================

use crate::domain::order::Task;
use crate::domain::procedure::Procedure;
use crate::domain::score::HardMediumSoftScore;
use crate::domain::solution::{ProblemFacts, ScheduleSnapshot, ScheduleSolution};
use crate::domain::time_slot::TimeSlot;
use crate::domain::types::SolverStatus;
use crate::domain::work_center::MaintenanceWindow;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::ledger::CapacityLedger;
use crate::engine::procedure_graph::ProcedureGraph;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 索引（实体集合变化后重建）
#[derive(Debug, Clone, Default)]
struct StateIndex {
    slot_by_id: HashMap<String, usize>,
    window_by_id: HashMap<String, usize>,
    procedure_by_id: HashMap<String, usize>,
    slots_by_procedure: HashMap<String, Vec<usize>>,
    windows_by_work_center: HashMap<String, Vec<usize>>,
    starts_by_date: BTreeMap<NaiveDate, Vec<NaiveDateTime>>,
    task_priority: HashMap<String, i32>,
}

#[derive(Debug)]
pub struct ScheduleState {
    pub slots: Vec<TimeSlot>,
    pub procedures: Vec<Procedure>,
    pub windows: Vec<MaintenanceWindow>,
    pub start_time_range: Vec<NaiveDateTime>,
    pub facts: Arc<ProblemFacts>,
    pub ledger: Arc<CapacityLedger>,
    pub graph: Arc<ProcedureGraph>,
    index: StateIndex,
}

impl ScheduleState {
    /// 由快照构建工作状态（尚未执行派生重算, 调用方需执行 PropagationEngine::rebuild）
    pub fn from_snapshot(snapshot: ScheduleSnapshot) -> EngineResult<Self> {
        let ScheduleSnapshot {
            slots,
            mut start_time_range,
            maintenance_range,
            facts,
        } = snapshot;

        let graph = ProcedureGraph::build(&facts.procedures)?;
        let ledger = CapacityLedger::from_windows(&maintenance_range);
        start_time_range.sort_unstable();
        start_time_range.dedup();

        let procedures = facts.procedures.clone();
        let mut state = Self {
            slots,
            procedures,
            windows: maintenance_range,
            start_time_range,
            facts: Arc::new(facts),
            ledger: Arc::new(ledger),
            graph: Arc::new(graph),
            index: StateIndex::default(),
        };
        state.reindex();
        state.check_references()?;
        Ok(state)
    }

    /// 重建全部索引
    pub fn reindex(&mut self) {
        let mut index = StateIndex {
            slot_by_id: self
                .slots
                .iter()
                .enumerate()
                .map(|(i, s)| (s.id.clone(), i))
                .collect(),
            window_by_id: self
                .windows
                .iter()
                .enumerate()
                .map(|(i, w)| (w.id.clone(), i))
                .collect(),
            procedure_by_id: self
                .procedures
                .iter()
                .enumerate()
                .map(|(i, p)| (p.id.clone(), i))
                .collect(),
            task_priority: self
                .facts
                .tasks
                .iter()
                .map(|t: &Task| (t.id.clone(), t.priority))
                .collect(),
            ..StateIndex::default()
        };

        for (i, slot) in self.slots.iter().enumerate() {
            index
                .slots_by_procedure
                .entry(slot.procedure_id.clone())
                .or_default()
                .push(i);
        }
        for (i, window) in self.windows.iter().enumerate() {
            index
                .windows_by_work_center
                .entry(window.work_center_id.clone())
                .or_default()
                .push(i);
        }
        for list in index.windows_by_work_center.values_mut() {
            list.sort_by_key(|&i| (self.windows[i].date, self.windows[i].start_clock));
        }
        for start in &self.start_time_range {
            index
                .starts_by_date
                .entry(start.date())
                .or_default()
                .push(*start);
        }

        self.index = index;
    }

    /// 时间槽引用的窗口/工序必须存在
    fn check_references(&self) -> EngineResult<()> {
        self.slots.iter().try_for_each(|slot| self.check_slot(slot))
    }

    fn check_slot(&self, slot: &TimeSlot) -> EngineResult<()> {
        if let Some(window_id) = &slot.maintenance_window_id {
            if !self.index.window_by_id.contains_key(window_id) {
                return Err(EngineError::UnknownWindow {
                    slot_id: slot.id.clone(),
                    window_id: window_id.clone(),
                });
            }
        }
        if !self.index.procedure_by_id.contains_key(&slot.procedure_id) {
            return Err(EngineError::UnknownProcedure {
                slot_id: slot.id.clone(),
                procedure_id: slot.procedure_id.clone(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn slot_index(&self, slot_id: &str) -> Option<usize> {
        self.index.slot_by_id.get(slot_id).copied()
    }

    pub fn window_index(&self, window_id: &str) -> Option<usize> {
        self.index.window_by_id.get(window_id).copied()
    }

    pub fn window(&self, window_id: &str) -> Option<&MaintenanceWindow> {
        self.window_index(window_id).map(|i| &self.windows[i])
    }

    pub fn procedure(&self, procedure_id: &str) -> Option<&Procedure> {
        self.index
            .procedure_by_id
            .get(procedure_id)
            .map(|&i| &self.procedures[i])
    }

    pub(crate) fn procedure_mut(&mut self, procedure_id: &str) -> Option<&mut Procedure> {
        match self.index.procedure_by_id.get(procedure_id) {
            Some(&i) => Some(&mut self.procedures[i]),
            None => None,
        }
    }

    /// 某工序的全部时间槽下标
    pub fn slots_of_procedure(&self, procedure_id: &str) -> &[usize] {
        self.index
            .slots_by_procedure
            .get(procedure_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// 某工作中心的窗口下标（按日期排序）
    pub fn windows_of_work_center(&self, work_center_id: &str) -> &[usize] {
        self.index
            .windows_by_work_center
            .get(work_center_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// 某日的开始时间取值
    pub fn starts_on(&self, date: NaiveDate) -> &[NaiveDateTime] {
        self.index
            .starts_by_date
            .get(&date)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn task_priority(&self, task_id: &str) -> i32 {
        self.index.task_priority.get(task_id).copied().unwrap_or(0)
    }

    /// 可被优化移动的时间槽下标（非人工锚点）
    pub fn movable_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.manual)
            .map(|(i, _)| i)
            .collect()
    }

    // ==========================================
    // 合并外部修改
    // ==========================================

    /// 按 ID 合并外部修改的时间槽（已存在则替换, 否则追加）
    ///
    /// 先整体校验引用, 任一非法则状态不变;
    /// 合并后重建索引; 派生字段需由调用方执行 rebuild
    pub fn merge_slots(&mut self, changed: Vec<TimeSlot>) -> EngineResult<usize> {
        changed.iter().try_for_each(|slot| self.check_slot(slot))?;

        let mut merged = 0usize;
        for slot in changed {
            match self.index.slot_by_id.get(&slot.id) {
                Some(&i) => self.slots[i] = slot,
                None => {
                    self.index.slot_by_id.insert(slot.id.clone(), self.slots.len());
                    self.slots.push(slot);
                }
            }
            merged += 1;
        }
        self.reindex();
        Ok(merged)
    }

    // ==========================================
    // 导出
    // ==========================================

    /// 导出解（窗口消耗量取自台账）
    pub fn to_solution(
        &self,
        problem_id: &str,
        score: Option<HardMediumSoftScore>,
        status: SolverStatus,
    ) -> ScheduleSolution {
        let mut windows = self.windows.clone();
        self.ledger.write_back(&mut windows);
        ScheduleSolution {
            problem_id: problem_id.to_string(),
            slots: self.slots.clone(),
            procedures: self.procedures.clone(),
            maintenance_range: windows,
            score,
            status,
        }
    }

    /// 由已发布的解还原快照（用于解释/更新）
    pub fn snapshot_of(
        solution: &ScheduleSolution,
        start_time_range: &[NaiveDateTime],
        facts: &ProblemFacts,
    ) -> ScheduleSnapshot {
        let mut facts = facts.clone();
        facts.procedures = solution.procedures.clone();
        ScheduleSnapshot {
            slots: solution.slots.clone(),
            start_time_range: start_time_range.to_vec(),
            maintenance_range: solution.maintenance_range.clone(),
            facts,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::procedure::Procedure;
    use crate::domain::time_slot::TimeSlot;
    use crate::engine::error::EngineError;
    use crate::engine::scoring::test_support::*;

    #[test]
    fn test_merge_rejects_unknown_refs_without_mutation() {
        let procedures = vec![Procedure::new("P1", "T1", "O1", 10, Some("WC1"), 60)];
        let slots = vec![placed("S1", "P1", "T1", "WC1", "MW1", at(2, 8, 0), 60)];
        let mut state = state_of(slots, vec![window("MW1", "WC1", 2, 480)], procedures);

        let mut replaced = state.slots[0].clone();
        replaced.duration_minutes = 30;
        let bad = TimeSlot::new("S9", "NO-SUCH", "O1", "T1", 30);
        let err = state.merge_slots(vec![replaced, bad]).unwrap_err();

        assert!(matches!(err, EngineError::UnknownProcedure { .. }));
        assert_eq!(state.slots.len(), 1);
        assert_eq!(state.slots[0].duration_minutes, 60);
        assert!(state.slot_index("S9").is_none());

        let mut foreign = state.slots[0].clone();
        foreign.maintenance_window_id = Some("MW404".to_string());
        assert!(matches!(
            state.merge_slots(vec![foreign]),
            Err(EngineError::UnknownWindow { .. })
        ));
        assert_eq!(state.slots[0].maintenance_window_id.as_deref(), Some("MW1"));
    }

    #[test]
    fn test_merge_replaces_and_appends() {
        let procedures = vec![Procedure::new("P1", "T1", "O1", 10, Some("WC1"), 90)];
        let slots = vec![placed("S1", "P1", "T1", "WC1", "MW1", at(2, 8, 0), 60)];
        let mut state = state_of(slots, vec![window("MW1", "WC1", 2, 480)], procedures);

        let mut extra = TimeSlot::new("S2", "P1", "O1", "T1", 30);
        extra.work_center_id = Some("WC1".to_string());
        assert_eq!(state.merge_slots(vec![extra]).unwrap(), 1);
        assert_eq!(state.slot_index("S2"), Some(1));
        assert_eq!(state.slots_of_procedure("P1").len(), 2);
    }
}
