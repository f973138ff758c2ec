// ==========================================
// 工序排产求解核心 - 局部搜索移动
// ==========================================
// 移动类型:
//   ChangeWindow   换维护窗口（开始时间随窗口推导）
//   ChangeStart    同窗口内换开始时间
//   SwapPlacement  同工作中心两个时间槽交换（窗口, 开始时间）
// 红线: 只移动非人工时间槽; 所有写入经 PropagationEngine
// ==========================================

use crate::engine::error::EngineResult;
use crate::engine::propagation::PropagationEngine;
use crate::engine::state::ScheduleState;
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Move {
    ChangeWindow { slot: usize, window: usize },
    ChangeStart { slot: usize, start: NaiveDateTime },
    SwapPlacement { left: usize, right: usize },
}

impl Move {
    pub fn kind(&self) -> &'static str {
        match self {
            Move::ChangeWindow { .. } => "change_window",
            Move::ChangeStart { .. } => "change_start",
            Move::SwapPlacement { .. } => "swap_placement",
        }
    }

    /// 执行移动, 返回撤销记录
    pub fn apply(
        &self,
        state: &mut ScheduleState,
        propagation: &PropagationEngine,
    ) -> EngineResult<MoveUndo> {
        match *self {
            Move::ChangeWindow { slot, window } => {
                let undo = MoveUndo::record(state, &[slot]);
                propagation.assign_window(state, slot, Some(window))?;
                Ok(undo)
            }
            Move::ChangeStart { slot, start } => {
                let undo = MoveUndo::record(state, &[slot]);
                propagation.assign_start(state, slot, Some(start))?;
                Ok(undo)
            }
            Move::SwapPlacement { left, right } => {
                let undo = MoveUndo::record(state, &[left, right]);
                let (left_window, left_start) = placement_of(state, left);
                let (right_window, right_start) = placement_of(state, right);
                // 先全部释放, 再依次落位, 避免同窗口交换时互相挤占余量
                propagation.assign_window(state, left, None)?;
                propagation.assign_window(state, right, None)?;
                restore(state, propagation, left, right_window, right_start)?;
                restore(state, propagation, right, left_window, left_start)?;
                Ok(undo)
            }
        }
    }
}

/// 撤销记录: 移动前各时间槽的 (窗口下标, 开始时间)
#[derive(Debug, Clone)]
pub struct MoveUndo {
    placements: Vec<(usize, Option<usize>, Option<NaiveDateTime>)>,
}

impl MoveUndo {
    fn record(state: &ScheduleState, slots: &[usize]) -> Self {
        Self {
            placements: slots
                .iter()
                .map(|&i| {
                    let (window, start) = placement_of(state, i);
                    (i, window, start)
                })
                .collect(),
        }
    }

    pub fn undo(self, state: &mut ScheduleState, propagation: &PropagationEngine) -> EngineResult<()> {
        for &(slot, _, _) in &self.placements {
            propagation.assign_window(state, slot, None)?;
        }
        for (slot, window, start) in self.placements {
            restore(state, propagation, slot, window, start)?;
        }
        Ok(())
    }
}

fn placement_of(state: &ScheduleState, slot: usize) -> (Option<usize>, Option<NaiveDateTime>) {
    let s = &state.slots[slot];
    let window = s
        .maintenance_window_id
        .as_deref()
        .and_then(|id| state.window_index(id));
    (window, s.start)
}

/// 先写窗口（记账 + 推导开始）, 再写原开始时间
fn restore(
    state: &mut ScheduleState,
    propagation: &PropagationEngine,
    slot: usize,
    window: Option<usize>,
    start: Option<NaiveDateTime>,
) -> EngineResult<()> {
    propagation.assign_window(state, slot, window)?;
    if state.slots[slot].start != start {
        propagation.assign_start(state, slot, start)?;
    }
    Ok(())
}

// ==========================================
// MoveSelector - 随机移动生成器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct MoveSelector {
    movable: Vec<usize>,
    movable_by_work_center: HashMap<String, Vec<usize>>,
}

impl MoveSelector {
    /// 工作状态的时间槽集合变化后需重建
    pub fn new(state: &ScheduleState) -> Self {
        let movable = state.movable_slots();
        let mut movable_by_work_center: HashMap<String, Vec<usize>> = HashMap::new();
        for &i in &movable {
            if let Some(wc) = &state.slots[i].work_center_id {
                movable_by_work_center.entry(wc.clone()).or_default().push(i);
            }
        }
        Self {
            movable,
            movable_by_work_center,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.movable.is_empty()
    }

    /// 随机生成一个移动; 无可行候选时返回 None
    pub fn propose(&self, state: &ScheduleState, rng: &mut StdRng) -> Option<Move> {
        if self.movable.is_empty() {
            return None;
        }
        match rng.random_range(0..10u8) {
            0..=3 => self.change_window(state, rng),
            4..=7 => self.change_start(state, rng),
            _ => self.swap_placement(state, rng),
        }
    }

    fn pick_slot(&self, rng: &mut StdRng) -> usize {
        self.movable[rng.random_range(0..self.movable.len())]
    }

    fn change_window(&self, state: &ScheduleState, rng: &mut StdRng) -> Option<Move> {
        let slot = self.pick_slot(rng);
        let wc = state.slots[slot].work_center_id.as_deref()?;
        let candidates = state.windows_of_work_center(wc);
        if candidates.is_empty() {
            return None;
        }
        let window = candidates[rng.random_range(0..candidates.len())];
        let current = state.slots[slot]
            .maintenance_window_id
            .as_deref()
            .and_then(|id| state.window_index(id));
        if current == Some(window) {
            return None;
        }
        Some(Move::ChangeWindow { slot, window })
    }

    fn change_start(&self, state: &ScheduleState, rng: &mut StdRng) -> Option<Move> {
        let slot = self.pick_slot(rng);
        let s = &state.slots[slot];
        let window = state.window(s.maintenance_window_id.as_deref()?)?;
        let (window_start, window_end) = (window.start_at(), window.end_at());
        let starts: Vec<NaiveDateTime> = state
            .starts_on(window.date)
            .iter()
            .copied()
            .filter(|&t| t >= window_start && t < window_end && Some(t) != s.start)
            .collect();
        if starts.is_empty() {
            return None;
        }
        let start = starts[rng.random_range(0..starts.len())];
        Some(Move::ChangeStart { slot, start })
    }

    fn swap_placement(&self, state: &ScheduleState, rng: &mut StdRng) -> Option<Move> {
        let left = self.pick_slot(rng);
        let wc = state.slots[left].work_center_id.as_deref()?;
        let peers = self.movable_by_work_center.get(wc)?;
        if peers.len() < 2 {
            return None;
        }
        let right = peers[rng.random_range(0..peers.len())];
        if right == left {
            return None;
        }
        let (l, r) = (&state.slots[left], &state.slots[right]);
        if l.maintenance_window_id == r.maintenance_window_id && l.start == r.start {
            return None;
        }
        Some(Move::SwapPlacement { left, right })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::procedure::Procedure;
    use crate::domain::solution::{ProblemFacts, ScheduleSnapshot};
    use crate::domain::time_slot::TimeSlot;
    use crate::domain::work_center::MaintenanceWindow;
    use chrono::{NaiveDate, NaiveTime};
    use rand::SeedableRng;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn state() -> ScheduleState {
        state_with_start_hours(8..16)
    }

    fn state_with_start_hours(hours: std::ops::Range<u32>) -> ScheduleState {
        let windows: Vec<MaintenanceWindow> = (2..=4)
            .map(|d| {
                MaintenanceWindow::new(
                    format!("MW{}", d),
                    "WC1",
                    day(d),
                    480,
                    NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
                )
            })
            .collect();
        let starts = (2..=4)
            .flat_map(|d| hours.clone().map(move |h| day(d).and_hms_opt(h, 0, 0).unwrap()))
            .collect();
        let mut slots = Vec::new();
        for (i, (id, window)) in [("S1", "MW2"), ("S2", "MW3")].iter().enumerate() {
            let mut slot = TimeSlot::new(*id, format!("P{}", i + 1), "O1", "T1", 120);
            slot.work_center_id = Some("WC1".to_string());
            slot.maintenance_window_id = Some(window.to_string());
            slots.push(slot);
        }
        let snapshot = ScheduleSnapshot {
            slots,
            start_time_range: starts,
            maintenance_range: windows,
            facts: ProblemFacts {
                procedures: vec![
                    Procedure::new("P1", "T1", "O1", 10, Some("WC1"), 120),
                    Procedure::new("P2", "T1", "O1", 20, Some("WC1"), 120),
                ],
                ..ProblemFacts::default()
            },
        };
        let mut state = ScheduleState::from_snapshot(snapshot).unwrap();
        PropagationEngine::new().rebuild(&mut state);
        state
    }

    fn fingerprint(state: &ScheduleState) -> Vec<(Option<String>, Option<NaiveDateTime>, i64)> {
        state
            .slots
            .iter()
            .map(|s| (s.maintenance_window_id.clone(), s.start, s.allocated_minutes))
            .collect()
    }

    #[test]
    fn test_swap_and_undo_restore_everything() {
        let propagation = PropagationEngine::new();
        let mut state = state();
        propagation
            .assign_start(&mut state, 1, Some(day(3).and_hms_opt(10, 0, 0).unwrap()))
            .unwrap();
        let before = fingerprint(&state);

        let undo = Move::SwapPlacement { left: 0, right: 1 }
            .apply(&mut state, &propagation)
            .unwrap();
        assert_eq!(state.slots[0].maintenance_window_id.as_deref(), Some("MW3"));
        assert_eq!(state.slots[0].start, Some(day(3).and_hms_opt(10, 0, 0).unwrap()));
        assert_eq!(state.slots[1].start, Some(day(2).and_hms_opt(8, 0, 0).unwrap()));

        undo.undo(&mut state, &propagation).unwrap();
        assert_eq!(fingerprint(&state), before);
        assert_eq!(state.ledger.consumed("MW2"), Some(120));
        assert_eq!(state.ledger.consumed("MW3"), Some(120));
    }

    #[test]
    fn test_proposals_touch_only_movable_slots() {
        let mut state = state();
        state.slots[0].manual = true;
        let selector = MoveSelector::new(&state);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            match selector.propose(&state, &mut rng) {
                Some(Move::ChangeWindow { slot, .. }) | Some(Move::ChangeStart { slot, .. }) => {
                    assert_eq!(slot, 1)
                }
                Some(Move::SwapPlacement { .. }) => panic!("只有一个可移动时间槽, 不应交换"),
                None => {}
            }
        }
    }

    #[test]
    fn test_change_start_stays_inside_window() {
        // 取值范围延伸到 16:00 之后, 窗口 08:00-16:00
        let state = state_with_start_hours(6..22);
        let selector = MoveSelector::new(&state);
        let mut rng = StdRng::seed_from_u64(11);
        let mut proposed = 0;
        for _ in 0..300 {
            if let Some(Move::ChangeStart { slot, start }) = selector.change_start(&state, &mut rng) {
                let window_id = state.slots[slot].maintenance_window_id.as_deref().unwrap();
                let window = state.window(window_id).unwrap();
                assert_eq!(start.date(), window.date);
                assert!(start >= window.start_at(), "{} 早于窗口开始", start);
                assert!(start < window.end_at(), "{} 不早于窗口结束", start);
                proposed += 1;
            }
        }
        assert!(proposed > 0);
    }
}
