// ==========================================
// 工序排产求解核心 - 问题快照与解
// ==========================================
// PlanningData: 加载方提供的原始数据（已由外部协作方解析）
// ScheduleSnapshot: 一次优化实例的输入
// ScheduleSolution: 一次优化实例的（当前最优）结果
// ==========================================

use crate::domain::order::{Order, Task};
use crate::domain::procedure::Procedure;
use crate::domain::score::HardMediumSoftScore;
use crate::domain::time_slot::TimeSlot;
use crate::domain::types::SolverStatus;
use crate::domain::work_center::{MaintenanceWindow, WorkCenter};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// ProblemFacts - 只读事实
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemFacts {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub procedures: Vec<Procedure>,
    #[serde(default)]
    pub work_centers: Vec<WorkCenter>,
}

impl ProblemFacts {
    pub fn task_map(&self) -> HashMap<&str, &Task> {
        self.tasks.iter().map(|t| (t.id.as_str(), t)).collect()
    }

    pub fn procedure_map(&self) -> HashMap<&str, &Procedure> {
        self.procedures.iter().map(|p| (p.id.as_str(), p)).collect()
    }

    pub fn work_center_map(&self) -> HashMap<&str, &WorkCenter> {
        self.work_centers.iter().map(|w| (w.id.as_str(), w)).collect()
    }

    pub fn task_priority(&self, task_id: &str) -> i32 {
        self.tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.priority)
            .unwrap_or(0)
    }
}

// ==========================================
// PlanningData - 加载方输入
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningData {
    #[serde(default)]
    pub facts: ProblemFacts,
    #[serde(default)]
    pub maintenance_windows: Vec<MaintenanceWindow>,
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
}

// ==========================================
// ScheduleSnapshot - 优化实例输入
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub slots: Vec<TimeSlot>,
    /// 开始时间取值范围
    pub start_time_range: Vec<NaiveDateTime>,
    /// 维护窗口取值范围
    pub maintenance_range: Vec<MaintenanceWindow>,
    #[serde(default)]
    pub facts: ProblemFacts,
}

impl ScheduleSnapshot {
    pub fn slot_ids(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.id.clone()).collect()
    }
}

// ==========================================
// ScheduleSolution - 优化结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSolution {
    pub problem_id: String,
    pub slots: Vec<TimeSlot>,
    /// 工序（含派生的计划起止）
    pub procedures: Vec<Procedure>,
    /// 维护窗口（含台账已消耗分钟数）
    pub maintenance_range: Vec<MaintenanceWindow>,
    pub score: Option<HardMediumSoftScore>,
    pub status: SolverStatus,
}

impl ScheduleSolution {
    pub fn is_feasible(&self) -> bool {
        self.score.map(|s| s.is_feasible()).unwrap_or(false)
    }

    pub fn slot(&self, slot_id: &str) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    pub fn procedure(&self, procedure_id: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.id == procedure_id)
    }

    pub fn window(&self, window_id: &str) -> Option<&MaintenanceWindow> {
        self.maintenance_range.iter().find(|w| w.id == window_id)
    }
}
