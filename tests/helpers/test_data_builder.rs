// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use procedure_aps::domain::order::{Order, Task};
use procedure_aps::domain::procedure::Procedure;
use procedure_aps::domain::solution::{PlanningData, ScheduleSnapshot};
use procedure_aps::domain::time_slot::TimeSlot;
use procedure_aps::domain::work_center::{MaintenanceWindow, WorkCenter};
use procedure_aps::engine::SnapshotBuilder;

/// 基准日 2026-03-02 之后第 offset 天
pub fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap() + chrono::Duration::days(offset)
}

pub fn at(offset: i64, h: u32, m: u32) -> NaiveDateTime {
    day(offset).and_hms_opt(h, m, 0).unwrap()
}

pub fn clock(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

// ==========================================
// PlanningData 构建器
// ==========================================

#[derive(Default)]
pub struct ProblemBuilder {
    data: PlanningData,
}

impl ProblemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work_center(mut self, id: &str) -> Self {
        self.data
            .facts
            .work_centers
            .push(WorkCenter::new(id, format!("{}-CODE", id)));
        self
    }

    /// 08:00-16:00 的维护窗口
    pub fn window(self, id: &str, work_center_id: &str, day_offset: i64, capacity: i64) -> Self {
        self.window_with_reserved(id, work_center_id, day_offset, capacity, 0)
    }

    pub fn window_with_reserved(
        mut self,
        id: &str,
        work_center_id: &str,
        day_offset: i64,
        capacity: i64,
        reserved: i64,
    ) -> Self {
        let mut window = MaintenanceWindow::new(
            id,
            work_center_id,
            day(day_offset),
            capacity,
            clock(8),
            clock(16),
        );
        window.reserved_minutes = reserved;
        self.data.maintenance_windows.push(window);
        self
    }

    /// 任务（订单不存在时一并创建）
    pub fn task(mut self, task_id: &str, order_id: &str, priority: i32) -> Self {
        if !self.data.facts.orders.iter().any(|o| o.id == order_id) {
            self.data.facts.orders.push(Order::new(order_id));
        }
        self.data
            .facts
            .tasks
            .push(Task::new(task_id, order_id, priority));
        self
    }

    pub fn procedure(
        mut self,
        id: &str,
        task_id: &str,
        procedure_no: i32,
        work_center_id: &str,
        required_minutes: i64,
        successor_nos: &[i32],
    ) -> Self {
        let order_id = self.order_of(task_id);
        let procedure = Procedure::new(
            id,
            task_id,
            order_id,
            procedure_no,
            Some(work_center_id),
            required_minutes,
        )
        .with_successors(successor_nos);
        self.data.facts.procedures.push(procedure);
        self
    }

    pub fn real_start(mut self, procedure_id: &str, real_start: NaiveDateTime) -> Self {
        if let Some(p) = self
            .data
            .facts
            .procedures
            .iter_mut()
            .find(|p| p.id == procedure_id)
        {
            p.real_start = Some(real_start);
        }
        self
    }

    /// 待排时间槽
    pub fn slot(mut self, id: &str, procedure_id: &str, slice_index: i32, minutes: i64) -> Self {
        let slot = self.new_slot(id, procedure_id, slice_index, minutes);
        self.data.slots.push(slot);
        self
    }

    /// 人工落位时间槽
    pub fn manual_slot(
        mut self,
        id: &str,
        procedure_id: &str,
        minutes: i64,
        start: NaiveDateTime,
    ) -> Self {
        let mut slot = self.new_slot(id, procedure_id, 1, minutes);
        slot.manual = true;
        slot.start = Some(start);
        self.data.slots.push(slot);
        self
    }

    pub fn build(self) -> PlanningData {
        self.data
    }

    pub fn snapshot(self) -> ScheduleSnapshot {
        SnapshotBuilder::new(30).build(self.data, None).unwrap()
    }

    fn order_of(&self, task_id: &str) -> String {
        self.data
            .facts
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.order_id.clone())
            .unwrap_or_else(|| format!("O-{}", task_id))
    }

    fn new_slot(&self, id: &str, procedure_id: &str, slice_index: i32, minutes: i64) -> TimeSlot {
        let procedure = self
            .data
            .facts
            .procedures
            .iter()
            .find(|p| p.id == procedure_id)
            .expect("procedure must be declared before its slots");
        let mut slot = TimeSlot::new(
            id,
            procedure_id,
            procedure.order_id.clone(),
            procedure.task_id.clone(),
            minutes,
        );
        slot.slice_index = slice_index;
        slot
    }
}

// ==========================================
// 典型问题
// ==========================================

/// 两个任务 × 两道工序, 两个工作中心 × 三天窗口, 产能充足
pub fn two_task_problem() -> ProblemBuilder {
    let mut builder = ProblemBuilder::new().work_center("WC1").work_center("WC2");
    for d in 0..3 {
        builder = builder
            .window(&format!("WC1-D{}", d), "WC1", d, 480)
            .window(&format!("WC2-D{}", d), "WC2", d, 480);
    }
    builder
        .task("T1", "O1", 5)
        .task("T2", "O2", 1)
        .procedure("T1-P10", "T1", 10, "WC1", 120, &[20])
        .procedure("T1-P20", "T1", 20, "WC2", 90, &[])
        .procedure("T2-P10", "T2", 10, "WC1", 60, &[20])
        .procedure("T2-P20", "T2", 20, "WC2", 120, &[])
        .slot("S-T1-10", "T1-P10", 1, 120)
        .slot("S-T1-20", "T1-P20", 1, 90)
        .slot("S-T2-10", "T2-P10", 1, 60)
        .slot("S-T2-20", "T2-P20", 1, 120)
}
