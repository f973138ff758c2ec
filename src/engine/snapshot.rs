// ==========================================
// 工序排产求解核心 - 快照构建器
// ==========================================
// 输入: 加载器提供的 PlanningData（事实 + 维护窗口 + 时间槽）
// 输出: 一次优化实例 ScheduleSnapshot
// 步骤:
//   1. 工序图校验（后道环 → 错误）, 订单计划区间异常仅告警
//   2. 按任务过滤时间槽
//   3. 解析工作中心绑定（时间槽 → 工序）, 缺失/未知则丢弃并告警
//   4. 分片关系: 按工序分组、按序号排序、重编号 1..n
//   5. 人工锚点: 工序有实际开工 → 标记 manual, 从实际开工起首尾相接播种决策字段
//   6. 维护窗口取值范围 + 开始时间取值范围
// ==========================================

use crate::domain::solution::{PlanningData, ProblemFacts, ScheduleSnapshot};
use crate::domain::time_slot::TimeSlot;
use crate::domain::work_center::MaintenanceWindow;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::procedure_graph::ProcedureGraph;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy)]
pub struct SnapshotBuilder {
    start_time_step_minutes: i64,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new(30)
    }
}

impl SnapshotBuilder {
    pub fn new(start_time_step_minutes: i64) -> Self {
        Self {
            start_time_step_minutes,
        }
    }

    #[instrument(skip(self, data), fields(slots = data.slots.len(), windows = data.maintenance_windows.len()))]
    pub fn build(
        &self,
        data: PlanningData,
        task_ids: Option<&[String]>,
    ) -> EngineResult<ScheduleSnapshot> {
        if self.start_time_step_minutes <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "start_time_step_minutes 必须 > 0: {}",
                self.start_time_step_minutes
            )));
        }

        let PlanningData {
            facts,
            maintenance_windows,
            slots,
        } = data;

        // 1) 事实校验
        ProcedureGraph::build(&facts.procedures)?;
        for order in &facts.orders {
            if !order.has_valid_plan_range() {
                warn!(
                    order_id = %order.id,
                    planned_start = ?order.planned_start,
                    planned_end = ?order.planned_end,
                    "订单计划开始晚于计划结束"
                );
            }
        }

        // 2) 任务过滤
        let wanted: Option<HashSet<&str>> =
            task_ids.map(|ids| ids.iter().map(|s| s.as_str()).collect());
        let facts = match &wanted {
            Some(set) => filter_facts(facts, set),
            None => facts,
        };

        // 3) 工作中心绑定
        let total = slots.len();
        let kept = self.resolve_work_centers(slots, &facts, wanted.as_ref());

        // 4) 分片关系
        let mut kept = renumber_slices(kept);

        // 5) 人工锚点
        let windows_by_day: HashMap<(&str, NaiveDate), &MaintenanceWindow> = maintenance_windows
            .iter()
            .map(|w| ((w.work_center_id.as_str(), w.date), w))
            .collect();
        seed_anchors(&mut kept, &facts, &windows_by_day);

        // 6) 取值范围
        let used_work_centers: HashSet<&str> = kept
            .iter()
            .filter_map(|s| s.work_center_id.as_deref())
            .collect();
        let referenced: HashSet<&str> = kept
            .iter()
            .filter_map(|s| s.maintenance_window_id.as_deref())
            .collect();
        let mut maintenance_range: Vec<MaintenanceWindow> = maintenance_windows
            .iter()
            .filter(|w| {
                used_work_centers.contains(w.work_center_id.as_str())
                    || referenced.contains(w.id.as_str())
            })
            .cloned()
            .collect();
        maintenance_range.sort_by(|a, b| {
            (a.date, a.work_center_id.as_str(), a.start_clock)
                .cmp(&(b.date, b.work_center_id.as_str(), b.start_clock))
        });
        let start_time_range = self.start_times(&maintenance_range);

        info!(
            kept = kept.len(),
            dropped = total - kept.len(),
            windows = maintenance_range.len(),
            starts = start_time_range.len(),
            "快照构建完成"
        );

        Ok(ScheduleSnapshot {
            slots: kept,
            start_time_range,
            maintenance_range,
            facts,
        })
    }

    fn resolve_work_centers(
        &self,
        slots: Vec<TimeSlot>,
        facts: &ProblemFacts,
        wanted: Option<&HashSet<&str>>,
    ) -> Vec<TimeSlot> {
        let procedures = facts.procedure_map();
        let work_centers = facts.work_center_map();

        slots
            .into_iter()
            .filter(|s| wanted.map_or(true, |set| set.contains(s.task_id.as_str())))
            .filter_map(|mut slot| {
                let Some(procedure) = procedures.get(slot.procedure_id.as_str()) else {
                    warn!(slot_id = %slot.id, procedure_id = %slot.procedure_id, "时间槽引用未知工序, 丢弃");
                    return None;
                };
                let binding = slot
                    .work_center_id
                    .clone()
                    .or_else(|| procedure.work_center_id.clone());
                match binding {
                    Some(wc) if work_centers.contains_key(wc.as_str()) => {
                        slot.work_center_id = Some(wc);
                        Some(slot)
                    }
                    Some(wc) => {
                        warn!(slot_id = %slot.id, work_center_id = %wc, "时间槽绑定未知工作中心, 丢弃");
                        None
                    }
                    None => {
                        warn!(slot_id = %slot.id, procedure_id = %slot.procedure_id, "时间槽缺少工作中心绑定, 丢弃");
                        None
                    }
                }
            })
            .collect()
    }

    /// 每个窗口从开始时钟起按步长取值, 严格早于结束时钟
    fn start_times(&self, windows: &[MaintenanceWindow]) -> Vec<NaiveDateTime> {
        let step = Duration::minutes(self.start_time_step_minutes);
        let mut starts: Vec<NaiveDateTime> = Vec::new();
        for window in windows {
            let end = window.end_at();
            let mut t = window.start_at();
            while t < end {
                starts.push(t);
                t += step;
            }
        }
        starts.sort_unstable();
        starts.dedup();
        starts
    }
}

/// 只保留所选任务相关的事实
fn filter_facts(facts: ProblemFacts, wanted: &HashSet<&str>) -> ProblemFacts {
    let tasks: Vec<_> = facts
        .tasks
        .into_iter()
        .filter(|t| wanted.contains(t.id.as_str()))
        .collect();
    let order_ids: HashSet<String> = tasks.iter().map(|t| t.order_id.clone()).collect();
    ProblemFacts {
        orders: facts
            .orders
            .into_iter()
            .filter(|o| order_ids.contains(&o.id))
            .collect(),
        procedures: facts
            .procedures
            .into_iter()
            .filter(|p| wanted.contains(p.task_id.as_str()))
            .collect(),
        tasks,
        work_centers: facts.work_centers,
    }
}

/// 按工序分组、按分片序号排序, 重编号 1..n 并设置 slice_total = n
fn renumber_slices(slots: Vec<TimeSlot>) -> Vec<TimeSlot> {
    let mut groups: BTreeMap<String, Vec<TimeSlot>> = BTreeMap::new();
    for slot in slots {
        groups.entry(slot.procedure_id.clone()).or_default().push(slot);
    }

    let mut result = Vec::new();
    for (_, mut group) in groups {
        group.sort_by(|a, b| a.slice_index.cmp(&b.slice_index).then_with(|| a.id.cmp(&b.id)));
        let total = group.len() as i32;
        for (i, mut slot) in group.into_iter().enumerate() {
            slot.slice_index = i as i32 + 1;
            slot.slice_total = total;
            result.push(slot);
        }
    }
    result
}

/// 人工锚点播种
///
/// 工序有实际开工时间: 其分片从实际开工起首尾相接;
/// 已标记 manual 但缺少窗口的时间槽: 按开始日期解析窗口
fn seed_anchors(
    slots: &mut [TimeSlot],
    facts: &ProblemFacts,
    windows_by_day: &HashMap<(&str, NaiveDate), &MaintenanceWindow>,
) {
    let procedures = facts.procedure_map();
    let mut cursor: HashMap<String, NaiveDateTime> = HashMap::new();

    // slots 已按工序分组且按分片序号有序
    for slot in slots.iter_mut() {
        let real_start = procedures
            .get(slot.procedure_id.as_str())
            .and_then(|p| p.real_start);

        if let Some(real_start) = real_start {
            let start = *cursor
                .entry(slot.procedure_id.clone())
                .or_insert(real_start);
            slot.manual = true;
            slot.start = Some(start);
            slot.end = slot.computed_end();
            cursor.insert(
                slot.procedure_id.clone(),
                start + Duration::minutes(slot.duration_minutes),
            );
            slot.maintenance_window_id = None;
        }

        if slot.manual && slot.maintenance_window_id.is_none() {
            if let (Some(wc), Some(date)) = (slot.work_center_id.as_deref(), slot.date()) {
                match windows_by_day.get(&(wc, date)) {
                    Some(window) => slot.maintenance_window_id = Some(window.id.clone()),
                    None => warn!(
                        slot_id = %slot.id,
                        work_center_id = wc,
                        date = %date,
                        "人工锚点所在日期无维护窗口"
                    ),
                }
            }
        }
    }
}
