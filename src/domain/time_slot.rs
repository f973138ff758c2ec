// ==========================================
// 工序排产求解核心 - 时间槽（决策单元）
// ==========================================
// 决策字段: start / maintenance_window_id（仅由求解器写入）
// 派生字段: end / allocated_minutes（仅由 Propagation 写入）
// 红线: manual=true 的时间槽为人工锚点, 不参与优化
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,

    // ===== 关联 =====
    pub procedure_id: String,
    pub order_id: String,
    pub task_id: String,
    /// 工作中心（继承自工序）
    #[serde(default)]
    pub work_center_id: Option<String>,

    // ===== 工时与分片 =====
    pub duration_minutes: i64,
    #[serde(default = "default_slice")]
    pub slice_index: i32,
    #[serde(default = "default_slice")]
    pub slice_total: i32,

    // ===== 决策字段 =====
    #[serde(default)]
    pub start: Option<NaiveDateTime>,
    #[serde(default)]
    pub maintenance_window_id: Option<String>,

    // ===== 派生字段 =====
    #[serde(default)]
    pub end: Option<NaiveDateTime>,
    /// 台账实际记账的分钟数（分配失败为 0）
    #[serde(default)]
    pub allocated_minutes: i64,

    // ===== 标志 =====
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub parallel: bool,

    /// 校验信息（分号拼接）
    #[serde(default)]
    pub validation_message: Option<String>,
}

fn default_slice() -> i32 {
    1
}

impl TimeSlot {
    pub fn new(
        id: impl Into<String>,
        procedure_id: impl Into<String>,
        order_id: impl Into<String>,
        task_id: impl Into<String>,
        duration_minutes: i64,
    ) -> Self {
        Self {
            id: id.into(),
            procedure_id: procedure_id.into(),
            order_id: order_id.into(),
            task_id: task_id.into(),
            work_center_id: None,
            duration_minutes,
            slice_index: 1,
            slice_total: 1,
            start: None,
            maintenance_window_id: None,
            end: None,
            allocated_minutes: 0,
            manual: false,
            parallel: false,
            validation_message: None,
        }
    }

    /// 是否已落位（有开始时间）
    pub fn is_placed(&self) -> bool {
        self.start.is_some()
    }

    /// 开始日期
    pub fn date(&self) -> Option<NaiveDate> {
        self.start.map(|s| s.date())
    }

    /// 按 start + duration 计算的结束时刻
    pub fn computed_end(&self) -> Option<NaiveDateTime> {
        self.start
            .map(|s| s + Duration::minutes(self.duration_minutes))
    }

    /// 与另一时间槽的重叠分钟数（完整日期时间区间比较, 半开区间）
    pub fn overlap_minutes(&self, other: &TimeSlot) -> i64 {
        match (self.start, self.end, other.start, other.end) {
            (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) => {
                let start = a_start.max(b_start);
                let end = a_end.min(b_end);
                if end > start {
                    (end - start).num_minutes()
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    /// 追加校验信息（分号拼接）
    pub fn append_validation_message(&mut self, message: &str) {
        match &mut self.validation_message {
            Some(existing) if !existing.is_empty() => {
                existing.push_str("; ");
                existing.push_str(message);
            }
            _ => self.validation_message = Some(message.to_string()),
        }
    }
}
