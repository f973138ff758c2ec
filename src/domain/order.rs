// ==========================================
// 工序排产求解核心 - 订单/任务领域模型
// ==========================================

use crate::domain::types::TaskStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Order - 生产订单
// ==========================================
// 红线: 求解期间只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub code: Option<String>,

    // ===== 计划时间 =====
    pub planned_start: Option<NaiveDateTime>,
    pub planned_end: Option<NaiveDateTime>,

    // ===== 实际时间 =====
    #[serde(default)]
    pub actual_start: Option<NaiveDateTime>,
    #[serde(default)]
    pub actual_end: Option<NaiveDateTime>,

    #[serde(default)]
    pub quantity: f64,
}

impl Order {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: None,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            quantity: 0.0,
        }
    }

    /// 计划开始 ≤ 计划结束（任一缺失视为满足）
    pub fn has_valid_plan_range(&self) -> bool {
        match (self.planned_start, self.planned_end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }
}

// ==========================================
// Task - 生产任务（订单的一次生产执行）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub order_id: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// 优先级，数值越大越紧急
    #[serde(default)]
    pub priority: i32,
}

impl Task {
    pub fn new(id: impl Into<String>, order_id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            order_id: order_id.into(),
            status: TaskStatus::Pending,
            priority,
        }
    }
}
