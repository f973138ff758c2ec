// ==========================================
// 工序排产求解核心 - 工作中心/维护窗口领域模型
// ==========================================
// 红线: 0 ≤ consumed ≤ capacity, consumed 仅由 CapacityLedger 写入
// ==========================================

use crate::domain::types::WorkCenterStatus;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// WorkCenter - 工作中心（机台）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkCenter {
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub status: WorkCenterStatus,
}

impl WorkCenter {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            status: WorkCenterStatus::Available,
        }
    }
}

// ==========================================
// MaintenanceWindow - 维护窗口（工作中心单日产能预算）
// ==========================================
// 用途: 既是产能台账的记账单元, 也是时间槽的决策变量取值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub id: String,
    pub work_center_id: String,
    pub date: NaiveDate,

    // ===== 产能参数（分钟） =====
    pub capacity_minutes: i64,
    /// 加载方预占用的分钟数（本问题之外的占用）
    #[serde(default)]
    pub reserved_minutes: i64,
    /// 已消耗分钟数（= 预占用 + 本问题分配）
    #[serde(default)]
    pub consumed_minutes: i64,

    // ===== 班次时钟 =====
    pub start_clock: NaiveTime,
    pub end_clock: NaiveTime,
}

impl MaintenanceWindow {
    pub fn new(
        id: impl Into<String>,
        work_center_id: impl Into<String>,
        date: NaiveDate,
        capacity_minutes: i64,
        start_clock: NaiveTime,
        end_clock: NaiveTime,
    ) -> Self {
        Self {
            id: id.into(),
            work_center_id: work_center_id.into(),
            date,
            capacity_minutes,
            reserved_minutes: 0,
            consumed_minutes: 0,
            start_clock,
            end_clock,
        }
    }

    /// 窗口开始时刻 = 日期 + 开始时钟
    pub fn start_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_clock)
    }

    /// 窗口结束时刻（结束时钟早于开始时钟视为跨夜）
    pub fn end_at(&self) -> NaiveDateTime {
        let end = self.date.and_time(self.end_clock);
        if self.end_clock <= self.start_clock {
            end + chrono::Duration::days(1)
        } else {
            end
        }
    }
}

// ==========================================
// Trait: CapacityConstraint
// ==========================================
// 用途: 构造启发式/校验器的产能检查接口
pub trait CapacityConstraint {
    /// 检查是否可再分配 minutes
    fn can_allocate(&self, minutes: i64) -> bool;

    /// 剩余产能（分钟）
    fn remaining_minutes(&self) -> i64;

    /// 产能利用率（0.0 - 1.0）
    fn utilization_ratio(&self) -> f64;
}

impl CapacityConstraint for MaintenanceWindow {
    fn can_allocate(&self, minutes: i64) -> bool {
        self.consumed_minutes + minutes <= self.capacity_minutes
    }

    fn remaining_minutes(&self) -> i64 {
        (self.capacity_minutes - self.consumed_minutes).max(0)
    }

    fn utilization_ratio(&self) -> f64 {
        if self.capacity_minutes <= 0 {
            return 0.0;
        }
        (self.consumed_minutes as f64 / self.capacity_minutes as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(capacity: i64, consumed: i64) -> MaintenanceWindow {
        let mut w = MaintenanceWindow::new(
            "MW1",
            "WC1",
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            capacity,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        );
        w.consumed_minutes = consumed;
        w
    }

    #[test]
    fn test_capacity_constraint() {
        let w = window(480, 400);
        assert!(w.can_allocate(80));
        assert!(!w.can_allocate(81));
        assert_eq!(w.remaining_minutes(), 80);
        assert!((w.utilization_ratio() - 400.0 / 480.0).abs() < 1e-9);
    }

    #[test]
    fn test_overnight_window_end() {
        let mut w = window(480, 0);
        w.start_clock = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        w.end_clock = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        assert_eq!(
            w.end_at(),
            NaiveDate::from_ymd_opt(2026, 3, 3)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap()
        );
    }
}
