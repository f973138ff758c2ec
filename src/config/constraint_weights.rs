// ==========================================
// 工序排产求解核心 - 约束权重表
// ==========================================
// 红线: 权重表是不可变值对象, 在提交求解时选定;
//       切换场景 = 构造新表, 不存在可变的全局权重
// 权重为 0 表示关闭该约束
// ==========================================

use crate::config::weight_profile::CustomWeightParameters;
use crate::engine::strategy::ScheduleScenario;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintWeights {
    // ===== Hard =====
    /// 每个工作中心不匹配的时间槽
    pub work_center_mismatch: i64,
    /// 每超出 1 分钟产能
    pub capacity_overrun: i64,
    /// 同工作中心同日每重叠 1 分钟
    pub work_center_overlap: i64,

    // ===== Medium =====
    /// 后道早于前道完工, 每重叠 1 分钟
    pub procedure_precedence: i64,
    /// 分片时间顺序与序号不一致, 每重叠 1 分钟
    pub slice_order: i64,
    /// 早于实际开工时间, 每提前 1 分钟
    pub real_start_anchor: i64,

    // ===== Soft =====
    /// 总跨度, 每分钟
    pub makespan: i64,
    /// 开始时间距排产起点, 每小时 × (优先级 + 1)
    pub early_start: i64,
    /// 高优先级任务晚于低优先级任务完工, 每对
    pub priority_finish_order: i64,
    /// 工作中心负荷与均值偏差, 每分钟
    pub load_balance: i64,
    /// 分片链之间的空闲天数, 每天
    pub slice_contiguity: i64,
    /// 窗口产能利用率, 每百分点（奖励）
    pub capacity_utilization: i64,
}

impl Default for ConstraintWeights {
    fn default() -> Self {
        Self::for_scenario(ScheduleScenario::Balanced)
    }
}

impl ConstraintWeights {
    /// 场景预设
    pub fn for_scenario(scenario: ScheduleScenario) -> Self {
        let balanced = Self {
            work_center_mismatch: 1000,
            capacity_overrun: 1,
            work_center_overlap: 1,
            procedure_precedence: 1,
            slice_order: 1,
            real_start_anchor: 1,
            makespan: 1,
            early_start: 1,
            priority_finish_order: 60,
            load_balance: 1,
            slice_contiguity: 60,
            capacity_utilization: 1,
        };

        match scenario {
            ScheduleScenario::Balanced => balanced,
            ScheduleScenario::Emergency => Self {
                makespan: 2,
                early_start: 5,
                priority_finish_order: 300,
                load_balance: 0,
                capacity_utilization: 0,
                ..balanced
            },
            ScheduleScenario::CostOptimization => Self {
                early_start: 0,
                priority_finish_order: 20,
                load_balance: 5,
                capacity_utilization: 5,
                ..balanced
            },
        }
    }

    /// 叠加自定义参数（返回新表）
    pub fn with_overrides(mut self, params: &CustomWeightParameters) -> Self {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = params.$field { self.$field = v.max(0); })*
            };
        }
        apply!(
            work_center_mismatch,
            capacity_overrun,
            work_center_overlap,
            procedure_precedence,
            slice_order,
            real_start_anchor,
            makespan,
            early_start,
            priority_finish_order,
            load_balance,
            slice_contiguity,
            capacity_utilization,
        );
        self
    }
}
