// ==========================================
// 工序排产求解核心 - 排产场景定义
// ==========================================
// 用途:
// - 提交求解前选择场景, 场景决定约束权重表;
// - 切换场景 = 构造一张新的权重表, 不修改任何共享状态。

use serde::{Deserialize, Serialize};

/// 排产场景（决定约束权重预设）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleScenario {
    #[default]
    Balanced,
    /// 紧急插单: 强化准时/优先级权重
    Emergency,
    /// 成本优化: 强化负荷均衡/产能利用权重
    CostOptimization,
}

impl ScheduleScenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleScenario::Balanced => "balanced",
            ScheduleScenario::Emergency => "emergency",
            ScheduleScenario::CostOptimization => "cost_optimization",
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            ScheduleScenario::Balanced => "均衡方案",
            ScheduleScenario::Emergency => "紧急优先",
            ScheduleScenario::CostOptimization => "成本优化",
        }
    }
}

impl std::str::FromStr for ScheduleScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balanced" | "default" => Ok(ScheduleScenario::Balanced),
            "emergency" | "urgent" => Ok(ScheduleScenario::Emergency),
            "cost_optimization" | "cost-optimization" | "cost" => {
                Ok(ScheduleScenario::CostOptimization)
            }
            other => Err(format!("未知排产场景: {}", other)),
        }
    }
}
