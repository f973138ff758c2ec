use crate::engine::strategy::ScheduleScenario;
use serde::{Deserialize, Serialize};

/// 自定义权重方案
///
/// 存储位置：ConfigManager（key='custom_weight/{profile_id}'，value 为 JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomWeightProfile {
    /// 方案 ID（用于选择/引用）
    pub profile_id: String,

    /// 显示名称
    pub title: String,

    /// 说明（可选）
    #[serde(default)]
    pub description: Option<String>,

    /// 基于哪个预设场景
    #[serde(default)]
    pub base_scenario: ScheduleScenario,

    /// 权重覆盖参数
    #[serde(default)]
    pub parameters: CustomWeightParameters,
}

/// 权重覆盖参数（None 表示沿用预设）
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CustomWeightParameters {
    #[serde(default)]
    pub work_center_mismatch: Option<i64>,
    #[serde(default)]
    pub capacity_overrun: Option<i64>,
    #[serde(default)]
    pub work_center_overlap: Option<i64>,
    #[serde(default)]
    pub procedure_precedence: Option<i64>,
    #[serde(default)]
    pub slice_order: Option<i64>,
    #[serde(default)]
    pub real_start_anchor: Option<i64>,
    #[serde(default)]
    pub makespan: Option<i64>,
    #[serde(default)]
    pub early_start: Option<i64>,
    #[serde(default)]
    pub priority_finish_order: Option<i64>,
    #[serde(default)]
    pub load_balance: Option<i64>,
    #[serde(default)]
    pub slice_contiguity: Option<i64>,
    #[serde(default)]
    pub capacity_utilization: Option<i64>,
}

impl CustomWeightParameters {
    /// 按约束名设置覆盖值（配置键 weight/<name> 使用）
    pub fn set_named(&mut self, name: &str, value: i64) -> Result<(), String> {
        let slot = match name {
            "work_center_mismatch" => &mut self.work_center_mismatch,
            "capacity_overrun" => &mut self.capacity_overrun,
            "work_center_overlap" => &mut self.work_center_overlap,
            "procedure_precedence" => &mut self.procedure_precedence,
            "slice_order" => &mut self.slice_order,
            "real_start_anchor" => &mut self.real_start_anchor,
            "makespan" => &mut self.makespan,
            "early_start" => &mut self.early_start,
            "priority_finish_order" => &mut self.priority_finish_order,
            "load_balance" => &mut self.load_balance,
            "slice_contiguity" => &mut self.slice_contiguity,
            "capacity_utilization" => &mut self.capacity_utilization,
            other => return Err(format!("未知约束名: {}", other)),
        };
        *slot = Some(value);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
