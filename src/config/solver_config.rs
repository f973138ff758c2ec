// ==========================================
// 工序排产求解核心 - 求解器配置
// ==========================================
// 职责: 一次求解运行的参数（线程数/终止条件/搜索参数/权重场景）
// ==========================================

use crate::config::constraint_weights::ConstraintWeights;
use crate::config::weight_profile::CustomWeightParameters;
use crate::domain::score::HardMediumSoftScore;
use crate::engine::strategy::ScheduleScenario;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 终止条件（由监督任务判定）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationConfig {
    /// 总耗时上限（毫秒）
    #[serde(default)]
    pub spent_limit_ms: Option<u64>,

    /// 无改进耗时上限（毫秒）
    #[serde(default)]
    pub unimproved_spent_limit_ms: Option<u64>,

    /// 目标分数（达到或超过即终止）
    #[serde(default)]
    pub best_score_limit: Option<HardMediumSoftScore>,

    /// 监督任务轮询间隔（毫秒）
    #[serde(default = "default_poll_ms")]
    pub supervisor_poll_ms: u64,
}

fn default_poll_ms() -> u64 {
    20
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            spent_limit_ms: Some(30_000),
            unimproved_spent_limit_ms: None,
            best_score_limit: None,
            supervisor_poll_ms: default_poll_ms(),
        }
    }
}

impl TerminationConfig {
    pub fn spent_limit(&self) -> Option<Duration> {
        self.spent_limit_ms.map(Duration::from_millis)
    }

    pub fn unimproved_spent_limit(&self) -> Option<Duration> {
        self.unimproved_spent_limit_ms.map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.supervisor_poll_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 权重场景
    #[serde(default)]
    pub scenario: ScheduleScenario,

    /// 自定义权重覆盖
    #[serde(default)]
    pub weight_overrides: Option<CustomWeightParameters>,

    /// 移动线程数
    #[serde(default = "default_move_threads")]
    pub move_thread_count: usize,

    /// Late Acceptance 历史长度
    #[serde(default = "default_late_acceptance")]
    pub late_acceptance_size: usize,

    /// 随机种子（None 时取系统熵）
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// 开始时间取值步长（分钟）
    #[serde(default = "default_step")]
    pub start_time_step_minutes: i64,

    #[serde(default)]
    pub termination: TerminationConfig,
}

fn default_move_threads() -> usize {
    2
}

fn default_late_acceptance() -> usize {
    400
}

fn default_step() -> i64 {
    30
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            scenario: ScheduleScenario::default(),
            weight_overrides: None,
            move_thread_count: default_move_threads(),
            late_acceptance_size: default_late_acceptance(),
            random_seed: None,
            start_time_step_minutes: default_step(),
            termination: TerminationConfig::default(),
        }
    }
}

impl SolverConfig {
    /// 提交时选定的权重表（场景预设 + 覆盖）
    pub fn weights(&self) -> ConstraintWeights {
        let base = ConstraintWeights::for_scenario(self.scenario);
        match &self.weight_overrides {
            Some(params) => base.with_overrides(params),
            None => base,
        }
    }

    pub fn with_scenario(mut self, scenario: ScheduleScenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_spent_limit(mut self, limit: Duration) -> Self {
        self.termination.spent_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// 参数校验
    pub fn validate(&self) -> Result<(), String> {
        if self.move_thread_count == 0 {
            return Err("move_thread_count 必须 >= 1".to_string());
        }
        if self.late_acceptance_size == 0 {
            return Err("late_acceptance_size 必须 >= 1".to_string());
        }
        if self.start_time_step_minutes <= 0 {
            return Err("start_time_step_minutes 必须 > 0".to_string());
        }
        Ok(())
    }
}
