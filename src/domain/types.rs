// ==========================================
// 工序排产求解核心 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 任务状态 (Task Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,    // 待生产
    InProgress, // 生产中
    Suspended,  // 暂停
    Completed,  // 已完工
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::InProgress => write!(f, "IN_PROGRESS"),
            TaskStatus::Suspended => write!(f, "SUSPENDED"),
            TaskStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

// ==========================================
// 工作中心状态 (Work Center Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkCenterStatus {
    #[default]
    Available,   // 可用
    Maintenance, // 检修
    Disabled,    // 停用
}

impl fmt::Display for WorkCenterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkCenterStatus::Available => write!(f, "AVAILABLE"),
            WorkCenterStatus::Maintenance => write!(f, "MAINTENANCE"),
            WorkCenterStatus::Disabled => write!(f, "DISABLED"),
        }
    }
}

// ==========================================
// 求解状态 (Solver Status)
// ==========================================
// 状态机: NOT_RUNNING -> SCHEDULED -> ACTIVE -> NOT_RUNNING
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    #[default]
    NotRunning,
    Scheduled,
    Active,
}

impl SolverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverStatus::NotRunning => "NOT_RUNNING",
            SolverStatus::Scheduled => "SCHEDULED",
            SolverStatus::Active => "ACTIVE",
        }
    }

    /// 用于原子存储
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            SolverStatus::NotRunning => 0,
            SolverStatus::Scheduled => 1,
            SolverStatus::Active => 2,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => SolverStatus::Scheduled,
            2 => SolverStatus::Active,
            _ => SolverStatus::NotRunning,
        }
    }

    /// 是否处于求解中（已调度或执行中）
    pub fn is_running(&self) -> bool {
        !matches!(self, SolverStatus::NotRunning)
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 约束层级 (Score Level)
// ==========================================
// 顺序: Hard > Medium > Soft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreLevel {
    Hard,
    Medium,
    Soft,
}

impl fmt::Display for ScoreLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreLevel::Hard => write!(f, "HARD"),
            ScoreLevel::Medium => write!(f, "MEDIUM"),
            ScoreLevel::Soft => write!(f, "SOFT"),
        }
    }
}
