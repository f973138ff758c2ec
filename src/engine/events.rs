// ==========================================
// 工序排产求解核心 - 求解事件回调
// ==========================================
// 职责: 定义求解过程事件监听 trait, 求解任务在以下时机回调
//   - 最优解严格改进
//   - 运行完全停止（恰好一次）
//   - 内部故障（移动线程错误/panic）
// 说明: 回调在求解线程或监督任务中执行, 实现方应尽快返回
// ==========================================

use crate::domain::solution::ScheduleSolution;
use serde::{Deserialize, Serialize};

/// 求解事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverEventType {
    BestSolutionImproved,
    SolvingFinished,
    SolvingError,
}

impl SolverEventType {
    pub fn as_str(&self) -> &str {
        match self {
            SolverEventType::BestSolutionImproved => "BestSolutionImproved",
            SolverEventType::SolvingFinished => "SolvingFinished",
            SolverEventType::SolvingError => "SolvingError",
        }
    }
}

/// 求解事件监听者 Trait
///
/// 所有方法均有空实现, 按需覆盖
pub trait SolverEventListener: Send + Sync {
    /// 最优解严格改进（分数单调递增）
    fn on_best_solution_improved(&self, _problem_id: &str, _solution: &ScheduleSolution) {}

    /// 运行已完全停止; solution 为最后发布的最优解
    fn on_solving_finished(&self, _problem_id: &str, _solution: Option<&ScheduleSolution>) {}

    /// 内部故障; 任务转为 NotRunning, 保留最后的最优解
    fn on_solving_error(&self, _problem_id: &str, _cause: &str) {}
}

/// 空操作监听者
///
/// 用于不需要回调的场景（如 submit 的默认监听者）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventListener;

impl SolverEventListener for NoOpEventListener {
    fn on_solving_finished(&self, problem_id: &str, _solution: Option<&ScheduleSolution>) {
        tracing::debug!(
            "NoOpEventListener: 跳过事件 - problem_id={}, event_type={}",
            problem_id,
            SolverEventType::SolvingFinished.as_str()
        );
    }
}
