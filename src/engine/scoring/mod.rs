// ==========================================
// 工序排产求解核心 - 评分引擎
// ==========================================
// 分层: Hard（可行性） > Medium（工艺顺序/锚点） > Soft（优化目标）
// 权重: 提交时选定的 ConstraintWeights（不可变）, 权重为 0 的约束不参与
// 口径: 每次评分全量计算, 与解释共用同一套约束函数
// ==========================================

pub mod explanation;
mod hard;
mod medium;
mod soft;

pub use explanation::{ConstraintMatch, ConstraintMatchTotal, ScoreExplanation};

use crate::config::constraint_weights::ConstraintWeights;
use crate::domain::score::HardMediumSoftScore;
use crate::domain::types::ScoreLevel;
use crate::engine::state::ScheduleState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 约束标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintId {
    WorkCenterMismatch,
    CapacityOverrun,
    WorkCenterOverlap,
    ProcedurePrecedence,
    SliceOrder,
    RealStartAnchor,
    Makespan,
    EarlyStart,
    PriorityFinishOrder,
    LoadBalance,
    SliceContiguity,
    CapacityUtilization,
}

impl ConstraintId {
    pub const ALL: [ConstraintId; 12] = [
        ConstraintId::WorkCenterMismatch,
        ConstraintId::CapacityOverrun,
        ConstraintId::WorkCenterOverlap,
        ConstraintId::ProcedurePrecedence,
        ConstraintId::SliceOrder,
        ConstraintId::RealStartAnchor,
        ConstraintId::Makespan,
        ConstraintId::EarlyStart,
        ConstraintId::PriorityFinishOrder,
        ConstraintId::LoadBalance,
        ConstraintId::SliceContiguity,
        ConstraintId::CapacityUtilization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintId::WorkCenterMismatch => "work_center_mismatch",
            ConstraintId::CapacityOverrun => "capacity_overrun",
            ConstraintId::WorkCenterOverlap => "work_center_overlap",
            ConstraintId::ProcedurePrecedence => "procedure_precedence",
            ConstraintId::SliceOrder => "slice_order",
            ConstraintId::RealStartAnchor => "real_start_anchor",
            ConstraintId::Makespan => "makespan",
            ConstraintId::EarlyStart => "early_start",
            ConstraintId::PriorityFinishOrder => "priority_finish_order",
            ConstraintId::LoadBalance => "load_balance",
            ConstraintId::SliceContiguity => "slice_contiguity",
            ConstraintId::CapacityUtilization => "capacity_utilization",
        }
    }

    pub fn level(&self) -> ScoreLevel {
        match self {
            ConstraintId::WorkCenterMismatch
            | ConstraintId::CapacityOverrun
            | ConstraintId::WorkCenterOverlap => ScoreLevel::Hard,
            ConstraintId::ProcedurePrecedence
            | ConstraintId::SliceOrder
            | ConstraintId::RealStartAnchor => ScoreLevel::Medium,
            _ => ScoreLevel::Soft,
        }
    }

    pub fn weight(&self, weights: &ConstraintWeights) -> i64 {
        match self {
            ConstraintId::WorkCenterMismatch => weights.work_center_mismatch,
            ConstraintId::CapacityOverrun => weights.capacity_overrun,
            ConstraintId::WorkCenterOverlap => weights.work_center_overlap,
            ConstraintId::ProcedurePrecedence => weights.procedure_precedence,
            ConstraintId::SliceOrder => weights.slice_order,
            ConstraintId::RealStartAnchor => weights.real_start_anchor,
            ConstraintId::Makespan => weights.makespan,
            ConstraintId::EarlyStart => weights.early_start,
            ConstraintId::PriorityFinishOrder => weights.priority_finish_order,
            ConstraintId::LoadBalance => weights.load_balance,
            ConstraintId::SliceContiguity => weights.slice_contiguity,
            ConstraintId::CapacityUtilization => weights.capacity_utilization,
        }
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// ScoreCollector - 约束命中收集器
// ==========================================
pub(crate) struct ScoreCollector<'w> {
    weights: &'w ConstraintWeights,
    score: HardMediumSoftScore,
    matches: Option<Vec<ConstraintMatch>>,
}

impl<'w> ScoreCollector<'w> {
    fn new(weights: &'w ConstraintWeights, explain: bool) -> Self {
        Self {
            weights,
            score: HardMediumSoftScore::ZERO,
            matches: if explain { Some(Vec::new()) } else { None },
        }
    }

    /// 约束是否启用（权重非 0）
    pub(crate) fn enabled(&self, id: ConstraintId) -> bool {
        id.weight(self.weights) != 0
    }

    /// 记录一次命中; units 带符号（惩罚为负, 奖励为正）
    ///
    /// 说明文本只在解释模式下生成
    pub(crate) fn add<D>(&mut self, id: ConstraintId, units: i64, entity_ids: &[&str], describe: D)
    where
        D: FnOnce() -> String,
    {
        if units == 0 {
            return;
        }
        let weight = id.weight(self.weights);
        if weight == 0 {
            return;
        }

        let impact = HardMediumSoftScore::of_level(id.level(), units.saturating_mul(weight));
        self.score += impact;

        if let Some(matches) = &mut self.matches {
            matches.push(ConstraintMatch {
                constraint_id: id,
                score: impact,
                entity_ids: entity_ids.iter().map(|s| s.to_string()).collect(),
                description: describe(),
            });
        }
    }
}

// ==========================================
// ScoreCalculator - 评分计算器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCalculator {
    weights: ConstraintWeights,
}

impl ScoreCalculator {
    pub fn new(weights: ConstraintWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ConstraintWeights {
        &self.weights
    }

    /// 计算当前状态的分数
    pub fn calculate(&self, state: &ScheduleState) -> HardMediumSoftScore {
        let mut collector = ScoreCollector::new(&self.weights, false);
        Self::evaluate(state, &mut collector);
        collector.score
    }

    /// 计算分数并给出逐约束解释
    pub fn explain(&self, state: &ScheduleState) -> ScoreExplanation {
        let mut collector = ScoreCollector::new(&self.weights, true);
        Self::evaluate(state, &mut collector);
        let weights = self.weights;
        ScoreExplanation::from_matches(
            collector.score,
            collector.matches.unwrap_or_default(),
            |id| id.weight(&weights),
        )
    }

    fn evaluate(state: &ScheduleState, collector: &mut ScoreCollector<'_>) {
        // ===== Hard =====
        hard::work_center_mismatch(state, collector);
        hard::capacity_overrun(state, collector);
        hard::work_center_overlap(state, collector);

        // ===== Medium =====
        medium::procedure_precedence(state, collector);
        medium::slice_order(state, collector);
        medium::real_start_anchor(state, collector);

        // ===== Soft =====
        soft::makespan(state, collector);
        soft::early_start(state, collector);
        soft::priority_finish_order(state, collector);
        soft::load_balance(state, collector);
        soft::slice_contiguity(state, collector);
        soft::capacity_utilization(state, collector);
    }
}
