// ==========================================
// 工序排产求解核心 - 评分解释
// ==========================================
// 结构: ScoreExplanation → 每个有贡献的约束一条 ConstraintMatchTotal
//       → 每次命中一条 ConstraintMatch（分数 + 实体 ID + 说明）
// ==========================================

use crate::domain::score::HardMediumSoftScore;
use crate::domain::types::ScoreLevel;
use crate::engine::scoring::ConstraintId;
use serde::{Deserialize, Serialize};

/// 单次约束命中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintMatch {
    pub constraint_id: ConstraintId,
    pub score: HardMediumSoftScore,
    /// 涉及的实体（时间槽/工序/窗口/任务/工作中心 ID）
    pub entity_ids: Vec<String>,
    pub description: String,
}

/// 单个约束的汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintMatchTotal {
    pub constraint_id: ConstraintId,
    pub level: ScoreLevel,
    pub weight: i64,
    pub total: HardMediumSoftScore,
    pub matches: Vec<ConstraintMatch>,
}

impl ConstraintMatchTotal {
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreExplanation {
    pub score: HardMediumSoftScore,
    pub constraint_totals: Vec<ConstraintMatchTotal>,
}

impl ScoreExplanation {
    /// 由命中列表汇总（按约束声明顺序输出, 零贡献约束省略）
    pub(crate) fn from_matches(
        score: HardMediumSoftScore,
        matches: Vec<ConstraintMatch>,
        weight_of: impl Fn(ConstraintId) -> i64,
    ) -> Self {
        let mut constraint_totals: Vec<ConstraintMatchTotal> = Vec::new();
        for id in ConstraintId::ALL {
            let own: Vec<ConstraintMatch> = matches
                .iter()
                .filter(|m| m.constraint_id == id)
                .cloned()
                .collect();
            let total = own
                .iter()
                .fold(HardMediumSoftScore::ZERO, |acc, m| acc + m.score);
            if total.is_zero() {
                continue;
            }
            constraint_totals.push(ConstraintMatchTotal {
                constraint_id: id,
                level: id.level(),
                weight: weight_of(id),
                total,
                matches: own,
            });
        }
        Self {
            score,
            constraint_totals,
        }
    }

    pub fn total_of(&self, id: ConstraintId) -> HardMediumSoftScore {
        self.constraint_totals
            .iter()
            .find(|t| t.constraint_id == id)
            .map(|t| t.total)
            .unwrap_or(HardMediumSoftScore::ZERO)
    }

    /// 多行文本摘要（日志/命令行输出）
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("评分: {}", self.score)];
        for total in &self.constraint_totals {
            lines.push(format!(
                "  [{}] {} × {} 次 = {}",
                total.level,
                total.constraint_id,
                total.match_count(),
                total.total
            ));
        }
        lines.join("\n")
    }
}
