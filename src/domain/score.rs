// ==========================================
// 工序排产求解核心 - 分层评分
// ==========================================
// 比较规则: 字典序 hard > medium > soft, 各层数值越大越好
// 文本格式: "{hard}hard/{medium}medium/{soft}soft"
// ==========================================

use crate::domain::types::ScoreLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

/// 字段声明顺序即比较顺序（derive Ord 按字段字典序）
///
/// 序列化为文本格式
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct HardMediumSoftScore {
    pub hard: i64,
    pub medium: i64,
    pub soft: i64,
}

impl HardMediumSoftScore {
    pub const ZERO: HardMediumSoftScore = HardMediumSoftScore {
        hard: 0,
        medium: 0,
        soft: 0,
    };

    pub fn new(hard: i64, medium: i64, soft: i64) -> Self {
        Self { hard, medium, soft }
    }

    pub fn of_hard(hard: i64) -> Self {
        Self::new(hard, 0, 0)
    }

    pub fn of_medium(medium: i64) -> Self {
        Self::new(0, medium, 0)
    }

    pub fn of_soft(soft: i64) -> Self {
        Self::new(0, 0, soft)
    }

    pub fn of_level(level: ScoreLevel, value: i64) -> Self {
        match level {
            ScoreLevel::Hard => Self::of_hard(value),
            ScoreLevel::Medium => Self::of_medium(value),
            ScoreLevel::Soft => Self::of_soft(value),
        }
    }

    /// 可行解: hard == 0
    pub fn is_feasible(&self) -> bool {
        self.hard == 0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Add for HardMediumSoftScore {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.hard + rhs.hard,
            self.medium + rhs.medium,
            self.soft + rhs.soft,
        )
    }
}

impl AddAssign for HardMediumSoftScore {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for HardMediumSoftScore {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.hard - rhs.hard,
            self.medium - rhs.medium,
            self.soft - rhs.soft,
        )
    }
}

impl Neg for HardMediumSoftScore {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.hard, -self.medium, -self.soft)
    }
}

impl fmt::Display for HardMediumSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}hard/{}medium/{}soft",
            self.hard, self.medium, self.soft
        )
    }
}

impl FromStr for HardMediumSoftScore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() != 3 {
            return Err(format!("评分格式错误: {}", s));
        }

        fn parse_part(part: &str, suffix: &str) -> Result<i64, String> {
            let number = part
                .trim()
                .strip_suffix(suffix)
                .ok_or_else(|| format!("评分片段缺少后缀 {}: {}", suffix, part))?;
            number
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("评分数值解析失败 ({}): {}", part, e))
        }

        Ok(Self::new(
            parse_part(parts[0], "hard")?,
            parse_part(parts[1], "medium")?,
            parse_part(parts[2], "soft")?,
        ))
    }
}

impl TryFrom<String> for HardMediumSoftScore {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HardMediumSoftScore> for String {
    fn from(score: HardMediumSoftScore) -> Self {
        score.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicographic_order() {
        let a = HardMediumSoftScore::new(0, -100, -5000);
        let b = HardMediumSoftScore::new(-1, 0, 0);
        let c = HardMediumSoftScore::new(0, -100, -4000);
        assert!(a > b); // hard 优先
        assert!(c > a); // 同 hard/medium 比 soft
        assert!(HardMediumSoftScore::new(0, -1, 1_000_000) < HardMediumSoftScore::ZERO);
    }

    #[test]
    fn test_display_and_parse() {
        let score = HardMediumSoftScore::new(-2, -60, 1234);
        let text = score.to_string();
        assert_eq!(text, "-2hard/-60medium/1234soft");
        assert_eq!(text.parse::<HardMediumSoftScore>().unwrap(), score);
        assert!("1hard/2soft".parse::<HardMediumSoftScore>().is_err());
        assert!("xhard/0medium/0soft".parse::<HardMediumSoftScore>().is_err());
    }

    #[test]
    fn test_serde_uses_text_form() {
        let score = HardMediumSoftScore::new(0, -60, -7);
        let json = serde_json::to_string(&score).unwrap();
        assert_eq!(json, "\"0hard/-60medium/-7soft\"");
        let back: HardMediumSoftScore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, score);
    }

    #[test]
    fn test_feasible() {
        assert!(HardMediumSoftScore::new(0, -10, -10).is_feasible());
        assert!(!HardMediumSoftScore::new(-1, 0, 0).is_feasible());
    }
}
