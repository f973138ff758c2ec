// ==========================================
// 工序排产求解核心 - 人工落位可行性校验
// ==========================================
// 职责: 检查人工时间槽的业务规则, 把违规写入 validation_message
//   - 所在 (工作中心, 日期) 无维护窗口
//   - 产能: 同组时间槽时长之和 + 预占用 > 窗口产能
//   - 重叠: 与同组其它时间槽的完整日期时间区间重叠（并行槽豁免）
// 红线: 幂等（先清空旧信息）; 除校验信息外只允许补全缺失的窗口 ID
//       规则违规不返回错误
// ==========================================

use crate::domain::solution::ScheduleSolution;
use crate::domain::time_slot::TimeSlot;
use crate::domain::work_center::MaintenanceWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// 带校验信息的解
    pub solution: ScheduleSolution,
    /// 违规条数
    pub violation_count: usize,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.violation_count == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeasibilityValidator;

impl FeasibilityValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, mut solution: ScheduleSolution) -> ValidationOutcome {
        for slot in solution.slots.iter_mut() {
            slot.validation_message = None;
        }

        let windows: HashMap<(String, NaiveDate), MaintenanceWindow> = solution
            .maintenance_range
            .iter()
            .map(|w| ((w.work_center_id.clone(), w.date), w.clone()))
            .collect();

        // 补全缺失的窗口 ID
        for slot in solution.slots.iter_mut() {
            if slot.maintenance_window_id.is_some() {
                continue;
            }
            if let (Some(wc), Some(date)) = (slot.work_center_id.clone(), slot.date()) {
                if let Some(window) = windows.get(&(wc, date)) {
                    slot.maintenance_window_id = Some(window.id.clone());
                }
            }
        }

        // 已落位时间槽按 (工作中心, 日期) 分组
        let mut groups: HashMap<(String, NaiveDate), Vec<usize>> = HashMap::new();
        for (i, slot) in solution.slots.iter().enumerate() {
            if let (Some(wc), Some(date)) = (slot.work_center_id.clone(), slot.date()) {
                groups.entry((wc, date)).or_default().push(i);
            }
        }

        let mut messages: Vec<(usize, String)> = Vec::new();
        for (key, members) in &groups {
            let (wc, date) = key;
            let window = windows.get(key);
            let demand: i64 = members
                .iter()
                .map(|&i| solution.slots[i].duration_minutes)
                .sum();

            for &i in members {
                let slot = &solution.slots[i];
                if !slot.manual {
                    continue;
                }

                match window {
                    None => messages.push((
                        i,
                        format!("工作中心 {} 在 {} 无维护窗口", wc, date),
                    )),
                    Some(window) => {
                        let used = demand + window.reserved_minutes;
                        if used > window.capacity_minutes {
                            messages.push((
                                i,
                                format!(
                                    "窗口 {} 产能不足: 需求 {} 分钟（含预占 {}）> 产能 {} 分钟",
                                    window.id, used, window.reserved_minutes, window.capacity_minutes
                                ),
                            ));
                        }
                    }
                }

                if slot.parallel {
                    continue;
                }
                for &j in members {
                    if j == i {
                        continue;
                    }
                    let other = &solution.slots[j];
                    if other.parallel {
                        continue;
                    }
                    let minutes = interval_overlap(slot, other);
                    if minutes > 0 {
                        messages.push((
                            i,
                            format!("与时间槽 {} 重叠 {} 分钟", other.id, minutes),
                        ));
                    }
                }
            }
        }

        // 分组遍历顺序不固定, 按时间槽下标 + 文本排序保证输出稳定
        messages.sort();
        let violation_count = messages.len();
        for (i, message) in messages {
            solution.slots[i].append_validation_message(&message);
        }

        info!(
            problem_id = %solution.problem_id,
            violation_count,
            "人工落位校验完成"
        );
        ValidationOutcome {
            solution,
            violation_count,
        }
    }
}

/// 完整日期时间区间的重叠分钟数（缺少结束时间时按开始 + 时长）
fn interval_overlap(a: &TimeSlot, b: &TimeSlot) -> i64 {
    let (Some(a_start), Some(b_start)) = (a.start, b.start) else {
        return 0;
    };
    let a_end = a.end.or_else(|| a.computed_end()).unwrap_or(a_start);
    let b_end = b.end.or_else(|| b.computed_end()).unwrap_or(b_start);
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    if end > start {
        (end - start).num_minutes()
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time_slot::TimeSlot;
    use chrono::{NaiveDateTime, NaiveTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn slot(id: &str, start: NaiveDateTime, minutes: i64, manual: bool) -> TimeSlot {
        let mut s = TimeSlot::new(id, "P1", "O1", "T1", minutes);
        s.work_center_id = Some("WC1".to_string());
        s.start = Some(start);
        s.end = s.computed_end();
        s.manual = manual;
        s
    }

    fn solution(slots: Vec<TimeSlot>, capacity: i64) -> ScheduleSolution {
        ScheduleSolution {
            problem_id: "p1".to_string(),
            slots,
            maintenance_range: vec![MaintenanceWindow::new(
                "MW1",
                "WC1",
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                capacity,
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            )],
            ..ScheduleSolution::default()
        }
    }

    #[test]
    fn test_overlap_without_capacity_violation() {
        let outcome = FeasibilityValidator::new().validate(solution(
            vec![slot("A", at(8, 0), 120, true), slot("B", at(9, 0), 60, false)],
            480,
        ));
        assert_eq!(outcome.violation_count, 1);
        let a = outcome.solution.slot("A").unwrap();
        assert_eq!(a.validation_message.as_deref(), Some("与时间槽 B 重叠 60 分钟"));
        assert_eq!(a.maintenance_window_id.as_deref(), Some("MW1"));
        // 非人工时间槽不被标注
        assert!(outcome.solution.slot("B").unwrap().validation_message.is_none());
    }

    #[test]
    fn test_capacity_and_messages_joined() {
        let outcome = FeasibilityValidator::new().validate(solution(
            vec![slot("A", at(8, 0), 120, true), slot("B", at(9, 0), 60, false)],
            150,
        ));
        assert_eq!(outcome.violation_count, 2);
        let message = outcome.solution.slot("A").unwrap().validation_message.clone().unwrap();
        assert!(message.contains("; "));
        assert!(message.contains("产能不足"));
    }

    #[test]
    fn test_idempotent() {
        let validator = FeasibilityValidator::new();
        let first = validator.validate(solution(
            vec![slot("A", at(8, 0), 120, true), slot("B", at(9, 0), 60, true)],
            480,
        ));
        let second = validator.validate(first.solution.clone());
        assert_eq!(first.violation_count, second.violation_count);
        assert_eq!(first.solution.slots, second.solution.slots);
    }

    #[test]
    fn test_missing_window_and_parallel_exempt() {
        let mut other_day = slot("C", at(8, 0) + chrono::Duration::days(1), 60, true);
        other_day.parallel = true;
        let mut b = slot("B", at(9, 0), 60, false);
        b.parallel = true;
        let outcome = FeasibilityValidator::new().validate(solution(
            vec![slot("A", at(8, 0), 120, true), b, other_day],
            480,
        ));
        assert_eq!(outcome.violation_count, 1);
        assert!(outcome
            .solution
            .slot("C")
            .unwrap()
            .validation_message
            .as_deref()
            .unwrap()
            .contains("无维护窗口"));
        assert!(outcome.solution.slot("A").unwrap().validation_message.is_none());
    }
}
