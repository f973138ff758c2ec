// ==========================================
// 工序排产求解核心 - 分片规划器
// ==========================================
// 职责: 把工序拆成可落位的时间槽
//   - 按时长拆分: 每片 target 分钟, 末片为余数
//   - 按片数拆分: 每片 ceil(total/count) 分钟, 末片为余数, 零时长片丢弃
//   - 人工时间槽保持原样, 新分片编号排在其后, 全部共享 slice_total
//   - 外协多日: 每天一片, 日期连续, 标记并行（不独占设备）
// ==========================================

use crate::domain::procedure::Procedure;
use crate::domain::time_slot::TimeSlot;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// 拆分方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SliceRequest {
    ByDuration { target_minutes: i64 },
    ByCount { count: i64 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlicePlanner;

impl SlicePlanner {
    pub fn new() -> Self {
        Self
    }

    /// 按目标时长拆分
    pub fn split_by_duration(total: i64, target: i64) -> EngineResult<Vec<i64>> {
        if target <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "分片目标时长必须 > 0: {}",
                target
            )));
        }
        let mut chunks = Vec::new();
        let mut remaining = total;
        while remaining > 0 {
            let chunk = remaining.min(target);
            chunks.push(chunk);
            remaining -= chunk;
        }
        Ok(chunks)
    }

    /// 按片数拆分（零时长片丢弃, 不会出现负数）
    pub fn split_by_count(total: i64, count: i64) -> EngineResult<Vec<i64>> {
        if count <= 0 {
            return Err(EngineError::InvalidInput(format!("分片数必须 > 0: {}", count)));
        }
        if total <= 0 {
            return Ok(Vec::new());
        }
        let chunk = (total + count - 1) / count;
        let mut chunks = Vec::with_capacity(count as usize);
        let mut remaining = total;
        for _ in 0..count {
            let size = remaining.min(chunk);
            if size > 0 {
                chunks.push(size);
            }
            remaining -= size;
        }
        Ok(chunks)
    }

    /// 拆分工序, 返回该工序的完整时间槽集合（人工时间槽 + 新分片）
    ///
    /// existing 中其它工序的时间槽被忽略; 非人工的旧分片被新分片替换
    pub fn slice_procedure(
        &self,
        procedure: &Procedure,
        existing: &[TimeSlot],
        request: SliceRequest,
    ) -> EngineResult<Vec<TimeSlot>> {
        let mut manual: Vec<TimeSlot> = existing
            .iter()
            .filter(|s| s.procedure_id == procedure.id && s.manual)
            .cloned()
            .collect();
        manual.sort_by_key(|s| s.slice_index);

        let manual_minutes: i64 = manual.iter().map(|s| s.duration_minutes).sum();
        let remaining = (procedure.required_minutes - manual_minutes).max(0);

        let chunks = match request {
            SliceRequest::ByDuration { target_minutes } => {
                Self::split_by_duration(remaining, target_minutes)?
            }
            SliceRequest::ByCount { count } => Self::split_by_count(remaining, count)?,
        };

        let base_index = manual.iter().map(|s| s.slice_index).max().unwrap_or(0);
        let total = manual.len() as i32 + chunks.len() as i32;

        let mut slots = manual;
        for slot in slots.iter_mut() {
            slot.slice_total = total;
        }
        for (i, minutes) in chunks.into_iter().enumerate() {
            let mut slot = new_slot(procedure, minutes);
            slot.slice_index = base_index + i as i32 + 1;
            slot.slice_total = total;
            slots.push(slot);
        }

        debug!(
            procedure_id = %procedure.id,
            manual_minutes,
            remaining,
            slices = slots.len(),
            "工序分片完成"
        );
        Ok(slots)
    }

    /// 自动分片: 所需时长超过单日上限时按日上限拆分, 否则整片
    pub fn auto_slice(
        &self,
        procedure: &Procedure,
        existing: &[TimeSlot],
        max_daily_minutes: i64,
    ) -> EngineResult<Vec<TimeSlot>> {
        if max_daily_minutes <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "单日上限必须 > 0: {}",
                max_daily_minutes
            )));
        }
        let request = if procedure.required_minutes > max_daily_minutes {
            SliceRequest::ByDuration {
                target_minutes: max_daily_minutes,
            }
        } else {
            SliceRequest::ByCount { count: 1 }
        };
        self.slice_procedure(procedure, existing, request)
    }

    /// 外协多日: 每天一片, 固定日时长, 日期连续, 并行
    pub fn outsourced_multi_day(
        &self,
        procedure: &Procedure,
        day_count: i64,
        daily_minutes: i64,
        first_day: NaiveDate,
        day_start: NaiveTime,
    ) -> EngineResult<Vec<TimeSlot>> {
        if day_count <= 0 {
            return Err(EngineError::InvalidInput(format!("外协天数必须 > 0: {}", day_count)));
        }
        if daily_minutes <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "外协日时长必须 > 0: {}",
                daily_minutes
            )));
        }

        let slots = (0..day_count)
            .map(|k| {
                let mut slot = new_slot(procedure, daily_minutes);
                slot.slice_index = k as i32 + 1;
                slot.slice_total = day_count as i32;
                slot.start = Some((first_day + Duration::days(k)).and_time(day_start));
                slot.end = slot.computed_end();
                slot.parallel = true;
                slot
            })
            .collect();
        Ok(slots)
    }
}

fn new_slot(procedure: &Procedure, minutes: i64) -> TimeSlot {
    let mut slot = TimeSlot::new(
        Uuid::new_v4().to_string(),
        procedure.id.clone(),
        procedure.order_id.clone(),
        procedure.task_id.clone(),
        minutes,
    );
    slot.work_center_id = procedure.work_center_id.clone();
    slot
}
