// ==========================================
// 工序排产求解核心 - 工序领域模型
// ==========================================
// 工序 (Procedure) = 任务中的一道生产步骤
// 前后道关系以工序号表达, 同一任务内构成有向无环图
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub id: String,
    pub task_id: String,
    pub order_id: String,

    /// 工序号（同一任务内唯一）
    pub procedure_no: i32,

    /// 绑定的工作中心
    pub work_center_id: Option<String>,

    /// 所需机时（分钟）
    pub required_minutes: i64,

    // ===== 前后道工序号 =====
    #[serde(default)]
    pub predecessor_nos: Vec<i32>,
    #[serde(default)]
    pub successor_nos: Vec<i32>,

    // ===== 实际开工/完工（人工锚点） =====
    #[serde(default)]
    pub real_start: Option<NaiveDateTime>,
    #[serde(default)]
    pub real_end: Option<NaiveDateTime>,

    // ===== 派生字段（仅由 Propagation 写入） =====
    #[serde(default)]
    pub plan_start: Option<NaiveDateTime>,
    #[serde(default)]
    pub plan_end: Option<NaiveDateTime>,
}

impl Procedure {
    pub fn new(
        id: impl Into<String>,
        task_id: impl Into<String>,
        order_id: impl Into<String>,
        procedure_no: i32,
        work_center_id: Option<&str>,
        required_minutes: i64,
    ) -> Self {
        Self {
            id: id.into(),
            task_id: task_id.into(),
            order_id: order_id.into(),
            procedure_no,
            work_center_id: work_center_id.map(|s| s.to_string()),
            required_minutes,
            predecessor_nos: Vec::new(),
            successor_nos: Vec::new(),
            real_start: None,
            real_end: None,
            plan_start: None,
            plan_end: None,
        }
    }

    /// 已有实际开工时间的工序, 其时间槽为人工锚定
    pub fn is_anchored(&self) -> bool {
        self.real_start.is_some()
    }

    pub fn with_successors(mut self, successor_nos: &[i32]) -> Self {
        self.successor_nos = successor_nos.to_vec();
        self
    }

    pub fn with_real_start(mut self, real_start: NaiveDateTime) -> Self {
        self.real_start = Some(real_start);
        self
    }
}
