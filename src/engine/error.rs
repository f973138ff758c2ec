// ==========================================
// 工序排产求解核心 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 输入错误 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("工序前后道存在环: task_id={task_id}, procedures={procedure_ids:?}")]
    CyclicPrecedence {
        task_id: String,
        procedure_ids: Vec<String>,
    },

    // ===== 状态一致性错误 =====
    #[error("时间槽引用了未知维护窗口: slot_id={slot_id}, window_id={window_id}")]
    UnknownWindow { slot_id: String, window_id: String },

    #[error("时间槽引用了未知工序: slot_id={slot_id}, procedure_id={procedure_id}")]
    UnknownProcedure {
        slot_id: String,
        procedure_id: String,
    },

    #[error("时间槽下标越界: {0}")]
    SlotOutOfRange(usize),

    // ===== 通用错误 =====
    #[error("引擎内部错误: {0}")]
    Internal(String),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
