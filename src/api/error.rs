// ==========================================
// 工序排产求解核心 - API层错误类型
// ==========================================
// 职责: 定义求解管理器错误类型, 把引擎/配置层错误转换为对外错误
// ==========================================

use crate::config::config_manager::ConfigError;
use crate::engine::error::EngineError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum SolverError {
    // ==========================================
    // 生命周期错误
    // ==========================================
    #[error("求解任务正在运行: problem_id={problem_id}")]
    AlreadyRunning { problem_id: String },

    #[error("求解任务不存在: problem_id={problem_id}")]
    NotFound { problem_id: String },

    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SolverError {
    pub fn not_found(problem_id: &str) -> Self {
        SolverError::NotFound {
            problem_id: problem_id.to_string(),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// 目的: 输入类问题 → InvalidInput, 一致性/内部问题 → Internal
// ==========================================
impl From<EngineError> for SolverError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidInput(msg) => SolverError::InvalidInput(msg),
            e @ EngineError::CyclicPrecedence { .. } => SolverError::InvalidInput(e.to_string()),
            e @ EngineError::UnknownWindow { .. } => SolverError::InvalidInput(e.to_string()),
            e @ EngineError::UnknownProcedure { .. } => SolverError::InvalidInput(e.to_string()),
            e @ EngineError::SlotOutOfRange(_) => SolverError::Internal(e.to_string()),
            EngineError::Internal(msg) => SolverError::Internal(msg),
        }
    }
}

impl From<ConfigError> for SolverError {
    fn from(err: ConfigError) -> Self {
        SolverError::InvalidInput(err.to_string())
    }
}

/// Result 类型别名
pub type SolverResult<T> = Result<T, SolverError>;
