// ==========================================
// 工序排产求解核心 - API 层
// ==========================================
// 职责: 按 problem_id 提供求解服务接口
// ==========================================

pub mod error;
pub mod job;
pub mod solver_api;

// 重导出核心类型
pub use error::{SolverError, SolverResult};
pub use job::SolverStatistics;
pub use solver_api::SolverManager;
