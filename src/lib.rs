// ==========================================
// 工序排产求解核心 - 核心库
// ==========================================
// 技术栈: Rust + tokio + tracing
// 系统定位: 工作中心/维护窗口约束下的工序时间槽优化
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 评分/搜索/校验
pub mod engine;

// 配置层 - 求解参数与权重
pub mod config;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// API 层 - 求解管理
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ScoreLevel, SolverStatus, TaskStatus, WorkCenterStatus};

// 领域实体
pub use domain::{
    HardMediumSoftScore, MaintenanceWindow, Order, PlanningData, Procedure, ProblemFacts,
    ScheduleSnapshot, ScheduleSolution, Task, TimeSlot, WorkCenter,
};

// 引擎
pub use engine::{
    ConstraintId, FeasibilityValidator, ScheduleScenario, ScoreCalculator, ScoreExplanation,
    SlicePlanner, SliceRequest, SnapshotBuilder, SolverEventListener, ValidationOutcome,
};

// 配置
pub use config::{ConfigManager, ConstraintWeights, SolverConfig};

// API
pub use api::{SolverError, SolverManager, SolverResult, SolverStatistics};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "工序排产求解核心";
