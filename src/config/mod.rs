// ==========================================
// 工序排产求解核心 - 配置层
// ==========================================
// 职责: 求解参数 + 约束权重表（场景预设 + 自定义覆盖）
// 来源: JSON 文件 / APS_* 环境变量 / 代码写入
// ==========================================

pub mod config_manager;
pub mod constraint_weights;
pub mod solver_config;
pub mod weight_profile;

pub use config_manager::{config_keys, ConfigError, ConfigManager, ConfigResult};
pub use constraint_weights::ConstraintWeights;
pub use solver_config::{SolverConfig, TerminationConfig};
pub use weight_profile::{CustomWeightParameters, CustomWeightProfile};
