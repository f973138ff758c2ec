// ==========================================
// 工序排产求解核心 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: 内存 key-value 表（来源: JSON 文件 / APS_* 环境变量 / 代码写入）
// 产出: SolverConfig（含提交时选定的权重）
// ==========================================

use crate::config::constraint_weights::ConstraintWeights;
use crate::config::solver_config::{SolverConfig, TerminationConfig};
use crate::config::weight_profile::{CustomWeightParameters, CustomWeightProfile};
use crate::domain::score::HardMediumSoftScore;
use crate::engine::strategy::ScheduleScenario;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "APS_";

/// 单项权重覆盖键前缀: weight/<constraint>
pub const WEIGHT_KEY_PREFIX: &str = "weight/";

/// 自定义权重方案键前缀: custom_weight/<profile_id>
pub const CUSTOM_WEIGHT_KEY_PREFIX: &str = "custom_weight/";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置 JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("配置值非法: {key}={value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("锁获取失败: {0}")]
    LockError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl ConfigManager {
    /// 空配置（全部取默认值）
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: HashMap<String, String>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// 从 JSON 文件加载
    ///
    /// 文件为一个 JSON 对象; 字符串原样保存, 数字/布尔转为文本,
    /// 对象/数组保存为 JSON 文本（如 custom_weight/<id> 方案）
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let manager = Self::from_json_str(&raw)?;
        debug!(path = %path.display(), "配置文件已加载");
        Ok(manager)
    }

    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let object: serde_json::Map<String, Value> = serde_json::from_str(raw)?;
        let entries = object
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, text)
            })
            .collect();
        Ok(Self::from_entries(entries))
    }

    /// 从进程环境变量加载（APS_MOVE_THREAD_COUNT → move_thread_count）
    pub fn from_env() -> Self {
        Self::from_env_vars(std::env::vars())
    }

    /// 从给定变量集合加载（APS_WEIGHT_LOAD_BALANCE → weight/load_balance）
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(ENV_PREFIX)?.to_ascii_lowercase();
                let key = match key.strip_prefix("weight_") {
                    Some(constraint) => format!("{}{}", WEIGHT_KEY_PREFIX, constraint),
                    None => key,
                };
                Some((key, value))
            })
            .collect();
        Self::from_entries(entries)
    }

    // ==========================================
    // 基础读写
    // ==========================================

    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    pub fn set_config_value(&self, key: &str, value: impl Into<String>) -> ConfigResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;
        entries.insert(key.to_string(), value.into());
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 解析可选值; 非法值记录警告并视为未配置
    fn parse_optional<T: std::str::FromStr>(&self, key: &str) -> ConfigResult<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        match raw.parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                warn!(key, value = raw, error = %e, "配置值解析失败, 使用默认值");
                Ok(None)
            }
        }
    }

    /// 获取所有配置的快照（JSON, 键有序）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let entries = self
            .entries
            .read()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;
        let ordered: BTreeMap<&String, &String> = entries.iter().collect();
        Ok(serde_json::to_string(&ordered)?)
    }

    /// 从配置快照恢复（覆盖同名键）, 返回恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;
        let count = config_map.len();
        entries.extend(config_map);
        Ok(count)
    }

    // ==========================================
    // 权重场景
    // ==========================================

    /// 读取自定义权重方案（key: custom_weight/{profile_id}）
    pub fn get_custom_weight_profile(
        &self,
        profile_id: &str,
    ) -> ConfigResult<Option<CustomWeightProfile>> {
        let id = profile_id.trim();
        if id.is_empty() {
            return Ok(None);
        }

        let key = format!("{}{}", CUSTOM_WEIGHT_KEY_PREFIX, id);
        let raw = match self.get_config_value(&key)? {
            Some(v) => v,
            None => return Ok(None),
        };

        let profile: CustomWeightProfile = serde_json::from_str(&raw)?;
        Ok(Some(profile))
    }

    /// 场景（非法值报错, 场景选错会改变整体优化目标）
    pub fn get_scenario(&self) -> ConfigResult<ScheduleScenario> {
        let raw = self.get_config_or_default(config_keys::SCENARIO, "balanced")?;
        raw.parse::<ScheduleScenario>()
            .map_err(|reason| ConfigError::InvalidValue {
                key: config_keys::SCENARIO.to_string(),
                value: raw,
                reason,
            })
    }

    /// 单项权重覆盖（weight/<constraint> 键）
    pub fn get_weight_overrides(&self) -> ConfigResult<CustomWeightParameters> {
        let entries: Vec<(String, String)> = {
            let entries = self
                .entries
                .read()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            entries
                .iter()
                .filter(|(k, _)| k.starts_with(WEIGHT_KEY_PREFIX))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        let mut params = CustomWeightParameters::default();
        for (key, raw) in entries {
            let name = &key[WEIGHT_KEY_PREFIX.len()..];
            let value = raw
                .trim()
                .parse::<i64>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: key.clone(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
            params
                .set_named(name, value)
                .map_err(|reason| ConfigError::InvalidValue {
                    key: key.clone(),
                    value: raw.clone(),
                    reason,
                })?;
        }
        Ok(params)
    }

    // ==========================================
    // 求解参数
    // ==========================================

    pub fn get_move_thread_count(&self) -> ConfigResult<usize> {
        Ok(self
            .parse_optional::<usize>(config_keys::MOVE_THREAD_COUNT)?
            .unwrap_or(2))
    }

    pub fn get_late_acceptance_size(&self) -> ConfigResult<usize> {
        Ok(self
            .parse_optional::<usize>(config_keys::LATE_ACCEPTANCE_SIZE)?
            .unwrap_or(400))
    }

    pub fn get_random_seed(&self) -> ConfigResult<Option<u64>> {
        self.parse_optional::<u64>(config_keys::RANDOM_SEED)
    }

    pub fn get_start_time_step_minutes(&self) -> ConfigResult<i64> {
        Ok(self
            .parse_optional::<i64>(config_keys::START_TIME_STEP_MINUTES)?
            .unwrap_or(30))
    }

    pub fn get_termination(&self) -> ConfigResult<TerminationConfig> {
        let defaults = TerminationConfig::default();
        let spent_limit_ms = match self.get_config_value(config_keys::SPENT_LIMIT_MS)? {
            Some(_) => self.parse_optional::<u64>(config_keys::SPENT_LIMIT_MS)?,
            None => defaults.spent_limit_ms,
        };
        Ok(TerminationConfig {
            spent_limit_ms,
            unimproved_spent_limit_ms: self
                .parse_optional::<u64>(config_keys::UNIMPROVED_SPENT_LIMIT_MS)?,
            best_score_limit: self
                .parse_optional::<HardMediumSoftScore>(config_keys::BEST_SCORE_LIMIT)?,
            supervisor_poll_ms: self
                .parse_optional::<u64>(config_keys::SUPERVISOR_POLL_MS)?
                .unwrap_or(defaults.supervisor_poll_ms),
        })
    }

    /// 组装求解器配置
    ///
    /// 权重优先级: 场景预设 < 自定义方案参数 < weight/<constraint> 单项覆盖
    pub fn load_solver_config(&self) -> ConfigResult<SolverConfig> {
        let mut scenario = self.get_scenario()?;
        let mut overrides = CustomWeightParameters::default();

        if let Some(profile_id) = self.get_config_value(config_keys::CUSTOM_WEIGHT_PROFILE)? {
            match self.get_custom_weight_profile(&profile_id)? {
                Some(profile) => {
                    scenario = profile.base_scenario;
                    overrides = profile.parameters;
                }
                None => warn!(profile_id = %profile_id, "自定义权重方案不存在, 忽略"),
            }
        }

        let single = self.get_weight_overrides()?;
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if single.$field.is_some() { overrides.$field = single.$field; })*
            };
        }
        merge!(
            work_center_mismatch,
            capacity_overrun,
            work_center_overlap,
            procedure_precedence,
            slice_order,
            real_start_anchor,
            makespan,
            early_start,
            priority_finish_order,
            load_balance,
            slice_contiguity,
            capacity_utilization,
        );

        let config = SolverConfig {
            scenario,
            weight_overrides: if overrides.is_empty() {
                None
            } else {
                Some(overrides)
            },
            move_thread_count: self.get_move_thread_count()?,
            late_acceptance_size: self.get_late_acceptance_size()?,
            random_seed: self.get_random_seed()?,
            start_time_step_minutes: self.get_start_time_step_minutes()?,
            termination: self.get_termination()?,
        };

        config
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                key: "solver_config".to_string(),
                value: format!("{:?}", config),
                reason,
            })?;
        Ok(config)
    }

    /// 权重表（等同 load_solver_config()?.weights()）
    pub fn load_constraint_weights(&self) -> ConfigResult<ConstraintWeights> {
        Ok(self.load_solver_config()?.weights())
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 场景
    pub const SCENARIO: &str = "scenario";
    pub const CUSTOM_WEIGHT_PROFILE: &str = "custom_weight_profile";

    // 搜索
    pub const MOVE_THREAD_COUNT: &str = "move_thread_count";
    pub const LATE_ACCEPTANCE_SIZE: &str = "late_acceptance_size";
    pub const RANDOM_SEED: &str = "random_seed";
    pub const START_TIME_STEP_MINUTES: &str = "start_time_step_minutes";

    // 终止
    pub const SPENT_LIMIT_MS: &str = "spent_limit_ms";
    pub const UNIMPROVED_SPENT_LIMIT_MS: &str = "unimproved_spent_limit_ms";
    pub const BEST_SCORE_LIMIT: &str = "best_score_limit";
    pub const SUPERVISOR_POLL_MS: &str = "supervisor_poll_ms";
}
