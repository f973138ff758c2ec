// ==========================================
// 工序排产求解核心 - 求解管理器 API
// ==========================================
// 职责: 按 problem_id 管理求解任务的生命周期
//   submit / stop / status / best_solution / score / is_feasible / explain
//   update / validate / delete / reset / statistics
// 并发: 每次运行一个 tokio 监督任务 + spawn_blocking 搜索;
//       submit/stop 不等待; 查询读取最后发布的快照
// ==========================================

use crate::api::error::{SolverError, SolverResult};
use crate::api::job::{SolverJob, SolverStatistics};
use crate::config::solver_config::SolverConfig;
use crate::domain::score::HardMediumSoftScore;
use crate::domain::solution::{ScheduleSnapshot, ScheduleSolution};
use crate::domain::time_slot::TimeSlot;
use crate::domain::types::SolverStatus;
use crate::engine::events::{NoOpEventListener, SolverEventListener};
use crate::engine::propagation::PropagationEngine;
use crate::engine::scoring::ScoreExplanation;
use crate::engine::search::SearchRunner;
use crate::engine::state::ScheduleState;
use crate::engine::validator::{FeasibilityValidator, ValidationOutcome};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tracing::{error, info, instrument, warn};

// ==========================================
// SolverManager - 求解管理器
// ==========================================
pub struct SolverManager {
    config: SolverConfig,
    jobs: Mutex<HashMap<String, Arc<SolverJob>>>,
    validator: FeasibilityValidator,
}

impl SolverManager {
    /// 创建管理器（配置非法时报 InvalidInput）
    pub fn new(config: SolverConfig) -> SolverResult<Self> {
        config.validate().map_err(SolverError::InvalidInput)?;
        Ok(Self {
            config,
            jobs: Mutex::new(HashMap::new()),
            validator: FeasibilityValidator::new(),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn lock_jobs(&self) -> SolverResult<MutexGuard<'_, HashMap<String, Arc<SolverJob>>>> {
        self.jobs
            .lock()
            .map_err(|e| SolverError::Internal(format!("任务表锁获取失败: {}", e)))
    }

    fn job(&self, problem_id: &str) -> SolverResult<Arc<SolverJob>> {
        self.lock_jobs()?
            .get(problem_id)
            .cloned()
            .ok_or_else(|| SolverError::not_found(problem_id))
    }

    // ==========================================
    // 提交 / 停止
    // ==========================================

    /// 提交求解（立即返回）
    pub fn submit(&self, problem_id: &str, snapshot: ScheduleSnapshot) -> SolverResult<()> {
        self.submit_with_listener(problem_id, snapshot, Arc::new(NoOpEventListener))
    }

    pub fn submit_with_listener(
        &self,
        problem_id: &str,
        snapshot: ScheduleSnapshot,
        listener: Arc<dyn SolverEventListener>,
    ) -> SolverResult<()> {
        self.submit_with_config(problem_id, snapshot, self.config.clone(), listener)
    }

    /// 使用单独的配置提交（权重表在此刻选定）
    #[instrument(skip(self, snapshot, config, listener), fields(slots = snapshot.slots.len()))]
    pub fn submit_with_config(
        &self,
        problem_id: &str,
        snapshot: ScheduleSnapshot,
        config: SolverConfig,
        listener: Arc<dyn SolverEventListener>,
    ) -> SolverResult<()> {
        let handle = Handle::try_current()
            .map_err(|e| SolverError::Internal(format!("submit 需要 tokio 运行时: {}", e)))?;
        config.validate().map_err(SolverError::InvalidInput)?;

        let mut jobs = self.lock_jobs()?;
        if let Some(existing) = jobs.get(problem_id) {
            if existing.status().is_running() {
                return Err(SolverError::AlreadyRunning {
                    problem_id: problem_id.to_string(),
                });
            }
        }

        let mut state = ScheduleState::from_snapshot(snapshot)?;
        PropagationEngine::new().rebuild(&mut state);
        let job = Arc::new(SolverJob::new(problem_id, config, &state, listener));
        jobs.insert(problem_id.to_string(), job.clone());
        drop(jobs);

        handle.spawn(supervise(job, state));
        info!(problem_id, "求解任务已提交");
        Ok(())
    }

    /// 请求终止（不等待）
    pub fn stop(&self, problem_id: &str) -> SolverResult<()> {
        let job = self.job(problem_id)?;
        job.terminate();
        info!(problem_id, status = %job.status(), "已请求终止求解");
        Ok(())
    }

    /// 等待运行完全停止（未运行时立即返回）
    pub async fn wait_until_finished(&self, problem_id: &str) -> SolverResult<()> {
        let job = self.job(problem_id)?;
        job.wait_finished().await;
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn status(&self, problem_id: &str) -> SolverResult<SolverStatus> {
        Ok(self.job(problem_id)?.status())
    }

    /// 最后发布的最优解（构造阶段完成前为 None）
    pub fn best_solution(&self, problem_id: &str) -> SolverResult<Option<ScheduleSolution>> {
        Ok(self.job(problem_id)?.best_solution()?)
    }

    pub fn score(&self, problem_id: &str) -> SolverResult<Option<HardMediumSoftScore>> {
        Ok(self.job(problem_id)?.best_score()?)
    }

    /// hard == 0（尚无分数时为 false）
    pub fn is_feasible(&self, problem_id: &str) -> SolverResult<bool> {
        Ok(self
            .score(problem_id)?
            .map(|s| s.is_feasible())
            .unwrap_or(false))
    }

    /// 按提交时的权重解释最后发布的最优解
    pub fn explain(&self, problem_id: &str) -> SolverResult<ScoreExplanation> {
        self.job(problem_id)?
            .explain()?
            .ok_or_else(|| SolverError::not_found(problem_id))
    }

    pub fn statistics(&self, problem_id: &str) -> SolverResult<SolverStatistics> {
        Ok(self.job(problem_id)?.statistics())
    }

    // ==========================================
    // 修改 / 校验
    // ==========================================

    /// 增量修改时间槽（按 ID 替换或追加）
    pub fn update(&self, problem_id: &str, changed_slots: Vec<TimeSlot>) -> SolverResult<()> {
        let job = self.job(problem_id)?;
        let count = changed_slots.len();
        job.update(changed_slots)?;
        info!(problem_id, count, status = %job.status(), "增量修改已受理");
        Ok(())
    }

    /// 人工落位校验（规则违规写入时间槽, 不返回错误）
    pub fn validate(&self, solution: ScheduleSolution) -> ValidationOutcome {
        self.validator.validate(solution)
    }

    // ==========================================
    // 清理
    // ==========================================

    /// 删除任务（运行中则先终止）
    pub fn delete(&self, problem_id: &str) -> SolverResult<()> {
        let job = self
            .lock_jobs()?
            .remove(problem_id)
            .ok_or_else(|| SolverError::not_found(problem_id))?;
        job.terminate();
        info!(problem_id, "求解任务已删除");
        Ok(())
    }

    /// 终止并清空全部任务
    pub fn reset(&self) -> SolverResult<()> {
        let jobs: Vec<Arc<SolverJob>> = self.lock_jobs()?.drain().map(|(_, j)| j).collect();
        for job in &jobs {
            job.terminate();
        }
        info!(count = jobs.len(), "求解管理器已重置");
        Ok(())
    }
}

impl Drop for SolverManager {
    fn drop(&mut self) {
        if let Ok(jobs) = self.jobs.lock() {
            for job in jobs.values() {
                job.terminate();
            }
        }
    }
}

// ==========================================
// 监督任务
// ==========================================

/// 启动搜索并轮询终止条件, 结束后归位状态并触发回调
async fn supervise(job: Arc<SolverJob>, state: ScheduleState) {
    job.mark_active();

    let runner = SearchRunner::new(&job.config);
    let search_job = job.clone();
    let mut search = tokio::task::spawn_blocking(move || {
        let ctx = search_job.ctx.clone();
        runner.run(state, &ctx, search_job.as_ref())
    });

    let poll = job.config.termination.poll_interval();
    let result = loop {
        tokio::select! {
            res = &mut search => break res,
            _ = tokio::time::sleep(poll) => {
                if job.ctx.is_terminated() {
                    continue;
                }
                if let Some(reason) = job.check_termination(&job.config.termination) {
                    info!(problem_id = %job.problem_id, reason = reason.as_str(), "满足终止条件");
                    job.terminate();
                }
            }
        }
    };

    match result {
        Ok(Ok(outcome)) => {
            info!(
                problem_id = %job.problem_id,
                best = %outcome.best_score,
                steps = outcome.steps,
                "搜索正常结束"
            );
        }
        Ok(Err(e)) => {
            error!(problem_id = %job.problem_id, error = %e, "搜索异常结束");
            job.report_error(&e.to_string());
        }
        Err(join_error) => {
            let cause = if join_error.is_panic() {
                "搜索线程 panic".to_string()
            } else {
                format!("搜索任务被取消: {}", join_error)
            };
            warn!(problem_id = %job.problem_id, cause = %cause, "搜索任务未正常返回");
            job.report_error(&cause);
        }
    }

    job.finish();
}
