// ==========================================
// 工序排产求解核心 - 求解任务
// ==========================================
// 职责: 一个 problem_id 的运行状态 + 已发布最优解 + 与搜索线程共享的句柄
// 状态机: NotRunning → Scheduled → Active → NotRunning
// 红线: 改进回调只在严格更优时触发; 完成回调恰好一次
// ==========================================

use crate::config::solver_config::{SolverConfig, TerminationConfig};
use crate::domain::score::HardMediumSoftScore;
use crate::domain::solution::{ProblemFacts, ScheduleSolution};
use crate::domain::time_slot::TimeSlot;
use crate::domain::types::SolverStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::SolverEventListener;
use crate::engine::propagation::PropagationEngine;
use crate::engine::scoring::{ScoreCalculator, ScoreExplanation};
use crate::engine::search::{BestSolutionSink, SearchContext};
use crate::engine::state::ScheduleState;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

/// 求解统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverStatistics {
    pub problem_id: String,
    pub status: SolverStatus,
    pub moves_evaluated: u64,
    pub moves_accepted: u64,
    pub improvements: u64,
    pub updates_merged: u64,
    pub elapsed_ms: u64,
    pub best_score: Option<HardMediumSoftScore>,
    pub submitted_at: DateTime<Utc>,
}

/// 终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TerminationReason {
    SpentLimit,
    UnimprovedSpentLimit,
    BestScoreLimit,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::SpentLimit => "spent_limit",
            TerminationReason::UnimprovedSpentLimit => "unimproved_spent_limit",
            TerminationReason::BestScoreLimit => "best_score_limit",
        }
    }
}

#[derive(Debug, Default)]
struct Published {
    solution: Option<ScheduleSolution>,
    /// 改进基线（最后一次回调的分数）
    best_score: Option<HardMediumSoftScore>,
    last_improvement: Option<Instant>,
}

#[derive(Debug, Default)]
struct Timing {
    started: Option<Instant>,
    finished: Option<Instant>,
}

pub(crate) struct SolverJob {
    pub problem_id: String,
    pub config: SolverConfig,
    pub ctx: SearchContext,
    facts: Arc<ProblemFacts>,
    start_time_range: Vec<NaiveDateTime>,
    window_ids: HashSet<String>,
    listener: Arc<dyn SolverEventListener>,
    status: AtomicU8,
    published: Mutex<Published>,
    timing: Mutex<Timing>,
    finished_fired: AtomicBool,
    done: watch::Sender<bool>,
    submitted_at: DateTime<Utc>,
}

impl SolverJob {
    pub fn new(
        problem_id: &str,
        config: SolverConfig,
        state: &ScheduleState,
        listener: Arc<dyn SolverEventListener>,
    ) -> Self {
        let (done, _) = watch::channel(false);
        // 输入状态立即可查询（不触发改进回调, 不设改进基线）
        let initial_score = ScoreCalculator::new(config.weights()).calculate(state);
        let initial = state.to_solution(problem_id, Some(initial_score), SolverStatus::Scheduled);
        Self {
            problem_id: problem_id.to_string(),
            config,
            ctx: SearchContext::new(),
            facts: state.facts.clone(),
            start_time_range: state.start_time_range.clone(),
            window_ids: state.windows.iter().map(|w| w.id.clone()).collect(),
            listener,
            status: AtomicU8::new(SolverStatus::Scheduled.to_u8()),
            published: Mutex::new(Published {
                solution: Some(initial),
                ..Published::default()
            }),
            timing: Mutex::new(Timing::default()),
            finished_fired: AtomicBool::new(false),
            done,
            submitted_at: Utc::now(),
        }
    }

    // ==========================================
    // 状态
    // ==========================================

    pub fn status(&self) -> SolverStatus {
        SolverStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: SolverStatus) {
        self.status.store(status.to_u8(), Ordering::Release);
    }

    pub fn mark_active(&self) {
        self.set_status(SolverStatus::Active);
        if let Ok(mut timing) = self.timing.lock() {
            timing.started = Some(Instant::now());
        }
        info!(problem_id = %self.problem_id, "求解任务开始执行");
    }

    pub fn terminate(&self) {
        self.ctx.terminate.store(true, Ordering::Release);
    }

    pub fn elapsed(&self) -> Duration {
        match self.timing.lock() {
            Ok(timing) => match (timing.started, timing.finished) {
                (Some(started), Some(finished)) => finished.duration_since(started),
                (Some(started), None) => started.elapsed(),
                _ => Duration::ZERO,
            },
            Err(_) => Duration::ZERO,
        }
    }

    /// 监督任务判定终止条件
    pub fn check_termination(&self, termination: &TerminationConfig) -> Option<TerminationReason> {
        let elapsed = self.elapsed();
        if termination.spent_limit().is_some_and(|limit| elapsed >= limit) {
            return Some(TerminationReason::SpentLimit);
        }

        let published = self.published.lock().ok()?;
        if let (Some(limit), Some(best)) = (termination.best_score_limit, published.best_score) {
            if best >= limit {
                return Some(TerminationReason::BestScoreLimit);
            }
        }
        if let (Some(limit), Some(last)) =
            (termination.unimproved_spent_limit(), published.last_improvement)
        {
            if last.elapsed() >= limit {
                return Some(TerminationReason::UnimprovedSpentLimit);
            }
        }
        None
    }

    /// 等待运行完全停止
    pub async fn wait_finished(&self) {
        let mut rx = self.done.subscribe();
        // 发送端随任务存活, wait_for 只会在值变为 true 时返回
        let _ = rx.wait_for(|done| *done).await;
    }

    // ==========================================
    // 已发布的解
    // ==========================================

    fn lock_published(&self) -> EngineResult<MutexGuard<'_, Published>> {
        self.published
            .lock()
            .map_err(|_| EngineError::Internal("已发布解锁已中毒".to_string()))
    }

    /// 最优解副本（状态取当前任务状态）
    pub fn best_solution(&self) -> EngineResult<Option<ScheduleSolution>> {
        let status = self.status();
        let published = self.lock_published()?;
        Ok(published.solution.clone().map(|mut s| {
            s.status = status;
            s
        }))
    }

    pub fn best_score(&self) -> EngineResult<Option<HardMediumSoftScore>> {
        Ok(self
            .lock_published()?
            .solution
            .as_ref()
            .and_then(|s| s.score))
    }

    /// 从已发布解还原工作状态（全量重算后）
    fn restore_state(&self, solution: &ScheduleSolution) -> EngineResult<ScheduleState> {
        let snapshot = ScheduleState::snapshot_of(solution, &self.start_time_range, &self.facts);
        let mut state = ScheduleState::from_snapshot(snapshot)?;
        PropagationEngine::new().rebuild(&mut state);
        Ok(state)
    }

    pub fn explain(&self) -> EngineResult<Option<ScoreExplanation>> {
        let Some(solution) = self.best_solution()? else {
            return Ok(None);
        };
        let state = self.restore_state(&solution)?;
        Ok(Some(ScoreCalculator::new(self.config.weights()).explain(&state)))
    }

    // ==========================================
    // 增量修改
    // ==========================================

    /// 运行中: 入队, 由移动线程在下一步合并
    /// 已停止: 合并到已发布解, 全量重算并重新评分
    pub fn update(&self, changed: Vec<TimeSlot>) -> EngineResult<()> {
        self.check_changes(&changed)?;
        {
            let mut queue = self
                .ctx
                .pending_updates
                .lock()
                .map_err(|_| EngineError::Internal("增量修改队列锁已中毒".to_string()))?;
            queue.extend(changed);
        }
        if !self.status().is_running() {
            self.apply_pending_to_published()?;
        }
        Ok(())
    }

    /// 入队前校验引用, 非法修改不得进入运行中的搜索
    fn check_changes(&self, changed: &[TimeSlot]) -> EngineResult<()> {
        for slot in changed {
            if !self.facts.procedures.iter().any(|p| p.id == slot.procedure_id) {
                return Err(EngineError::UnknownProcedure {
                    slot_id: slot.id.clone(),
                    procedure_id: slot.procedure_id.clone(),
                });
            }
            if let Some(window_id) = &slot.maintenance_window_id {
                if !self.window_ids.contains(window_id) {
                    return Err(EngineError::UnknownWindow {
                        slot_id: slot.id.clone(),
                        window_id: window_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// 把队列中剩余的修改合并进已发布解（任务未运行时）
    fn apply_pending_to_published(&self) -> EngineResult<()> {
        let changed = {
            let mut queue = self
                .ctx
                .pending_updates
                .lock()
                .map_err(|_| EngineError::Internal("增量修改队列锁已中毒".to_string()))?;
            if queue.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *queue)
        };

        let mut published = self.lock_published()?;
        let Some(solution) = published.solution.as_ref() else {
            return Err(EngineError::InvalidInput(format!(
                "求解任务尚无可更新的解: {}",
                self.problem_id
            )));
        };
        let mut state = self.restore_state(solution)?;
        let merged = state.merge_slots(changed)?;
        PropagationEngine::new().rebuild(&mut state);
        let score = ScoreCalculator::new(self.config.weights()).calculate(&state);
        published.solution = Some(state.to_solution(
            &self.problem_id,
            Some(score),
            SolverStatus::NotRunning,
        ));
        self.ctx
            .counters
            .updates_merged
            .fetch_add(merged as u64, Ordering::Relaxed);
        info!(problem_id = %self.problem_id, merged, score = %score, "增量修改已合并到已发布解");
        Ok(())
    }

    // ==========================================
    // 结束
    // ==========================================

    /// 运行完全停止: 状态归位 → 合并残留修改 → 完成回调（恰好一次）
    pub fn finish(&self) {
        if let Ok(mut timing) = self.timing.lock() {
            timing.finished = Some(Instant::now());
        }
        self.set_status(SolverStatus::NotRunning);
        if let Err(e) = self.apply_pending_to_published() {
            debug!(problem_id = %self.problem_id, error = %e, "残留增量修改未能合并");
        }

        if self.finished_fired.swap(true, Ordering::AcqRel) {
            return;
        }
        let solution = self.best_solution().ok().flatten();
        self.listener
            .on_solving_finished(&self.problem_id, solution.as_ref());
        self.done.send_replace(true);
        info!(
            problem_id = %self.problem_id,
            elapsed_ms = self.elapsed().as_millis() as u64,
            score = ?solution.as_ref().and_then(|s| s.score).map(|s| s.to_string()),
            "求解任务结束"
        );
    }

    pub fn report_error(&self, cause: &str) {
        self.listener.on_solving_error(&self.problem_id, cause);
    }

    pub fn statistics(&self) -> SolverStatistics {
        let counters = self.ctx.counters.snapshot();
        SolverStatistics {
            problem_id: self.problem_id.clone(),
            status: self.status(),
            moves_evaluated: counters.moves_evaluated,
            moves_accepted: counters.moves_accepted,
            improvements: counters.improvements,
            updates_merged: counters.updates_merged,
            elapsed_ms: self.elapsed().as_millis() as u64,
            best_score: self.best_score().ok().flatten(),
            submitted_at: self.submitted_at,
        }
    }
}

impl BestSolutionSink for SolverJob {
    fn on_new_best(&self, state: &ScheduleState, score: HardMediumSoftScore) {
        let solution = {
            let Ok(mut published) = self.published.lock() else {
                return;
            };
            if published.best_score.is_some_and(|best| score <= best) {
                return;
            }
            let solution = state.to_solution(&self.problem_id, Some(score), self.status());
            published.solution = Some(solution.clone());
            published.best_score = Some(score);
            published.last_improvement = Some(Instant::now());
            solution
        };
        debug!(problem_id = %self.problem_id, score = %score, "发布新最优解");
        self.listener
            .on_best_solution_improved(&self.problem_id, &solution);
    }

    fn on_rebased(&self, state: &ScheduleState, score: HardMediumSoftScore) {
        if let Ok(mut published) = self.published.lock() {
            published.solution = Some(state.to_solution(&self.problem_id, Some(score), self.status()));
        }
    }
}
