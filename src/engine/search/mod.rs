// ==========================================
// 工序排产求解核心 - 搜索层
// ==========================================
// 阶段: 全量重算 → 构造启发式 → Late Acceptance 局部搜索
// 并发: move_thread_count 个移动线程共享同一工作状态（Mutex 串行化每一步）
// 对外: 通过 SearchContext 接收终止信号/增量修改, 通过 BestSolutionSink 发布最优解
// ==========================================

pub mod construction;
pub mod local_search;
pub mod moves;

pub use construction::ConstructionHeuristic;
pub use local_search::{LateAcceptanceSearch, SearchOutcome};
pub use moves::{Move, MoveSelector, MoveUndo};

use crate::config::solver_config::SolverConfig;
use crate::domain::score::HardMediumSoftScore;
use crate::domain::time_slot::TimeSlot;
use crate::engine::error::EngineResult;
use crate::engine::propagation::PropagationEngine;
use crate::engine::scoring::ScoreCalculator;
use crate::engine::state::ScheduleState;
use crate::perf::PerfGuard;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// 最优解发布接口（由求解任务实现）
pub trait BestSolutionSink: Send + Sync {
    /// 严格优于上次发布的分数
    fn on_new_best(&self, state: &ScheduleState, score: HardMediumSoftScore);

    /// 合并增量修改后的工作状态（不视为改进）
    fn on_rebased(&self, state: &ScheduleState, score: HardMediumSoftScore);
}

/// 搜索计数器（移动线程并发累加）
#[derive(Debug, Default)]
pub struct SearchCounters {
    pub moves_evaluated: AtomicU64,
    pub moves_accepted: AtomicU64,
    pub improvements: AtomicU64,
    pub updates_merged: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub moves_evaluated: u64,
    pub moves_accepted: u64,
    pub improvements: u64,
    pub updates_merged: u64,
}

impl SearchCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            moves_evaluated: self.moves_evaluated.load(Ordering::Relaxed),
            moves_accepted: self.moves_accepted.load(Ordering::Relaxed),
            improvements: self.improvements.load(Ordering::Relaxed),
            updates_merged: self.updates_merged.load(Ordering::Relaxed),
        }
    }
}

/// 一次运行与外部共享的句柄
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    pub terminate: Arc<AtomicBool>,
    pub pending_updates: Arc<Mutex<Vec<TimeSlot>>>,
    pub counters: Arc<SearchCounters>,
}

impl SearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }
}

// ==========================================
// SearchRunner - 单次求解的阶段编排
// ==========================================
#[derive(Debug, Clone)]
pub struct SearchRunner {
    config: SolverConfig,
    calculator: ScoreCalculator,
    propagation: PropagationEngine,
}

impl SearchRunner {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            config: config.clone(),
            calculator: ScoreCalculator::new(config.weights()),
            propagation: PropagationEngine::new(),
        }
    }

    pub fn run(
        &self,
        mut state: ScheduleState,
        ctx: &SearchContext,
        sink: &dyn BestSolutionSink,
    ) -> EngineResult<SearchOutcome> {
        let _perf = PerfGuard::new("solve");

        self.propagation.rebuild(&mut state);
        ConstructionHeuristic::new().run(&mut state)?;

        let initial = self.calculator.calculate(&state);
        ctx.counters.improvements.fetch_add(1, Ordering::Relaxed);
        sink.on_new_best(&state, initial);
        info!(score = %initial, "构造阶段完成");

        if ctx.is_terminated() {
            return Ok(SearchOutcome {
                best_score: initial,
                steps: 0,
            });
        }

        LateAcceptanceSearch::new(&self.config, self.calculator).run(state, initial, ctx, sink)
    }
}
