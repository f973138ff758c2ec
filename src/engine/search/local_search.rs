// ==========================================
// 工序排产求解核心 - Late Acceptance 局部搜索
// ==========================================
// 接受准则: 新分数 >= 当前分数 或 >= L 步之前的分数
// 线程模型: 每个移动线程独立随机数源, 每一步在工作状态锁内完成
//           （合并增量修改 → 生成移动 → 执行 + 传播 → 评分 → 接受或撤销）
// 终止: 轮询终止标志（由监督任务或 stop/delete 写入）
// ==========================================

use crate::config::solver_config::SolverConfig;
use crate::domain::score::HardMediumSoftScore;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::propagation::PropagationEngine;
use crate::engine::scoring::ScoreCalculator;
use crate::engine::search::construction::ConstructionHeuristic;
use crate::engine::search::moves::MoveSelector;
use crate::engine::search::{BestSolutionSink, SearchContext};
use crate::engine::state::ScheduleState;
use crate::perf::{self, PerfGuard};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub best_score: HardMediumSoftScore,
    pub steps: u64,
}

/// 锁内共享的搜索状态
struct SharedSearch {
    state: ScheduleState,
    selector: MoveSelector,
    current: HardMediumSoftScore,
    best: HardMediumSoftScore,
    history: Vec<HardMediumSoftScore>,
    step: u64,
}

#[derive(Debug, Clone)]
pub struct LateAcceptanceSearch {
    calculator: ScoreCalculator,
    propagation: PropagationEngine,
    history_size: usize,
    thread_count: usize,
    seed: Option<u64>,
}

impl LateAcceptanceSearch {
    pub fn new(config: &SolverConfig, calculator: ScoreCalculator) -> Self {
        Self {
            calculator,
            propagation: PropagationEngine::new(),
            history_size: config.late_acceptance_size.max(1),
            thread_count: config.move_thread_count.max(1),
            seed: config.random_seed,
        }
    }

    pub fn run(
        &self,
        state: ScheduleState,
        initial: HardMediumSoftScore,
        ctx: &SearchContext,
        sink: &dyn BestSolutionSink,
    ) -> EngineResult<SearchOutcome> {
        let selector = MoveSelector::new(&state);
        let shared = Mutex::new(SharedSearch {
            state,
            selector,
            current: initial,
            best: initial,
            history: vec![initial; self.history_size],
            step: 0,
        });
        let failed = AtomicBool::new(false);

        info!(threads = self.thread_count, history = self.history_size, "局部搜索开始");

        let results: Vec<EngineResult<()>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.thread_count)
                .map(|worker| {
                    let shared = &shared;
                    let failed = &failed;
                    scope.spawn(move || {
                        let result = self.worker(worker, shared, ctx, sink, failed);
                        if result.is_err() {
                            failed.store(true, Ordering::Release);
                        }
                        result
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        failed.store(true, Ordering::Release);
                        Err(EngineError::Internal("移动线程 panic".to_string()))
                    })
                })
                .collect()
        });

        for result in results {
            if let Err(e) = result {
                error!(error = %e, "移动线程异常退出");
                return Err(e);
            }
        }

        let shared = shared
            .into_inner()
            .map_err(|_| EngineError::Internal("工作状态锁已中毒".to_string()))?;
        info!(steps = shared.step, best = %shared.best, "局部搜索结束");
        Ok(SearchOutcome {
            best_score: shared.best,
            steps: shared.step,
        })
    }

    fn worker(
        &self,
        worker: usize,
        shared: &Mutex<SharedSearch>,
        ctx: &SearchContext,
        sink: &dyn BestSolutionSink,
        failed: &AtomicBool,
    ) -> EngineResult<()> {
        let _perf = PerfGuard::new("local_search_worker");
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker as u64)),
            None => StdRng::from_os_rng(),
        };

        while !ctx.is_terminated() && !failed.load(Ordering::Acquire) {
            let mut guard = lock(shared)?;
            let inner = &mut *guard;

            self.merge_pending(inner, ctx, sink)?;

            let Some(mv) = inner.selector.propose(&inner.state, &mut rng) else {
                if inner.selector.is_empty() {
                    drop(guard);
                    std::thread::sleep(Duration::from_millis(1));
                }
                continue;
            };

            let undo = mv.apply(&mut inner.state, &self.propagation)?;
            let score = self.calculator.calculate(&inner.state);
            perf::record_scored_move();
            ctx.counters.moves_evaluated.fetch_add(1, Ordering::Relaxed);

            let slot = (inner.step % inner.history.len() as u64) as usize;
            if score >= inner.current || score >= inner.history[slot] {
                inner.current = score;
                ctx.counters.moves_accepted.fetch_add(1, Ordering::Relaxed);
                if score > inner.best {
                    inner.best = score;
                    ctx.counters.improvements.fetch_add(1, Ordering::Relaxed);
                    debug!(worker, step = inner.step, kind = mv.kind(), score = %score, "新最优解");
                    sink.on_new_best(&inner.state, score);
                }
            } else {
                undo.undo(&mut inner.state, &self.propagation)?;
            }
            inner.history[slot] = inner.current;
            inner.step += 1;
        }
        Ok(())
    }

    /// 合并排队的增量修改（全量重算, 保留改进基线）
    fn merge_pending(
        &self,
        inner: &mut SharedSearch,
        ctx: &SearchContext,
        sink: &dyn BestSolutionSink,
    ) -> EngineResult<()> {
        let changed = {
            let mut queue = ctx
                .pending_updates
                .lock()
                .map_err(|_| EngineError::Internal("增量修改队列锁已中毒".to_string()))?;
            if queue.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut *queue)
        };

        // 合并失败时状态不变, 丢弃该批修改继续搜索
        let merged = match inner.state.merge_slots(changed) {
            Ok(merged) => merged,
            Err(e) => {
                warn!(error = %e, "增量修改合并失败, 已丢弃");
                return Ok(());
            }
        };
        self.propagation.rebuild(&mut inner.state);
        ConstructionHeuristic::new().run(&mut inner.state)?;
        inner.selector = MoveSelector::new(&inner.state);

        let score = self.calculator.calculate(&inner.state);
        inner.current = score;
        inner.history.fill(score);
        ctx.counters
            .updates_merged
            .fetch_add(merged as u64, Ordering::Relaxed);
        info!(merged, score = %score, "增量修改已合并");

        if score > inner.best {
            inner.best = score;
            ctx.counters.improvements.fetch_add(1, Ordering::Relaxed);
            sink.on_new_best(&inner.state, score);
        } else {
            sink.on_rebased(&inner.state, score);
        }
        Ok(())
    }
}

fn lock(shared: &Mutex<SharedSearch>) -> EngineResult<MutexGuard<'_, SharedSearch>> {
    shared
        .lock()
        .map_err(|_| EngineError::Internal("工作状态锁已中毒".to_string()))
}
