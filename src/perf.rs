// ==========================================
// 性能统计
// ==========================================
// 按线程计数已评分移动, 由 PerfGuard 在作用域结束时输出
// ==========================================

use std::cell::Cell;
use std::time::Instant;

thread_local! {
    static PERF_DEPTH: Cell<u32> = const { Cell::new(0) };
    static SCORED_MOVES: Cell<u64> = const { Cell::new(0) };
}

/// 记录一次已评分的移动（仅在 PerfGuard 作用域内计数）
pub fn record_scored_move() {
    let active = PERF_DEPTH.with(|d| d.get() > 0);
    if !active {
        return;
    }
    SCORED_MOVES.with(|c| c.set(c.get().saturating_add(1)));
}

/// 性能统计 Guard：记录 elapsed_ms + 本线程已评分移动数
///
/// 使用方式：
/// ```ignore
/// let _perf = procedure_aps::perf::PerfGuard::new("local_search_worker");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    moves_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        let moves_start = SCORED_MOVES.with(|c| c.get());
        Self {
            op,
            start: Instant::now(),
            moves_start,
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let moves_end = SCORED_MOVES.with(|c| c.get());
        let scored_moves = moves_end.saturating_sub(self.moves_start);
        let moves_per_sec = if elapsed_ms > 0 {
            scored_moves.saturating_mul(1000) / elapsed_ms
        } else {
            scored_moves
        };

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            scored_moves,
            moves_per_sec,
            "done"
        );

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
