// ==========================================
// 工序排产求解核心 - 引擎层
// ==========================================
// 职责: 快照构建、工序图、产能台账、派生状态传播、评分、搜索、分片、校验
// 红线: 引擎不做存储 I/O; 派生字段只由 PropagationEngine 写入
// ==========================================

pub mod error;
pub mod events;
pub mod ledger;
pub mod procedure_graph;
pub mod propagation;
pub mod scoring;
pub mod search;
pub mod slice_planner;
pub mod snapshot;
pub mod state;
pub mod strategy;
pub mod validator;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use events::{NoOpEventListener, SolverEventListener, SolverEventType};
pub use ledger::CapacityLedger;
pub use procedure_graph::ProcedureGraph;
pub use propagation::PropagationEngine;
pub use scoring::{
    ConstraintId, ConstraintMatch, ConstraintMatchTotal, ScoreCalculator, ScoreExplanation,
};
pub use search::{
    BestSolutionSink, ConstructionHeuristic, CounterSnapshot, LateAcceptanceSearch, SearchContext,
    SearchOutcome, SearchRunner,
};
pub use slice_planner::{SlicePlanner, SliceRequest};
pub use snapshot::SnapshotBuilder;
pub use state::ScheduleState;
pub use strategy::ScheduleScenario;
pub use validator::{FeasibilityValidator, ValidationOutcome};
