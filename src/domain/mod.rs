// ==========================================
// 工序排产求解核心 - 领域模型层
// ==========================================
// 职责: 定义订单/任务/工序/工作中心/维护窗口/时间槽等实体
// 红线: 不含求解逻辑, 不含 I/O
// ==========================================

pub mod order;
pub mod procedure;
pub mod score;
pub mod solution;
pub mod time_slot;
pub mod types;
pub mod work_center;

// 重导出核心类型
pub use order::{Order, Task};
pub use procedure::Procedure;
pub use score::HardMediumSoftScore;
pub use solution::{PlanningData, ProblemFacts, ScheduleSnapshot, ScheduleSolution};
pub use time_slot::TimeSlot;
pub use types::{ScoreLevel, SolverStatus, TaskStatus, WorkCenterStatus};
pub use work_center::{MaintenanceWindow, WorkCenter};
