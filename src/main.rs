// ==========================================
// 工序排产求解核心 - 命令行入口
// ==========================================
// 用法: procedure-aps <planning_data.json> [config.json] [--tasks T1,T2]
// 流程: 加载数据 → 构建快照 → 求解至终止条件 → 输出分数与解释
// ==========================================

use anyhow::{bail, Context};
use procedure_aps::config::ConfigManager;
use procedure_aps::domain::PlanningData;
use procedure_aps::engine::SnapshotBuilder;
use procedure_aps::{logging, SolverManager};
use std::path::PathBuf;

const PROBLEM_ID: &str = "cli";

struct CliArgs {
    data_path: PathBuf,
    config_path: Option<PathBuf>,
    task_ids: Option<Vec<String>>,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut positional = Vec::new();
    let mut task_ids = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--tasks" {
            let Some(list) = args.next() else {
                bail!("--tasks 需要逗号分隔的任务 ID");
            };
            task_ids = Some(
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        } else {
            positional.push(PathBuf::from(arg));
        }
    }

    let mut positional = positional.into_iter();
    let Some(data_path) = positional.next() else {
        bail!("用法: procedure-aps <planning_data.json> [config.json] [--tasks T1,T2]");
    };
    Ok(CliArgs {
        data_path,
        config_path: positional.next(),
        task_ids,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", procedure_aps::APP_NAME, procedure_aps::VERSION);
    tracing::info!("==================================================");

    let args = parse_args()?;

    let config = match &args.config_path {
        Some(path) => ConfigManager::from_json_file(path)?,
        None => ConfigManager::from_env(),
    }
    .load_solver_config()
    .context("加载求解配置失败")?;

    let raw = std::fs::read_to_string(&args.data_path)
        .with_context(|| format!("读取排产数据失败: {}", args.data_path.display()))?;
    let data: PlanningData = serde_json::from_str(&raw).context("解析排产数据失败")?;

    let snapshot = SnapshotBuilder::new(config.start_time_step_minutes)
        .build(data, args.task_ids.as_deref())?;
    tracing::info!(
        slots = snapshot.slots.len(),
        windows = snapshot.maintenance_range.len(),
        starts = snapshot.start_time_range.len(),
        "快照构建完成"
    );

    let manager = SolverManager::new(config)?;
    manager.submit(PROBLEM_ID, snapshot)?;
    manager.wait_until_finished(PROBLEM_ID).await?;

    let statistics = manager.statistics(PROBLEM_ID)?;
    let explanation = manager.explain(PROBLEM_ID)?;
    let Some(solution) = manager.best_solution(PROBLEM_ID)? else {
        bail!("求解未产生任何解");
    };
    let placed = solution
        .slots
        .iter()
        .filter(|s| s.maintenance_window_id.is_some())
        .count();

    println!("最终分数: {}", explanation.score);
    println!("可行: {}", solution.is_feasible());
    println!("已落位时间槽: {}/{}", placed, solution.slots.len());
    println!(
        "评估移动: {}, 接受: {}, 改进: {}, 耗时: {} ms",
        statistics.moves_evaluated,
        statistics.moves_accepted,
        statistics.improvements,
        statistics.elapsed_ms
    );
    println!("{}", explanation.summary());

    println!("{}", serde_json::to_string_pretty(&solution)?);
    Ok(())
}
