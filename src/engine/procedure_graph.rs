// ==========================================
// 工序排产求解核心 - 工序前后道图
// ==========================================
// 结构: 以工序 ID 为键的 arena, 边以下标表示, 无对象间回指
// 分层: 广度优先 (Kahn) 分层, level = 所有前道 level 的最大值 + 1
// 红线: 必须是 DAG, 发现环直接返回错误
// ==========================================

use crate::domain::procedure::Procedure;
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

#[derive(Debug, Clone)]
struct GraphNode {
    procedure_id: String,
    task_id: String,
    successors: Vec<usize>,
    predecessors: Vec<usize>,
    level: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ProcedureGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
}

impl ProcedureGraph {
    /// 由工序列表构建前后道图
    ///
    /// 前后道工序号在同一任务内解析; 引用不存在的工序号仅记录 debug 日志
    pub fn build(procedures: &[Procedure]) -> EngineResult<Self> {
        let mut nodes: Vec<GraphNode> = procedures
            .iter()
            .map(|p| GraphNode {
                procedure_id: p.id.clone(),
                task_id: p.task_id.clone(),
                successors: Vec::new(),
                predecessors: Vec::new(),
                level: 0,
            })
            .collect();
        let index: HashMap<String, usize> = procedures
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let by_number: HashMap<(&str, i32), usize> = procedures
            .iter()
            .enumerate()
            .map(|(i, p)| ((p.task_id.as_str(), p.procedure_no), i))
            .collect();

        let mut edges: Vec<(usize, usize)> = Vec::new();
        for (i, procedure) in procedures.iter().enumerate() {
            for no in &procedure.successor_nos {
                match by_number.get(&(procedure.task_id.as_str(), *no)) {
                    Some(&j) => edges.push((i, j)),
                    None => debug!(
                        procedure_id = %procedure.id,
                        successor_no = no,
                        "后道工序号不存在, 忽略"
                    ),
                }
            }
            for no in &procedure.predecessor_nos {
                match by_number.get(&(procedure.task_id.as_str(), *no)) {
                    Some(&j) => edges.push((j, i)),
                    None => debug!(
                        procedure_id = %procedure.id,
                        predecessor_no = no,
                        "前道工序号不存在, 忽略"
                    ),
                }
            }
        }
        edges.sort_unstable();
        edges.dedup();

        for (from, to) in edges {
            nodes[from].successors.push(to);
            nodes[to].predecessors.push(from);
        }

        let mut graph = Self { nodes, index };
        graph.assign_levels()?;
        Ok(graph)
    }

    /// Kahn 分层 + 环检测
    fn assign_levels(&mut self) -> EngineResult<()> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.predecessors.len()).collect();
        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut visited = 0usize;

        while let Some(current) = queue.pop_front() {
            visited += 1;
            let level = self.nodes[current].level;
            let successors = self.nodes[current].successors.clone();
            for next in successors {
                let node = &mut self.nodes[next];
                node.level = node.level.max(level + 1);
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if visited != self.nodes.len() {
            let cyclic: Vec<&GraphNode> = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, n)| n)
                .collect();
            let task_id = cyclic
                .first()
                .map(|n| n.task_id.clone())
                .unwrap_or_default();
            return Err(EngineError::CyclicPrecedence {
                task_id,
                procedure_ids: cyclic.iter().map(|n| n.procedure_id.clone()).collect(),
            });
        }
        Ok(())
    }

    /// 工序所在层级（未知工序为 0）
    pub fn level(&self, procedure_id: &str) -> usize {
        self.index
            .get(procedure_id)
            .map(|&i| self.nodes[i].level)
            .unwrap_or(0)
    }

    /// 直接后道工序
    pub fn successors<'a>(&'a self, procedure_id: &str) -> impl Iterator<Item = &'a str> + 'a {
        let list: &[usize] = self
            .index
            .get(procedure_id)
            .map(|&i| self.nodes[i].successors.as_slice())
            .unwrap_or(&[]);
        list.iter().map(move |&j| self.nodes[j].procedure_id.as_str())
    }

    /// 所有 (前道, 后道) 边
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .flat_map(|n| {
                n.successors
                    .iter()
                    .map(move |&j| (n.procedure_id.as_str(), self.nodes[j].procedure_id.as_str()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn procedure(id: &str, task: &str, no: i32, successors: &[i32]) -> Procedure {
        Procedure::new(id, task, "O1", no, Some("WC1"), 60).with_successors(successors)
    }

    #[test]
    fn test_levels_follow_longest_path() {
        // 10 -> 20 -> 40, 10 -> 30 -> 40, 20 -> 30
        let procedures = vec![
            procedure("P10", "T1", 10, &[20, 30]),
            procedure("P20", "T1", 20, &[30, 40]),
            procedure("P30", "T1", 30, &[40]),
            procedure("P40", "T1", 40, &[]),
        ];
        let graph = ProcedureGraph::build(&procedures).unwrap();
        assert_eq!(graph.level("P10"), 0);
        assert_eq!(graph.level("P20"), 1);
        assert_eq!(graph.level("P30"), 2);
        assert_eq!(graph.level("P40"), 3);
        assert_eq!(graph.edges().len(), 5);
    }

    #[test]
    fn test_numbers_resolve_within_task_only() {
        let procedures = vec![
            procedure("A10", "T1", 10, &[20]),
            procedure("A20", "T1", 20, &[]),
            procedure("B20", "T2", 20, &[]),
        ];
        let graph = ProcedureGraph::build(&procedures).unwrap();
        let successors: Vec<&str> = graph.successors("A10").collect();
        assert_eq!(successors, vec!["A20"]);
        assert_eq!(graph.level("B20"), 0);
    }

    #[test]
    fn test_predecessor_links_are_merged() {
        let mut p20 = procedure("P20", "T1", 20, &[]);
        p20.predecessor_nos = vec![10];
        let procedures = vec![procedure("P10", "T1", 10, &[20]), p20];
        let graph = ProcedureGraph::build(&procedures).unwrap();
        assert_eq!(graph.edges(), vec![("P10", "P20")]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let procedures = vec![
            procedure("P10", "T1", 10, &[20]),
            procedure("P20", "T1", 20, &[10]),
        ];
        let err = ProcedureGraph::build(&procedures).unwrap_err();
        match err {
            EngineError::CyclicPrecedence { task_id, procedure_ids } => {
                assert_eq!(task_id, "T1");
                assert_eq!(procedure_ids.len(), 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
