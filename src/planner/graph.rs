use super::types::{NextStep, Plan};
use crate::error::GraphError;
use crate::tools::ToolParams;
use std::collections::BTreeMap;

/// Handle to a node inside the [`TaskGraph`] that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeAction {
    pub agent: String,
    pub params: ToolParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextRef {
    Terminal,
    Direct(NodeRef),
    Branch(BTreeMap<String, NodeRef>),
}

/// Resolved, graph-native form of a plan step.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskNode {
    pub id: String,
    pub desc: String,
    pub action: Option<NodeAction>,
    pub next: NextRef,
    pub parallel: Vec<NodeRef>,
}

impl TaskNode {
    pub fn is_fan_out(&self) -> bool {
        !self.parallel.is_empty()
    }

    /// Context key this node writes its result under.
    pub fn result_key(&self) -> String {
        format!("{}_result", self.id)
    }
}

/// Immutable arena of nodes built from one plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    index: BTreeMap<String, NodeRef>,
    start: NodeRef,
}

impl TaskGraph {
    pub fn start(&self) -> NodeRef {
        self.start
    }

    pub fn start_node(&self) -> &TaskNode {
        self.node(self.start)
    }

    pub fn node(&self, node: NodeRef) -> &TaskNode {
        &self.nodes[node.0]
    }

    pub fn lookup(&self, id: &str) -> Option<NodeRef> {
        self.index.get(id).copied()
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub struct GraphBuilder;

impl GraphBuilder {
    pub fn build(plan: &Plan) -> Result<TaskGraph, GraphError> {
        let mut index = BTreeMap::new();
        for (position, step) in plan.steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                return Err(GraphError::EmptyStepId);
            }
            if index.insert(step.id.clone(), NodeRef(position)).is_some() {
                return Err(GraphError::DuplicateStep(step.id.clone()));
            }
        }

        let resolve = |from: &str, target: &str| {
            index
                .get(target)
                .copied()
                .ok_or_else(|| GraphError::DanglingReference {
                    from: from.to_string(),
                    target: target.to_string(),
                })
        };

        let mut nodes = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            let action = step.action.as_ref().map(|action| {
                let mut params = action.params.clone();
                params.remove("agent");
                NodeAction {
                    agent: action.agent.clone(),
                    params,
                }
            });

            let next = match &step.next {
                None => NextRef::Terminal,
                Some(NextStep::Direct(target)) => NextRef::Direct(resolve(&step.id, target)?),
                Some(NextStep::Branch(branches)) => NextRef::Branch(
                    branches
                        .iter()
                        .map(|(outcome, target)| Ok((outcome.clone(), resolve(&step.id, target)?)))
                        .collect::<Result<_, GraphError>>()?,
                ),
            };

            let parallel = step
                .parallel
                .iter()
                .map(|target| resolve(&step.id, target))
                .collect::<Result<Vec<_>, _>>()?;

            nodes.push(TaskNode {
                id: step.id.clone(),
                desc: step.desc.clone(),
                action,
                next,
                parallel,
            });
        }

        let start = match &plan.start {
            Some(requested) => index
                .get(requested)
                .copied()
                .ok_or_else(|| GraphError::NoStart {
                    requested: Some(requested.clone()),
                })?,
            None if nodes.is_empty() => return Err(GraphError::NoStart { requested: None }),
            None => NodeRef(0),
        };

        validate_cycle_free(&nodes)?;

        Ok(TaskGraph {
            nodes,
            index,
            start,
        })
    }
}

fn successors(node: &TaskNode) -> Vec<NodeRef> {
    let mut out = node.parallel.clone();
    match &node.next {
        NextRef::Terminal => {}
        NextRef::Direct(target) => out.push(*target),
        NextRef::Branch(branches) => out.extend(branches.values().copied()),
    }
    out
}

fn validate_cycle_free(nodes: &[TaskNode]) -> Result<(), GraphError> {
    let mut states = vec![None; nodes.len()];
    let mut stack = Vec::new();

    for position in 0..nodes.len() {
        if states[position].is_some() {
            continue;
        }

        if let Some(path) = detect_cycle(NodeRef(position), nodes, &mut states, &mut stack) {
            return Err(GraphError::CycleDetected {
                path: path
                    .into_iter()
                    .map(|node| nodes[node.0].id.clone())
                    .collect(),
            });
        }
    }

    Ok(())
}

fn detect_cycle(
    node: NodeRef,
    nodes: &[TaskNode],
    states: &mut [Option<NodeState>],
    stack: &mut Vec<NodeRef>,
) -> Option<Vec<NodeRef>> {
    states[node.0] = Some(NodeState::Visiting);
    stack.push(node);

    for neighbor in successors(&nodes[node.0]) {
        match states[neighbor.0] {
            Some(NodeState::Visiting) => {
                if let Some(index) = stack.iter().position(|entry| *entry == neighbor) {
                    let mut cycle = stack[index..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                return Some(vec![neighbor, neighbor]);
            }
            Some(NodeState::Visited) => {}
            None => {
                if let Some(path) = detect_cycle(neighbor, nodes, states, stack) {
                    return Some(path);
                }
            }
        }
    }

    stack.pop();
    states[node.0] = Some(NodeState::Visited);
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Visiting,
    Visited,
}
