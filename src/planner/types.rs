use crate::tools::ToolParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative graph of steps a model wants executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    #[serde(default, alias = "description")]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<StepAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NextStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parallel: Vec<String>,
}

/// Service call a step performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepAction {
    pub agent: String,
    #[serde(default)]
    pub params: ToolParams,
}

/// Successor of a step: unconditional, or keyed by outcome label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NextStep {
    Direct(String),
    Branch(BTreeMap<String, String>),
}

impl Plan {
    pub fn new(start: Option<String>, steps: Vec<PlanStep>) -> Self {
        Self { start, steps }
    }
}

impl PlanStep {
    pub fn new(id: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            desc: desc.into(),
            action: None,
            next: None,
            parallel: Vec::new(),
        }
    }

    pub fn with_action(mut self, agent: impl Into<String>, params: ToolParams) -> Self {
        self.action = Some(StepAction {
            agent: agent.into(),
            params,
        });
        self
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(NextStep::Direct(next.into()));
        self
    }

    pub fn with_branches<K, V>(mut self, branches: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.next = Some(NextStep::Branch(
            branches
                .into_iter()
                .map(|(outcome, target)| (outcome.into(), target.into()))
                .collect(),
        ));
        self
    }

    pub fn with_parallel<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parallel = children.into_iter().map(Into::into).collect();
        self
    }
}
