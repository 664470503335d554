//! Graph runtime — petgraph based.
//!
//! The conversation pipeline is a strictly linear state machine, so the
//! runtime only has to follow a node's single outgoing edge when it returns
//! `Continue` and stop on `Final`. It is still an explicit graph: stages
//! announce their routing decision and the wiring lives in the builder, so
//! a future branching stage changes edges, not the engine.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::errors::PipelineError;

use super::node::{Node, NodeContext, NodeOutput};
use super::state::ConversationState;

pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, ()>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    max_steps: usize,
}

impl GraphRuntime {
    /// Execute the pipeline from the entry node until a stage returns
    /// `Final`. Any stage error aborts immediately and propagates unchanged.
    pub async fn run(
        &self,
        state: &mut ConversationState,
        ctx: &NodeContext<'_>,
    ) -> Result<(), PipelineError> {
        let mut current_idx = *self
            .node_indices
            .get(&self.entry_node_id)
            .ok_or_else(|| {
                PipelineError::Graph(format!("entry node not found: {}", self.entry_node_id))
            })?;

        let mut step = 0;

        loop {
            if step >= self.max_steps {
                return Err(PipelineError::Graph(format!(
                    "maximum steps ({}) exceeded",
                    self.max_steps
                )));
            }

            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| PipelineError::Graph("node not found in graph".to_string()))?;

            tracing::debug!(node = node.id(), step, "executing pipeline stage");

            match node.execute(state, ctx).await? {
                NodeOutput::Final => {
                    tracing::debug!(node = node.id(), "pipeline complete");
                    return Ok(());
                }
                NodeOutput::Continue => {
                    current_idx = self.next_node(current_idx)?;
                }
            }

            step += 1;
        }
    }

    fn next_node(&self, current_idx: NodeIndex) -> Result<NodeIndex, PipelineError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        let mut targets = self
            .graph
            .neighbors_directed(current_idx, Direction::Outgoing);

        let next = targets.next().ok_or_else(|| {
            PipelineError::Graph(format!("no outgoing edge from node: {}", current_id))
        })?;
        if targets.next().is_some() {
            return Err(PipelineError::Graph(format!(
                "node {} has multiple outgoing edges in a linear pipeline",
                current_id
            )));
        }

        Ok(next)
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.node_indices.keys().map(|s| s.as_str()).collect()
    }
}

/// Builder for constructing pipelines fluently.
pub struct GraphBuilder {
    nodes: Vec<Box<dyn Node>>,
    edges: Vec<(String, String)>,
    entry_node_id: String,
    max_steps: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            entry_node_id: String::new(),
            max_steps: 8,
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    pub fn build(self) -> Result<GraphRuntime, PipelineError> {
        if self.entry_node_id.is_empty() {
            return Err(PipelineError::Graph("no entry node set".to_string()));
        }

        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in self.nodes {
            let id = node.id().to_string();
            let index = graph.add_node(node);
            node_indices.insert(id, index);
        }

        if !node_indices.contains_key(&self.entry_node_id) {
            return Err(PipelineError::Graph(format!(
                "entry node not found: {}",
                self.entry_node_id
            )));
        }

        for (from, to) in &self.edges {
            let from_idx = node_indices
                .get(from)
                .ok_or_else(|| PipelineError::Graph(format!("source node not found: {}", from)))?;
            let to_idx = node_indices
                .get(to)
                .ok_or_else(|| PipelineError::Graph(format!("target node not found: {}", to)))?;
            graph.add_edge(*from_idx, *to_idx, ());
        }

        if petgraph::algo::is_cyclic_directed(&graph) {
            return Err(PipelineError::Graph(
                "pipeline graph must be acyclic".to_string(),
            ));
        }

        Ok(GraphRuntime {
            graph,
            node_indices,
            entry_node_id: self.entry_node_id,
            max_steps: self.max_steps,
        })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
