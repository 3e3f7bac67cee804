//! Directed graph of prototype states (nodes) and transitions (edges)
//!
//! The transport format is the JSON document
//! `{"nodes": [{"id", "data"}], "edges": [{"sourceId", "targetId", "data"}]}`.

use crate::error::{JourneyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Free-form payload attached to nodes and edges (label, type, image, trigger, ...)
pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub data: Payload,
}

impl Node {
    pub fn new(id: impl Into<String>, data: Payload) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.data.get("label").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub data: Payload,
}

impl Edge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, data: Payload) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            data,
        }
    }
}

/// What `add_edge` did with a well-formed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeInsert {
    Added,
    /// Source equals target; dropped
    SelfLoop,
    /// The ordered pair already exists; dropped
    Duplicate,
}

/// Outcome of a bulk `build_graph`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub nodes_added: usize,
    pub edges_added: usize,
    pub edges_dropped: usize,
    pub cycle_edges_removed: usize,
}

#[derive(Serialize, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Re-adding an existing id keeps the original node untouched.
    pub fn add_node(&mut self, id: &str, data: Payload) -> Result<()> {
        if id.is_empty() {
            return Err(JourneyError::InvalidInput("Node ID is required".to_string()));
        }
        if !self.index.contains_key(id) {
            self.index.insert(id.to_string(), self.nodes.len());
            self.nodes.push(Node::new(id, data));
        }
        Ok(())
    }

    /// Add a directed edge between two existing nodes.
    ///
    /// Self-loops and duplicate ordered pairs are logged and dropped, not errors.
    pub fn add_edge(
        &mut self,
        source_id: &str,
        target_id: &str,
        data: Payload,
    ) -> Result<EdgeInsert> {
        if !self.index.contains_key(source_id) {
            return Err(JourneyError::UnknownNode(source_id.to_string()));
        }
        if !self.index.contains_key(target_id) {
            return Err(JourneyError::UnknownNode(target_id.to_string()));
        }

        if source_id == target_id {
            log::warn!(
                "Edge from '{}' to '{}' is a self-loop and will be ignored",
                source_id,
                target_id
            );
            return Ok(EdgeInsert::SelfLoop);
        }

        if self.find_edge(source_id, target_id).is_some() {
            log::warn!("Edge from '{}' to '{}' already exists", source_id, target_id);
            return Ok(EdgeInsert::Duplicate);
        }

        self.edges.push(Edge::new(source_id, target_id, data));
        Ok(EdgeInsert::Added)
    }

    /// Bulk construction from an external nodes/edges payload.
    ///
    /// Nodes go in first, then edges, then any cycles are broken. The build is
    /// all-or-nothing: on error the graph is left exactly as it was and the
    /// error is both logged and returned.
    pub fn build_graph(&mut self, nodes: &[Node], edges: &[Edge]) -> Result<BuildReport> {
        let mut staged = self.clone();
        match staged.stage(nodes, edges) {
            Ok(report) => {
                *self = staged;
                Ok(report)
            }
            Err(e) => {
                log::error!("Error building graph: {}", e);
                Err(e)
            }
        }
    }

    fn stage(&mut self, nodes: &[Node], edges: &[Edge]) -> Result<BuildReport> {
        let mut report = BuildReport::default();

        for node in nodes {
            let before = self.nodes.len();
            self.add_node(&node.id, node.data.clone())?;
            report.nodes_added += self.nodes.len() - before;
        }

        for edge in edges {
            match self.add_edge(&edge.source_id, &edge.target_id, edge.data.clone())? {
                EdgeInsert::Added => report.edges_added += 1,
                EdgeInsert::SelfLoop | EdgeInsert::Duplicate => report.edges_dropped += 1,
            }
        }

        if self.detect_cycles() {
            log::warn!("Cycles detected. Modifying graph to be acyclic.");
            report.cycle_edges_removed = self.make_acyclic();
        } else {
            log::info!("Graph is already acyclic.");
        }

        Ok(report)
    }

    /// Build a graph from an external DAG payload document (cycles removed)
    pub fn from_payload(json: &str) -> Result<(Self, BuildReport)> {
        let doc: GraphDocument = serde_json::from_str(json)
            .map_err(|e| JourneyError::InvalidInput(format!("Invalid graph payload: {}", e)))?;
        let mut graph = Graph::new();
        let report = graph.build_graph(&doc.nodes, &doc.edges)?;
        Ok((graph, report))
    }

    /// True when some edge closes a directed cycle
    pub fn detect_cycles(&self) -> bool {
        !self.back_edges(true).is_empty()
    }

    /// Remove every edge that closes a cycle during a depth-first sweep.
    ///
    /// Only edges are removed, never nodes. Returns how many edges went.
    pub fn make_acyclic(&mut self) -> usize {
        let back: HashSet<usize> = self.back_edges(false).into_iter().collect();
        if back.is_empty() {
            return 0;
        }

        let mut idx = 0;
        self.edges.retain(|edge| {
            let keep = !back.contains(&idx);
            if !keep {
                log::warn!(
                    "Removing edge '{}' -> '{}' to break a cycle",
                    edge.source_id,
                    edge.target_id
                );
            }
            idx += 1;
            keep
        });
        back.len()
    }

    /// Depth-first sweep from every node in insertion order, returning the
    /// indices of edges that point at a node on the current DFS stack.
    ///
    /// Edges already classified as back edges are not followed. Uses an
    /// explicit stack so deep graphs cannot overflow.
    fn back_edges(&self, stop_at_first: bool) -> Vec<usize> {
        let adjacency = self.adjacency();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_stack: HashSet<&str> = HashSet::new();
        let mut back = Vec::new();

        for node in &self.nodes {
            let root = node.id.as_str();
            if visited.contains(root) {
                continue;
            }
            visited.insert(root);
            on_stack.insert(root);
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let id = frame.0;
                let next = adjacency.get(id).and_then(|out| out.get(frame.1)).copied();
                let Some(edge_idx) = next else {
                    on_stack.remove(id);
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                let target = self.edges[edge_idx].target_id.as_str();
                if on_stack.contains(target) {
                    back.push(edge_idx);
                    if stop_at_first {
                        return back;
                    }
                } else if !visited.contains(target) {
                    visited.insert(target);
                    on_stack.insert(target);
                    stack.push((target, 0));
                }
            }
        }

        back
    }

    /// Outgoing edge indices per source node, in edge-list order
    fn adjacency(&self) -> HashMap<&str, Vec<usize>> {
        let mut adjacency: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, edge) in self.edges.iter().enumerate() {
            adjacency.entry(edge.source_id.as_str()).or_default().push(idx);
        }
        adjacency
    }

    /// Serialize nodes and edges to the JSON transport format
    pub fn stringify(&self) -> Result<String> {
        let doc = GraphDocument {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        };
        Ok(serde_json::to_string(&doc)?)
    }

    /// Rebuild a graph from `stringify` output.
    ///
    /// Every node and edge goes back through `add_node`/`add_edge`, so invalid
    /// documents fail with the same errors as direct construction.
    pub fn parse(json: &str) -> Result<Self> {
        let doc: GraphDocument = serde_json::from_str(json)
            .map_err(|e| JourneyError::InvalidInput(format!("Invalid graph JSON: {}", e)))?;

        let mut graph = Graph::new();
        for node in doc.nodes {
            graph.add_node(&node.id, node.data)?;
        }
        for edge in doc.edges {
            graph.add_edge(&edge.source_id, &edge.target_id, edge.data)?;
        }
        Ok(graph)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.edges.clear();
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.source_id == id)
    }

    pub fn find_edge(&self, source_id: &str, target_id: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|edge| edge.source_id == source_id && edge.target_id == target_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Same node id-to-data mapping and the same set of edges, in any order
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self.edges.len() == other.edges.len()
            && self
                .nodes
                .iter()
                .all(|node| other.node(&node.id).is_some_and(|o| o.data == node.data))
            && self.edges.iter().all(|edge| {
                other
                    .find_edge(&edge.source_id, &edge.target_id)
                    .is_some_and(|o| o.data == edge.data)
            })
    }
}
