use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use recon_protocol::{DependencyDiagram, DiagramEdge, DiagramNode};
use std::collections::HashMap;

/// Directory-level dependency graph under construction
pub struct ModuleGraph {
    /// Directed graph (node directory -> imported node directory, weighted by statement count)
    pub graph: DiGraph<DiagramNode, usize>,

    /// Node id -> NodeIndex mapping for fast lookup
    pub node_index: HashMap<String, NodeIndex>,
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
        }
    }

    /// Add node to graph, or return the existing one with the same id
    pub fn add_node(&mut self, node: DiagramNode) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        idx
    }

    pub fn find_node(&self, id: &str) -> Option<NodeIndex> {
        self.node_index.get(id).copied()
    }

    /// Count one import along `from -> to`; self-edges are ignored
    pub fn add_import(&mut self, from: NodeIndex, to: NodeIndex) {
        if from == to {
            return;
        }
        match self.graph.find_edge(from, to) {
            Some(edge) => self.graph[edge] += 1,
            None => {
                self.graph.add_edge(from, to, 1);
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Groups of nodes that import each other in a cycle, each sorted by id
    pub fn import_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut ids: Vec<String> = component
                    .into_iter()
                    .map(|idx| self.graph[idx].id.clone())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Sorted, serializable form
    pub fn to_diagram(&self) -> DependencyDiagram {
        let mut nodes: Vec<DiagramNode> = self.graph.node_weights().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut edges: Vec<DiagramEdge> = self
            .graph
            .edge_indices()
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some(DiagramEdge {
                    from: self.graph[from].id.clone(),
                    to: self.graph[to].id.clone(),
                    weight: self.graph[edge],
                })
            })
            .collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

        DependencyDiagram { nodes, edges }
    }
}

/// Rebuilds the graph form of a finished diagram (used for cycle reporting).
impl From<&DependencyDiagram> for ModuleGraph {
    fn from(diagram: &DependencyDiagram) -> Self {
        let mut graph = ModuleGraph::new();
        for node in &diagram.nodes {
            graph.add_node(node.clone());
        }
        for edge in &diagram.edges {
            if let (Some(from), Some(to)) = (graph.find_node(&edge.from), graph.find_node(&edge.to)) {
                if from != to {
                    graph.graph.add_edge(from, to, edge.weight);
                }
            }
        }
        graph
    }
}
