//! Depth-limited traversals and path queries on a [`ScopeGraph`].

use crate::ScopeGraph;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Direction of a depth-limited traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseDirection {
    /// Follow edges src → dst (dependencies).
    Outgoing,
    /// Follow edges dst → src (dependents).
    Incoming,
    /// Follow both (neighborhood).
    Undirected,
}

impl ScopeGraph {
    /// Nodes reachable from `start` within `depth` hops, deduplicated and
    /// sorted by id. Depth 0 returns only the start node itself; deeper
    /// traversals exclude it. An unknown start returns an empty list.
    pub fn reachable(
        &self,
        start: &str,
        depth: usize,
        direction: TraverseDirection,
    ) -> Vec<String> {
        let Some(&start_idx) = self.id_to_index.get(start) else {
            return Vec::new();
        };
        if depth == 0 {
            return vec![start.to_string()];
        }

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        visited.insert(start_idx);
        let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::new();
        queue.push_back((start_idx, 0));
        let mut found: Vec<String> = Vec::new();

        while let Some((current, dist)) = queue.pop_front() {
            if dist >= depth {
                continue;
            }
            for neighbor in self.step(current, direction) {
                if visited.insert(neighbor) {
                    if let Some(id) = self.graph.node_weight(neighbor) {
                        found.push(id.clone());
                    }
                    queue.push_back((neighbor, dist + 1));
                }
            }
        }

        found.sort();
        found
    }

    fn step(&self, idx: NodeIndex, direction: TraverseDirection) -> Vec<NodeIndex> {
        match direction {
            TraverseDirection::Outgoing => self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .collect(),
            TraverseDirection::Incoming => self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .collect(),
            TraverseDirection::Undirected => self.undirected_neighbors(idx),
        }
    }

    /// Shortest undirected path from `from` to `to`, inclusive of both
    /// endpoints. Among equally short paths the lexicographically smallest
    /// (by node id sequence) wins. `None` when no path exists or either
    /// endpoint is unknown. A node is connected to itself by the trivial
    /// path.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let &start = self.id_to_index.get(from)?;
        let &goal = self.id_to_index.get(to)?;
        if start == goal {
            return Some(vec![from.to_string()]);
        }

        // BFS visiting neighbors in ascending id order: the first time a
        // node is reached, its predecessor chain is the lexicographically
        // smallest among shortest paths.
        let mut predecessor: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        visited.insert(start);
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for neighbor in self.undirected_neighbors(current) {
                if visited.insert(neighbor) {
                    predecessor.insert(neighbor, current);
                    if neighbor == goal {
                        return Some(self.unwind_path(start, goal, &predecessor));
                    }
                    queue.push_back(neighbor);
                }
            }
        }
        None
    }

    fn unwind_path(
        &self,
        start: NodeIndex,
        goal: NodeIndex,
        predecessor: &HashMap<NodeIndex, NodeIndex>,
    ) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = goal;
        loop {
            if let Some(id) = self.graph.node_weight(current) {
                path.push(id.clone());
            }
            if current == start {
                break;
            }
            current = predecessor[&current];
        }
        path.reverse();
        path
    }

    /// Weakly connected components: undirected reachability groups. Each
    /// component and the component list are sorted; only components with at
    /// least `min_size` nodes are reported.
    pub fn weakly_connected_components(&self, min_size: usize) -> Vec<Vec<String>> {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut components: Vec<Vec<String>> = Vec::new();

        for start in self.ordered_indices() {
            if visited.contains(&start) {
                continue;
            }
            let mut component: Vec<String> = Vec::new();
            let mut queue: VecDeque<NodeIndex> = VecDeque::new();
            queue.push_back(start);
            visited.insert(start);

            while let Some(current) = queue.pop_front() {
                if let Some(id) = self.graph.node_weight(current) {
                    component.push(id.clone());
                }
                for neighbor in self.undirected_neighbors(current) {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }

            if component.len() >= min_size {
                component.sort();
                components.push(component);
            }
        }

        components.sort();
        components
    }
}
