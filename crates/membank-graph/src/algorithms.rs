//! Whole-graph analytics: PageRank, Louvain, k-core, SCC.

use crate::ScopeGraph;
use membank_core::{CancelToken, MemBankError};
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, HashMap};

impl ScopeGraph {
    /// Node ids in ascending order, with a reverse position lookup. All
    /// analytics index their working vectors by this order, which makes
    /// every run on a fixed graph schedule-independent.
    fn sorted_positions(&self) -> (Vec<String>, HashMap<String, usize>) {
        let mut ids: Vec<String> = self.id_to_index.keys().cloned().collect();
        ids.sort();
        let positions = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        (ids, positions)
    }

    /// Out-neighbor positions per node, aligned with `sorted_positions`.
    fn out_adjacency(&self, positions: &HashMap<String, usize>) -> Vec<Vec<usize>> {
        let mut targets: Vec<Vec<usize>> = vec![Vec::new(); positions.len()];
        for edge in self.graph.edge_indices() {
            let Some((src, dst)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            let (Some(src), Some(dst)) = (self.graph.node_weight(src), self.graph.node_weight(dst))
            else {
                continue;
            };
            targets[positions[src]].push(positions[dst]);
        }
        for outs in targets.iter_mut() {
            outs.sort_unstable();
        }
        targets
    }

    /// Symmetrised edge weights per node (parallel edges merged), aligned
    /// with `sorted_positions`, plus the total undirected weight.
    fn undirected_weights(
        &self,
        positions: &HashMap<String, usize>,
    ) -> (Vec<BTreeMap<usize, f64>>, f64) {
        let mut weights: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); positions.len()];
        let mut total = 0.0;
        for edge in self.graph.edge_indices() {
            let Some((src, dst)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            let (Some(src), Some(dst)) = (self.graph.node_weight(src), self.graph.node_weight(dst))
            else {
                continue;
            };
            let (a, b) = (positions[src], positions[dst]);
            if a == b {
                continue;
            }
            let w = self.graph[edge];
            *weights[a].entry(b).or_insert(0.0) += w;
            *weights[b].entry(a).or_insert(0.0) += w;
            total += w;
        }
        (weights, total)
    }

    /// PageRank by power iteration.
    ///
    /// Dangling mass is pooled each round and redistributed uniformly.
    /// Iteration stops when the L1 delta drops below `tolerance` or after
    /// `max_iter` rounds. The cancel token is checked between iterations;
    /// `on_iteration` fires after each completed round with the 1-based
    /// iteration number.
    pub fn pagerank(
        &self,
        damping: f64,
        max_iter: usize,
        tolerance: f64,
        cancel: &CancelToken,
        on_iteration: &mut dyn FnMut(usize),
    ) -> Result<BTreeMap<String, f64>, MemBankError> {
        let n = self.graph.node_count();
        if n == 0 {
            return Ok(BTreeMap::new());
        }
        let nf = n as f64;

        let (ids, positions) = self.sorted_positions();
        let targets = self.out_adjacency(&positions);
        let teleport = (1.0 - damping) / nf;
        let mut rank = vec![1.0 / nf; n];

        for round in 1..=max_iter {
            cancel.check()?;

            // Rank parked on sink nodes flows back into the whole graph.
            let dangling: f64 = targets
                .iter()
                .zip(&rank)
                .filter(|(outs, _)| outs.is_empty())
                .map(|(_, r)| *r)
                .sum();
            let mut next = vec![teleport + damping * dangling / nf; n];

            for (source, outs) in targets.iter().enumerate() {
                if outs.is_empty() {
                    continue;
                }
                let share = damping * rank[source] / outs.len() as f64;
                for &target in outs {
                    next[target] += share;
                }
            }

            let delta: f64 = rank
                .iter()
                .zip(&next)
                .map(|(before, after)| (before - after).abs())
                .sum();
            rank = next;
            on_iteration(round);

            if delta < tolerance {
                break;
            }
        }

        Ok(ids.into_iter().zip(rank).collect())
    }

    /// Louvain community detection (local-moving modularity maximisation,
    /// undirected). Returns sorted communities plus the modularity of the
    /// final assignment.
    ///
    /// Each visit detaches the node from its community, scores every
    /// adjacent community (its old one included) by `w(i→c) - γ·k_i·Σ_c/2m`,
    /// and re-attaches it to the argmax. Community degree sums are kept
    /// incrementally rather than recomputed per visit.
    pub fn louvain_communities(
        &self,
        resolution: f64,
        cancel: &CancelToken,
    ) -> Result<(Vec<Vec<String>>, f64), MemBankError> {
        let n = self.graph.node_count();
        if n == 0 {
            return Ok((Vec::new(), 0.0));
        }

        let (ids, positions) = self.sorted_positions();
        let (weights, m) = self.undirected_weights(&positions);

        if m == 0.0 {
            // No edges: every node is its own community, modularity 0.
            return Ok((ids.into_iter().map(|id| vec![id]).collect(), 0.0));
        }

        let two_m = 2.0 * m;
        let degree: Vec<f64> = weights.iter().map(|nbrs| nbrs.values().sum()).collect();

        // community[i] is a label in 0..n; community_degree is indexed by
        // label and maintained across moves.
        let mut community: Vec<usize> = (0..n).collect();
        let mut community_degree = degree.clone();

        let mut moved = true;
        let mut passes = 0;
        while moved && passes < 100 {
            cancel.check()?;
            moved = false;
            passes += 1;

            for i in 0..n {
                let home = community[i];

                // Edge weight from i into each neighboring community.
                // BTreeMap keeps the candidate order deterministic.
                let mut link: BTreeMap<usize, f64> = BTreeMap::new();
                for (&j, &w) in &weights[i] {
                    *link.entry(community[j]).or_insert(0.0) += w;
                }

                community_degree[home] -= degree[i];

                let mut best = home;
                let mut best_score = link.get(&home).copied().unwrap_or(0.0)
                    - resolution * degree[i] * community_degree[home] / two_m;
                for (&label, &w_into) in &link {
                    if label == home {
                        continue;
                    }
                    let score =
                        w_into - resolution * degree[i] * community_degree[label] / two_m;
                    if score > best_score {
                        best_score = score;
                        best = label;
                    }
                }

                community_degree[best] += degree[i];
                if best != home {
                    community[i] = best;
                    moved = true;
                }
            }
        }

        // Modularity of the final assignment:
        //   Q = sum_c ( e_c / m - (d_c / 2m)^2 )
        // with e_c the intra-community edge weight and d_c the degree sum.
        let mut intra = vec![0.0; n];
        for (i, nbrs) in weights.iter().enumerate() {
            for (&j, &w) in nbrs {
                if i < j && community[i] == community[j] {
                    intra[community[i]] += w;
                }
            }
        }
        let mut label_degree = vec![0.0; n];
        for i in 0..n {
            label_degree[community[i]] += degree[i];
        }
        let modularity: f64 = (0..n)
            .map(|label| intra[label] / m - (label_degree[label] / two_m).powi(2))
            .sum();

        // ids are sorted, so grouping in index order yields sorted groups.
        let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (i, id) in ids.into_iter().enumerate() {
            groups.entry(community[i]).or_default().push(id);
        }
        let mut communities: Vec<Vec<String>> = groups.into_values().collect();
        communities.sort();

        Ok((communities, modularity))
    }

    /// K-core decomposition by classical peeling on undirected degrees.
    /// Returns each node's coreness.
    pub fn k_core_decomposition(
        &self,
        cancel: &CancelToken,
    ) -> Result<BTreeMap<String, usize>, MemBankError> {
        let indices = self.ordered_indices();
        let mut degree: HashMap<NodeIndex, usize> = indices
            .iter()
            .map(|&idx| (idx, self.undirected_neighbors(idx).len()))
            .collect();
        let mut remaining: Vec<NodeIndex> = indices.clone();
        let mut coreness: BTreeMap<String, usize> = BTreeMap::new();

        let mut k = 0usize;
        while !remaining.is_empty() {
            cancel.check()?;
            loop {
                let peel: Vec<NodeIndex> = remaining
                    .iter()
                    .copied()
                    .filter(|idx| degree[idx] <= k)
                    .collect();
                if peel.is_empty() {
                    break;
                }
                for idx in &peel {
                    if let Some(id) = self.graph.node_weight(*idx) {
                        coreness.insert(id.clone(), k);
                    }
                    remaining.retain(|r| r != idx);
                    for neighbor in self.undirected_neighbors(*idx) {
                        if remaining.contains(&neighbor) {
                            if let Some(d) = degree.get_mut(&neighbor) {
                                *d = d.saturating_sub(1);
                            }
                        }
                    }
                    degree.insert(*idx, 0);
                }
            }
            k += 1;
        }

        Ok(coreness)
    }

    /// Strongly connected components (Tarjan). Each component and the list
    /// are sorted; only components with at least `min_size` nodes are
    /// reported.
    pub fn strongly_connected_components(&self, min_size: usize) -> Vec<Vec<String>> {
        let sccs = petgraph::algo::tarjan_scc(&self.graph);
        let mut result: Vec<Vec<String>> = sccs
            .into_iter()
            .filter_map(|component| {
                if component.len() < min_size {
                    return None;
                }
                let mut ids: Vec<String> = component
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                ids.sort();
                Some(ids)
            })
            .collect();
        result.sort();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::graph_from_edges;

    fn run_pagerank(g: &ScopeGraph) -> BTreeMap<String, f64> {
        g.pagerank(0.85, 100, 1e-6, &CancelToken::new(), &mut |_| {})
            .unwrap()
    }

    #[test]
    fn pagerank_sums_to_one() {
        let g = graph_from_edges(&[], &[("a", "b"), ("b", "c"), ("a", "c")]);
        let ranks = run_pagerank(&g);
        let total: f64 = ranks.values().sum();
        assert!((total - 1.0).abs() < 1e-6, "total {total}");
    }

    #[test]
    fn pagerank_chain_favors_sink() {
        let g = graph_from_edges(&[], &[("a", "b"), ("b", "c")]);
        let ranks = run_pagerank(&g);
        assert!(ranks["c"] > ranks["b"]);
        assert!(ranks["b"] > ranks["a"]);
    }

    #[test]
    fn pagerank_star_center_receives_rank() {
        let g = graph_from_edges(&[], &[("a", "hub"), ("b", "hub"), ("c", "hub")]);
        let ranks = run_pagerank(&g);
        for leaf in ["a", "b", "c"] {
            assert!(ranks["hub"] > ranks[leaf]);
        }
    }

    #[test]
    fn pagerank_empty_and_single() {
        let g = ScopeGraph::new();
        assert!(run_pagerank(&g).is_empty());

        let g = graph_from_edges(&["only"], &[]);
        let ranks = run_pagerank(&g);
        assert!((ranks["only"] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pagerank_is_deterministic() {
        let g = graph_from_edges(
            &[],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("a", "d"), ("d", "b")],
        );
        let first = run_pagerank(&g);
        let second = run_pagerank(&g);
        for (id, score) in &first {
            assert!((score - second[id]).abs() < 1e-12);
        }
    }

    #[test]
    fn pagerank_respects_cancellation() {
        let g = graph_from_edges(&[], &[("a", "b"), ("b", "a")]);
        let cancel = CancelToken::new();
        let mut iterations = 0usize;
        let result = g.pagerank(0.85, 100, 0.0, &cancel, &mut |round| {
            iterations = round;
            if round == 2 {
                cancel.cancel();
            }
        });
        assert!(matches!(result, Err(MemBankError::Cancelled)));
        // Cancelled within one iteration of the request.
        assert_eq!(iterations, 2);
    }

    #[test]
    fn louvain_two_cliques() {
        let g = graph_from_edges(
            &[],
            &[
                ("a1", "a2"),
                ("a2", "a3"),
                ("a3", "a1"),
                ("b1", "b2"),
                ("b2", "b3"),
                ("b3", "b1"),
                // Single bridge between the cliques.
                ("a1", "b1"),
            ],
        );
        let (communities, modularity) = g
            .louvain_communities(1.0, &CancelToken::new())
            .unwrap();
        assert_eq!(communities.len(), 2);
        assert!(communities.contains(&vec![
            "a1".to_string(),
            "a2".to_string(),
            "a3".to_string()
        ]));
        assert!(modularity > 0.2, "modularity {modularity}");
    }

    #[test]
    fn louvain_no_edges_yields_singletons() {
        let g = graph_from_edges(&["a", "b", "c"], &[]);
        let (communities, modularity) = g
            .louvain_communities(1.0, &CancelToken::new())
            .unwrap();
        assert_eq!(communities.len(), 3);
        assert_eq!(modularity, 0.0);
    }

    #[test]
    fn k_core_distinguishes_core_from_fringe() {
        // 4-clique (coreness 3) with a pendant node (coreness 1).
        let g = graph_from_edges(
            &[],
            &[
                ("a", "b"),
                ("a", "c"),
                ("a", "d"),
                ("b", "c"),
                ("b", "d"),
                ("c", "d"),
                ("d", "tail"),
            ],
        );
        let coreness = g.k_core_decomposition(&CancelToken::new()).unwrap();
        assert_eq!(coreness["a"], 3);
        assert_eq!(coreness["d"], 3);
        assert_eq!(coreness["tail"], 1);
    }

    #[test]
    fn k_core_isolated_nodes_are_zero() {
        let g = graph_from_edges(&["lone"], &[("a", "b")]);
        let coreness = g.k_core_decomposition(&CancelToken::new()).unwrap();
        assert_eq!(coreness["lone"], 0);
        assert_eq!(coreness["a"], 1);
        assert_eq!(coreness["b"], 1);
    }

    #[test]
    fn scc_detects_cycles() {
        // a <-> b form a cycle; c hangs off.
        let g = graph_from_edges(&[], &[("a", "b"), ("b", "a"), ("b", "c")]);
        let all = g.strongly_connected_components(1);
        assert_eq!(all.len(), 2);

        let nontrivial = g.strongly_connected_components(2);
        assert_eq!(nontrivial, vec![vec!["a", "b"]]);
    }

    #[test]
    fn scc_acyclic_graph_has_no_nontrivial_components() {
        let g = graph_from_edges(&[], &[("a", "b"), ("b", "c")]);
        assert!(g.strongly_connected_components(2).is_empty());
    }
}
