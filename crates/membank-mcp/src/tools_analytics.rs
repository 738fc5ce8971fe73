//! Whole-graph analytics tools. Long-running: they stream progress events
//! and check the cancel token between iterations.

use crate::progress::{ProgressEvent, ProgressSink};
use crate::service::ToolScope;
use crate::McpServer;
use membank_core::{CancelToken, MemBankError};
use membank_graph::ScopeGraph;
use serde_json::{json, Value};

const PAGERANK_DAMPING: f64 = 0.85;
const PAGERANK_MAX_ITER: usize = 100;
const PAGERANK_TOLERANCE: f64 = 1e-6;

impl McpServer {
    /// PageRank over the Component / DEPENDS_ON projection.
    pub(crate) fn tool_pagerank(
        &self,
        scope: &ToolScope,
        args: &Value,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Value, MemBankError> {
        let damping = args
            .get("damping")
            .and_then(|v| v.as_f64())
            .unwrap_or(PAGERANK_DAMPING);
        let max_iter = crate::args::opt_usize(args, "maxIterations").unwrap_or(PAGERANK_MAX_ITER);

        let graph = self.load_projection(scope, progress)?;

        let ranks = graph.pagerank(
            damping,
            max_iter,
            PAGERANK_TOLERANCE,
            cancel,
            &mut |round| {
                if round % 10 == 0 {
                    progress.notify(ProgressEvent::working(
                        format!("pagerank iteration {round}"),
                        Some(round as f64 / max_iter as f64 * 100.0),
                    ));
                }
            },
        )?;

        // Highest rank first; ties broken by ascending id.
        let mut nodes: Vec<(&String, &f64)> = ranks.iter().collect();
        nodes.sort_by(|a, b| {
            b.1.partial_cmp(a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        let nodes: Vec<Value> = nodes
            .into_iter()
            .map(|(id, score)| json!({ "id": id, "score": score }))
            .collect();

        progress.notify(ProgressEvent::complete("pagerank complete"));
        Ok(json!({
            "damping": damping,
            "nodeCount": graph.node_count(),
            "nodes": nodes,
        }))
    }

    /// Louvain communities plus modularity.
    pub(crate) fn tool_louvain(
        &self,
        scope: &ToolScope,
        args: &Value,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Value, MemBankError> {
        let resolution = args
            .get("resolution")
            .and_then(|v| v.as_f64())
            .unwrap_or(1.0);

        let graph = self.load_projection(scope, progress)?;
        let (communities, modularity) = graph.louvain_communities(resolution, cancel)?;

        progress.notify(ProgressEvent::complete("community detection complete"));
        Ok(json!({
            "resolution": resolution,
            "communityCount": communities.len(),
            "communities": communities,
            "modularity": modularity,
        }))
    }

    /// K-core decomposition: coreness per node.
    pub(crate) fn tool_k_core(
        &self,
        scope: &ToolScope,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Value, MemBankError> {
        let graph = self.load_projection(scope, progress)?;
        let coreness = graph.k_core_decomposition(cancel)?;

        let max_core = coreness.values().copied().max().unwrap_or(0);
        let nodes: Vec<Value> = coreness
            .iter()
            .map(|(id, core)| json!({ "id": id, "coreness": core }))
            .collect();

        progress.notify(ProgressEvent::complete("k-core decomposition complete"));
        Ok(json!({
            "maxCoreness": max_core,
            "nodes": nodes,
        }))
    }

    /// Strongly connected components with at least two nodes.
    pub(crate) fn tool_scc(
        &self,
        scope: &ToolScope,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Value, MemBankError> {
        let graph = self.load_projection(scope, progress)?;
        cancel.check()?;
        let components = graph.strongly_connected_components(2);

        progress.notify(ProgressEvent::complete("scc complete"));
        Ok(json!({
            "componentCount": components.len(),
            "components": components,
        }))
    }

    /// Weakly connected components with at least two nodes.
    pub(crate) fn tool_wcc(
        &self,
        scope: &ToolScope,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Value, MemBankError> {
        let graph = self.load_projection(scope, progress)?;
        cancel.check()?;
        let components = graph.weakly_connected_components(2);

        progress.notify(ProgressEvent::complete("wcc complete"));
        Ok(json!({
            "componentCount": components.len(),
            "components": components,
        }))
    }

    fn load_projection(
        &self,
        scope: &ToolScope,
        progress: &dyn ProgressSink,
    ) -> Result<ScopeGraph, MemBankError> {
        progress.notify(ProgressEvent::working(
            format!("projecting ({}, {})", scope.repository, scope.branch),
            Some(0.0),
        ));
        ScopeGraph::load_components(&scope.client, &scope.repository, &scope.branch)
    }
}
