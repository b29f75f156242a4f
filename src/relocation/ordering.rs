//! Callee-first ordering of a batch.

use super::resolver::{BatchEntry, CallResolver};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::{debug, debug_span};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderResult {
    /// Batch indices, callees before callers.
    pub order: Vec<usize>,
    /// `(caller, callee)` edges ignored to break cycles.
    pub cycle_edges: Vec<(usize, usize)>,
}

/// Orders `batch` so that every method comes after the batch methods it
/// calls. Cycles don't fail: methods that call each other form a group that
/// is emitted in original batch order, after the groups it depends on.
pub fn order(batch: &[BatchEntry], resolver: &dyn CallResolver) -> OrderResult {
    let _span = debug_span!("order_batch", size = batch.len()).entered();
    let graph = build_call_graph(batch, resolver);

    let mut component_of = vec![0usize; batch.len()];
    let mut components: Vec<Vec<usize>> = tarjan_scc(&graph)
        .into_iter()
        .map(|nodes| {
            let mut members: Vec<usize> = nodes.iter().map(|n| graph[*n]).collect();
            members.sort_unstable();
            members
        })
        .collect();
    components.sort_by_key(|members| members[0]);
    for (id, members) in components.iter().enumerate() {
        for &member in members {
            component_of[member] = id;
        }
    }

    let mut result = OrderResult::default();
    for edge in graph.edge_references() {
        let (caller, callee) = (edge.source().index(), edge.target().index());
        if component_of[caller] == component_of[callee] && caller < callee {
            debug!(
                caller = batch[caller].name(),
                callee = batch[callee].name(),
                "Ignoring call edge that closes a cycle"
            );
            result.cycle_edges.push((caller, callee));
        }
    }
    result.cycle_edges.sort_unstable();

    let mut visited = vec![false; components.len()];
    for id in 0..components.len() {
        visit(&graph, &components, &component_of, id, &mut visited, &mut result.order);
    }
    debug!(order = ?result.order, "Batch ordered");
    result
}

fn build_call_graph(batch: &[BatchEntry], resolver: &dyn CallResolver) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::new();
    for i in 0..batch.len() {
        graph.add_node(i);
    }
    for (caller, entry) in batch.iter().enumerate() {
        for callee in resolver.callees(entry, batch) {
            if callee != caller && callee < batch.len() {
                graph.update_edge(NodeIndex::new(caller), NodeIndex::new(callee), ());
            }
        }
    }
    graph
}

/// Depth first over the groups, appending a group after every group it calls.
fn visit(
    graph: &DiGraph<usize, ()>,
    components: &[Vec<usize>],
    component_of: &[usize],
    id: usize,
    visited: &mut [bool],
    order: &mut Vec<usize>,
) {
    if visited[id] {
        return;
    }
    visited[id] = true;

    let mut callees: Vec<usize> = components[id]
        .iter()
        .flat_map(|&member| graph.neighbors_directed(NodeIndex::new(member), Direction::Outgoing))
        .map(|callee| component_of[callee.index()])
        .filter(|&callee| callee != id)
        .collect();
    callees.sort_unstable();
    callees.dedup();
    for callee in callees {
        visit(graph, components, component_of, callee, visited, order);
    }
    order.extend(&components[id]);
}
