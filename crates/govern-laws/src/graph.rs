//! Dependency graph construction and topological scheduling (spec §4.D).
//!
//! `original_source/pkg/laws/parser.go` builds a `gograph.Graph[*LawNode]`
//! by reflecting over the decoded struct tree to discover group/type/name
//! buckets, wiring a `root` vertex to every law and then rewiring edges
//! per `before`/`after` token, before calling `gograph.TopologySort`.
//! `LawSet::vertices` (see `model.rs`) already replaces the reflection
//! with an explicit enumeration; this module only has to build the
//! `petgraph` graph from that list and run a stable Kahn sort.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::GraphError;
use crate::model::{Law, LawSet, LawVertex};

/// Sentinel token for the synthetic root vertex. No real law can collide
/// with it: tokens are always `group::type::name` with a non-empty group.
const ROOT_TOKEN: &str = "root::root::root";

/// A scheduled unit: its dependency token, the law to apply, and the
/// tokens of every vertex that must run before it — the real graph
/// predecessors (root excluded), covering both `after` edges onto this
/// vertex and `before` edges other vertices declared onto it. The
/// orchestrator's failure-skip pass walks this list rather than
/// re-deriving it from the law's own `after()` field, which only ever
/// sees half of the graph's incoming edges.
pub struct ScheduledLaw {
    pub token: String,
    pub law: Law,
    pub predecessors: Vec<String>,
}

/// Build the dependency graph from a decoded `LawSet` and return its laws
/// in a valid application order, root-first.
///
/// Root is not included in the returned schedule — spec §4.D calls it "a
/// no-op resource" emitted first, and the orchestrator has nothing to do
/// for it beyond acknowledging the pass has started.
pub fn schedule(laws: &LawSet) -> Result<Vec<ScheduledLaw>, GraphError> {
    let vertices = laws.vertices();

    let mut graph = DiGraph::<LawVertex, ()>::new();
    let mut index_by_token: HashMap<String, NodeIndex> = HashMap::new();

    let root_idx = graph.add_node(LawVertex {
        group: "root",
        type_: "root",
        name: "root".to_string(),
        law: Law::User(crate::model::User::default()),
    });
    index_by_token.insert(ROOT_TOKEN.to_string(), root_idx);

    for vertex in vertices {
        let token = vertex.token();
        if index_by_token.contains_key(&token) {
            return Err(GraphError::DuplicateIdentity(token));
        }
        let idx = graph.add_node(vertex);
        index_by_token.insert(token, idx);
    }

    // Every non-root vertex starts wired from root; `after`/`before` edges
    // below add the real dependency and implicitly supersede this default
    // since the sort only needs *a* predecessor, not the absence of root.
    for &idx in index_by_token.values() {
        if idx != root_idx {
            graph.add_edge(root_idx, idx, ());
        }
    }

    for idx in graph.node_indices().collect::<Vec<_>>() {
        if idx == root_idx {
            continue;
        }
        let (after, before) = {
            let vertex = &graph[idx];
            (vertex.law.after().to_vec(), vertex.law.before().to_vec())
        };

        for dep in after {
            let dep_idx = *index_by_token
                .get(&dep.to_lowercase())
                .ok_or_else(|| GraphError::UnresolvedToken(dep.clone()))?;
            graph.add_edge(dep_idx, idx, ());
            if let Some(edge) = graph.find_edge(root_idx, idx) {
                graph.remove_edge(edge);
            }
        }

        for dep in before {
            let dep_idx = *index_by_token
                .get(&dep.to_lowercase())
                .ok_or_else(|| GraphError::UnresolvedToken(dep.clone()))?;
            graph.add_edge(idx, dep_idx, ());
            if let Some(edge) = graph.find_edge(root_idx, dep_idx) {
                graph.remove_edge(edge);
            }
        }
    }

    let order = stable_topological_sort(&graph, root_idx)?;

    Ok(order
        .into_iter()
        .filter(|&idx| idx != root_idx)
        .map(|idx| {
            let vertex = &graph[idx];
            let predecessors = graph
                .neighbors_directed(idx, petgraph::Incoming)
                .filter(|&pred_idx| pred_idx != root_idx)
                .map(|pred_idx| graph[pred_idx].token())
                .collect();
            ScheduledLaw { token: vertex.token(), law: vertex.law.clone(), predecessors }
        })
        .collect())
}

/// Kahn's algorithm with a `VecDeque` ready-queue: vertices become ready
/// in the order their last remaining predecessor finishes, and ties among
/// vertices that become ready simultaneously resolve in ascending node
/// index (= insertion order), matching spec §4.D's "stable in insertion
/// order" requirement.
fn stable_topological_sort(
    graph: &DiGraph<LawVertex, ()>,
    root_idx: NodeIndex,
) -> Result<Vec<NodeIndex>, GraphError> {
    let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
    for idx in graph.node_indices() {
        in_degree.insert(idx, graph.neighbors_directed(idx, petgraph::Incoming).count());
    }

    // `root_idx` is node 0 (added first) and `node_indices()` yields
    // ascending order, so it naturally lands first among zero-indegree
    // vertices without special-casing.
    let mut ready: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|idx| in_degree[idx] == 0)
        .collect();
    debug_assert_eq!(ready.front().copied(), Some(root_idx));

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(idx) = ready.pop_front() {
        order.push(idx);
        let mut successors: Vec<NodeIndex> = graph.neighbors_directed(idx, petgraph::Outgoing).collect();
        successors.sort_by_key(|n| n.index());
        for succ in successors {
            let degree = in_degree.get_mut(&succ).unwrap();
            *degree -= 1;
            if *degree == 0 {
                ready.push_back(succ);
            }
        }
    }

    if order.len() != graph.node_count() {
        let on_cycle: Vec<String> = graph
            .node_indices()
            .filter(|idx| !order.contains(idx))
            .map(|idx| graph[idx].token())
            .collect();
        return Err(GraphError::Cycle { vertices_on_cycle: on_cycle });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;

    fn user(name: &str, after: Vec<&str>) -> User {
        User { name: name.to_string(), after: after.into_iter().map(String::from).collect(), ..Default::default() }
    }

    fn user_with_before(name: &str, before: Vec<&str>) -> User {
        User { name: name.to_string(), before: before.into_iter().map(String::from).collect(), ..Default::default() }
    }

    #[test]
    fn predecessors_carry_after_edges() {
        let laws = LawSet { users: vec![user("root", vec![]), user("iggy", vec!["users::present::root"])], ..Default::default() };
        let scheduled = schedule(&laws).unwrap();
        let iggy = scheduled.iter().find(|s| s.token == "users::present::iggy").unwrap();
        assert_eq!(iggy.predecessors, vec!["users::present::root".to_string()]);
        let root = scheduled.iter().find(|s| s.token == "users::present::root").unwrap();
        assert!(root.predecessors.is_empty());
    }

    #[test]
    fn predecessors_also_carry_before_edges() {
        // "root" declares `before: [iggy]`; iggy itself declares no
        // `after`, so iggy's predecessor list must still name root — this
        // is the edge direction `law.after()` alone can never see.
        let laws = LawSet {
            users: vec![user_with_before("root", vec!["users::present::iggy"]), user("iggy", vec![])],
            ..Default::default()
        };
        let scheduled = schedule(&laws).unwrap();
        let iggy = scheduled.iter().find(|s| s.token == "users::present::iggy").unwrap();
        assert_eq!(iggy.predecessors, vec!["users::present::root".to_string()]);
    }

    #[test]
    fn root_first_independent_laws_follow() {
        let laws = LawSet { users: vec![user("root", vec![]), user("iggy", vec![])], ..Default::default() };
        let scheduled = schedule(&laws).unwrap();
        assert_eq!(scheduled.len(), 2);
        assert_eq!(scheduled[0].token, "users::present::root");
        assert_eq!(scheduled[1].token, "users::present::iggy");
    }

    #[test]
    fn after_token_forces_order() {
        let laws = LawSet { users: vec![user("root", vec![]), user("iggy", vec!["users::present::root"])], ..Default::default() };
        let scheduled = schedule(&laws).unwrap();
        let root_pos = scheduled.iter().position(|s| s.token == "users::present::root").unwrap();
        let iggy_pos = scheduled.iter().position(|s| s.token == "users::present::iggy").unwrap();
        assert!(root_pos < iggy_pos);
    }

    #[test]
    fn unresolved_token_is_an_error() {
        let laws = LawSet { users: vec![user("iggy", vec!["users::present::ghost"])], ..Default::default() };
        let err = schedule(&laws).unwrap_err();
        assert!(matches!(err, GraphError::UnresolvedToken(_)));
    }

    #[test]
    fn cycle_is_detected() {
        let laws = LawSet {
            users: vec![
                user("a", vec!["users::present::b"]),
                user("b", vec!["users::present::a"]),
            ],
            ..Default::default()
        };
        let err = schedule(&laws).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let laws = LawSet { users: vec![user("iggy", vec![]), user("iggy", vec![])], ..Default::default() };
        let err = schedule(&laws).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateIdentity(_)));
    }
}
