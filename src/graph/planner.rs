//! Depth-first path search over a [`Graph`]

use super::model::{Edge, Graph};
use crate::error::{JourneyError, Result};
use std::collections::{HashMap, HashSet};

/// Find a path from `start_id` to `end_id`, both inclusive.
///
/// Outgoing edges are explored in edge-list order and every node is visited
/// at most once, so the first branch that reaches `end_id` wins. That path is
/// not necessarily the shortest. Returns `None` when no path exists or either
/// id is not in the graph.
pub fn find_path(graph: &Graph, start_id: &str, end_id: &str) -> Option<Vec<String>> {
    if !graph.contains_node(start_id) || !graph.contains_node(end_id) {
        return None;
    }
    if start_id == end_id {
        return Some(vec![start_id.to_string()]);
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in graph.edges() {
        adjacency
            .entry(edge.source_id.as_str())
            .or_default()
            .push(edge.target_id.as_str());
    }

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start_id);
    let mut stack: Vec<(&str, usize)> = vec![(start_id, 0)];

    while let Some(frame) = stack.last_mut() {
        let next = adjacency
            .get(frame.0)
            .and_then(|targets| targets.get(frame.1))
            .copied();
        let Some(target) = next else {
            stack.pop();
            continue;
        };
        frame.1 += 1;

        if target == end_id {
            let mut path: Vec<String> = stack.iter().map(|(id, _)| id.to_string()).collect();
            path.push(end_id.to_string());
            return Some(path);
        }
        if visited.insert(target) {
            stack.push((target, 0));
        }
    }

    None
}

/// Like [`find_path`], but a missing path is an error
pub fn require_path(graph: &Graph, start_id: &str, end_id: &str) -> Result<Vec<String>> {
    find_path(graph, start_id, end_id).ok_or_else(|| JourneyError::NoPathFound {
        start: start_id.to_string(),
        end: end_id.to_string(),
    })
}

/// Resolve the edge behind each consecutive pair of a path
pub fn path_edges<'g>(graph: &'g Graph, path: &[String]) -> Result<Vec<&'g Edge>> {
    path.windows(2)
        .map(|pair| {
            graph
                .find_edge(&pair[0], &pair[1])
                .ok_or_else(|| JourneyError::MissingEdge {
                    source_id: pair[0].clone(),
                    target_id: pair[1].clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::Payload;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut g = Graph::new();
        for id in nodes {
            g.add_node(id, Payload::new()).unwrap();
        }
        for (s, t) in edges {
            g.add_edge(s, t, Payload::new()).unwrap();
        }
        g
    }

    #[test]
    fn test_first_branch_wins_over_shortest() {
        // a -> b -> c -> d is explored before the direct a -> d
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")],
        );
        assert_eq!(find_path(&g, "a", "d").unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_backtracks_out_of_dead_ends() {
        let g = graph(
            &["a", "b", "x", "c"],
            &[("a", "x"), ("a", "b"), ("b", "c")],
        );
        assert_eq!(find_path(&g, "a", "c").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_terminates_on_cycles() {
        let mut g = Graph::new();
        for id in ["a", "b", "c", "z"] {
            g.add_node(id, Payload::new()).unwrap();
        }
        g.add_edge("a", "b", Payload::new()).unwrap();
        g.add_edge("b", "c", Payload::new()).unwrap();
        g.add_edge("c", "a", Payload::new()).unwrap();
        assert_eq!(find_path(&g, "a", "z"), None);
        assert_eq!(find_path(&g, "b", "a").unwrap(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_start_equals_end() {
        let g = graph(&["a"], &[]);
        assert_eq!(find_path(&g, "a", "a").unwrap(), vec!["a"]);
    }

    #[test]
    fn test_unknown_nodes_have_no_path() {
        let g = graph(&["a", "b"], &[("a", "b")]);
        assert_eq!(find_path(&g, "a", "nope"), None);
        assert_eq!(find_path(&g, "nope", "b"), None);
        assert!(matches!(
            require_path(&g, "b", "a"),
            Err(JourneyError::NoPathFound { .. })
        ));
    }

    #[test]
    fn test_path_edges_reports_missing_edge() {
        let g = graph(&["a", "b", "c"], &[("a", "b")]);
        let edges = path_edges(&g, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(edges.len(), 1);

        let err = path_edges(&g, &["a".into(), "b".into(), "c".into()]).unwrap_err();
        assert!(matches!(err, JourneyError::MissingEdge { .. }));
    }
}
