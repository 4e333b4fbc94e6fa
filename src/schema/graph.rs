//! Dependency graph over the embed edge set.
//!
//! Rebuilt from the persisted live edges at the start of every operation;
//! adjacency lists in both directions, standard BFS for reachability and
//! transitive closures. "A depends on B" means A embeds B (directly or
//! through intermediate components).

use crate::schema::types::Embed;
use std::collections::{BTreeSet, HashMap, VecDeque};
use uuid::Uuid;

pub struct DependencyGraph {
    /// host -> embedded ("depends on")
    forward: HashMap<Uuid, BTreeSet<Uuid>>,
    /// embedded -> host ("is depended on by")
    reverse: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl DependencyGraph {
    pub fn from_edges(embeds: &[Embed]) -> Self {
        let mut forward: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
        let mut reverse: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
        for embed in embeds {
            forward
                .entry(embed.host_blueprint_id)
                .or_default()
                .insert(embed.embedded_blueprint_id);
            reverse
                .entry(embed.embedded_blueprint_id)
                .or_default()
                .insert(embed.host_blueprint_id);
        }
        Self { forward, reverse }
    }

    /// True if `from == to` or a directed chain of embed edges leads from
    /// `from` to `to`.
    pub fn has_path_to(&self, from: Uuid, to: Uuid) -> bool {
        if from == to {
            return true;
        }
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if let Some(next) = self.forward.get(&current) {
                for &n in next {
                    if n == to {
                        return true;
                    }
                    if seen.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }
        false
    }

    /// Blueprints directly embedded by `id`, deduplicated.
    pub fn direct_dependencies(&self, id: Uuid) -> BTreeSet<Uuid> {
        self.forward.get(&id).cloned().unwrap_or_default()
    }

    /// Blueprints that directly embed `id`.
    pub fn direct_dependents(&self, id: Uuid) -> BTreeSet<Uuid> {
        self.reverse.get(&id).cloned().unwrap_or_default()
    }

    /// Transitive closure of dependencies of `id`, excluding `id` itself.
    pub fn all_dependencies(&self, id: Uuid) -> BTreeSet<Uuid> {
        self.closure(id, &self.forward)
    }

    /// Transitive closure of dependents of `id`, excluding `id` itself.
    pub fn all_dependents(&self, id: Uuid) -> BTreeSet<Uuid> {
        self.closure(id, &self.reverse)
    }

    /// Number of blueprints on the longest chain from `id` downward
    /// (through dependencies), `id` included. The graph is acyclic by the
    /// time this runs, so the recursion-free memoized walk terminates.
    pub fn depth_below(&self, id: Uuid) -> usize {
        self.longest_chain(id, &self.forward)
    }

    /// Number of blueprints on the longest chain from `id` upward (through
    /// dependents), `id` included.
    pub fn depth_above(&self, id: Uuid) -> usize {
        self.longest_chain(id, &self.reverse)
    }

    fn closure(&self, id: Uuid, edges: &HashMap<Uuid, BTreeSet<Uuid>>) -> BTreeSet<Uuid> {
        let mut out = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if let Some(next) = edges.get(&current) {
                for &n in next {
                    if n != id && out.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }
        out
    }

    fn longest_chain(&self, id: Uuid, edges: &HashMap<Uuid, BTreeSet<Uuid>>) -> usize {
        let mut memo: HashMap<Uuid, usize> = HashMap::new();
        // Post-order over an explicit stack; no call-stack recursion.
        let mut stack = vec![(id, false)];
        while let Some((node, expanded)) = stack.pop() {
            if memo.contains_key(&node) {
                continue;
            }
            let next = edges.get(&node);
            if expanded {
                let deepest = next
                    .map(|ns| ns.iter().filter_map(|n| memo.get(n)).copied().max())
                    .flatten()
                    .unwrap_or(0);
                memo.insert(node, deepest + 1);
            } else {
                stack.push((node, true));
                if let Some(ns) = next {
                    for &n in ns {
                        if !memo.contains_key(&n) {
                            stack.push((n, false));
                        }
                    }
                }
            }
        }
        memo.get(&id).copied().unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(host: Uuid, embedded: Uuid) -> Embed {
        Embed::new(host, embedded, None)
    }

    #[test]
    fn reachability_follows_chains() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let graph = DependencyGraph::from_edges(&[edge(a, b), edge(b, c)]);

        assert!(graph.has_path_to(a, a));
        assert!(graph.has_path_to(a, b));
        assert!(graph.has_path_to(a, c));
        assert!(!graph.has_path_to(c, a));
        assert!(!graph.has_path_to(a, d));
    }

    #[test]
    fn closures_exclude_self() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let graph = DependencyGraph::from_edges(&[edge(a, b), edge(b, c)]);

        assert_eq!(graph.all_dependencies(a), [b, c].into_iter().collect());
        assert_eq!(graph.all_dependents(c), [a, b].into_iter().collect());
        assert!(graph.all_dependencies(c).is_empty());
        assert_eq!(graph.direct_dependencies(a), [b].into_iter().collect());
        assert_eq!(graph.direct_dependents(b), [a].into_iter().collect());
    }

    #[test]
    fn duplicate_edges_are_deduplicated() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        // Same component under two anchors in the same host: one dependency.
        let graph = DependencyGraph::from_edges(&[edge(a, b), edge(a, b)]);
        assert_eq!(graph.direct_dependencies(a).len(), 1);
    }

    #[test]
    fn chain_depths() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let edges: Vec<Embed> = ids.windows(2).map(|w| edge(w[0], w[1])).collect();
        let graph = DependencyGraph::from_edges(&edges);

        assert_eq!(graph.depth_below(ids[0]), 4);
        assert_eq!(graph.depth_below(ids[3]), 1);
        assert_eq!(graph.depth_above(ids[3]), 4);
        assert_eq!(graph.depth_above(ids[0]), 1);
    }

    #[test]
    fn diamond_depth_takes_longest_branch() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        // a -> b -> c -> d and a -> d
        let graph = DependencyGraph::from_edges(&[edge(a, b), edge(b, c), edge(c, d), edge(a, d)]);
        assert_eq!(graph.depth_below(a), 4);
        assert_eq!(graph.depth_above(d), 4);
    }
}
