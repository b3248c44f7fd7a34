//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::warn;
use trellis_persistence::TreeNode;

/// Order `nodes` so every parent precedes its children.
///
/// Otherwise input order is kept. Parents outside the map are ignored; a
/// parent cycle is broken at the node where it is detected.
pub fn sort_parent_first<T: TreeNode>(nodes: &IndexMap<String, T>) -> Vec<&T> {
    let mut placed: HashSet<&str> = HashSet::with_capacity(nodes.len());
    let mut result = Vec::with_capacity(nodes.len());

    for node in nodes.values() {
        let mut chain: Vec<&T> = Vec::new();
        let mut on_chain: HashSet<&str> = HashSet::new();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if placed.contains(current.id()) {
                break;
            }
            if !on_chain.insert(current.id()) {
                warn!(id = current.id(), "parent cycle detected; ordering as found");
                break;
            }
            chain.push(current);
            cursor = current.parent_id().and_then(|parent| nodes.get(parent));
        }
        for current in chain.into_iter().rev() {
            placed.insert(current.id());
            result.push(current);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_persistence::Memento;

    fn map(nodes: Vec<Memento>) -> IndexMap<String, Memento> {
        nodes.into_iter().map(|node| (node.id.clone(), node)).collect()
    }

    fn ids(sorted: Vec<&Memento>) -> Vec<&str> {
        sorted.into_iter().map(|node| node.id.as_str()).collect()
    }

    #[test]
    fn parents_come_first() {
        let nodes = map(vec![
            Memento::new("grandchild", "t").with_parent("child"),
            Memento::new("other", "t"),
            Memento::new("child", "t").with_parent("root"),
            Memento::new("root", "t"),
        ]);
        assert_eq!(
            ids(sort_parent_first(&nodes)),
            vec!["root", "child", "grandchild", "other"]
        );
    }

    #[test]
    fn missing_parent_and_cycles_terminate() {
        let nodes = map(vec![
            Memento::new("orphan", "t").with_parent("gone"),
            Memento::new("a", "t").with_parent("b"),
            Memento::new("b", "t").with_parent("a"),
        ]);
        let sorted = ids(sort_parent_first(&nodes));
        assert_eq!(sorted.len(), 3);
        assert_eq!(sorted[0], "orphan");
    }
}
