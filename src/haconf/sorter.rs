//! Dependency sorter for `defaults` sections
//!
//! Input is one `(name, from)` pair per defaults section, with `""` for "no from".
//! The output is the write order: names sorted, then each section moved behind the
//! one it inherits from. The `from` values themselves are never touched.

use std::collections::{HashMap, HashSet};

use crate::haconf::error::{Error, Result};

/// Order defaults sections so every section comes after the one named in its `from`.
///
/// Fails with [`Error::FromDefaultsSectionMissing`] when a `from` names no section
/// and with [`Error::CircularDependency`] when following `from` edges revisits a
/// section (a section inheriting from itself included).
pub fn sort(nodes: &[(String, String)]) -> Result<Vec<String>> {
    let edges: HashMap<&str, &str> = nodes
        .iter()
        .map(|(name, from)| (name.as_str(), from.as_str()))
        .collect();

    for (name, from) in nodes {
        if !from.is_empty() && !edges.contains_key(from.as_str()) {
            return Err(Error::FromDefaultsSectionMissing(format!(
                "{from} (used by {name})"
            )));
        }
    }

    for (name, _) in nodes {
        let mut seen = HashSet::new();
        let mut current = name.as_str();
        loop {
            if !seen.insert(current) {
                return Err(Error::CircularDependency(name.clone()));
            }
            match edges.get(current) {
                Some(from) if !from.is_empty() => current = *from,
                _ => break,
            }
        }
    }

    let mut order: Vec<&str> = edges.keys().copied().collect();
    order.sort_unstable();

    // Terminates because the graph is acyclic: every move puts a node behind its parent
    'scan: loop {
        for index in 0..order.len() {
            let from = edges[order[index]];
            if from.is_empty() {
                continue;
            }
            let Some(target) = order.iter().position(|name| *name == from) else {
                continue;
            };
            if target > index {
                let node = order.remove(index);
                order.insert(target, node);
                continue 'scan;
            }
        }
        break;
    }

    Ok(order.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(name, from)| (name.to_string(), from.to_string()))
            .collect()
    }

    #[test]
    fn test_moves_node_after_its_parent() {
        let order = sort(&nodes(&[("0", "3"), ("1", ""), ("2", ""), ("3", "")])).unwrap();
        assert_eq!(order, vec!["1", "2", "3", "0"]);
    }

    #[test]
    fn test_two_node_cycle() {
        let result = sort(&nodes(&[("0", "1"), ("1", "0")]));
        assert!(matches!(result, Err(Error::CircularDependency(_))));
    }

    #[test]
    fn test_self_reference() {
        let result = sort(&nodes(&[("a", "a")]));
        assert!(matches!(result, Err(Error::CircularDependency(name)) if name == "a"));
    }

    #[test]
    fn test_missing_parent() {
        let result = sort(&nodes(&[("a", "ghost"), ("b", "")]));
        assert!(matches!(result, Err(Error::FromDefaultsSectionMissing(_))));
    }

    #[test]
    fn test_chain() {
        let order = sort(&nodes(&[("a", "b"), ("b", "c"), ("c", "")])).unwrap();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_independent_nodes_stay_sorted() {
        let order = sort(&nodes(&[("b", ""), ("a", ""), ("c", "")])).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(sort(&[]).unwrap().is_empty());
    }
}
