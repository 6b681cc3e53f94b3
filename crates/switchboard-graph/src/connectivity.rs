use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use tracing::debug;

use switchboard_core::agent::AgentDescriptor;
use switchboard_core::error::{Result, SwitchboardError};

/// Undirected adjacency over agent names.
///
/// Edges come from transition rules (a rule `a → b` links both ways) and
/// from parent/child links. Immutable once built, so one instance can be
/// shared by every session created from the same roster.
#[derive(Debug, Clone)]
pub struct ConnectivityGraph {
    root: String,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl ConnectivityGraph {
    /// Validate a full descriptor set and build its graph.
    ///
    /// Fails with `Config` when there is not exactly one root, a name is
    /// declared twice, a non-root agent has no parent, or a parent or rule
    /// target names an agent that does not exist.
    pub fn build(descriptors: &[AgentDescriptor]) -> Result<Self> {
        let root = validate(descriptors)?;
        Ok(Self::link(root, descriptors))
    }

    /// Build without checking that rule targets resolve.
    ///
    /// Used when agents are attached one at a time: a rule may point at an
    /// agent that has not been added yet, and its edge appears once it is.
    pub(crate) fn link(root: impl Into<String>, descriptors: &[AgentDescriptor]) -> Self {
        let mut adjacency: BTreeMap<String, BTreeSet<String>> = descriptors
            .iter()
            .map(|d| (d.name.clone(), BTreeSet::new()))
            .collect();

        let mut connect = |a: &str, b: &str| {
            if a == b || !adjacency.contains_key(a) || !adjacency.contains_key(b) {
                return;
            }
            if let Some(set) = adjacency.get_mut(a) {
                set.insert(b.to_string());
            }
            if let Some(set) = adjacency.get_mut(b) {
                set.insert(a.to_string());
            }
        };

        for d in descriptors {
            for target in d.transition_rules.targets() {
                connect(&d.name, target);
            }
            if let Some(parent) = &d.parent {
                connect(&d.name, parent);
            }
        }

        let graph = Self {
            root: root.into(),
            adjacency,
        };
        debug!(agents = graph.len(), edges = graph.edge_count(), "Built connectivity graph");
        graph
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adjacency.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Agent names in sorted order.
    pub fn agent_names(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Direct neighbours of `name`; empty for an unknown agent.
    pub fn neighbors(&self, name: &str) -> BTreeSet<String> {
        self.adjacency.get(name).cloned().unwrap_or_default()
    }

    /// Breadth-first shortest path, endpoints included.
    ///
    /// `[from]` when `from == to`; `None` when either end is unknown or the
    /// two are disconnected. Among equal-length paths, which one is returned
    /// is unspecified.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        if from == to {
            return Some(vec![from.to_string()]);
        }

        let mut came_from: HashMap<&str, &str> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::from([from]);
        let mut queue: VecDeque<&str> = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            for next in self.adjacency.get(current).into_iter().flatten() {
                if !visited.insert(next.as_str()) {
                    continue;
                }
                came_from.insert(next.as_str(), current);
                if next == to {
                    let mut path = vec![to.to_string()];
                    let mut cursor = to;
                    while let Some(&prev) = came_from.get(cursor) {
                        path.push(prev.to_string());
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next.as_str());
            }
        }

        None
    }

    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        self.shortest_path(from, to).is_some()
    }

    /// Human-readable rendering of a path.
    pub fn describe_path(path: &[String]) -> String {
        match path {
            [] => "No path".to_string(),
            [only] => format!("Already at {}", only),
            _ => path.join(" → "),
        }
    }
}

/// Check the structural invariants of a descriptor set; returns the root name.
pub(crate) fn validate(descriptors: &[AgentDescriptor]) -> Result<String> {
    if descriptors.is_empty() {
        return Err(SwitchboardError::Config("no agents configured".into()));
    }

    let mut names = HashSet::new();
    for d in descriptors {
        if d.name.trim().is_empty() {
            return Err(SwitchboardError::Config("agent with an empty name".into()));
        }
        if !names.insert(d.name.as_str()) {
            return Err(SwitchboardError::Config(format!(
                "agent '{}' is declared more than once",
                d.name
            )));
        }
    }

    let roots: Vec<&str> = descriptors
        .iter()
        .filter(|d| d.is_root)
        .map(|d| d.name.as_str())
        .collect();
    let root = match roots.as_slice() {
        [root] => root.to_string(),
        [] => return Err(SwitchboardError::Config("no root agent declared".into())),
        many => {
            return Err(SwitchboardError::Config(format!(
                "multiple root agents declared: {}",
                many.join(", ")
            )))
        }
    };

    for d in descriptors {
        match (&d.parent, d.is_root) {
            (Some(parent), _) if !names.contains(parent.as_str()) => {
                return Err(SwitchboardError::Config(format!(
                    "agent '{}' names unknown parent '{}'",
                    d.name, parent
                )));
            }
            (Some(_), true) => {
                return Err(SwitchboardError::Config(format!(
                    "root agent '{}' cannot have a parent",
                    d.name
                )));
            }
            (None, false) => {
                return Err(SwitchboardError::Config(format!(
                    "agent '{}' has no parent",
                    d.name
                )));
            }
            _ => {}
        }

        for rule in d.transition_rules.iter() {
            if !names.contains(rule.target.as_str()) {
                return Err(SwitchboardError::Config(format!(
                    "agent '{}' rule '{}' targets unknown agent '{}'",
                    d.name, rule.intent, rule.target
                )));
            }
        }
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<AgentDescriptor> {
        vec![
            AgentDescriptor::new("reception_agent").root().with_rule("booking", "booking_agent"),
            AgentDescriptor::new("booking_agent").with_parent("reception_agent"),
            AgentDescriptor::new("scheduler_agent").with_parent("booking_agent"),
            AgentDescriptor::new("hr_agent").with_parent("reception_agent"),
        ]
    }

    #[test]
    fn test_build_and_neighbors() {
        let g = ConnectivityGraph::build(&chain()).unwrap();
        assert_eq!(g.root(), "reception_agent");
        assert_eq!(g.len(), 4);
        let n = g.neighbors("reception_agent");
        assert!(n.contains("booking_agent"));
        assert!(n.contains("hr_agent"));
        assert!(g.neighbors("scheduler_agent").contains("booking_agent"));
        assert!(g.neighbors("nobody").is_empty());
    }

    #[test]
    fn test_shortest_path_distances() {
        let g = ConnectivityGraph::build(&chain()).unwrap();
        assert_eq!(g.shortest_path("hr_agent", "hr_agent").unwrap(), vec!["hr_agent"]);
        assert_eq!(
            g.shortest_path("reception_agent", "booking_agent").unwrap(),
            vec!["reception_agent", "booking_agent"]
        );
        assert_eq!(
            g.shortest_path("hr_agent", "scheduler_agent").unwrap(),
            vec!["hr_agent", "reception_agent", "booking_agent", "scheduler_agent"]
        );
        assert!(g.shortest_path("hr_agent", "ghost").is_none());
        assert!(g.is_reachable("scheduler_agent", "hr_agent"));
    }

    #[test]
    fn test_rule_edge_is_bidirectional() {
        let agents = vec![
            AgentDescriptor::new("a").root(),
            AgentDescriptor::new("b").with_parent("a"),
            AgentDescriptor::new("c").with_parent("a").with_rule("x", "b"),
        ];
        let g = ConnectivityGraph::build(&agents).unwrap();
        assert_eq!(g.shortest_path("b", "c").unwrap().len(), 2);
    }

    #[test]
    fn test_unreachable_pair() {
        let agents = vec![
            AgentDescriptor::new("a").root(),
            AgentDescriptor::new("b").with_parent("a"),
        ];
        let mut g = ConnectivityGraph::build(&agents).unwrap();
        g.adjacency.insert("island".into(), BTreeSet::new());
        assert!(g.shortest_path("a", "island").is_none());
        assert!(!g.is_reachable("island", "b"));
    }

    #[test]
    fn test_root_count_errors() {
        let none = vec![AgentDescriptor::new("a").with_parent("b"), AgentDescriptor::new("b").with_parent("a")];
        let err = ConnectivityGraph::build(&none).unwrap_err();
        assert!(matches!(err, SwitchboardError::Config(_)));

        let two = vec![AgentDescriptor::new("a").root(), AgentDescriptor::new("b").root()];
        let err = ConnectivityGraph::build(&two).unwrap_err();
        assert!(err.to_string().contains("multiple root"));
    }

    #[test]
    fn test_unresolvable_references() {
        let bad_parent = vec![
            AgentDescriptor::new("a").root(),
            AgentDescriptor::new("b").with_parent("ghost"),
        ];
        assert!(matches!(
            ConnectivityGraph::build(&bad_parent),
            Err(SwitchboardError::Config(_))
        ));

        let bad_rule = vec![AgentDescriptor::new("a").root().with_rule("faq", "faq_agent")];
        let err = ConnectivityGraph::build(&bad_rule).unwrap_err();
        assert!(err.to_string().contains("faq_agent"));

        let orphan = vec![AgentDescriptor::new("a").root(), AgentDescriptor::new("b")];
        assert!(ConnectivityGraph::build(&orphan).is_err());

        let dup = vec![AgentDescriptor::new("a").root(), AgentDescriptor::new("a").with_parent("a")];
        assert!(ConnectivityGraph::build(&dup).unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn test_describe_path() {
        assert_eq!(ConnectivityGraph::describe_path(&[]), "No path");
        assert_eq!(
            ConnectivityGraph::describe_path(&["a".to_string()]),
            "Already at a"
        );
        assert_eq!(
            ConnectivityGraph::describe_path(&["a".to_string(), "b".to_string()]),
            "a → b"
        );
    }
}
