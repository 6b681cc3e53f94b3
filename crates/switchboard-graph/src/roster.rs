use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use switchboard_core::agent::AgentDescriptor;
use switchboard_core::error::{Result, SwitchboardError};
use switchboard_core::traits::Handler;

use crate::connectivity::{validate, ConnectivityGraph};
use crate::node::AgentNode;

/// A validated set of agents with their handlers and shared connectivity.
///
/// Sessions are created from a roster; each keeps its own copy so agents
/// attached mid-session stay local to that session.
#[derive(Clone)]
pub struct AgentRoster {
    root: String,
    order: Vec<String>,
    nodes: HashMap<String, AgentNode>,
    graph: Arc<ConnectivityGraph>,
}

impl AgentRoster {
    /// Validate `descriptors` and create one handler per agent.
    ///
    /// Nothing is returned unless the whole set is valid.
    pub fn build<F>(descriptors: Vec<AgentDescriptor>, mut factory: F) -> Result<Self>
    where
        F: FnMut(&AgentDescriptor) -> Result<Arc<dyn Handler>>,
    {
        let graph = ConnectivityGraph::build(&descriptors)?;
        let root = graph.root().to_string();

        let mut nodes = HashMap::with_capacity(descriptors.len());
        let mut order = Vec::with_capacity(descriptors.len());
        let mut links = Vec::new();
        for descriptor in descriptors {
            let handler = factory(&descriptor)?;
            if let Some(parent) = &descriptor.parent {
                links.push((parent.clone(), descriptor.name.clone()));
            }
            order.push(descriptor.name.clone());
            nodes.insert(descriptor.name.clone(), AgentNode::new(descriptor, handler));
        }
        for (parent, child) in links {
            if let Some(node) = nodes.get_mut(&parent) {
                node.add_child(child);
            }
        }

        info!(agents = order.len(), root = %root, "Agent roster built");
        Ok(Self {
            root,
            order,
            nodes,
            graph: Arc::new(graph),
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn graph(&self) -> &Arc<ConnectivityGraph> {
        &self.graph
    }

    pub fn get(&self, name: &str) -> Option<&AgentNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Agent names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &AgentNode> {
        self.order.iter().filter_map(|name| self.nodes.get(name))
    }

    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.nodes().map(|n| n.descriptor().clone()).collect()
    }

    /// The node that lists `name` among its children.
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.nodes().find(|n| n.has_child(name)).map(AgentNode::name)
    }

    /// Attach a new agent under `parent`.
    ///
    /// Rule targets may name agents that are attached later; their edges
    /// appear once both ends exist.
    pub fn add_agent(
        &mut self,
        parent: &str,
        descriptor: AgentDescriptor,
        handler: Arc<dyn Handler>,
    ) -> Result<()> {
        if !self.contains(parent) {
            return Err(SwitchboardError::Config(format!(
                "parent agent '{}' not found in graph",
                parent
            )));
        }
        if self.contains(&descriptor.name) {
            return Err(SwitchboardError::Config(format!(
                "agent '{}' is declared more than once",
                descriptor.name
            )));
        }

        let mut descriptor = descriptor;
        descriptor.is_root = false;
        descriptor.parent = Some(parent.to_string());
        let name = descriptor.name.clone();

        let mut all = self.descriptors();
        all.push(descriptor.clone());
        self.graph = Arc::new(ConnectivityGraph::link(self.root.clone(), &all));

        if let Some(node) = self.nodes.get_mut(parent) {
            node.add_child(name.clone());
        }
        self.order.push(name.clone());
        self.nodes.insert(name.clone(), AgentNode::new(descriptor, handler));

        info!(agent = %name, parent = %parent, "Agent attached");
        Ok(())
    }

    /// Re-run full validation over the current agent set.
    pub fn validate(&self) -> Result<()> {
        validate(&self.descriptors()).map(|_| ())
    }
}

impl std::fmt::Debug for AgentRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRoster")
            .field("root", &self.root)
            .field("agents", &self.order)
            .finish()
    }
}
