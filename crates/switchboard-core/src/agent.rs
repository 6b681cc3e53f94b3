use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SwitchboardError};

/// Static definition of one agent, as read from configuration.
///
/// Field aliases accept the `agent_*` names used by JSON agent files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    #[serde(alias = "agent_name")]
    pub name: String,
    #[serde(default, alias = "agent_system_prompt")]
    pub system_prompt: String,
    #[serde(default, alias = "agent_tool_prompt")]
    pub tool_prompt: String,
    /// Tool declarations, passed through to the backend untouched.
    #[serde(default, alias = "agent_tools")]
    pub tools: Vec<serde_json::Value>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default, alias = "parent_agent")]
    pub parent: Option<String>,
    #[serde(default)]
    pub transition_rules: TransitionRules,
}

fn default_temperature() -> f32 {
    0.3
}

impl AgentDescriptor {
    /// Create a descriptor with defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: String::new(),
            tool_prompt: String::new(),
            tools: vec![],
            temperature: default_temperature(),
            is_root: false,
            parent: None,
            transition_rules: TransitionRules::default(),
        }
    }

    /// Mark this descriptor as the root agent.
    pub fn root(mut self) -> Self {
        self.is_root = true;
        self.parent = None;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Append a transition rule (intent keyword → target agent).
    pub fn with_rule(mut self, intent: impl Into<String>, target: impl Into<String>) -> Self {
        self.transition_rules.push(intent, target);
        self
    }

    /// Names of tools declared in OpenAI function format.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .filter_map(|t| t.get("function")?.get("name")?.as_str())
            .map(str::to_string)
            .collect()
    }
}

/// One intent keyword → target agent mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub intent: String,
    pub target: String,
}

/// Ordered transition rules.
///
/// Declaration order matters: the first matching rule wins. Deserializes
/// from a map (entries kept in document order) or from an array of
/// `{ intent, target }` tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionRules(Vec<TransitionRule>);

impl TransitionRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. A repeated intent replaces the earlier target in place.
    pub fn push(&mut self, intent: impl Into<String>, target: impl Into<String>) {
        let intent = intent.into();
        let target = target.into();
        if let Some(rule) = self.0.iter_mut().find(|r| r.intent == intent) {
            rule.target = target;
        } else {
            self.0.push(TransitionRule { intent, target });
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitionRule> {
        self.0.iter()
    }

    /// Target agent names in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|r| r.target.as_str())
    }

    pub fn get(&self, intent: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|r| r.intent == intent)
            .map(|r| r.target.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<I: Into<String>, T: Into<String>> FromIterator<(I, T)> for TransitionRules {
    fn from_iter<It: IntoIterator<Item = (I, T)>>(iter: It) -> Self {
        let mut rules = Self::new();
        for (intent, target) in iter {
            rules.push(intent, target);
        }
        rules
    }
}

impl Serialize for TransitionRules {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for rule in &self.0 {
            map.serialize_entry(&rule.intent, &rule.target)?;
        }
        map.end()
    }
}

struct RulesVisitor;

impl<'de> Visitor<'de> for RulesVisitor {
    type Value = TransitionRules;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of intent to agent name, or a list of {intent, target}")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut rules = TransitionRules::new();
        while let Some((intent, target)) = access.next_entry::<String, String>()? {
            rules.push(intent, target);
        }
        Ok(rules)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut rules = TransitionRules::new();
        while let Some(rule) = access.next_element::<TransitionRule>()? {
            rules.push(rule.intent, rule.target);
        }
        Ok(rules)
    }
}

impl<'de> Deserialize<'de> for TransitionRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(RulesVisitor)
    }
}

/// The JSON agent file: `{ "agents": [ ... ] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsFile {
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
}

impl AgentsFile {
    /// Load agent descriptors from a JSON file.
    pub fn load(path: &Path) -> Result<Vec<AgentDescriptor>> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| SwitchboardError::ConfigNotFound(path.display().to_string()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Vec<AgentDescriptor>> {
        let file: AgentsFile = serde_json::from_str(content)
            .map_err(|e| SwitchboardError::Config(format!("invalid agents file: {}", e)))?;
        Ok(file.agents)
    }
}
