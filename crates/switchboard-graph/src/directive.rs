//! Parsing of `TRANSITION_TO:` directives out of handler output.

/// Marker a handler writes to request a transition.
pub const TRANSITION_MARKER: &str = "TRANSITION_TO:";

/// Separator between hops in a multi-step directive.
pub const PATH_SEPARATOR: &str = "->";

/// A parsed routing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `TRANSITION_TO:agent`
    Single(String),
    /// `TRANSITION_TO:a->b->c`, at least one hop.
    Path(Vec<String>),
}

impl Directive {
    /// Extract the first directive from `text`.
    ///
    /// The target runs from the marker to the next line break. Names are
    /// lowercased and `department` suffixes rewritten to `_agent`.
    pub fn parse(text: &str) -> Option<Self> {
        let (_, rest) = text.split_once(TRANSITION_MARKER)?;
        let raw = rest.split('\n').next().unwrap_or_default().trim();
        let target = normalize_agent_name(raw);
        if target.is_empty() {
            return None;
        }

        if target.contains(PATH_SEPARATOR) {
            let hops: Vec<String> = target
                .split(PATH_SEPARATOR)
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
                .map(str::to_string)
                .collect();
            if hops.is_empty() {
                return None;
            }
            Some(Self::Path(hops))
        } else {
            Some(Self::Single(target))
        }
    }

    /// The agent this directive moves to first.
    pub fn first_target(&self) -> &str {
        match self {
            Self::Single(name) => name,
            Self::Path(hops) => hops.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// Whether this directive only names the agent that issued it.
    pub fn targets_self(&self, current: &str) -> bool {
        matches!(self, Self::Single(name) if name == current)
    }
}

/// Lowercase a target and map legacy `*_department` names to `*_agent`.
pub fn normalize_agent_name(raw: &str) -> String {
    raw.to_lowercase()
        .replace("_department", "_agent")
        .replace("department", "_agent")
}

/// Handler output paired with the directive it carries, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub text: String,
    pub directive: Option<Directive>,
}

impl AgentReply {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let directive = Directive::parse(&text);
        Self { text, directive }
    }
}
