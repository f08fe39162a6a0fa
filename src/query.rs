//! Inbound query model.
//!
//! A [`Query`] is what the transport layer hands to the core. Its context is
//! an open key/value map; the keys the core actually reads are typed fields
//! on [`QueryContext`], everything else is kept verbatim in `extra` and only
//! ever rendered into prompts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context key carrying an explicit routing override.
pub const ROUTE_OVERRIDE_KEY: &str = "route_override";

/// Scalar context value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// Boolean flag
    Flag(bool),
    /// Numeric value
    Number(f64),
    /// Free text
    Text(String),
}

impl std::fmt::Display for ContextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextValue::Flag(b) => write!(f, "{}", b),
            ContextValue::Number(n) => write!(f, "{}", n),
            ContextValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl ContextValue {
    /// Parse a raw scalar: booleans and numbers are typed, anything else is text.
    pub fn parse_scalar(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(flag) = trimmed.parse::<bool>() {
            ContextValue::Flag(flag)
        } else if let Ok(number) = trimmed.parse::<f64>() {
            ContextValue::Number(number)
        } else {
            ContextValue::Text(raw.to_string())
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Text(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Number(value)
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Flag(value)
    }
}

/// Caller-supplied context with recognized-but-optional keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Explicit routing target, honored unconditionally by the router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_override: Option<String>,
    /// Caller's role (e.g. "compliance officer").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Company size band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,
    /// Industry or sector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Requested analysis type for the standard responder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<String>,
    /// Unrecognized keys, passed through to prompts only.
    #[serde(flatten)]
    pub extra: BTreeMap<String, ContextValue>,
}

impl QueryContext {
    /// Build a context from an untyped map, lifting the recognized keys.
    pub fn from_map(map: BTreeMap<String, ContextValue>) -> Self {
        let mut context = Self::default();
        for (key, value) in map {
            context = context.with(key, value);
        }
        context
    }

    /// Set a key, routing recognized keys into their typed fields.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            ROUTE_OVERRIDE_KEY => self.route_override = Some(value.to_string()),
            "role" => self.role = Some(value.to_string()),
            "company_size" => self.company_size = Some(value.to_string()),
            "industry" => self.industry = Some(value.to_string()),
            "analysis_type" => self.analysis_type = Some(value.to_string()),
            _ => {
                self.extra.insert(key, value);
            }
        }
        self
    }

    /// Whether no context was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.company_size.is_none()
            && self.industry.is_none()
            && self.analysis_type.is_none()
            && self.route_override.is_none()
            && self.extra.is_empty()
    }

    /// Render the context as prompt lines. The routing override is a
    /// dispatch concern and never reaches the model.
    pub fn prompt_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(role) = &self.role {
            lines.push(format!("Role: {}", role));
        }
        if let Some(size) = &self.company_size {
            lines.push(format!("Company size: {}", size));
        }
        if let Some(industry) = &self.industry {
            lines.push(format!("Industry: {}", industry));
        }
        for (key, value) in &self.extra {
            lines.push(format!("{}: {}", key, value));
        }
        lines
    }

    /// Render the context as a prompt block, empty when there is nothing to say.
    pub fn prompt_block(&self) -> String {
        let lines = self.prompt_lines();
        if lines.is_empty() {
            String::new()
        } else {
            format!("Context:\n- {}\n\n", lines.join("\n- "))
        }
    }
}

/// Immutable inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Correlation identifier.
    pub session_id: String,
    /// The user's message.
    pub text: String,
    /// Open context map.
    #[serde(default)]
    pub context: QueryContext,
    /// Caller classification tag.
    #[serde(default = "default_profile")]
    pub profile: String,
}

fn default_profile() -> String {
    "default".to_string()
}

impl Query {
    /// Create a query with a fresh session ID and empty context.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            text: text.into(),
            context: QueryContext::default(),
            profile: default_profile(),
        }
    }

    /// Set the session ID
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Set the context
    pub fn with_context(mut self, context: QueryContext) -> Self {
        self.context = context;
        self
    }

    /// Set the caller profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Rate-limit identity for this caller.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.profile, self.session_id)
    }

    /// Whether the message has any content.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
