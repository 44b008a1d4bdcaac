//! Mock endpoint definitions.

use crate::path_template::PathTemplate;
use crate::rules::{deserialize_rules, DynamicRule};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// A registered mock endpoint.
///
/// Instances are immutable snapshots; the engine only ever reads them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointDefinition {
    /// Endpoint identifier (assigned by the store when omitted)
    #[serde(default)]
    pub id: u64,

    /// Owning project (set by the store from the enclosing project)
    #[serde(default)]
    pub project_id: u64,

    /// HTTP method, normalized to uppercase
    #[serde(deserialize_with = "deserialize_method")]
    pub method: String,

    /// Path template, e.g. `/users/{id}`
    pub path: PathTemplate,

    /// Response status code
    #[serde(default = "default_status")]
    pub status_code: u16,

    /// Response headers, in declaration order
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub headers: Vec<(String, String)>,

    /// Response body, or the template dynamic rules write into
    #[serde(default = "empty_object")]
    pub response_body: Value,

    /// Whether `dynamic_rules` are applied
    #[serde(default)]
    pub is_dynamic: bool,

    #[serde(default, deserialize_with = "deserialize_rules")]
    pub dynamic_rules: Vec<DynamicRule>,

    /// Artificial latency in milliseconds
    #[serde(default, alias = "delay_ms")]
    pub delay: u64,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_status() -> u16 {
    200
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn deserialize_method<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let method = String::deserialize(deserializer)?;
    Ok(method.trim().to_uppercase())
}

/// Header values may be written as numbers or booleans in YAML; they are
/// stored as their string form.
fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: Option<Map<String, Value>> = Option::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}

impl EndpointDefinition {
    /// Create a static endpoint.
    pub fn new(method: &str, path: &str, response_body: Value) -> Self {
        Self {
            id: 0,
            project_id: 0,
            method: method.trim().to_uppercase(),
            path: PathTemplate::parse(path),
            status_code: default_status(),
            headers: Vec::new(),
            response_body,
            is_dynamic: false,
            dynamic_rules: Vec::new(),
            delay: 0,
            description: None,
        }
    }

    /// Attach dynamic rules and mark the endpoint dynamic.
    pub fn with_rules(mut self, rules: Vec<DynamicRule>) -> Self {
        self.is_dynamic = true;
        self.dynamic_rules = rules;
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay = delay_ms;
        self
    }

    /// Validate the endpoint definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.method.is_empty() {
            anyhow::bail!("Method cannot be empty");
        }
        if !self.path.as_str().starts_with('/') {
            anyhow::bail!("Path must start with '/': {}", self.path);
        }
        let duplicates = self.path.duplicate_params();
        if !duplicates.is_empty() {
            anyhow::bail!(
                "Duplicate path parameters in {}: {}",
                self.path,
                duplicates.join(", ")
            );
        }
        if self.status_code < 100 || self.status_code > 599 {
            anyhow::bail!("Invalid status code: {}", self.status_code);
        }
        Ok(())
    }
}
