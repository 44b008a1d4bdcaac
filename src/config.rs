//! Configuration for the mock project server.
//!
//! Defines projects, their mock endpoints, and global settings.

use crate::endpoint::EndpointDefinition;
use crate::synthesizer::DEFAULT_MAX_DELAY_MS;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Main configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MockServerConfig {
    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,

    /// Projects and their endpoints
    #[serde(default)]
    pub projects: Vec<ProjectDefinition>,
}

impl MockServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without validating it.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Total number of endpoints across all projects.
    pub fn endpoint_count(&self) -> usize {
        self.projects.iter().map(|p| p.endpoints.len()).sum()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        let mut tokens = HashSet::new();

        for project in &self.projects {
            project
                .validate()
                .map_err(|e| anyhow::anyhow!("Project {}: {}", project.name, e))?;

            if !ids.insert(project.id) {
                anyhow::bail!("Duplicate project id: {}", project.id);
            }
            if !names.insert(project.name.as_str()) {
                anyhow::bail!("Duplicate project name: {}", project.name);
            }
            if let Some(token) = &project.share_token {
                if !tokens.insert(token.as_str()) {
                    anyhow::bail!("Duplicate share token in project {}", project.name);
                }
            }
        }
        Ok(())
    }
}

/// A project grouping mock endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDefinition {
    /// Numeric identifier, addressable as `/mock/{id}/...`
    pub id: u64,

    /// Project slug, addressable as `/mock/{name}/...`
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub is_public: bool,

    /// Token for `/share/{token}/...`; generated when omitted
    #[serde(default)]
    pub share_token: Option<String>,

    /// Endpoints in registration order
    #[serde(default)]
    pub endpoints: Vec<EndpointDefinition>,
}

impl ProjectDefinition {
    /// Validate the project and its endpoints.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Project name cannot be empty");
        }
        // Numeric identifiers are resolved as ids
        if self.name.parse::<u64>().is_ok() {
            anyhow::bail!("Project name cannot be numeric");
        }
        if self.name.contains('/') {
            anyhow::bail!("Project name cannot contain '/'");
        }
        if matches!(&self.share_token, Some(token) if token.is_empty()) {
            anyhow::bail!("Share token cannot be empty");
        }
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            endpoint
                .validate()
                .map_err(|e| anyhow::anyhow!("Endpoint {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// Global settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Upper bound on any endpoint delay (ms)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Log all matched endpoints
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched requests
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Content type applied when an endpoint sets none
    #[serde(default = "default_content_type")]
    pub default_content_type: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            max_delay_ms: default_max_delay_ms(),
            log_matches: true,
            log_unmatched: true,
            default_content_type: default_content_type(),
        }
    }
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

fn default_true() -> bool {
    true
}

fn default_content_type() -> String {
    "application/json".to_string()
}

/// Generate a random v4-style UUID for use as a share token.
pub fn generate_share_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        rng.gen::<u32>(),
        rng.gen::<u16>(),
        rng.gen::<u16>() & 0x0fff,
        (rng.gen::<u16>() & 0x3fff) | 0x8000,
        rng.gen::<u64>() & 0xffff_ffff_ffff,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
settings:
  max_delay_ms: 2000
projects:
  - id: 1
    name: petstore
    share_token: 11111111-2222-4333-8444-555555555555
    endpoints:
      - method: GET
        path: /pets
        response_body:
          pets: []
      - method: GET
        path: /pets/{id}
        is_dynamic: true
        dynamic_rules:
          - type: request_param
            target: id
            param_name: id
  - id: 2
    name: billing
"#;

    #[test]
    fn test_parse_config() {
        let config = MockServerConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.settings.max_delay_ms, 2000);
        assert!(config.settings.log_matches);
        assert_eq!(config.settings.default_content_type, "application/json");
        assert_eq!(config.projects.len(), 2);
        assert_eq!(config.endpoint_count(), 2);
        assert!(config.projects[1].share_token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bundled_default_config_is_valid() {
        let config =
            MockServerConfig::from_yaml(include_str!("../config/default-config.yaml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint_count(), 3);
        assert_eq!(config.projects[0].endpoints[1].dynamic_rules.len(), 6);
    }

    #[test]
    fn test_defaults() {
        let config = MockServerConfig::from_yaml("{}").unwrap();
        assert_eq!(config.settings.max_delay_ms, 5000);
        assert!(config.projects.is_empty());
    }

    #[test]
    fn test_unknown_settings_are_rejected() {
        assert!(MockServerConfig::from_yaml("settings:\n  max_delay: 10\n").is_err());
    }

    #[test]
    fn test_duplicate_projects_rejected() {
        let yaml = r#"
projects:
  - id: 1
    name: a
  - id: 1
    name: b
"#;
        let config = MockServerConfig::from_yaml(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate project id"));

        let yaml = r#"
projects:
  - id: 1
    name: a
  - id: 2
    name: a
"#;
        let config = MockServerConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_project_names() {
        for name in ["\"\"", "\"42\"", "a/b"] {
            let yaml = format!("projects:\n  - id: 1\n    name: {name}\n");
            let config = MockServerConfig::from_yaml(&yaml).unwrap();
            assert!(config.validate().is_err(), "name {name} should be rejected");
        }
    }

    #[test]
    fn test_invalid_endpoint_reports_context() {
        let yaml = r#"
projects:
  - id: 1
    name: petstore
    endpoints:
      - method: GET
        path: /ok
      - method: GET
        path: /bad
        status_code: 999
"#;
        let config = MockServerConfig::from_yaml(yaml).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("petstore"));
        assert!(err.contains("Endpoint 1"));
        assert!(err.contains("999"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = MockServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.projects[0].name, "petstore");
    }

    #[test]
    fn test_from_missing_file() {
        assert!(MockServerConfig::from_file(Path::new("/nonexistent/mock.yaml")).is_err());
    }

    #[test]
    fn test_generate_share_token() {
        let token = generate_share_token();
        assert_eq!(token.len(), 36);
        assert_eq!(token.chars().nth(14), Some('4'));
        assert_ne!(token, generate_share_token());
    }
}
