//! Mock request handling.
//!
//! Ties project lookup, endpoint resolution, and response synthesis together.

use crate::config::{GlobalSettings, MockServerConfig};
use crate::error::MockError;
use crate::matcher::resolve;
use crate::request::{QueryValue, RequestContext};
use crate::store::{EndpointStore, InMemoryStore, Project, ProjectStore};
use crate::synthesizer::{SynthesizedResponse, Synthesizer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// An incoming mock call, already decomposed by the transport.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    /// Path below the project prefix, always starting with `/`
    pub path: String,
    pub query: HashMap<String, QueryValue>,
    pub body: Value,
}

impl MockRequest {
    pub fn new(method: &str, path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self {
            method: method.to_uppercase(),
            path,
            query: HashMap::new(),
            body: Value::Object(Map::new()),
        }
    }

    pub fn with_query(mut self, query: HashMap<String, QueryValue>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

/// Serves mock requests for all configured projects.
#[derive(Clone)]
pub struct MockService {
    projects: Arc<dyn ProjectStore>,
    endpoints: Arc<dyn EndpointStore>,
    synthesizer: Synthesizer,
    settings: GlobalSettings,
}

impl MockService {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        endpoints: Arc<dyn EndpointStore>,
        settings: GlobalSettings,
    ) -> Self {
        let synthesizer = Synthesizer::new(settings.max_delay_ms);
        Self {
            projects,
            endpoints,
            synthesizer,
            settings,
        }
    }

    /// Create a service backed by an in-memory store of `config`.
    pub fn from_config(config: &MockServerConfig) -> Self {
        let store = Arc::new(InMemoryStore::from_config(config));

        info!(
            projects = config.projects.len(),
            endpoints = config.endpoint_count(),
            max_delay_ms = config.settings.max_delay_ms,
            "Mock service initialized"
        );

        Self::new(store.clone(), store, config.settings.clone())
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    /// Handle a request addressed by project id or name.
    pub async fn handle(
        &self,
        project: &str,
        request: &MockRequest,
    ) -> Result<SynthesizedResponse, MockError> {
        let Some(found) = self.projects.resolve(project).await? else {
            if self.settings.log_unmatched {
                warn!(project = %project, "Project not found");
            }
            return Err(MockError::ProjectNotFound(project.to_string()));
        };
        self.serve(&found, request).await
    }

    /// Handle a request addressed by share token.
    pub async fn handle_shared(
        &self,
        token: &str,
        request: &MockRequest,
    ) -> Result<SynthesizedResponse, MockError> {
        let Some(found) = self.projects.resolve_share_token(token).await? else {
            if self.settings.log_unmatched {
                warn!(path = %request.path, "Shared project not found");
            }
            return Err(MockError::SharedProjectNotFound);
        };
        self.serve(&found, request).await
    }

    async fn serve(
        &self,
        project: &Project,
        request: &MockRequest,
    ) -> Result<SynthesizedResponse, MockError> {
        let candidates = self
            .endpoints
            .list_for_project(project.id, &request.method)
            .await?;

        let Some(matched) = resolve(&candidates, &request.method, &request.path) else {
            if self.settings.log_unmatched {
                warn!(
                    project = %project.name,
                    method = %request.method,
                    path = %request.path,
                    "No matching mock endpoint found"
                );
            }
            return Err(MockError::NoMatchingEndpoint {
                method: request.method.clone(),
                path: request.path.clone(),
            });
        };

        if self.settings.log_matches {
            info!(
                project = %project.name,
                endpoint_id = matched.endpoint.id,
                method = %request.method,
                path = %request.path,
                "Request matched mock endpoint"
            );
        }

        let ctx = RequestContext::new(matched.path_params)
            .with_query(request.query.clone())
            .with_body(request.body.clone());

        Ok(self.synthesizer.synthesize(matched.endpoint, &ctx).await)
    }
}
