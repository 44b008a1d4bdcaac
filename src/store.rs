//! Project and endpoint storage.
//!
//! The engine only consumes loaded definitions; these traits describe how the
//! service obtains them. [`InMemoryStore`] serves a validated configuration.

use crate::config::{generate_share_token, MockServerConfig};
use crate::endpoint::EndpointDefinition;
use crate::error::MockError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A project as seen by the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub share_token: String,
}

/// Project lookup.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Resolve a project by numeric id or, failing that, by name.
    async fn resolve(&self, identifier: &str) -> Result<Option<Project>, MockError>;

    /// Resolve a project by its share token.
    async fn resolve_share_token(&self, token: &str) -> Result<Option<Project>, MockError>;
}

/// Endpoint lookup.
#[async_trait]
pub trait EndpointStore: Send + Sync {
    /// Endpoints of a project with the given method, in registration order.
    async fn list_for_project(
        &self,
        project_id: u64,
        method: &str,
    ) -> Result<Vec<EndpointDefinition>, MockError>;
}

#[derive(Debug, Default)]
struct Snapshot {
    projects: Vec<Project>,
    endpoints: HashMap<u64, Vec<EndpointDefinition>>,
}

/// Read-only store built from configuration.
///
/// Cloning is cheap; all clones share one immutable snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Snapshot>,
}

impl InMemoryStore {
    /// Build a store from a configuration.
    ///
    /// Each endpoint's `project_id` is set from its enclosing project and
    /// endpoints without an id are numbered sequentially.
    pub fn from_config(config: &MockServerConfig) -> Self {
        let mut snapshot = Snapshot::default();
        let mut next_id = config
            .projects
            .iter()
            .flat_map(|p| p.endpoints.iter().map(|e| e.id))
            .max()
            .unwrap_or(0)
            + 1;

        for definition in &config.projects {
            snapshot.projects.push(Project {
                id: definition.id,
                name: definition.name.clone(),
                description: definition.description.clone(),
                is_public: definition.is_public,
                share_token: definition
                    .share_token
                    .clone()
                    .unwrap_or_else(generate_share_token),
            });

            let endpoints = definition
                .endpoints
                .iter()
                .cloned()
                .map(|mut endpoint| {
                    endpoint.project_id = definition.id;
                    if endpoint.id == 0 {
                        endpoint.id = next_id;
                        next_id += 1;
                    }
                    endpoint
                })
                .collect();
            snapshot.endpoints.insert(definition.id, endpoints);
        }

        Self {
            inner: Arc::new(snapshot),
        }
    }

    /// All endpoints of a project regardless of method.
    pub fn endpoints(&self, project_id: u64) -> &[EndpointDefinition] {
        self.inner
            .endpoints
            .get(&project_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn resolve(&self, identifier: &str) -> Result<Option<Project>, MockError> {
        let by_id = identifier.parse::<u64>().ok();
        let project = self.inner.projects.iter().find(|p| match by_id {
            Some(id) => p.id == id,
            None => p.name == identifier,
        });
        Ok(project.cloned())
    }

    async fn resolve_share_token(&self, token: &str) -> Result<Option<Project>, MockError> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self
            .inner
            .projects
            .iter()
            .find(|p| p.share_token == token)
            .cloned())
    }
}

#[async_trait]
impl EndpointStore for InMemoryStore {
    async fn list_for_project(
        &self,
        project_id: u64,
        method: &str,
    ) -> Result<Vec<EndpointDefinition>, MockError> {
        let method = method.to_uppercase();
        Ok(self
            .endpoints(project_id)
            .iter()
            .filter(|e| e.method == method)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryStore {
        let yaml = r#"
projects:
  - id: 7
    name: petstore
    share_token: pet-token
    endpoints:
      - method: GET
        path: /pets
      - id: 40
        method: POST
        path: /pets
      - method: get
        path: /pets/{id}
  - id: 8
    name: billing
    endpoints:
      - method: GET
        path: /invoices
"#;
        InMemoryStore::from_config(&MockServerConfig::from_yaml(yaml).unwrap())
    }

    #[tokio::test]
    async fn test_resolve_by_id_and_name() {
        let store = store();
        assert_eq!(store.resolve("7").await.unwrap().unwrap().name, "petstore");
        assert_eq!(store.resolve("billing").await.unwrap().unwrap().id, 8);
        assert!(store.resolve("9").await.unwrap().is_none());
        assert!(store.resolve("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_share_token() {
        let store = store();
        assert_eq!(
            store.resolve_share_token("pet-token").await.unwrap().unwrap().id,
            7
        );
        assert!(store.resolve_share_token("").await.unwrap().is_none());
        assert!(store.resolve_share_token("nope").await.unwrap().is_none());

        // Generated tokens are unique per project
        let billing = store.resolve("billing").await.unwrap().unwrap();
        assert_eq!(billing.share_token.len(), 36);
        assert_eq!(
            store
                .resolve_share_token(&billing.share_token)
                .await
                .unwrap()
                .unwrap()
                .id,
            8
        );
    }

    #[tokio::test]
    async fn test_list_for_project_keeps_order() {
        let store = store();
        let endpoints = store.list_for_project(7, "get").await.unwrap();
        let paths: Vec<_> = endpoints.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/pets", "/pets/{id}"]);
        assert!(endpoints.iter().all(|e| e.project_id == 7));

        assert!(store.list_for_project(8, "POST").await.unwrap().is_empty());
        assert!(store.list_for_project(99, "GET").await.unwrap().is_empty());
    }

    #[test]
    fn test_endpoint_ids_are_assigned() {
        let store = store();
        let ids: Vec<_> = store.endpoints(7).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![41, 40, 42]);
        assert_eq!(store.endpoints(8)[0].id, 43);
    }

    #[test]
    fn test_clones_share_snapshot() {
        let store = store();
        let clone = store.clone();
        assert!(Arc::ptr_eq(&store.inner, &clone.inner));
    }

    #[test]
    fn test_blocking_lookup() {
        let store = store();
        let project = tokio_test::block_on(store.resolve("petstore")).unwrap();
        assert_eq!(project.map(|p| p.id), Some(7));
    }
}
