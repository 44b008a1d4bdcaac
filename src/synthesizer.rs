//! Response synthesis.
//!
//! Turns a matched endpoint and the request context into a concrete response,
//! running dynamic rules when the endpoint asks for them and applying its
//! artificial delay.

use crate::endpoint::EndpointDefinition;
use crate::engine::{apply_rules, Entropy, SystemEntropy};
use crate::request::RequestContext;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default upper bound on an endpoint's artificial delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// A response ready for the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedResponse {
    pub body: Value,
    pub headers: Vec<(String, String)>,
    pub status_code: u16,
}

/// Produces responses for matched endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer {
    max_delay_ms: u64,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY_MS)
    }
}

impl Synthesizer {
    pub fn new(max_delay_ms: u64) -> Self {
        Self { max_delay_ms }
    }

    /// Synthesize a response, then wait out the endpoint's (capped) delay.
    ///
    /// The wait only suspends the calling task.
    pub async fn synthesize(
        &self,
        endpoint: &EndpointDefinition,
        ctx: &RequestContext,
    ) -> SynthesizedResponse {
        let response = self.render(endpoint, ctx, &mut SystemEntropy);

        if let Some(delay) = self.effective_delay(endpoint) {
            debug!(
                endpoint_id = endpoint.id,
                delay_ms = delay.as_millis() as u64,
                "Applying delay"
            );
            tokio::time::sleep(delay).await;
        }

        response
    }

    /// Build the response without applying any delay.
    pub fn render(
        &self,
        endpoint: &EndpointDefinition,
        ctx: &RequestContext,
        entropy: &mut dyn Entropy,
    ) -> SynthesizedResponse {
        let body = if endpoint.is_dynamic {
            apply_rules(&endpoint.response_body, &endpoint.dynamic_rules, ctx, entropy)
        } else {
            endpoint.response_body.clone()
        };

        SynthesizedResponse {
            body,
            headers: endpoint.headers.clone(),
            status_code: endpoint.status_code,
        }
    }

    /// The delay to apply for `endpoint`: `min(delay, max_delay_ms)`, or `None`
    /// when the endpoint has no delay.
    pub fn effective_delay(&self, endpoint: &EndpointDefinition) -> Option<Duration> {
        if endpoint.delay == 0 {
            return None;
        }
        Some(Duration::from_millis(endpoint.delay.min(self.max_delay_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SeededEntropy;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Instant;

    fn dynamic_endpoint() -> EndpointDefinition {
        let rules = serde_json::from_value(json!([
            {"type": "request_param", "target": "user.id", "param_name": "id"},
            {"type": "random_number", "target": "user.age", "min": 30, "max": 30}
        ]))
        .unwrap();
        EndpointDefinition::new("GET", "/users/{id}", json!({"user": {"name": "Ada"}}))
            .with_rules(rules)
            .with_status(202)
            .with_header("X-Mock", "1")
    }

    #[test]
    fn test_static_response_passthrough() {
        let mut endpoint = EndpointDefinition::new("GET", "/ok", json!({"ok": true}))
            .with_status(201)
            .with_header("X-Test", "1");
        // Rules are ignored unless the endpoint is dynamic
        endpoint.dynamic_rules = serde_json::from_value(json!([
            {"type": "random_number", "target": "ok", "min": 1, "max": 1}
        ]))
        .unwrap();

        let response = Synthesizer::default().render(
            &endpoint,
            &RequestContext::default(),
            &mut SystemEntropy,
        );
        assert_eq!(
            response,
            SynthesizedResponse {
                body: json!({"ok": true}),
                headers: vec![("X-Test".to_string(), "1".to_string())],
                status_code: 201,
            }
        );
    }

    #[test]
    fn test_dynamic_response() {
        let endpoint = dynamic_endpoint();
        let ctx = RequestContext::new(endpoint.path.matches("/users/9").unwrap());
        let mut entropy = SeededEntropy::new(1, Utc::now());

        let response = Synthesizer::default().render(&endpoint, &ctx, &mut entropy);
        assert_eq!(response.body, json!({"user": {"name": "Ada", "id": "9", "age": 30}}));
        assert_eq!(response.status_code, 202);
        assert_eq!(response.headers, endpoint.headers);
        // Stored template is untouched
        assert_eq!(endpoint.response_body, json!({"user": {"name": "Ada"}}));
    }

    #[test]
    fn test_effective_delay() {
        let synthesizer = Synthesizer::new(1000);
        let endpoint = EndpointDefinition::new("GET", "/", json!({}));

        assert_eq!(synthesizer.effective_delay(&endpoint), None);
        assert_eq!(
            synthesizer.effective_delay(&endpoint.clone().with_delay(200)),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            synthesizer.effective_delay(&endpoint.with_delay(60_000)),
            Some(Duration::from_millis(1000))
        );
    }

    #[tokio::test]
    async fn test_delay_is_capped() {
        let synthesizer = Synthesizer::new(50);
        let endpoint = EndpointDefinition::new("GET", "/slow", json!({"slow": true})).with_delay(5000);

        let start = Instant::now();
        let response = synthesizer.synthesize(&endpoint, &RequestContext::default()).await;
        let elapsed = start.elapsed();

        assert_eq!(response.body, json!({"slow": true}));
        assert!(elapsed >= Duration::from_millis(40), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(5000), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_no_delay_returns_immediately() {
        let synthesizer = Synthesizer::default();
        let endpoint = EndpointDefinition::new("GET", "/fast", json!({}));

        let start = Instant::now();
        synthesizer.synthesize(&endpoint, &RequestContext::default()).await;
        assert!(start.elapsed() < Duration::from_millis(1000));
    }
}
