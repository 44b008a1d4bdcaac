//! Zentinel Mock Projects
//!
//! Project-scoped mock endpoints: register method + path-template endpoints per
//! project and serve arbitrary calls against them with static or rule-driven
//! responses.
//!
//! # Features
//!
//! - **Path Templates**: `/users/{id}` placeholders capture one path segment
//! - **First-Match Resolution**: endpoints are tried in registration order
//! - **Dynamic Rules**: random values, request echoes, and conditionals written
//!   into the response body by dot-path
//! - **Latency Simulation**: per-endpoint delays, capped globally
//! - **Share Tokens**: expose a project's mocks under an opaque token
//!
//! # Example Configuration
//!
//! ```yaml
//! projects:
//!   - id: 1
//!     name: petstore
//!     endpoints:
//!       - method: GET
//!         path: /pets/{id}
//!         is_dynamic: true
//!         response_body:
//!           species: cat
//!         dynamic_rules:
//!           - type: request_param
//!             target: id
//!             param_name: id
//! ```

pub mod accessor;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod path_template;
pub mod request;
pub mod rules;
pub mod server;
pub mod service;
pub mod store;
pub mod synthesizer;

pub use config::MockServerConfig;
pub use endpoint::EndpointDefinition;
pub use error::MockError;
pub use service::{MockRequest, MockService};
pub use synthesizer::{SynthesizedResponse, Synthesizer};
