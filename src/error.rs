//! Error types for mock resolution.

use thiserror::Error;

/// Failures surfaced when serving a mock request.
///
/// The not-found variants are ordinary outcomes that the transport maps to a
/// 404 response; only [`MockError::Store`] reflects a broken collaborator.
#[derive(Debug, Error)]
pub enum MockError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Shared project not found")]
    SharedProjectNotFound,

    #[error("No matching mock endpoint found")]
    NoMatchingEndpoint { method: String, path: String },

    #[error("Store error: {0}")]
    Store(String),
}

impl MockError {
    /// Whether this error should be reported as "not found".
    pub fn is_not_found(&self) -> bool {
        !matches!(self, MockError::Store(_))
    }

    /// HTTP status the transport should use.
    pub fn status_code(&self) -> u16 {
        if self.is_not_found() {
            404
        } else {
            500
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(MockError::ProjectNotFound("x".into()).status_code(), 404);
        assert_eq!(MockError::SharedProjectNotFound.status_code(), 404);
        assert_eq!(
            MockError::NoMatchingEndpoint {
                method: "GET".into(),
                path: "/".into()
            }
            .status_code(),
            404
        );
        assert_eq!(MockError::Store("down".into()).status_code(), 500);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            MockError::ProjectNotFound("petstore".into()).to_string(),
            "Project not found: petstore"
        );
        assert_eq!(
            MockError::NoMatchingEndpoint {
                method: "GET".into(),
                path: "/x".into()
            }
            .to_string(),
            "No matching mock endpoint found"
        );
    }
}
