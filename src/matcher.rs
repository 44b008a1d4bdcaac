//! Endpoint resolution.
//!
//! Matches an incoming (method, path) pair against the endpoints registered for
//! a project.

use crate::endpoint::EndpointDefinition;
use crate::request::PathParams;

/// Result of resolving a request against a project's endpoints.
#[derive(Debug)]
pub struct ResolvedMatch<'a> {
    /// The matched endpoint
    pub endpoint: &'a EndpointDefinition,
    /// Parameters captured from the endpoint's path template
    pub path_params: PathParams,
}

/// Find the first endpoint matching `method` and `path`.
///
/// Candidates are scanned in the order given, which is registration order for
/// the bundled store. The first endpoint whose template matches wins: an endpoint
/// with a placeholder registered before a literal one at the same position
/// shadows it. There is no specificity ranking.
pub fn resolve<'a>(
    candidates: &'a [EndpointDefinition],
    method: &str,
    path: &str,
) -> Option<ResolvedMatch<'a>> {
    let method = method.to_uppercase();

    candidates
        .iter()
        .filter(|endpoint| endpoint.method == method)
        .find_map(|endpoint| {
            endpoint.path.matches(path).map(|path_params| ResolvedMatch {
                endpoint,
                path_params,
            })
        })
}
