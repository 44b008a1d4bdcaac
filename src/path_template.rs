//! Path template compilation.
//!
//! Templates are `/`-delimited. A segment of the exact form `{name}` captures
//! exactly one request path segment; every other segment must match literally.

use crate::request::PathParams;
use serde::{Deserialize, Deserializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateSegment {
    Literal(String),
    Param(String),
}

/// A compiled endpoint path such as `/users/{id}/posts/{postId}`.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    /// `None` when the template has no placeholders; such templates are
    /// compared against the request path by plain equality.
    segments: Option<Vec<TemplateSegment>>,
}

impl PathTemplate {
    /// Compile a template string.
    pub fn parse(template: &str) -> Self {
        let segments: Vec<TemplateSegment> = template
            .split('/')
            .map(|segment| match placeholder_name(segment) {
                Some(name) => TemplateSegment::Param(name.to_string()),
                None => TemplateSegment::Literal(segment.to_string()),
            })
            .collect();

        let has_params = segments
            .iter()
            .any(|s| matches!(s, TemplateSegment::Param(_)));

        Self {
            raw: template.to_string(),
            segments: has_params.then_some(segments),
        }
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this template contains no placeholders.
    pub fn is_literal(&self) -> bool {
        self.segments.is_none()
    }

    /// Placeholder names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().flatten().filter_map(|s| match s {
            TemplateSegment::Param(name) => Some(name.as_str()),
            TemplateSegment::Literal(_) => None,
        })
    }

    /// Placeholder names declared more than once.
    pub fn duplicate_params(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        let mut duplicates = Vec::new();
        for name in self.param_names() {
            if seen.contains(&name) {
                if !duplicates.contains(&name) {
                    duplicates.push(name);
                }
            } else {
                seen.push(name);
            }
        }
        duplicates
    }

    /// Match a request path, returning the captured parameters on success.
    ///
    /// Matching is whole-path and segment-aligned: the segment counts must be
    /// equal and each placeholder captures one non-empty segment.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let Some(segments) = &self.segments else {
            return (self.raw == path).then(PathParams::default);
        };

        let mut params = PathParams::default();
        let mut parts = path.split('/');

        for segment in segments {
            let part = parts.next()?;
            match segment {
                TemplateSegment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                TemplateSegment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name, part);
                }
            }
        }

        // Request path has more segments than the template
        if parts.next().is_some() {
            return None;
        }

        Some(params)
    }
}

fn placeholder_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')?
        .strip_suffix('}')
        .filter(|name| !name.is_empty() && !name.contains(|c| c == '{' || c == '}'))
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for PathTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<'de> Deserialize<'de> for PathTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
