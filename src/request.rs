//! Per-request context consumed by the rule engine.

use crate::accessor;
use crate::rules::ParamSource;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Path parameters captured from a template, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    /// Get a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Insert a parameter, replacing an existing value with the same name.
    pub fn insert(&mut self, name: &str, value: &str) {
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.0.push((name.to_string(), value.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = PathParams::default();
        for (k, v) in iter {
            let (k, v): (String, String) = (k.into(), v.into());
            params.insert(&k, &v);
        }
        params
    }
}

/// A query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    /// Values collected from repeated `name[]=` keys.
    List(Vec<String>),
}

impl QueryValue {
    pub fn to_json(&self) -> Value {
        match self {
            QueryValue::Single(s) => Value::String(s.clone()),
            QueryValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Request data available to dynamic rules.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub path_params: PathParams,
    pub query_params: HashMap<String, QueryValue>,
    /// Parsed request body; an empty mapping when the request had none.
    pub body: Value,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            path_params: PathParams::default(),
            query_params: HashMap::new(),
            body: Value::Object(Map::new()),
        }
    }
}

impl RequestContext {
    pub fn new(path_params: PathParams) -> Self {
        Self {
            path_params,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query_params: HashMap<String, QueryValue>) -> Self {
        self.query_params = query_params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Read a parameter from the selected source.
    ///
    /// Body parameters are addressed by dot-path. A null value counts as absent.
    pub fn param(&self, source: ParamSource, name: &str) -> Option<Value> {
        let value = match source {
            ParamSource::Path => self
                .path_params
                .get(name)
                .map(|v| Value::String(v.to_string())),
            ParamSource::Query => self.query_params.get(name).map(QueryValue::to_json),
            ParamSource::Body => accessor::get(&self.body, name).cloned(),
            ParamSource::Unknown => None,
        };
        value.filter(|v| !v.is_null())
    }
}

/// Parse a query string into parameters.
///
/// Keys ending in `[]` accumulate into a list; a repeated plain key keeps its
/// last value.
pub fn parse_query_string(query: &str) -> HashMap<String, QueryValue> {
    let mut params = HashMap::new();

    for part in query.split('&') {
        if part.is_empty() {
            continue;
        }
        let (key, value) = match part.split_once('=') {
            Some((key, value)) => (urlencoding_decode(key), urlencoding_decode(value)),
            None => (urlencoding_decode(part), String::new()),
        };

        if let Some(list_key) = key.strip_suffix("[]") {
            match params.get_mut(list_key) {
                Some(QueryValue::List(items)) => items.push(value),
                _ => {
                    params.insert(list_key.to_string(), QueryValue::List(vec![value]));
                }
            }
        } else {
            params.insert(key, QueryValue::Single(value));
        }
    }

    params
}

/// Parse a request body into a JSON-like tree.
///
/// JSON objects and arrays are kept as-is; form-encoded bodies become a mapping
/// of strings. Anything else yields an empty mapping.
///
/// JSON is attempted for any non-form content type, so clients that omit or
/// mislabel `Content-Type` still have their body available to rules.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Value {
    let is_form = content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if is_form {
        let text = String::from_utf8_lossy(body);
        let map: Map<String, Value> = parse_query_string(&text)
            .into_iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect();
        return Value::Object(map);
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
        _ => Value::Object(Map::new()),
    }
}

/// Decode `%XX` escapes and `+` as space.
fn urlencoding_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            if let Some(byte) = bytes
                .get(i + 1..i + 3)
                .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(if b == b'+' { b' ' } else { b });
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string("foo=bar&baz=qux");
        assert_eq!(params.get("foo"), Some(&QueryValue::Single("bar".to_string())));
        assert_eq!(params.get("baz"), Some(&QueryValue::Single("qux".to_string())));

        let params = parse_query_string("name=John%20Doe&city=New+York");
        assert_eq!(
            params.get("name"),
            Some(&QueryValue::Single("John Doe".to_string()))
        );
        assert_eq!(
            params.get("city"),
            Some(&QueryValue::Single("New York".to_string()))
        );
    }

    #[test]
    fn test_query_lists_and_repeats() {
        let params = parse_query_string("tag[]=a&tag[]=b&page=1&page=2&flag");
        assert_eq!(
            params.get("tag"),
            Some(&QueryValue::List(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(params.get("page"), Some(&QueryValue::Single("2".to_string())));
        assert_eq!(params.get("flag"), Some(&QueryValue::Single(String::new())));
    }

    #[test]
    fn test_decode_utf8_and_malformed_escapes() {
        assert_eq!(urlencoding_decode("caf%C3%A9"), "café");
        assert_eq!(urlencoding_decode("100%"), "100%");
        assert_eq!(urlencoding_decode("%zz"), "%zz");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(
            parse_body(Some("application/json"), br#"{"user":{"id":3}}"#),
            json!({"user": {"id": 3}})
        );
        assert_eq!(parse_body(None, b"not json"), json!({}));
        assert_eq!(parse_body(None, b""), json!({}));
        assert_eq!(parse_body(None, b"42"), json!({}));
        assert_eq!(parse_body(Some("text/plain"), br#"[1, 2]"#), json!([1, 2]));
        assert_eq!(
            parse_body(Some("application/x-www-form-urlencoded"), b"name=Ada&age=36"),
            json!({"name": "Ada", "age": "36"})
        );
    }

    #[test]
    fn test_param_sources() {
        let ctx = RequestContext::new([("id", "42")].into_iter().collect())
            .with_query(parse_query_string("q=hello&tags[]=x"))
            .with_body(json!({"user": {"name": "Ada", "nick": null}}));

        assert_eq!(ctx.param(ParamSource::Path, "id"), Some(json!("42")));
        assert_eq!(ctx.param(ParamSource::Query, "q"), Some(json!("hello")));
        assert_eq!(ctx.param(ParamSource::Query, "tags"), Some(json!(["x"])));
        assert_eq!(ctx.param(ParamSource::Body, "user.name"), Some(json!("Ada")));
        assert_eq!(ctx.param(ParamSource::Body, "user.nick"), None);
        assert_eq!(ctx.param(ParamSource::Path, "missing"), None);
        assert_eq!(ctx.param(ParamSource::Unknown, "id"), None);
    }
}
