//! Dynamic rule definitions.
//!
//! Rules are read from stored endpoint data, which may drift over time. Parsing
//! is deliberately tolerant: an unknown `type` becomes [`RuleAction::Unknown`]
//! and a rule whose fields cannot be decoded is dropped with a warning.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Default character set for `random_string`.
pub const DEFAULT_CHARSET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default format for `random_date`.
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";

/// A single step of a dynamic response pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawRule")]
pub struct DynamicRule {
    /// Rule type tag as stored.
    pub kind: String,
    /// Dot-path in the response body that the rule writes to.
    pub target: String,
    pub action: RuleAction,
}

impl DynamicRule {
    pub fn new(target: impl Into<String>, action: RuleAction) -> Self {
        Self {
            kind: action.kind().to_string(),
            target: target.into(),
            action,
        }
    }

    /// Rules without a type or target are never applied.
    pub fn is_applicable(&self) -> bool {
        !self.kind.is_empty() && !self.target.is_empty()
    }
}

/// What a rule computes.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleAction {
    RandomNumber {
        min: i64,
        max: i64,
    },
    RandomString {
        length: usize,
        charset: String,
    },
    RandomBoolean,
    RandomDate {
        format: String,
        min_days: i64,
        max_days: i64,
    },
    RequestParam {
        source: ParamSource,
        name: String,
    },
    Conditional {
        condition: Option<Condition>,
        then_value: Option<Value>,
        else_value: Option<Value>,
    },
    /// A type tag this version does not know; skipped at evaluation time.
    Unknown,
}

impl RuleAction {
    pub fn kind(&self) -> &'static str {
        match self {
            RuleAction::RandomNumber { .. } => "random_number",
            RuleAction::RandomString { .. } => "random_string",
            RuleAction::RandomBoolean => "random_boolean",
            RuleAction::RandomDate { .. } => "random_date",
            RuleAction::RequestParam { .. } => "request_param",
            RuleAction::Conditional { .. } => "conditional",
            RuleAction::Unknown => "unknown",
        }
    }
}

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    #[default]
    Path,
    Query,
    Body,
    /// Unrecognized source; never yields a value.
    #[serde(other)]
    Unknown,
}

/// Comparison applied by a conditional rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[default]
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    /// Unrecognized operator; always evaluates to false.
    #[serde(other)]
    Unknown,
}

/// Condition of a `conditional` rule.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Condition {
    #[serde(deserialize_with = "null_as_default")]
    pub param_type: ParamSource,
    #[serde(deserialize_with = "null_as_default")]
    pub param_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub operator: Operator,
    pub value: Option<Value>,
}

/// Flat on-disk shape of a rule. Every field is optional so that partial or
/// foreign rule data still decodes; an explicit `null` reads as the default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRule {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    kind: String,
    #[serde(deserialize_with = "null_as_default")]
    target: String,
    #[serde(deserialize_with = "lenient_integer")]
    min: Option<i64>,
    #[serde(deserialize_with = "lenient_integer")]
    max: Option<i64>,
    #[serde(deserialize_with = "lenient_integer")]
    length: Option<usize>,
    #[serde(alias = "characters")]
    charset: Option<String>,
    format: Option<String>,
    #[serde(alias = "min_days_offset", deserialize_with = "lenient_integer")]
    min_days: Option<i64>,
    #[serde(alias = "max_days_offset", deserialize_with = "lenient_integer")]
    max_days: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    param_type: ParamSource,
    #[serde(deserialize_with = "null_as_default")]
    param_name: String,
    condition: Option<Condition>,
    #[serde(alias = "true_value")]
    then: Option<Value>,
    #[serde(rename = "else", alias = "false_value")]
    otherwise: Option<Value>,
}

impl From<RawRule> for DynamicRule {
    fn from(raw: RawRule) -> Self {
        let action = match raw.kind.as_str() {
            "random_number" => RuleAction::RandomNumber {
                min: raw.min.unwrap_or(0),
                max: raw.max.unwrap_or(100),
            },
            "random_string" => RuleAction::RandomString {
                length: raw.length.unwrap_or(10),
                charset: raw.charset.unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
            },
            "random_boolean" => RuleAction::RandomBoolean,
            "random_date" => RuleAction::RandomDate {
                format: raw
                    .format
                    .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
                min_days: raw.min_days.unwrap_or(-30),
                max_days: raw.max_days.unwrap_or(30),
            },
            "request_param" => RuleAction::RequestParam {
                source: raw.param_type,
                name: raw.param_name,
            },
            "conditional" => RuleAction::Conditional {
                condition: raw.condition,
                then_value: raw.then,
                else_value: raw.otherwise,
            },
            _ => RuleAction::Unknown,
        };

        Self {
            kind: raw.kind,
            target: raw.target,
            action,
        }
    }
}

/// Read a field whose `null` means "use the default".
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read an integer that may be stored as a number or a numeric string.
///
/// Fractional values are truncated. Non-numeric text is an error.
fn lenient_integer<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let number = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        Some(_) => None,
    };

    number
        .and_then(|n| T::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| D::Error::custom("expected an integer"))
}

/// Deserialize a rule list, dropping entries that cannot be decoded.
///
/// A `null` list is treated as empty.
pub fn deserialize_rules<'de, D>(deserializer: D) -> Result<Vec<DynamicRule>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<Vec<Value>> = Option::deserialize(deserializer)?;

    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<DynamicRule>(entry) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!(index, error = %e, "Dropping undecodable dynamic rule");
                None
            }
        })
        .collect())
}
