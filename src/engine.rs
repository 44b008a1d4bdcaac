//! Rule engine for dynamic responses.
//!
//! Applies an ordered list of [`DynamicRule`]s to a copy of a response body
//! template. Rule application never fails: a rule that cannot produce a value
//! leaves the body untouched.

use crate::accessor;
use crate::request::RequestContext;
use crate::rules::{Condition, DynamicRule, Operator, RuleAction};
use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::Write;
use tracing::debug;

const SECONDS_PER_DAY: i64 = 86_400;

/// Source of randomness and time for rule evaluation.
pub trait Entropy {
    /// Uniform integer in `[min, max]`. Callers guarantee `min <= max`.
    fn int_between(&mut self, min: i64, max: i64) -> i64;

    /// Uniform index in `[0, len)`. Callers guarantee `len > 0`.
    fn index_below(&mut self, len: usize) -> usize;

    fn coin_flip(&mut self) -> bool;

    fn now(&self) -> DateTime<Utc>;
}

/// Thread-local RNG and the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEntropy;

impl Entropy for SystemEntropy {
    fn int_between(&mut self, min: i64, max: i64) -> i64 {
        rand::thread_rng().gen_range(min..=max)
    }

    fn index_below(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }

    fn coin_flip(&mut self) -> bool {
        rand::thread_rng().gen_bool(0.5)
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Seeded RNG with a frozen clock, for reproducible output.
#[derive(Debug, Clone)]
pub struct SeededEntropy {
    rng: StdRng,
    now: DateTime<Utc>,
}

impl SeededEntropy {
    pub fn new(seed: u64, now: DateTime<Utc>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            now,
        }
    }
}

impl Entropy for SeededEntropy {
    fn int_between(&mut self, min: i64, max: i64) -> i64 {
        self.rng.gen_range(min..=max)
    }

    fn index_below(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn coin_flip(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Apply `rules` in order to a copy of `template`.
///
/// Later rules may overwrite values written by earlier ones. Rules without a
/// type or target, and rules of an unknown type, are skipped.
pub fn apply_rules(
    template: &Value,
    rules: &[DynamicRule],
    ctx: &RequestContext,
    entropy: &mut dyn Entropy,
) -> Value {
    let mut body = template.clone();
    if rules.is_empty() {
        return body;
    }

    debug!(rules = rules.len(), "Applying dynamic rules");

    for rule in rules {
        if !rule.is_applicable() {
            debug!(kind = %rule.kind, target = %rule.target, "Skipping incomplete rule");
            continue;
        }

        match evaluate(&rule.action, ctx, entropy) {
            Some(value) => accessor::set_in_place(&mut body, &rule.target, value),
            None => debug!(kind = %rule.kind, target = %rule.target, "Rule produced no value"),
        }
    }

    body
}

fn evaluate(action: &RuleAction, ctx: &RequestContext, entropy: &mut dyn Entropy) -> Option<Value> {
    match action {
        RuleAction::RandomNumber { min, max } => {
            let (lo, hi) = ordered(*min, *max);
            Some(Value::from(entropy.int_between(lo, hi)))
        }
        RuleAction::RandomString { length, charset } => {
            let chars: Vec<char> = charset.chars().collect();
            let value: String = if chars.is_empty() {
                String::new()
            } else {
                (0..*length)
                    .map(|_| chars[entropy.index_below(chars.len())])
                    .collect()
            };
            Some(Value::String(value))
        }
        RuleAction::RandomBoolean => Some(Value::Bool(entropy.coin_flip())),
        RuleAction::RandomDate {
            format,
            min_days,
            max_days,
        } => {
            let (lo, hi) = ordered(
                min_days.saturating_mul(SECONDS_PER_DAY),
                max_days.saturating_mul(SECONDS_PER_DAY),
            );
            let now = entropy.now();
            let offset = entropy.int_between(lo, hi);
            let at = TimeDelta::try_seconds(offset)
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(now);
            Some(Value::String(format_date(at, format)))
        }
        RuleAction::RequestParam { source, name } => {
            if name.is_empty() {
                return None;
            }
            ctx.param(*source, name)
        }
        RuleAction::Conditional {
            condition,
            then_value,
            else_value,
        } => {
            let condition = condition.as_ref()?;
            let branch = if evaluate_condition(condition, ctx) {
                then_value
            } else {
                else_value
            };
            branch.clone().filter(|v| !v.is_null())
        }
        RuleAction::Unknown => None,
    }
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Evaluate a condition against the request. Missing parameters, missing
/// comparison values and unknown operators all evaluate to false.
pub fn evaluate_condition(condition: &Condition, ctx: &RequestContext) -> bool {
    if condition.param_name.is_empty() {
        return false;
    }
    let Some(expected) = condition.value.as_ref().filter(|v| !v.is_null()) else {
        return false;
    };
    let Some(actual) = ctx.param(condition.param_type, &condition.param_name) else {
        return false;
    };

    match condition.operator {
        Operator::Equals => loose_eq(&actual, expected),
        Operator::NotEquals => !loose_eq(&actual, expected),
        Operator::GreaterThan => compare(&actual, expected) == Some(Ordering::Greater),
        Operator::LessThan => compare(&actual, expected) == Some(Ordering::Less),
        Operator::Contains => actual
            .as_str()
            .map(|text| text.contains(scalar_text(expected).as_str()))
            .unwrap_or(false),
        Operator::Unknown => false,
    }
}

/// Equality that tolerates type differences between request data (mostly
/// strings) and stored comparison values.
fn loose_eq(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a == b;
    }

    match (left, right) {
        (Value::Bool(b), other) | (other, Value::Bool(b)) => *b == truthy(other),
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            left == right
        }
        _ => scalar_text(left) == scalar_text(right),
    }
}

/// Numeric when both sides are numeric, lexical otherwise.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a.partial_cmp(&b);
    }
    Some(scalar_text(left).cmp(&scalar_text(right)))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Format a timestamp.
///
/// Formats containing `%` are strftime patterns. Otherwise the tokens `YYYY`,
/// `YY`, `MM`, `DD`, `HH`, `mm`, `ss` and the single-letter forms `Y m d H i s c`
/// are recognized; anything else is copied literally.
pub fn format_date(at: DateTime<Utc>, format: &str) -> String {
    let pattern = if format.contains('%') {
        format.to_string()
    } else {
        translate_format(format)
    };

    let mut out = String::new();
    if write!(out, "{}", at.format(&pattern)).is_err() {
        debug!(format, "Invalid date format, using default");
        return at.format("%Y-%m-%d").to_string();
    }
    out
}

fn translate_format(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();

        let token = match (c, run) {
            ('Y', 4) | ('Y', 1) => Some("%Y"),
            ('Y', 2) => Some("%y"),
            ('M', 2) | ('m', 1) => Some("%m"),
            ('D', 2) | ('d', 1) => Some("%d"),
            ('H', 2) | ('H', 1) => Some("%H"),
            ('m', 2) | ('i', 1) => Some("%M"),
            ('s', 2) | ('s', 1) => Some("%S"),
            ('c', 1) => Some("%Y-%m-%dT%H:%M:%S%:z"),
            _ => None,
        };

        match token {
            Some(t) => out.push_str(t),
            None => out.extend(std::iter::repeat(c).take(run)),
        }
        i += run;
    }

    out
}
