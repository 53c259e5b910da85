//! `${expr}` placeholder substitution using minijinja expressions.
//!
//! Parameters of nodes instantiated inside a fork-join branch are rewritten
//! against the properties of the branch's enumeration item:
//! ```json
//! { "query": "select * from ${table} where metric = '${item.metric | lower}'" }
//! ```
//!
//! A string that is exactly one placeholder keeps the JSON type of the
//! evaluated value, so `"${count}"` with `count = 3` becomes the number `3`.
//! Placeholders that fail to compile, fail to evaluate, or evaluate to an
//! undefined value are left verbatim. Object keys are never rewritten.

use minijinja::Environment;
use serde_json::Value;
use vigil_config::Params;

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Whether any string inside `value` contains a placeholder.
pub fn has_placeholders(value: &Value) -> bool {
  match value {
    Value::String(s) => find_token(s, 0).is_some(),
    Value::Array(items) => items.iter().any(has_placeholders),
    Value::Object(map) => map.values().any(has_placeholders),
    _ => false,
  }
}

/// Substitute placeholders in every value of a parameter map.
pub fn substitute_params(params: &Params, properties: &Params) -> Params {
  let env = Environment::new();
  let context = minijinja::Value::from_serialize(properties);
  params
    .iter()
    .map(|(key, value)| (key.clone(), substitute_value(&env, value, &context)))
    .collect()
}

/// Substitute placeholders in a single JSON value.
pub fn substitute(value: &Value, properties: &Params) -> Value {
  let env = Environment::new();
  let context = minijinja::Value::from_serialize(properties);
  substitute_value(&env, value, &context)
}

fn substitute_value<'s>(
  env: &Environment<'s>,
  value: &'s Value,
  context: &minijinja::Value,
) -> Value {
  match value {
    Value::String(s) => substitute_str(env, s, context),
    Value::Array(items) => Value::Array(
      items
        .iter()
        .map(|item| substitute_value(env, item, context))
        .collect(),
    ),
    Value::Object(map) => Value::Object(
      map
        .iter()
        .map(|(key, item)| (key.clone(), substitute_value(env, item, context)))
        .collect(),
    ),
    other => other.clone(),
  }
}

fn substitute_str<'s>(env: &Environment<'s>, s: &'s str, context: &minijinja::Value) -> Value {
  // Whole-string placeholder: keep the evaluated type.
  if let Some((start, end)) = find_token(s, 0) {
    if start == 0 && end == s.len() {
      let expr = &s[OPEN.len()..end - 1];
      return match evaluate(env, expr, context) {
        Some(value) => {
          serde_json::to_value(&value).unwrap_or_else(|_| Value::String(s.to_string()))
        }
        None => Value::String(s.to_string()),
      };
    }
  }

  let mut out = String::with_capacity(s.len());
  let mut cursor = 0;
  while let Some((start, end)) = find_token(s, cursor) {
    out.push_str(&s[cursor..start]);
    let token = &s[start..end];
    match evaluate(env, &token[OPEN.len()..token.len() - 1], context) {
      Some(value) => out.push_str(&value.to_string()),
      None => out.push_str(token),
    }
    cursor = end;
  }
  out.push_str(&s[cursor..]);
  Value::String(out)
}

/// Byte range `[start, end)` of the next `${...}` token at or after `from`.
fn find_token(s: &str, from: usize) -> Option<(usize, usize)> {
  let start = from + s[from..].find(OPEN)?;
  let close = s[start + OPEN.len()..].find(CLOSE)?;
  Some((start, start + OPEN.len() + close + 1))
}

fn evaluate<'s>(
  env: &Environment<'s>,
  expr: &'s str,
  context: &minijinja::Value,
) -> Option<minijinja::Value> {
  let expr = expr.trim();
  if expr.is_empty() {
    return None;
  }
  let compiled = env.compile_expression(expr).ok()?;
  let value = compiled.eval(context).ok()?;
  if value.is_undefined() {
    return None;
  }
  Some(value)
}
