//! Typed accessors over free-form node parameters.

use vigil_config::Params;

use crate::error::OperatorError;

/// A required string parameter.
pub fn required_str<'a>(params: &'a Params, key: &str) -> Result<&'a str, OperatorError> {
  optional_str(params, key)?
    .ok_or_else(|| OperatorError::configuration(format!("missing required parameter '{}'", key)))
}

/// An optional string parameter; present but non-string is an error.
pub fn optional_str<'a>(params: &'a Params, key: &str) -> Result<Option<&'a str>, OperatorError> {
  match params.get(key) {
    None | Some(serde_json::Value::Null) => Ok(None),
    Some(serde_json::Value::String(s)) => Ok(Some(s.as_str())),
    Some(other) => Err(OperatorError::configuration(format!(
      "parameter '{}' must be a string, got {}",
      key, other
    ))),
  }
}

/// An optional non-negative integer parameter.
pub fn optional_usize(params: &Params, key: &str) -> Result<Option<usize>, OperatorError> {
  match params.get(key) {
    None | Some(serde_json::Value::Null) => Ok(None),
    Some(value) => value
      .as_u64()
      .map(|n| Some(n as usize))
      .ok_or_else(|| {
        OperatorError::configuration(format!(
          "parameter '{}' must be a non-negative integer, got {}",
          key, value
        ))
      }),
  }
}

/// An optional list of strings.
pub fn optional_str_list(params: &Params, key: &str) -> Result<Option<Vec<String>>, OperatorError> {
  let Some(value) = params.get(key) else {
    return Ok(None);
  };
  let invalid =
    || OperatorError::configuration(format!("parameter '{}' must be a list of strings", key));
  let list = value.as_array().ok_or_else(invalid)?;
  list
    .iter()
    .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
    .collect::<Result<Vec<_>, _>>()
    .map(Some)
}
