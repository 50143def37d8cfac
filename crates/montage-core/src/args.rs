//! Flat argument maps and the typed accessors used by every API and event.
//!
//! API and event arguments travel as a JSON object whose values are all
//! scalars. They are flattened into an [`ArgMap`] of strings once, at the
//! edge, and read back with the `need_*` / `optional_*` helpers.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::RouterError;

/// Flattened API or event arguments.
pub type ArgMap = BTreeMap<String, String>;

/// Parse a raw JSON object into an [`ArgMap`].
///
/// # Errors
///
/// Returns [`RouterError::BadJson`] if `raw` is not a JSON object or any
/// value is a nested object or array.
pub fn string_map(raw: &str) -> Result<ArgMap, RouterError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| RouterError::BadJson {
        message: format!("{raw} ({e})"),
    })?;
    match value {
        Value::Object(object) => flatten(&object),
        _ => Err(RouterError::BadJson {
            message: format!("{raw} (expected a JSON object)"),
        }),
    }
}

/// Flatten an already-parsed JSON object into an [`ArgMap`].
///
/// Strings are kept verbatim, numbers and booleans keep their JSON text,
/// and `null` becomes the empty string.
///
/// # Errors
///
/// Returns [`RouterError::BadJson`] for nested objects or arrays.
pub fn flatten(object: &Map<String, Value>) -> Result<ArgMap, RouterError> {
    object
        .iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(RouterError::BadJson {
                        message: format!("value of {name} is not a scalar"),
                    });
                }
            };
            Ok((name.clone(), text))
        })
        .collect()
}

/// Serialize an [`ArgMap`] back into a flat JSON object.
pub fn to_raw_json(args: &ArgMap) -> String {
    let object: Map<String, Value> = args
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(object).to_string()
}

/// Fetch a required string argument.
///
/// # Errors
///
/// Returns [`RouterError::MissingArg`] if `name` is absent.
pub fn need_string<'a>(args: &'a ArgMap, name: &str, api: &str) -> Result<&'a str, RouterError> {
    args.get(name)
        .map(String::as_str)
        .ok_or_else(|| RouterError::missing(api, name))
}

/// Fetch an optional string argument, falling back to `default`.
pub fn optional_string<'a>(args: &'a ArgMap, name: &str, default: &'a str) -> &'a str {
    args.get(name).map_or(default, String::as_str)
}

/// Fetch a required floating-point argument.
///
/// # Errors
///
/// Returns [`RouterError::MissingArg`] if absent or
/// [`RouterError::BadArg`] if the value is not a number.
pub fn need_float(args: &ArgMap, name: &str, api: &str) -> Result<f32, RouterError> {
    let value = need_string(args, name, api)?;
    value
        .trim()
        .parse::<f32>()
        .map_err(|_| RouterError::bad(api, name, value))
}

/// Fetch a required boolean argument (see [`is_true_value`]).
///
/// # Errors
///
/// Returns [`RouterError::MissingArg`] if absent or
/// [`RouterError::BadArg`] if the value is not a recognized boolean.
pub fn need_bool(args: &ArgMap, name: &str, api: &str) -> Result<bool, RouterError> {
    let value = need_string(args, name, api)?;
    is_true_value(value).ok_or_else(|| RouterError::bad(api, name, value))
}

/// Interpret the boolean spellings accepted across the router.
///
/// `True`, `true`, `1` and `on` are true; `False`, `false`, `0` and `off`
/// are false. Anything else is `None`.
pub fn is_true_value(value: &str) -> Option<bool> {
    match value {
        "True" | "true" | "1" | "on" => Some(true),
        "False" | "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Fetch the required `x`, `y` and `z` coordinates.
///
/// # Errors
///
/// Fails on the first coordinate that is missing or unparsable.
pub fn get_xyz(args: &ArgMap, api: &str) -> Result<(f32, f32, f32), RouterError> {
    let x = need_float(args, "x", api)?;
    let y = need_float(args, "y", api)?;
    let z = need_float(args, "z", api)?;
    Ok((x, y, z))
}
