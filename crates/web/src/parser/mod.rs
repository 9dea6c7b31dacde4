//! Structured parsers selected by the body dispatcher.
//!
//! JSON, form and multipart parsers share the parameter mapping rules implemented
//! here; the fielded text parser only replaces the body.

pub(crate) mod fielded;
pub(crate) mod form;
pub(crate) mod json;
pub(crate) mod multipart;

use serde_json::{Map, Value};

use crate::body::BodyValue;
use crate::config::BodyParserConfig;
use crate::request::Request;

/// Replaces the body with the parsed value and maps it into the parameters.
///
/// With parameter mapping an array replaces the parameters, an object is merged key
/// by key and any other non-empty value replaces them. Without it, the text the value
/// was parsed from is kept as the raw body.
pub(crate) fn store(req: &mut Request, value: Value, config: &BodyParserConfig) {
    if config.map_params {
        match &value {
            Value::Object(map) => merge_params(req.params_mut(), map, config.override_params),
            Value::Array(_) => req.set_params(value.clone()),
            primitive if is_truthy(primitive) => req.set_params(value.clone()),
            _ => {}
        }
    } else if let BodyValue::Text(raw) = req.take_body() {
        req.set_raw_body(raw);
    }

    req.set_body(BodyValue::Structured(value));
}

/// Copies every member into the parameters, keeping parameters that already exist
/// unless `override_params` is set.
pub(crate) fn merge_params(params: &mut Value, members: &Map<String, Value>, override_params: bool) {
    if !params.is_object() {
        *params = Value::Object(Map::new());
    }
    let Some(params) = params.as_object_mut() else {
        return;
    };

    for (key, value) in members {
        if params.contains_key(key) && !override_params {
            continue;
        }
        params.insert(key.clone(), value.clone());
    }
}

/// Inserts a value, turning repeated keys into an array of all their values.
pub(crate) fn insert_multi(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
