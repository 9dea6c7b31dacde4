use serde_json::Value;

use crate::config::{BodyParserConfig, Reviver};
use crate::error::BodyError;
use crate::parser::store;
use crate::request::Request;

pub(crate) fn parse(req: &mut Request, config: &BodyParserConfig) -> Result<(), BodyError> {
    let Some(text) = req.body().as_text().filter(|text| !text.is_empty()) else {
        return Ok(());
    };

    let value: Value =
        serde_json::from_str(text).map_err(|e| BodyError::invalid_content(format!("Invalid JSON: {e}")))?;
    let value = match &config.reviver {
        Some(reviver) => revive(reviver, "", value),
        None => value,
    };

    store(req, value, config);
    Ok(())
}

/// Walks the document and hands every primitive to the reviver.
fn revive(reviver: &Reviver, key: &str, value: Value) -> Value {
    match value {
        Value::Object(members) => {
            Value::Object(members.into_iter().map(|(k, v)| (k.clone(), revive(reviver, &k, v))).collect())
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().enumerate().map(|(i, v)| revive(reviver, &i.to_string(), v)).collect())
        }
        primitive => reviver(key, primitive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyValue;
    use crate::test_util::post;
    use serde_json::json;

    fn parsed(body: &'static str, config: &BodyParserConfig) -> Request {
        let mut req = post("application/json", body);
        req.set_body(BodyValue::Text(body.to_string()));
        parse(&mut req, config).unwrap();
        req
    }

    #[test]
    fn object_is_merged_into_params() {
        let body = r#"{"id":"from-body","name":"x","nested":{"n":[1,2]}}"#;
        let mut req = post("application/json", body);
        req.set_body(BodyValue::Text(body.to_string()));
        req.params_mut().as_object_mut().unwrap().insert("id".into(), json!("from-route"));

        parse(&mut req, &BodyParserConfig::default()).unwrap();

        assert_eq!(req.body(), &BodyValue::Structured(json!({"id":"from-body","name":"x","nested":{"n":[1,2]}})));
        assert_eq!(req.params(), &json!({"id":"from-route","name":"x","nested":{"n":[1,2]}}));
        assert!(req.raw_body().is_none());
    }

    #[test]
    fn override_replaces_existing_params() {
        let body = r#"{"id":"from-body"}"#;
        let mut req = post("application/json", body);
        req.set_body(BodyValue::Text(body.to_string()));
        req.params_mut().as_object_mut().unwrap().insert("id".into(), json!("from-route"));

        parse(&mut req, &BodyParserConfig::default().override_params(true)).unwrap();

        assert_eq!(req.param("id"), Some(&json!("from-body")));
    }

    #[test]
    fn array_replaces_params() {
        let req = parsed("[1,2,3]", &BodyParserConfig::default());
        assert_eq!(req.params(), &json!([1, 2, 3]));
    }

    #[test]
    fn primitives() {
        let req = parsed("42", &BodyParserConfig::default());
        assert_eq!(req.params(), &json!(42));
        assert_eq!(req.body(), &BodyValue::Structured(json!(42)));

        let req = parsed("null", &BodyParserConfig::default());
        assert_eq!(req.params(), &json!({}));
    }

    #[test]
    fn without_param_mapping_raw_text_is_kept() {
        let body = r#"{"a":1}"#;
        let req = parsed(body, &BodyParserConfig::default().map_params(false));

        assert_eq!(req.params(), &json!({}));
        assert_eq!(req.raw_body(), Some(body));
        assert_eq!(req.body().as_value(), Some(&json!({"a": 1})));
    }

    #[test]
    fn invalid_json() {
        let body = r#"{"a":"#;
        let mut req = post("application/json", body);
        req.set_body(BodyValue::Text(body.to_string()));

        let err = parse(&mut req, &BodyParserConfig::default()).unwrap_err();

        assert_eq!(err.code(), "InvalidContent");
        assert!(err.to_string().starts_with("Invalid JSON: "));
        assert_eq!(req.body().as_text(), Some(body));
    }

    #[test]
    fn empty_body_is_skipped() {
        let mut req = post("application/json", "");
        req.set_body(BodyValue::Text(String::new()));

        parse(&mut req, &BodyParserConfig::default()).unwrap();
        assert_eq!(req.body(), &BodyValue::Text(String::new()));
    }

    #[test]
    fn reviver_sees_every_primitive() {
        let config = BodyParserConfig::default().reviver(|key, value| match value {
            Value::String(s) if key == "secret" => Value::String("*".repeat(s.len())),
            Value::Number(n) if key == "1" => json!(n.as_i64().unwrap_or_default() * 10),
            other => other,
        });

        let req = parsed(r#"{"secret":"abc","list":[1,2,3],"plain":"p"}"#, &config);

        assert_eq!(req.body().as_value(), Some(&json!({"secret":"***","list":[1,20,3],"plain":"p"})));
    }
}
