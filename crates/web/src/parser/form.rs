use serde_json::{Map, Value};

use crate::config::BodyParserConfig;
use crate::error::BodyError;
use crate::parser::{insert_multi, store};
use crate::request::Request;

pub(crate) fn parse(req: &mut Request, config: &BodyParserConfig) -> Result<(), BodyError> {
    let Some(text) = req.body().as_text().filter(|text| !text.is_empty()) else {
        return Ok(());
    };

    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(text).map_err(|e| BodyError::invalid_content(format!("Invalid form body: {e}")))?;

    let mut fields = Map::new();
    for (key, value) in pairs {
        insert_multi(&mut fields, key, Value::String(value));
    }

    store(req, Value::Object(fields), config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyValue;
    use crate::test_util::post;
    use serde_json::json;

    fn form(body: &'static str) -> Request {
        let mut req = post("application/x-www-form-urlencoded", body);
        req.set_body(BodyValue::Text(body.to_string()));
        req
    }

    #[test]
    fn fields_are_merged() {
        let mut req = form("name=micro+ingest&tag=a&tag=b&empty=");
        req.params_mut().as_object_mut().unwrap().insert("name".into(), json!("route"));

        parse(&mut req, &BodyParserConfig::default()).unwrap();

        assert_eq!(req.body().as_value(), Some(&json!({"name": "micro ingest", "tag": ["a", "b"], "empty": ""})));
        assert_eq!(req.params(), &json!({"name": "route", "tag": ["a", "b"], "empty": ""}));
    }

    #[test]
    fn percent_decoding() {
        let mut req = form("q=%E4%BD%A0%E5%A5%BD&x=1%262");
        parse(&mut req, &BodyParserConfig::default().override_params(true)).unwrap();

        assert_eq!(req.param("q"), Some(&json!("你好")));
        assert_eq!(req.param("x"), Some(&json!("1&2")));
    }

    #[test]
    fn raw_body_without_mapping() {
        let mut req = form("a=1");
        parse(&mut req, &BodyParserConfig::default().map_params(false)).unwrap();

        assert_eq!(req.raw_body(), Some("a=1"));
        assert_eq!(req.params(), &json!({}));
    }
}
