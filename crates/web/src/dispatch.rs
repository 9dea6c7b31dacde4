//! Selection of the structured parser from the declared content type.

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use tracing::trace;

use crate::body::BodyValue;
use crate::config::BodyParserConfig;
use crate::error::BodyError;
use crate::parser;
use crate::pipeline::{Outcome, Stage};
use crate::request::Request;

/// The closed set of content types the dispatcher knows a parser for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Form,
    Multipart,
    /// `text/csv`, `text/tsv` and `text/tab-separated-values`.
    FieldedText,
    Unregistered(String),
}

impl ContentKind {
    /// Resolves the lowercased media type essence, without parameters.
    pub fn resolve(content_type: &str) -> Self {
        match content_type {
            "application/json" => Self::Json,
            "application/x-www-form-urlencoded" => Self::Form,
            "multipart/form-data" => Self::Multipart,
            "text/csv" | "text/tsv" | "text/tab-separated-values" => Self::FieldedText,
            other => Self::Unregistered(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BodyDispatcher {
    config: Arc<BodyParserConfig>,
}

impl BodyDispatcher {
    pub fn new(config: BodyParserConfig) -> Self {
        Self::shared(Arc::new(config))
    }

    pub(crate) fn shared(config: Arc<BodyParserConfig>) -> Self {
        Self { config }
    }

    fn is_exempt(&self, method: &Method) -> bool {
        *method == Method::HEAD || (*method == Method::GET && !self.config.request_body_on_get)
    }
}

#[async_trait]
impl Stage for BodyDispatcher {
    async fn process(&self, req: &mut Request) -> Outcome {
        if self.is_exempt(req.method()) {
            return Outcome::Continue;
        }

        match req.header().payload_size() {
            Ok(payload_size) if payload_size.is_empty() => return Outcome::Continue,
            Ok(_) => {}
            Err(e) => return Outcome::Abort(e.into()),
        }

        // an ingested body that turned out empty needs no parser
        if matches!(req.body(), BodyValue::Text(_) | BodyValue::Binary(_)) && req.body().is_empty() {
            trace!("skip dispatch of empty body");
            return Outcome::Continue;
        }

        let kind = ContentKind::resolve(&req.content_type());
        trace!(?kind, "dispatch request body");

        let result = match kind {
            ContentKind::Json => parser::json::parse(req, &self.config),
            ContentKind::Form => parser::form::parse(req, &self.config),
            ContentKind::Multipart => parser::multipart::parse(req, &self.config).await,
            ContentKind::FieldedText => parser::fielded::parse(req),
            ContentKind::Unregistered(content_type) if self.config.reject_unknown => {
                Err(BodyError::UnsupportedMediaType(content_type))
            }
            ContentKind::Unregistered(_) => Ok(()),
        };
        result.into()
    }

    fn name(&self) -> &'static str {
        "body_dispatcher"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::BodyReader;
    use crate::test_util::{chunked, post, request};
    use bytes::Bytes;
    use micro_ingest_http::protocol::body::ReqBody;
    use serde_json::json;

    async fn read_and_dispatch(config: BodyParserConfig, req: &mut Request) -> Outcome {
        let config = Arc::new(config);
        match BodyReader::shared(Arc::clone(&config)).process(req).await {
            Outcome::Continue => BodyDispatcher::shared(config).process(req).await,
            other => other,
        }
    }

    #[test]
    fn resolve_is_exact() {
        assert_eq!(ContentKind::resolve("application/json"), ContentKind::Json);
        assert_eq!(ContentKind::resolve("text/tab-separated-values"), ContentKind::FieldedText);
        assert_eq!(ContentKind::resolve("application/json+x"), ContentKind::Unregistered("application/json+x".into()));
        assert_eq!(ContentKind::resolve(""), ContentKind::Unregistered(String::new()));
    }

    #[tokio::test]
    async fn head_and_get_are_exempt() {
        let mut req = request(
            Method::HEAD,
            &[("Content-Type", "application/json"), ("Content-Length", "1")],
            ReqBody::from("{"),
        );
        assert!(matches!(read_and_dispatch(BodyParserConfig::default(), &mut req).await, Outcome::Continue));

        let mut req = request(
            Method::GET,
            &[("Content-Type", "application/json"), ("Content-Length", "7")],
            ReqBody::from(r#"{"a":1}"#),
        );
        assert!(matches!(read_and_dispatch(BodyParserConfig::default(), &mut req).await, Outcome::Continue));
        assert_eq!(req.body(), &BodyValue::Text(r#"{"a":1}"#.into()));
        assert_eq!(req.param("a"), None);
    }

    #[tokio::test]
    async fn get_body_with_opt_in() {
        let mut req = request(
            Method::GET,
            &[("Content-Type", "application/json"), ("Content-Length", "7")],
            ReqBody::from(r#"{"a":1}"#),
        );
        let config = BodyParserConfig::default().request_body_on_get(true);

        assert!(matches!(read_and_dispatch(config, &mut req).await, Outcome::Continue));
        assert_eq!(req.param("a"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn unknown_type() {
        let mut req = post("application/xml", "<a/>");
        assert!(matches!(read_and_dispatch(BodyParserConfig::default(), &mut req).await, Outcome::Continue));
        assert_eq!(req.body().as_bytes(), Some(&b"<a/>"[..]));

        let mut req = post("application/xml", "<a/>");
        match read_and_dispatch(BodyParserConfig::default().reject_unknown(true), &mut req).await {
            Outcome::Abort(e) => {
                assert_eq!(e.code(), "UnsupportedMediaType");
                assert_eq!(e.to_string(), "application/xml");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_body_is_not_rejected() {
        let mut req = request(Method::POST, &[("Content-Type", "application/xml")], ReqBody::empty());
        let config = BodyParserConfig::default().reject_unknown(true);

        assert!(matches!(read_and_dispatch(config, &mut req).await, Outcome::Continue));
    }

    #[tokio::test]
    async fn empty_chunked_body_skips_dispatch() {
        let mut req = chunked(Method::POST, &[("Content-Type", "application/xml")], vec![Bytes::new()]);
        let config = BodyParserConfig::default().reject_unknown(true);

        assert!(matches!(read_and_dispatch(config, &mut req).await, Outcome::Continue));
        assert_eq!(req.body(), &BodyValue::Binary(Bytes::new()));
    }

    #[tokio::test]
    async fn gzip_to_empty_skips_dispatch() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut req = chunked(
            Method::POST,
            &[("Content-Type", "application/xml"), ("Content-Encoding", "gzip")],
            vec![Bytes::from(compressed)],
        );
        let config = BodyParserConfig::default().reject_unknown(true);

        assert!(matches!(read_and_dispatch(config, &mut req).await, Outcome::Continue));
        assert_eq!(req.body(), &BodyValue::Binary(Bytes::new()));
        assert_eq!(req.params(), &json!({}));
    }

    #[tokio::test]
    async fn size_failure_prevents_parsing() {
        let mut req = post("application/json", r#"{"too":"large"}"#);
        let config = BodyParserConfig::default().max_body_size(4);

        match read_and_dispatch(config, &mut req).await {
            Outcome::Abort(e) => assert_eq!(e.code(), "PayloadTooLarge"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(req.param("too"), None);
    }
}
