//! Reading the request body stream into a single in-memory value.
//!
//! [`BodyReader`] drains the body stream of a request, decompressing `gzip` and
//! `deflate` bodies on the fly, and stores the concatenated result as the request
//! body once the stream ended. The size ceiling and the `Content-MD5` digest are
//! verified at that point.

mod decoder;
mod integrity;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use http_body_util::BodyExt;
use tracing::{debug, trace, warn};

use crate::body::BodyValue;
use crate::config::BodyParserConfig;
use crate::dispatch::BodyDispatcher;
use crate::error::BodyError;
use crate::pipeline::{Outcome, Stage};
use crate::request::Request;

use decoder::Decoder;
use integrity::{ContentDigest, Ingested};

const CONTENT_MD5: &str = "content-md5";

/// The reader and dispatcher stages sharing one configuration.
pub fn body_parser(config: BodyParserConfig) -> [Box<dyn Stage>; 2] {
    let config = Arc::new(config);
    [Box::new(BodyReader::shared(Arc::clone(&config))), Box::new(BodyDispatcher::shared(config))]
}

#[derive(Debug, Clone)]
pub struct BodyReader {
    config: Arc<BodyParserConfig>,
}

impl BodyReader {
    pub fn new(config: BodyParserConfig) -> Self {
        Self::shared(Arc::new(config))
    }

    pub(crate) fn shared(config: Arc<BodyParserConfig>) -> Self {
        Self { config }
    }
}

/// Content types the reader leaves unread for a streaming parser.
fn is_streamed(content_type: &str) -> bool {
    content_type == mime::MULTIPART_FORM_DATA.essence_str() || content_type == mime::APPLICATION_OCTET_STREAM.essence_str()
}

/// Content types whose body is stored as text rather than bytes.
fn is_textual(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type == mime::APPLICATION_JSON.essence_str()
        || content_type == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()
        || content_type == mime::MULTIPART_FORM_DATA.essence_str()
        || content_type.starts_with("text/")
}

#[async_trait]
impl Stage for BodyReader {
    async fn process(&self, req: &mut Request) -> Outcome {
        let payload_size = match req.header().payload_size() {
            Ok(payload_size) => payload_size,
            Err(e) => return Outcome::Abort(e.into()),
        };
        let content_type = req.content_type();

        if payload_size.is_empty() || is_streamed(&content_type) {
            trace!(?payload_size, content_type = %content_type, "skip reading request body");
            return Outcome::Continue;
        }

        let Some(mut stream) = req.take_body_stream() else {
            return Outcome::Continue;
        };

        let max_body_size = self.config.max_body_size;
        let mut digest = req.header().header_str(CONTENT_MD5).map(ContentDigest::new);
        let mut decoder = Decoder::from_headers(req.headers());
        let mut buf = BytesMut::new();
        let mut received: u64 = 0;
        let mut exceeded = false;

        while let Some(frame) = stream.frame().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(cause = %e, "request body stream failed");
                    return Outcome::Abort(BodyError::Transport(e));
                }
            };
            let Ok(chunk) = frame.into_data() else {
                continue;
            };

            if max_body_size > 0 {
                received += chunk.len() as u64;
                if received > max_body_size {
                    if !exceeded {
                        warn!(received, max_body_size, "request body exceeds the size limit, dropping the rest");
                        exceeded = true;
                    }
                    continue;
                }
            }
            trace!(size = chunk.len(), received, "read request body chunk");

            if let Some(digest) = digest.as_mut() {
                digest.update(&chunk);
            }

            match decoder.as_mut() {
                Some(decoder) => {
                    if let Err(e) = decoder.write(&chunk) {
                        return Outcome::Abort(BodyError::invalid_content(format!("Invalid {} body: {e}", decoder.name())));
                    }
                    buf.extend_from_slice(&decoder.take());
                }
                None => buf.extend_from_slice(&chunk),
            }
        }

        if !exceeded && let Some(decoder) = decoder {
            let name = decoder.name();
            match decoder.finish() {
                Ok(tail) => buf.extend_from_slice(&tail),
                Err(e) => return Outcome::Abort(BodyError::invalid_content(format!("Invalid {name} body: {e}"))),
            }
        }

        let bytes = buf.freeze();
        let body_is_empty = bytes.is_empty();
        debug!(size = bytes.len(), received, content_type = %content_type, "request body read");

        let body = if is_textual(&content_type) {
            BodyValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            BodyValue::Binary(bytes)
        };
        req.set_body(body);

        let ingested = Ingested { max_body_size, received, body_is_empty, digest, require_digest: self.config.require_digest };
        ingested.check().into()
    }

    fn name(&self) -> &'static str {
        "body_reader"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{chunked, post, request};
    use bytes::Bytes;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use http::Method;
    use micro_ingest_http::protocol::ParseError;
    use micro_ingest_http::protocol::body::ReqBody;
    use std::io::Write;

    const HELLO_WORLD_MD5: &str = "XrY7u+Ae7tCTyyK7j1rNww==";

    fn reader() -> BodyReader {
        BodyReader::new(BodyParserConfig::default())
    }

    fn pieces(parts: &[&'static str]) -> Vec<Bytes> {
        parts.iter().map(|part| Bytes::from_static(part.as_bytes())).collect()
    }

    #[tokio::test]
    async fn concatenates_chunks_as_text() {
        let mut req = chunked(Method::POST, &[("Content-Type", "text/plain")], pieces(&["hello", " ", "world"]));

        assert!(matches!(reader().process(&mut req).await, Outcome::Continue));
        assert_eq!(req.body(), &BodyValue::Text("hello world".into()));
        assert!(!req.has_body_stream());
    }

    #[tokio::test]
    async fn absent_content_type_is_text() {
        let mut req = chunked(Method::POST, &[], pieces(&["abc"]));

        assert!(matches!(reader().process(&mut req).await, Outcome::Continue));
        assert_eq!(req.body().as_text(), Some("abc"));
    }

    #[tokio::test]
    async fn other_types_are_binary() {
        let mut req = chunked(Method::PUT, &[("Content-Type", "image/png")], vec![Bytes::from_static(b"\x89PNG\xff")]);

        assert!(matches!(reader().process(&mut req).await, Outcome::Continue));
        assert_eq!(req.body(), &BodyValue::Binary(Bytes::from_static(b"\x89PNG\xff")));
    }

    #[tokio::test]
    async fn skips_empty_and_streamed_bodies() {
        let mut req = request(Method::POST, &[("Content-Length", "0")], ReqBody::empty());
        assert!(matches!(reader().process(&mut req).await, Outcome::Continue));
        assert!(req.has_body_stream());
        assert_eq!(req.body(), &BodyValue::Absent);

        for content_type in ["multipart/form-data; boundary=x", "application/octet-stream"] {
            let mut req = chunked(Method::POST, &[("Content-Type", content_type)], pieces(&["data"]));
            assert!(matches!(reader().process(&mut req).await, Outcome::Continue));
            assert!(req.has_body_stream());
            assert_eq!(req.body(), &BodyValue::Absent);
        }
    }

    #[tokio::test]
    async fn invalid_content_length() {
        let mut req = request(Method::POST, &[("Content-Length", "12a")], ReqBody::from("hello"));

        match reader().process(&mut req).await {
            Outcome::Abort(BodyError::Transport(ParseError::InvalidContentLength { .. })) => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn digest_match_and_mismatch() {
        let mut req = chunked(
            Method::POST,
            &[("Content-Type", "text/plain"), ("Content-MD5", HELLO_WORLD_MD5)],
            pieces(&["hello ", "world"]),
        );
        assert!(matches!(reader().process(&mut req).await, Outcome::Continue));

        let mut req =
            chunked(Method::POST, &[("Content-Type", "text/plain"), ("Content-MD5", HELLO_WORLD_MD5)], pieces(&["hello"]));
        match reader().process(&mut req).await {
            Outcome::Abort(e) => assert_eq!(e.code(), "BadDigest"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn size_limit_wins_over_digest() {
        let reader = BodyReader::new(BodyParserConfig::default().max_body_size(8));
        let mut req = chunked(
            Method::POST,
            &[("Content-Type", "text/plain"), ("Content-MD5", "bm90IHRoZSBkaWdlc3Q=")],
            pieces(&["hello", " world", " and more"]),
        );

        match reader.process(&mut req).await {
            Outcome::Abort(e) => {
                assert_eq!(e.code(), "PayloadTooLarge");
                assert_eq!(e.to_string(), "Request body size exceeds 8");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        // chunks past the ceiling are dropped
        assert_eq!(req.body().as_text(), Some("hello"));
    }

    #[tokio::test]
    async fn body_at_the_limit_passes() {
        let reader = BodyReader::new(BodyParserConfig::default().max_body_size(11));
        let mut req = chunked(Method::POST, &[("Content-Type", "text/plain")], pieces(&["hello", " world"]));

        assert!(matches!(reader.process(&mut req).await, Outcome::Continue));
        assert_eq!(req.body().as_text(), Some("hello world"));
    }

    #[tokio::test]
    async fn gzip_body_is_decompressed_and_digest_covers_compressed_bytes() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"compressed":true}"#).unwrap();
        let compressed = Bytes::from(encoder.finish().unwrap());

        let md5 = {
            use base64::Engine;
            use md5::Digest;
            base64::engine::general_purpose::STANDARD.encode(md5::Md5::digest(&compressed))
        };

        let (first, second) = compressed.split_at(compressed.len() / 2);
        let mut req = chunked(
            Method::POST,
            &[("Content-Type", "application/json"), ("Content-Encoding", "gzip"), ("Content-MD5", md5.as_str())],
            vec![Bytes::copy_from_slice(first), Bytes::copy_from_slice(second)],
        );

        assert!(matches!(reader().process(&mut req).await, Outcome::Continue));
        assert_eq!(req.body().as_text(), Some(r#"{"compressed":true}"#));
    }

    #[tokio::test]
    async fn corrupt_gzip_is_invalid_content() {
        let mut req = chunked(
            Method::POST,
            &[("Content-Type", "text/plain"), ("Content-Encoding", "gzip")],
            pieces(&["this is not gzip"]),
        );

        match reader().process(&mut req).await {
            Outcome::Abort(e) => assert_eq!(e.code(), "InvalidContent"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_aborts_without_body() {
        let chunks = vec![Ok(Bytes::from_static(b"partial")), Err(ParseError::invalid_body("connection reset"))];
        let mut req = request(
            Method::POST,
            &[("Content-Type", "text/plain"), ("Transfer-Encoding", "chunked")],
            ReqBody::stream(futures::stream::iter(chunks)),
        );

        match reader().process(&mut req).await {
            Outcome::Abort(BodyError::Transport(ParseError::InvalidBody { reason })) => {
                assert_eq!(reason, "connection reset");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(req.body(), &BodyValue::Absent);
    }

    #[tokio::test]
    async fn content_length_body() {
        let mut req = post("application/x-www-form-urlencoded", "a=1&b=2");

        assert!(matches!(reader().process(&mut req).await, Outcome::Continue));
        assert_eq!(req.body().as_text(), Some("a=1&b=2"));
    }

    #[test]
    fn textual_types() {
        assert!(is_textual(""));
        assert!(is_textual("text/csv"));
        assert!(is_textual("application/json"));
        assert!(!is_textual("application/xml"));
        assert!(is_streamed("multipart/form-data"));
        assert!(!is_streamed("text/plain"));
    }
}
