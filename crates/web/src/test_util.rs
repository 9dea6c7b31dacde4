use bytes::Bytes;
use http::Method;
use micro_ingest_http::protocol::body::ReqBody;
use micro_ingest_http::protocol::{ParseError, RequestHeader};

use crate::request::Request;

pub(crate) fn request(method: Method, headers: &[(&str, &str)], body: ReqBody) -> Request {
    let mut builder = http::Request::builder().method(method).uri("/upload");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let header = RequestHeader::from(builder.body(()).unwrap());
    Request::new(header, body)
}

/// A chunked request whose body arrives as the given pieces.
pub(crate) fn chunked(method: Method, headers: &[(&str, &str)], chunks: Vec<Bytes>) -> Request {
    let mut all = vec![("Transfer-Encoding", "chunked")];
    all.extend_from_slice(headers);
    let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, ParseError>));
    request(method, &all, ReqBody::stream(stream))
}

/// A POST with `Content-Length` set to the body size.
pub(crate) fn post(content_type: &str, body: &'static str) -> Request {
    let length = body.len().to_string();
    request(Method::POST, &[("Content-Type", content_type), ("Content-Length", &length)], ReqBody::from(body))
}
