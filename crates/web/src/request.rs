//! The per-request state every pipeline stage works on.
//!
//! A [`Request`] is created by the transport layer for one inbound request, mutated
//! in place by each stage, and dropped once the response has been written. It owns:
//! - the [`RequestHeader`]
//! - the untouched body stream, until a stage takes it
//! - the accumulated [`BodyValue`]
//! - the parameter value that structured parsers merge into
//! - files uploaded through `multipart/form-data`

use bytes::Bytes;
use http::{HeaderMap, Method};
use micro_ingest_http::protocol::RequestHeader;
use micro_ingest_http::protocol::body::ReqBody;
use serde_json::{Map, Value};

use crate::body::BodyValue;

#[derive(Debug)]
pub struct Request {
    header: RequestHeader,
    body_stream: Option<ReqBody>,
    body: BodyValue,
    raw_body: Option<String>,
    params: Value,
    files: Vec<UploadedFile>,
}

/// A file part of a `multipart/form-data` body, kept in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Request {
    pub fn new(header: RequestHeader, body: ReqBody) -> Self {
        Self {
            header,
            body_stream: Some(body),
            body: BodyValue::Absent,
            raw_body: None,
            params: Value::Object(Map::new()),
            files: Vec::new(),
        }
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn method(&self) -> &Method {
        self.header.method()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.header.headers()
    }

    /// Shortcut for [`RequestHeader::content_type`].
    pub fn content_type(&self) -> String {
        self.header.content_type()
    }

    /// Takes the body stream out of the request; later calls return `None`.
    pub fn take_body_stream(&mut self) -> Option<ReqBody> {
        self.body_stream.take()
    }

    pub fn has_body_stream(&self) -> bool {
        self.body_stream.is_some()
    }

    pub fn body(&self) -> &BodyValue {
        &self.body
    }

    pub fn set_body(&mut self, body: BodyValue) {
        self.body = body;
    }

    pub fn take_body(&mut self) -> BodyValue {
        std::mem::take(&mut self.body)
    }

    /// The body text as it was before a structured parser replaced it.
    ///
    /// Only kept when parameter mapping is disabled.
    pub fn raw_body(&self) -> Option<&str> {
        self.raw_body.as_deref()
    }

    pub(crate) fn set_raw_body(&mut self, raw: String) {
        self.raw_body = Some(raw);
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Value {
        &mut self.params
    }

    /// Looks up a named parameter; `None` when the parameters are not an object.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.as_object().and_then(|map| map.get(key))
    }

    pub fn set_params(&mut self, params: Value) {
        self.params = params;
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub(crate) fn push_file(&mut self, file: UploadedFile) {
        self.files.push(file);
    }
}

impl<B: Into<ReqBody>> From<http::Request<B>> for Request {
    fn from(request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(RequestHeader::from(parts), body.into())
    }
}
