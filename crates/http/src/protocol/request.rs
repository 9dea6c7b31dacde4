//! HTTP request header handling.
//!
//! Wraps the standard `http::Request<()>` and adds the body-related lookups the
//! ingestion pipeline needs.

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize};

/// Represents an HTTP request header.
///
/// This struct wraps a `http::Request<()>` to provide:
/// - Access to standard HTTP header fields
/// - The declared media type of the body
/// - The declared body size (`Content-Length` or chunked transfer)
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl RequestHeader {
    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns the first value of the header as a string, if present and visible ASCII.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the declared media type without parameters, lowercased.
    ///
    /// `Content-Type: Application/JSON; charset=utf-8` yields `application/json`,
    /// an absent header yields an empty string.
    pub fn content_type(&self) -> String {
        self.header_str(CONTENT_TYPE.as_str())
            .map(|value| value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Returns the declared `Content-Length`, if any.
    pub fn content_length(&self) -> Result<Option<u64>, ParseError> {
        let Some(value) = self.inner.headers().get(CONTENT_LENGTH) else {
            return Ok(None);
        };

        let value = value.to_str().map_err(ParseError::invalid_content_length)?.trim();
        ensure!(
            !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            ParseError::invalid_content_length(format!("'{value}' is not a number"))
        );

        value.parse::<u64>().map(Some).map_err(ParseError::invalid_content_length)
    }

    /// Returns true if the body uses chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        self.inner
            .headers()
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
    }

    /// Determines how much body the transport is going to deliver.
    ///
    /// Chunked transfer wins over `Content-Length`; an absent or zero length is empty.
    pub fn payload_size(&self) -> Result<PayloadSize, ParseError> {
        if self.is_chunked() {
            return Ok(PayloadSize::Chunked);
        }

        match self.content_length()? {
            None | Some(0) => Ok(PayloadSize::Empty),
            Some(length) => Ok(PayloadSize::Length(length)),
        }
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
