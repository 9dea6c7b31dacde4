//! Transport-facing types for the micro-ingest body pipeline.
//!
//! This crate does not speak HTTP on the wire. It describes what a transport hands
//! to the body pipeline once a request head has been framed:
//!
//! - [`protocol::RequestHeader`]: the request line and headers, with helpers for the
//!   body-related headers (`Content-Type`, `Content-Length`, `Transfer-Encoding`)
//! - [`protocol::body::ReqBody`]: the streaming request body, implementing
//!   `http_body::Body`
//! - [`protocol::body::ReqBodySender`]: the producer side that pulls
//!   [`protocol::PayloadItem`]s from the transport on demand
//! - [`protocol::ParseError`]: errors raised while reading the head or the body
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::Request;
//! use http_body_util::BodyExt;
//! use micro_ingest_http::protocol::body::ReqBody;
//! use micro_ingest_http::protocol::{PayloadItem, RequestHeader};
//!
//! # futures::executor::block_on(async {
//! let request = Request::builder()
//!     .method("POST")
//!     .header("Content-Type", "application/json; charset=utf-8")
//!     .header("Content-Length", "2")
//!     .body(())
//!     .unwrap();
//! let header = RequestHeader::from(request);
//! assert_eq!(header.content_type(), "application/json");
//!
//! let mut payload = futures::stream::iter(vec![Ok(PayloadItem::Chunk(Bytes::from("{}"))), Ok(PayloadItem::Eof)]);
//! let (body, mut sender) = ReqBody::body_channel(&mut payload);
//! let (sent, collected) = futures::join!(sender.send_body(), body.collect());
//! sent.unwrap();
//! assert_eq!(collected.unwrap().to_bytes(), Bytes::from("{}"));
//! # });
//! ```

pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
