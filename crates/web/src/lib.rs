//! Request body ingestion and content-type driven parsing.
//!
//! A request moves through a [`Pipeline`] of [`Stage`]s. The standard chain is
//!
//! 1. header guards: [`AcceptGuard`], [`DateGuard`], [`ExpiryGuard`]
//! 2. [`BodyReader`]: drains the body stream under a size limit, decompresses it and
//!    verifies `Content-MD5`
//! 3. [`BodyDispatcher`]: picks the JSON, form, multipart or CSV/TSV parser from the
//!    declared content type and merges the result into the request parameters
//!
//! Every failure is a [`BodyError`] with a stable code and HTTP status.
//!
//! ```no_run
//! use micro_ingest_web::{Flow, Pipeline, PipelineConfig, Request, Responder};
//!
//! # async fn handle(http_request: http::Request<bytes::Bytes>) {
//! let config: PipelineConfig = serde_json::from_str(r#"{"bodyParser":{"maxBodySize":65536}}"#).unwrap();
//! let pipeline = Pipeline::from_config(&config);
//!
//! let mut req = Request::from(http_request);
//! match pipeline.execute(&mut req).await {
//!     Ok(Flow::Completed) => println!("params: {}", req.params()),
//!     Ok(Flow::Terminated(response)) => println!("answered early: {}", response.status()),
//!     Err(e) => {
//!         let response = e.response_to(&req);
//!         println!("failed: {}", response.status());
//!     }
//! }
//! # }
//! ```

mod body;
mod clock;
mod config;
mod dispatch;
mod error;
mod guard;
mod ingest;
mod parser;
mod pipeline;
mod request;
mod responder;

#[cfg(test)]
mod test_util;

pub use body::{BodyValue, ResponseBody};
pub use clock::{Clock, SystemClock};
pub use config::{AcceptConfig, BodyParserConfig, DateConfig, ExpiryConfig, PipelineConfig, Reviver};
pub use dispatch::{BodyDispatcher, ContentKind};
pub use error::BodyError;
pub use guard::{AcceptGuard, DateGuard, ExpiryGuard};
pub use ingest::{BodyReader, body_parser};
pub use pipeline::{Flow, Outcome, Pipeline, PipelineBuilder, Stage};
pub use request::{Request, UploadedFile};
pub use responder::Responder;
