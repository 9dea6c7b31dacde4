//! Request body streaming.
//!
//! The body handling consists of two components:
//!
//! - [`ReqBody`]: the consumer side that implements the `http_body::Body` trait
//! - [`ReqBodySender`]: the producer side that reads from the transport payload stream
//!
//! They communicate through channels: an MPSC channel carries chunk requests from
//! the consumer, and each request is answered through its own oneshot channel. The
//! producer therefore never reads ahead of the consumer, and chunks are delivered in
//! the order the transport produced them.
//!
//! Transport errors are delivered to the consumer unchanged so the pipeline can
//! report them without reclassifying.

mod req_body;

pub use req_body::ReqBody;
pub use req_body::ReqBodySender;
