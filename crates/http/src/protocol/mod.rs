//! Protocol types shared between a transport and the body pipeline.
//!
//! - **Message items** ([`message`]): [`PayloadItem`] carries one body chunk or the
//!   end-of-stream marker, [`PayloadSize`] tells whether a body is expected at all
//! - **Request head** ([`request`]): [`RequestHeader`] wraps `http::Request<()>`
//!   and answers the body-related questions the pipeline asks
//! - **Body streaming** ([`body`]): [`body::ReqBody`] is the consumer side,
//!   [`body::ReqBodySender`] the producer side reading from the transport
//! - **Errors** ([`error`]): [`ParseError`]

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod error;
pub use error::ParseError;

pub mod body;
