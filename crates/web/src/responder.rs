//! Conversion of pipeline results into HTTP responses.
//!
//! Stages that short-circuit a request build their response through the [`Responder`]
//! trait, and a downstream error handler can use the [`BodyError`] implementation to
//! render failures returned by [`Pipeline::execute`](crate::Pipeline::execute).
//!
//! Failures are rendered as a JSON document with a stable `code` and a human
//! readable `message`:
//!
//! ```json
//! {"code":"PayloadTooLarge","message":"Request body size exceeds 1024"}
//! ```

use crate::body::ResponseBody;
use crate::error::BodyError;
use crate::request::Request;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use serde_json::{Value, json};

const APPLICATION_JSON: &str = "application/json";

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn response_to(self, req: &Request) -> Response<ResponseBody>;
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &Request) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

impl Responder for Value {
    fn response_to(self, _req: &Request) -> Response<ResponseBody> {
        with_content_type(ResponseBody::from(self.to_string()), APPLICATION_JSON)
    }
}

impl Responder for BodyError {
    fn response_to(self, req: &Request) -> Response<ResponseBody> {
        let status = self.status_code();
        let document = json!({ "code": self.code(), "message": self.to_string() });
        (status, document).response_to(req)
    }
}

fn with_content_type(body: ResponseBody, content_type: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
