use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use serde_json::Value;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The body value a request accumulates while it moves through the pipeline.
///
/// It starts `Absent`, becomes `Binary` or `Text` once the stream has been ingested,
/// and a structured parser may finally replace it with `Structured`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BodyValue {
    #[default]
    Absent,
    Binary(Bytes),
    Text(String),
    Structured(Value),
}

impl BodyValue {
    /// Returns true when there is nothing a parser could work on.
    pub fn is_empty(&self) -> bool {
        match self {
            BodyValue::Absent => true,
            BodyValue::Binary(bytes) => bytes.is_empty(),
            BodyValue::Text(text) => text.is_empty(),
            BodyValue::Structured(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BodyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BodyValue::Binary(bytes) => Some(bytes),
            BodyValue::Text(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            BodyValue::Structured(value) => Some(value),
            _ => None,
        }
    }
}

/// Body of a response written by a stage that terminates the pipeline.
#[derive(Debug)]
pub struct ResponseBody {
    inner: Option<Bytes>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Some(bytes) } }
    }

    /// Returns the remaining bytes without consuming the body.
    pub fn bytes(&self) -> Option<&Bytes> {
        self.inner.as_ref()
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().inner.take().map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            None => SizeHint::with_exact(0),
            Some(bytes) => SizeHint::with_exact(bytes.len() as u64),
        }
    }
}
