use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;

use futures::channel::{mpsc, oneshot};
use futures::stream::BoxStream;
use futures::{FutureExt, SinkExt, Stream, StreamExt};

use http_body::{Body, Frame, SizeHint};
use tracing::{debug, error, info};

use crate::protocol::{ParseError, PayloadItem};

type PayloadResult = Result<PayloadItem, ParseError>;

/// ReqBody is the streaming request body handed to the ingestion pipeline.
///
/// # Kinds
///
/// - `empty`: the request carries no body
/// - `once`: the whole body is already in memory
/// - `stream`: any boxed stream of chunks, errors are forwarded untouched
/// - channel: created by [`ReqBody::body_channel`], chunks are pulled from the
///   transport by a [`ReqBodySender`] only when this side asks for them
///
/// # Example Flow
///
/// 1. The transport creates a ReqBody/ReqBodySender pair
/// 2. ReqBody is placed into the request and consumed by the pipeline
/// 3. ReqBodySender runs concurrently and answers each chunk request
/// 4. If the pipeline doesn't read the entire body, the remaining data is skipped
pub struct ReqBody {
    inner: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    Stream(BoxStream<'static, Result<Bytes, ParseError>>),
    Channel { signal: mpsc::Sender<oneshot::Sender<PayloadResult>>, receiving: Option<oneshot::Receiver<PayloadResult>> },
}

impl ReqBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Kind::Once(Some(bytes)) } }
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, ParseError>> + Send + 'static,
    {
        Self { inner: Kind::Stream(stream.boxed()) }
    }

    /// Creates a body streaming channel pair for a transport payload stream.
    ///
    /// The returned ReqBody implements `http_body::Body` and is handed to the pipeline,
    /// while ReqBodySender reads from the underlying stream when asked.
    pub fn body_channel<S>(payload_stream: &mut S) -> (ReqBody, ReqBodySender<'_, S>)
    where
        S: Stream<Item = PayloadResult> + Unpin,
    {
        let (signal, receiver) = mpsc::channel(16);

        let req_body = ReqBody { inner: Kind::Channel { signal, receiving: None } };

        let body_sender = ReqBodySender { payload_stream, receiver, eof: false };

        (req_body, body_sender)
    }
}

impl fmt::Debug for ReqBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            Kind::Once(None) => "empty",
            Kind::Once(Some(_)) => "once",
            Kind::Stream(_) => "stream",
            Kind::Channel { .. } => "channel",
        };
        f.debug_struct("ReqBody").field("kind", &kind).finish()
    }
}

impl From<Bytes> for ReqBody {
    fn from(bytes: Bytes) -> Self {
        Self::once(bytes)
    }
}

impl From<String> for ReqBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<&'static str> for ReqBody {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from_static(value.as_bytes()))
    }
}

impl From<()> for ReqBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

/// ReqBodySender reads body chunks from the transport payload stream.
///
/// It answers one chunk request of the paired [`ReqBody`] at a time, so chunks reach
/// the consumer in arrival order and never faster than they are asked for. The EOF
/// flag tracks whether the complete body has been read from the transport.
pub struct ReqBodySender<'conn, S>
where
    S: Stream + Unpin,
{
    payload_stream: &'conn mut S,
    receiver: mpsc::Receiver<oneshot::Sender<PayloadResult>>,
    eof: bool,
}

impl<S> ReqBodySender<'_, S>
where
    S: Stream<Item = PayloadResult> + Unpin,
{
    /// Streams body chunks from the payload stream to the ReqBody consumer.
    ///
    /// Runs until the complete body is streamed, the consumer goes away, or the
    /// transport fails. A transport error is handed to the consumer as-is.
    pub async fn send_body(&mut self) -> Result<(), ParseError> {
        loop {
            if self.eof {
                return Ok(());
            }

            let Some(sender) = self.receiver.next().await else {
                debug!("request body consumer is gone");
                return Ok(());
            };

            match self.payload_stream.next().await {
                Some(Ok(payload_item)) => {
                    if payload_item.is_eof() {
                        self.eof = true;
                    }
                    if sender.send(Ok(payload_item)).is_err() {
                        debug!("request body consumer dropped a pending chunk");
                    }
                }

                Some(Err(e)) => {
                    error!(cause = %e, "payload stream failed");
                    let reason = e.to_string();
                    if sender.send(Err(e)).is_err() {
                        debug!("request body consumer dropped a pending error");
                    }
                    return Err(ParseError::invalid_body(reason));
                }

                None => {
                    error!("cant read body");
                    if sender.send(Err(ParseError::invalid_body("payload stream closed before eof"))).is_err() {
                        debug!("request body consumer dropped a pending error");
                    }
                    return Err(ParseError::invalid_body("cant read body"));
                }
            }
        }
    }

    /// Drains any remaining body chunks from the payload stream.
    ///
    /// Keeps the transport in a clean state when the consumer stopped reading early.
    pub async fn skip_body(&mut self) {
        if !self.eof {
            let mut size: usize = 0;
            while let Some(Ok(payload_item)) = self.payload_stream.next().await {
                if payload_item.is_eof() {
                    self.eof = true;
                    if size > 0 {
                        info!(size = size, "skip request body");
                    }
                    break;
                }

                if let Some(bytes) = payload_item.as_bytes() {
                    size += bytes.len();
                }
            }
        }
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().inner {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Stream(stream) => match ready!(stream.poll_next_unpin(cx)) {
                Some(Ok(bytes)) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                Some(Err(e)) => Poll::Ready(Some(Err(e))),
                None => Poll::Ready(None),
            },
            Kind::Channel { signal, receiving } => loop {
                if let Some(oneshot_receiver) = receiving {
                    let received = ready!(oneshot_receiver.poll_unpin(cx));
                    receiving.take();
                    return match received {
                        Ok(Ok(PayloadItem::Chunk(bytes))) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                        Ok(Ok(PayloadItem::Eof)) => Poll::Ready(None),
                        Ok(Err(e)) => Poll::Ready(Some(Err(e))),
                        Err(_) => Poll::Ready(Some(Err(ParseError::invalid_body("parse body canceled")))),
                    };
                }

                match ready!(signal.poll_ready_unpin(cx)) {
                    Ok(()) => {
                        let (tx, rx) = oneshot::channel();
                        match signal.start_send(tx) {
                            Ok(()) => {
                                *receiving = Some(rx);
                            }
                            Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
                        }
                    }
                    Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
                }
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.inner, Kind::Once(None))
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Stream(_) | Kind::Channel { .. } => SizeHint::default(),
        }
    }
}
