use bytes::{Bytes, BytesMut};
use flate2::write::{GzDecoder, ZlibDecoder};
use http::HeaderMap;
use http::header::CONTENT_ENCODING;
use std::io;
use std::io::Write;
use tracing::trace;

/// Streaming decompressor for a `Content-Encoding` of the request body.
///
/// Compressed chunks go in through [`Decoder::write`], the decompressed output
/// produced so far comes out of [`Decoder::take`]. Output keeps the input order.
pub(crate) enum Decoder {
    Gzip(Box<GzDecoder<Writer>>),
    Deflate(Box<ZlibDecoder<Writer>>),
}

impl Decoder {
    /// Picks the decoder for the request, `None` means the body is stored as sent.
    pub(crate) fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let encoding = headers.get(CONTENT_ENCODING)?.to_str().ok()?.trim();

        if encoding.eq_ignore_ascii_case("gzip") {
            Some(Self::Gzip(Box::new(GzDecoder::new(Writer::new()))))
        } else if encoding.eq_ignore_ascii_case("deflate") {
            Some(Self::Deflate(Box::new(ZlibDecoder::new(Writer::new()))))
        } else {
            None
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Gzip(_) => "gzip",
            Self::Deflate(_) => "deflate",
        }
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let result = match self {
            Self::Gzip(decoder) => decoder.write_all(data),
            Self::Deflate(decoder) => decoder.write_all(data),
        };
        if let Err(e) = &result {
            trace!(encoding = self.name(), cause = %e, "error decoding request body");
        }
        result
    }

    pub(crate) fn take(&mut self) -> Bytes {
        match self {
            Self::Gzip(decoder) => decoder.get_mut().take(),
            Self::Deflate(decoder) => decoder.get_mut().take(),
        }
    }

    /// Flushes the tail of the compressed stream, fails on a truncated stream.
    pub(crate) fn finish(self) -> io::Result<Bytes> {
        let writer = match self {
            Self::Gzip(decoder) => decoder.finish()?,
            Self::Deflate(decoder) => decoder.finish()?,
        };
        Ok(writer.buf.freeze())
    }
}

pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
