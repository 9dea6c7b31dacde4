use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};
use tracing::warn;

use crate::error::BodyError;

/// Running MD5 over the raw body as it arrived, before any decompression.
pub(crate) struct ContentDigest {
    declared: String,
    hasher: Md5,
}

impl ContentDigest {
    pub(crate) fn new(declared: impl Into<String>) -> Self {
        Self { declared: declared.into(), hasher: Md5::new() }
    }

    pub(crate) fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Compares the base64 encoded digest with the declared `Content-MD5` value.
    pub(crate) fn verify(self) -> Result<(), BodyError> {
        let computed = STANDARD.encode(self.hasher.finalize());
        if computed == self.declared {
            return Ok(());
        }

        warn!(declared = %self.declared, computed = %computed, "request body digest mismatch");
        Err(BodyError::BadDigest(format!("Content-MD5 '{}' didn't match '{}'", self.declared, computed)))
    }
}

/// Facts gathered while the body was read, checked once the stream ended.
pub(crate) struct Ingested {
    pub(crate) max_body_size: u64,
    pub(crate) received: u64,
    pub(crate) body_is_empty: bool,
    pub(crate) digest: Option<ContentDigest>,
    pub(crate) require_digest: bool,
}

impl Ingested {
    /// Size first, then the digest, and nothing at all for an empty body.
    pub(crate) fn check(self) -> Result<(), BodyError> {
        if self.max_body_size > 0 && self.received > self.max_body_size {
            return Err(BodyError::payload_too_large(self.max_body_size));
        }

        if self.body_is_empty {
            return Ok(());
        }

        match self.digest {
            Some(digest) => digest.verify(),
            None if self.require_digest => Err(BodyError::BadDigest("Content-MD5 header is required".to_string())),
            None => Ok(()),
        }
    }
}
