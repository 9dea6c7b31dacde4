use async_trait::async_trait;
use http::header::ACCEPT;
use mime::Mime;
use tracing::{debug, trace};

use crate::error::BodyError;
use crate::pipeline::{Outcome, Stage};
use crate::request::Request;
use crate::responder::Responder;

/// Rejects requests that accept none of the media types the server produces.
///
/// A rejected request is answered right away with `406 Not Acceptable`.
#[derive(Debug, Clone)]
pub struct AcceptGuard {
    acceptable: Vec<Mime>,
    message: String,
}

impl AcceptGuard {
    /// Entries without a `/` are file extensions such as `json` or `csv`; extensions
    /// without a known media type are dropped.
    pub fn new<I, S>(acceptable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let acceptable: Vec<Mime> = acceptable
            .into_iter()
            .filter_map(|entry| {
                let entry = entry.as_ref().trim();
                if entry.is_empty() {
                    None
                } else if entry.contains('/') {
                    entry.parse().ok()
                } else {
                    mime_guess::from_ext(entry).first()
                }
            })
            .collect();

        let names: Vec<&str> = acceptable.iter().map(Mime::essence_str).collect();
        let message = format!("Server accepts: {}", names.join(","));

        Self { acceptable, message }
    }

    pub fn acceptable(&self) -> &[Mime] {
        &self.acceptable
    }

    fn accepts(&self, accept: &str) -> bool {
        accept.split(',').filter_map(MediaRange::parse).any(|range| range.quality > 0.0 && self.acceptable.iter().any(|mime| range.matches(mime)))
    }
}

struct MediaRange<'a> {
    type_: &'a str,
    subtype: &'a str,
    quality: f32,
}

impl<'a> MediaRange<'a> {
    fn parse(range: &'a str) -> Option<Self> {
        let mut parts = range.split(';');
        let (type_, subtype) = parts.next()?.trim().split_once('/')?;

        let quality = parts
            .filter_map(|param| param.trim().split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(1.0);

        Some(Self { type_: type_.trim(), subtype: subtype.trim(), quality })
    }

    fn matches(&self, mime: &Mime) -> bool {
        if self.type_ == "*" {
            return self.subtype == "*";
        }
        if !self.type_.eq_ignore_ascii_case(mime.type_().as_str()) {
            return false;
        }
        let subtype = mime.essence_str().split_once('/').map_or("", |(_, subtype)| subtype);
        self.subtype == "*" || self.subtype.eq_ignore_ascii_case(subtype)
    }
}

#[async_trait]
impl Stage for AcceptGuard {
    async fn process(&self, req: &mut Request) -> Outcome {
        let accept = req.header().header_str(ACCEPT.as_str()).map(str::trim).unwrap_or_default();
        if accept.is_empty() || self.accepts(accept) {
            trace!(accept, "request is acceptable");
            return Outcome::Continue;
        }

        debug!(accept, acceptable = %self.message, "request is not acceptable");
        let response = BodyError::NotAcceptable(self.message.clone()).response_to(req);
        Outcome::Terminate(response)
    }

    fn name(&self) -> &'static str {
        "accept"
    }
}
