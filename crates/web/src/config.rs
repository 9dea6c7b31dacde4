//! Configuration of the pipeline stages.
//!
//! Every section is fixed when the chain is built and shared read-only by the stages.
//! The sections deserialize from the camelCase option names, e.g.
//!
//! ```json
//! {
//!   "accept": { "acceptable": ["json", "text/csv"] },
//!   "date": { "clockSkew": 300 },
//!   "expiry": { "header": "x-request-expiry-time" },
//!   "bodyParser": { "maxBodySize": 1048576, "rejectUnknown": true }
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Hook applied to every primitive of a decoded JSON document.
///
/// Receives the member key (or the array index as text) and the decoded value, and
/// returns the value to keep.
pub type Reviver = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BodyParserConfig {
    /// Ceiling for the accumulated raw body in bytes, `0` disables the check.
    pub max_body_size: u64,
    pub request_body_on_get: bool,
    pub reject_unknown: bool,
    pub override_params: bool,
    pub map_params: bool,
    pub require_digest: bool,
    #[serde(skip)]
    pub reviver: Option<Reviver>,
}

impl Default for BodyParserConfig {
    fn default() -> Self {
        Self {
            max_body_size: 0,
            request_body_on_get: false,
            reject_unknown: false,
            override_params: false,
            map_params: true,
            require_digest: false,
            reviver: None,
        }
    }
}

impl BodyParserConfig {
    pub fn max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub fn request_body_on_get(mut self, enable: bool) -> Self {
        self.request_body_on_get = enable;
        self
    }

    pub fn reject_unknown(mut self, enable: bool) -> Self {
        self.reject_unknown = enable;
        self
    }

    pub fn override_params(mut self, enable: bool) -> Self {
        self.override_params = enable;
        self
    }

    pub fn map_params(mut self, enable: bool) -> Self {
        self.map_params = enable;
        self
    }

    pub fn require_digest(mut self, enable: bool) -> Self {
        self.require_digest = enable;
        self
    }

    pub fn reviver<F>(mut self, reviver: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        self.reviver = Some(Arc::new(reviver));
        self
    }
}

impl fmt::Debug for BodyParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyParserConfig")
            .field("max_body_size", &self.max_body_size)
            .field("request_body_on_get", &self.request_body_on_get)
            .field("reject_unknown", &self.reject_unknown)
            .field("override_params", &self.override_params)
            .field("map_params", &self.map_params)
            .field("require_digest", &self.require_digest)
            .field("reviver", &self.reviver.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AcceptConfig {
    /// Media types or file extension shorthands such as `json`.
    pub acceptable: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateConfig {
    /// Tolerated age of the `Date` header in seconds.
    pub clock_skew: u64,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self { clock_skew: 300 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpiryConfig {
    /// Name of the header carrying the expiry time in epoch milliseconds.
    pub header: String,
}

/// The sections of a standard chain; absent guard sections leave the guard out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    pub accept: Option<AcceptConfig>,
    pub date: Option<DateConfig>,
    pub expiry: Option<ExpiryConfig>,
    pub body_parser: Option<BodyParserConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { accept: None, date: None, expiry: None, body_parser: Some(BodyParserConfig::default()) }
    }
}
