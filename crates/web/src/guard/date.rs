use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::DATE;
use tracing::trace;

use crate::clock::{Clock, SystemClock};
use crate::error::BodyError;
use crate::pipeline::{Outcome, Stage};
use crate::request::Request;

const DEFAULT_CLOCK_SKEW: u64 = 300;

/// Rejects requests whose `Date` header is older than the allowed clock skew.
///
/// Dates in the future are accepted.
#[derive(Clone)]
pub struct DateGuard {
    clock_skew: Duration,
    clock: Arc<dyn Clock>,
}

impl DateGuard {
    /// `clock_skew` is in seconds, zero falls back to five minutes.
    pub fn new(clock_skew: u64) -> Self {
        Self::with_clock(clock_skew, SystemClock)
    }

    pub fn with_clock(clock_skew: u64, clock: impl Clock + 'static) -> Self {
        let clock_skew = if clock_skew == 0 { DEFAULT_CLOCK_SKEW } else { clock_skew };
        Self { clock_skew: Duration::from_secs(clock_skew), clock: Arc::new(clock) }
    }

    fn check(&self, date: &str) -> Result<(), BodyError> {
        let sent = httpdate::parse_http_date(date).map_err(|e| {
            trace!(date, error = %e, "bad Date header");
            BodyError::InvalidHeader("Date header is invalid".to_string())
        })?;
        let now = self.clock.now();

        trace!(allowed_skew = ?self.clock_skew, ?now, ?sent, "checking clock skew");
        match now.duration_since(sent) {
            Ok(age) if age > self.clock_skew => Err(BodyError::RequestExpired(format!("Date header {date} is too old"))),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for DateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateGuard").field("clock_skew", &self.clock_skew).finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for DateGuard {
    async fn process(&self, req: &mut Request) -> Outcome {
        let Some(date) = req.headers().get(DATE) else {
            return Outcome::Continue;
        };
        let Ok(date) = date.to_str() else {
            return Outcome::Abort(BodyError::InvalidHeader("Date header is invalid".to_string()));
        };
        self.check(date).into()
    }

    fn name(&self) -> &'static str {
        "date"
    }
}
