use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use tracing::trace;

use crate::clock::{Clock, SystemClock};
use crate::error::BodyError;
use crate::pipeline::{Outcome, Stage};
use crate::request::Request;

/// Rejects requests whose expiry header, in epoch milliseconds, lies in the past.
///
/// Values that are not numbers are ignored.
#[derive(Clone)]
pub struct ExpiryGuard {
    header: String,
    clock: Arc<dyn Clock>,
}

impl ExpiryGuard {
    pub fn new(header: impl Into<String>) -> Self {
        Self::with_clock(header, SystemClock)
    }

    pub fn with_clock(header: impl Into<String>, clock: impl Clock + 'static) -> Self {
        Self { header: header.into(), clock: Arc::new(clock) }
    }

    fn now_millis(&self) -> f64 {
        // a clock before the epoch never expires anything
        self.clock.now().duration_since(UNIX_EPOCH).map_or(0.0, |elapsed| elapsed.as_secs_f64() * 1000.0)
    }
}

impl std::fmt::Debug for ExpiryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryGuard").field("header", &self.header).finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for ExpiryGuard {
    async fn process(&self, req: &mut Request) -> Outcome {
        let Some(expiry) = req.header().header_str(&self.header).map(str::trim).filter(|value| !value.is_empty()) else {
            return Outcome::Continue;
        };
        let Ok(expiry_time) = expiry.parse::<f64>() else {
            trace!(header = %self.header, expiry, "ignore expiry header that is not a number");
            return Outcome::Continue;
        };

        let now = self.now_millis();
        if now > expiry_time {
            trace!(now, expiry_time, "request has expired");
            return Outcome::Abort(BodyError::GatewayTimeout("Request has expired".to_string()));
        }
        Outcome::Continue
    }

    fn name(&self) -> &'static str {
        "expiry"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::test_util::request;
    use http::{Method, StatusCode};
    use micro_ingest_http::protocol::body::ReqBody;
    use std::time::Duration;

    const HEADER: &str = "x-request-expiry-time";
    const NOW_MS: u64 = 1_700_000_000_000;

    fn guard() -> ExpiryGuard {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(UNIX_EPOCH + Duration::from_millis(NOW_MS));
        ExpiryGuard::with_clock(HEADER, clock)
    }

    async fn process_expiry(value: &str) -> Outcome {
        let mut req = request(Method::POST, &[(HEADER, value)], ReqBody::empty());
        guard().process(&mut req).await
    }

    #[tokio::test]
    async fn expired_request() {
        match process_expiry(&(NOW_MS - 1).to_string()).await {
            Outcome::Abort(e) => {
                assert_eq!(e.status_code(), StatusCode::GATEWAY_TIMEOUT);
                assert_eq!(e.to_string(), "Request has expired");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn pending_request_passes() {
        assert!(matches!(process_expiry(&(NOW_MS + 1000).to_string()).await, Outcome::Continue));
        assert!(matches!(process_expiry(&NOW_MS.to_string()).await, Outcome::Continue));
    }

    #[tokio::test]
    async fn non_numeric_and_absent_pass() {
        assert!(matches!(process_expiry("tomorrow").await, Outcome::Continue));

        let mut req = request(Method::POST, &[], ReqBody::empty());
        assert!(matches!(guard().process(&mut req).await, Outcome::Continue));
    }
}
