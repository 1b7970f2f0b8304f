// Retry middleware for transient failures. Only GET is ever sent through the client, so replaying
// a request is safe.

use http::Extensions;
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{Middleware, Next, Result};
use std::time::Duration;
use tracing::warn;

const TRANSIENT_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone, Copy)]
pub struct Retry {
    max_retries: u32,
    backoff: Duration,
}

impl Retry {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Delay before retry number `n` (starting at 1): backoff, 2 * backoff, 4 * backoff, ...
    pub fn delay(&self, n: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(n.saturating_sub(1)))
    }
}

fn is_transient(res: &Result<Response>) -> bool {
    match res {
        Ok(r) => TRANSIENT_STATUSES.contains(&r.status()),
        Err(reqwest_middleware::Error::Reqwest(e)) => e.is_connect() || e.is_timeout(),
        Err(_) => false,
    }
}

#[async_trait::async_trait]
impl Middleware for Retry {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let mut retries = 0;
        loop {
            // a request with a streaming body can't be replayed, just send it once
            let Some(attempt) = req.try_clone() else {
                return next.run(req, extensions).await;
            };

            let res = next.clone().run(attempt, extensions).await;
            if retries >= self.max_retries || !is_transient(&res) {
                return res;
            }

            retries += 1;
            let delay = self.delay(retries);
            match &res {
                Ok(r) => warn!(url = %req.url(), status = %r.status(), retries, ?delay, "Transient HTTP status, retrying"),
                Err(err) => warn!(url = %req.url(), %err, retries, ?delay, "Request failed, retrying"),
            }
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_delays() {
        let r = Retry::new(3, Duration::from_secs(1));
        assert_eq!(Duration::from_secs(1), r.delay(1));
        assert_eq!(Duration::from_secs(2), r.delay(2));
        assert_eq!(Duration::from_secs(4), r.delay(3));
    }

    #[test]
    fn zero_backoff() {
        let r = Retry::new(3, Duration::ZERO);
        assert_eq!(Duration::ZERO, r.delay(3));
    }
}
