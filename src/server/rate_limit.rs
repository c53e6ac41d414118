//! Per-IP fixed-window rate limiting (spec §4.9, §6: `API_RATE_LIMIT`,
//! default 100 requests per 60s window).

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::runtime::Runtime;

const WINDOW: Duration = Duration::from_secs(60);

struct Window {
    started_at: Instant,
    count: u32,
}

/// Shared counter state, one entry per client IP. Installed into the axum
/// router as a distinct piece of `State` alongside the `Runtime`.
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, ip: IpAddr, limit: u32) -> bool {
        let mut guard = self.windows.lock().unwrap();
        let now = Instant::now();
        let window = guard.entry(ip).or_insert(Window { started_at: now, count: 0 });

        if now.duration_since(window.started_at) >= WINDOW {
            window.started_at = now;
            window.count = 0;
        }

        window.count += 1;
        window.count <= limit
    }
}

pub async fn enforce(
    State(runtime): State<Arc<Runtime>>,
    State(limiter): State<RateLimiter>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if limiter.check(addr.ip(), runtime.config.rate_limit_per_minute) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..3 {
            assert!(limiter.check(ip, 3));
        }
        assert!(!limiter.check(ip, 3));
    }

    #[test]
    fn separate_ips_have_independent_windows() {
        let limiter = RateLimiter::new();
        let a: IpAddr = "127.0.0.1".parse().unwrap();
        let b: IpAddr = "127.0.0.2".parse().unwrap();
        for _ in 0..5 {
            assert!(limiter.check(a, 5));
        }
        assert!(limiter.check(b, 5));
    }
}
