use axum::http::HeaderMap;
use dashmap::{mapref::entry::Entry, DashMap};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{domain::value_objects::ClientIdentity, infrastructure::config::EdgeConfig};

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of requests admitted per window
    pub max_requests: u32,
    /// Fixed window length
    pub window_duration: Duration,
    /// Bucket count above which expired buckets are swept on the next request
    pub max_buckets: usize,
    /// Minimum time between opportunistic sweeps
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 120,
            window_duration: Duration::from_secs(60),
            max_buckets: 10_000,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl RateLimitConfig {
    pub fn from_config(config: &EdgeConfig) -> Self {
        Self {
            max_requests: config.rate_limit_threshold,
            window_duration: config.rate_limit_window(),
            max_buckets: config.rate_limit_max_buckets,
            sweep_interval: config.rate_limit_sweep_interval(),
        }
    }
}

/// Request counter for one client within the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitBucket {
    pub count: u32,
    pub reset_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Admitted { count: u32, reset_at: Instant },
    Rejected { count: u32, retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateLimitDecision::Admitted { .. })
    }
}

/// Bookkeeping for opportunistic sweeps
#[derive(Debug, Clone, Copy)]
struct SweepState {
    at: Instant,
    /// Buckets left by the last sweep
    remaining: usize,
}

impl SweepState {
    /// Table size that forces a sweep before `sweep_interval` elapses.
    ///
    /// Live buckets left by the last sweep raise the bar to twice their
    /// count, so a table full of live clients is not rescanned per request.
    fn capacity_trigger(&self, max_buckets: usize) -> usize {
        max_buckets.max(self.remaining.saturating_mul(2))
    }
}

/// In-memory fixed-window rate limiter keyed by client identity.
///
/// Each check runs under the map's entry lock for that key, so concurrent
/// requests from one client are counted exactly. Limits are per process.
#[derive(Debug, Clone)]
pub struct FixedWindowRateLimiter {
    config: RateLimitConfig,
    buckets: Arc<DashMap<ClientIdentity, RateLimitBucket>>,
    sweep_state: Arc<Mutex<SweepState>>,
}

impl FixedWindowRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(DashMap::new()),
            sweep_state: Arc::new(Mutex::new(SweepState { at: Instant::now(), remaining: 0 })),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request from `identity` against the current window
    pub fn check(&self, identity: &ClientIdentity) -> RateLimitDecision {
        self.check_at(identity, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading
    pub fn check_at(&self, identity: &ClientIdentity, now: Instant) -> RateLimitDecision {
        let fresh = RateLimitBucket { count: 1, reset_at: now + self.config.window_duration };

        let decision = match self.buckets.entry(identity.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(fresh);
                RateLimitDecision::Admitted { count: 1, reset_at: fresh.reset_at }
            }
            Entry::Occupied(mut entry) => {
                let bucket = entry.get_mut();
                if bucket.reset_at < now {
                    *bucket = fresh;
                    RateLimitDecision::Admitted { count: 1, reset_at: fresh.reset_at }
                } else {
                    // Rejected requests still count; the window is not extended
                    bucket.count = bucket.count.saturating_add(1);
                    if bucket.count > self.config.max_requests {
                        RateLimitDecision::Rejected {
                            count: bucket.count,
                            retry_after: self.config.window_duration,
                        }
                    } else {
                        RateLimitDecision::Admitted {
                            count: bucket.count,
                            reset_at: bucket.reset_at,
                        }
                    }
                }
            }
        };

        // The entry guard is released above; sweeping locks every shard
        self.maybe_sweep(now);

        decision
    }

    /// Current bucket for `identity`, if any
    pub fn bucket(&self, identity: &ClientIdentity) -> Option<RateLimitBucket> {
        self.buckets.get(identity).map(|bucket| *bucket)
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Remove every bucket whose window ended before `now`
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.reset_at >= now);
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            debug!(removed, remaining = self.buckets.len(), "Swept expired rate limit buckets");
        }
        removed
    }

    fn maybe_sweep(&self, now: Instant) {
        // Another request already sweeping is as good as sweeping here
        let Ok(mut state) = self.sweep_state.try_lock() else {
            return;
        };

        let over_capacity = self.buckets.len() > state.capacity_trigger(self.config.max_buckets);
        let interval_elapsed =
            now.saturating_duration_since(state.at) >= self.config.sweep_interval;

        if over_capacity || interval_elapsed {
            self.sweep_expired(now);
            *state = SweepState { at: now, remaining: self.buckets.len() };
        }
    }

    /// Periodically sweep expired buckets in the background
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.config.sweep_interval.max(Duration::from_secs(1));
        info!(period_secs = period.as_secs(), "Starting rate limit bucket sweeper");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                limiter.sweep_expired(Instant::now());
            }
        })
    }
}

/// Derive the rate limiter key for a request.
///
/// Order: first `x-forwarded-for` entry, `x-real-ip`, connection peer, then
/// the `unknown` sentinel.
pub fn extract_client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientIdentity {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(address) = forwarded {
        return ClientIdentity::new(address);
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(address) = real_ip {
        return ClientIdentity::new(address);
    }

    peer.map_or_else(ClientIdentity::unknown, |addr| ClientIdentity::new(&addr.ip().to_string()))
}
