use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use enx_platform::AuthSettings;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, warn};

use crate::{error::ApiError, state::AppState};

pub type AuthRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// A burst of `rate_limit_max` attempts per client address, refilled one
/// attempt per `rate_limit_window`. At most `rate_limit_max + 1` attempts
/// fit in any single window.
pub fn build_auth_limiter(settings: &AuthSettings) -> Result<AuthRateLimiter> {
    let burst = NonZeroU32::new(settings.rate_limit_max).context("rate limit max is zero")?;
    let quota = Quota::with_period(settings.rate_limit_window)
        .context("rate limit window is zero")?
        .allow_burst(burst);
    Ok(RateLimiter::keyed(quota))
}

/// Drops addresses whose budget has fully refilled. Returns the entries left.
pub fn prune(limiter: &AuthRateLimiter) -> usize {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    limiter.len()
}

/// Prunes the limiter every `every` for the life of the process.
pub fn spawn_pruning(limiter: Arc<AuthRateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let tracked = prune(&limiter);
            debug!(tracked, "auth rate limiter pruned");
        }
    })
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn limit_auth_attempts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    if state.auth_limiter.check_key(&ip).is_err() {
        warn!(client = %ip, path = %request.uri().path(), "auth rate limit exceeded");
        return ApiError::TooManyRequests(
            "Too many authentication attempts, please try again later.".to_string(),
        )
        .into_response();
    }
    next.run(request).await
}
