//! The host's own addresses, so they can be ignored in the block log.

use arc_swap::ArcSwap;
use rampart_core::config::SelfIpConfig;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Current set of addresses belonging to this host.
///
/// Readers get a stale-but-consistent snapshot. The refresh task replaces
/// the whole set atomically and never mutates it in place, so a read racing
/// a refresh sees either the old set or the new one, never a mix.
pub struct SelfAddrs {
    current: ArcSwap<HashSet<IpAddr>>,
}

impl SelfAddrs {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(HashSet::new()),
        }
    }

    pub fn current(&self) -> Arc<HashSet<IpAddr>> {
        self.current.load_full()
    }

    pub fn replace(&self, addrs: HashSet<IpAddr>) {
        self.current.store(Arc::new(addrs));
    }

    /// Query every configured echo endpoint and swap in whatever resolved.
    /// When nothing resolves the previous snapshot stays in place, a
    /// transient outage must not make the host start reporting itself.
    pub async fn refresh(&self, http: &reqwest::Client, urls: &[String]) {
        let mut addrs = HashSet::new();
        for url in urls {
            match fetch_addr(http, url).await {
                Ok(addr) => {
                    addrs.insert(addr);
                }
                Err(e) => warn!(url = %url, error = %e, "Self-address lookup failed"),
            }
        }

        if addrs.is_empty() {
            warn!("No self-addresses resolved, keeping previous snapshot");
            return;
        }
        debug!(count = addrs.len(), "Self-address snapshot refreshed");
        self.replace(addrs);
    }
}

impl Default for SelfAddrs {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch_addr(http: &reqwest::Client, url: &str) -> anyhow::Result<IpAddr> {
    let body = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(body.trim().parse()?)
}

/// Periodic refresh on its own timer, fully decoupled from line processing.
/// The initial fetch is expected to have run already; the first tick here
/// fires a full interval later.
pub fn spawn_refresh(addrs: Arc<SelfAddrs>, http: reqwest::Client, config: SelfIpConfig) {
    tokio::spawn(async move {
        let mut tick =
            tokio::time::interval(Duration::from_secs(config.refresh_interval_secs.max(1)));
        tick.tick().await; // consume the immediate first tick
        loop {
            tick.tick().await;
            addrs.refresh(&http, &config.urls).await;
        }
    });
}
