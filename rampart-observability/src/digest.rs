//! Daily report digest.
//!
//! Once per UTC day the cache store is re-read, yesterday's entries are
//! bucketed by hour, and the rendered summary goes out through the
//! notification sink. Purely additive observability; any failure here is
//! logged and the next day's run tries again.

use crate::sink::{NotifySink, Severity};
use chrono::{DateTime, Days, NaiveDate, Timelike, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Bucket the given day's cache entries by UTC hour and render a summary.
/// Returns `None` when that day saw no reports.
pub fn build_digest(cache_contents: &str, day: NaiveDate) -> Option<String> {
    let mut hourly = [0u32; 24];
    let mut seen = HashSet::new();

    for line in cache_contents.lines() {
        let mut fields = line.split(' ');
        let (Some(addr), Some(ts)) = (
            fields.next().filter(|s| !s.is_empty()),
            fields.next().and_then(|s| s.parse::<i64>().ok()),
        ) else {
            continue;
        };
        if !seen.insert((addr.to_string(), ts)) {
            continue;
        }
        let Some(when) = DateTime::<Utc>::from_timestamp(ts, 0) else {
            continue;
        };
        if when.date_naive() != day {
            continue;
        }
        hourly[when.hour() as usize] += 1;
    }

    let total: u32 = hourly.iter().sum();
    if total == 0 {
        return None;
    }
    let peak = hourly.iter().copied().max().unwrap_or(0);

    let mut out = format!("Reports sent on {day} (UTC): {total} total\n");
    for (hour, count) in hourly.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let noun = if *count == 1 { "report" } else { "reports" };
        let marker = if *count == peak && peak > 1 { " (peak)" } else { "" };
        out.push_str(&format!("{hour:02}:00-{hour:02}:59: {count} {noun}{marker}\n"));
    }
    Some(out)
}

/// One digest run: read the store, summarize yesterday, notify.
pub fn run_once(cache_path: &Path, sink: &dyn NotifySink) {
    let Some(yesterday) = Utc::now().date_naive().pred_opt() else {
        return;
    };

    let contents = match std::fs::read_to_string(cache_path) {
        Ok(data) => data,
        Err(e) => {
            warn!(error = %e, path = %cache_path.display(), "Digest could not read the cache store");
            return;
        }
    };

    match build_digest(&contents, yesterday) {
        Some(summary) => sink.notify(Severity::Info, &summary),
        None => {
            info!(%yesterday, "No reports yesterday, digest is empty");
            sink.notify(Severity::Info, "No reports were sent yesterday.");
        }
    }
}

/// Fire [`run_once`] shortly after every UTC midnight.
pub fn spawn_daily(cache_path: PathBuf, sink: Arc<dyn NotifySink>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(until_next_utc_midnight()).await;
            run_once(&cache_path, sink.as_ref());
        }
    });
}

fn until_next_utc_midnight() -> std::time::Duration {
    let now = Utc::now();
    (now.date_naive() + Days::new(1))
        .and_hms_opt(0, 0, 0)
        .map(|next| next.and_utc() - now)
        .and_then(|delta| delta.to_std().ok())
        .unwrap_or_else(|| std::time::Duration::from_secs(3_600))
}
