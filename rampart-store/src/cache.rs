//! Durable map of source address → last confirmed report time.
//!
//! The store is plain text, one `<address> <unix-timestamp>` pair per line.
//! It is loaded once at startup and fully rewritten on every save: first to
//! a `.tmp` sibling, then renamed over the final path, so a crash mid-write
//! never corrupts the stored history.

use rampart_core::error::RampartError;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ReportCache {
    path: PathBuf,
    cooldown: Duration,
    entries: HashMap<IpAddr, i64>,
}

impl ReportCache {
    /// Load the store from disk.
    ///
    /// A missing file is an empty cache, not an error. A present but
    /// unreadable file is fatal: starting with silently forgotten history
    /// would re-report every address on cooldown.
    pub fn load(path: &Path, cooldown: Duration) -> Result<Self, RampartError> {
        let mut entries = HashMap::new();

        if path.exists() {
            let data = fs::read_to_string(path).map_err(|e| RampartError::CacheLoad {
                path: path.to_path_buf(),
                source: e,
            })?;

            let mut skipped = 0usize;
            for line in data.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let mut fields = line.split(' ');
                let addr = fields.next().and_then(|s| s.parse::<IpAddr>().ok());
                let ts = fields.next().and_then(|s| s.parse::<i64>().ok());
                match (addr, ts) {
                    (Some(addr), Some(ts)) => {
                        entries.insert(addr, ts);
                    }
                    _ => skipped += 1,
                }
            }
            if skipped > 0 {
                warn!(skipped, path = %path.display(), "Skipped malformed cache lines");
            }
            info!(count = entries.len(), path = %path.display(), "Loaded report cache");
        } else {
            info!(path = %path.display(), "No report cache found, starting empty");
        }

        Ok(Self {
            path: path.to_path_buf(),
            cooldown,
            entries,
        })
    }

    /// True while `addr` sits inside the cooldown window measured from its
    /// last confirmed report.
    pub fn is_on_cooldown(&self, addr: IpAddr, now: i64) -> bool {
        self.entries
            .get(&addr)
            .is_some_and(|ts| now - ts < self.cooldown.as_secs() as i64)
    }

    pub fn last_reported(&self, addr: IpAddr) -> Option<i64> {
        self.entries.get(&addr).copied()
    }

    /// Record a confirmed report. Callers must follow up with [`save`] in
    /// the same control path; a crash between the two loses at most the
    /// in-flight entry.
    ///
    /// [`save`]: ReportCache::save
    pub fn mark_reported(&mut self, addr: IpAddr, now: i64) {
        self.entries.insert(addr, now);
    }

    /// Rewrite the whole store atomically.
    pub fn save(&self) -> Result<(), RampartError> {
        let mut body = String::new();
        for (addr, ts) in &self.entries {
            let _ = writeln!(body, "{addr} {ts}");
        }

        let save_err = |e: std::io::Error| RampartError::CacheSave {
            path: self.path.clone(),
            source: e,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(save_err)?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).map_err(save_err)?;
        fs::rename(&tmp, &self.path).map_err(save_err)?;

        debug!(count = self.entries.len(), path = %self.path.display(), "Report cache saved");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Human-readable elapsed time, `1d 2h 3m 4s` style. Zero components are
/// dropped; bare seconds are kept so the result is never empty.
pub fn format_elapsed(secs: i64) -> String {
    let secs = secs.max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn empty_cache(dir: &tempfile::TempDir, cooldown_secs: u64) -> ReportCache {
        ReportCache::load(
            &dir.path().join("reported-ips.txt"),
            Duration::from_secs(cooldown_secs),
        )
        .unwrap()
    }

    // ── load() ────────────────────────────────────────────────────

    #[test]
    fn missing_file_loads_as_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = empty_cache(&dir, 3600);
        assert!(cache.is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped_valid_ones_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reported-ips.txt");
        fs::write(
            &path,
            "51.89.1.2 1700000000\nnot-an-ip 123\n9.9.9.9 not-a-ts\n\n2606:4700::1111 1700000100\n",
        )
        .unwrap();

        let cache = ReportCache::load(&path, Duration::from_secs(3600)).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.last_reported(ip("51.89.1.2")), Some(1_700_000_000));
        assert_eq!(cache.last_reported(ip("2606:4700::1111")), Some(1_700_000_100));
    }

    // ── Cooldown ──────────────────────────────────────────────────

    #[test]
    fn cooldown_holds_inside_the_window_and_expires_after() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = empty_cache(&dir, 3600);
        let addr = ip("51.89.1.2");

        cache.mark_reported(addr, 1_000_000);
        assert!(cache.is_on_cooldown(addr, 1_000_001));
        assert!(cache.is_on_cooldown(addr, 1_003_599));
        assert!(!cache.is_on_cooldown(addr, 1_003_600));
        assert!(!cache.is_on_cooldown(addr, 2_000_000));
    }

    #[test]
    fn unknown_address_is_never_on_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let cache = empty_cache(&dir, 3600);
        assert!(!cache.is_on_cooldown(ip("51.89.1.2"), 1_000_000));
    }

    #[test]
    fn mark_reported_overwrites_the_previous_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = empty_cache(&dir, 3600);
        let addr = ip("51.89.1.2");

        cache.mark_reported(addr, 1_000_000);
        cache.mark_reported(addr, 1_005_000);
        assert_eq!(cache.last_reported(addr), Some(1_005_000));
        assert_eq!(cache.len(), 1);
    }

    // ── save() / round-trip ───────────────────────────────────────

    #[test]
    fn save_then_load_round_trips_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reported-ips.txt");
        let mut cache = ReportCache::load(&path, Duration::from_secs(3600)).unwrap();

        let entries = [
            ("51.89.1.2", 1_700_000_000),
            ("9.9.9.9", 1_700_000_050),
            ("2606:4700::1111", 1_700_000_100),
        ];
        for (addr, ts) in entries {
            cache.mark_reported(ip(addr), ts);
        }
        cache.save().unwrap();

        let reloaded = ReportCache::load(&path, Duration::from_secs(3600)).unwrap();
        assert_eq!(reloaded.len(), entries.len());
        for (addr, ts) in entries {
            assert_eq!(reloaded.last_reported(ip(addr)), Some(ts));
        }
    }

    #[test]
    fn save_leaves_no_tmp_sibling_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reported-ips.txt");
        let mut cache = ReportCache::load(&path, Duration::from_secs(3600)).unwrap();
        cache.mark_reported(ip("51.89.1.2"), 1_700_000_000);
        cache.save().unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/reported-ips.txt");
        let mut cache = ReportCache::load(&path, Duration::from_secs(3600)).unwrap();
        cache.mark_reported(ip("51.89.1.2"), 1_700_000_000);
        cache.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_rewrites_rather_than_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reported-ips.txt");
        let mut cache = ReportCache::load(&path, Duration::from_secs(3600)).unwrap();

        cache.mark_reported(ip("51.89.1.2"), 1);
        cache.save().unwrap();
        cache.mark_reported(ip("51.89.1.2"), 2);
        cache.save().unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body.lines().count(), 1);
        assert_eq!(body.trim(), "51.89.1.2 2");
    }

    // ── format_elapsed() ──────────────────────────────────────────

    #[test]
    fn elapsed_breakdown_drops_zero_components() {
        assert_eq!(format_elapsed(0), "0s");
        assert_eq!(format_elapsed(59), "59s");
        assert_eq!(format_elapsed(60), "1m");
        assert_eq!(format_elapsed(3_600), "1h");
        assert_eq!(format_elapsed(86_400), "1d");
        assert_eq!(format_elapsed(90_061), "1d 1h 1m 1s");
        assert_eq!(format_elapsed(7_262), "2h 1m 2s");
    }

    #[test]
    fn negative_elapsed_clamps_to_zero() {
        assert_eq!(format_elapsed(-5), "0s");
    }
}
