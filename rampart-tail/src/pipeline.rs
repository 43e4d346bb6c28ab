//! The filtering and reporting decision chain, one line at a time.

use rampart_core::netaddr;
use rampart_core::parser;
use rampart_core::policy::ReportPolicy;
use rampart_observability::sink::{NotifySink, Severity};
use rampart_report::client::{AbuseReporter, ReportOutcome};
use rampart_report::selfip::SelfAddrs;
use rampart_store::cache::{ReportCache, format_elapsed};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// What the pipeline decided for one input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    NotBlockEvent,
    MissingSource,
    SelfAddress,
    NonRoutable,
    NonReportableProto,
    OnCooldown,
    Reported { threat_score: Option<f64> },
    RateLimited,
    ReportFailed,
}

/// Wires parser, filters, cooldown cache and reporter together.
///
/// Owns the report cache and processes one line to completion at a time,
/// so nothing can interleave with the mark-then-save step after a
/// confirmed report.
pub struct Pipeline {
    cache: ReportCache,
    reporter: Arc<dyn AbuseReporter>,
    self_addrs: Arc<SelfAddrs>,
    policy: Arc<dyn ReportPolicy>,
    sink: Arc<dyn NotifySink>,
}

impl Pipeline {
    pub fn new(
        cache: ReportCache,
        reporter: Arc<dyn AbuseReporter>,
        self_addrs: Arc<SelfAddrs>,
        policy: Arc<dyn ReportPolicy>,
        sink: Arc<dyn NotifySink>,
    ) -> Self {
        Self {
            cache,
            reporter,
            self_addrs,
            policy,
            sink,
        }
    }

    pub async fn process_line(&mut self, line: &str) -> Disposition {
        let Some(record) = parser::parse_line(line) else {
            debug!(line, "Ignoring line without block marker");
            return Disposition::NotBlockEvent;
        };

        // A block event without SRC means the log format drifted, make noise
        let Some(src) = record.src else {
            warn!(line, "Block event is missing its source address");
            self.sink.notify(
                Severity::Warn,
                &format!("Block event without a source address: `{line}`"),
            );
            return Disposition::MissingSource;
        };

        let proto = record.proto.as_deref().unwrap_or("unknown");

        if self.self_addrs.current().contains(&src) {
            info!(%src, proto, dpt = record.dpt, "Ignoring own address");
            return Disposition::SelfAddress;
        }

        if netaddr::is_non_routable(src) {
            info!(%src, proto, dpt = record.dpt, "Ignoring non-routable address");
            return Disposition::NonRoutable;
        }

        if !record.is_tcp() {
            info!(%src, proto, dpt = record.dpt, "Skipping non-TCP traffic");
            return Disposition::NonReportableProto;
        }

        let now = now_unix();
        if self.cache.is_on_cooldown(src, now) {
            if let Some(last) = self.cache.last_reported(src) {
                info!(
                    %src,
                    elapsed = %format_elapsed(now - last),
                    "Already reported, still on cooldown"
                );
            }
            return Disposition::OnCooldown;
        }

        let categories = self.policy.categories(&record);
        let comment = self.policy.comment(&record, line);

        match self.reporter.report(&record, &categories, &comment).await {
            ReportOutcome::Accepted { threat_score } => {
                info!(
                    %src,
                    dpt = record.dpt,
                    categories = %categories.join(","),
                    threat_score,
                    "Reported source address"
                );
                // Confirmed report: mark and persist back-to-back, nothing
                // may suspend in between
                self.cache.mark_reported(src, now);
                if let Err(e) = self.cache.save() {
                    error!(error = %e, "Report cache save failed");
                    self.sink
                        .notify(Severity::Error, &format!("Report cache save failed: {e}"));
                }
                Disposition::Reported { threat_score }
            }
            ReportOutcome::RateLimited => {
                // Cache stays untouched so the next event retries
                info!(%src, "Abuse API rate limit hit, will retry on a later event");
                Disposition::RateLimited
            }
            ReportOutcome::Failed(reason) => {
                error!(%src, reason = %reason, "Report failed");
                self.sink
                    .notify(Severity::Error, &format!("Failed to report {src}: {reason}"));
                Disposition::ReportFailed
            }
        }
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
