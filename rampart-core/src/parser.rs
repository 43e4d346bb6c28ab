//! Structured extraction from UFW block-log lines.
//!
//! Each field has its own pattern and is matched independently anywhere in
//! the line, so a missing or mangled field never aborts extraction of the
//! others. Numeric captures that fail to parse stay absent rather than
//! defaulting to zero.

use crate::record::BlockRecord;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Utc};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

/// Literal marker distinguishing block events from everything else UFW logs.
const BLOCK_MARKER: &str = "[UFW BLOCK]";

static SRC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SRC=(\S+)").unwrap());
static DST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"DST=(\S+)").unwrap());
static PROTO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"PROTO=(\S+)").unwrap());
static SPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SPT=(\d+)").unwrap());
static DPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"DPT=(\d+)").unwrap());
static IN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"IN=(\w+)").unwrap());
static OUT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"OUT=(\w+)").unwrap());
static MAC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"MAC=([\w:]+)").unwrap());
static LEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"LEN=(\d+)").unwrap());
static TTL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"TTL=(\d+)").unwrap());
static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ID=(\d+)").unwrap());
static TOS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"TOS=(\S+)").unwrap());
static PREC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"PREC=(\S+)").unwrap());
static RES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"RES=(\S+)").unwrap());
static WINDOW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"WINDOW=(\d+)").unwrap());
static URGP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"URGP=(\d+)").unwrap());

/// Parse one log line into a [`BlockRecord`].
///
/// Returns `None` when the line lacks the block marker. That is the normal
/// case for most of the file and not an error.
pub fn parse_line(line: &str) -> Option<BlockRecord> {
    if !line.contains(BLOCK_MARKER) {
        return None;
    }

    Some(BlockRecord {
        timestamp: parse_timestamp(line),
        src: capture_parsed(&SRC_RE, line),
        dst: capture_parsed(&DST_RE, line),
        proto: capture_owned(&PROTO_RE, line),
        spt: capture_parsed(&SPT_RE, line),
        dpt: capture_parsed(&DPT_RE, line),
        in_iface: capture_owned(&IN_RE, line),
        out_iface: capture_owned(&OUT_RE, line),
        mac: capture_owned(&MAC_RE, line),
        len: capture_parsed(&LEN_RE, line),
        ttl: capture_parsed(&TTL_RE, line),
        id: capture_parsed(&ID_RE, line),
        tos: capture_owned(&TOS_RE, line),
        prec: capture_owned(&PREC_RE, line),
        res: capture_owned(&RES_RE, line),
        window: capture_parsed(&WINDOW_RE, line),
        urgp: capture_parsed(&URGP_RE, line),
        // Flag tokens, not KEY=value pairs
        ack: line.contains("ACK"),
        syn: line.contains("SYN"),
    })
}

fn capture<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn capture_owned(re: &Regex, line: &str) -> Option<String> {
    capture(re, line).map(str::to_string)
}

/// Absent rather than zero when the captured text does not parse.
fn capture_parsed<T: FromStr>(re: &Regex, line: &str) -> Option<T> {
    capture(re, line).and_then(|s| s.parse().ok())
}

/// Timestamp from the line prefix.
///
/// Kernel logs either lead with an RFC 3339 stamp or with the classic
/// syslog `Mmm dd HH:MM:SS` prefix, which carries no year or zone; the
/// latter is read as the current year, UTC.
fn parse_timestamp(line: &str) -> Option<DateTime<FixedOffset>> {
    let token = line.split_whitespace().next()?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(token) {
        return Some(ts);
    }

    let prefix = line.get(..15)?;
    let with_year = format!("{} {}", Utc::now().year(), prefix);
    NaiveDateTime::parse_from_str(&with_year, "%Y %b %e %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}
