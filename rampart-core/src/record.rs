use chrono::{DateTime, FixedOffset};
use std::net::IpAddr;

/// One parsed firewall block event.
///
/// Every field is optional. The parser fills in whatever the line carries;
/// downstream processing requires only `src`, and rejects a record without
/// it before any filtering step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockRecord {
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub src: Option<IpAddr>,
    pub dst: Option<IpAddr>,
    /// Protocol token as it appears in the line (TCP, UDP, ICMP, ...).
    pub proto: Option<String>,
    pub spt: Option<u16>,
    pub dpt: Option<u16>,
    pub in_iface: Option<String>,
    pub out_iface: Option<String>,
    pub mac: Option<String>,
    pub len: Option<u32>,
    pub ttl: Option<u32>,
    pub id: Option<u32>,
    pub tos: Option<String>,
    pub prec: Option<String>,
    pub res: Option<String>,
    pub window: Option<u32>,
    pub urgp: Option<u32>,
    pub ack: bool,
    pub syn: bool,
}

impl BlockRecord {
    /// Only TCP traffic is reportable. A spoofed UDP or ICMP source address
    /// cannot be attributed, a completed TCP handshake can.
    pub fn is_tcp(&self) -> bool {
        self.proto
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case("tcp"))
    }
}
