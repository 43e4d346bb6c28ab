use crate::record::BlockRecord;

/// Category tags and free-text comment attached to an outgoing report.
///
/// This is product policy, not pipeline mechanics. The pipeline calls
/// through the trait so the rules can change without touching it.
pub trait ReportPolicy: Send + Sync {
    fn categories(&self, record: &BlockRecord) -> Vec<String>;
    fn comment(&self, record: &BlockRecord, raw_line: &str) -> String;
}

/// Default policy: bucket by destination port on top of a base tag.
#[derive(Debug, Default)]
pub struct PortServicePolicy;

impl ReportPolicy for PortServicePolicy {
    fn categories(&self, record: &BlockRecord) -> Vec<String> {
        let mut tags = vec!["firewall-block".to_string()];
        match record.dpt {
            Some(22) => tags.push("ssh".into()),
            Some(23 | 2323) => tags.push("telnet".into()),
            Some(25 | 465 | 587) => tags.push("smtp".into()),
            Some(80 | 443 | 8080 | 8443) => tags.push("http".into()),
            Some(3389) => tags.push("rdp".into()),
            Some(_) | None => tags.push("port-scan".into()),
        }
        tags
    }

    fn comment(&self, record: &BlockRecord, _raw_line: &str) -> String {
        let proto = record.proto.as_deref().unwrap_or("unknown");
        let mut out = format!("Unauthorized {proto} connection attempt blocked by UFW");
        if let Some(dpt) = record.dpt {
            out.push_str(&format!(" to port {dpt}"));
        }
        if let Some(iface) = record.in_iface.as_deref() {
            out.push_str(&format!(" on {iface}"));
        }

        let mut details = Vec::new();
        if let Some(ttl) = record.ttl {
            details.push(format!("TTL={ttl}"));
        }
        if let Some(len) = record.len {
            details.push(format!("LEN={len}"));
        }
        if record.syn {
            details.push("SYN".into());
        }
        if record.ack {
            details.push("ACK".into());
        }
        if !details.is_empty() {
            out.push_str(&format!(" ({})", details.join(" ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn record(dpt: Option<u16>) -> BlockRecord {
        BlockRecord {
            dpt,
            proto: Some("TCP".into()),
            ..Default::default()
        }
    }

    #[test]
    fn ssh_port_gets_the_ssh_tag() {
        let tags = PortServicePolicy.categories(&record(Some(22)));
        assert_eq!(tags, vec!["firewall-block".to_string(), "ssh".to_string()]);
    }

    #[test]
    fn web_ports_get_the_http_tag() {
        for port in [80, 443, 8080, 8443] {
            let tags = PortServicePolicy.categories(&record(Some(port)));
            assert!(tags.contains(&"http".to_string()), "port {port}");
        }
    }

    #[test]
    fn unknown_or_missing_port_falls_back_to_port_scan() {
        assert!(PortServicePolicy
            .categories(&record(Some(31337)))
            .contains(&"port-scan".to_string()));
        assert!(PortServicePolicy
            .categories(&record(None))
            .contains(&"port-scan".to_string()));
    }

    #[test]
    fn comment_renders_from_record_fields() {
        let line = "[UFW BLOCK] IN=eth0 OUT= SRC=203.0.113.7 DST=198.51.100.2 LEN=60 TTL=54 PROTO=TCP SPT=43210 DPT=22 SYN";
        let record = parse_line(line).unwrap();
        let comment = PortServicePolicy.comment(&record, line);
        assert_eq!(
            comment,
            "Unauthorized TCP connection attempt blocked by UFW to port 22 on eth0 (TTL=54 LEN=60 SYN)"
        );
    }

    #[test]
    fn comment_with_a_bare_record_still_reads() {
        let comment = PortServicePolicy.comment(&BlockRecord::default(), "");
        assert_eq!(comment, "Unauthorized unknown connection attempt blocked by UFW");
    }
}
