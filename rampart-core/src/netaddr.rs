//! Address classification for the report filter chain.

use ipnet::IpNet;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::LazyLock;

/// Blocks that can never be the true origin of routed abuse: private,
/// loopback, link-local, CGNAT, multicast, documentation and reserved
/// space, both families. Membership is exact CIDR containment.
static NON_ROUTABLE: LazyLock<Vec<IpNet>> = LazyLock::new(|| {
    [
        // IPv4
        "0.0.0.0/8",
        "10.0.0.0/8",
        "100.64.0.0/10",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "172.16.0.0/12",
        "192.0.0.0/24",
        "192.0.2.0/24",
        "192.168.0.0/16",
        "198.18.0.0/15",
        "198.51.100.0/24",
        "203.0.113.0/24",
        "224.0.0.0/4",
        "240.0.0.0/4",
        "255.255.255.255/32",
        // IPv6
        "::/128",
        "::1/128",
        "::ffff:0:0/96",
        "100::/64",
        "2001:db8::/32",
        "fc00::/7",
        "fe80::/10",
        "ff00::/8",
    ]
    .iter()
    .map(|s| s.parse().expect("static CIDR table entry"))
    .collect()
});

/// True when `addr` sits in a private/reserved block and must not be reported.
pub fn is_non_routable(addr: IpAddr) -> bool {
    NON_ROUTABLE.iter().any(|net| net.contains(&addr))
}

/// True when `addr` belongs to this host according to the current
/// self-address snapshot.
pub fn is_self(addr: IpAddr, self_addrs: &HashSet<IpAddr>) -> bool {
    self_addrs.contains(&addr)
}
