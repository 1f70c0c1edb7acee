//! `NO_PROXY` bypass rules
//!
//! Entries are comma-separated. `*` matches every host. IP addresses match
//! exactly, or by subnet with a `/prefix`. Anything else is a domain name that
//! matches itself and all of its subdomains; a leading `.` or `*.` is ignored.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    Any,
    Ip(IpAddr),
    Subnet(IpAddr, u8),
    Domain(String),
}

/// Hosts that must be reached without a proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoProxy {
    rules: Vec<Rule>,
}

impl NoProxy {
    /// Reads `NO_PROXY`, falling back to `no_proxy`.
    pub fn from_env() -> Option<NoProxy> {
        let raw = std::env::var("NO_PROXY")
            .or_else(|_| std::env::var("no_proxy"))
            .unwrap_or_default();

        Self::from_string(&raw)
    }

    /// Parses a `NO_PROXY` style list. Returns `None` when it has no entries.
    pub fn from_string(no_proxy_list: &str) -> Option<Self> {
        let rules: Vec<Rule> = no_proxy_list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(parse_rule)
            .collect();

        if rules.is_empty() {
            None
        } else {
            Some(NoProxy { rules })
        }
    }

    /// Check if a host should bypass the proxy.
    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let host_ip = host.parse::<IpAddr>().ok();
        let host = host.to_ascii_lowercase();

        self.rules.iter().any(|rule| match rule {
            Rule::Any => true,
            Rule::Ip(ip) => host_ip == Some(*ip),
            Rule::Subnet(network, prefix_len) => {
                host_ip.is_some_and(|ip| ip_in_subnet(ip, *network, *prefix_len))
            }
            Rule::Domain(domain) => {
                host == *domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|rest| rest.ends_with('.'))
            }
        })
    }
}

fn parse_rule(entry: &str) -> Rule {
    if entry == "*" {
        return Rule::Any;
    }
    if let Some((network, prefix_len)) = parse_cidr_pattern(entry) {
        return Rule::Subnet(network, prefix_len);
    }
    let bare = entry.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Rule::Ip(ip);
    }
    let domain = entry.trim_start_matches("*.").trim_start_matches('.');
    Rule::Domain(domain.to_ascii_lowercase())
}

/// Parse a CIDR pattern (e.g., "192.168.1.0/24" or "2001:db8::/32")
fn parse_cidr_pattern(pattern: &str) -> Option<(IpAddr, u8)> {
    let (network_str, prefix_str) = pattern.split_once('/')?;
    let network_addr = network_str.parse::<IpAddr>().ok()?;
    let prefix_len = prefix_str.parse::<u8>().ok()?;

    let max_prefix = match network_addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };

    (prefix_len <= max_prefix).then_some((network_addr, prefix_len))
}

fn ip_in_subnet(ip: IpAddr, network: IpAddr, prefix_len: u8) -> bool {
    match (ip, network) {
        (IpAddr::V4(ip_v4), IpAddr::V4(net_v4)) => ipv4_in_subnet(ip_v4, net_v4, prefix_len),
        (IpAddr::V6(ip_v6), IpAddr::V6(net_v6)) => ipv6_in_subnet(ip_v6, net_v6, prefix_len),
        _ => false,
    }
}

fn ipv4_in_subnet(ip: Ipv4Addr, network: Ipv4Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let mask = u32::MAX << (32 - u32::from(prefix_len));
    (u32::from(ip) & mask) == (u32::from(network) & mask)
}

fn ipv6_in_subnet(ip: Ipv6Addr, network: Ipv6Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let mask = u128::MAX << (128 - u32::from(prefix_len));
    (u128::from(ip) & mask) == (u128::from(network) & mask)
}
