//! Subnet specification expansion.
//!
//! Accepted forms:
//! - CIDR: `192.168.1.0/24`
//! - Range: `192.168.1.1-192.168.1.50` or `192.168.1.1-50`
//! - Single address or hostname: `192.168.1.7`, `printer.lan`

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use netpulse_probe::is_valid_target;

use crate::error::{DiscoverError, Result};

/// Most hosts a single CIDR sweep will enumerate.
pub const MAX_SCAN_HOSTS: u64 = 254;

/// Largest explicit range accepted.
pub const MAX_RANGE_HOSTS: u64 = 65_536;

/// Expand a subnet specification into the ordered list of addresses to probe.
pub fn expand(spec: &str) -> Result<Vec<String>> {
    let spec = spec.trim();

    let addresses = if let Some((network, prefix)) = spec.split_once('/') {
        expand_cidr(spec, network, prefix)?
    } else if let Some((start, end)) = spec
        .split_once('-')
        .filter(|_| !is_hyphenated_hostname(spec))
    {
        expand_range(spec, start, end)?
    } else {
        vec![spec.to_string()]
    };

    tracing::debug!(
        subnet = %spec,
        count = addresses.len(),
        first = ?addresses.first(),
        "Expanded subnet"
    );
    Ok(addresses)
}

fn expand_cidr(spec: &str, network: &str, prefix: &str) -> Result<Vec<String>> {
    let invalid = |reason: String| DiscoverError::InvalidCidr {
        spec: spec.to_string(),
        reason,
    };

    let base = ip_to_number(network)
        .ok_or_else(|| invalid(format!("{network} is not an IPv4 address")))?;
    let prefix_len: u8 = prefix
        .trim()
        .parse()
        .map_err(|_| invalid(format!("prefix {prefix} is not a number")))?;
    let net = Ipv4Net::new(Ipv4Addr::from(base), prefix_len)
        .map_err(|_| invalid(format!("prefix /{prefix_len} is longer than 32")))?;

    if prefix_len == 24 {
        let [a, b, c, _] = net.addr().octets();
        return Ok((1..=254).map(|i| format!("{a}.{b}.{c}.{i}")).collect());
    }

    let host_bits = 32 - u32::from(prefix_len);
    let mut host_count = (1u64 << host_bits).saturating_sub(2);
    if host_bits > 16 {
        tracing::warn!(
            subnet = %spec,
            available = host_count,
            limit = MAX_SCAN_HOSTS,
            "Network too large, limiting scan"
        );
        host_count = MAX_SCAN_HOSTS;
    }

    let network_num = u32::from(net.network());
    Ok((1..=host_count.min(MAX_SCAN_HOSTS))
        .map(|offset| number_to_ip(network_num + offset as u32))
        .collect())
}

/// `core-sw-01.lan` is a host, `10.0.0.1-20` is a range. Range endpoints
/// are numeric, so any letter marks a hostname.
fn is_hyphenated_hostname(spec: &str) -> bool {
    spec.chars().any(|c| c.is_ascii_alphabetic()) && is_valid_target(spec)
}

fn expand_range(spec: &str, start: &str, end: &str) -> Result<Vec<String>> {
    let invalid = |reason: String| DiscoverError::InvalidRange {
        spec: spec.to_string(),
        reason,
    };

    let start_num =
        ip_to_number(start).ok_or_else(|| invalid(format!("{start} is not an IPv4 address")))?;

    let end = end.trim();
    let end_num = if end.contains('.') {
        ip_to_number(end).ok_or_else(|| invalid(format!("{end} is not an IPv4 address")))?
    } else {
        // Shorthand: `end` replaces the last octet of `start`.
        let last: u8 = end
            .parse()
            .map_err(|_| invalid(format!("end octet {end} must be between 0 and 255")))?;
        (start_num & 0xFFFF_FF00) | u32::from(last)
    };

    if start_num > end_num {
        return Err(invalid(format!(
            "start {} is greater than end {}",
            start.trim(),
            number_to_ip(end_num)
        )));
    }

    let count = u64::from(end_num - start_num) + 1;
    if count > MAX_RANGE_HOSTS {
        return Err(DiscoverError::RangeTooLarge {
            spec: spec.to_string(),
            count,
            limit: MAX_RANGE_HOSTS,
        });
    }

    Ok((start_num..=end_num).map(number_to_ip).collect())
}

/// Dotted quad → 32-bit integer. `None` unless there are exactly four octets in 0–255.
pub fn ip_to_number(ip: &str) -> Option<u32> {
    let octets: Vec<&str> = ip.trim().split('.').collect();
    if octets.len() != 4 {
        return None;
    }
    octets.iter().try_fold(0u32, |acc, octet| {
        octet.parse::<u8>().ok().map(|o| (acc << 8) | u32::from(o))
    })
}

/// 32-bit integer → dotted quad.
pub fn number_to_ip(num: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (num >> 24) & 0xFF,
        (num >> 16) & 0xFF,
        (num >> 8) & 0xFF,
        num & 0xFF
    )
}
