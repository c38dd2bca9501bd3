//! Reverse name resolution capability.
//!
//! The system implementation shells out to the platform resolver tools
//! (`getent hosts` on Unix, `nslookup` on Windows) so lookups honour the
//! host's own NSS / DNS configuration. Callers bound lookups with a timeout;
//! the child process is killed if the lookup future is dropped.

use std::net::IpAddr;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{ProbeError, Result};

#[async_trait]
pub trait HostnameResolver: Send + Sync {
    /// Resolve `address` to a hostname. `Ok(None)` when no name is registered.
    async fn reverse(&self, address: IpAddr) -> Result<Option<String>>;
}

/// Resolver backed by the operating system's lookup tools.
#[derive(Debug, Default, Clone)]
pub struct SystemResolver;

#[async_trait]
impl HostnameResolver for SystemResolver {
    async fn reverse(&self, address: IpAddr) -> Result<Option<String>> {
        let ip = address.to_string();
        let (program, args): (&str, Vec<&str>) = if cfg!(windows) {
            ("nslookup", vec![ip.as_str()])
        } else {
            ("getent", vec!["hosts", ip.as_str()])
        };

        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProbeError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        let text = String::from_utf8_lossy(&output.stdout);
        let name = if cfg!(windows) {
            parse_nslookup(&text)
        } else if output.status.success() {
            parse_getent(&text, &ip)
        } else {
            // getent exits 2 when the key is not found.
            return match output.status.code() {
                Some(2) => Ok(None),
                _ => Err(ProbeError::Lookup {
                    address: ip,
                    reason: format!("getent exited with {}", output.status),
                }),
            };
        };

        Ok(name)
    }
}

/// First hostname column of `getent hosts` output.
pub fn parse_getent(output: &str, ip: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let addr = fields.next()?;
            let name = fields.next()?;
            (addr == ip && name != ip).then(|| name.trim_end_matches('.').to_string())
        })
        .next()
}

/// Hostname from `nslookup` output (`Name: host` or `name = host.`).
pub fn parse_nslookup(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let line = line.trim();
        let name = if let Some(idx) = line.find("name = ") {
            &line[idx + "name = ".len()..]
        } else if let Some(rest) = line.strip_prefix("Name:") {
            rest
        } else {
            return None;
        };
        let name = name.trim().trim_end_matches('.');
        (!name.is_empty()).then(|| name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_getent() {
        let out = "10.0.1.5      nas.lan nas\n";
        assert_eq!(parse_getent(out, "10.0.1.5"), Some("nas.lan".to_string()));
        assert_eq!(parse_getent("", "10.0.1.5"), None);
        assert_eq!(parse_getent("10.0.1.6 other.lan\n", "10.0.1.5"), None);
    }

    #[test]
    fn test_parse_nslookup_unix_style() {
        let out = "5.1.0.10.in-addr.arpa\tname = nas.lan.\n\nAuthoritative answers can be found from:\n";
        assert_eq!(parse_nslookup(out), Some("nas.lan".to_string()));
    }

    #[test]
    fn test_parse_nslookup_windows_style() {
        let out = "Server:  router.lan\nAddress:  10.0.1.1\n\nName:    nas.lan\nAddress:  10.0.1.5\n";
        assert_eq!(parse_nslookup(out), Some("nas.lan".to_string()));
    }

    #[test]
    fn test_parse_nslookup_no_record() {
        let out = "** server can't find 5.1.0.10.in-addr.arpa: NXDOMAIN\n";
        assert_eq!(parse_nslookup(out), None);
    }
}
