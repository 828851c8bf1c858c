//! Forward and reverse DNS-consistency checks
//!
//! Each lookup carries its own 1-second timeout; a timeout surfaces as a
//! distinct status instead of being retried.

use anyhow::{anyhow, Result};
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;

/// Per-lookup timeout
pub const DNS_TIMEOUT: Duration = Duration::from_secs(1);

/// Classified result of a DNS-consistency check
///
/// `Match` and `Mismatch` carry the resolved value as it should be displayed
/// (reverse lookups have the DNS suffix already stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsStatus {
    Match(String),
    Mismatch(String),
    NoRecord,
    TimedOut,
}

/// Async resolver wrapper with hyperview's timeout and classification rules
pub struct Resolver {
    inner: TokioAsyncResolver,
}

impl Resolver {
    /// Build a resolver from the system configuration (/etc/resolv.conf)
    pub fn from_system_conf() -> Result<Self> {
        let inner = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| anyhow!("Failed to initialize DNS resolver: {}", e))?;
        Ok(Self { inner })
    }

    /// Forward-resolve `fqdn` and classify against the extracted instance IP
    pub async fn forward(&self, fqdn: &str, expected_ip: IpAddr) -> DnsStatus {
        match timeout(DNS_TIMEOUT, self.inner.lookup_ip(fqdn)).await {
            Err(_) => DnsStatus::TimedOut,
            Ok(Err(_)) => DnsStatus::NoRecord,
            Ok(Ok(lookup)) => match lookup.iter().next() {
                None => DnsStatus::NoRecord,
                Some(resolved) if resolved == expected_ip => {
                    DnsStatus::Match(resolved.to_string())
                }
                Some(resolved) => DnsStatus::Mismatch(resolved.to_string()),
            },
        }
    }

    /// Reverse-resolve `ip` and classify against the expected FQDN
    ///
    /// Resolved names are compared against `expected_fqdn` and displayed with
    /// `suffix` stripped.
    pub async fn reverse(&self, ip: IpAddr, expected_fqdn: &str, suffix: &str) -> DnsStatus {
        match timeout(DNS_TIMEOUT, self.inner.reverse_lookup(ip)).await {
            Err(_) => DnsStatus::TimedOut,
            Ok(Err(_)) => DnsStatus::NoRecord,
            Ok(Ok(lookup)) => match lookup.iter().next() {
                None => DnsStatus::NoRecord,
                Some(name) => {
                    let resolved = name.to_string();
                    let resolved = resolved.trim_end_matches('.');
                    classify_reverse(resolved, expected_fqdn, suffix)
                }
            },
        }
    }
}

pub(crate) fn classify_reverse(resolved: &str, expected_fqdn: &str, suffix: &str) -> DnsStatus {
    let display = resolved.replace(suffix, "");
    if resolved == expected_fqdn {
        DnsStatus::Match(display)
    } else {
        DnsStatus::Mismatch(display)
    }
}
