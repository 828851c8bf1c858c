//! Network probes for instance enrichment
//!
//! Probes are read-only with per-call timeouts; nothing is shared between
//! concurrent callers. The [`Prober`] trait is the seam between the
//! enrichment pipeline and the real network.

pub mod dns;
pub mod ping;

use anyhow::Result;
use async_trait::async_trait;
use std::net::IpAddr;

use dns::{DnsStatus, Resolver};
use ping::PingStatus;

/// Probe operations issued by the enrichment pipeline
#[async_trait]
pub trait Prober: Send + Sync {
    /// Bounded ICMP echo probe against the instance IP
    async fn ping(&self, ip: IpAddr) -> PingStatus;

    /// Forward-resolve a FQDN and classify against the expected IP
    async fn forward_dns(&self, fqdn: &str, expected_ip: IpAddr) -> DnsStatus;

    /// Reverse-resolve an IP and classify against the expected FQDN
    ///
    /// The DNS suffix is stripped from resolved names for display.
    async fn reverse_dns(&self, ip: IpAddr, expected_fqdn: &str, suffix: &str) -> DnsStatus;
}

/// Real network prober backed by ICMP echo and the system resolver
pub struct NetworkProber {
    resolver: Resolver,
}

impl NetworkProber {
    pub fn new() -> Result<Self> {
        Ok(Self {
            resolver: Resolver::from_system_conf()?,
        })
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn ping(&self, ip: IpAddr) -> PingStatus {
        ping::ping_host(ip).await
    }

    async fn forward_dns(&self, fqdn: &str, expected_ip: IpAddr) -> DnsStatus {
        self.resolver.forward(fqdn, expected_ip).await
    }

    async fn reverse_dns(&self, ip: IpAddr, expected_fqdn: &str, suffix: &str) -> DnsStatus {
        self.resolver.reverse(ip, expected_fqdn, suffix).await
    }
}
