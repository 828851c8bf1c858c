//! Per-record enrichment and the bounded concurrent enrichment pool
//!
//! Enrichment decorates a fetched [`InstanceRecord`] with derived network
//! fields. When probing is requested the batch fans out over a fixed-size
//! pool of concurrent workers; results always come back in input order
//! regardless of completion order.

use std::net::IpAddr;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Deserialize;
use tracing::debug;

use crate::database::inventory::InstanceRecord;
use crate::probe::dns::DnsStatus;
use crate::probe::ping::PingStatus;
use crate::probe::Prober;

/// Enrichment feature flags and tunables
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Issue ICMP liveness probes
    pub ping: bool,
    /// Issue forward/reverse DNS-consistency checks
    pub check_dns: bool,
    /// DNS suffix appended to hostnames for resolution
    pub dns_suffix: String,
    /// Concurrent probe workers
    pub workers: usize,
}

/// An [`InstanceRecord`] plus derived display fields
///
/// Probe fields stay `None` when the matching flag is off or when the record
/// has no extractable IP.
#[derive(Debug, Clone)]
pub struct EnrichedRow {
    pub record: InstanceRecord,
    pub ip: Option<IpAddr>,
    pub ping: Option<PingStatus>,
    pub dns: Option<DnsStatus>,
    pub rdns: Option<DnsStatus>,
}

impl EnrichedRow {
    /// Derive the offline fields only (IP extraction, no probes)
    pub fn from_record(record: InstanceRecord) -> Self {
        let ip = extract_ip(&record.network_info);
        Self {
            record,
            ip,
            ping: None,
            dns: None,
            rdns: None,
        }
    }
}

// Shape of the serialized network-info blob: a list of VIFs, each carrying
// networks with subnets with fixed IPs.
#[derive(Deserialize)]
struct Vif {
    network: VifNetwork,
}

#[derive(Deserialize)]
struct VifNetwork {
    #[serde(default)]
    subnets: Vec<Subnet>,
}

#[derive(Deserialize)]
struct Subnet {
    #[serde(default)]
    ips: Vec<FixedIp>,
}

#[derive(Deserialize)]
struct FixedIp {
    address: String,
}

/// Extract the first address of the first subnet of the first network
///
/// Returns `None` for an empty blob, an unparseable blob, or a blob with no
/// address; the caller renders the placeholder and skips all probes.
pub fn extract_ip(network_info: &str) -> Option<IpAddr> {
    let vifs: Vec<Vif> = serde_json::from_str(network_info).ok()?;
    let address = vifs
        .first()?
        .network
        .subnets
        .first()?
        .ips
        .first()?
        .address
        .as_str();
    address.parse().ok()
}

/// Enrich a single record, probing only when it has an IP
pub async fn enrich_record(
    record: InstanceRecord,
    opts: &EnrichOptions,
    prober: &dyn Prober,
) -> EnrichedRow {
    let mut row = EnrichedRow::from_record(record);

    // Records without network info get placeholders and no probe traffic.
    let Some(ip) = row.ip else {
        return row;
    };

    if opts.ping {
        row.ping = Some(prober.ping(ip).await);
    }

    if opts.check_dns {
        let fqdn = format!("{}{}", row.record.hostname, opts.dns_suffix);
        row.dns = Some(prober.forward_dns(&fqdn, ip).await);
        row.rdns = Some(prober.reverse_dns(ip, &fqdn, &opts.dns_suffix).await);
    }

    row
}

/// Sequential enrichment for runs without network probing
pub fn enrich_sequential(records: Vec<InstanceRecord>) -> Vec<EnrichedRow> {
    records.into_iter().map(EnrichedRow::from_record).collect()
}

/// Fan enrichment out over a bounded pool of concurrent workers
///
/// At most `opts.workers` enrichments are in flight at once. The buffered
/// stream yields results in input order, so `output[i]` always derives from
/// `input[i]`. Runs to completion; there is no cancellation and no overall
/// deadline.
pub async fn enrich_all(
    records: Vec<InstanceRecord>,
    opts: &EnrichOptions,
    prober: Arc<dyn Prober>,
    progress: Option<ProgressBar>,
) -> Vec<EnrichedRow> {
    debug!(
        "enriching {} records with {} workers",
        records.len(),
        opts.workers
    );

    stream::iter(records.into_iter().map(|record| {
        let prober = Arc::clone(&prober);
        let progress = progress.clone();
        async move {
            let row = enrich_record(record, opts, prober.as_ref()).await;
            if let Some(pb) = &progress {
                pb.inc(1);
            }
            row
        }
    }))
    .buffered(opts.workers.max(1))
    .collect()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const NETWORK_INFO: &str = r#"[{"network": {"subnets": [{"ips": [{"address": "10.0.0.5"}]}]}}]"#;

    fn record(hostname: &str, network_info: &str) -> InstanceRecord {
        InstanceRecord {
            hostname: hostname.to_string(),
            uuid: format!("uuid-{}", hostname),
            user_id: "alice".to_string(),
            project_id: "p-1".to_string(),
            created_at: "2014-05-01 10:00:00".to_string(),
            host: "hv01.example.com".to_string(),
            disabled: 0,
            disabled_reason: None,
            network_info: network_info.to_string(),
            flavor: "m1.small".to_string(),
        }
    }

    fn opts(ping: bool, check_dns: bool) -> EnrichOptions {
        EnrichOptions {
            ping,
            check_dns,
            dns_suffix: ".example.com".to_string(),
            workers: 20,
        }
    }

    /// Counts probe calls and answers with fixed statuses after a per-call delay
    struct MockProber {
        ping_calls: AtomicUsize,
        dns_calls: AtomicUsize,
        delay: Duration,
    }

    impl MockProber {
        fn new() -> Self {
            Self {
                ping_calls: AtomicUsize::new(0),
                dns_calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl Prober for MockProber {
        async fn ping(&self, _ip: IpAddr) -> PingStatus {
            self.ping_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            PingStatus::Down
        }

        async fn forward_dns(&self, _fqdn: &str, expected_ip: IpAddr) -> DnsStatus {
            self.dns_calls.fetch_add(1, Ordering::SeqCst);
            DnsStatus::Match(expected_ip.to_string())
        }

        async fn reverse_dns(&self, _ip: IpAddr, expected_fqdn: &str, suffix: &str) -> DnsStatus {
            self.dns_calls.fetch_add(1, Ordering::SeqCst);
            DnsStatus::Match(expected_fqdn.replace(suffix, ""))
        }
    }

    /// Sleeps longer for earlier inputs so completion order inverts input order
    struct StaggeredProber;

    #[async_trait]
    impl Prober for StaggeredProber {
        async fn ping(&self, ip: IpAddr) -> PingStatus {
            let last_octet = match ip {
                IpAddr::V4(v4) => v4.octets()[3] as u64,
                IpAddr::V6(_) => 0,
            };
            tokio::time::sleep(Duration::from_millis(100u64.saturating_sub(last_octet))).await;
            PingStatus::Down
        }

        async fn forward_dns(&self, _fqdn: &str, _ip: IpAddr) -> DnsStatus {
            DnsStatus::NoRecord
        }

        async fn reverse_dns(&self, _ip: IpAddr, _fqdn: &str, _suffix: &str) -> DnsStatus {
            DnsStatus::NoRecord
        }
    }

    #[test]
    fn test_extract_ip() {
        assert_eq!(
            extract_ip(NETWORK_INFO),
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)))
        );
        assert_eq!(extract_ip("[]"), None);
        assert_eq!(extract_ip(""), None);
        assert_eq!(extract_ip("not json"), None);
        assert_eq!(
            extract_ip(r#"[{"network": {"subnets": [{"ips": []}]}}]"#),
            None
        );
    }

    #[tokio::test]
    async fn test_empty_network_info_skips_probes() {
        let prober = MockProber::new();
        let row = enrich_record(record("web-1", "[]"), &opts(true, true), &prober).await;

        assert_eq!(row.ip, None);
        assert_eq!(row.ping, None);
        assert_eq!(row.dns, None);
        assert_eq!(row.rdns, None);
        assert_eq!(prober.ping_calls.load(Ordering::SeqCst), 0);
        assert_eq!(prober.dns_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_flags_gate_probe_calls() {
        let prober = MockProber::new();
        let row = enrich_record(record("web-1", NETWORK_INFO), &opts(false, true), &prober).await;

        assert!(row.ip.is_some());
        assert_eq!(row.ping, None);
        assert_eq!(row.dns, Some(DnsStatus::Match("10.0.0.5".to_string())));
        assert_eq!(row.rdns, Some(DnsStatus::Match("web-1".to_string())));
        assert_eq!(prober.ping_calls.load(Ordering::SeqCst), 0);
        assert_eq!(prober.dns_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sequential_enrichment_preserves_order() {
        let records = vec![
            record("web-1", NETWORK_INFO),
            record("web-2", "[]"),
            record("web-3", NETWORK_INFO),
        ];
        let rows = enrich_sequential(records);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].record.hostname, "web-1");
        assert_eq!(rows[1].record.hostname, "web-2");
        assert_eq!(rows[1].ip, None);
        assert_eq!(rows[2].record.hostname, "web-3");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_preserves_input_order_under_staggered_completion() {
        // Earlier inputs finish last; output order must still match input order.
        let records: Vec<InstanceRecord> = (1..=30)
            .map(|i| {
                record(
                    &format!("web-{:02}", i),
                    &format!(
                        r#"[{{"network": {{"subnets": [{{"ips": [{{"address": "10.0.0.{}"}}]}}]}}}}]"#,
                        i
                    ),
                )
            })
            .collect();
        let expected: Vec<String> = records.iter().map(|r| r.hostname.clone()).collect();

        let rows = enrich_all(records, &opts(true, false), Arc::new(StaggeredProber), None).await;

        let got: Vec<String> = rows.iter().map(|r| r.record.hostname.clone()).collect();
        assert_eq!(got, expected);
        assert!(rows.iter().all(|r| r.ping == Some(PingStatus::Down)));
    }

    #[tokio::test]
    async fn test_pool_degrades_single_record_without_affecting_siblings() {
        // A timed-out DNS check on one record leaves siblings intact.
        struct OneTimeout;

        #[async_trait]
        impl Prober for OneTimeout {
            async fn ping(&self, _ip: IpAddr) -> PingStatus {
                PingStatus::Down
            }

            async fn forward_dns(&self, fqdn: &str, expected_ip: IpAddr) -> DnsStatus {
                if fqdn.starts_with("web-2") {
                    DnsStatus::TimedOut
                } else {
                    DnsStatus::Match(expected_ip.to_string())
                }
            }

            async fn reverse_dns(&self, _ip: IpAddr, fqdn: &str, suffix: &str) -> DnsStatus {
                DnsStatus::Match(fqdn.replace(suffix, ""))
            }
        }

        let records = vec![
            record("web-1", NETWORK_INFO),
            record("web-2", NETWORK_INFO),
            record("web-3", NETWORK_INFO),
        ];
        let rows = enrich_all(records, &opts(false, true), Arc::new(OneTimeout), None).await;

        assert_eq!(rows[1].dns, Some(DnsStatus::TimedOut));
        assert_eq!(rows[0].dns, Some(DnsStatus::Match("10.0.0.5".to_string())));
        assert_eq!(rows[2].dns, Some(DnsStatus::Match("10.0.0.5".to_string())));
        // The failing forward check does not poison the reverse check
        assert_eq!(rows[1].rdns, Some(DnsStatus::Match("web-2".to_string())));
    }
}
