//! Bounded ICMP echo probing
//!
//! Each probe issues a fixed number of echo requests with a per-attempt
//! timeout and classifies the aggregate loss. Requires an elevated process
//! (raw ICMP sockets); the binary checks for that up front.

use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Echo attempts per instance
pub const PING_ATTEMPTS: usize = 10;

/// Per-attempt timeout
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);

const PING_PAYLOAD: [u8; 56] = [0; 56];

/// Classified result of a bounded ICMP echo probe
#[derive(Debug, Clone, PartialEq)]
pub enum PingStatus {
    /// All attempts answered
    Ok { min_ms: f64, avg_ms: f64 },
    /// Some attempts lost (0% < loss < 100%)
    Lossy {
        loss_pct: u32,
        min_ms: f64,
        avg_ms: f64,
    },
    /// No response across all attempts
    Down,
}

/// Probe a host with [`PING_ATTEMPTS`] echo requests and classify the result
pub async fn ping_host(ip: IpAddr) -> PingStatus {
    let mut rtts_ms: Vec<f64> = Vec::with_capacity(PING_ATTEMPTS);

    for _ in 0..PING_ATTEMPTS {
        match timeout(PING_TIMEOUT, surge_ping::ping(ip, &PING_PAYLOAD)).await {
            Ok(Ok((_packet, rtt))) => rtts_ms.push(rtt.as_secs_f64() * 1000.0),
            Ok(Err(e)) => debug!("ping error for {}: {}", ip, e),
            Err(_) => debug!("ping timed out for {}", ip),
        }
    }

    classify(&rtts_ms, PING_ATTEMPTS)
}

/// Classify a set of observed round-trip times out of `attempts` probes
pub(crate) fn classify(rtts_ms: &[f64], attempts: usize) -> PingStatus {
    if rtts_ms.is_empty() {
        return PingStatus::Down;
    }

    let min_ms = rtts_ms.iter().copied().fold(f64::INFINITY, f64::min);
    let avg_ms = rtts_ms.iter().sum::<f64>() / rtts_ms.len() as f64;

    let lost = attempts.saturating_sub(rtts_ms.len());
    if lost == 0 {
        PingStatus::Ok { min_ms, avg_ms }
    } else {
        PingStatus::Lossy {
            loss_pct: (lost * 100 / attempts) as u32,
            min_ms,
            avg_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_all_answered() {
        let status = classify(&[1.5, 1.2, 1.8], 3);
        match status {
            PingStatus::Ok { min_ms, avg_ms } => {
                assert!((min_ms - 1.2).abs() < f64::EPSILON);
                assert!((avg_ms - 1.5).abs() < 1e-9);
            }
            other => panic!("expected Ok, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_partial_loss() {
        let status = classify(&[2.0, 4.0], 10);
        assert_eq!(
            status,
            PingStatus::Lossy {
                loss_pct: 80,
                min_ms: 2.0,
                avg_ms: 3.0,
            }
        );
    }

    #[test]
    fn test_classify_total_loss_is_down() {
        assert_eq!(classify(&[], 10), PingStatus::Down);
    }
}
