//! Quota enforcement (spec §4.5 "Quotas"): `maxEvents`, `maxDuration`,
//! `maxMemory`.

use chrono::{DateTime, Utc};
use kodus_contracts::Quotas;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Events,
    Duration,
    Memory,
}

impl QuotaKind {
    pub fn as_reason(&self) -> &'static str {
        match self {
            QuotaKind::Events => "quota-exceeded-events",
            QuotaKind::Duration => "quota-exceeded-duration",
            QuotaKind::Memory => "quota-exceeded-memory",
        }
    }
}

/// Checks `quotas` against current usage, returning the first exceeded
/// quota kind, if any. Evaluated in events → duration → memory order so a
/// single over-budget run reports a stable reason.
pub fn check_quotas(
    quotas: &Quotas,
    event_count: u64,
    start_time: DateTime<Utc>,
    current_memory_bytes: Option<u64>,
) -> Option<QuotaKind> {
    if let Some(max_events) = quotas.max_events {
        if event_count >= max_events {
            return Some(QuotaKind::Events);
        }
    }
    if let Some(max_duration_secs) = quotas.max_duration_secs {
        let elapsed = (Utc::now() - start_time).num_seconds().max(0) as u64;
        if elapsed >= max_duration_secs {
            return Some(QuotaKind::Duration);
        }
    }
    if let (Some(max_memory), Some(current)) = (quotas.max_memory_bytes, current_memory_bytes) {
        if current >= max_memory {
            return Some(QuotaKind::Memory);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_event_quota_first() {
        let quotas = Quotas {
            max_events: Some(10),
            max_duration_secs: Some(1),
            max_memory_bytes: None,
        };
        let kind = check_quotas(&quotas, 10, Utc::now(), None);
        assert_eq!(kind, Some(QuotaKind::Events));
    }

    #[test]
    fn flags_memory_quota_when_present() {
        let quotas = Quotas {
            max_events: None,
            max_duration_secs: None,
            max_memory_bytes: Some(1_000),
        };
        let kind = check_quotas(&quotas, 0, Utc::now(), Some(1_500));
        assert_eq!(kind, Some(QuotaKind::Memory));
    }

    #[test]
    fn no_quota_configured_never_trips() {
        let quotas = Quotas {
            max_events: None,
            max_duration_secs: None,
            max_memory_bytes: None,
        };
        assert_eq!(check_quotas(&quotas, u64::MAX, Utc::now(), Some(u64::MAX)), None);
    }
}
