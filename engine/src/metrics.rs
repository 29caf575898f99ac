//! Prometheus metrics for the integrity engine.
//!
//! Counters for every decision the engine takes, a gauge for audit entries
//! waiting on the sink, and a latency histogram per operation. The
//! [`EngineMetrics`] struct owns a dedicated [`Registry`] that the host
//! service can encode into the Prometheus text exposition format.

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, HistogramOpts,
    HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Central collection of all engine-level Prometheus metrics.
pub struct EngineMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub fixes_accepted: IntCounter,
    /// Rejected fixes, labelled by rejection kind.
    pub fixes_rejected: IntCounterVec,
    /// Fraud rejections that flagged the account.
    pub fraud_flags: IntCounter,
    /// Binding checks, labelled by risk level.
    pub binding_checks: IntCounterVec,
    pub devices_registered: IntCounter,
    pub devices_blocked: IntCounter,
    pub ip_warnings: IntCounter,
    /// Trust events applied, labelled by event.
    pub trust_events: IntCounterVec,
    pub shadow_bans: IntCounter,
    pub rank_grants: IntCounter,
    pub contact_unlocks: IntCounter,
    pub audit_failures: IntCounter,
    /// Queued audit entries evicted because the retry queue was full.
    pub audits_dropped: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Audit entries queued for retry.
    pub pending_audits: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Operation latency in milliseconds, labelled by operation.
    pub operation_latency_ms: HistogramVec,
}

impl EngineMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let fixes_accepted = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_location_fixes_accepted_total",
                "Location fixes accepted and stored"
            ),
            registry
        )
        .expect("failed to register fixes_accepted counter");

        let fixes_rejected = register_int_counter_vec_with_registry!(
            Opts::new(
                "samaritan_location_fixes_rejected_total",
                "Location fixes rejected, by reason"
            ),
            &["reason"],
            registry
        )
        .expect("failed to register fixes_rejected counter");

        let fraud_flags = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_fraud_flags_total",
                "Accounts flagged by a fraud-positive location rejection"
            ),
            registry
        )
        .expect("failed to register fraud_flags counter");

        let binding_checks = register_int_counter_vec_with_registry!(
            Opts::new(
                "samaritan_device_binding_checks_total",
                "Device binding checks, by risk level"
            ),
            &["risk"],
            registry
        )
        .expect("failed to register binding_checks counter");

        let devices_registered = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_devices_registered_total",
                "Device registrations persisted"
            ),
            registry
        )
        .expect("failed to register devices_registered counter");

        let devices_blocked = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_device_bindings_blocked_total",
                "Device bindings blocked by administrators"
            ),
            registry
        )
        .expect("failed to register devices_blocked counter");

        let ip_warnings = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_ip_warnings_total",
                "IP churn and shared-IP warnings raised at login"
            ),
            registry
        )
        .expect("failed to register ip_warnings counter");

        let trust_events = register_int_counter_vec_with_registry!(
            Opts::new("samaritan_trust_events_total", "Trust events applied, by event"),
            &["event"],
            registry
        )
        .expect("failed to register trust_events counter");

        let shadow_bans = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_shadow_bans_total",
                "Accounts shadow-banned by strikes or administrators"
            ),
            registry
        )
        .expect("failed to register shadow_bans counter");

        let rank_grants = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_rank_grants_total",
                "New helper registrations assigned a rank"
            ),
            registry
        )
        .expect("failed to register rank_grants counter");

        let contact_unlocks = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_contact_unlocks_total",
                "New helper registrations that unlocked requester contact"
            ),
            registry
        )
        .expect("failed to register contact_unlocks counter");

        let audit_failures = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_audit_failures_total",
                "Audit sink writes that failed and were queued for retry"
            ),
            registry
        )
        .expect("failed to register audit_failures counter");

        let audits_dropped = register_int_counter_with_registry!(
            Opts::new(
                "samaritan_audits_dropped_total",
                "Queued audit entries evicted from a full retry queue"
            ),
            registry
        )
        .expect("failed to register audits_dropped counter");

        // Gauges
        let pending_audits = register_int_gauge_with_registry!(
            Opts::new(
                "samaritan_pending_audits",
                "Audit entries waiting to be written"
            ),
            registry
        )
        .expect("failed to register pending_audits gauge");

        // Histograms – exponential buckets covering 0.1 ms → ~1.6 s.
        let operation_latency_ms = register_histogram_vec_with_registry!(
            HistogramOpts::new(
                "samaritan_operation_latency_ms",
                "Engine operation latency in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(0.1, 2.0, 15).expect("valid bucket layout")),
            &["op"],
            registry
        )
        .expect("failed to register operation_latency_ms histogram");

        Self {
            registry,
            fixes_accepted,
            fixes_rejected,
            fraud_flags,
            binding_checks,
            devices_registered,
            devices_blocked,
            ip_warnings,
            trust_events,
            shadow_bans,
            rank_grants,
            contact_unlocks,
            audit_failures,
            audits_dropped,
            pending_audits,
            operation_latency_ms,
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_are_independent() {
        let a = EngineMetrics::new();
        let b = EngineMetrics::new();
        a.rank_grants.inc();
        assert_eq!(a.rank_grants.get(), 1);
        assert_eq!(b.rank_grants.get(), 0);
    }

    #[test]
    fn text_encoding_lists_labelled_series() {
        let m = EngineMetrics::new();
        m.binding_checks.with_label_values(&["high"]).inc();
        m.operation_latency_ms
            .with_label_values(&["register_helper"])
            .observe(1.5);
        let text = m.encode_text().unwrap();
        assert!(text.contains("samaritan_device_binding_checks_total{risk=\"high\"} 1"));
        assert!(text.contains("samaritan_operation_latency_ms_bucket"));
    }
}
