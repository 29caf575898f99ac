//! The integrity engine facade.
//!
//! Synchronous decision and storage work lives in [`EngineCore`]. The public
//! [`IntegrityEngine`] wraps every call in [`KeyedLocks::run`], so the core
//! always executes on the blocking pool while holding the lock of the record
//! it mutates:
//!
//! | Operation | Lock |
//! |---|---|
//! | location, login, trust, visibility, multi-account | account |
//! | device check, registration, block | fingerprint |
//! | helper registration, withdrawal, listing | request |

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use samaritan_device::{
    BindingCheck, BindingPolicy, DeviceError, IpActivityMonitor, IpWarning, MultiAccountReport,
    RiskLevel,
};
use samaritan_location::{
    FraudSideEffect, LocationError, LocationFix, LocationOutcome, LocationRejection,
    LocationValidator, ProximityTarget,
};
use samaritan_ranking::{RankArbiter, RankGrant};
use samaritan_store::{Journal, StoreError, UpdateDecision};
use samaritan_trust::{apply_event, filter_visible, TrustError, TrustEvent, TrustSnapshot, TrustTransition};
use samaritan_types::{
    Account, AccountId, AdminAction, AdminActionEntry, AuditEvent, DeviceBinding, DeviceMeta,
    Fingerprint, HelperRegistration, IntegrityParams, LastKnownLocation, RequestId,
    SecurityAuditEntry, SessionRecord, Timestamp,
};

use crate::tracing_spans::{
    device_block_span, device_span, location_span, login_span, rank_span, trust_span,
};
use crate::{
    AuditRelay, EngineConfig, EngineError, EngineMetrics, EngineStores, FlushReport, KeyedLocks,
    LockKey,
};

const DAY_SECS: u64 = 86_400;

/// Stateless between calls apart from the stores and the audit retry queue.
struct EngineCore {
    stores: EngineStores,
    params: IntegrityParams,
    validator: LocationValidator,
    binding_policy: BindingPolicy,
    ip_monitor: IpActivityMonitor,
    arbiter: RankArbiter,
    relay: AuditRelay,
    metrics: Arc<EngineMetrics>,
}

pub struct IntegrityEngine {
    core: Arc<EngineCore>,
    locks: KeyedLocks,
}

impl IntegrityEngine {
    pub fn new(config: &EngineConfig, stores: EngineStores) -> Self {
        let params = config.params.clone();
        let metrics = Arc::new(EngineMetrics::new());
        let arbiter = RankArbiter::new(
            stores.requests.clone(),
            stores.accounts.clone(),
            stores.registrations.clone(),
            params.ranking.clone(),
        );
        let relay = AuditRelay::new(stores.audit.clone(), metrics.clone(), config.max_pending_audits);
        let core = EngineCore {
            validator: LocationValidator::new(params.location.clone()),
            binding_policy: BindingPolicy::new(params.device.clone()),
            ip_monitor: IpActivityMonitor::new(params.device.clone()),
            arbiter,
            relay,
            metrics,
            params,
            stores,
        };
        Self {
            core: Arc::new(core),
            locks: KeyedLocks::new(config.max_concurrent_ops),
        }
    }

    /// Build an engine on the storage backend named in `config`.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let stores = EngineStores::open(&config.storage)?;
        info!(
            backend = ?config.storage.backend,
            max_concurrent_ops = config.max_concurrent_ops,
            "integrity engine started"
        );
        Ok(Self::new(config, stores))
    }

    pub fn params(&self) -> &IntegrityParams {
        &self.core.params
    }

    pub fn stores(&self) -> &EngineStores {
        &self.core.stores
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.core.metrics.clone()
    }

    async fn run<R, F>(&self, op: &'static str, key: LockKey, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&EngineCore) -> Result<R, EngineError> + Send + 'static,
        R: Send + 'static,
    {
        let core = Arc::clone(&self.core);
        let started = Instant::now();
        let result = self.locks.run(&key, move || f(&core)).await.and_then(|r| r);
        self.core
            .metrics
            .operation_latency_ms
            .with_label_values(&[op])
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        result
    }

    // ── Location ────────────────────────────────────────────────────────

    /// Validate `fix` for `account_id` and store it as the last-known location
    /// when accepted.
    ///
    /// A fraud rejection flags the account and writes a high-severity audit
    /// entry; the returned [`LocationRejection`] carries that side effect.
    /// The stored location never changes on rejection.
    pub async fn validate_and_maybe_update_location(
        &self,
        account_id: &AccountId,
        fix: LocationFix,
        target: Option<ProximityTarget>,
        now: Timestamp,
    ) -> Result<LocationOutcome, EngineError> {
        let id = account_id.clone();
        self.run("location", LockKey::Account(id.clone()), move |core| {
            let _span = location_span(id.as_str()).entered();
            core.validate_location(&id, &fix, target.as_ref(), now)
        })
        .await
    }

    // ── Devices ─────────────────────────────────────────────────────────

    /// Decide whether `account_id` may use `fingerprint`, auditing HIGH and
    /// CRITICAL outcomes.
    pub async fn check_device_binding(
        &self,
        account_id: &AccountId,
        fingerprint: &Fingerprint,
        now: Timestamp,
    ) -> Result<BindingCheck, EngineError> {
        let id = account_id.clone();
        let fp = fingerprint.clone();
        self.run("check_device_binding", LockKey::Device(fp.clone()), move |core| {
            let _span = device_span(id.as_str(), fp.as_str()).entered();
            core.check_binding(&id, &fp, now)
        })
        .await
    }

    /// Bind `fingerprint` to `account_id`, or refresh the existing binding.
    pub async fn register_device(
        &self,
        account_id: &AccountId,
        fingerprint: &Fingerprint,
        meta: DeviceMeta,
        now: Timestamp,
    ) -> Result<DeviceBinding, EngineError> {
        let id = account_id.clone();
        let fp = fingerprint.clone();
        self.run("register_device", LockKey::Device(fp.clone()), move |core| {
            let _span = device_span(id.as_str(), fp.as_str()).entered();
            core.register_device(&id, &fp, meta, now)
        })
        .await
    }

    /// Other accounts linked to `account_id` through `fingerprint` or through
    /// recent sessions from `ip`. Read-only.
    pub async fn detect_multiple_accounts(
        &self,
        account_id: &AccountId,
        fingerprint: &Fingerprint,
        ip: Option<IpAddr>,
        now: Timestamp,
    ) -> Result<MultiAccountReport, EngineError> {
        let id = account_id.clone();
        let fp = fingerprint.clone();
        self.run("detect_multiple_accounts", LockKey::Account(id.clone()), move |core| {
            core.detect_multiple_accounts(&id, &fp, ip, now)
        })
        .await
    }

    /// Block every binding of `fingerprint`. Returns the affected bindings.
    pub async fn block_device(
        &self,
        fingerprint: &Fingerprint,
        admin_id: &AccountId,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<Vec<DeviceBinding>, EngineError> {
        let fp = fingerprint.clone();
        let admin = admin_id.clone();
        let reason = reason.into();
        self.run("block_device", LockKey::Device(fp.clone()), move |core| {
            let _span = device_block_span(fp.as_str(), admin.as_str()).entered();
            core.block_device(&fp, &admin, reason, now)
        })
        .await
    }

    /// Record a login from `ip`. Warnings are advisory and never block.
    pub async fn record_login(
        &self,
        account_id: &AccountId,
        ip: IpAddr,
        now: Timestamp,
    ) -> Result<Vec<IpWarning>, EngineError> {
        let id = account_id.clone();
        self.run("record_login", LockKey::Account(id.clone()), move |core| {
            let _span = login_span(id.as_str(), &ip.to_string()).entered();
            core.record_login(&id, ip, now)
        })
        .await
    }

    // ── Trust & visibility ─────────────────────────────────────────────

    pub async fn apply_trust_event(
        &self,
        account_id: &AccountId,
        event: TrustEvent,
        now: Timestamp,
    ) -> Result<TrustSnapshot, EngineError> {
        let id = account_id.clone();
        self.run("apply_trust_event", LockKey::Account(id.clone()), move |core| {
            let _span = trust_span(id.as_str(), event.name()).entered();
            core.apply_trust_event(&id, &event, now)
        })
        .await
    }

    /// Whether `account_id` is hidden from everyone but itself. Always
    /// computed from the stored record.
    pub async fn is_invisible(&self, account_id: &AccountId) -> Result<bool, EngineError> {
        let id = account_id.clone();
        self.run("is_invisible", LockKey::Account(id.clone()), move |core| {
            let account = core.load_account(&id)?;
            Ok(samaritan_trust::is_invisible(&account, &core.params.trust))
        })
        .await
    }

    /// The accounts among `candidates` that `viewer` may see. Unknown ids are
    /// skipped.
    pub async fn visible_accounts(
        &self,
        viewer: &AccountId,
        candidates: Vec<AccountId>,
    ) -> Result<Vec<Account>, EngineError> {
        let viewer = viewer.clone();
        let core = Arc::clone(&self.core);
        tokio::task::spawn_blocking(move || -> Result<Vec<Account>, EngineError> {
            let accounts = core.stores.accounts.get_accounts(&candidates)?;
            Ok(filter_visible(&viewer, &accounts, &core.params.trust)
                .into_iter()
                .cloned()
                .collect())
        })
        .await
        .map_err(|e| EngineError::Task(e.to_string()))?
    }

    pub async fn account(&self, account_id: &AccountId) -> Result<Account, EngineError> {
        let id = account_id.clone();
        let core = Arc::clone(&self.core);
        tokio::task::spawn_blocking(move || core.load_account(&id))
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?
    }

    // ── Helper ranks ────────────────────────────────────────────────────

    /// Register `helper_id` on `request_id` and return its arrival rank.
    pub async fn register_helper(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
        now: Timestamp,
    ) -> Result<RankGrant, EngineError> {
        let req = request_id.clone();
        let helper = helper_id.clone();
        self.run("register_helper", LockKey::Request(req.clone()), move |core| {
            let _span = rank_span(req.as_str(), helper.as_str()).entered();
            let grant = core.arbiter.register(&req, &helper, now)?;
            if grant.newly_registered {
                core.metrics.rank_grants.inc();
                if grant.contact_unlocked {
                    core.metrics.contact_unlocks.inc();
                }
            }
            Ok(grant)
        })
        .await
    }

    /// Withdraw `helper_id` from `request_id`. Ranks never move.
    pub async fn withdraw_helper(
        &self,
        request_id: &RequestId,
        helper_id: &AccountId,
        now: Timestamp,
    ) -> Result<bool, EngineError> {
        let req = request_id.clone();
        let helper = helper_id.clone();
        self.run("withdraw_helper", LockKey::Request(req.clone()), move |core| {
            let _span = rank_span(req.as_str(), helper.as_str()).entered();
            Ok(core.arbiter.withdraw(&req, &helper, now)?)
        })
        .await
    }

    /// Registrations on `request_id` in rank order.
    pub async fn helper_registrations(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<HelperRegistration>, EngineError> {
        let req = request_id.clone();
        self.run("helper_registrations", LockKey::Request(req.clone()), move |core| {
            Ok(core.arbiter.registrations(&req)?)
        })
        .await
    }

    /// Whether `rank` unlocks requester contact under the configured K.
    pub fn unlocks_contact(&self, rank: u32) -> bool {
        self.core.arbiter.unlocks_contact(rank)
    }

    // ── Housekeeping ────────────────────────────────────────────────────

    /// Retry audit entries whose first write failed.
    pub async fn flush_pending_audits(&self) -> Result<FlushReport, EngineError> {
        let core = Arc::clone(&self.core);
        let report = tokio::task::spawn_blocking(move || core.relay.flush())
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?;
        if report.delivered > 0 {
            info!(
                delivered = report.delivered,
                remaining = report.remaining,
                "flushed pending audit entries"
            );
        }
        Ok(report)
    }

    pub fn pending_audits(&self) -> usize {
        self.core.relay.pending()
    }

    /// Drop idle per-key locks. Meant for the periodic external sweep.
    pub async fn prune_idle_locks(&self) -> usize {
        self.locks.prune_idle().await
    }

    /// Stop admitting new operations.
    pub fn close(&self) {
        self.locks.close();
    }
}

impl EngineCore {
    fn account_error(id: &AccountId, err: StoreError) -> EngineError {
        if err.is_not_found() {
            EngineError::AccountNotFound(id.clone())
        } else {
            EngineError::Store(err)
        }
    }

    fn load_account(&self, id: &AccountId) -> Result<Account, EngineError> {
        self.stores
            .accounts
            .get_account(id)
            .map_err(|e| Self::account_error(id, e))
    }

    fn require_account(&self, id: &AccountId) -> Result<(), EngineError> {
        if self.stores.accounts.exists(id)? {
            Ok(())
        } else {
            Err(EngineError::AccountNotFound(id.clone()))
        }
    }

    fn validate_location(
        &self,
        id: &AccountId,
        fix: &LocationFix,
        target: Option<&ProximityTarget>,
        now: Timestamp,
    ) -> Result<LocationOutcome, EngineError> {
        // Tolerated skew is absorbed here so the stored fix never runs ahead of the server.
        let stored = LastKnownLocation {
            lat: fix.lat,
            lng: fix.lng,
            observed_at: fix.observed_at.min(now),
        };
        let mut verdict = None;
        self.stores
            .accounts
            .update_account(id, &mut |account| {
                let result = self.validator.evaluate(
                    fix,
                    account.last_known_location.as_ref(),
                    target,
                    now,
                );
                let decision = match &result {
                    Ok(_) => {
                        account.last_known_location = Some(stored);
                        UpdateDecision::Commit
                    }
                    Err(err) if err.is_fraud_signal() => {
                        account.flags.is_flagged = true;
                        UpdateDecision::Commit
                    }
                    Err(_) => UpdateDecision::Discard,
                };
                verdict = Some(result);
                decision
            })
            .map_err(|e| Self::account_error(id, e))?;

        let Some(verdict) = verdict else {
            return Err(EngineError::AccountNotFound(id.clone()));
        };

        match verdict {
            Ok(accepted) => {
                self.metrics.fixes_accepted.inc();
                debug!(
                    confidence = accepted.confidence,
                    warnings = accepted.warnings.len(),
                    "location fix accepted"
                );
                Ok(LocationOutcome {
                    confidence: accepted.confidence,
                    warnings: accepted.warnings,
                    stored,
                    distance_to_target_km: accepted.distance_to_target_km,
                })
            }
            Err(error) => {
                self.metrics
                    .fixes_rejected
                    .with_label_values(&[error.kind()])
                    .inc();
                Err(self.reject_location(id, error, now).into())
            }
        }
    }

    fn reject_location(&self, id: &AccountId, error: LocationError, now: Timestamp) -> LocationRejection {
        let Some(evidence) = error.fraud_evidence(self.validator.params()) else {
            debug!(%error, "location fix rejected");
            return LocationRejection::plain(error);
        };
        warn!(%error, "fraudulent location fix, account flagged");
        self.metrics.fraud_flags.inc();
        let audit = self
            .relay
            .record(SecurityAuditEntry::new(Some(id.clone()), evidence, now));
        LocationRejection::with_side_effect(
            error,
            FraudSideEffect {
                audit,
                account_flagged: true,
            },
        )
    }

    fn assess_binding(
        &self,
        id: &AccountId,
        fingerprint_bindings: &[DeviceBinding],
        own_bindings: &[DeviceBinding],
    ) -> Result<BindingCheck, EngineError> {
        let others: Vec<AccountId> = fingerprint_bindings
            .iter()
            .filter(|b| &b.account_id != id)
            .map(|b| b.account_id.clone())
            .collect();
        let owners = self.stores.accounts.get_accounts(&others)?;
        Ok(self
            .binding_policy
            .assess(id, fingerprint_bindings, own_bindings, &owners))
    }

    fn note_binding_check(&self, id: &AccountId, fp: &Fingerprint, check: &BindingCheck, now: Timestamp) {
        let risk = check.risk_level.to_string().to_lowercase();
        self.metrics.binding_checks.with_label_values(&[risk.as_str()]).inc();

        let event = match check.risk_level {
            RiskLevel::Critical => AuditEvent::BannedDeviceReuse {
                banned_accounts: check.sanctioned_accounts.clone(),
            },
            RiskLevel::High => AuditEvent::MultiAccountDetected {
                conflicting: check.conflicting_accounts.clone(),
            },
            RiskLevel::Low | RiskLevel::Medium => {
                debug!(risk = %check.risk_level, new_device = check.is_new_device, "binding checked");
                return;
            }
        };
        warn!(
            risk = %check.risk_level,
            conflicting = check.conflicting_accounts.len(),
            allowed = check.allowed,
            "device shared with other accounts"
        );
        self.relay.record(
            SecurityAuditEntry::new(Some(id.clone()), event, now).with_fingerprint(fp.clone()),
        );
    }

    fn check_binding(
        &self,
        id: &AccountId,
        fp: &Fingerprint,
        now: Timestamp,
    ) -> Result<BindingCheck, EngineError> {
        self.require_account(id)?;
        let by_fingerprint = self.stores.devices.bindings_for_fingerprint(fp)?;
        let own = self.stores.devices.bindings_for_account(id)?;
        let check = self.assess_binding(id, &by_fingerprint, &own)?;
        self.note_binding_check(id, fp, &check, now);
        Ok(check)
    }

    fn register_device(
        &self,
        id: &AccountId,
        fp: &Fingerprint,
        meta: DeviceMeta,
        now: Timestamp,
    ) -> Result<DeviceBinding, EngineError> {
        let check = self.check_binding(id, fp, now)?;
        if !check.allowed {
            return Err(DeviceError::BannedDeviceReuse(fp.clone()).into());
        }

        let mut refusal = None;
        let upserted = self.stores.devices.upsert_binding_with(fp, id, &mut |by_fp, own| {
            match self
                .binding_policy
                .plan_registration(id, fp, by_fp, own, meta.clone(), now)
            {
                Ok(binding) => Some(binding),
                Err(err) => {
                    refusal = Some(err);
                    None
                }
            }
        })?;

        match (upserted, refusal) {
            (Some(binding), _) => {
                self.metrics.devices_registered.inc();
                debug!(primary = binding.is_primary, "device binding stored");
                Ok(binding)
            }
            (None, Some(err)) => {
                debug!(%err, "device registration refused");
                Err(err.into())
            }
            (None, None) => Err(StoreError::Corruption(format!(
                "binding upsert for {fp} returned no row"
            ))
            .into()),
        }
    }

    fn detect_multiple_accounts(
        &self,
        id: &AccountId,
        fp: &Fingerprint,
        ip: Option<IpAddr>,
        now: Timestamp,
    ) -> Result<MultiAccountReport, EngineError> {
        let by_fingerprint = self.stores.devices.bindings_for_fingerprint(fp)?;
        let sessions = match ip {
            Some(ip) => self.stores.sessions.sessions_for_ip(ip, self.session_window_start(now))?,
            None => Vec::new(),
        };
        Ok(self
            .binding_policy
            .linked_accounts(id, &by_fingerprint, &sessions, now))
    }

    fn block_device(
        &self,
        fp: &Fingerprint,
        admin: &AccountId,
        reason: String,
        now: Timestamp,
    ) -> Result<Vec<DeviceBinding>, EngineError> {
        let blocked = self.stores.devices.block_fingerprint(fp)?;
        for binding in &blocked {
            self.stores.admin_log.append_admin_action(&AdminActionEntry {
                admin_id: admin.clone(),
                target: binding.account_id.clone(),
                action: AdminAction::BlockDevice,
                reason: reason.clone(),
                created_at: now,
            })?;
        }
        self.metrics.devices_blocked.inc_by(blocked.len() as u64);
        info!(bindings = blocked.len(), "device blocked");
        self.relay.record(
            SecurityAuditEntry::new(
                None,
                AuditEvent::DeviceBlocked {
                    admin_id: admin.clone(),
                    bindings: blocked.len() as u32,
                },
                now,
            )
            .with_fingerprint(fp.clone()),
        );
        Ok(blocked)
    }

    fn session_window_start(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub_secs(self.params.device.multi_account_window_days * DAY_SECS)
    }

    fn record_login(
        &self,
        id: &AccountId,
        ip: IpAddr,
        now: Timestamp,
    ) -> Result<Vec<IpWarning>, EngineError> {
        let ip_sessions = self
            .stores
            .sessions
            .sessions_for_ip(ip, self.session_window_start(now))?;

        let mut warnings = Vec::new();
        self.stores
            .accounts
            .update_account(id, &mut |account| {
                warnings = self.ip_monitor.observe_login(account, ip, &ip_sessions, now);
                UpdateDecision::Commit
            })
            .map_err(|e| Self::account_error(id, e))?;

        self.stores.sessions.record_session(&SessionRecord {
            account_id: id.clone(),
            ip,
            created_at: now,
        })?;

        for warning in &warnings {
            self.metrics.ip_warnings.inc();
            warn!(?warning, "suspicious login IP activity");
            self.relay.record(
                SecurityAuditEntry::new(Some(id.clone()), warning.to_audit_event(), now).with_ip(ip),
            );
        }
        Ok(warnings)
    }

    fn apply_trust_event(
        &self,
        id: &AccountId,
        event: &TrustEvent,
        now: Timestamp,
    ) -> Result<TrustSnapshot, EngineError> {
        let params = &self.params.trust;
        let mut outcome: Option<Result<TrustTransition, TrustError>> = None;

        let (account, _) = self
            .stores
            .accounts
            .update_account_journaled(id, &mut |account| match apply_event(account, event, params) {
                Ok(transition) => {
                    let journal = manual_ban_journal(account, event, &transition, now);
                    outcome = Some(Ok(transition));
                    Some(journal)
                }
                Err(err) => {
                    outcome = Some(Err(err));
                    None
                }
            })
            .map_err(|e| Self::account_error(id, e))?;

        let transition = match outcome {
            Some(result) => result?,
            None => return Err(EngineError::AccountNotFound(id.clone())),
        };

        self.metrics
            .trust_events
            .with_label_values(&[event.name()])
            .inc();

        match event {
            TrustEvent::ManualShadowBan { admin_id, .. } => {
                self.metrics.shadow_bans.inc();
                info!(admin = %admin_id, "account shadow-banned by administrator");
            }
            _ => {
                if transition.strike_shadow_ban {
                    self.metrics.shadow_bans.inc();
                    warn!(strikes = account.strike_count, "strike limit reached, account shadow-banned");
                }
                for audit_event in transition.audit_events {
                    self.relay
                        .record(SecurityAuditEntry::new(Some(id.clone()), audit_event, now));
                }
            }
        }

        debug!(
            before = transition.score_before,
            after = transition.score_after,
            strikes = account.strike_count,
            "trust event applied"
        );
        Ok(TrustSnapshot::of(&account, params))
    }
}

/// Audit and admin-log rows committed together with a manual shadow ban.
fn manual_ban_journal(
    account: &Account,
    event: &TrustEvent,
    transition: &TrustTransition,
    now: Timestamp,
) -> Journal {
    let TrustEvent::ManualShadowBan { admin_id, reason } = event else {
        return Journal::default();
    };
    Journal {
        audit: transition
            .audit_events
            .iter()
            .cloned()
            .map(|e| SecurityAuditEntry::new(Some(account.id.clone()), e, now))
            .collect(),
        admin: vec![AdminActionEntry {
            admin_id: admin_id.clone(),
            target: account.id.clone(),
            action: AdminAction::ShadowBan,
            reason: reason.clone(),
            created_at: now,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samaritan_nullables::NullStore;
    use samaritan_store::{AccountStore, AuditSink};

    fn id(s: &str) -> AccountId {
        AccountId::new(s)
    }

    fn engine_with(store: Arc<NullStore>) -> IntegrityEngine {
        IntegrityEngine::new(&EngineConfig::default(), EngineStores::from_null_store(store))
    }

    fn seeded(names: &[&str]) -> (Arc<NullStore>, IntegrityEngine) {
        let store = Arc::new(NullStore::new());
        for name in names {
            store
                .put_account(&Account::new(id(name), Timestamp::EPOCH))
                .unwrap();
        }
        let engine = engine_with(store.clone());
        (store, engine)
    }

    #[tokio::test]
    async fn unknown_account_is_reported() {
        let (_, engine) = seeded(&[]);
        let err = engine
            .validate_and_maybe_update_location(
                &id("ghost"),
                LocationFix::new(52.52, 13.405, Timestamp::from_secs(1)),
                None,
                Timestamp::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn plain_rejection_leaves_account_untouched() {
        let (store, engine) = seeded(&["a"]);
        let err = engine
            .validate_and_maybe_update_location(
                &id("a"),
                LocationFix::new(95.0, 13.0, Timestamp::from_secs(1)),
                None,
                Timestamp::from_secs(1),
            )
            .await
            .unwrap_err();
        match err {
            EngineError::Location(rejection) => {
                assert!(matches!(rejection.error, LocationError::InvalidLocation { .. }));
                assert!(rejection.side_effect.is_none());
            }
            other => panic!("unexpected error {other:?}"),
        }
        let account = store.get_account(&id("a")).unwrap();
        assert!(!account.flags.is_flagged);
        assert!(account.last_known_location.is_none());
        assert_eq!(store.audit_len(), 0);
    }

    #[tokio::test]
    async fn manual_shadow_ban_journals_audit_and_admin_entry() {
        let (store, engine) = seeded(&["a"]);
        let snapshot = engine
            .apply_trust_event(
                &id("a"),
                TrustEvent::ManualShadowBan {
                    admin_id: id("admin"),
                    reason: "spam".into(),
                },
                Timestamp::from_secs(5),
            )
            .await
            .unwrap();
        assert!(snapshot.flags.is_shadow_banned);
        assert!(snapshot.flags.is_flagged);
        assert!(snapshot.invisible);
        assert_eq!(snapshot.score, 50);

        let audit = store.entries_for_account(&id("a")).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].1.event_type(), "MANUAL_SHADOW_BAN");

        use samaritan_store::AdminLogStore;
        let admin = store.admin_actions_for(&id("a")).unwrap();
        assert_eq!(admin.len(), 1);
        assert_eq!(admin[0].action, AdminAction::ShadowBan);
        assert_eq!(engine.metrics().shadow_bans.get(), 1);
    }

    #[tokio::test]
    async fn invalid_rating_changes_nothing() {
        let (store, engine) = seeded(&["a"]);
        let err = engine
            .apply_trust_event(&id("a"), TrustEvent::PositiveRating { stars: 9 }, Timestamp::EPOCH)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Trust(TrustError::InvalidRating(9))));
        assert_eq!(store.get_account(&id("a")).unwrap().integrity_score, 50);
    }

    #[tokio::test]
    async fn login_records_session_and_ip() {
        let (store, engine) = seeded(&["a"]);
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        let warnings = engine
            .record_login(&id("a"), ip, Timestamp::from_secs(100))
            .await
            .unwrap();
        assert!(warnings.is_empty());

        let account = store.get_account(&id("a")).unwrap();
        assert_eq!(account.registered_ip, Some(ip));
        assert_eq!(account.last_login_ip, Some(ip));

        use samaritan_store::SessionStore;
        let sessions = store.sessions_for_ip(ip, Timestamp::EPOCH).unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn latency_is_recorded_per_operation() {
        let (_, engine) = seeded(&["a"]);
        engine.is_invisible(&id("a")).await.unwrap();
        let text = engine.metrics().encode_text().unwrap();
        assert!(text.contains("op=\"is_invisible\""));
    }

    #[tokio::test]
    async fn closed_engine_refuses_work() {
        let (_, engine) = seeded(&["a"]);
        engine.close();
        let err = engine.is_invisible(&id("a")).await.unwrap_err();
        assert!(matches!(err, EngineError::ShuttingDown));
    }
}
