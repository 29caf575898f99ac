//! Scripted replay of engine commands.
//!
//! Input is JSON lines, one [`ReplayCommand`] per line. Each command produces
//! one JSON outcome line. Blank lines and lines starting with `#` are skipped.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use samaritan_device::{compute_fingerprint, DeviceAttributes};
use samaritan_engine::{EngineError, IntegrityEngine};
use samaritan_location::{LocationFix, ProximityTarget};
use samaritan_ranking::RankError;
use samaritan_store::StoreError;
use samaritan_trust::TrustEvent;
use samaritan_types::{
    Account, AccountId, DeviceMeta, Fingerprint, HelpRequest, RequestId, RequestStatus, Timestamp,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayCommand {
    SeedAccount {
        account: AccountId,
        #[serde(default)]
        score: Option<u32>,
        #[serde(default)]
        at: Timestamp,
    },
    SeedRequest {
        request: RequestId,
        requester: AccountId,
        lat: f64,
        lng: f64,
        #[serde(default)]
        expires_at: Option<Timestamp>,
        #[serde(default)]
        at: Timestamp,
    },
    CloseRequest {
        request: RequestId,
    },
    Location {
        account: AccountId,
        fix: LocationFix,
        #[serde(default)]
        target: Option<ProximityTarget>,
        at: Timestamp,
    },
    Fingerprint {
        attributes: DeviceAttributes,
    },
    CheckDevice {
        account: AccountId,
        fingerprint: Fingerprint,
        at: Timestamp,
    },
    RegisterDevice {
        account: AccountId,
        fingerprint: Fingerprint,
        #[serde(default)]
        meta: DeviceMeta,
        at: Timestamp,
    },
    DetectAccounts {
        account: AccountId,
        fingerprint: Fingerprint,
        #[serde(default)]
        ip: Option<IpAddr>,
        at: Timestamp,
    },
    BlockDevice {
        fingerprint: Fingerprint,
        admin: AccountId,
        reason: String,
        at: Timestamp,
    },
    Login {
        account: AccountId,
        ip: IpAddr,
        at: Timestamp,
    },
    Trust {
        account: AccountId,
        event: TrustEvent,
        at: Timestamp,
    },
    Visibility {
        account: AccountId,
    },
    RegisterHelper {
        request: RequestId,
        helper: AccountId,
        at: Timestamp,
    },
    WithdrawHelper {
        request: RequestId,
        helper: AccountId,
        at: Timestamp,
    },
    Registrations {
        request: RequestId,
    },
    FlushAudits,
}

impl ReplayCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SeedAccount { .. } => "seed_account",
            Self::SeedRequest { .. } => "seed_request",
            Self::CloseRequest { .. } => "close_request",
            Self::Location { .. } => "location",
            Self::Fingerprint { .. } => "fingerprint",
            Self::CheckDevice { .. } => "check_device",
            Self::RegisterDevice { .. } => "register_device",
            Self::DetectAccounts { .. } => "detect_accounts",
            Self::BlockDevice { .. } => "block_device",
            Self::Login { .. } => "login",
            Self::Trust { .. } => "trust",
            Self::Visibility { .. } => "visibility",
            Self::RegisterHelper { .. } => "register_helper",
            Self::WithdrawHelper { .. } => "withdraw_helper",
            Self::Registrations { .. } => "registrations",
            Self::FlushAudits => "flush_audits",
        }
    }
}

/// Tally of a replay run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub commands: usize,
    pub rejected: usize,
}

/// Parse one input line. `None` for blank lines and comments.
pub fn parse_line(line: &str) -> Option<Result<ReplayCommand, serde_json::Error>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    Some(serde_json::from_str(trimmed))
}

/// Run `command` and render its outcome.
///
/// Domain rejections become `{"error": ...}` outcomes. Infrastructure
/// failures abort the replay.
pub async fn execute(engine: &IntegrityEngine, command: ReplayCommand) -> Result<Value, EngineError> {
    let op = command.name();
    match run(engine, command).await {
        Ok(value) => Ok(json!({ "op": op, "ok": value })),
        Err(err) if err.is_infrastructure() => Err(err),
        Err(err) => Ok(json!({
            "op": op,
            "error": err.to_string(),
            "user_message": err.user_message(),
        })),
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::Task(format!("encode outcome: {e}")))
}

async fn run(engine: &IntegrityEngine, command: ReplayCommand) -> Result<Value, EngineError> {
    let stores = engine.stores();
    match command {
        ReplayCommand::SeedAccount { account, score, at } => {
            let score = score.unwrap_or_else(|| engine.params().trust.default_score.into());
            let record = Account::with_score(account, score, at)
                .map_err(|e| EngineError::Config(e.to_string()))?;
            stores.accounts.put_account(&record)?;
            to_value(record)
        }
        ReplayCommand::SeedRequest {
            request,
            requester,
            lat,
            lng,
            expires_at,
            at,
        } => {
            let record = HelpRequest {
                id: request,
                requester_id: requester,
                lat,
                lng,
                status: RequestStatus::Open,
                created_at: at,
                expires_at,
            };
            stores.requests.put_request(&record)?;
            to_value(record)
        }
        ReplayCommand::CloseRequest { request } => {
            let mut record = stores.requests.get_request(&request).map_err(|e| match e {
                StoreError::NotFound(_) => EngineError::from(RankError::RequestNotFound(request.clone())),
                other => other.into(),
            })?;
            record.status = RequestStatus::Closed;
            stores.requests.put_request(&record)?;
            to_value(record)
        }
        ReplayCommand::Location {
            account,
            fix,
            target,
            at,
        } => to_value(
            engine
                .validate_and_maybe_update_location(&account, fix, target, at)
                .await?,
        ),
        ReplayCommand::Fingerprint { attributes } => to_value(compute_fingerprint(&attributes)),
        ReplayCommand::CheckDevice {
            account,
            fingerprint,
            at,
        } => to_value(engine.check_device_binding(&account, &fingerprint, at).await?),
        ReplayCommand::RegisterDevice {
            account,
            fingerprint,
            meta,
            at,
        } => to_value(engine.register_device(&account, &fingerprint, meta, at).await?),
        ReplayCommand::DetectAccounts {
            account,
            fingerprint,
            ip,
            at,
        } => to_value(
            engine
                .detect_multiple_accounts(&account, &fingerprint, ip, at)
                .await?,
        ),
        ReplayCommand::BlockDevice {
            fingerprint,
            admin,
            reason,
            at,
        } => to_value(engine.block_device(&fingerprint, &admin, reason, at).await?),
        ReplayCommand::Login { account, ip, at } => {
            to_value(engine.record_login(&account, ip, at).await?)
        }
        ReplayCommand::Trust { account, event, at } => {
            to_value(engine.apply_trust_event(&account, event, at).await?)
        }
        ReplayCommand::Visibility { account } => {
            let invisible = engine.is_invisible(&account).await?;
            Ok(json!({ "invisible": invisible }))
        }
        ReplayCommand::RegisterHelper { request, helper, at } => {
            to_value(engine.register_helper(&request, &helper, at).await?)
        }
        ReplayCommand::WithdrawHelper { request, helper, at } => {
            let recorded = engine.withdraw_helper(&request, &helper, at).await?;
            Ok(json!({ "withdrawn": recorded }))
        }
        ReplayCommand::Registrations { request } => {
            let rows: Vec<Value> = engine
                .helper_registrations(&request)
                .await?
                .into_iter()
                .map(|r| {
                    json!({
                        "helper": r.helper_id,
                        "rank": r.rank,
                        "contact_unlocked": engine.unlocks_contact(r.rank),
                        "registered_at": r.registered_at,
                    })
                })
                .collect();
            Ok(Value::Array(rows))
        }
        ReplayCommand::FlushAudits => to_value(engine.flush_pending_audits().await?),
    }
}
