//! Login IP tracking.
//!
//! Records each login IP on the account and raises warnings for IP churn and
//! for crowded IPs. These are advisory signals only; nothing is blocked.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;

use samaritan_types::{Account, AccountId, AuditEvent, DeviceParams, SessionRecord, Timestamp};

const DAY_SECS: u64 = 86_400;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpWarning {
    ExcessiveIpChanges { changes: u32 },
    SharedIpAddress { accounts: Vec<AccountId> },
}

impl IpWarning {
    pub fn to_audit_event(&self) -> AuditEvent {
        match self {
            Self::ExcessiveIpChanges { changes } => AuditEvent::ExcessiveIpChanges {
                changes: *changes,
                window_secs: DAY_SECS,
            },
            Self::SharedIpAddress { accounts } => AuditEvent::SharedIpAddress {
                accounts: accounts.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct IpActivityMonitor {
    params: DeviceParams,
}

impl IpActivityMonitor {
    pub fn new(params: DeviceParams) -> Self {
        Self { params }
    }

    /// Record a login from `ip` on `account` and evaluate the IP policies.
    ///
    /// `ip_sessions` are the sessions already stored for `ip`; the current
    /// login is counted whether or not it is among them.
    pub fn observe_login(
        &self,
        account: &mut Account,
        ip: IpAddr,
        ip_sessions: &[SessionRecord],
        now: Timestamp,
    ) -> Vec<IpWarning> {
        if account.registered_ip.is_none() {
            account.registered_ip = Some(ip);
        }
        account.last_login_ip = Some(ip);
        account.ip_history.push(ip, now);

        let mut warnings = Vec::new();

        let changes = account
            .ip_history
            .changes_since(now.saturating_sub_secs(DAY_SECS)) as u32;
        if changes > self.params.max_ip_changes_per_day {
            warnings.push(IpWarning::ExcessiveIpChanges { changes });
        }

        let since = now.saturating_sub_secs(self.params.multi_account_window_days * DAY_SECS);
        let accounts: BTreeSet<AccountId> = ip_sessions
            .iter()
            .filter(|s| s.ip == ip && s.created_at >= since)
            .map(|s| s.account_id.clone())
            .chain(std::iter::once(account.id.clone()))
            .collect();
        if accounts.len() as u32 > self.params.max_accounts_per_ip {
            warnings.push(IpWarning::SharedIpAddress {
                accounts: accounts.into_iter().collect(),
            });
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(n: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(198, 51, 100, n))
    }

    fn session(account: &str, addr: IpAddr, secs: u64) -> SessionRecord {
        SessionRecord {
            account_id: AccountId::new(account),
            ip: addr,
            created_at: Timestamp::from_secs(secs),
        }
    }

    #[test]
    fn first_login_sets_registered_ip() {
        let mut a = Account::new(AccountId::new("a"), Timestamp::EPOCH);
        let warnings =
            IpActivityMonitor::default().observe_login(&mut a, ip(1), &[], Timestamp::from_secs(10));
        assert!(warnings.is_empty());
        assert_eq!(a.registered_ip, Some(ip(1)));
        assert_eq!(a.last_login_ip, Some(ip(1)));

        IpActivityMonitor::default().observe_login(&mut a, ip(2), &[], Timestamp::from_secs(20));
        assert_eq!(a.registered_ip, Some(ip(1)));
        assert_eq!(a.last_login_ip, Some(ip(2)));
        assert_eq!(a.ip_history.len(), 2);
    }

    #[test]
    fn churn_beyond_daily_limit_warns() {
        let monitor = IpActivityMonitor::default();
        let mut a = Account::new(AccountId::new("a"), Timestamp::EPOCH);
        let mut last = Vec::new();
        // 7 logins alternating between two IPs = 6 changes.
        for i in 0..7u64 {
            last = monitor.observe_login(&mut a, ip((i % 2) as u8), &[], Timestamp::from_secs(100 + i));
        }
        assert_eq!(last, vec![IpWarning::ExcessiveIpChanges { changes: 6 }]);
    }

    #[test]
    fn churn_outside_window_is_forgotten() {
        let monitor = IpActivityMonitor::default();
        let mut a = Account::new(AccountId::new("a"), Timestamp::EPOCH);
        for i in 0..7u64 {
            monitor.observe_login(&mut a, ip((i % 2) as u8), &[], Timestamp::from_secs(100 + i));
        }
        let warnings =
            monitor.observe_login(&mut a, ip(0), &[], Timestamp::from_secs(100 + 2 * DAY_SECS));
        assert!(warnings.is_empty());
    }

    #[test]
    fn crowded_ip_warns() {
        let addr = ip(9);
        let sessions = vec![
            session("b", addr, 100),
            session("c", addr, 100),
            session("d", addr, 100),
        ];
        let mut a = Account::new(AccountId::new("a"), Timestamp::EPOCH);
        let warnings =
            IpActivityMonitor::default().observe_login(&mut a, addr, &sessions, Timestamp::from_secs(200));
        match warnings.as_slice() {
            [IpWarning::SharedIpAddress { accounts }] => assert_eq!(accounts.len(), 4),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn three_accounts_per_ip_is_tolerated() {
        let addr = ip(9);
        let sessions = vec![session("b", addr, 100), session("c", addr, 100)];
        let mut a = Account::new(AccountId::new("a"), Timestamp::EPOCH);
        let warnings =
            IpActivityMonitor::default().observe_login(&mut a, addr, &sessions, Timestamp::from_secs(200));
        assert!(warnings.is_empty());
    }
}
