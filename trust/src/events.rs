//! Event-driven trust transitions.

use serde::{Deserialize, Serialize};

use samaritan_types::{Account, AccountFlags, AccountId, AuditEvent, TrustParams};

use crate::{is_invisible, TrustError};

/// Something that happened in the marketplace that moves an account's trust.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustEvent {
    SuccessfulHelp,
    /// Star rating received; only ratings at or above the positive threshold count.
    PositiveRating { stars: u8 },
    NoShow,
    ValidReport,
    /// Administrative shadow ban, independent of score.
    ManualShadowBan { admin_id: AccountId, reason: String },
}

impl TrustEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SuccessfulHelp => "successful_help",
            Self::PositiveRating { .. } => "positive_rating",
            Self::NoShow => "no_show",
            Self::ValidReport => "valid_report",
            Self::ManualShadowBan { .. } => "manual_shadow_ban",
        }
    }
}

/// Trust state after an event, as returned to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSnapshot {
    pub score: u8,
    pub strikes: u32,
    pub flags: AccountFlags,
    pub invisible: bool,
}

impl TrustSnapshot {
    pub fn of(account: &Account, params: &TrustParams) -> Self {
        Self {
            score: account.integrity_score,
            strikes: account.strike_count,
            flags: account.flags,
            invisible: is_invisible(account, params),
        }
    }
}

/// What an event changed, including the audit evidence it produced.
#[derive(Clone, Debug, PartialEq)]
pub struct TrustTransition {
    pub score_before: u8,
    pub score_after: u8,
    /// The event pushed strikes to the limit and silently shadow-banned the account.
    pub strike_shadow_ban: bool,
    /// Audit events to record alongside the state change.
    pub audit_events: Vec<AuditEvent>,
}

impl TrustTransition {
    pub fn score_delta(&self) -> i16 {
        self.score_after as i16 - self.score_before as i16
    }
}

/// Apply `event` to `account` in place.
///
/// The score is clamped to `0..=100`; strikes only increase.
pub fn apply_event(
    account: &mut Account,
    event: &TrustEvent,
    params: &TrustParams,
) -> Result<TrustTransition, TrustError> {
    let score_before = account.integrity_score;
    let mut strike_shadow_ban = false;
    let mut audit_events = Vec::new();

    match event {
        TrustEvent::SuccessfulHelp => raise(account, params.successful_help_delta),
        TrustEvent::PositiveRating { stars } => {
            if !(1..=5).contains(stars) {
                return Err(TrustError::InvalidRating(*stars));
            }
            if *stars >= params.positive_rating_min_stars {
                raise(account, params.positive_rating_delta);
            }
        }
        TrustEvent::NoShow => {
            lower(account, params.no_show_penalty);
            account.strike_count = account.strike_count.saturating_add(1);
            if account.strike_count >= params.strike_limit && !account.flags.is_shadow_banned {
                account.flags.is_shadow_banned = true;
                strike_shadow_ban = true;
                audit_events.push(AuditEvent::StrikeLimitShadowBan {
                    strikes: account.strike_count,
                });
            }
        }
        TrustEvent::ValidReport => lower(account, params.valid_report_penalty),
        TrustEvent::ManualShadowBan { admin_id, reason } => {
            account.flags.is_shadow_banned = true;
            account.flags.is_flagged = true;
            audit_events.push(AuditEvent::ManualShadowBan {
                admin_id: admin_id.clone(),
                reason: reason.clone(),
            });
        }
    }

    Ok(TrustTransition {
        score_before,
        score_after: account.integrity_score,
        strike_shadow_ban,
        audit_events,
    })
}

fn raise(account: &mut Account, delta: u8) {
    account.integrity_score = account
        .integrity_score
        .saturating_add(delta)
        .min(Account::MAX_SCORE);
}

fn lower(account: &mut Account, delta: u8) {
    account.integrity_score = account.integrity_score.saturating_sub(delta);
}

#[cfg(test)]
mod tests {
    use super::*;
    use samaritan_types::Timestamp;

    fn fresh() -> Account {
        Account::new(AccountId::new("a"), Timestamp::EPOCH)
    }

    fn apply(account: &mut Account, event: TrustEvent) -> TrustTransition {
        apply_event(account, &event, &TrustParams::default()).unwrap()
    }

    #[test]
    fn successful_help_adds_three_and_caps() {
        let mut a = fresh();
        apply(&mut a, TrustEvent::SuccessfulHelp);
        assert_eq!(a.integrity_score, 53);

        a.integrity_score = 99;
        let t = apply(&mut a, TrustEvent::SuccessfulHelp);
        assert_eq!(a.integrity_score, 100);
        assert_eq!(t.score_delta(), 1);
    }

    #[test]
    fn positive_rating_only_counts_four_and_five_stars() {
        let mut a = fresh();
        apply(&mut a, TrustEvent::PositiveRating { stars: 3 });
        assert_eq!(a.integrity_score, 50);
        apply(&mut a, TrustEvent::PositiveRating { stars: 4 });
        assert_eq!(a.integrity_score, 52);
        apply(&mut a, TrustEvent::PositiveRating { stars: 5 });
        assert_eq!(a.integrity_score, 54);
    }

    #[test]
    fn rating_out_of_range_is_rejected_without_change() {
        let mut a = fresh();
        let err = apply_event(
            &mut a,
            &TrustEvent::PositiveRating { stars: 6 },
            &TrustParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, TrustError::InvalidRating(6));
        assert_eq!(a, fresh());
    }

    #[test]
    fn three_no_shows_shadow_ban_silently() {
        let mut a = fresh();
        let t1 = apply(&mut a, TrustEvent::NoShow);
        let t2 = apply(&mut a, TrustEvent::NoShow);
        assert!(!t1.strike_shadow_ban && !t2.strike_shadow_ban);
        assert!(!a.flags.is_shadow_banned);

        let t3 = apply(&mut a, TrustEvent::NoShow);
        assert!(t3.strike_shadow_ban);
        assert_eq!(a.strike_count, 3);
        assert_eq!(a.integrity_score, 20);
        assert!(a.flags.is_shadow_banned);
        assert_eq!(
            t3.audit_events,
            vec![AuditEvent::StrikeLimitShadowBan { strikes: 3 }]
        );
    }

    #[test]
    fn fourth_no_show_does_not_re_audit() {
        let mut a = fresh();
        for _ in 0..3 {
            apply(&mut a, TrustEvent::NoShow);
        }
        let t4 = apply(&mut a, TrustEvent::NoShow);
        assert!(t4.audit_events.is_empty());
        assert_eq!(a.strike_count, 4);
        assert_eq!(a.integrity_score, 10);
    }

    #[test]
    fn valid_report_floors_at_zero() {
        let mut a = fresh();
        for _ in 0..4 {
            apply(&mut a, TrustEvent::ValidReport);
        }
        assert_eq!(a.integrity_score, 0);
        assert_eq!(a.strike_count, 0);
    }

    #[test]
    fn manual_shadow_ban_flags_regardless_of_score() {
        let mut a = fresh();
        a.integrity_score = 100;
        let t = apply(
            &mut a,
            TrustEvent::ManualShadowBan {
                admin_id: AccountId::new("admin"),
                reason: "fake profile".into(),
            },
        );
        assert!(a.flags.is_shadow_banned);
        assert!(a.flags.is_flagged);
        assert_eq!(a.integrity_score, 100);
        assert_eq!(t.audit_events.len(), 1);
        assert_eq!(t.audit_events[0].event_type(), "MANUAL_SHADOW_BAN");
    }

    #[test]
    fn end_to_end_score_walk() {
        let params = TrustParams::default();
        let mut a = fresh();

        apply(&mut a, TrustEvent::NoShow);
        let s = TrustSnapshot::of(&a, &params);
        assert_eq!((s.score, s.strikes, s.invisible), (40, 1, false));

        apply(&mut a, TrustEvent::ValidReport);
        assert_eq!(a.integrity_score, 25);

        apply(&mut a, TrustEvent::NoShow);
        let s = TrustSnapshot::of(&a, &params);
        assert_eq!((s.score, s.strikes, s.invisible), (15, 2, true));
        assert!(!s.flags.is_shadow_banned);
    }
}
