//! Pre-built [`tracing::Span`] constructors for engine operations.
//!
//! Consistent span names and field sets make it easy to filter and correlate
//! one account's or one request's activity across log lines.

use tracing::{info_span, Span};

/// Span covering one location fix validation and commit.
pub fn location_span(account: &str) -> Span {
    info_span!("location_fix", account = %account)
}

/// Span covering a device binding check or registration.
pub fn device_span(account: &str, fingerprint: &str) -> Span {
    info_span!("device_binding", account = %account, fingerprint = %fingerprint)
}

/// Span covering an administrative device block.
pub fn device_block_span(fingerprint: &str, admin: &str) -> Span {
    info_span!("device_block", fingerprint = %fingerprint, admin = %admin)
}

/// Span covering a login IP observation.
pub fn login_span(account: &str, ip: &str) -> Span {
    info_span!("login", account = %account, ip = %ip)
}

/// Span covering one trust event applied to an account.
pub fn trust_span(account: &str, event: &str) -> Span {
    info_span!("trust_event", account = %account, event = %event)
}

/// Span covering a helper registration or withdrawal on a request.
pub fn rank_span(request: &str, helper: &str) -> Span {
    info_span!("helper_rank", request = %request, helper = %helper)
}
