//! Location Integrity Validator.
//!
//! Decides whether a reported location fix is accepted, accepted with
//! warnings, or rejected, given the account's previous fix and an optional
//! target site. The decision core in [`LocationValidator`] is pure; the caller
//! applies side effects (persisting the fix, flagging the account, writing
//! audit entries) according to the returned outcome.
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. coordinate validity
//! 2. timestamp no further ahead of server time than the skew allowance
//! 3. spoof heuristics (warnings, except reported speed which rejects)
//! 4. consistency with the prior fix (teleport / impossible travel)
//! 5. proximity to a target
//! 6. confidence scoring on acceptance

pub mod error;
pub mod fix;
pub mod outcome;
pub mod validator;

pub use error::LocationError;
pub use fix::{LocationFix, ProximityTarget};
pub use outcome::{FraudSideEffect, LocationOutcome, LocationRejection};
pub use validator::{AcceptedFix, LocationValidator, SpoofWarning};
