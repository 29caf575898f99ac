//! Help request storage trait.

use crate::StoreError;
use samaritan_types::{HelpRequest, RequestId};

/// Help requests are owned by the marketplace; the engine only reads them.
/// `put_request` exists for seeding and tests.
pub trait HelpRequestStore: Send + Sync {
    fn get_request(&self, id: &RequestId) -> Result<HelpRequest, StoreError>;
    fn put_request(&self, request: &HelpRequest) -> Result<(), StoreError>;
}
