use thiserror::Error;

use samaritan_types::Fingerprint;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("device {0} is blocked for this account")]
    DeviceConflict(Fingerprint),

    #[error("device {0} was used by a sanctioned account")]
    BannedDeviceReuse(Fingerprint),

    #[error("device limit reached: at most {max} active devices per account")]
    DeviceLimitReached { max: u32 },
}

impl DeviceError {
    /// Message safe to show the acting user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DeviceConflict(_) | Self::BannedDeviceReuse(_) => {
                "This device can't be used with your account. Please contact support."
            }
            Self::DeviceLimitReached { .. } => {
                "You've reached the maximum number of devices for your account."
            }
        }
    }
}
