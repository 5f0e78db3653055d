//! Private address configuration

use crate::errors::Error;
use core::time::Duration;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The default interval between resolvable private address rotations (fifteen minutes)
pub const DEFAULT_RPA_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// The minimum resolvable private address timeout
pub const MIN_RPA_TIMEOUT: Duration = Duration::from_secs(1);

/// The maximum resolvable private address timeout
///
/// This is the maximum RPA timeout that can be given to a Controller (`0xA1B8` seconds).
pub const MAX_RPA_TIMEOUT: Duration = Duration::from_secs(0xA1B8);

/// Configuration for the private address manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrivacyConfig {
    /// The Identity Resolving Key of this device
    ///
    /// This is used for generating resolvable private addresses.
    pub local_irk: u128,
    /// The time a resolvable private address is used before it is rotated
    pub rpa_timeout: Duration,
}

impl PrivacyConfig {
    /// Create a new configuration with the default rotation interval
    pub fn new(local_irk: u128) -> Self {
        PrivacyConfig {
            local_irk,
            rpa_timeout: DEFAULT_RPA_TIMEOUT,
        }
    }

    /// Validate the configuration
    ///
    /// The RPA timeout must be within [`MIN_RPA_TIMEOUT`] and [`MAX_RPA_TIMEOUT`].
    pub fn validate(&self) -> Result<(), Error> {
        validate_rpa_timeout(self.rpa_timeout)
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        PrivacyConfig::new(0)
    }
}

pub(crate) fn validate_rpa_timeout(timeout: Duration) -> Result<(), Error> {
    if (MIN_RPA_TIMEOUT..=MAX_RPA_TIMEOUT).contains(&timeout) {
        Ok(())
    } else {
        Err(Error::InvalidRpaTimeout(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = PrivacyConfig::default();

        assert_eq!(DEFAULT_RPA_TIMEOUT, config.rpa_timeout);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn timeout_range() {
        let mut config = PrivacyConfig::new(1);

        config.rpa_timeout = Duration::from_millis(999);

        assert_eq!(Err(Error::InvalidRpaTimeout(config.rpa_timeout)), config.validate());

        config.rpa_timeout = MAX_RPA_TIMEOUT;

        assert!(config.validate().is_ok());

        config.rpa_timeout = MAX_RPA_TIMEOUT + Duration::from_secs(1);

        assert!(config.validate().is_err());
    }
}
