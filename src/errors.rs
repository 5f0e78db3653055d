//! `bo-tie-privacy` Errors

use crate::address::BluetoothDeviceAddress;
use core::time::Duration;

/// A request made to the [`CryptoGateway`](crate::gateway::CryptoGateway)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayRequest {
    /// Generation of random bytes
    Rand,
    /// AES-128 encryption
    Encrypt,
    /// Installing the random address into the Controller
    SetRandomAddress,
}

impl core::fmt::Display for GatewayRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            GatewayRequest::Rand => f.write_str("random number"),
            GatewayRequest::Encrypt => f.write_str("encrypt"),
            GatewayRequest::SetRandomAddress => f.write_str("set random address"),
        }
    }
}

/// Errors of the private address management
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The request failed at the Controller boundary
    #[error("the {request} request failed: {reason}")]
    Gateway { request: GatewayRequest, reason: String },
    /// A non-resolvable private address generation is already in flight
    #[error("a non-resolvable private address generation is already pending")]
    GenerationPending,
    /// There is no identity record for the address
    #[error("no identity record matches the address {0}")]
    NoMatchingRecord(BluetoothDeviceAddress),
    /// The resolvable private address timeout is outside of the valid range
    #[error("invalid resolvable private address timeout of {0:?}")]
    InvalidRpaTimeout(Duration),
}

impl Error {
    pub(crate) fn gateway<E: core::fmt::Display>(request: GatewayRequest, e: E) -> Self {
        Error::Gateway {
            request,
            reason: e.to_string(),
        }
    }
}
