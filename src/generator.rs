//! Private address generation
//!
//! A resolvable private address is generated from three random bytes (the `prand`) and the hash of
//! the `prand` under the local IRK. The generated address is installed into the Controller and
//! becomes the address of this device until it is rotated.
//!
//! Non-resolvable private addresses are generated for whoever requests one, only one such request
//! may be in flight at a time.

use crate::address::{AddressType, BluetoothDeviceAddress, RandomAddressKind};
use crate::control::{InFlight, Slot};
use crate::cryptography::{ah_hash, ah_plain_text};
use crate::errors::{Error, GatewayRequest};
use crate::gateway::CryptoGateway;
use crate::manager::AddressManager;
use core::future::Future;

impl<G, S, C, R> AddressManager<G, S, C, R>
where
    G: CryptoGateway,
{
    /// Generate a new resolvable private address for this device
    ///
    /// On success the address is installed into the Controller, the own address type becomes
    /// random, and the refresh timer is (re)armed with the RPA timeout.
    ///
    /// If any request to the gateway fails the address of this device is left unchanged. The
    /// failure is not retried, that is up to the caller (see [`rotate`]).
    ///
    /// [`rotate`]: AddressManager::rotate
    pub async fn generate_resolvable_private_address(&self) -> Result<BluetoothDeviceAddress, Error> {
        log::trace!("(PRIVACY) generating a resolvable private address");

        match self.form_resolvable_private_address().await {
            Ok(address) => {
                let timeout = self.config.get().rpa_timeout;

                let mut control = self.control.borrow_mut();

                control.private_address = address;

                control.own_address_type = AddressType::Random;

                control.refresh_timer.arm(timeout);

                log::info!("(PRIVACY) resolvable private address set to {}", address);

                Ok(address)
            }
            Err(e) => {
                log::debug!("(PRIVACY) resolvable private address generation failed: {}", e);

                Err(e)
            }
        }
    }

    async fn form_resolvable_private_address(&self) -> Result<BluetoothDeviceAddress, Error> {
        let random = self
            .gateway
            .rand()
            .await
            .map_err(|e| Error::gateway(GatewayRequest::Rand, e))?;

        let mut prand = [random[0], random[1], random[2]];

        prand[2] = RandomAddressKind::Resolvable.mark(prand[2]);

        let local_irk = self.config.get().local_irk;

        let cypher_text = self
            .gateway
            .encrypt(local_irk, ah_plain_text(prand))
            .await
            .map_err(|e| Error::gateway(GatewayRequest::Encrypt, e))?;

        let address = BluetoothDeviceAddress::from_parts(ah_hash(cypher_text), prand);

        self.gateway
            .set_random_address(address)
            .await
            .map_err(|e| Error::gateway(GatewayRequest::SetRandomAddress, e))?;

        Ok(address)
    }

    /// Generate a non-resolvable private address
    ///
    /// Only one non-resolvable private address generation can be pending. If there is already one
    /// pending then `Err(Error::GenerationPending)` is returned immediately and no future is
    /// created.
    ///
    /// The returned future completes with the generated address, or with an error if the random
    /// number request failed. The pending generation is cleared before the future completes.
    pub fn generate_non_resolvable_private_address(
        &self,
    ) -> Result<impl Future<Output = Result<BluetoothDeviceAddress, Error>> + '_, Error> {
        let Some(in_flight) = InFlight::claim(&self.control, Slot::Generation) else {
            log::warn!("(PRIVACY) non-resolvable private address generation is already pending");

            return Err(Error::GenerationPending);
        };

        Ok(async move {
            let random = self.gateway.rand().await;

            in_flight.release();

            match random {
                Ok(random) => {
                    let mut address =
                        BluetoothDeviceAddress([random[0], random[1], random[2], random[3], random[4], random[5]]);

                    address.set_random_kind(RandomAddressKind::NonResolvable);

                    log::trace!("(PRIVACY) generated non-resolvable private address {}", address);

                    Ok(address)
                }
                Err(e) => {
                    log::debug!("(PRIVACY) non-resolvable private address generation failed: {}", e);

                    Err(Error::gateway(GatewayRequest::Rand, e))
                }
            }
        })
    }

    /// Generate a static device address
    ///
    /// The two most significant bits of the address are set. The address is neither installed
    /// into the Controller nor recorded in the control block.
    pub async fn generate_static_random_address(&self) -> Result<BluetoothDeviceAddress, Error> {
        let random = self
            .gateway
            .rand()
            .await
            .map_err(|e| Error::gateway(GatewayRequest::Rand, e))?;

        let mut address = BluetoothDeviceAddress([random[0], random[1], random[2], random[3], random[4], random[5]]);

        address.set_random_kind(RandomAddressKind::Static);

        Ok(address)
    }
}
