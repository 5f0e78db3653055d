//! The private address manager
//!
//! An [`AddressManager`] is the context of all private address operations. It owns the control
//! block along with the collaborators it needs: the [`CryptoGateway`], the identity record store,
//! the connection table, and the hook for refreshing resolving list entries. Operations of the
//! generator, resolver, and address mapping are methods of the manager.
//!
//! The manager is designed to be driven from a single task. Asynchronous operations borrow the
//! manager immutably and suspend only while awaiting the gateway, so a resolution and a
//! generation may be in flight at the same time. The record store is never borrowed across a
//! suspension point.
//!
//! ```
//! # use bo_tie_privacy::{AddressManagerBuilder, SoftwareGateway, IdentityRecord, PrivacyConfig};
//! # use rand::SeedableRng;
//! # futures::executor::block_on(async {
//! let gateway = SoftwareGateway::new(rand_chacha::ChaCha20Rng::seed_from_u64(0));
//!
//! let records: Vec<IdentityRecord> = Vec::new();
//!
//! let manager = AddressManagerBuilder::new(gateway, records)
//!     .set_config(PrivacyConfig::new(0x1234_5678))
//!     .build()
//!     .unwrap();
//!
//! let address = manager.generate_resolvable_private_address().await.unwrap();
//!
//! assert!(address.is_resolvable());
//! # })
//! ```
//!
//! [`CryptoGateway`]: crate::gateway::CryptoGateway

use crate::address::{AddressType, BluetoothDeviceAddress};
use crate::config::{validate_rpa_timeout, PrivacyConfig};
use crate::control::PrivateAddressControlBlock;
use crate::errors::Error;
use crate::gateway::CryptoGateway;
use core::cell::{Cell, Ref, RefCell, RefMut};
use core::time::Duration;
use tokio::time::Instant;

/// Builder of an [`AddressManager`]
///
/// The gateway and the identity record store are required. By default there is no connection
/// table and resolving list entries are not refreshed.
pub struct AddressManagerBuilder<G, S, C = (), R = ()> {
    gateway: G,
    records: S,
    connections: C,
    irk_refresh: R,
    config: PrivacyConfig,
}

impl<G, S> AddressManagerBuilder<G, S> {
    /// Create a new `AddressManagerBuilder`
    pub fn new(gateway: G, records: S) -> Self {
        AddressManagerBuilder {
            gateway,
            records,
            connections: (),
            irk_refresh: (),
            config: PrivacyConfig::default(),
        }
    }
}

impl<G, S, C, R> AddressManagerBuilder<G, S, C, R> {
    /// Set the configuration
    pub fn set_config(mut self, config: PrivacyConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the Identity Resolving Key of this device
    pub fn set_local_irk(mut self, irk: u128) -> Self {
        self.config.local_irk = irk;
        self
    }

    /// Set the time between rotations of the resolvable private address
    pub fn set_rpa_timeout(mut self, timeout: Duration) -> Self {
        self.config.rpa_timeout = timeout;
        self
    }

    /// Set the connection table
    ///
    /// The connection table is used to update the active address of live connections when the
    /// current resolvable address of a device is refreshed.
    pub fn set_connections<T>(self, connections: T) -> AddressManagerBuilder<G, S, T, R> {
        AddressManagerBuilder {
            gateway: self.gateway,
            records: self.records,
            connections,
            irk_refresh: self.irk_refresh,
            config: self.config,
        }
    }

    /// Set the hook for refreshing the resolving list entry of a device
    ///
    /// See [`IrkEntryRefresh`](crate::mapping::IrkEntryRefresh).
    pub fn set_irk_refresh<T>(self, irk_refresh: T) -> AddressManagerBuilder<G, S, C, T> {
        AddressManagerBuilder {
            gateway: self.gateway,
            records: self.records,
            connections: self.connections,
            irk_refresh,
            config: self.config,
        }
    }

    /// Build the `AddressManager`
    ///
    /// An error is returned if the configuration is invalid.
    pub fn build(self) -> Result<AddressManager<G, S, C, R>, Error> {
        self.config.validate()?;

        log::trace!("(PRIVACY) address manager created with an RPA timeout of {:?}", self.config.rpa_timeout);

        Ok(AddressManager {
            gateway: self.gateway,
            records: RefCell::new(self.records),
            connections: RefCell::new(self.connections),
            irk_refresh: RefCell::new(self.irk_refresh),
            config: Cell::new(self.config),
            control: RefCell::new(PrivateAddressControlBlock::new()),
        })
    }
}

/// The private address manager
///
/// See the [module](self) level documentation.
pub struct AddressManager<G, S, C = (), R = ()> {
    pub(crate) gateway: G,
    pub(crate) records: RefCell<S>,
    pub(crate) connections: RefCell<C>,
    pub(crate) irk_refresh: RefCell<R>,
    pub(crate) config: Cell<PrivacyConfig>,
    pub(crate) control: RefCell<PrivateAddressControlBlock>,
}

impl<G, S, C, R> AddressManager<G, S, C, R> {
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Borrow the identity record store
    ///
    /// # Panic
    /// This panics if the store is currently borrowed mutably.
    pub fn records(&self) -> Ref<'_, S> {
        self.records.borrow()
    }

    /// Mutably borrow the identity record store
    ///
    /// The store must not have records added or removed while a resolution is in progress.
    ///
    /// # Panic
    /// This panics if the store is currently borrowed.
    pub fn records_mut(&self) -> RefMut<'_, S> {
        self.records.borrow_mut()
    }

    /// Borrow the connection table
    pub fn connections(&self) -> Ref<'_, C> {
        self.connections.borrow()
    }

    /// Mutably borrow the connection table
    pub fn connections_mut(&self) -> RefMut<'_, C> {
        self.connections.borrow_mut()
    }

    /// Borrow the hook for refreshing resolving list entries
    pub fn irk_refresh(&self) -> Ref<'_, R> {
        self.irk_refresh.borrow()
    }

    pub fn config(&self) -> PrivacyConfig {
        self.config.get()
    }

    /// Change the time between rotations of the resolvable private address
    ///
    /// The new timeout is used the next time the refresh timer is armed.
    pub fn set_rpa_timeout(&self, timeout: Duration) -> Result<(), Error> {
        validate_rpa_timeout(timeout)?;

        let mut config = self.config.get();

        config.rpa_timeout = timeout;

        self.config.set(config);

        Ok(())
    }

    /// Get the random address installed in the Controller
    pub fn own_address(&self) -> BluetoothDeviceAddress {
        self.control.borrow().private_address()
    }

    /// Get the address type used by this device
    pub fn own_address_type(&self) -> AddressType {
        self.control.borrow().own_address_type()
    }

    /// Check if a resolution is in progress
    pub fn is_resolving(&self) -> bool {
        self.control.borrow().is_resolving()
    }

    /// Check if a non-resolvable private address generation is pending
    pub fn is_generation_pending(&self) -> bool {
        self.control.borrow().is_generation_pending()
    }

    /// Get the deadline of the refresh timer
    pub fn rotation_deadline(&self) -> Option<Instant> {
        self.control.borrow().refresh_timer().deadline()
    }

    /// Wait for the refresh timer to expire
    ///
    /// This returns `true` once the armed refresh timer expires. If the timer is re-armed while
    /// waiting, the wait continues to the new deadline. `false` is returned if the timer is not
    /// armed or it is cancelled while waiting.
    pub async fn rotation_timeout(&self) -> bool {
        loop {
            let Some(deadline) = self.rotation_deadline() else {
                return false;
            };

            tokio::time::sleep_until(deadline).await;

            let mut control = self.control.borrow_mut();

            if control.refresh_timer.deadline() == Some(deadline) {
                control.refresh_timer.cancel();

                return true;
            }
        }
    }

    /// Tear down private addressing
    ///
    /// The refresh timer is cancelled and this device goes back to using its public address.
    pub fn teardown(&self) {
        let mut control = self.control.borrow_mut();

        control.refresh_timer.cancel();

        control.own_address_type = AddressType::Public;

        log::trace!("(PRIVACY) torn down");
    }
}

impl<G, S, C, R> AddressManager<G, S, C, R>
where
    G: CryptoGateway,
{
    /// Rotate the resolvable private address when the refresh timer expires
    ///
    /// This waits for [`rotation_timeout`] and then generates a new resolvable private address.
    /// If generation fails the refresh timer is armed again so that rotation is retried after the
    /// next interval.
    ///
    /// `None` is returned if the refresh timer is not armed (or was cancelled).
    ///
    /// [`rotation_timeout`]: AddressManager::rotation_timeout
    pub async fn rotate(&self) -> Option<Result<BluetoothDeviceAddress, Error>> {
        if !self.rotation_timeout().await {
            return None;
        }

        let result = self.generate_resolvable_private_address().await;

        if result.is_err() {
            let timeout = self.config.get().rpa_timeout;

            self.control.borrow_mut().refresh_timer.arm(timeout);
        }

        Some(result)
    }
}
