//! Address mapping
//!
//! A peer device using privacy is known by more than one address. Upper layers look up security
//! information by the identity address of the record, the Controller reports the static address
//! of a device once it has resolved the device's private address, and connections need to know
//! the address a peer is currently using. The methods here translate between these addresses and
//! keep the current random address of a record up to date.
//!
//! A miss in any of the translations is not an error. The address given by the caller is left
//! untouched and the miss is logged.

use crate::address::{AddressType, BluetoothDeviceAddress};
use crate::connection::{ConnectionTable, Transport};
use crate::errors::Error;
use crate::manager::AddressManager;
use crate::records::{ActiveAddressKind, DeviceType, IdentityRecord, IdentityRecordStore, KeyType};

/// Refresh of the resolving list entry of a device
///
/// This is called when a device is seen using its static address while its identity address is a
/// resolvable private address. The implementation is expected to read the entry of the resolving
/// list for the device so that the current random address of the device gets refreshed.
///
/// This is implemented for `()`, which does nothing, and for `Vec<BluetoothDeviceAddress>`, which
/// collects the static addresses of the devices needing a refresh.
pub trait IrkEntryRefresh {
    fn refresh_irk_entry(&mut self, static_address: &BluetoothDeviceAddress);
}

impl IrkEntryRefresh for () {
    fn refresh_irk_entry(&mut self, _: &BluetoothDeviceAddress) {}
}

impl IrkEntryRefresh for Vec<BluetoothDeviceAddress> {
    fn refresh_irk_entry(&mut self, static_address: &BluetoothDeviceAddress) {
        self.push(*static_address)
    }
}

/// Find the index of the record with the static address `address`
///
/// Only records with a resolved random identity address are looked at. The matched record has its
/// active address kind set to `ResolvedRandom`.
fn mark_by_static_address<S>(store: &mut S, address: &BluetoothDeviceAddress) -> Option<usize>
where
    S: IdentityRecordStore + ?Sized,
{
    for index in 0..store.count() {
        if let Some(record) = store.record_at_mut(index) {
            if record.is_resolved_random() && &record.static_address == address {
                record.active_address_kind = ActiveAddressKind::ResolvedRandom;

                return Some(index);
            }
        }
    }

    None
}

impl<G, S, C, R> AddressManager<G, S, C, R>
where
    S: IdentityRecordStore,
{
    /// Map an identity address to the address used for connecting to the device
    ///
    /// If the record of `address` is for a LE only device with a non-public address type then
    /// `address` is overwritten with the static address of the record. The stored address type of
    /// the record is returned, or `AddressType::Public` if there is no such LE record.
    pub fn map_identity_to_connection_address(&self, address: &mut BluetoothDeviceAddress) -> AddressType {
        let records = self.records.borrow();

        match records.find_by_address(address) {
            Some(record) if record.device_type == DeviceType::BLE => {
                if record.address_type != AddressType::Public {
                    *address = record.static_address;
                }

                record.address_type
            }
            _ => {
                log::debug!("(PRIVACY) no LE record for identity address {}", address);

                AddressType::Public
            }
        }
    }

    /// Find the record with the static address `address`
    ///
    /// The record must have a resolved random identity address (see
    /// [`IdentityRecord::is_resolved_random`]). The first matching record in the store has its
    /// active address kind set to `ResolvedRandom` and a copy of it is returned.
    pub fn find_record_by_static_address(&self, address: &BluetoothDeviceAddress) -> Option<IdentityRecord> {
        let mut records = self.records.borrow_mut();

        let Some(index) = mark_by_static_address(&mut *records, address) else {
            log::debug!("(PRIVACY) no resolved random record has the static address {}", address);

            return None;
        };

        records.record_at(index).cloned()
    }

    /// Map a public or static address to the random identity address of its record
    ///
    /// On a match `address` is overwritten with the identity address of the record and
    /// `AddressType::Random` is returned. If `refresh_irk` is true and the identity address
    /// differs from `address`, the resolving list entry of the device is refreshed first.
    ///
    /// `None` is returned and `address` is unchanged if there is no matching record.
    pub fn map_public_to_random_pseudo_identity(
        &self,
        address: &mut BluetoothDeviceAddress,
        refresh_irk: bool,
    ) -> Option<AddressType>
    where
        R: IrkEntryRefresh,
    {
        let Some(record) = self.find_record_by_static_address(address) else {
            log::debug!("(PRIVACY) no random identity for {}", address);

            return None;
        };

        if refresh_irk && record.identity_address != *address {
            self.irk_refresh.borrow_mut().refresh_irk_entry(&record.static_address);
        }

        log::trace!("(PRIVACY) mapped {} to {}", address, record.identity_address);

        *address = record.identity_address;

        Some(AddressType::Random)
    }

    /// Map a random identity address to the static address of its record
    ///
    /// The record found for `address` must have a resolved random identity address and the peer
    /// must have distributed its identity information. On a match `address` is overwritten with
    /// the static address of the record and the static address type is returned.
    ///
    /// `None` is returned and `address` is unchanged if there is no such record.
    pub fn map_random_pseudo_to_public(&self, address: &mut BluetoothDeviceAddress) -> Option<AddressType> {
        let records = self.records.borrow();

        match records.find_by_address(address) {
            Some(record) if record.is_resolved_random() && record.key_type.contains(KeyType::PEER_ID) => {
                *address = record.static_address;

                Some(record.static_address_type)
            }
            _ => {
                log::debug!("(PRIVACY) no static address for {}", address);

                None
            }
        }
    }

    /// Refresh the random address currently used by a device
    ///
    /// The record is found by its static address (see
    /// [`find_record_by_static_address`](AddressManager::find_record_by_static_address)). An all
    /// zero `new_random` means the device is using its static address.
    ///
    /// If there is a LE connection to the device its active address is set to the static address
    /// of the record (all zero `new_random`) or to `new_random`. The current random address of
    /// the record is always set to `new_random`.
    ///
    /// Nothing is changed and an error is returned if there is no record for `static_address`.
    pub fn refresh_current_resolvable_address(
        &self,
        static_address: &BluetoothDeviceAddress,
        new_random: BluetoothDeviceAddress,
    ) -> Result<(), Error>
    where
        C: ConnectionTable,
    {
        let mut records = self.records.borrow_mut();

        let record = match mark_by_static_address(&mut *records, static_address) {
            Some(index) => records.record_at_mut(index),
            None => None,
        };

        let Some(record) = record else {
            log::error!("(PRIVACY) no known device has the static address {}", static_address);

            return Err(Error::NoMatchingRecord(*static_address));
        };

        let is_static = new_random.is_zeroed();

        if let Some(active) = self
            .connections
            .borrow_mut()
            .find_active_connection(&record.identity_address, Transport::Le)
        {
            if is_static {
                active.address = record.static_address;
                active.address_type = record.static_address_type;
            } else {
                active.address = new_random;
                active.address_type = AddressType::Random;
            }
        }

        record.current_random_address = new_random;

        record.active_address_kind = if is_static {
            ActiveAddressKind::Static
        } else {
            ActiveAddressKind::ResolvedRandom
        };

        log::trace!("(PRIVACY) {} is now using {}", static_address, new_random);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::gateway::SoftwareGateway;
    use crate::manager::AddressManagerBuilder;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    type Manager =
        AddressManager<SoftwareGateway<ChaCha20Rng>, Vec<IdentityRecord>, Vec<Connection>, Vec<BluetoothDeviceAddress>>;

    const IDENTITY: BluetoothDeviceAddress = BluetoothDeviceAddress([1, 2, 3, 4, 5, 0x45]);
    const STATIC: BluetoothDeviceAddress = BluetoothDeviceAddress([6, 5, 4, 3, 2, 0xC1]);

    fn resolved_random_record() -> IdentityRecord {
        IdentityRecord::new(IDENTITY, AddressType::Random)
            .with_static_address(STATIC, AddressType::Random)
            .with_irk(0xabcd)
    }

    fn manager(records: Vec<IdentityRecord>, connections: Vec<Connection>) -> Manager {
        AddressManagerBuilder::new(SoftwareGateway::new(ChaCha20Rng::seed_from_u64(0)), records)
            .set_connections(connections)
            .set_irk_refresh(Vec::new())
            .build()
            .unwrap()
    }

    #[test]
    fn identity_to_connection_address() {
        let public = IdentityRecord::new(BluetoothDeviceAddress([9; 6]), AddressType::Public);

        let dual_mode = IdentityRecord::new(BluetoothDeviceAddress([8; 6]), AddressType::Random)
            .with_device_type(DeviceType::DUAL_MODE);

        let manager = manager(vec![resolved_random_record(), public, dual_mode], Vec::new());

        let mut address = IDENTITY;

        assert_eq!(AddressType::Random, manager.map_identity_to_connection_address(&mut address));
        assert_eq!(STATIC, address);

        let mut address = BluetoothDeviceAddress([9; 6]);

        assert_eq!(AddressType::Public, manager.map_identity_to_connection_address(&mut address));
        assert_eq!(BluetoothDeviceAddress([9; 6]), address);

        let mut address = BluetoothDeviceAddress([8; 6]);

        assert_eq!(AddressType::Public, manager.map_identity_to_connection_address(&mut address));
        assert_eq!(BluetoothDeviceAddress([8; 6]), address);

        let mut address = BluetoothDeviceAddress([7; 6]);

        assert_eq!(AddressType::Public, manager.map_identity_to_connection_address(&mut address));
        assert_eq!(BluetoothDeviceAddress([7; 6]), address);
    }

    #[test]
    fn find_by_static_address_marks_record() {
        let mut public = IdentityRecord::new(BluetoothDeviceAddress([9; 6]), AddressType::Public);

        public.static_address = STATIC;

        let manager = manager(vec![public, resolved_random_record()], Vec::new());

        let record = manager.find_record_by_static_address(&STATIC).unwrap();

        assert_eq!(IDENTITY, record.identity_address);
        assert_eq!(ActiveAddressKind::ResolvedRandom, record.active_address_kind);
        assert_eq!(ActiveAddressKind::ResolvedRandom, manager.records()[1].active_address_kind);
        assert_eq!(ActiveAddressKind::None, manager.records()[0].active_address_kind);

        assert!(manager.find_record_by_static_address(&IDENTITY).is_none());
    }

    #[test]
    fn public_to_random_pseudo_identity() {
        let manager = manager(vec![resolved_random_record()], Vec::new());

        let mut address = STATIC;

        assert_eq!(
            Some(AddressType::Random),
            manager.map_public_to_random_pseudo_identity(&mut address, false)
        );
        assert_eq!(IDENTITY, address);
        assert!(manager.irk_refresh.borrow().is_empty());

        let mut address = STATIC;

        manager.map_public_to_random_pseudo_identity(&mut address, true);

        assert_eq!(vec![STATIC], *manager.irk_refresh.borrow());
    }

    #[test]
    fn public_to_random_pseudo_identity_miss() {
        let manager = manager(vec![resolved_random_record()], Vec::new());

        let mut address = BluetoothDeviceAddress([0x33; 6]);

        assert_eq!(None, manager.map_public_to_random_pseudo_identity(&mut address, true));
        assert_eq!(BluetoothDeviceAddress([0x33; 6]), address);
        assert!(manager.irk_refresh.borrow().is_empty());
    }

    #[test]
    fn random_pseudo_to_public() {
        let without_pid = IdentityRecord::new(BluetoothDeviceAddress([0, 0, 0, 0, 0, 0x41]), AddressType::Random)
            .with_static_address(BluetoothDeviceAddress([2; 6]), AddressType::Public);

        let manager = manager(vec![resolved_random_record(), without_pid], Vec::new());

        let mut address = IDENTITY;

        assert_eq!(Some(AddressType::Random), manager.map_random_pseudo_to_public(&mut address));
        assert_eq!(STATIC, address);

        let mut address = BluetoothDeviceAddress([0, 0, 0, 0, 0, 0x41]);

        assert_eq!(None, manager.map_random_pseudo_to_public(&mut address));
        assert_eq!(BluetoothDeviceAddress([0, 0, 0, 0, 0, 0x41]), address);
    }

    #[test]
    fn refresh_with_new_random_address() {
        let connection = Connection::new(IDENTITY, AddressType::Random);

        let manager = manager(vec![resolved_random_record()], vec![connection]);

        let new_random = BluetoothDeviceAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);

        manager.refresh_current_resolvable_address(&STATIC, new_random).unwrap();

        let active = manager.connections()[0].active_remote;

        assert_eq!(new_random, active.address);
        assert_eq!(AddressType::Random, active.address_type);

        assert_eq!(new_random, manager.records()[0].current_random_address);
        assert_eq!(ActiveAddressKind::ResolvedRandom, manager.records()[0].active_address_kind);
    }

    #[test]
    fn refresh_without_record_is_no_op() {
        let manager = manager(vec![resolved_random_record()], Vec::new());

        let missing = BluetoothDeviceAddress([0x77; 6]);

        assert_eq!(
            Err(Error::NoMatchingRecord(missing)),
            manager.refresh_current_resolvable_address(&missing, BluetoothDeviceAddress([1; 6]))
        );

        assert_eq!(vec![resolved_random_record()], *manager.records());
    }
}
