//! Device identity records
//!
//! An [`IdentityRecord`] ties together the stable address of a peer device, its identity resolving
//! key (IRK), and the random address the peer is currently using. Records are owned by the security
//! record store of the host, this library only reads them and updates the current random address
//! bookkeeping in place. The store is accessed through the trait [`IdentityRecordStore`].

use crate::address::{AddressType, BluetoothDeviceAddress};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// The transports a device is known to support
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct DeviceType: u8 {
        const BR_EDR = 0x01;
        const BLE = 0x02;
        const DUAL_MODE = Self::BR_EDR.bits() | Self::BLE.bits();
    }
}

bitflags::bitflags! {
    /// The LE keys known for a device
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct KeyType: u8 {
        /// Peer encryption information
        const PEER_ENC = 0x01;
        /// Peer identity information (the peer distributed its IRK)
        const PEER_ID = 0x02;
        /// Peer signing information
        const PEER_CSRK = 0x04;
        /// Peer link key
        const PEER_LINK_KEY = 0x08;
        /// Local encryption information
        const LOCAL_ENC = 0x10;
        /// Local identity information
        const LOCAL_ID = 0x20;
        /// Local signing information
        const LOCAL_CSRK = 0x40;
    }
}

/// The kind of address a peer device is actively using
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActiveAddressKind {
    #[default]
    None,
    /// A resolvable private address that was resolved to this record
    ResolvedRandom,
    /// The static (identity) address of the device
    Static,
}

/// The identity information of a peer device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IdentityRecord {
    /// The primary key of the record
    pub identity_address: BluetoothDeviceAddress,
    /// The stored LE address type of `identity_address`
    pub address_type: AddressType,
    /// The stable address of the device that is usable for matching
    pub static_address: BluetoothDeviceAddress,
    /// The address type of `static_address`
    pub static_address_type: AddressType,
    /// The most recently used random address of the device
    pub current_random_address: BluetoothDeviceAddress,
    /// The kind of address the device is actively using
    pub active_address_kind: ActiveAddressKind,
    /// The Identity Resolving Key of the device
    pub irk: Option<u128>,
    pub device_type: DeviceType,
    pub key_type: KeyType,
}

impl IdentityRecord {
    /// Create a new `IdentityRecord`
    ///
    /// The record is created for a LE device without any keys.
    pub fn new(identity_address: BluetoothDeviceAddress, address_type: AddressType) -> Self {
        IdentityRecord {
            identity_address,
            address_type,
            device_type: DeviceType::BLE,
            ..Default::default()
        }
    }

    /// Set the static address
    pub fn with_static_address(mut self, address: BluetoothDeviceAddress, address_type: AddressType) -> Self {
        self.static_address = address;
        self.static_address_type = address_type;
        self
    }

    /// Set the peer IRK
    ///
    /// This also flags that the peer distributed its identity information.
    pub fn with_irk(mut self, irk: u128) -> Self {
        self.irk = Some(irk);
        self.key_type |= KeyType::PEER_ID;
        self
    }

    /// Set the device type
    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Set the key type
    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    /// Get the IRK if this record can be used for resolving a private address
    ///
    /// A record is a resolving candidate when it is for a LE device, the peer distributed its
    /// identity information, and there is an IRK.
    pub fn resolving_irk(&self) -> Option<u128> {
        if self.device_type.contains(DeviceType::BLE) && self.key_type.contains(KeyType::PEER_ID) {
            self.irk
        } else {
            None
        }
    }

    /// Check if the identity address of this record is a resolved random address
    ///
    /// This is true when the stored address type is random and the identity address is marked as a
    /// resolvable private address.
    pub fn is_resolved_random(&self) -> bool {
        self.address_type == AddressType::Random && self.identity_address.is_resolvable()
    }

    /// Resolve `address` on the host with the IRK of this record
    ///
    /// This returns false if this record is not a resolving candidate.
    pub fn resolves(&self, address: &BluetoothDeviceAddress) -> bool {
        self.resolving_irk()
            .map_or(false, |irk| crate::cryptography::ah(irk, address.prand()) == address.hash())
    }
}

/// The store of identity records
///
/// The store is ordered and indexed from zero. Resolution scans the store in index order and the
/// first matching record wins.
///
/// This is implemented for `Vec<IdentityRecord>`.
pub trait IdentityRecordStore {
    /// Get the number of records
    fn count(&self) -> usize;

    /// Get the record at `index`
    fn record_at(&self, index: usize) -> Option<&IdentityRecord>;

    /// Get the record at `index` for modification
    fn record_at_mut(&mut self, index: usize) -> Option<&mut IdentityRecord>;

    /// Find the index of the record whose identity address is `address`
    fn position_by_address(&self, address: &BluetoothDeviceAddress) -> Option<usize> {
        (0..self.count()).find(|i| {
            self.record_at(*i)
                .map_or(false, |record| &record.identity_address == address)
        })
    }

    /// Find the record whose identity address is `address`
    fn find_by_address(&self, address: &BluetoothDeviceAddress) -> Option<&IdentityRecord> {
        self.position_by_address(address).and_then(|i| self.record_at(i))
    }
}

impl IdentityRecordStore for Vec<IdentityRecord> {
    fn count(&self) -> usize {
        self.len()
    }

    fn record_at(&self, index: usize) -> Option<&IdentityRecord> {
        self.get(index)
    }

    fn record_at_mut(&mut self, index: usize) -> Option<&mut IdentityRecord> {
        self.get_mut(index)
    }

    fn position_by_address(&self, address: &BluetoothDeviceAddress) -> Option<usize> {
        self.iter().position(|record| &record.identity_address == address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolving_candidate() {
        let address = BluetoothDeviceAddress([1, 2, 3, 4, 5, 6]);

        let record = IdentityRecord::new(address, AddressType::Public);

        assert_eq!(None, record.resolving_irk());

        let record = record.with_irk(0x1234);

        assert_eq!(Some(0x1234), record.resolving_irk());

        let br_edr_only = record.clone().with_device_type(DeviceType::BR_EDR);

        assert_eq!(None, br_edr_only.resolving_irk());

        let dual_mode = record.clone().with_device_type(DeviceType::DUAL_MODE);

        assert_eq!(Some(0x1234), dual_mode.resolving_irk());

        let no_pid = record.with_key_type(KeyType::PEER_ENC);

        assert_eq!(None, no_pid.resolving_irk());
    }

    /// An address generated by another implementation
    #[test]
    fn record_resolves() {
        let record = IdentityRecord::new(BluetoothDeviceAddress::zeroed(), AddressType::Public)
            .with_irk(0x8b3958c1_58ed6446_7bd27bc9_0d3cf54d);

        let rpa = BluetoothDeviceAddress([0x92, 0xF2, 0x8F, 0x84, 0x72, 0x4F]);

        assert!(record.resolves(&rpa));

        let other = BluetoothDeviceAddress([0x93, 0xF2, 0x8F, 0x84, 0x72, 0x4F]);

        assert!(!record.resolves(&other));
    }

    #[test]
    fn find_by_identity_address() {
        let store = vec![
            IdentityRecord::new(BluetoothDeviceAddress([1; 6]), AddressType::Public),
            IdentityRecord::new(BluetoothDeviceAddress([2; 6]), AddressType::Random),
            IdentityRecord::new(BluetoothDeviceAddress([2; 6]), AddressType::Public),
        ];

        assert_eq!(Some(1), store.position_by_address(&BluetoothDeviceAddress([2; 6])));

        assert_eq!(
            Some(AddressType::Random),
            store
                .find_by_address(&BluetoothDeviceAddress([2; 6]))
                .map(|r| r.address_type)
        );

        assert!(store.find_by_address(&BluetoothDeviceAddress([3; 6])).is_none());
    }

    #[test]
    fn resolved_random() {
        let mut record = IdentityRecord::new(BluetoothDeviceAddress([0, 0, 0, 0, 0, 0x40]), AddressType::Random);

        assert!(record.is_resolved_random());

        record.address_type = AddressType::Public;

        assert!(!record.is_resolved_random());

        let static_random = IdentityRecord::new(BluetoothDeviceAddress([0, 0, 0, 0, 0, 0xC0]), AddressType::Random);

        assert!(!static_random.is_resolved_random());
    }
}
