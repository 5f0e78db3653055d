//! Bluetooth LE Privacy
//!
//! A device using privacy does not advertise or connect with its identity address. Instead it uses
//! a private address that is periodically changed. This library manages the private addresses of
//! this device and keeps track of the private addresses used by peer devices.
//!
//! # Private Addresses
//! There are two kinds of private addresses. A *resolvable* private address is made from three
//! random bytes (the `prand`) and a hash of the `prand` under the Identity Resolving Key (IRK) of
//! the device. A peer device that was given the IRK during bonding can resolve the address to the
//! identity of the device. A *non-resolvable* private address is only random bytes and cannot be
//! linked to the device by anyone.
//!
//! The two most significant bits of a random address mark its kind (see
//! [`RandomAddressKind`]).
//!
//! # The Address Manager
//! All operations go through an [`AddressManager`]. The manager holds the state of private
//! addressing for this device and the collaborators needed for it.
//! * A [`CryptoGateway`] for random numbers, encryption, and setting the random address of the
//!   Controller. [`SoftwareGateway`] does all of these on the host.
//! * An [`IdentityRecordStore`] containing the identity information of peer devices.
//! * Optionally a [`ConnectionTable`] and an [`IrkEntryRefresh`] hook used by the address mapping.
//!
//! Asynchronous operations are futures that can be awaited by any executor. The refresh timer of
//! the resolvable private address uses the time driver of `tokio`, so
//! [`rotation_timeout`](AddressManager::rotation_timeout) and [`rotate`](AddressManager::rotate)
//! must be awaited within a tokio runtime.
//!
//! # Features
//! * `serde` derives `Serialize` and `Deserialize` for the data types.
//! * `sys-rand` (default) enables [`SoftwareGateway::os_rng`].
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod address;
pub mod config;
pub mod connection;
pub mod control;
pub mod cryptography;
pub mod errors;
pub mod gateway;
mod generator;
pub mod manager;
pub mod mapping;
pub mod records;
pub mod resolver;

pub use address::{AddressType, BluetoothDeviceAddress, RandomAddressKind};
pub use config::PrivacyConfig;
pub use connection::{ActiveAddress, Connection, ConnectionTable, Transport};
pub use errors::Error;
pub use gateway::{CryptoGateway, SoftwareGateway};
pub use manager::{AddressManager, AddressManagerBuilder};
pub use mapping::IrkEntryRefresh;
pub use records::{ActiveAddressKind, DeviceType, IdentityRecord, IdentityRecordStore, KeyType};
pub use resolver::{ResolutionSession, ResolutionState, Step};
