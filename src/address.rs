//! Bluetooth LE device addresses
//!
//! A [`BluetoothDeviceAddress`] is kept in the byte order it is transferred over HCI, the least
//! significant octet is at index zero. For a random device address the two most significant bits
//! (the upper bits of index five) determine the kind of random address.
//!
//! ```text
//!  index:   5        4        3        2        1        0
//!         +--------+--------+--------+--------+--------+--------+
//!         | kk.... |  prand / random  |       hash / random      |
//!         +--------+--------+--------+--------+--------+--------+
//!           ^^ kind bits
//! ```
//!
//! A resolvable private address is formed from a 24 bit `prand` (the upper half) and a 24 bit
//! `hash` (the lower half) where the hash is the output of the function [`ah`] for the `prand`
//! under an identity resolving key.
//!
//! [`ah`]: crate::cryptography::ah

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mask of the two bits used to mark the kind of a random address
pub const RANDOM_KIND_MASK: u8 = 0xC0;

/// Kind bits of a resolvable private address (`0b01`)
pub const RESOLVABLE_MSB: u8 = 0x40;

/// Kind bits of a static device address (`0b11`)
pub const STATIC_MSB: u8 = 0xC0;

/// Kind bits of a non-resolvable private address (`0b00`)
pub const NON_RESOLVABLE_MSB: u8 = 0x00;

/// A Bluetooth device address
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BluetoothDeviceAddress(pub [u8; 6]);

impl BluetoothDeviceAddress {
    /// The length of a Bluetooth device address in bytes
    pub const LEN: usize = 6;

    /// Create an address with all bytes zero
    ///
    /// The zeroed address is used as the "dummy" address when refreshing the active address of a
    /// device.
    pub const fn zeroed() -> Self {
        BluetoothDeviceAddress([0; 6])
    }

    /// Create an address from bytes in display order
    ///
    /// Display order is the order an address is normally written in, `[0xAA, 0xBB, ...]` creates
    /// the address `AA:BB:...`.
    pub fn from_display_order(mut bytes: [u8; 6]) -> Self {
        bytes.reverse();

        BluetoothDeviceAddress(bytes)
    }

    /// Check if every byte of the address is zero
    pub fn is_zeroed(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Get the `prand` of the address
    ///
    /// These are the three most significant bytes, with the least significant of those first.
    pub fn prand(&self) -> [u8; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    /// Get the `hash` of the address
    ///
    /// These are the three least significant bytes, with the least significant first.
    pub fn hash(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Create an address from its `hash` and `prand` parts
    pub fn from_parts(hash: [u8; 3], prand: [u8; 3]) -> Self {
        BluetoothDeviceAddress([hash[0], hash[1], hash[2], prand[0], prand[1], prand[2]])
    }

    /// Classify the address by the kind bits of a random address
    ///
    /// This only has meaning when the address is known to be a random device address.
    pub fn random_kind(&self) -> RandomAddressKind {
        RandomAddressKind::from_msb(self.0[5])
    }

    /// Check if the address is marked as a resolvable private address
    pub fn is_resolvable(&self) -> bool {
        self.random_kind() == RandomAddressKind::Resolvable
    }

    /// Overwrite the kind bits of this address with the bits for `kind`
    pub fn set_random_kind(&mut self, kind: RandomAddressKind) {
        self.0[5] = kind.mark(self.0[5])
    }
}

impl core::ops::Deref for BluetoothDeviceAddress {
    type Target = [u8; 6];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::ops::DerefMut for BluetoothDeviceAddress {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<[u8; 6]> for BluetoothDeviceAddress {
    fn from(bytes: [u8; 6]) -> Self {
        BluetoothDeviceAddress(bytes)
    }
}

impl core::fmt::Display for BluetoothDeviceAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[5], self.0[4], self.0[3], self.0[2], self.0[1], self.0[0]
        )
    }
}

impl core::fmt::Debug for BluetoothDeviceAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

/// The type of a LE device address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AddressType {
    #[default]
    Public,
    Random,
}

/// The kind of a random device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RandomAddressKind {
    /// A non-resolvable private address
    NonResolvable,
    /// A resolvable private address
    Resolvable,
    /// The reserved kind (`0b10`)
    Reserved,
    /// A static device address
    Static,
}

impl RandomAddressKind {
    fn from_msb(msb: u8) -> Self {
        match msb & RANDOM_KIND_MASK {
            NON_RESOLVABLE_MSB => RandomAddressKind::NonResolvable,
            RESOLVABLE_MSB => RandomAddressKind::Resolvable,
            STATIC_MSB => RandomAddressKind::Static,
            _ => RandomAddressKind::Reserved,
        }
    }

    /// Get the kind bits within the most significant byte
    pub fn bits(self) -> u8 {
        match self {
            RandomAddressKind::NonResolvable => NON_RESOLVABLE_MSB,
            RandomAddressKind::Resolvable => RESOLVABLE_MSB,
            RandomAddressKind::Reserved => 0x80,
            RandomAddressKind::Static => STATIC_MSB,
        }
    }

    /// Mark the most significant byte of an address with this kind
    pub fn mark(self, msb: u8) -> u8 {
        (msb & !RANDOM_KIND_MASK) | self.bits()
    }
}
