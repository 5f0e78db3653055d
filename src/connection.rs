//! Connection bookkeeping used by the address mapping
//!
//! The only connection state touched by this library is the address the peer device is actively
//! using on a LE connection. Everything else about connections is managed elsewhere.

use crate::address::{AddressType, BluetoothDeviceAddress};

/// The transport of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    BrEdr,
    Le,
}

/// The address a connected peer is actively using
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveAddress {
    pub address: BluetoothDeviceAddress,
    pub address_type: AddressType,
}

/// A connection to a peer device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// The identity address of the peer device
    pub identity_address: BluetoothDeviceAddress,
    pub transport: Transport,
    /// The address the peer is using on this connection
    pub active_remote: ActiveAddress,
}

impl Connection {
    /// Create a new LE connection with the peer's identity address as the active address
    pub fn new(identity_address: BluetoothDeviceAddress, address_type: AddressType) -> Self {
        Connection {
            identity_address,
            transport: Transport::Le,
            active_remote: ActiveAddress {
                address: identity_address,
                address_type,
            },
        }
    }
}

/// Lookup of the live connections
///
/// This is implemented for `Vec<Connection>` and for `()` when there are no connections to keep
/// track of.
pub trait ConnectionTable {
    /// Find the live connection to the device with `identity_address` over `transport`
    fn find_active_connection(
        &mut self,
        identity_address: &BluetoothDeviceAddress,
        transport: Transport,
    ) -> Option<&mut ActiveAddress>;
}

impl ConnectionTable for Vec<Connection> {
    fn find_active_connection(
        &mut self,
        identity_address: &BluetoothDeviceAddress,
        transport: Transport,
    ) -> Option<&mut ActiveAddress> {
        self.iter_mut()
            .find(|c| &c.identity_address == identity_address && c.transport == transport)
            .map(|c| &mut c.active_remote)
    }
}

impl ConnectionTable for () {
    fn find_active_connection(&mut self, _: &BluetoothDeviceAddress, _: Transport) -> Option<&mut ActiveAddress> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_transport() {
        let identity = BluetoothDeviceAddress([7; 6]);

        let mut br_edr = Connection::new(identity, AddressType::Public);

        br_edr.transport = Transport::BrEdr;

        let mut connections = vec![br_edr, Connection::new(identity, AddressType::Random)];

        let active = connections.find_active_connection(&identity, Transport::Le).unwrap();

        assert_eq!(AddressType::Random, active.address_type);

        active.address = BluetoothDeviceAddress([9; 6]);

        assert_eq!(BluetoothDeviceAddress([9; 6]), connections[1].active_remote.address);
        assert_eq!(identity, connections[0].active_remote.address);

        assert!(connections
            .find_active_connection(&BluetoothDeviceAddress([8; 6]), Transport::Le)
            .is_none());
    }
}
