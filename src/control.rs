//! The private address control block
//!
//! The control block holds the state shared between the generator and the resolver. It lives
//! within an [`AddressManager`](crate::manager::AddressManager) for the lifetime of the manager.
//!
//! There are two single-slot guards in the control block, one for a resolution and one for a
//! non-resolvable private address generation. A slot is claimed by an [`InFlight`] and is released
//! when the `InFlight` is dropped.

use crate::address::{AddressType, BluetoothDeviceAddress};
use core::cell::RefCell;
use core::time::Duration;
use tokio::time::Instant;

/// The one-shot timer for rotating the resolvable private address
///
/// There is only ever one deadline, arming the timer replaces the previous deadline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTimer {
    deadline: Option<Instant>,
}

impl RefreshTimer {
    /// Arm (or re-arm) the timer to expire `timeout` from now
    pub fn arm(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    /// Cancel the timer
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Get the deadline of the timer
    ///
    /// `None` is returned if the timer is not armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}

/// The state of private address management
#[derive(Debug, Default)]
pub struct PrivateAddressControlBlock {
    /// The random address installed in the Controller
    pub(crate) private_address: BluetoothDeviceAddress,
    pub(crate) own_address_type: AddressType,
    pub(crate) refresh_timer: RefreshTimer,
    generation_pending: bool,
    resolution_busy: bool,
}

impl PrivateAddressControlBlock {
    pub fn new() -> Self {
        PrivateAddressControlBlock::default()
    }

    /// Get the random address installed in the Controller
    pub fn private_address(&self) -> BluetoothDeviceAddress {
        self.private_address
    }

    pub fn own_address_type(&self) -> AddressType {
        self.own_address_type
    }

    pub fn refresh_timer(&self) -> &RefreshTimer {
        &self.refresh_timer
    }

    /// Check if a non-resolvable private address generation is in flight
    pub fn is_generation_pending(&self) -> bool {
        self.generation_pending
    }

    /// Check if a resolution is in flight
    pub fn is_resolving(&self) -> bool {
        self.resolution_busy
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut bool {
        match slot {
            Slot::Generation => &mut self.generation_pending,
            Slot::Resolution => &mut self.resolution_busy,
        }
    }
}

/// A single in-flight slot of the control block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Generation,
    Resolution,
}

/// A claimed slot of the control block
///
/// The slot is released on drop, so an operation that is dropped before it completes does not
/// leave the slot claimed.
pub(crate) struct InFlight<'a> {
    control: &'a RefCell<PrivateAddressControlBlock>,
    slot: Slot,
}

impl<'a> InFlight<'a> {
    /// Try to claim `slot`
    ///
    /// `None` is returned if the slot is already claimed.
    pub(crate) fn claim(control: &'a RefCell<PrivateAddressControlBlock>, slot: Slot) -> Option<Self> {
        let mut cb = control.borrow_mut();

        let claimed = cb.slot_mut(slot);

        if *claimed {
            None
        } else {
            *claimed = true;

            Some(InFlight { control, slot })
        }
    }

    /// Release the slot
    pub(crate) fn release(self) {
        drop(self)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.control.borrow_mut().slot_mut(self.slot) = false;
    }
}
