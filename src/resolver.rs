//! Resolution of resolvable private addresses
//!
//! Resolving a random address is a scan of the identity record store. For every record that has
//! an IRK (and is flagged for it) the `prand` of the address is encrypted with the IRK and the
//! truncated result is compared with the hash of the address. The first record to match is the
//! identity of the device using the address.
//!
//! The scan is a [`ResolutionSession`]. A session does not do any cryptography itself, instead
//! [`next_step`] tells the driver the encryption to perform and the driver hands the result back
//! to [`complete_encryption`]. Records that are not resolving candidates are skipped within
//! `next_step` so no encryption is requested for them.
//!
//! Most users do not need to drive a session, [`AddressManager::resolve_random_address`] drives a
//! session with the gateway of the manager.
//!
//! [`next_step`]: ResolutionSession::next_step
//! [`complete_encryption`]: ResolutionSession::complete_encryption

use crate::address::BluetoothDeviceAddress;
use crate::control::{InFlight, Slot};
use crate::cryptography::{ah_hash, ah_plain_text};
use crate::gateway::CryptoGateway;
use crate::manager::AddressManager;
use crate::records::{IdentityRecord, IdentityRecordStore};
use core::future::Future;

/// The state of a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// Candidates are still being tried
    Resolving,
    /// The record at the index matched the address
    Matched(usize),
    /// Every candidate was tried without a match
    Exhausted,
}

/// The next thing to do for a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Encrypt `plain_text` with `irk`
    ///
    /// The result must be given to [`ResolutionSession::complete_encryption`].
    Encrypt { index: usize, irk: u128, plain_text: u128 },
    /// The resolution is over
    ///
    /// This contains the index of the matching record, or `None` if no record matched.
    Finished(Option<usize>),
}

/// Iterator over the indices of resolving candidates within a record store
///
/// The index only ever increases. Records that are not resolving candidates (see
/// [`IdentityRecord::resolving_irk`]) are passed over.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Candidates {
    index: usize,
}

impl Candidates {
    pub fn new() -> Self {
        Candidates::default()
    }

    /// The index of the next record to be looked at
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the next resolving candidate
    ///
    /// The index of the candidate and its IRK are returned. `None` is returned once the end of the
    /// store is reached.
    pub fn next_candidate<S>(&mut self, store: &S) -> Option<(usize, u128)>
    where
        S: IdentityRecordStore + ?Sized,
    {
        while self.index < store.count() {
            let index = self.index;

            self.index += 1;

            match store.record_at(index).and_then(|record| record.resolving_irk()) {
                Some(irk) => return Some((index, irk)),
                None => log::trace!("(PRIVACY) record {} is not a resolving candidate", index),
            }
        }

        None
    }
}

/// A resolution of a single random address
#[derive(Debug, Clone)]
pub struct ResolutionSession {
    target: BluetoothDeviceAddress,
    candidates: Candidates,
    state: ResolutionState,
    pending: Option<(usize, u128)>,
}

impl ResolutionSession {
    /// Create a new session for resolving `target`
    pub fn new(target: BluetoothDeviceAddress) -> Self {
        ResolutionSession {
            target,
            candidates: Candidates::new(),
            state: ResolutionState::Resolving,
            pending: None,
        }
    }

    /// Get the address being resolved
    pub fn target(&self) -> BluetoothDeviceAddress {
        self.target
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// Get the index of the next record to be looked at
    pub fn candidate_index(&self) -> usize {
        self.candidates.index()
    }

    /// Get the next step of the resolution
    ///
    /// If an encryption was requested by the previous step and its result was not yet given to
    /// `complete_encryption`, the same encryption is requested again.
    pub fn next_step<S>(&mut self, store: &S) -> Step
    where
        S: IdentityRecordStore + ?Sized,
    {
        match self.state {
            ResolutionState::Matched(index) => return Step::Finished(Some(index)),
            ResolutionState::Exhausted => return Step::Finished(None),
            ResolutionState::Resolving => (),
        }

        let plain_text = ah_plain_text(self.target.prand());

        if let Some((index, irk)) = self.pending {
            return Step::Encrypt { index, irk, plain_text };
        }

        match self.candidates.next_candidate(store) {
            Some((index, irk)) => {
                self.pending = Some((index, irk));

                Step::Encrypt { index, irk, plain_text }
            }
            None => {
                self.state = ResolutionState::Exhausted;

                Step::Finished(None)
            }
        }
    }

    /// Complete the encryption requested by the last step
    ///
    /// Input `cypher_text` is `None` when the encryption failed, this is treated the same as the
    /// candidate not matching.
    pub fn complete_encryption(&mut self, cypher_text: Option<u128>) -> ResolutionState {
        let Some((index, _)) = self.pending.take() else {
            return self.state;
        };

        match cypher_text {
            Some(cypher_text) if ah_hash(cypher_text) == self.target.hash() => {
                self.state = ResolutionState::Matched(index);
            }
            Some(_) => log::trace!("(PRIVACY) {} does not resolve with record {}", self.target, index),
            None => log::trace!("(PRIVACY) no encryption result for record {}", index),
        }

        self.state
    }
}

impl<G, S, C, R> AddressManager<G, S, C, R>
where
    G: CryptoGateway,
    S: IdentityRecordStore,
{
    /// Resolve a random address
    ///
    /// The returned future outputs a copy of the first identity record (in store order) that the
    /// address resolves to, or `None` if there is no such record.
    ///
    /// Only one resolution can be in progress at a time. If there is already a resolution in
    /// progress then the returned future immediately outputs `None` and the resolution in
    /// progress is unaffected.
    ///
    /// The record store is not borrowed while waiting on the gateway but records must not be
    /// added to or removed from the store until the resolution completes.
    pub fn resolve_random_address(
        &self,
        address: BluetoothDeviceAddress,
    ) -> impl Future<Output = Option<IdentityRecord>> + '_ {
        let in_flight = InFlight::claim(&self.control, Slot::Resolution);

        if in_flight.is_none() {
            log::warn!("(PRIVACY) resolution of {} rejected, a resolution is in progress", address);
        }

        async move {
            let _in_flight = in_flight?;

            let mut session = ResolutionSession::new(address);

            loop {
                let step = session.next_step(&*self.records.borrow());

                match step {
                    Step::Encrypt { index, irk, plain_text } => {
                        log::trace!("(PRIVACY) trying record {} for {}", index, address);

                        let cypher_text = match self.gateway.encrypt(irk, plain_text).await {
                            Ok(cypher_text) => Some(cypher_text),
                            Err(e) => {
                                log::debug!("(PRIVACY) encryption failed during resolution: {}", e);

                                None
                            }
                        };

                        session.complete_encryption(cypher_text);
                    }
                    Step::Finished(Some(index)) => {
                        log::debug!("(PRIVACY) {} resolved with record {}", address, index);

                        return self.records.borrow().record_at(index).cloned();
                    }
                    Step::Finished(None) => {
                        log::debug!("(PRIVACY) {} did not resolve", address);

                        return None;
                    }
                }
            }
        }
    }
}
