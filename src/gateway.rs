//! The Crypto/RNG Gateway
//!
//! Generating true random numbers and AES-128 encryption are operations of the Bluetooth
//! Controller (the HCI commands *LE Rand* and *LE Encrypt*). The private address manager does not
//! care how these are performed, it only awaits the futures returned by a [`CryptoGateway`].
//!
//! A Controller backed gateway is implemented by whatever owns the HCI host interface. For systems
//! where the host performs the cryptography there is [`SoftwareGateway`].

use crate::address::BluetoothDeviceAddress;
use core::cell::{Cell, RefCell};
use core::future::{ready, Future, Ready};
use rand_core::{CryptoRng, RngCore};

/// The number of random bytes returned by one random number request
pub const RAND_LEN: usize = 8;

/// Asynchronous access to the random number generator and encryption of the Controller
///
/// Every method returns a future that completes with either the output of the operation or the
/// error of the Controller. There is at most one outstanding request per call site within this
/// library, but a gateway may be used by different operations at the same time.
pub trait CryptoGateway {
    type Error: core::fmt::Display;

    type RandFuture<'a>: Future<Output = Result<[u8; RAND_LEN], Self::Error>>
    where
        Self: 'a;

    type EncryptFuture<'a>: Future<Output = Result<u128, Self::Error>>
    where
        Self: 'a;

    type SetRandomAddressFuture<'a>: Future<Output = Result<(), Self::Error>>
    where
        Self: 'a;

    /// Request random bytes
    fn rand(&self) -> Self::RandFuture<'_>;

    /// Encrypt `plain_text` with `key` using AES-128
    ///
    /// Both the key and the plain text are in native byte order.
    fn encrypt(&self, key: u128, plain_text: u128) -> Self::EncryptFuture<'_>;

    /// Install `address` as the random address of the Controller
    fn set_random_address(&self, address: BluetoothDeviceAddress) -> Self::SetRandomAddressFuture<'_>;
}

/// A gateway where the cryptography is done by the host
///
/// Encryption is done with [`e`](crate::cryptography::e) and random numbers come from the provided
/// random number generator. The random address is not sent anywhere, it is only recorded so it can
/// be retrieved by [`random_address`](SoftwareGateway::random_address).
pub struct SoftwareGateway<R> {
    rng: RefCell<R>,
    random_address: Cell<Option<BluetoothDeviceAddress>>,
}

impl<R> SoftwareGateway<R>
where
    R: RngCore + CryptoRng,
{
    /// Create a new `SoftwareGateway`
    pub fn new(rng: R) -> Self {
        SoftwareGateway {
            rng: RefCell::new(rng),
            random_address: Cell::new(None),
        }
    }

    /// Get the last random address that was set
    pub fn random_address(&self) -> Option<BluetoothDeviceAddress> {
        self.random_address.get()
    }
}

#[cfg(feature = "sys-rand")]
impl SoftwareGateway<rand_core::OsRng> {
    /// Create a `SoftwareGateway` using the random number generator of the system
    pub fn os_rng() -> Self {
        SoftwareGateway::new(rand_core::OsRng)
    }
}

impl<R> CryptoGateway for SoftwareGateway<R>
where
    R: RngCore + CryptoRng,
{
    type Error = rand_core::Error;
    type RandFuture<'a> = Ready<Result<[u8; RAND_LEN], Self::Error>> where Self: 'a;
    type EncryptFuture<'a> = Ready<Result<u128, Self::Error>> where Self: 'a;
    type SetRandomAddressFuture<'a> = Ready<Result<(), Self::Error>> where Self: 'a;

    fn rand(&self) -> Self::RandFuture<'_> {
        let mut bytes = [0u8; RAND_LEN];

        let result = self.rng.borrow_mut().try_fill_bytes(&mut bytes).map(|_| bytes);

        ready(result)
    }

    fn encrypt(&self, key: u128, plain_text: u128) -> Self::EncryptFuture<'_> {
        ready(Ok(crate::cryptography::e(key, plain_text)))
    }

    fn set_random_address(&self, address: BluetoothDeviceAddress) -> Self::SetRandomAddressFuture<'_> {
        self.random_address.set(Some(address));

        ready(Ok(()))
    }
}
