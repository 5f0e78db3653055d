//! Privacy integration test framework

use bo_tie_privacy::cryptography::ah;
use bo_tie_privacy::gateway::RAND_LEN;
use bo_tie_privacy::{
    AddressManager, AddressManagerBuilder, AddressType, BluetoothDeviceAddress, CryptoGateway, IdentityRecord,
    RandomAddressKind,
};
use core::cell::{Cell, RefCell};
use core::fmt::{Display, Formatter};
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// The IRK of the local device used by the tests
pub const LOCAL_IRK: u128 = 0xec0234a3_57c8ad05_341010a6_0a397d9b;

/// Initialize logging for a test
///
/// This can be called by every test, only the first call installs the logger.
pub fn init_logging() {
    let _ = simplelog::TestLogger::init(log::LevelFilter::Trace, simplelog::Config::default());
}

/// A future that is pending on its first poll
///
/// Every request to a [`CountingGateway`] suspends once before it completes, the same as a request
/// sent to a Controller.
pub struct YieldOnce<T> {
    output: Option<T>,
    yielded: bool,
}

impl<T> YieldOnce<T> {
    fn new(output: T) -> Self {
        YieldOnce {
            output: Some(output),
            yielded: false,
        }
    }
}

impl<T: Unpin> Future for YieldOnce<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.yielded {
            Poll::Ready(this.output.take().expect("polled after completion"))
        } else {
            this.yielded = true;

            cx.waker().wake_by_ref();

            Poll::Pending
        }
    }
}

/// The error of a [`CountingGateway`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerFault(pub &'static str);

impl Display for ControllerFault {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        write!(f, "controller fault: {}", self.0)
    }
}

/// A gateway that counts the requests made to it
///
/// Random numbers come from a seeded random number generator and encryption is done on the host.
/// Each kind of request can be made to fail.
pub struct CountingGateway {
    rng: RefCell<ChaCha20Rng>,
    random_address: Cell<Option<BluetoothDeviceAddress>>,
    rand_calls: Cell<usize>,
    encrypt_calls: Cell<usize>,
    fail_rand: Cell<bool>,
    fail_encrypt: Cell<bool>,
    fail_set_random_address: Cell<bool>,
}

impl CountingGateway {
    pub fn new(seed: u64) -> Self {
        CountingGateway {
            rng: RefCell::new(ChaCha20Rng::seed_from_u64(seed)),
            random_address: Cell::new(None),
            rand_calls: Cell::new(0),
            encrypt_calls: Cell::new(0),
            fail_rand: Cell::new(false),
            fail_encrypt: Cell::new(false),
            fail_set_random_address: Cell::new(false),
        }
    }

    pub fn rand_calls(&self) -> usize {
        self.rand_calls.get()
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.get()
    }

    pub fn fail_rand(&self, fail: bool) {
        self.fail_rand.set(fail)
    }

    pub fn fail_encrypt(&self, fail: bool) {
        self.fail_encrypt.set(fail)
    }

    pub fn fail_set_random_address(&self, fail: bool) {
        self.fail_set_random_address.set(fail)
    }

    /// Get the random address installed by the last successful request
    pub fn random_address(&self) -> Option<BluetoothDeviceAddress> {
        self.random_address.get()
    }
}

impl CryptoGateway for CountingGateway {
    type Error = ControllerFault;
    type RandFuture<'a> = YieldOnce<Result<[u8; RAND_LEN], ControllerFault>> where Self: 'a;
    type EncryptFuture<'a> = YieldOnce<Result<u128, ControllerFault>> where Self: 'a;
    type SetRandomAddressFuture<'a> = YieldOnce<Result<(), ControllerFault>> where Self: 'a;

    fn rand(&self) -> Self::RandFuture<'_> {
        self.rand_calls.set(self.rand_calls.get() + 1);

        if self.fail_rand.get() {
            return YieldOnce::new(Err(ControllerFault("rand")));
        }

        let mut bytes = [0u8; RAND_LEN];

        self.rng.borrow_mut().fill_bytes(&mut bytes);

        YieldOnce::new(Ok(bytes))
    }

    fn encrypt(&self, key: u128, plain_text: u128) -> Self::EncryptFuture<'_> {
        self.encrypt_calls.set(self.encrypt_calls.get() + 1);

        if self.fail_encrypt.get() {
            return YieldOnce::new(Err(ControllerFault("encrypt")));
        }

        YieldOnce::new(Ok(bo_tie_privacy::cryptography::e(key, plain_text)))
    }

    fn set_random_address(&self, address: BluetoothDeviceAddress) -> Self::SetRandomAddressFuture<'_> {
        if self.fail_set_random_address.get() {
            return YieldOnce::new(Err(ControllerFault("set random address")));
        }

        self.random_address.set(Some(address));

        YieldOnce::new(Ok(()))
    }
}

/// Create a resolvable private address for `irk`
///
/// The two most significant bits of `prand` are overwritten with the resolvable marker.
pub fn rpa_for(irk: u128, mut prand: [u8; 3]) -> BluetoothDeviceAddress {
    prand[2] = RandomAddressKind::Resolvable.mark(prand[2]);

    BluetoothDeviceAddress::from_parts(ah(irk, prand), prand)
}

/// Create the record of a bonded peer device using privacy
///
/// The identity address of the record is a resolvable private address, the static address is a
/// static random address. Both are derived from `n`.
pub fn peer_record(n: u8, irk: u128) -> IdentityRecord {
    IdentityRecord::new(resolved_identity(n), AddressType::Random)
        .with_static_address(static_address(n), AddressType::Random)
        .with_irk(irk)
}

/// Create the record of a peer device that did not distribute an IRK
pub fn unkeyed_record(n: u8) -> IdentityRecord {
    IdentityRecord::new(BluetoothDeviceAddress([n; 6]), AddressType::Public)
}

/// The identity address of the record created by [`peer_record`]
pub fn resolved_identity(n: u8) -> BluetoothDeviceAddress {
    BluetoothDeviceAddress([n, n, n, n, n, RandomAddressKind::Resolvable.mark(n)])
}

/// The static address of the record created by [`peer_record`]
pub fn static_address(n: u8) -> BluetoothDeviceAddress {
    BluetoothDeviceAddress([n, n, n, n, 0xA5, RandomAddressKind::Static.mark(n)])
}

/// Create a manager using a [`CountingGateway`] and the local IRK [`LOCAL_IRK`]
pub fn manager(seed: u64, records: Vec<IdentityRecord>) -> AddressManager<CountingGateway, Vec<IdentityRecord>> {
    AddressManagerBuilder::new(CountingGateway::new(seed), records)
        .set_local_irk(LOCAL_IRK)
        .build()
        .expect("invalid configuration")
}
