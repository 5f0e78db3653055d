//! Cryptographic Methods
//!
//! These are the security functions used for creating and resolving resolvable private addresses.
//! They can be run on the host, but the same operations can be delegated to the Bluetooth
//! Controller through a [`CryptoGateway`]. When delegated, [`ah_plain_text`] and [`ah_hash`] are
//! used to form the input to, and interpret the output of, the Controller's encryption.
//!
//! Cryptographic functions not defined within the Bluetooth specification come from the
//! [Rust Crypto group](https://github.com/RustCrypto).
//!
//! [`CryptoGateway`]: crate::gateway::CryptoGateway

/// 24-bit hash function
///
/// Used in random address creation and resolution. Both `r` and the returned hash are least
/// significant byte first.
pub fn ah(k: u128, r: [u8; 3]) -> [u8; 3] {
    ah_hash(e(k, ah_plain_text(r)))
}

/// Create the padded plain text *r'* of the `ah` function
///
/// The 24 bit `r` is padded with 104 zero bits to form the 128 bit input of the security function
/// *e*.
pub fn ah_plain_text(r: [u8; 3]) -> u128 {
    <u128>::from(r[0]) | <u128>::from(r[1]) << (1 * 8) | <u128>::from(r[2]) << (2 * 8)
}

/// Truncate the output of security function *e* into the 24 bit hash of `ah`
pub fn ah_hash(cypher_text: u128) -> [u8; 3] {
    [cypher_text as u8, (cypher_text >> 8) as u8, (cypher_text >> 16) as u8]
}

/// Security function *e*
///
/// This generates 128-bit encrypted data from a 128-bit key using the AES-128 bit block cypher
/// (see [FIPS-197](https://en.wikipedia.org/wiki/FIPS_197)).
///
/// This is host version of this function and doesn't rely on the controller to encrypt the payload.
/// It initializes a new AES cypher on each call.
pub fn e(key: u128, plain_text: u128) -> u128 {
    use aes::cipher::generic_array::GenericArray;
    use aes::cipher::{BlockEncrypt, KeyInit};

    let key_bytes = key.to_be_bytes();

    let cipher = aes::Aes128::new(GenericArray::from_slice(&key_bytes));

    let mut block = plain_text.to_be_bytes();

    cipher.encrypt_block(GenericArray::from_mut_slice(&mut block));

    <u128>::from_be_bytes(block)
}
