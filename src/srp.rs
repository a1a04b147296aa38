//! SRP-6a client implementation.
//!
//! Implements the password-authenticated key agreement used to establish a
//! session key with a Transaction Engine without transmitting the password.
//! All hash inputs are minimal unsigned big-endian byte strings except the
//! generator inside `k`, which the server zero-pads to the prime's width.
//!
//! Public keys and salts travel as uppercase hex strings inside the
//! `OpenDatabase` exchange.

use num_bigint::BigUint;
use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// The 1024-bit safe prime shared with the server, generator 2.
const DEFAULT_PRIME: &str = "EEAF0AB9ADB38DD69C33F80AFA8FC5E86072618775FF3C0B9EA2314C\
                             9C256576D674DF7496EA81D3383B4813D692C6E0E0D5D8E250B98BE4\
                             8E495C1D6089DAD15DC7D7B46154D6B6CE8EF4AD69B15D4982559B29\
                             7BCF1885C529F566660E57EC68EDBC3C05726CC02FD4CBF4976EAA9A\
                             FD5138FE8376435B9FC61D2FC0EB06E3";

const DEFAULT_GENERATOR: &str = "2";

// ============================================================================
// Helpers
// ============================================================================

pub(crate) fn sha1(chunks: &[&[u8]]) -> [u8; 20] {
    let mut md = Sha1::new();
    for c in chunks {
        md.update(c);
    }
    md.finalize().into()
}

/// Minimal unsigned big-endian bytes; zero is a single 0x00 byte.
pub(crate) fn big_bytes(n: &BigUint) -> Vec<u8> {
    n.to_bytes_be()
}

/// Uppercase hex, zero-padded to an even number of digits.
pub(crate) fn to_hex(n: &BigUint) -> String {
    let mut s = n.to_str_radix(16).to_uppercase();
    if s.len() % 2 == 1 {
        s.insert(0, '0');
    }
    s
}

pub(crate) fn from_hex(s: &str) -> Result<BigUint> {
    BigUint::parse_bytes(s.as_bytes(), 16)
        .ok_or_else(|| Error::Protocol(format!("invalid hex value: {:?}", s)))
}

/// Hex string to raw bytes, keeping leading zeros.
pub(crate) fn hex_bytes(s: &str) -> Result<Vec<u8>> {
    let padded;
    let s = if s.len() % 2 == 1 {
        padded = format!("0{}", s);
        &padded
    } else {
        s
    };
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| Error::Protocol(format!("invalid hex value: {:?}", s)))
        })
        .collect()
}

// ============================================================================
// Group
// ============================================================================

/// An SRP group: prime modulus, generator, and the multiplier `k = H(N, g)`
/// with the generator zero-padded to the prime's width.
pub(crate) struct RemoteGroup {
    prime: BigUint,
    generator: BigUint,
    k: BigUint,
}

impl RemoteGroup {
    pub(crate) fn new() -> Self {
        // Hard-coded constants parse unconditionally.
        Self::with(DEFAULT_PRIME, DEFAULT_GENERATOR).unwrap()
    }

    pub(crate) fn with(prime_hex: &str, generator_hex: &str) -> Result<Self> {
        let prime = from_hex(prime_hex)?;
        let generator = from_hex(generator_hex)?;

        let prime_bytes = big_bytes(&prime);
        let generator_bytes = big_bytes(&generator);
        let padding = vec![0u8; prime_bytes.len() - generator_bytes.len()];
        let k = BigUint::from_bytes_be(&sha1(&[&prime_bytes, &padding, &generator_bytes]));

        Ok(RemoteGroup { prime, generator, k })
    }

    pub(crate) fn prime(&self) -> &BigUint {
        &self.prime
    }

    pub(crate) fn generator(&self) -> &BigUint {
        &self.generator
    }

    pub(crate) fn k(&self) -> &BigUint {
        &self.k
    }
}

/// `u = H(A, B)` over the minimal byte forms of both public keys.
pub(crate) fn compute_scramble(client_public: &BigUint, server_public: &BigUint) -> BigUint {
    BigUint::from_bytes_be(&sha1(&[&big_bytes(client_public), &big_bytes(server_public)]))
}

/// `x = H(salt, H(account ":" password))`.
pub(crate) fn compute_user_hash(account: &str, password: &str, salt: &[u8]) -> BigUint {
    let inner = sha1(&[format!("{}:{}", account, password).as_bytes()]);
    BigUint::from_bytes_be(&sha1(&[salt, &inner]))
}

// ============================================================================
// Session key
// ============================================================================

/// The symmetric key derived from the SRP shared secret: `K = H(S)`.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; 20],
}

impl SessionKey {
    pub(crate) fn from_secret(secret_bytes: &[u8]) -> Self {
        SessionKey { key: sha1(&[secret_bytes]) }
    }

    /// The 20-byte key; RC4 is keyed from this directly.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// 40-byte extension `H(S) || H(H(S))` for ciphers that need more
    /// material: AES-256-CTR takes its key from the first 32 bytes and its
    /// IV from the first 16 bytes of the second hash block.
    pub fn extended(&self) -> [u8; 40] {
        let second = sha1(&[&self.key]);
        let mut out = [0u8; 40];
        out[..20].copy_from_slice(&self.key);
        out[20..].copy_from_slice(&second);
        out
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("SessionKey(..)")
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client side of the SRP-6a exchange.
pub struct ClientSession {
    group: RemoteGroup,
    private_key: BigUint,
    public_key: BigUint,
}

impl ClientSession {
    /// Generate an ephemeral keypair from 256 random bits.
    pub fn new() -> Self {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        Self::with_private_key(BigUint::from_bytes_be(&raw))
    }

    pub(crate) fn with_private_key(private_key: BigUint) -> Self {
        let group = RemoteGroup::new();
        let public_key = group.generator().modpow(&private_key, group.prime());
        ClientSession { group, private_key, public_key }
    }

    /// The client public key `A = g^a mod N` as uppercase hex, as carried in
    /// the `OpenDatabase` request.
    pub fn public_key_hex(&self) -> String {
        to_hex(&self.public_key)
    }

    /// Derive the session key from the server's public key and salt (both
    /// hex strings, as carried in the `OpenDatabase` response).
    ///
    /// `S = (B - k*g^x)^(a + u*x) mod N`, `K = H(S)`.
    pub fn compute_session_key(
        &self,
        account: &str,
        password: &str,
        salt_hex: &str,
        server_key_hex: &str,
    ) -> Result<SessionKey> {
        let server_public = from_hex(server_key_hex)?;
        let prime = self.group.prime();

        if &server_public % prime == BigUint::from(0u8) {
            return Err(Error::AuthFailed("server public key is zero mod N".to_string()));
        }

        let scramble = compute_scramble(&self.public_key, &server_public);
        let salt = hex_bytes(salt_hex)?;
        let x = compute_user_hash(account, password, &salt);

        let gx = self.group.generator().modpow(&x, prime);
        let kgx = (self.group.k() * &gx) % prime;
        let diff = ((&server_public % prime) + prime - kgx) % prime;
        let ux = (&scramble * &x) % prime;
        let aux = (&self.private_key + ux) % prime;

        let secret = diff.modpow(&aux, prime);
        Ok(SessionKey::from_secret(&big_bytes(&secret)))
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}
