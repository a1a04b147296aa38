//! Stream ciphers for the enciphered session, plus the CBC helper for
//! admin-stored remote-password blobs.
//!
//! After key agreement every byte on the wire passes through a cipher, one
//! instance per direction with independent state. Both supported ciphers are
//! byte stream transforms, so framing is unaffected.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit, StreamCipher as Keystream};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Error, Result};
use crate::srp::SessionKey;

type Aes256CtrBe = ctr::Ctr128BE<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha1 = Hmac<Sha1>;

// ============================================================================
// Cipher selection
// ============================================================================

/// Negotiable cipher suites, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherKind {
    Aes256Ctr,
    Rc4,
    None,
}

impl CipherKind {
    /// Name used on the wire during negotiation.
    pub fn wire_name(self) -> &'static str {
        match self {
            CipherKind::Aes256Ctr => "AES-256-CTR",
            CipherKind::Rc4 => "RC4",
            CipherKind::None => "None",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "AES-256-CTR" => Some(CipherKind::Aes256Ctr),
            "RC4" => Some(CipherKind::Rc4),
            "None" => Some(CipherKind::None),
            _ => None,
        }
    }

    /// Pick the strongest cipher both sides support.
    pub fn strongest<'a>(offered: impl Iterator<Item = &'a str>) -> Option<Self> {
        let mut best: Option<CipherKind> = None;
        for name in offered {
            if let Some(kind) = Self::from_wire_name(name.trim()) {
                best = Some(match best {
                    Some(current) if current.rank() >= kind.rank() => current,
                    _ => kind,
                });
            }
        }
        best
    }

    fn rank(self) -> u8 {
        match self {
            CipherKind::Aes256Ctr => 2,
            CipherKind::Rc4 => 1,
            CipherKind::None => 0,
        }
    }

    /// Build one cipher instance keyed from the session key.
    pub fn build(self, key: &SessionKey) -> Box<dyn StreamCipher> {
        match self {
            CipherKind::None => Box::new(NoCipher),
            CipherKind::Rc4 => Box::new(Rc4::new(key.as_bytes())),
            CipherKind::Aes256Ctr => Box::new(Aes256Ctr::new(&key.extended())),
        }
    }
}

// ============================================================================
// Stream ciphers
// ============================================================================

/// A byte-by-byte cipher transform over one direction of the stream.
pub trait StreamCipher: Send {
    fn transform(&mut self, data: &mut [u8]);
}

/// Identity transform, used until key agreement completes.
pub struct NoCipher;

impl StreamCipher for NoCipher {
    fn transform(&mut self, _data: &mut [u8]) {}
}

/// RC4 keyed directly from the 20-byte session key (legacy suite).
pub struct Rc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    pub fn new(key: &[u8]) -> Self {
        assert!(!key.is_empty());
        let mut state = [0u8; 256];
        for (i, s) in state.iter_mut().enumerate() {
            *s = i as u8;
        }
        let mut j = 0u8;
        for i in 0..256 {
            j = j
                .wrapping_add(state[i])
                .wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }
        Rc4 { state, i: 0, j: 0 }
    }
}

impl StreamCipher for Rc4 {
    fn transform(&mut self, data: &mut [u8]) {
        for byte in data {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.state[self.i as usize]);
            self.state.swap(self.i as usize, self.j as usize);
            let k = self.state
                [(self.state[self.i as usize].wrapping_add(self.state[self.j as usize])) as usize];
            *byte ^= k;
        }
    }
}

/// AES-256 in counter mode: key from the first 32 bytes of the extended
/// session key, IV from the first 16 bytes of the second hash block.
pub struct Aes256Ctr {
    inner: Aes256CtrBe,
}

impl Aes256Ctr {
    pub fn new(extended_key: &[u8; 40]) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(&extended_key[..32]);
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&extended_key[20..36]);
        Aes256Ctr { inner: Aes256CtrBe::new(&key.into(), &iv.into()) }
    }
}

impl StreamCipher for Aes256Ctr {
    fn transform(&mut self, data: &mut [u8]) {
        self.inner.apply_keystream(data);
    }
}

// ============================================================================
// Remote-password blobs
// ============================================================================

/// Expand a shared secret into 32 bytes of key material with an HMAC-SHA1
/// counter construction.
fn expand_key(secret: &[u8]) -> [u8; 32] {
    let hmac = |data: &[u8]| -> [u8; 20] {
        let mut mac = HmacSha1::new_from_slice(secret).expect("any key size");
        mac.update(data);
        mac.finalize().into_bytes().into()
    };
    let t1 = hmac(&[1u8]);
    let mut block2 = t1.to_vec();
    block2.push(2u8);
    let t2 = hmac(&block2);

    let mut out = [0u8; 32];
    out[..20].copy_from_slice(&t1);
    out[20..].copy_from_slice(&t2[..12]);
    out
}

/// Decrypt an admin-stored password blob: a 16-byte IV followed by
/// AES-256-CBC ciphertext with PKCS#7 padding, keyed from the shared secret.
pub fn decrypt_password_blob(secret: &[u8], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < 32 || (blob.len() - 16) % 16 != 0 {
        return Err(Error::Data(format!("malformed password blob of {} bytes", blob.len())));
    }
    let key = expand_key(secret);
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&blob[..16]);

    Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&blob[16..])
        .map_err(|_| Error::Data("password blob padding is invalid".to_string()))
}
