//! Stateful AES-256-CFB8 stream cipher engines.
//!
//! One [`Encryptor`] and one [`Decryptor`] exist per connection direction,
//! each seeded once from the shared secret and iv. The keystream is
//! continuous: every call picks up exactly where the previous one stopped,
//! so chunk boundaries never influence the produced bytes.
//!
//! Two backends implement the mode bit-for-bit identically:
//!
//! - [`Backend::Accelerated`] delegates to the `cfb8` mode over the `aes`
//!   block cipher, which uses AES-NI or the ARMv8 crypto extensions when
//!   the CPU has them.
//! - [`Backend::Portable`] is an in-crate shift-register implementation
//!   over the same block function, the fallback for CPUs without hardware
//!   AES.
//!
//! [`Backend::detect`] picks between them at construction time.

use core::fmt;
use core::slice;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::Aes256;
use tracing::debug;

use crate::{Iv, SecretKey};

type Cfb8Enc = ::cfb8::Encryptor<Aes256>;
type Cfb8Dec = ::cfb8::Decryptor<Aes256>;

#[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
cpufeatures::new!(aes_hw, "aes");

/// Cipher engine backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Ecosystem CFB8 mode over hardware-capable AES.
    Accelerated,
    /// In-crate shift-register CFB8, pure software.
    Portable,
}

impl Backend {
    /// Probes the CPU and returns the preferred backend.
    ///
    /// [`Backend::Accelerated`] is chosen only when the CPU exposes AES
    /// instructions; both backends produce identical bytes either way.
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64"))]
        if aes_hw::init().get() {
            return Self::Accelerated;
        }

        Self::Portable
    }
}

/// Encryption engine for the send direction of one connection.
pub struct Encryptor(EncryptorInner);

enum EncryptorInner {
    Accelerated(Cfb8Enc),
    Portable(SoftwareCfb8),
}

impl Encryptor {
    /// Creates an engine seeded from `(secret, iv)` with the backend
    /// chosen by [`Backend::detect`].
    #[must_use]
    pub fn new(secret: &SecretKey, iv: &Iv) -> Self {
        Self::with_backend(Backend::detect(), secret, iv)
    }

    /// Creates an engine with an explicit backend.
    #[must_use]
    pub fn with_backend(backend: Backend, secret: &SecretKey, iv: &Iv) -> Self {
        debug!(?backend, "encrypt engine initialized");

        match backend {
            Backend::Accelerated => Self(EncryptorInner::Accelerated(Cfb8Enc::new(
                secret.as_bytes().into(),
                iv.into(),
            ))),
            Backend::Portable => Self(EncryptorInner::Portable(SoftwareCfb8::new(secret, iv))),
        }
    }

    /// Encrypts `data` in place, continuing the keystream.
    pub fn apply(&mut self, data: &mut [u8]) {
        match &mut self.0 {
            EncryptorInner::Accelerated(engine) => {
                for byte in data.iter_mut() {
                    engine.encrypt_block_mut(GenericArray::from_mut_slice(slice::from_mut(byte)));
                }
            }
            EncryptorInner::Portable(engine) => engine.encrypt(data),
        }
    }

    /// The backend this engine was constructed with.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        match self.0 {
            EncryptorInner::Accelerated(_) => Backend::Accelerated,
            EncryptorInner::Portable(_) => Backend::Portable,
        }
    }
}

impl fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encryptor")
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}

/// Decryption engine for the receive direction of one connection.
pub struct Decryptor(DecryptorInner);

enum DecryptorInner {
    Accelerated(Cfb8Dec),
    Portable(SoftwareCfb8),
}

impl Decryptor {
    /// Creates an engine seeded from `(secret, iv)` with the backend
    /// chosen by [`Backend::detect`].
    #[must_use]
    pub fn new(secret: &SecretKey, iv: &Iv) -> Self {
        Self::with_backend(Backend::detect(), secret, iv)
    }

    /// Creates an engine with an explicit backend.
    #[must_use]
    pub fn with_backend(backend: Backend, secret: &SecretKey, iv: &Iv) -> Self {
        debug!(?backend, "decrypt engine initialized");

        match backend {
            Backend::Accelerated => Self(DecryptorInner::Accelerated(Cfb8Dec::new(
                secret.as_bytes().into(),
                iv.into(),
            ))),
            Backend::Portable => Self(DecryptorInner::Portable(SoftwareCfb8::new(secret, iv))),
        }
    }

    /// Decrypts `data` in place, continuing the keystream.
    pub fn apply(&mut self, data: &mut [u8]) {
        match &mut self.0 {
            DecryptorInner::Accelerated(engine) => {
                for byte in data.iter_mut() {
                    engine.decrypt_block_mut(GenericArray::from_mut_slice(slice::from_mut(byte)));
                }
            }
            DecryptorInner::Portable(engine) => engine.decrypt(data),
        }
    }

    /// The backend this engine was constructed with.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        match self.0 {
            DecryptorInner::Accelerated(_) => Backend::Accelerated,
            DecryptorInner::Portable(_) => Backend::Portable,
        }
    }
}

impl fmt::Debug for Decryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decryptor")
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}

/// Portable CFB8 over the AES-256 block function.
///
/// The mode keeps a 16-byte shift register. Each byte XORs with the first
/// byte of the encrypted register, then the *ciphertext* byte shifts in
/// from the right, on both directions, which is what makes CFB8
/// self-synchronizing. Decryption therefore also uses the block function
/// in its encrypt direction.
struct SoftwareCfb8 {
    cipher: Aes256,
    register: [u8; 16],
}

impl SoftwareCfb8 {
    fn new(secret: &SecretKey, iv: &Iv) -> Self {
        Self {
            cipher: Aes256::new(secret.as_bytes().into()),
            register: *iv,
        }
    }

    fn keystream_byte(&self) -> u8 {
        let mut block = GenericArray::clone_from_slice(&self.register);
        self.cipher.encrypt_block(&mut block);
        block[0]
    }

    fn shift_in(&mut self, ciphertext_byte: u8) {
        self.register.copy_within(1.., 0);
        self.register[15] = ciphertext_byte;
    }

    fn encrypt(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            let encrypted = self.keystream_byte() ^ *byte;
            self.shift_in(encrypted);
            *byte = encrypted;
        }
    }

    fn decrypt(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            let received = *byte;
            *byte = self.keystream_byte() ^ received;
            self.shift_in(received);
        }
    }
}
