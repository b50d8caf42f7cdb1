//! DES-CBC wrap for the legacy v2 dialect.
//!
//! The key material is fixed by the protocol: key `appexnet`, IV `lightwan`,
//! PKCS#7 padding to the 8-byte DES block. Header and payload are encrypted
//! as separate CBC streams.

use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{Error, Result};

type DesCbcEnc = cbc::Encryptor<des::Des>;
type DesCbcDec = cbc::Decryptor<des::Des>;

/// DES block size in bytes.
pub const DES_BLOCK_SIZE: usize = 8;

const KEY: &[u8; 8] = b"appexnet";
const IV: &[u8; 8] = b"lightwan";

/// Round a length up to the next DES block boundary.
pub fn des_roundup(n: usize) -> usize {
    (n + DES_BLOCK_SIZE - 1) / DES_BLOCK_SIZE * DES_BLOCK_SIZE
}

/// Encrypt a plaintext as one CBC stream. Output length is the padded
/// length: `des_roundup(plain.len() + 1)`.
pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    DesCbcEnc::new(KEY.into(), IV.into()).encrypt_padded_vec_mut::<Pkcs7>(plain)
}

/// Decrypt one CBC stream and strip the padding. Fails with `BadFrame` on
/// a pad error or a ciphertext that is not block-aligned.
pub fn decrypt(cipher: &[u8]) -> Result<Vec<u8>> {
    if cipher.is_empty() || cipher.len() % DES_BLOCK_SIZE != 0 {
        return Err(Error::bad_frame(format!(
            "ciphertext length {} not a multiple of the DES block",
            cipher.len()
        )));
    }
    DesCbcDec::new(KEY.into(), IV.into())
        .decrypt_padded_vec_mut::<Pkcs7>(cipher)
        .map_err(|_| Error::bad_frame("bad PKCS#7 padding"))
}
