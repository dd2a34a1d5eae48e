//! Kasa autokey XOR cipher.
//!
//! ```text
//!   encrypt:  c[i] = p[i] ^ k;  k = c[i]
//!   decrypt:  p[i] = c[i] ^ k;  k = c[i]
//! ```
//!
//! The key starts at [`INITIAL_KEY`] and always advances to the previous
//! ciphertext byte. Both directions operate in place, with no allocation.

/// Seed key mandated by the HS1xx local protocol.
pub const INITIAL_KEY: u8 = 171;

/// Encrypt `buf` in place.
pub fn encrypt_in_place(buf: &mut [u8]) {
    let mut key = INITIAL_KEY;
    for b in buf.iter_mut() {
        *b ^= key;
        key = *b;
    }
}

/// Decrypt `buf` in place.
pub fn decrypt_in_place(buf: &mut [u8]) {
    let mut key = INITIAL_KEY;
    for b in buf.iter_mut() {
        let c = *b;
        *b ^= key;
        key = c;
    }
}

/// Encrypt into a fresh buffer.
pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    let mut out = plain.to_vec();
    encrypt_in_place(&mut out);
    out
}

/// Decrypt into a fresh buffer.
pub fn decrypt(cipher: &[u8]) -> Vec<u8> {
    let mut out = cipher.to_vec();
    decrypt_in_place(&mut out);
    out
}
