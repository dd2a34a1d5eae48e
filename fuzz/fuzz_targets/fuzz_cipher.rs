//! Fuzz target: XOR autokey cipher
//!
//! Decrypt must invert encrypt for every input, in place and allocating.
//!
//! cargo fuzz run fuzz_cipher

#![no_main]

use espsense::protocol::cipher::{decrypt, decrypt_in_place, encrypt, encrypt_in_place};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let sealed = encrypt(data);
    assert_eq!(sealed.len(), data.len());
    assert_eq!(decrypt(&sealed), data);

    let mut buf = data.to_vec();
    encrypt_in_place(&mut buf);
    assert_eq!(buf, sealed);
    decrypt_in_place(&mut buf);
    assert_eq!(buf, data);
});
