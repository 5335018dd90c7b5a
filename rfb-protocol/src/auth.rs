//! Classic VNC challenge/response authentication.
//!
//! The server sends 16 random bytes; the client encrypts them with a
//! DES key derived from the password and echoes the result. The key
//! derivation carries two legacy quirks that must be preserved for wire
//! compatibility:
//!
//! - the key is the password's first 8 bytes, zero-padded if shorter and
//!   silently truncated if longer;
//! - every key byte has its bit order reversed before keying DES (an
//!   artifact of the original d3des implementation that every VNC peer
//!   reproduces).
//!
//! Both 8-byte halves of the challenge are encrypted independently
//! (DES-ECB, encrypt direction). The transform is a pure function: a fixed
//! password and challenge always produce the same response.

use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockEncrypt, KeyInit};
use des::Des;

/// Challenge and response are both exactly this long.
pub const CHALLENGE_SIZE: usize = 16;

/// DES key length; also the effective maximum password length.
const KEY_SIZE: usize = 8;

/// Compute the 16-byte response for a challenge.
pub fn encrypt_challenge(password: &[u8], challenge: &[u8; CHALLENGE_SIZE]) -> [u8; CHALLENGE_SIZE] {
    // Key is the password padded with nulls, each byte bit-reversed.
    let mut key = [0u8; KEY_SIZE];
    for (slot, &byte) in key.iter_mut().zip(password.iter().take(KEY_SIZE)) {
        *slot = byte.reverse_bits();
    }

    let cipher = Des::new(GenericArray::from_slice(&key));

    let mut response = *challenge;
    for block in response.chunks_exact_mut(KEY_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }

    response
}
