//! License key generation.
//!
//! Keys are 10 characters drawn uniformly from a 32-symbol alphabet without
//! the look-alikes `0/O/1/I`. Keys only need to be hard to enumerate; the
//! store enforces uniqueness.

use rand::Rng;

/// Symbols a key may contain.
pub const KEY_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of every issued key.
pub const KEY_LENGTH: usize = 10;

/// Source of candidate license keys.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws keys from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> String {
        generate_key(&mut rand::thread_rng())
    }
}

/// Generates one key from `rng`.
pub fn generate_key<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..KEY_LENGTH)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form of user-entered keys: trimmed, upper-cased.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

/// Returns true if `key` has the length and alphabet of an issued key.
#[must_use]
pub fn is_well_formed(key: &str) -> bool {
    key.len() == KEY_LENGTH && key.bytes().all(|b| KEY_ALPHABET.contains(&b))
}
