//! Verification token generation.

use rand_core::{OsRng, RngCore};

/// Number of random bytes in a token; the hex encoding is twice as long.
pub const TOKEN_BYTES: usize = 16;

/// Source of single-use verification tokens.
pub trait TokenSource: Send + Sync {
  fn generate(&self) -> String;
}

/// Tokens drawn from the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngTokens;

impl TokenSource for OsRngTokens {
  fn generate(&self) -> String { random_token() }
}

/// 16 bytes from [`OsRng`], lowercase hex encoded (32 characters).
pub fn random_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}
