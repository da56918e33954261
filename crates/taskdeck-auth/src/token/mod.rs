//! Token issuance and verification.

pub mod codec;

pub use codec::{AccessClaims, RefreshClaims, TokenCodec, TokenError, TokenType};
