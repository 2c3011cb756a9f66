//! Utility functions for the ranked engine

use chrono::{DateTime, Utc};
use rand::Rng;

/// Alphabet for match ids and session credentials
pub const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a match identifier
pub const MATCH_ID_LENGTH: usize = 8;

/// Length of a session name or password
pub const CREDENTIAL_LENGTH: usize = 4;

/// Generate a token of `length` characters drawn uniformly from `[A-Z0-9]`
pub fn generate_token<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Generate a new match identifier
pub fn generate_match_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    generate_token(rng, MATCH_ID_LENGTH)
}

/// Generate a session name or password
pub fn generate_credential<R: Rng + ?Sized>(rng: &mut R) -> String {
    generate_token(rng, CREDENTIAL_LENGTH)
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Win rate in percent; 0 when nothing was played
pub fn win_rate_percent(wins: u32, matches_played: u32) -> f64 {
    if matches_played == 0 {
        return 0.0;
    }
    wins as f64 / matches_played as f64 * 100.0
}
