//! Content hashing of board state for the execution result cache.
//!
//! The fingerprint covers exactly what can change a score: card identities,
//! anchor positions, and rotations, in placement order. Cell contents are
//! implied by card identity and deliberately excluded.

// Hashing reinterprets bit patterns; truncating and sign-losing casts are intentional
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::board::card::{Card, Rotation};

/// SplitMix64 step for stable, fast token generation.
#[inline]
const fn splitmix64(x: u64) -> u64 {
    let x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// Domain tags (arbitrary but fixed).
const DOM_CARD: u64 = 0x5C17_ED00_0000_0001;
const DOM_SEQ: u64 = 0x5C17_ED00_0000_00B0;

#[inline]
fn token128(seed: u64) -> u128 {
    // Two rounds to build 128 bits deterministically.
    let lo = splitmix64(seed ^ 0xC0FF_EE00_D15E_CAFE);
    let hi = splitmix64(seed ^ 0xDEAD_BEEF_F00D_FACE ^ lo.rotate_left(17));
    (u128::from(hi) << 64) | u128::from(lo)
}

#[inline]
fn card_token(index: usize, card: &Card) -> u128 {
    let rot: u64 = match card.rotation {
        Rotation::R0 => 0,
        Rotation::R180 => 1,
    };
    // Chain each field through its own mixer round so no two fields can
    // cancel by landing on the same seed bits.
    let mut seed = splitmix64(DOM_CARD ^ u64::from(card.id.0));
    seed = splitmix64(seed ^ card.x as u64);
    seed = splitmix64(seed ^ card.y as u64);
    seed = splitmix64(seed ^ rot);
    seed = splitmix64(seed ^ DOM_SEQ.wrapping_mul(index as u64 + 1));
    token128(seed)
}

/// Compute the 128-bit content fingerprint of a board state.
///
/// Two boards fingerprint equal iff they contain the same cards at the same
/// positions and rotations in the same placement order. Reordering matters
/// because placement order decides overlap resolution.
#[must_use]
pub fn board_fingerprint(cards: &[Card]) -> u128 {
    let mut fp: u128 = token128(DOM_SEQ ^ cards.len() as u64);
    for (index, card) in cards.iter().enumerate() {
        fp ^= card_token(index, card);
    }
    fp
}

/// Compute a stable 64-bit key for formula source text.
///
/// Used together with [`board_fingerprint`] to key the execution result
/// cache. Not a cryptographic hash.
#[must_use]
pub fn source_key(source: &str) -> u64 {
    let mut h: u64 = 0xA076_1D64_78BD_642F;
    for chunk in source.as_bytes().chunks(8) {
        let mut word = [0u8; 8];
        word[..chunk.len()].copy_from_slice(chunk);
        h = splitmix64(h ^ u64::from_le_bytes(word));
    }
    splitmix64(h ^ source.len() as u64)
}
