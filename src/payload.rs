//! Radio packet layout: the sentence verbatim, zero padded to `PAYLOAD_SIZE`.

use crate::config::PAYLOAD_SIZE;

/// Packs a (possibly `0` terminated) sentence into one radio packet. Anything
/// past `PAYLOAD_SIZE` bytes is cut off.
pub fn pack(sentence: &[u8]) -> [u8; PAYLOAD_SIZE] {
    let end = sentence
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(sentence.len())
        .min(PAYLOAD_SIZE);

    let mut packet = [0u8; PAYLOAD_SIZE];
    packet[..end].copy_from_slice(&sentence[..end]);
    packet
}
