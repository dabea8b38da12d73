#![allow(dead_code)]

use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn enable_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Debug).try_init();
    });
}

/// Builds a well-formed chunk: 4-byte tag, big-endian u32 length, then body.
pub fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(tag);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// Encodes `value` as a base-128 big-endian variable-length quantity.
pub fn varint(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    bytes
}

/// Builds a complete `MThd` + one-or-more `MTrk` file: format 0, `n_tracks`
/// tracks, ticks-per-beat division, one track payload per call.
pub fn smf(format: u16, n_tracks: u16, division: u16, tracks: &[&[u8]]) -> Vec<u8> {
    let mut header_body = Vec::with_capacity(6);
    header_body.extend_from_slice(&format.to_be_bytes());
    header_body.extend_from_slice(&n_tracks.to_be_bytes());
    header_body.extend_from_slice(&division.to_be_bytes());
    let mut out = chunk(b"MThd", &header_body);
    for track in tracks {
        out.extend(chunk(b"MTrk", track));
    }
    out
}
