//! Tunable constants. A pull parser has no daemon-style configuration, but the
//! handful of numbers that bound its behavior are collected here so embedders
//! (and tests) can see, and exercise, the boundaries directly.

/// Initial size of the parser's scratch buffer, in bytes.
pub const SCRATCH_INITIAL: usize = 256;

/// Hard cap on the scratch buffer, and therefore on any single sysex or
/// meta-event payload. Exceeding it is a `BigPayload` error.
pub const SCRATCH_CAP: usize = 32_768;

/// Hard cap on addressable input, in bytes. Sources enforce this themselves
/// (seekable ones from cached length, others via a running counter); crossing
/// it is an I/O-level error, never a graceful EOF.
pub const MAX_INPUT_BYTES: u64 = 1 << 30;

/// Largest chunk length accepted in a chunk header (2^31 - 1).
pub const MAX_CHUNK_LEN: u32 = i32::MAX as u32;

/// Maximum number of continuation bytes read while decoding a variable-length
/// quantity before giving up with `LongVarint`.
pub const VARINT_MAX_BYTES: usize = 4;
