//! The event record emitted by the parser, and its variant substructures.

use crate::header::Header;
use crate::numbers::{
    Channel, ControlNumber, ControlValue, KeyAccidentals, NoteNumber, PitchBend, PressureValue, ProgramNumber, Velocity,
};

/// Which of the nine opaque text meta-events (`0x01`-`0x09`) a [`MetaEvent::Text`]
/// carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TextKind {
    General,
    Copyright,
    TrackName,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    ProgramName,
    DeviceName,
}

impl TextKind {
    pub(crate) fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(TextKind::General),
            0x02 => Some(TextKind::Copyright),
            0x03 => Some(TextKind::TrackName),
            0x04 => Some(TextKind::InstrumentName),
            0x05 => Some(TextKind::Lyric),
            0x06 => Some(TextKind::Marker),
            0x07 => Some(TextKind::CuePoint),
            0x08 => Some(TextKind::ProgramName),
            0x09 => Some(TextKind::DeviceName),
            _ => None,
        }
    }
}

/// A decoded MIDI channel message (`0x80`-`0xEF`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ChannelMessage {
    NoteOff { key: NoteNumber, velocity: Velocity },
    /// Velocity 0 is a valid, distinct Note On; it is never rewritten to a
    /// Note Off here.
    NoteOn { key: NoteNumber, velocity: Velocity },
    KeyAftertouch { key: NoteNumber, pressure: PressureValue },
    Control { controller: ControlNumber, value: ControlValue },
    Program { value: ProgramNumber },
    ChannelAftertouch { value: PressureValue },
    PitchBend { bend: PitchBend },
}

/// SMPTE offset at which a track chunk is to start.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SmpteTimecode {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub frame: u8,
    pub fractional_frame: u8,
}

/// A time signature: numerator/denominator as notated, plus the metronome
/// click and notated-32nds-per-quarter fields the format also carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u16,
    pub clocks_per_click: u8,
    pub notated_32nds_per_quarter: u8,
}

/// A key signature: negative `key` counts flats, positive counts sharps.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct KeySignature {
    pub key: KeyAccidentals,
    pub is_minor: bool,
}

/// A decoded meta-event (`0xFF`-prefixed).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum MetaEvent<'a> {
    SequenceNumber(u16),
    Text { kind: TextKind, data: &'a [u8] },
    ChannelPrefix(u8),
    EndOfTrack,
    Tempo(u32),
    SmpteOffset(SmpteTimecode),
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    SequencerSpecific(&'a [u8]),
    /// Any meta-event type not otherwise recognized.
    Custom { kind: u8, data: &'a [u8] },
}

/// One emission from [`crate::engine::Parser::read_event`].
///
/// This is a plain Rust sum type: each variant carries exactly the fields it
/// needs, and the enum tag is the discriminator — there is no sentinel field
/// to keep synchronized by hand. Errors are not a variant here; they surface
/// through `read_event`'s `Result` instead. Variants that borrow bulk data
/// out of the parser's scratch buffer are tied to the lifetime of the
/// `&mut self` of the read call that produced them, so a caller cannot hold
/// one across the next read.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Event<'a> {
    /// The `MThd` header. Emitted exactly once, first.
    Header(Header),
    /// The start of an `MTrk` chunk.
    BeginTrack,
    /// An unrecognized top-level chunk, already skipped.
    Chunk { chunk_type: [u8; 4] },
    Midi { delta: u32, channel: Channel, message: ChannelMessage },
    Sysex { delta: u32, escape: bool, data: &'a [u8] },
    Meta { delta: u32, event: MetaEvent<'a> },
    /// End of input, once all declared tracks have been fully consumed.
    /// Sticky: every read after the first `Eof` yields another `Eof`.
    Eof,
}
