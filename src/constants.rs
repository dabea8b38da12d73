//! Status-byte constants from Table I, "Summary of Status Bytes", of the MIDI
//! specification, as relevant to in-track event dispatch.

/// `0x8_`: Note Off.
pub(crate) const STATUS_NOTE_OFF: u8 = 0x80;
/// `0x9_`: Note On (velocity 0 is a valid, distinct event; see the engine).
pub(crate) const STATUS_NOTE_ON: u8 = 0x90;
/// `0xA_`: Polyphonic key pressure / aftertouch.
pub(crate) const STATUS_KEY_AFTERTOUCH: u8 = 0xA0;
/// `0xB_`: Control change.
pub(crate) const STATUS_CONTROL: u8 = 0xB0;
/// `0xC_`: Program change.
pub(crate) const STATUS_PROGRAM: u8 = 0xC0;
/// `0xD_`: Channel pressure / aftertouch.
pub(crate) const STATUS_CHANNEL_AFTERTOUCH: u8 = 0xD0;
/// `0xE_`: Pitch bend change.
pub(crate) const STATUS_PITCH_BEND: u8 = 0xE0;

/// `0xFF`: all meta-events begin with this byte, followed by a type byte.
pub(crate) const FILE_META_EVENT: u8 = 0xFF;
/// `0xF0`: `F0 <len> <bytes to be transmitted after F0>`.
pub(crate) const FILE_SYSEX_F0: u8 = 0xF0;
/// `0xF7`: `F7 <len> <all bytes to be transmitted>`.
pub(crate) const FILE_SYSEX_F7: u8 = 0xF7;

/// Meta-event type bytes.
pub(crate) mod meta {
    pub(crate) const SEQUENCE_NUMBER: u8 = 0x00;
    pub(crate) const TEXT_RANGE_START: u8 = 0x01;
    pub(crate) const TEXT_RANGE_END: u8 = 0x09;
    pub(crate) const CHANNEL_PREFIX: u8 = 0x20;
    pub(crate) const END_OF_TRACK: u8 = 0x2F;
    pub(crate) const SET_TEMPO: u8 = 0x51;
    pub(crate) const SMPTE_OFFSET: u8 = 0x54;
    pub(crate) const TIME_SIGNATURE: u8 = 0x58;
    pub(crate) const KEY_SIGNATURE: u8 = 0x59;
    pub(crate) const SEQUENCER_SPECIFIC: u8 = 0x7F;
}
