//! The event engine: the top-level state machine that drives the chunk
//! framer one step per caller read, decoding channel messages (with running
//! status), sysex, and meta-events.
//!
//! `read_event` is a lending read: on success it hands back an [`Event<'p>`]
//! borrowing the parser's scratch buffer. That shape makes the obvious
//! "match on the inner read, latch an error into `self.state` in the `Err`
//! arm" impossible to write without re-borrowing `self` while the `Ok`
//! borrow is still live (the classic lending-iterator borrow-checker limit).
//! Instead, [`read_event_inner`](Parser::read_event_inner) does all the
//! actual reading and returns an owned [`Decoded`] value with no lifetime of
//! its own, latching any error into `self.state` itself before it returns.
//! Only afterward, once that borrow has ended, does
//! [`project`](Parser::project) take a fresh borrow of `self.scratch` to
//! build the `Event<'p>` the caller sees.

use crate::constants::{
    meta, FILE_META_EVENT, FILE_SYSEX_F0, FILE_SYSEX_F7, STATUS_CHANNEL_AFTERTOUCH, STATUS_CONTROL,
    STATUS_KEY_AFTERTOUCH, STATUS_NOTE_OFF, STATUS_NOTE_ON, STATUS_PITCH_BEND, STATUS_PROGRAM,
};
use crate::error::{self, Error, LibResult, Result};
use crate::event::{ChannelMessage, Event, KeySignature, MetaEvent, SmpteTimecode, TextKind, TimeSignature};
use crate::fault::fault;
use crate::framer::{ChunkFramer, MTHD, MTRK};
use crate::header::{Header, SmpteFrameRate, TimeSystem};
use crate::limits::{SCRATCH_CAP, SCRATCH_INITIAL};
use crate::numbers::{
    Channel, ControlNumber, ControlValue, NoteNumber, PitchBend, PressureValue, ProgramNumber, Velocity,
};
use crate::source::InputSource;
use log::{debug, trace};

/// Top-level parser state. `Error` is absorbing: once set, `read_event`
/// short-circuits to the same error without touching the input source.
enum ParserState {
    Fresh,
    HeaderSeen,
    Eof,
    Error(Error),
}

/// An owned, non-borrowing record of what [`Parser::read_event_inner`] just
/// read. Bulk payloads are recorded as a length into `self.scratch` rather
/// than a slice, so this type carries no lifetime; [`Parser::project`] turns
/// it into the borrowed [`Event`] the caller actually sees.
enum Decoded {
    Header(Header),
    BeginTrack,
    Chunk { chunk_type: [u8; 4] },
    Midi { delta: u32, channel: Channel, message: ChannelMessage },
    Sysex { delta: u32, escape: bool, len: usize },
    Meta { delta: u32, meta: DecodedMeta },
    Eof,
}

/// The [`Decoded`] counterpart of [`MetaEvent`].
enum DecodedMeta {
    SequenceNumber(u16),
    Text { kind: TextKind, len: usize },
    ChannelPrefix(u8),
    EndOfTrack,
    Tempo(u32),
    SmpteOffset(SmpteTimecode),
    TimeSignature(TimeSignature),
    KeySignature(KeySignature),
    SequencerSpecific { len: usize },
    Custom { kind: u8, len: usize },
}

/// A streaming Standard MIDI File parser. Construct with [`Parser::new`] and
/// call [`Parser::read_event`] repeatedly, passing the same [`InputSource`]
/// (or at least one logically continuing it) each time.
pub struct Parser {
    state: ParserState,
    header: Option<Header>,
    tracks_seen: u16,
    /// -1 means "between chunks"; otherwise the number of bytes left in the
    /// chunk currently open.
    chunk_remaining: i64,
    running_status: Option<u8>,
    scratch: Vec<u8>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            state: ParserState::Fresh,
            header: None,
            tracks_seen: 0,
            chunk_remaining: -1,
            running_status: None,
            scratch: Vec::with_capacity(SCRATCH_INITIAL),
        }
    }

    /// Reads and returns the next event. Once an error has occurred, every
    /// subsequent call returns the same error without reading further.
    pub fn read_event<'p>(&'p mut self, source: &mut dyn InputSource) -> Result<Event<'p>> {
        if let ParserState::Error(e) = &self.state {
            return Err(e.clone());
        }
        if let ParserState::Eof = self.state {
            return Ok(Event::Eof);
        }
        // `read_event_inner` takes `&mut self` with no lifetime tied to its
        // return type, so this borrow ends as soon as the call returns —
        // well before `project` below takes its own, `'p`-tied borrow.
        let decoded = self.read_event_inner(source)?;
        Ok(self.project(decoded))
    }

    /// Performs one step of the state machine, latching any error into
    /// `self.state` before returning it. Returns an owned [`Decoded`] value
    /// on success; never returns a reference into `self`.
    fn read_event_inner(&mut self, source: &mut dyn InputSource) -> Result<Decoded> {
        let result = match self.state {
            ParserState::Fresh => self.read_header_chunk(source),
            ParserState::HeaderSeen => {
                if self.chunk_remaining >= 0 {
                    self.read_track_event(source)
                } else {
                    let header = self.header.unwrap_or_else(|| fault("header missing after HeaderSeen"));
                    if self.tracks_seen < header.n_tracks {
                        self.read_next_chunk_header(source)
                    } else {
                        debug!("all {} declared tracks consumed", self.tracks_seen);
                        self.state = ParserState::Eof;
                        Ok(Decoded::Eof)
                    }
                }
            }
            ParserState::Eof => Ok(Decoded::Eof),
            ParserState::Error(_) => fault("read_event_inner called while parser is in a sticky error state"),
        };
        result.map_err(|lib_err| {
            let err: Error = lib_err.into();
            self.state = ParserState::Error(err.clone());
            err
        })
    }

    /// Turns a [`Decoded`] value into the borrowed [`Event`] the caller
    /// sees, taking a fresh borrow of `self.scratch` for any bulk payload.
    fn project<'p>(&'p self, decoded: Decoded) -> Event<'p> {
        match decoded {
            Decoded::Header(h) => Event::Header(h),
            Decoded::BeginTrack => Event::BeginTrack,
            Decoded::Chunk { chunk_type } => Event::Chunk { chunk_type },
            Decoded::Midi { delta, channel, message } => Event::Midi { delta, channel, message },
            Decoded::Sysex { delta, escape, len } => Event::Sysex {
                delta,
                escape,
                data: &self.scratch[..len],
            },
            Decoded::Meta { delta, meta } => Event::Meta {
                delta,
                event: self.project_meta(meta),
            },
            Decoded::Eof => Event::Eof,
        }
    }

    fn project_meta<'p>(&'p self, meta: DecodedMeta) -> MetaEvent<'p> {
        match meta {
            DecodedMeta::SequenceNumber(n) => MetaEvent::SequenceNumber(n),
            DecodedMeta::Text { kind, len } => MetaEvent::Text {
                kind,
                data: &self.scratch[..len],
            },
            DecodedMeta::ChannelPrefix(b) => MetaEvent::ChannelPrefix(b),
            DecodedMeta::EndOfTrack => MetaEvent::EndOfTrack,
            DecodedMeta::Tempo(v) => MetaEvent::Tempo(v),
            DecodedMeta::SmpteOffset(tc) => MetaEvent::SmpteOffset(tc),
            DecodedMeta::TimeSignature(sig) => MetaEvent::TimeSignature(sig),
            DecodedMeta::KeySignature(sig) => MetaEvent::KeySignature(sig),
            DecodedMeta::SequencerSpecific { len } => MetaEvent::SequencerSpecific(&self.scratch[..len]),
            DecodedMeta::Custom { kind, len } => MetaEvent::Custom {
                kind,
                data: &self.scratch[..len],
            },
        }
    }

    fn read_header_chunk(&mut self, source: &mut dyn InputSource) -> LibResult<Decoded> {
        trace!("reading MThd chunk header");
        let mut framer = ChunkFramer::new(source, &mut self.chunk_remaining);
        let (ty, len) = framer
            .read_chunk_header()?
            .ok_or_else(|| error::Eof { site: site!() }.build())?;
        if ty != MTHD {
            return error::Signature { site: site!(), found: ty }.fail();
        }
        if len < 6 {
            return error::Header {
                site: site!(),
                reason: "chunk length less than 6".to_string(),
            }
            .fail();
        }
        framer.enter(len);
        let header = Header::parse(&mut framer)?;
        framer.skip_chunk_remainder()?;
        self.header = Some(header);
        self.state = ParserState::HeaderSeen;
        Ok(Decoded::Header(header))
    }

    fn read_next_chunk_header(&mut self, source: &mut dyn InputSource) -> LibResult<Decoded> {
        let mut framer = ChunkFramer::new(source, &mut self.chunk_remaining);
        let (ty, len) = framer
            .read_chunk_header()?
            .ok_or_else(|| error::Eof { site: site!() }.build())?;
        if ty == MTRK {
            framer.enter(len);
            self.running_status = None;
            self.tracks_seen += 1;
            let header = self.header.unwrap_or_else(|| fault("header missing while reading chunk"));
            trace!("entering track {} of {} declared", self.tracks_seen, header.n_tracks);
            Ok(Decoded::BeginTrack)
        } else if ty == MTHD {
            error::MultiHead { site: site!() }.fail()
        } else {
            debug!("skipping foreign chunk {:?} ({} bytes)", ty, len);
            framer.enter(len);
            framer.skip_chunk_remainder()?;
            Ok(Decoded::Chunk { chunk_type: ty })
        }
    }

    fn read_track_event(&mut self, source: &mut dyn InputSource) -> LibResult<Decoded> {
        let mut framer = ChunkFramer::new(source, &mut self.chunk_remaining);
        let delta = framer.read_chunk_varint()?;
        let s = framer.read_chunk_byte()?;

        let (status, first_data) = if s < 0x80 {
            let running = self
                .running_status
                .ok_or_else(|| error::RunStatus { site: site!() }.build())?;
            (running, Some(s))
        } else {
            (s, None)
        };

        match status {
            0x80..=0xEF => {
                let message = decode_channel_message(&mut framer, status, first_data)?;
                self.running_status = Some(status);
                Ok(Decoded::Midi {
                    delta,
                    channel: Channel::new(status & 0x0F),
                    message,
                })
            }
            FILE_SYSEX_F0 | FILE_SYSEX_F7 => {
                self.running_status = None;
                let escape = status == FILE_SYSEX_F7;
                let len = framer.read_chunk_varint()?;
                if len as usize > SCRATCH_CAP {
                    return error::BigPayload { site: site!(), length: len }.fail();
                }
                fill_scratch(&mut framer, &mut self.scratch, len as usize)?;
                Ok(Decoded::Sysex {
                    delta,
                    escape,
                    len: len as usize,
                })
            }
            FILE_META_EVENT => self.read_meta_event(&mut framer, delta),
            _ => error::BadEvent { site: site!(), status }.fail(),
        }
    }

    fn read_meta_event(&mut self, framer: &mut ChunkFramer<'_>, delta: u32) -> LibResult<Decoded> {
        self.running_status = None;
        let kind_byte = framer.read_chunk_byte()?;
        let len = framer.read_chunk_varint()?;
        if len as usize > SCRATCH_CAP {
            return error::BigPayload { site: site!(), length: len }.fail();
        }
        let header_copy = self.header;

        let meta = match kind_byte {
            meta::SEQUENCE_NUMBER => {
                expect_len(len, 2, |reason| error::SeqNum { site: site!(), reason }.build())?;
                DecodedMeta::SequenceNumber(framer.read_chunk_u16()?)
            }
            b if (meta::TEXT_RANGE_START..=meta::TEXT_RANGE_END).contains(&b) => {
                let kind = TextKind::from_type_byte(b)
                    .unwrap_or_else(|| fault(&format!("meta-event type {:#04x} matched the text range but has no TextKind", b)));
                fill_scratch(framer, &mut self.scratch, len as usize)?;
                DecodedMeta::Text { kind, len: len as usize }
            }
            meta::CHANNEL_PREFIX => {
                expect_len(len, 1, |reason| error::ChPrefix { site: site!(), reason }.build())?;
                let byte = framer.read_chunk_byte()?;
                if byte > 15 {
                    return error::ChPrefix {
                        site: site!(),
                        reason: format!("channel {} is outside [0,15]", byte),
                    }
                    .fail();
                }
                DecodedMeta::ChannelPrefix(byte)
            }
            meta::END_OF_TRACK => {
                expect_len(len, 0, |reason| error::BadEot { site: site!(), reason }.build())?;
                DecodedMeta::EndOfTrack
            }
            meta::SET_TEMPO => {
                expect_len(len, 3, |reason| error::SetTempo { site: site!(), reason }.build())?;
                let b0 = framer.read_chunk_byte()?;
                let b1 = framer.read_chunk_byte()?;
                let b2 = framer.read_chunk_byte()?;
                let value = u32::from_be_bytes([0, b0, b1, b2]);
                if value == 0 {
                    return error::SetTempo {
                        site: site!(),
                        reason: "tempo must be greater than zero".to_string(),
                    }
                    .fail();
                }
                DecodedMeta::Tempo(value)
            }
            meta::SMPTE_OFFSET => {
                expect_len(len, 5, |reason| error::SmpteOff { site: site!(), reason }.build())?;
                let hour = framer.read_chunk_byte()?;
                let minute = framer.read_chunk_byte()?;
                let second = framer.read_chunk_byte()?;
                let frame = framer.read_chunk_byte()?;
                let ff = framer.read_chunk_byte()?;
                validate_smpte(header_copy, hour, minute, second, frame, ff)?;
                DecodedMeta::SmpteOffset(SmpteTimecode {
                    hour,
                    minute,
                    second,
                    frame,
                    fractional_frame: ff,
                })
            }
            meta::TIME_SIGNATURE => {
                expect_len(len, 4, |reason| error::TimeSig { site: site!(), reason }.build())?;
                let numerator = framer.read_chunk_byte()?;
                let denom_exp = framer.read_chunk_byte()?;
                let click = framer.read_chunk_byte()?;
                let beat_unit = framer.read_chunk_byte()?;
                if denom_exp > 15 {
                    return error::TimeSig {
                        site: site!(),
                        reason: format!("denominator exponent {} exceeds 15", denom_exp),
                    }
                    .fail();
                }
                let denominator = 1u16 << denom_exp;
                if denominator > 1024 {
                    return error::TimeSig {
                        site: site!(),
                        reason: format!("denominator {} exceeds 1024", denominator),
                    }
                    .fail();
                }
                if numerator == 0 || click == 0 || beat_unit == 0 {
                    return error::TimeSig {
                        site: site!(),
                        reason: "numerator, click, and beat_unit must each be nonzero".to_string(),
                    }
                    .fail();
                }
                DecodedMeta::TimeSignature(TimeSignature {
                    numerator,
                    denominator,
                    clocks_per_click: click,
                    notated_32nds_per_quarter: beat_unit,
                })
            }
            meta::KEY_SIGNATURE => {
                expect_len(len, 2, |reason| error::KeySig { site: site!(), reason }.build())?;
                let key_byte = framer.read_chunk_byte()?;
                let key = key_byte as i8;
                if !(-7..=7).contains(&key) {
                    return error::KeySig {
                        site: site!(),
                        reason: format!("key {} is outside [-7,7]", key),
                    }
                    .fail();
                }
                let mode_byte = framer.read_chunk_byte()?;
                if mode_byte > 1 {
                    return error::KeySig {
                        site: site!(),
                        reason: format!("mode byte {} is not 0 or 1", mode_byte),
                    }
                    .fail();
                }
                DecodedMeta::KeySignature(KeySignature {
                    key: key.into(),
                    is_minor: mode_byte == 1,
                })
            }
            meta::SEQUENCER_SPECIFIC => {
                fill_scratch(framer, &mut self.scratch, len as usize)?;
                DecodedMeta::SequencerSpecific { len: len as usize }
            }
            other => {
                fill_scratch(framer, &mut self.scratch, len as usize)?;
                DecodedMeta::Custom { kind: other, len: len as usize }
            }
        };

        if matches!(meta, DecodedMeta::EndOfTrack) {
            framer.skip_chunk_remainder()?;
        }
        Ok(Decoded::Meta { delta, meta })
    }
}

fn expect_len<F>(actual: u32, expected: u32, err: F) -> LibResult<()>
where
    F: FnOnce(String) -> crate::error::LibError,
{
    if actual != expected {
        return Err(err(format!("payload length {} != {}", actual, expected)));
    }
    Ok(())
}

fn validate_data_byte(b: u8) -> LibResult<()> {
    if b & 0x80 != 0 {
        return error::MidiData { site: site!(), byte: b }.fail();
    }
    Ok(())
}

fn decode_channel_message(
    framer: &mut ChunkFramer<'_>,
    status: u8,
    first: Option<u8>,
) -> LibResult<ChannelMessage> {
    let msg_type = status & 0xF0;
    let a = match first {
        Some(b) => b,
        None => framer.read_chunk_byte()?,
    };
    validate_data_byte(a)?;
    let message = match msg_type {
        STATUS_NOTE_OFF => {
            let b = framer.read_chunk_byte()?;
            validate_data_byte(b)?;
            ChannelMessage::NoteOff {
                key: NoteNumber::new(a),
                velocity: Velocity::new(b),
            }
        }
        STATUS_NOTE_ON => {
            let b = framer.read_chunk_byte()?;
            validate_data_byte(b)?;
            ChannelMessage::NoteOn {
                key: NoteNumber::new(a),
                velocity: Velocity::new(b),
            }
        }
        STATUS_KEY_AFTERTOUCH => {
            let b = framer.read_chunk_byte()?;
            validate_data_byte(b)?;
            ChannelMessage::KeyAftertouch {
                key: NoteNumber::new(a),
                pressure: PressureValue::new(b),
            }
        }
        STATUS_CONTROL => {
            let b = framer.read_chunk_byte()?;
            validate_data_byte(b)?;
            ChannelMessage::Control {
                controller: ControlNumber::new(a),
                value: ControlValue::new(b),
            }
        }
        STATUS_PROGRAM => ChannelMessage::Program {
            value: ProgramNumber::new(a),
        },
        STATUS_CHANNEL_AFTERTOUCH => ChannelMessage::ChannelAftertouch {
            value: PressureValue::new(a),
        },
        STATUS_PITCH_BEND => {
            let b = framer.read_chunk_byte()?;
            validate_data_byte(b)?;
            let raw = (i16::from(b) << 7) | i16::from(a);
            ChannelMessage::PitchBend {
                bend: PitchBend::new(raw - 8192),
            }
        }
        _ => fault(&format!("status byte {:#04x} is not a channel message", status)),
    };
    Ok(message)
}

fn validate_smpte(
    header: Option<Header>,
    hour: u8,
    minute: u8,
    second: u8,
    frame: u8,
    fractional_frame: u8,
) -> LibResult<()> {
    if hour > 23 || minute > 59 || second > 59 || frame > 29 || fractional_frame > 99 {
        return error::SmpteOff {
            site: site!(),
            reason: "a timecode field is outside its documented range".to_string(),
        }
        .fail();
    }
    if let Some(header) = header {
        if let TimeSystem::TicksPerFrame { frame_rate, .. } = header.time_system {
            match frame_rate {
                SmpteFrameRate::N24 if frame >= 24 => {
                    return error::SmpteOff {
                        site: site!(),
                        reason: "frame is out of range for 24 fps".to_string(),
                    }
                    .fail();
                }
                SmpteFrameRate::N25 if frame >= 25 => {
                    return error::SmpteOff {
                        site: site!(),
                        reason: "frame is out of range for 25 fps".to_string(),
                    }
                    .fail();
                }
                SmpteFrameRate::N29 if minute % 10 != 0 && (frame == 0 || frame == 1) => {
                    return error::SmpteOff {
                        site: site!(),
                        reason: "drop-frame timecode skips :00 and :01 except on whole 10-minute marks".to_string(),
                    }
                    .fail();
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Grows `scratch`'s capacity by doubling, starting from [`SCRATCH_INITIAL`],
/// until it can hold `needed` bytes, then reads exactly `needed` bytes from
/// `framer` into it.
fn fill_scratch(framer: &mut ChunkFramer<'_>, scratch: &mut Vec<u8>, needed: usize) -> LibResult<()> {
    if scratch.capacity() < needed {
        let mut cap = scratch.capacity().max(SCRATCH_INITIAL);
        while cap < needed {
            cap *= 2;
        }
        scratch.reserve(cap - scratch.len());
    }
    scratch.clear();
    for _ in 0..needed {
        scratch.push(framer.read_chunk_byte()?);
    }
    Ok(())
}
