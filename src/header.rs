//! The `MThd` header chunk: format, track count, and time system.

use crate::error;
use crate::framer::ChunkFramer;
use crate::error::LibResult;

/// `fmt` field of the header chunk.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Format {
    /// 0: the file contains a single multi-channel track.
    Single,
    /// 1: the file contains one or more simultaneous tracks of a sequence.
    Multi,
    /// 2: the file contains one or more sequentially independent patterns.
    Sequential,
}

impl Format {
    fn from_u16(value: u16) -> LibResult<Self> {
        match value {
            0 => Ok(Format::Single),
            1 => Ok(Format::Multi),
            2 => Ok(Format::Sequential),
            _ => error::MidiFmt { site: site!(), format: value }.fail(),
        }
    }
}

/// One of the four standard SMPTE / MIDI time code frame rates. `N29` denotes
/// the 30000/1001 Hz drop-frame scheme.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SmpteFrameRate {
    N24 = 24,
    N25 = 25,
    N29 = 29,
    N30 = 30,
}

impl SmpteFrameRate {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            24 => Some(SmpteFrameRate::N24),
            25 => Some(SmpteFrameRate::N25),
            29 => Some(SmpteFrameRate::N29),
            30 => Some(SmpteFrameRate::N30),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// The header's time system: either metrical (ticks per quarter-note beat)
/// or SMPTE-based (ticks per frame, at one of the four standard frame rates).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TimeSystem {
    /// Ticks per beat, in `[1, 32767]`.
    TicksPerBeat(u16),
    /// Ticks per SMPTE frame, `subdiv` in `[1, 127]`.
    TicksPerFrame {
        frame_rate: SmpteFrameRate,
        subdiv: u8,
    },
}

impl TimeSystem {
    fn from_u16(division: u16) -> LibResult<Self> {
        const TYPE_BIT: u16 = 0b1000_0000_0000_0000;
        if division & TYPE_BIT == 0 {
            if division == 0 {
                return error::Header {
                    site: site!(),
                    reason: "ticks-per-beat division must be nonzero".to_string(),
                }
                .fail();
            }
            Ok(TimeSystem::TicksPerBeat(division))
        } else {
            let high_byte = (division >> 8) as u8;
            let frame_rate_signed = -(high_byte as i8);
            let frame_rate = SmpteFrameRate::from_u8(frame_rate_signed as u8).ok_or_else(|| {
                error::Header {
                    site: site!(),
                    reason: format!("unsupported SMPTE frame rate byte {:#04x}", high_byte),
                }
                .build()
            })?;
            let subdiv = (division & 0x00FF) as u8;
            if subdiv == 0 {
                return error::Header {
                    site: site!(),
                    reason: "SMPTE subdivision must be nonzero".to_string(),
                }
                .fail();
            }
            Ok(TimeSystem::TicksPerFrame { frame_rate, subdiv })
        }
    }
}

/// The parsed `MThd` chunk.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Header {
    pub format: Format,
    pub n_tracks: u16,
    pub time_system: TimeSystem,
}

impl Header {
    /// Parses the header payload. The framer must already be positioned
    /// inside the `MThd` chunk (i.e. `enter` has been called with its
    /// length); any trailing bytes beyond `division` are left for the caller
    /// to skip via [`ChunkFramer::skip_chunk_remainder`].
    pub(crate) fn parse(framer: &mut ChunkFramer<'_>) -> LibResult<Self> {
        let format_word = framer.read_chunk_u16()?;
        let n_tracks = framer.read_chunk_u16()?;
        let division = framer.read_chunk_u16()?;

        let format = Format::from_u16(format_word)?;
        if n_tracks < 1 {
            return error::NoTracks { site: site!() }.fail();
        }
        if matches!(format, Format::Single) && n_tracks != 1 {
            return error::MultiTrack { site: site!(), n_tracks }.fail();
        }
        let time_system = TimeSystem::from_u16(division)?;

        Ok(Header {
            format,
            n_tracks,
            time_system,
        })
    }
}
