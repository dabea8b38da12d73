//! A streaming, pull-based parser for Standard MIDI Files (SMF).
//!
//! Feed bytes through an [`InputSource`] and pull events out one at a time
//! with [`Parser::read_event`]. The parser never buffers an entire file: a
//! chunk's declared byte budget is enforced as bytes stream past, and bulk
//! payloads (sysex data, meta-event text) are borrowed out of a small
//! reusable scratch buffer that is only valid until the next read.
//!
//! ```no_run
//! use smf_stream::{Parser, SliceSource, Event};
//!
//! # fn run(bytes: &[u8]) -> smf_stream::Result<()> {
//! let mut source = SliceSource::new(bytes);
//! let mut parser = Parser::new();
//! loop {
//!     match parser.read_event(&mut source)? {
//!         Event::Eof => break,
//!         _event => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod error;
#[macro_use]
mod clamp;

mod constants;
mod engine;
mod event;
mod fault;
mod framer;
mod header;
mod limits;
mod numbers;
mod source;

pub use engine::Parser;
pub use error::{Error, ErrorCode, Result};
pub use event::{ChannelMessage, Event, KeySignature, MetaEvent, SmpteTimecode, TextKind, TimeSignature};
pub use fault::set_fault_handler;
pub use header::{Format, Header, SmpteFrameRate, TimeSystem};
pub use numbers::{
    Channel, ControlNumber, ControlValue, KeyAccidentals, NoteNumber, PitchBend, PressureValue, ProgramNumber,
    Velocity,
};
pub use source::{FileSource, InputSource, ReaderSource, SliceSource, SourceState};
