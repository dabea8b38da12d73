use snafu::Snafu;
use std::fmt;

/// Stable, negative error codes, one per [`LibError`] variant. Callers that
/// want to branch on error kind without matching the (private) `snafu`
/// variant shape should use [`Error::code`].
#[repr(i32)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorCode {
    Io = -1,
    HugeFile = -2,
    OpenFile = -3,
    Eof = -4,
    HugeChunk = -5,
    Signature = -6,
    Header = -7,
    MidiFmt = -8,
    NoTracks = -9,
    MultiTrack = -10,
    MultiHead = -11,
    OpenTrack = -12,
    LongVarint = -13,
    RunStatus = -14,
    BigPayload = -15,
    BadEvent = -16,
    SeqNum = -17,
    ChPrefix = -18,
    BadEot = -19,
    SetTempo = -20,
    SmpteOff = -21,
    TimeSig = -22,
    KeySig = -23,
    MidiData = -24,
}

impl ErrorCode {
    /// A short, human-readable description, independent of any particular
    /// failure's call site or offending value.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::Io => "I/O error reading from the input source",
            ErrorCode::HugeFile => "input exceeds the 1 GiB addressable cap",
            ErrorCode::OpenFile => "unable to open the file",
            ErrorCode::Eof => "unexpected end of input",
            ErrorCode::HugeChunk => "chunk length exceeds 2^31-1",
            ErrorCode::Signature => "expected chunk type \"MThd\"",
            ErrorCode::Header => "malformed header chunk",
            ErrorCode::MidiFmt => "header format must be 0, 1, or 2",
            ErrorCode::NoTracks => "header declares zero tracks",
            ErrorCode::MultiTrack => "format-0 header declares more than one track",
            ErrorCode::MultiHead => "a second \"MThd\" chunk was encountered",
            ErrorCode::OpenTrack => "track chunk exhausted before its last event finished",
            ErrorCode::LongVarint => "variable-length quantity exceeds 4 bytes",
            ErrorCode::RunStatus => "running status resumed with no cached status byte",
            ErrorCode::BigPayload => "sysex or meta-event payload exceeds 32,768 bytes",
            ErrorCode::BadEvent => "unrecognized event status byte",
            ErrorCode::SeqNum => "malformed sequence-number meta-event",
            ErrorCode::ChPrefix => "malformed channel-prefix meta-event",
            ErrorCode::BadEot => "malformed end-of-track meta-event",
            ErrorCode::SetTempo => "malformed set-tempo meta-event",
            ErrorCode::SmpteOff => "malformed SMPTE-offset meta-event",
            ErrorCode::TimeSig => "malformed time-signature meta-event",
            ErrorCode::KeySig => "malformed key-signature meta-event",
            ErrorCode::MidiData => "MIDI data byte has its high bit set",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// The public error type for this crate. Cheap to clone: the parser's sticky
/// error state needs to hand out the same error on every subsequent read
/// without re-deriving it from `snafu`.
#[derive(Clone, Debug)]
pub struct Error {
    code: ErrorCode,
    message: String,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl From<LibError> for Error {
    fn from(e: LibError) -> Self {
        Error {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

/// The public result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The internal result type, threaded through the parsing helpers.
pub(crate) type LibResult<T> = std::result::Result<T, LibError>;

/// Internal, `snafu`-derived error enum. Each variant maps onto exactly one
/// [`ErrorCode`] through [`LibError::code`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum LibError {
    #[snafu(display("{}: I/O error: {}", site, source))]
    Io { site: String, source: std::io::Error },

    #[snafu(display("{}: input exceeds the 1 GiB addressable cap", site))]
    HugeFile { site: String },

    #[snafu(display("{}: unable to open '{}': {}", site, path, source))]
    OpenFile {
        site: String,
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("{}: unexpected end of input", site))]
    Eof { site: String },

    #[snafu(display("{}: chunk length {} exceeds 2^31-1", site, length))]
    HugeChunk { site: String, length: u32 },

    #[snafu(display("{}: expected chunk type \"MThd\", found {:?}", site, found))]
    Signature { site: String, found: [u8; 4] },

    #[snafu(display("{}: malformed header chunk: {}", site, reason))]
    Header { site: String, reason: String },

    #[snafu(display("{}: header format {} is not 0, 1, or 2", site, format))]
    MidiFmt { site: String, format: u16 },

    #[snafu(display("{}: header declares zero tracks", site))]
    NoTracks { site: String },

    #[snafu(display("{}: format-0 header declares {} tracks", site, n_tracks))]
    MultiTrack { site: String, n_tracks: u16 },

    #[snafu(display("{}: a second \"MThd\" chunk was encountered", site))]
    MultiHead { site: String },

    #[snafu(display("{}: track chunk exhausted mid-event", site))]
    OpenTrack { site: String },

    #[snafu(display("{}: variable-length quantity exceeds 4 bytes", site))]
    LongVarint { site: String },

    #[snafu(display("{}: running status resumed with no cached status byte", site))]
    RunStatus { site: String },

    #[snafu(display("{}: payload of {} bytes exceeds the 32,768 byte cap", site, length))]
    BigPayload { site: String, length: u32 },

    #[snafu(display("{}: unrecognized event status byte {:#04x}", site, status))]
    BadEvent { site: String, status: u8 },

    #[snafu(display("{}: sequence-number meta-event: {}", site, reason))]
    SeqNum { site: String, reason: String },

    #[snafu(display("{}: channel-prefix meta-event: {}", site, reason))]
    ChPrefix { site: String, reason: String },

    #[snafu(display("{}: end-of-track meta-event: {}", site, reason))]
    BadEot { site: String, reason: String },

    #[snafu(display("{}: set-tempo meta-event: {}", site, reason))]
    SetTempo { site: String, reason: String },

    #[snafu(display("{}: SMPTE-offset meta-event: {}", site, reason))]
    SmpteOff { site: String, reason: String },

    #[snafu(display("{}: time-signature meta-event: {}", site, reason))]
    TimeSig { site: String, reason: String },

    #[snafu(display("{}: key-signature meta-event: {}", site, reason))]
    KeySig { site: String, reason: String },

    #[snafu(display("{}: MIDI data byte {:#04x} has its high bit set", site, byte))]
    MidiData { site: String, byte: u8 },

    /// Wraps an already-public [`Error`] coming back from an [`InputSource`]
    /// call, so the chunk framer can thread it through [`LibResult`] without
    /// losing the original error code.
    ///
    /// [`InputSource`]: crate::source::InputSource
    #[snafu(display("{}", source))]
    Source { source: Error },
}

impl From<Error> for LibError {
    fn from(e: Error) -> Self {
        LibError::Source { source: e }
    }
}

impl LibError {
    pub(crate) fn code(&self) -> ErrorCode {
        match self {
            LibError::Io { .. } => ErrorCode::Io,
            LibError::HugeFile { .. } => ErrorCode::HugeFile,
            LibError::OpenFile { .. } => ErrorCode::OpenFile,
            LibError::Eof { .. } => ErrorCode::Eof,
            LibError::HugeChunk { .. } => ErrorCode::HugeChunk,
            LibError::Signature { .. } => ErrorCode::Signature,
            LibError::Header { .. } => ErrorCode::Header,
            LibError::MidiFmt { .. } => ErrorCode::MidiFmt,
            LibError::NoTracks { .. } => ErrorCode::NoTracks,
            LibError::MultiTrack { .. } => ErrorCode::MultiTrack,
            LibError::MultiHead { .. } => ErrorCode::MultiHead,
            LibError::OpenTrack { .. } => ErrorCode::OpenTrack,
            LibError::LongVarint { .. } => ErrorCode::LongVarint,
            LibError::RunStatus { .. } => ErrorCode::RunStatus,
            LibError::BigPayload { .. } => ErrorCode::BigPayload,
            LibError::BadEvent { .. } => ErrorCode::BadEvent,
            LibError::SeqNum { .. } => ErrorCode::SeqNum,
            LibError::ChPrefix { .. } => ErrorCode::ChPrefix,
            LibError::BadEot { .. } => ErrorCode::BadEot,
            LibError::SetTempo { .. } => ErrorCode::SetTempo,
            LibError::SmpteOff { .. } => ErrorCode::SmpteOff,
            LibError::TimeSig { .. } => ErrorCode::TimeSig,
            LibError::KeySig { .. } => ErrorCode::KeySig,
            LibError::MidiData { .. } => ErrorCode::MidiData,
            LibError::Source { source } => source.code(),
        }
    }
}

macro_rules! site {
    () => {
        format!("{}:{}", file!(), line!())
    };
}

#[test]
fn site_test() {
    let line = line!() + 1;
    let site = site!();
    assert!(site.contains("error.rs"));
    assert!(site.contains(format!("{}", line).as_str()));
}

#[test]
fn lib_error_maps_to_stable_code() {
    let e: Error = LibError::Eof { site: site!() }.into();
    assert_eq!(e.code(), ErrorCode::Eof);
    assert!(e.to_string().contains("unexpected end of input"));
}

#[test]
fn error_is_clone_for_sticky_replay() {
    let e: Error = LibError::RunStatus { site: site!() }.into();
    let e2 = e.clone();
    assert_eq!(e.code(), e2.code());
    assert_eq!(e.to_string(), e2.to_string());
}
