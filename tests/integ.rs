mod utils;

use smf_stream::{
    ChannelMessage, Error, ErrorCode, Event, Format, MetaEvent, NoteNumber, Parser, PitchBend, SliceSource,
    TimeSystem, Velocity,
};
use utils::{chunk, enable_logging, smf, varint};

fn header_body(format: u16, n_tracks: u16, division: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(6);
    body.extend_from_slice(&format.to_be_bytes());
    body.extend_from_slice(&n_tracks.to_be_bytes());
    body.extend_from_slice(&division.to_be_bytes());
    body
}

fn read_ok<'p>(parser: &'p mut Parser, source: &mut SliceSource<'_>) -> Event<'p> {
    parser.read_event(source).expect("expected a successful read")
}

#[test]
fn minimal_format_0_note_on_note_off_end_track() {
    enable_logging();
    let mut track = Vec::new();
    track.extend(varint(0));
    track.extend_from_slice(&[0x90, 60, 100]);
    track.extend(varint(96));
    track.extend_from_slice(&[0x80, 60, 64]);
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();

    match read_ok(&mut p, &mut src) {
        Event::Header(h) => {
            assert_eq!(h.format, Format::Single);
            assert_eq!(h.n_tracks, 1);
            assert_eq!(h.time_system, TimeSystem::TicksPerBeat(96));
        }
        other => panic!("expected Header, got {:?}", other),
    }
    assert!(matches!(read_ok(&mut p, &mut src), Event::BeginTrack));
    match read_ok(&mut p, &mut src) {
        Event::Midi { delta, channel, message } => {
            assert_eq!(delta, 0);
            assert_eq!(channel.get(), 0);
            assert_eq!(
                message,
                ChannelMessage::NoteOn {
                    key: NoteNumber::new(60),
                    velocity: Velocity::new(100)
                }
            );
        }
        other => panic!("expected NOTE_ON, got {:?}", other),
    }
    match read_ok(&mut p, &mut src) {
        Event::Midi { delta, message, .. } => {
            assert_eq!(delta, 96);
            assert_eq!(
                message,
                ChannelMessage::NoteOff {
                    key: NoteNumber::new(60),
                    velocity: Velocity::new(64)
                }
            );
        }
        other => panic!("expected NOTE_OFF, got {:?}", other),
    }
    match read_ok(&mut p, &mut src) {
        Event::Meta { delta, event } => {
            assert_eq!(delta, 0);
            assert!(matches!(event, MetaEvent::EndOfTrack));
        }
        other => panic!("expected EndOfTrack, got {:?}", other),
    }
    assert!(matches!(read_ok(&mut p, &mut src), Event::Eof));
    // EOF is sticky.
    assert!(matches!(read_ok(&mut p, &mut src), Event::Eof));
}

#[test]
fn running_status_resumes_cached_status_byte() {
    let mut track = Vec::new();
    track.extend(varint(0));
    track.extend_from_slice(&[0x90, 60, 100]); // NOTE_ON with explicit status
    track.extend(varint(96));
    track.extend_from_slice(&[60, 0]); // same status resumed: NOTE_ON, velocity 0
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src); // Header
    read_ok(&mut p, &mut src); // BeginTrack
    read_ok(&mut p, &mut src); // first NOTE_ON

    match read_ok(&mut p, &mut src) {
        Event::Midi { delta, message, .. } => {
            assert_eq!(delta, 96);
            // Velocity 0 stays NOTE_ON; it is never rewritten to NOTE_OFF.
            assert_eq!(
                message,
                ChannelMessage::NoteOn {
                    key: NoteNumber::new(60),
                    velocity: Velocity::new(0)
                }
            );
        }
        other => panic!("expected running-status NOTE_ON, got {:?}", other),
    }
}

#[test]
fn running_status_without_a_cached_status_byte_errors() {
    // The very first in-track event has a data byte where a status byte is
    // expected, with no running status cached yet.
    let mut track = Vec::new();
    track.extend(varint(0));
    track.extend_from_slice(&[60, 100]);

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    let err = p.read_event(&mut src).unwrap_err();
    assert_eq!(err.code(), ErrorCode::RunStatus);
}

#[test]
fn set_tempo_decodes_microseconds_per_quarter() {
    let mut track = Vec::new();
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]); // 500_000
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    match read_ok(&mut p, &mut src) {
        Event::Meta { delta, event: MetaEvent::Tempo(t) } => {
            assert_eq!(delta, 0);
            assert_eq!(t, 500_000);
        }
        other => panic!("expected Tempo, got {:?}", other),
    }
}

#[test]
fn time_signature_six_eight() {
    let mut track = Vec::new();
    track.extend(varint(0));
    // 6/8, denom exponent 3 (2^3 = 8), 24 clocks per click, 8 32nds per beat.
    track.extend_from_slice(&[0xFF, 0x58, 0x04, 0x06, 0x03, 0x18, 0x08]);
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    match read_ok(&mut p, &mut src) {
        Event::Meta { event: MetaEvent::TimeSignature(ts), .. } => {
            assert_eq!(ts.numerator, 6);
            assert_eq!(ts.denominator, 8);
            assert_eq!(ts.clocks_per_click, 24);
            assert_eq!(ts.notated_32nds_per_quarter, 8);
        }
        other => panic!("expected TimeSignature, got {:?}", other),
    }
}

#[test]
fn long_varint_is_a_sticky_error() {
    let mut track = Vec::new();
    track.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0x00]); // 5-byte continuation

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src); // Header
    read_ok(&mut p, &mut src); // BeginTrack
    let first: Error = p.read_event(&mut src).unwrap_err();
    assert_eq!(first.code(), ErrorCode::LongVarint);
    let second = p.read_event(&mut src).unwrap_err();
    assert_eq!(second.code(), ErrorCode::LongVarint);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn unknown_foreign_chunk_between_header_and_first_track() {
    let mut data = chunk(b"MThd", &header_body(0, 1, 96));
    data.extend(chunk(b"XYZZ", &[0xDE, 0xAD, 0xBE, 0xEF]));
    data.extend(chunk(b"MTrk", &[0x00, 0xFF, 0x2F, 0x00]));

    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    assert!(matches!(read_ok(&mut p, &mut src), Event::Header(_)));
    match read_ok(&mut p, &mut src) {
        Event::Chunk { chunk_type } => assert_eq!(&chunk_type, b"XYZZ"),
        other => panic!("expected Chunk, got {:?}", other),
    }
    assert!(matches!(read_ok(&mut p, &mut src), Event::BeginTrack));
    assert!(matches!(read_ok(&mut p, &mut src), Event::Meta { event: MetaEvent::EndOfTrack, .. }));
    assert!(matches!(read_ok(&mut p, &mut src), Event::Eof));
}

#[test]
fn pitch_bend_spans_its_full_range() {
    for (a, b, expected) in [(0x00u8, 0x00u8, -8192i16), (0x7F, 0x7F, 8191), (0x00, 0x40, 0)] {
        let mut track = Vec::new();
        track.extend(varint(0));
        track.extend_from_slice(&[0xE0, a, b]);
        track.extend(varint(0));
        track.extend_from_slice(&[0xFF, 0x2F, 0x00]);

        let data = smf(0, 1, 96, &[&track]);
        let mut src = SliceSource::new(&data);
        let mut p = Parser::new();
        read_ok(&mut p, &mut src);
        read_ok(&mut p, &mut src);
        match read_ok(&mut p, &mut src) {
            Event::Midi { message: ChannelMessage::PitchBend { bend }, .. } => {
                assert_eq!(bend, PitchBend::new(expected));
            }
            other => panic!("expected PitchBend, got {:?}", other),
        }
    }
}

#[test]
fn midi_data_byte_with_high_bit_set_errors() {
    let mut track = Vec::new();
    track.extend(varint(0));
    track.extend_from_slice(&[0x90, 0xFF, 100]); // key byte has its high bit set

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    let err = p.read_event(&mut src).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MidiData);
}

#[test]
fn track_chunk_byte_budget_is_enforced_exactly() {
    // Declares a 2-byte budget but the event needs more than that.
    let mut data = chunk(b"MThd", &header_body(0, 1, 96));
    data.extend(chunk(b"MTrk", &[0x00, 0x90])); // delta=0, status=0x90, budget ends there
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    let err = p.read_event(&mut src).unwrap_err();
    assert_eq!(err.code(), ErrorCode::OpenTrack);
}

#[test]
fn sysex_payload_at_exactly_the_cap_is_accepted() {
    let mut track = Vec::new();
    track.extend(varint(0));
    track.push(0xF0);
    track.extend(varint(32_768));
    track.extend(std::iter::repeat(0x7Fu8).take(32_768));
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    match read_ok(&mut p, &mut src) {
        Event::Sysex { escape, data, .. } => {
            assert!(!escape);
            assert_eq!(data.len(), 32_768);
        }
        other => panic!("expected Sysex, got {:?}", other),
    }
}

#[test]
fn sysex_payload_one_byte_over_the_cap_is_rejected() {
    let mut track = Vec::new();
    track.extend(varint(0));
    track.push(0xF0);
    track.extend(varint(32_769));
    track.extend(std::iter::repeat(0x7Fu8).take(32_769));

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    let err = p.read_event(&mut src).unwrap_err();
    assert_eq!(err.code(), ErrorCode::BigPayload);
}

#[test]
fn smpte_drop_frame_rule_rejects_00_and_01_off_the_ten_minute_mark() {
    // High byte 0xE3 is the two's-complement encoding of -29 (drop-frame).
    let mut track = Vec::new();
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x54, 0x05, 1, 1, 0, 0, 0]); // minute=1, frame=0
    let data = smf(1, 1, 0xE304, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    let err = p.read_event(&mut src).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SmpteOff);
}

#[test]
fn smpte_drop_frame_rule_allows_00_on_the_ten_minute_mark() {
    let mut track = Vec::new();
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x54, 0x05, 1, 10, 0, 0, 0]); // minute=10, frame=0
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);
    let data = smf(1, 1, 0xE304, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    assert!(matches!(
        read_ok(&mut p, &mut src),
        Event::Meta { event: MetaEvent::SmpteOffset(_), .. }
    ));
}

#[test]
fn large_delta_time_round_trips_through_a_four_byte_varint() {
    const MAX_DELTA: u32 = (1 << 28) - 1;
    let mut track = Vec::new();
    track.extend(varint(MAX_DELTA));
    track.extend_from_slice(&[0x90, 60, 100]);
    track.extend(varint(0));
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    let data = smf(0, 1, 96, &[&track]);
    let mut src = SliceSource::new(&data);
    let mut p = Parser::new();
    read_ok(&mut p, &mut src);
    read_ok(&mut p, &mut src);
    match read_ok(&mut p, &mut src) {
        Event::Midi { delta, .. } => assert_eq!(delta, MAX_DELTA),
        other => panic!("expected NOTE_ON, got {:?}", other),
    }
}
