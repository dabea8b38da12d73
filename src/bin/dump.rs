//! A thin reference CLI: dumps every event from a Standard MIDI File to
//! stdout. Reads from the path given as the first argument, or from stdin if
//! none is given.

use smf_stream::{Event, FileSource, InputSource, Parser, ReaderSource};
use std::io;

fn main() {
    env_logger::init();

    let path = std::env::args().nth(1);
    let stdin = io::stdin();
    let result = match path {
        Some(path) => FileSource::open(&path).and_then(|mut src| dump(&mut src)),
        None => dump(&mut ReaderSource::new(stdin.lock())),
    };

    if let Err(e) = result {
        eprintln!("smf-dump: {}", e);
        std::process::exit(1);
    }
}

fn dump(source: &mut dyn InputSource) -> smf_stream::Result<()> {
    let mut parser = Parser::new();
    loop {
        match parser.read_event(source)? {
            Event::Eof => return Ok(()),
            event => println!("{:?}", event),
        }
    }
}
