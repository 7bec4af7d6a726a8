//! Replays canned console sessions and writes their transcripts under
//! `transcripts/`.

use std::io;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "../board.rs"]
mod board;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use lockbox_core::Config;
use session::{Session, SessionOptions};

const LOCK_CYCLE: &[&str] = &[
    "status",
    "move",
    "advance 1200ms",
    "phone in",
    "advance 500",
    "rotate",
    "advance 300",
    "press",
    "advance 6s",
    "status",
    "advance 22s",
    "events",
    "move",
    "advance 400",
    "advance 12s",
    "lid open",
    "advance 200",
    "phone out",
    "advance 35s",
    "status",
];

const EMERGENCY: &[&str] = &[
    "phone in",
    "goto 6",
    "advance 6s",
    "lid open",
    "advance 200",
    "events",
    "lid closed",
    "advance 6s",
    "status",
];

const KNOCK: &[&str] = &[
    "phone in",
    "goto 6",
    "advance 6s",
    "noise",
    "advance 200",
    "knock miss",
    "advance 200",
    "noise",
    "advance 200",
    "knock match",
    "advance 400",
    "status",
    "goto 99",
];

fn main() -> io::Result<()> {
    record("lock_cycle", LOCK_CYCLE)?;
    record("emergency", EMERGENCY)?;
    record("knock", KNOCK)?;
    Ok(())
}

fn record(name: &str, script: &[&str]) -> io::Result<()> {
    let options = SessionOptions {
        config: Config::DEFAULT.with_lock_duration(20_000),
        transcript: Some(PathBuf::from(format!("transcripts/{name}.log"))),
    };
    let mut session = Session::new(options)?;
    for line in script {
        let _ = session.handle_command(line)?;
    }
    Ok(())
}
