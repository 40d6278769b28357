//! Background keyboard reader
//!
//! One thread blocks on terminal events and forwards each one, untouched,
//! through an unbounded channel. All interpretation (hex digits, Enter,
//! backspace, Ctrl-C) happens in the session loop, which polls the receiver
//! without ever blocking on it. The thread has no shutdown signal; it is
//! abandoned when the process exits.

use crossterm::event::{self, Event};
use crossterm::terminal;
use std::io;
use std::sync::mpsc::{self, Receiver};
use std::thread;

/// Scoped raw terminal mode. Raw mode is entered on construction and restored
/// on drop, which covers every exit path out of the session loop.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Spawn the reader thread. The returned receiver yields events in arrival
/// order; a disconnected receiver means the terminal event stream ended.
pub fn spawn_reader() -> Receiver<Event> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if tx.send(ev).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::debug!("terminal event stream closed: {}", e);
                break;
            }
        }
    });

    rx
}
