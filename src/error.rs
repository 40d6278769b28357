//! Error kinds for the monitor
//!
//! Setup-phase problems (`SelectionError`) are recovered in place by the
//! prompts and never escape `setup`. Session-phase problems (`MonitorError`)
//! propagate all the way out of the session loop; `main` maps each variant to
//! a final styled message and exit status 1.

use thiserror::Error;

/// Fatal session errors.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The selected port could not be opened. Not retried: the port came from
    /// a live enumeration, so a failure here is a race or hardware fault.
    #[error("failed to open serial port {port}: {source}")]
    Connect {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Serial or terminal I/O fault mid-session (e.g. device unplugged).
    #[error("I/O fault: {0}")]
    Io(#[from] std::io::Error),

    /// User-initiated interrupt (Ctrl-C). A normal exit path, not a defect.
    #[error("cancelled by user")]
    Cancelled,
}

/// Invalid text entered at a setup prompt. Each variant is the note shown in
/// the banner when the prompt is redrawn.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Invalid port number. Please try again.")]
    BadPort,

    #[error("Invalid baudrate. Please try again.")]
    BadBaud,

    #[error("Invalid parity. Please try again.")]
    BadParity,
}
