//! Hex Serial Monitor
//!
//! Interactive terminal tool for exchanging raw hexadecimal byte streams
//! with a serial device. Pick a port, baud rate and parity; the monitor then
//! shows incoming bytes as a live hex stream while hex digits typed at the
//! keyboard are assembled into bytes and transmitted on Enter.
//!
//! # Usage
//!
//! ```bash
//! # Fully interactive: prompts for port, baud and parity
//! hexmon
//!
//! # Skip individual prompts
//! hexmon -p /dev/ttyUSB0 -b 115200 --parity N
//!
//! # List available serial ports
//! hexmon --list
//! ```
//!
//! In a session: type hex digits (case-insensitive) to assemble an outbound
//! message, Enter to transmit it (digit count must be even), Backspace to
//! edit, Enter on an empty buffer for a status line, Ctrl-C to quit.

mod error;
mod input;
mod monitor;
mod pending;
mod render;
mod serial;
mod setup;

use clap::Parser;
use colored::Colorize;
use std::process;

use error::MonitorError;
use monitor::{HexMonitor, SessionInfo};
use render::StyledRenderer;
use serial::SerialConnection;

/// Interactive hex monitor for serial devices
#[derive(Parser)]
#[command(name = "hexmon")]
#[command(version)]
#[command(about = "Interactive hex monitor for serial devices")]
struct Cli {
    /// Serial port path (skips the interactive port prompt)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (skips the baud rate prompt)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Parity: N, E or O (skips the parity prompt)
    #[arg(long, value_parser = setup::parity_arg)]
    parity: Option<serialport::Parity>,

    /// List available serial ports and exit
    #[arg(short, long)]
    list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    #[cfg(unix)]
    install_sigint_exit();

    if cli.list {
        if let Err(e) = serial::port::print_ports() {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            process::exit(1);
        }
        return;
    }

    // The session runs until interrupted or the port faults; every exit path
    // below carries status 1.
    let Err(err) = run(cli) else {
        return;
    };

    match err {
        MonitorError::Cancelled => {
            eprintln!("\n\n{}\n", "Monitor: Exiting now...".red());
        }
        MonitorError::Connect { port, source } => {
            log::debug!("open {}: {}", port, source);
            eprintln!(
                "\n\n{}\n",
                "Monitor: Failed to open the selected port. Exiting now...".red()
            );
        }
        MonitorError::Io(e) => {
            log::debug!("session I/O fault: {}", e);
            eprintln!("\n\n{}\n", "Monitor: Disconnected (I/O Error)".red());
        }
    }
    process::exit(1);
}

fn run(cli: Cli) -> Result<(), MonitorError> {
    let config = setup::select_parameters(cli.port, cli.baud, cli.parity)?;
    let info = SessionInfo {
        port: config.port_path.clone(),
        baud_rate: config.baud_rate,
        parity: config.parity,
    };

    // Opening is not retried: the port came from a live enumeration, so a
    // failure here is outside this tool's control.
    let connection = SerialConnection::open(config)?;

    render::clear_screen()?;

    // Raw mode spans the whole session; the guard restores the terminal on
    // every exit path, including faults and cancellation.
    let _raw = input::RawModeGuard::enable()?;
    let keys = input::spawn_reader();

    HexMonitor::new(connection, StyledRenderer::new(), keys, info).run()
}

/// Exit with the cancellation status on SIGINT. Raw mode disables ISIG, so
/// this only fires during the cooked-mode setup prompts; in-session Ctrl-C
/// arrives as a key event and is handled by the session loop.
#[cfg(unix)]
fn install_sigint_exit() {
    extern "C" fn on_sigint(_: libc::c_int) {
        const MSG: &[u8] = b"\n\nMonitor: Exiting now...\n\n";
        unsafe {
            let _ = libc::write(libc::STDERR_FILENO, MSG.as_ptr().cast(), MSG.len());
            libc::_exit(1);
        }
    }

    unsafe {
        libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
    }
}
