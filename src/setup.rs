//! Interactive selection of port, baud rate and parity
//!
//! Runs once at startup, in cooked terminal mode, before the key reader
//! exists. Every prompt validates in place: bad input clears the screen,
//! redraws the banner with a note, and asks again, so setup never terminates
//! the process on a typo. CLI flags pre-answer individual prompts.

use colored::Colorize;
use serialport::Parity;
use std::io::{self, BufRead, Write};

use crate::error::{MonitorError, SelectionError};
use crate::render::clear_screen;
use crate::serial::port::{self, PortConfig, DEFAULT_BAUD};

/// Collect a complete, validated set of connection parameters. Opening the
/// port is the caller's (fatal) next step.
pub fn select_parameters(
    port_override: Option<String>,
    baud_override: Option<u32>,
    parity_override: Option<Parity>,
) -> Result<PortConfig, MonitorError> {
    init_screen("")?;

    let port_path = match port_override {
        Some(p) => p,
        None => prompt_port()?,
    };
    let baud_rate = match baud_override {
        Some(b) => b,
        None => prompt_baud()?,
    };
    let parity = match parity_override {
        Some(p) => p,
        None => prompt_parity()?,
    };

    Ok(PortConfig::new(&port_path)
        .with_baud_rate(baud_rate)
        .with_parity(parity))
}

/// Clear the screen and draw the banner, with an optional error note.
fn init_screen(note: &str) -> io::Result<()> {
    clear_screen()?;
    println!(
        "{} {}\n",
        "Hex Serial Monitor".white().bold(),
        note.red()
    );
    Ok(())
}

/// Prompt until a line is read; EOF on stdin maps to cancellation so a
/// closed input can't spin the retry loop forever.
fn read_line(prompt: &str) -> Result<String, MonitorError> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(MonitorError::Cancelled);
    }
    Ok(line.trim().to_string())
}

fn prompt_port() -> Result<String, MonitorError> {
    loop {
        let ports = match port::list_ports() {
            Ok(ports) => ports,
            Err(e) => {
                init_screen(&format!("({})", e))?;
                continue;
            }
        };

        if ports.is_empty() {
            println!(
                "{}",
                "No serial ports found. Connect a device and try again.".yellow()
            );
        }
        for (i, p) in ports.iter().enumerate() {
            println!("- [{}] {} ({})", i, p.path, p.description);
        }
        println!();

        let line = read_line("Enter the port number to connect: ")?;
        match parse_port_index(&line, ports.len()) {
            Ok(index) => {
                init_screen("")?;
                return Ok(ports[index].path.clone());
            }
            // Re-enumerate on retry; the set of ports may have changed.
            Err(e) => init_screen(&format!("({})", e))?,
        }
    }
}

fn prompt_baud() -> Result<u32, MonitorError> {
    loop {
        let line = read_line(&format!("Enter the baudrate (default {}): ", DEFAULT_BAUD))?;
        match parse_baud(&line) {
            Ok(baud) => {
                init_screen("")?;
                return Ok(baud);
            }
            Err(e) => init_screen(&format!("({})", e))?,
        }
    }
}

fn prompt_parity() -> Result<Parity, MonitorError> {
    loop {
        let line = read_line("Enter the parity (N, E, O) (default N): ")?;
        match parse_parity(&line) {
            Ok(parity) => return Ok(parity),
            Err(e) => init_screen(&format!("({})", e))?,
        }
    }
}

/// Parse a zero-based port index against the current enumeration.
fn parse_port_index(input: &str, port_count: usize) -> Result<usize, SelectionError> {
    let index: usize = input.parse().map_err(|_| SelectionError::BadPort)?;
    if index < port_count {
        Ok(index)
    } else {
        Err(SelectionError::BadPort)
    }
}

/// Parse a baud rate; empty input selects the default.
fn parse_baud(input: &str) -> Result<u32, SelectionError> {
    if input.is_empty() {
        return Ok(DEFAULT_BAUD);
    }
    match input.parse() {
        Ok(baud) if baud > 0 => Ok(baud),
        _ => Err(SelectionError::BadBaud),
    }
}

/// Parse a single-letter parity code; empty input selects None.
fn parse_parity(input: &str) -> Result<Parity, SelectionError> {
    match input.to_ascii_uppercase().as_str() {
        "" | "N" => Ok(Parity::None),
        "E" => Ok(Parity::Even),
        "O" => Ok(Parity::Odd),
        _ => Err(SelectionError::BadParity),
    }
}

/// clap value parser for the `--parity` flag.
pub fn parity_arg(input: &str) -> Result<Parity, String> {
    parse_parity(input).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_index_in_range() {
        assert_eq!(parse_port_index("0", 3), Ok(0));
        assert_eq!(parse_port_index("2", 3), Ok(2));
    }

    #[test]
    fn test_port_index_rejects_bad_input() {
        assert_eq!(parse_port_index("3", 3), Err(SelectionError::BadPort));
        assert_eq!(parse_port_index("-1", 3), Err(SelectionError::BadPort));
        assert_eq!(parse_port_index("abc", 3), Err(SelectionError::BadPort));
        assert_eq!(parse_port_index("", 3), Err(SelectionError::BadPort));
        assert_eq!(parse_port_index("0", 0), Err(SelectionError::BadPort));
    }

    #[test]
    fn test_baud_empty_defaults() {
        assert_eq!(parse_baud(""), Ok(115200));
    }

    #[test]
    fn test_baud_accepts_positive_integers() {
        assert_eq!(parse_baud("9600"), Ok(9600));
        assert_eq!(parse_baud("921600"), Ok(921600));
    }

    #[test]
    fn test_baud_rejects_bad_input() {
        assert_eq!(parse_baud("0"), Err(SelectionError::BadBaud));
        assert_eq!(parse_baud("fast"), Err(SelectionError::BadBaud));
        assert_eq!(parse_baud("-9600"), Err(SelectionError::BadBaud));
    }

    #[test]
    fn test_parity_codes_case_insensitive() {
        assert_eq!(parse_parity(""), Ok(Parity::None));
        assert_eq!(parse_parity("n"), Ok(Parity::None));
        assert_eq!(parse_parity("N"), Ok(Parity::None));
        assert_eq!(parse_parity("e"), Ok(Parity::Even));
        assert_eq!(parse_parity("O"), Ok(Parity::Odd));
    }

    #[test]
    fn test_parity_rejects_bad_input() {
        assert_eq!(parse_parity("X"), Err(SelectionError::BadParity));
        assert_eq!(parse_parity("even"), Err(SelectionError::BadParity));
    }
}
