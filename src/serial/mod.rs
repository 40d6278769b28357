//! Serial port communication module
//!
//! This module provides functionality for:
//! - Listing available serial ports
//! - Opening a port with user-selected baud rate and parity
//! - The transport seam the session loop reads and writes through

pub mod port;

pub use port::{PortConfig, SerialConnection, SerialLink};
