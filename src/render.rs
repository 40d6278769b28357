//! Terminal rendering for the session loop
//!
//! The loop drives a small capability interface so its state machine stays
//! independent of presentation: a richer or plainer front end only has to
//! implement [`Render`]. The styled renderer keeps the pending buffer in a
//! fixed region two lines below the cursor (save/restore) while the received
//! hex stream appends in place. Output uses explicit `\r\n` because the
//! terminal is in raw mode for the whole session.

use colored::Colorize;
use crossterm::cursor::{MoveTo, MoveToColumn, RestorePosition, SavePosition};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};

/// What the session loop needs to show, independent of how it is styled.
pub trait Render {
    /// Redraw the not-yet-submitted hex digits in their fixed region.
    fn pending(&mut self, buffer: &str) -> io::Result<()>;

    /// Print a submitted outbound message on its own timestamped line.
    fn submitted(&mut self, line: &str) -> io::Result<()>;

    /// Append received bytes to the live hex stream.
    fn received(&mut self, data: &[u8]) -> io::Result<()>;

    /// Print the connection status line.
    fn status(&mut self, line: &str) -> io::Result<()>;
}

/// Styled stdout renderer used for real sessions.
pub struct StyledRenderer {
    out: Stdout,
}

impl StyledRenderer {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for StyledRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Render for StyledRenderer {
    fn pending(&mut self, buffer: &str) -> io::Result<()> {
        queue!(
            self.out,
            SavePosition,
            Print("\r\n\r\n"),
            MoveToColumn(0),
            Clear(ClearType::UntilNewLine),
            Print(buffer.white().bold()),
            RestorePosition
        )?;
        self.out.flush()
    }

    fn submitted(&mut self, line: &str) -> io::Result<()> {
        queue!(self.out, Print(format!("\r\n{}\r\n\r\n", line.white())))?;
        self.out.flush()
    }

    fn received(&mut self, data: &[u8]) -> io::Result<()> {
        queue!(self.out, Print(format!("{} ", hex_pairs(data).green())))?;
        self.out.flush()
    }

    fn status(&mut self, line: &str) -> io::Result<()> {
        queue!(self.out, Print(format!("\r\n\r\n{}\r\n\r\n", line.white())))?;
        self.out.flush()
    }
}

/// Format bytes as space-separated lowercase hex pairs.
fn hex_pairs(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clear the screen and home the cursor.
pub fn clear_screen() -> io::Result<()> {
    execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))
}
