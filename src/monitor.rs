//! The interactive session loop
//!
//! Each tick services the keyboard queue first (at most one event), then the
//! serial receive buffer, so keystrokes stay responsive without starving
//! either stream. The loop never blocks: the key channel is polled with
//! `try_recv` and the serial side is only read when `bytes_to_read` reports
//! data. It runs until the user interrupts with Ctrl-C or the port faults.

use chrono::Local;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use serialport::Parity;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::error::MonitorError;
use crate::pending::PendingInput;
use crate::render::Render;
use crate::serial::port::parity_label;
use crate::serial::SerialLink;

/// Sleep applied when a tick found nothing on either stream.
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Connection parameters shown in the status line.
pub struct SessionInfo {
    pub port: String,
    pub baud_rate: u32,
    pub parity: Parity,
}

/// Session state: the open link, the hex-assembly buffer and the counters,
/// all exclusively owned here for the life of the session.
pub struct HexMonitor<L, R> {
    link: L,
    renderer: R,
    keys: Receiver<Event>,
    info: SessionInfo,
    pending: PendingInput,
    bytes_rx: u64,
    bytes_tx: u64,
}

impl<L: SerialLink, R: Render> HexMonitor<L, R> {
    pub fn new(link: L, renderer: R, keys: Receiver<Event>, info: SessionInfo) -> Self {
        Self {
            link,
            renderer,
            keys,
            info,
            pending: PendingInput::new(),
            bytes_rx: 0,
            bytes_tx: 0,
        }
    }

    /// Run until cancellation or an I/O fault. Never returns `Ok`.
    pub fn run(&mut self) -> Result<(), MonitorError> {
        loop {
            let key_seen = self.poll_key()?;
            let bytes_seen = self.poll_serial()? > 0;

            if !key_seen && !bytes_seen {
                thread::sleep(IDLE_POLL);
            }
        }
    }

    /// Consume at most one pending key event. Returns whether one was there.
    fn poll_key(&mut self) -> Result<bool, MonitorError> {
        match self.keys.try_recv() {
            Ok(event) => {
                self.handle_event(event)?;
                Ok(true)
            }
            Err(TryRecvError::Empty) => Ok(false),
            // Reader thread gone means the terminal input stream ended.
            Err(TryRecvError::Disconnected) => Err(MonitorError::Cancelled),
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<(), MonitorError> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // Check the interrupt before digit matching: 'c' is also a hex digit.
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Err(MonitorError::Cancelled);
        }

        // Chorded keys are control sequences, not digit input: Ctrl-D is
        // delivered as Char('d') + CONTROL and must not append a D.
        if !key
            .modifiers
            .difference(KeyModifiers::SHIFT)
            .is_empty()
        {
            return Ok(());
        }

        match key.code {
            KeyCode::Char(c) if c.is_ascii_hexdigit() => {
                self.pending.push(c);
                self.renderer.pending(self.pending.as_str())?;
            }
            KeyCode::Enter => self.handle_enter()?,
            KeyCode::Backspace => {
                self.pending.backspace();
                self.renderer.pending(self.pending.as_str())?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Enter on an empty buffer prints the status line; on an even-length
    /// buffer it transmits; on an odd-length buffer it does nothing, leaving
    /// the digits in place until the pair is completed or backspaced.
    fn handle_enter(&mut self) -> Result<(), MonitorError> {
        if self.pending.is_empty() {
            self.renderer.pending("")?;
            let line = format!("{} {}", timestamp(), self.describe());
            self.renderer.status(&line)?;
            return Ok(());
        }

        let digits = self.pending.as_str().to_string();
        if let Some(bytes) = self.pending.submit() {
            self.renderer.pending("")?;
            self.renderer
                .submitted(&format!("{} {}", timestamp(), digits))?;
            self.link.write_all(&bytes)?;
            self.bytes_tx += bytes.len() as u64;
            log::debug!("tx {} bytes", bytes.len());
        }

        Ok(())
    }

    /// Drain whatever the receive buffer currently holds, in one read.
    fn poll_serial(&mut self) -> Result<usize, MonitorError> {
        let available = self.link.bytes_to_read()?;
        if available > 0 {
            let mut buf = vec![0u8; available];
            self.link.read_exact(&mut buf)?;
            self.bytes_rx += available as u64;
            self.renderer.received(&buf)?;
        }
        Ok(available)
    }

    fn describe(&self) -> String {
        format!(
            "Port: {} | Baudrate: {} | Parity: {} | RX: {} | TX: {}",
            self.info.port,
            self.info.baud_rate,
            parity_label(self.info.parity),
            self.bytes_rx,
            self.bytes_tx
        )
    }
}

fn timestamp() -> String {
    format!("[{}]", Local::now().format("%H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;
    use std::sync::mpsc;

    #[derive(Debug, PartialEq)]
    enum Rendered {
        Pending(String),
        Submitted(String),
        Received(Vec<u8>),
        Status(String),
    }

    #[derive(Clone, Default)]
    struct RecordingRenderer {
        calls: Rc<RefCell<Vec<Rendered>>>,
    }

    impl Render for RecordingRenderer {
        fn pending(&mut self, buffer: &str) -> io::Result<()> {
            self.calls
                .borrow_mut()
                .push(Rendered::Pending(buffer.to_string()));
            Ok(())
        }

        fn submitted(&mut self, line: &str) -> io::Result<()> {
            self.calls
                .borrow_mut()
                .push(Rendered::Submitted(line.to_string()));
            Ok(())
        }

        fn received(&mut self, data: &[u8]) -> io::Result<()> {
            self.calls
                .borrow_mut()
                .push(Rendered::Received(data.to_vec()));
            Ok(())
        }

        fn status(&mut self, line: &str) -> io::Result<()> {
            self.calls
                .borrow_mut()
                .push(Rendered::Status(line.to_string()));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeLink {
        incoming: Rc<RefCell<VecDeque<Vec<u8>>>>,
        written: Rc<RefCell<Vec<u8>>>,
    }

    impl FakeLink {
        fn deliver(&self, chunk: &[u8]) {
            self.incoming.borrow_mut().push_back(chunk.to_vec());
        }
    }

    impl SerialLink for FakeLink {
        fn bytes_to_read(&mut self) -> io::Result<usize> {
            Ok(self.incoming.borrow().front().map_or(0, Vec::len))
        }

        fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
            let chunk = self
                .incoming
                .borrow_mut()
                .pop_front()
                .expect("read with nothing available");
            assert_eq!(buf.len(), chunk.len());
            buf.copy_from_slice(&chunk);
            Ok(())
        }

        fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            self.written.borrow_mut().extend_from_slice(data);
            Ok(())
        }
    }

    fn test_info() -> SessionInfo {
        SessionInfo {
            port: String::from("COM3"),
            baud_rate: 115200,
            parity: Parity::None,
        }
    }

    fn monitor(
        link: FakeLink,
        renderer: RecordingRenderer,
        keys: Receiver<Event>,
    ) -> HexMonitor<FakeLink, RecordingRenderer> {
        HexMonitor::new(link, renderer, keys, test_info())
    }

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl_c() -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
    }

    fn type_and_enter(mon: &mut HexMonitor<FakeLink, RecordingRenderer>, digits: &str) {
        for c in digits.chars() {
            mon.handle_event(press(KeyCode::Char(c))).unwrap();
        }
        mon.handle_event(press(KeyCode::Enter)).unwrap();
    }

    #[test]
    fn test_even_submission_transmits_decoded_bytes() {
        let (_tx, rx) = mpsc::channel();
        let link = FakeLink::default();
        let mut mon = monitor(link.clone(), RecordingRenderer::default(), rx);

        type_and_enter(&mut mon, "41");

        assert_eq!(*link.written.borrow(), vec![0x41]);
        assert!(mon.pending.is_empty());
        assert_eq!(mon.bytes_tx, 1);
    }

    #[test]
    fn test_odd_submission_is_retained() {
        let (_tx, rx) = mpsc::channel();
        let link = FakeLink::default();
        let mut mon = monitor(link.clone(), RecordingRenderer::default(), rx);

        type_and_enter(&mut mon, "4");

        assert!(link.written.borrow().is_empty());
        assert_eq!(mon.pending.as_str(), "4");
        assert_eq!(mon.bytes_tx, 0);

        // Completing the pair on the next Enter transmits it.
        type_and_enter(&mut mon, "1");
        assert_eq!(*link.written.borrow(), vec![0x41]);
        assert!(mon.pending.is_empty());
    }

    #[test]
    fn test_case_insensitive_digits_transmit_identically() {
        let (_tx, rx) = mpsc::channel();
        let lower = FakeLink::default();
        let mut mon = monitor(lower.clone(), RecordingRenderer::default(), rx);
        type_and_enter(&mut mon, "ab3c");

        let (_tx2, rx2) = mpsc::channel();
        let upper = FakeLink::default();
        let mut mon2 = monitor(upper.clone(), RecordingRenderer::default(), rx2);
        type_and_enter(&mut mon2, "AB3C");

        assert_eq!(*lower.written.borrow(), *upper.written.borrow());
        assert_eq!(*lower.written.borrow(), vec![0xAB, 0x3C]);
    }

    #[test]
    fn test_backspace_edits_tail_and_tolerates_empty() {
        let (_tx, rx) = mpsc::channel();
        let mut mon = monitor(FakeLink::default(), RecordingRenderer::default(), rx);

        mon.handle_event(press(KeyCode::Backspace)).unwrap();
        assert!(mon.pending.is_empty());

        mon.handle_event(press(KeyCode::Char('1'))).unwrap();
        mon.handle_event(press(KeyCode::Char('f'))).unwrap();
        mon.handle_event(press(KeyCode::Backspace)).unwrap();
        assert_eq!(mon.pending.as_str(), "1");
    }

    #[test]
    fn test_unrelated_keys_are_ignored() {
        let (_tx, rx) = mpsc::channel();
        let link = FakeLink::default();
        let mut mon = monitor(link.clone(), RecordingRenderer::default(), rx);

        mon.handle_event(press(KeyCode::Char('g'))).unwrap();
        mon.handle_event(press(KeyCode::Char('!'))).unwrap();
        mon.handle_event(press(KeyCode::Esc)).unwrap();
        mon.handle_event(press(KeyCode::Up)).unwrap();

        assert!(mon.pending.is_empty());
        assert!(link.written.borrow().is_empty());
    }

    #[test]
    fn test_empty_enter_prints_status_line() {
        let (_tx, rx) = mpsc::channel();
        let renderer = RecordingRenderer::default();
        let mut mon = monitor(FakeLink::default(), renderer.clone(), rx);

        mon.handle_event(press(KeyCode::Enter)).unwrap();

        let calls = renderer.calls.borrow();
        let status = calls.iter().find_map(|c| match c {
            Rendered::Status(line) => Some(line.clone()),
            _ => None,
        });
        let status = status.expect("no status line rendered");
        assert!(status.starts_with('['));
        assert!(status.ends_with("Port: COM3 | Baudrate: 115200 | Parity: None | RX: 0 | TX: 0"));
    }

    #[test]
    fn test_received_bytes_rendered_and_counted() {
        let (_tx, rx) = mpsc::channel();
        let link = FakeLink::default();
        let renderer = RecordingRenderer::default();
        let mut mon = monitor(link.clone(), renderer.clone(), rx);

        link.deliver(&[0x0A, 0xFF]);
        assert_eq!(mon.poll_serial().unwrap(), 2);
        assert_eq!(mon.bytes_rx, 2);

        // Idle tick: nothing read, counter unchanged.
        assert_eq!(mon.poll_serial().unwrap(), 0);
        assert_eq!(mon.bytes_rx, 2);

        link.deliver(&[0x01]);
        assert_eq!(mon.poll_serial().unwrap(), 1);
        assert_eq!(mon.bytes_rx, 3);

        let calls = renderer.calls.borrow();
        assert_eq!(calls[0], Rendered::Received(vec![0x0A, 0xFF]));
        assert_eq!(calls[1], Rendered::Received(vec![0x01]));
    }

    #[test]
    fn test_ctrl_c_cancels_regardless_of_buffer_state() {
        let (tx, rx) = mpsc::channel();
        let mut mon = monitor(FakeLink::default(), RecordingRenderer::default(), rx);

        tx.send(press(KeyCode::Char('4'))).unwrap();
        tx.send(ctrl_c()).unwrap();

        assert!(matches!(mon.run(), Err(MonitorError::Cancelled)));
        assert_eq!(mon.pending.as_str(), "4");
    }

    #[test]
    fn test_run_services_both_streams_until_cancelled() {
        let (tx, rx) = mpsc::channel();
        let link = FakeLink::default();
        let renderer = RecordingRenderer::default();
        let mut mon = monitor(link.clone(), renderer.clone(), rx);

        link.deliver(&[0xDE, 0xAD]);
        tx.send(press(KeyCode::Char('b'))).unwrap();
        tx.send(press(KeyCode::Char('e'))).unwrap();
        tx.send(press(KeyCode::Enter)).unwrap();
        tx.send(ctrl_c()).unwrap();

        assert!(matches!(mon.run(), Err(MonitorError::Cancelled)));
        assert_eq!(*link.written.borrow(), vec![0xBE]);
        assert_eq!(mon.bytes_rx, 2);
        assert_eq!(mon.bytes_tx, 1);
        assert!(renderer
            .calls
            .borrow()
            .contains(&Rendered::Received(vec![0xDE, 0xAD])));
    }

    #[test]
    fn test_modifier_chorded_hex_letters_are_ignored() {
        let (_tx, rx) = mpsc::channel();
        let link = FakeLink::default();
        let mut mon = monitor(link.clone(), RecordingRenderer::default(), rx);

        // Ctrl-D arrives as Char('d') + CONTROL; it is a control sequence,
        // not the hex digit D.
        mon.handle_event(Event::Key(KeyEvent::new(
            KeyCode::Char('d'),
            KeyModifiers::CONTROL,
        )))
        .unwrap();
        mon.handle_event(Event::Key(KeyEvent::new(
            KeyCode::Char('a'),
            KeyModifiers::ALT,
        )))
        .unwrap();

        assert!(mon.pending.is_empty());

        // Shifted digits are still plain digit input.
        mon.handle_event(Event::Key(KeyEvent::new(
            KeyCode::Char('A'),
            KeyModifiers::SHIFT,
        )))
        .unwrap();
        assert_eq!(mon.pending.as_str(), "A");
    }

    #[test]
    fn test_key_release_events_are_ignored() {
        let (_tx, rx) = mpsc::channel();
        let mut mon = monitor(FakeLink::default(), RecordingRenderer::default(), rx);

        let mut release = KeyEvent::new(KeyCode::Char('4'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        mon.handle_event(Event::Key(release)).unwrap();

        assert!(mon.pending.is_empty());
    }
}
