//! Not-yet-submitted outbound hex digits
//!
//! The buffer only ever holds uppercase hex digits; anything else is rejected
//! at the door. Submission requires an even digit count so digits pair into
//! whole bytes. Submitting an odd-length buffer is deliberately a no-op (the
//! user is mid-byte), not an error.

/// Ordered sequence of validated hex digits awaiting submission.
#[derive(Debug, Default)]
pub struct PendingInput {
    digits: String,
}

impl PendingInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// Append a hex digit, normalized to uppercase. Returns false (buffer
    /// untouched) for any non-hex character.
    pub fn push(&mut self, c: char) -> bool {
        if c.is_ascii_hexdigit() {
            self.digits.push(c.to_ascii_uppercase());
            true
        } else {
            false
        }
    }

    /// Remove the last digit. No-op on an empty buffer.
    pub fn backspace(&mut self) {
        self.digits.pop();
    }

    /// Decode and clear the buffer if it holds a positive even number of
    /// digits; otherwise leave it untouched and return `None`.
    pub fn submit(&mut self) -> Option<Vec<u8>> {
        if self.digits.is_empty() || self.digits.len() % 2 != 0 {
            return None;
        }

        let bytes = self
            .digits
            .as_bytes()
            .chunks_exact(2)
            .map(|pair| {
                // Safe: push() only admits ASCII hex digits.
                let high = (pair[0] as char).to_digit(16).unwrap() as u8;
                let low = (pair[1] as char).to_digit(16).unwrap() as u8;
                (high << 4) | low
            })
            .collect();

        self.digits.clear();
        Some(bytes)
    }
}
