//! Line framing for the response body.
//!
//! Network reads arrive in arbitrary slices: a line, a `data: ` marker or a
//! single UTF-8 character may be split across any number of reads. The
//! decoder keeps the undecoded byte tail and the unterminated text tail
//! between calls so that the lines it yields never depend on where the
//! slices were cut.

use std::str;

const REPLACEMENT: char = '\u{FFFD}';

/// Stateful bytes → lines tokenizer. One per streaming session.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of an incomplete UTF-8 sequence at the end of the last read
    pending: Vec<u8>,
    /// Decoded text after the last line terminator
    carry: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk and return every line it completed, in order.
    /// Terminators are removed, including a `\r` before the `\n`.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);
        self.drain_lines()
    }

    /// Flush the unterminated tail once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            // An incomplete sequence can never complete now.
            self.pending.clear();
            self.carry.push(REPLACEMENT);
        }
        if self.carry.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.carry);
        Some(strip_cr(&line).to_string())
    }

    /// True when no partial line or partial character is buffered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.carry.is_empty()
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        while start < self.pending.len() {
            match str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    self.carry.push_str(text);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // The prefix up to `valid` is well-formed, so this never substitutes.
                    self.carry
                        .push_str(&String::from_utf8_lossy(&self.pending[start..start + valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.carry.push(REPLACEMENT);
                            start += valid + bad;
                        }
                        None => {
                            // Truncated sequence: wait for the next read.
                            start += valid;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let Some(last) = self.carry.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.carry.split_off(last + 1);
        let complete = std::mem::replace(&mut self.carry, rest);
        complete[..last]
            .split('\n')
            .map(|line| strip_cr(line).to_string())
            .collect()
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
