//! Dot-terminated framing.
//!
//! A frame is any number of lines followed by a line holding a single `.`.
//! Lines may end in `\n` or `\r\n`, and the terminator may also be the last
//! thing received so far without a line ending at all. Blank lines between
//! frames are ignored. A frame whose payload (everything before the
//! terminator, line endings included) is larger than [`FRAME_LIMIT`] is
//! discarded up to its terminator and reported as
//! [`FrameError::TooLarge`](crate::error::FrameError::TooLarge).

/// Largest accepted frame payload, in bytes.
pub const FRAME_LIMIT: usize = 1024;

/// What the framer produced from the buffered input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framed {
    /// A complete frame; its lines joined with `\n`.
    Frame(String),
    /// A complete frame that was too large and has been thrown away.
    Oversized,
}

/// Incremental frame extractor
///
/// Bytes are pushed in as they arrive and complete frames are pulled out with
/// [`Framer::next_frame`].
#[derive(Debug, Default)]
pub struct Framer {
    buffer: Vec<u8>,
    lines: Vec<String>,
    size: usize,
    oversized: bool,
    /// Part of the current line was already discarded, so when the line
    /// completes it cannot be a terminator.
    mid_line: bool,
}

impl Framer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Whether a frame has been started but not finished.
    #[must_use]
    pub fn in_frame(&self) -> bool {
        self.size > 0 || self.oversized || !self.buffer.is_empty()
    }

    /// Pull the next complete frame out of the buffered input, if any.
    pub fn next_frame(&mut self) -> Option<Framed> {
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = strip_cr(&raw[..end]);
            let continued = std::mem::take(&mut self.mid_line);

            if !continued && line == b"." {
                return Some(self.finish());
            }

            if !continued && line.is_empty() && self.size == 0 && !self.oversized {
                continue;
            }

            self.append(line, raw.len(), continued);
        }

        if !self.mid_line && strip_cr(&self.buffer) == b"." {
            self.buffer.clear();
            return Some(self.finish());
        }

        // A partial line that alone breaks the limit can be dropped right away
        if self.size + self.buffer.len() > FRAME_LIMIT {
            self.size += self.buffer.len();
            self.buffer.clear();
            self.lines.clear();
            self.oversized = true;
            self.mid_line = true;
        }

        None
    }

    fn append(&mut self, line: &[u8], raw_len: usize, continued: bool) {
        self.size += raw_len;

        if self.size > FRAME_LIMIT {
            self.oversized = true;
            self.lines.clear();
        }

        if !self.oversized && !continued {
            self.lines.push(String::from_utf8_lossy(line).into_owned());
        }
    }

    fn finish(&mut self) -> Framed {
        let lines = std::mem::take(&mut self.lines);
        let oversized = std::mem::take(&mut self.oversized);
        self.size = 0;

        if oversized {
            Framed::Oversized
        } else {
            Framed::Frame(lines.join("\n"))
        }
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
