//! Streaming parser for RFC 8493 §2.2.2 tag files.

use crate::kv::KeyValueCollection;
use crate::parse::{drain_lines, final_line, Parser};

/// Parses `Name: Value` lines, folding continuation lines (a single leading
/// space or tab) back into the preceding value with LF separators.
#[derive(Default)]
pub struct TagFileParser {
    buf: Vec<u8>,
    current: Option<(String, String)>,
    parsed: KeyValueCollection,
}

impl TagFileParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle_line(&mut self, line: &str) {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = self.current.as_mut() {
                value.push('\n');
                value.push_str(line.trim_start());
                return;
            }
        }
        if let Some((name, value)) = line.split_once(':') {
            self.flush_current();
            self.current = Some((name.trim().to_string(), value.trim().to_string()));
        }
        // Lines without a separator carry no tag; skipped.
    }

    fn flush_current(&mut self) {
        if let Some((name, value)) = self.current.take() {
            self.parsed.add(name, value);
        }
    }
}

impl Parser for TagFileParser {
    fn write(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
        let mut buf = std::mem::take(&mut self.buf);
        drain_lines(&mut buf, |line| self.handle_line(line));
        self.buf = buf;
    }

    fn end(mut self: Box<Self>) -> KeyValueCollection {
        if let Some(line) = final_line(&self.buf) {
            self.handle_line(&line);
        }
        self.flush_current();
        self.parsed
    }
}
