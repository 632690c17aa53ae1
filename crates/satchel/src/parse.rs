//! Capability contract for streaming content parsers.

use crate::kv::KeyValueCollection;

/// A parser fed from the same chunked byte stream as the hashing fan-out.
///
/// Implementations buffer partial lines across chunks; `end` flushes
/// whatever remains and yields the parsed collection.
pub trait Parser {
    fn write(&mut self, chunk: &[u8]);
    fn end(self: Box<Self>) -> KeyValueCollection;
}

/// Splits buffered bytes into complete lines, leaving any trailing partial
/// line in place for the next chunk.
pub(crate) fn drain_lines(buf: &mut Vec<u8>, mut handle: impl FnMut(&str)) {
    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buf.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line[..line.len() - 1]);
        handle(line.strip_suffix('\r').unwrap_or(&line));
    }
}

/// Flush the final, unterminated line at end-of-stream.
pub(crate) fn final_line(buf: &[u8]) -> Option<String> {
    if buf.is_empty() {
        return None;
    }
    let line = String::from_utf8_lossy(buf);
    let line = line.strip_suffix('\r').unwrap_or(&line);
    Some(line.to_string())
}
