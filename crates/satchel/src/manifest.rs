//! Streaming parser for manifest and tag-manifest files.

use crate::kv::KeyValueCollection;
use crate::parse::{drain_lines, final_line, Parser};

/// Parses `<digest> <relative-path>` lines.
///
/// The path is everything after the first whitespace run, so payload paths
/// may contain spaces. Entries are keyed by path with the digest as value.
#[derive(Default)]
pub struct ManifestParser {
    buf: Vec<u8>,
    entries: KeyValueCollection,
}

impl ManifestParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        let Some(split) = line.find(char::is_whitespace) else {
            return;
        };
        let digest = &line[..split];
        let path = line[split..].trim_start();
        if path.is_empty() {
            return;
        }
        self.entries.add(path, digest.to_ascii_lowercase());
    }
}

impl Parser for ManifestParser {
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
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> KeyValueCollection {
        let mut parser = Box::new(ManifestParser::new());
        parser.write(input);
        parser.end()
    }

    #[test]
    fn parses_digest_and_path() {
        let kv = parse(b"a1b2c3 data/file.txt\nd4e5f6 data/other.bin\n");
        assert_eq!(kv.first("data/file.txt"), Some("a1b2c3"));
        assert_eq!(kv.first("data/other.bin"), Some("d4e5f6"));
        assert_eq!(kv.len(), 2);
    }

    #[test]
    fn path_may_contain_spaces() {
        let kv = parse(b"a1b2c3  data/my file with spaces.txt\n");
        assert_eq!(kv.first("data/my file with spaces.txt"), Some("a1b2c3"));
    }

    #[test]
    fn digests_are_lowercased() {
        let kv = parse(b"A1B2C3 data/file.txt\n");
        assert_eq!(kv.first("data/file.txt"), Some("a1b2c3"));
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let kv = parse(b"\n\njustadigest\nabc data/ok.txt\n");
        assert_eq!(kv.len(), 1);
        assert_eq!(kv.keys(), vec!["data/ok.txt"]);
    }

    #[test]
    fn final_unterminated_line_is_kept() {
        let kv = parse(b"abc data/one.txt\ndef data/two.txt");
        assert_eq!(kv.first("data/two.txt"), Some("def"));
    }
}
