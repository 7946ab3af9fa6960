//! Incremental NDJSON line framing
//!
//! A network read may end mid-line, or mid-character, so raw bytes are
//! buffered and only complete lines are decoded; the trailing partial
//! line is carried across calls to [`NdjsonDecoder::feed`]. Malformed
//! lines are skipped rather than fatal (streaming stays best-effort
//! against backend noise), but every skip is logged and counted so
//! dropped lines remain observable.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

/// Streaming decoder for newline-delimited JSON
#[derive(Debug)]
pub struct NdjsonDecoder<T> {
    buffer: Vec<u8>,
    skipped: u64,
    _marker: PhantomData<T>,
}

impl<T> Default for NdjsonDecoder<T> {
    fn default() -> Self {
        Self {
            buffer: Vec::new(),
            skipped: 0,
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> NdjsonDecoder<T> {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read, returning every document completed by it
    ///
    /// Documents are returned in arrival order. Well-formed lines are
    /// never dropped; malformed ones are skipped and counted.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<T> {
        self.buffer.extend_from_slice(bytes);

        let mut documents = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(document) = self.parse_line(&line) {
                documents.push(document);
            }
        }
        documents
    }

    /// Drain a trailing line that was never newline-terminated
    pub fn finish(&mut self) -> Option<T> {
        let line = std::mem::take(&mut self.buffer);
        self.parse_line(&line)
    }

    /// Number of malformed lines skipped so far
    pub const fn skipped_lines(&self) -> u64 {
        self.skipped
    }

    fn parse_line(&mut self, line: &[u8]) -> Option<T> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_slice(line) {
            Ok(document) => Some(document),
            Err(e) => {
                self.skipped += 1;
                tracing::debug!(error = %e, "skipping malformed NDJSON line");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Doc {
        n: u32,
    }

    #[test]
    fn complete_lines_decode_in_order() {
        let mut decoder = NdjsonDecoder::<Doc>::new();
        let docs = decoder.feed(b"{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n");
        assert_eq!(docs, vec![Doc { n: 1 }, Doc { n: 2 }, Doc { n: 3 }]);
        assert_eq!(decoder.skipped_lines(), 0);
    }

    #[test]
    fn partial_line_is_held_across_reads() {
        let mut decoder = NdjsonDecoder::<Doc>::new();
        // Split a two-line payload at every byte boundary
        let payload = b"{\"n\":1}\n{\"n\":42}\n";
        for split in 0..payload.len() {
            let mut decoder = NdjsonDecoder::<Doc>::new();
            let mut docs = decoder.feed(&payload[..split]);
            docs.extend(decoder.feed(&payload[split..]));
            assert_eq!(docs, vec![Doc { n: 1 }, Doc { n: 42 }], "split at {split}");
        }
        assert!(decoder.feed(b"{\"n\":7").is_empty());
        assert_eq!(decoder.feed(b"}\n"), vec![Doc { n: 7 }]);
    }

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Text {
        content: String,
    }

    #[test]
    fn multibyte_character_split_across_reads_stays_intact() {
        let payload = "{\"content\":\"h\u{e9}llo\"}\n".as_bytes();
        for split in 0..payload.len() {
            let mut decoder = NdjsonDecoder::<Text>::new();
            let mut docs = decoder.feed(&payload[..split]);
            docs.extend(decoder.feed(&payload[split..]));
            assert_eq!(
                docs,
                vec![Text {
                    content: "h\u{e9}llo".to_owned()
                }],
                "split at {split}"
            );
            assert_eq!(decoder.skipped_lines(), 0, "split at {split}");
        }
    }

    #[test]
    fn malformed_line_is_skipped_and_counted() {
        let mut decoder = NdjsonDecoder::<Doc>::new();
        let docs = decoder.feed(b"{\"n\":1}\nnot json\n{\"n\":2}\n");
        assert_eq!(docs, vec![Doc { n: 1 }, Doc { n: 2 }]);
        assert_eq!(decoder.skipped_lines(), 1);
    }

    #[test]
    fn finish_drains_unterminated_line() {
        let mut decoder = NdjsonDecoder::<Doc>::new();
        assert!(decoder.feed(b"{\"n\":9}").is_empty());
        assert_eq!(decoder.finish(), Some(Doc { n: 9 }));
        assert_eq!(decoder.finish(), None);
    }
}
