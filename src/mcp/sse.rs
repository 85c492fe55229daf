//! Minimal client-side SSE reader.
//!
//! Only `data:` lines matter to the caller; event names, ids and comments are
//! skipped. Chunks may split lines (and UTF-8 sequences) anywhere, so bytes are
//! buffered until a newline arrives.

#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk and returns the payloads of the `data:` lines
    /// it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if let Some(payload) = data_payload(&String::from_utf8_lossy(&line)) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes a trailing line that had no terminating newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        data_payload(&String::from_utf8_lossy(&rest))
    }
}

/// Payload of a `data:` line, trimmed. `None` for any other line.
pub fn data_payload(line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    line.strip_prefix("data:")
        .map(|rest| rest.trim().to_string())
        .filter(|payload| !payload.is_empty())
}
