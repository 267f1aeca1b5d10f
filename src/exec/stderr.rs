// src/exec/stderr.rs

/// Bytes read per stderr readiness event.
pub const STDERR_CHUNK: usize = 4096;

/// Raw stderr of one driver, kept verbatim for diagnostics.
#[derive(Debug, Default)]
pub struct StderrBuffer {
    bytes: Vec<u8>,
}

impl StderrBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lossy UTF-8 text without trailing line breaks.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes)
            .trim_end_matches(['\n', '\r'])
            .to_string()
    }

    /// The first `n` lines of [`text`](Self::text).
    pub fn head(&self, n: usize) -> String {
        self.text().lines().take(n).collect::<Vec<_>>().join("\n")
    }
}
