//! Incremental decoder for `text/event-stream` response bodies.

/// Buffers partial chunks and yields complete `data:` lines. Bytes are only
/// decoded once a full line has arrived, so a multi-byte character split
/// across chunks survives intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

/// One `data:` line, without its prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub data: String,
}

impl SseFrame {
    pub fn is_done(&self) -> bool {
        self.data == "[DONE]"
    }
}

impl SseDecoder {
    /// Upper bound on buffered bytes for a stream that never sends a newline.
    const MAX_BUFFER_SIZE: usize = 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of bytes and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                frames.push(SseFrame {
                    data: data.trim_start().to_string(),
                });
            }
        }

        if self.buffer.len() > Self::MAX_BUFFER_SIZE {
            tracing::warn!(
                limit_kb = Self::MAX_BUFFER_SIZE / 1024,
                "SSE buffer exceeded limit, discarding"
            );
            self.buffer.clear();
        }
        frames
    }

    pub fn has_remaining(&self) -> bool {
        self.buffer.iter().any(|b| !b.is_ascii_whitespace())
    }
}
