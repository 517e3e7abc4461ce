//! Incremental decoder for `text/event-stream` response bodies.
//!
//! The fetch body arrives as arbitrary byte chunks; frame boundaries and even
//! UTF-8 code points can land anywhere. Bytes are buffered until a full line
//! is present and only complete lines are decoded, so a code point split
//! across two chunks is reassembled before any text handling. A blank line
//! closes the frame, `:` lines are keepalive comments, and unknown fields are
//! skipped.

/// One decoded push frame: the event kind from the `event:` field and the
/// joined `data:` payload (possibly empty, e.g. for progress keepalives).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub kind: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    kind: Option<String>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk; returns every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.take_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Emit whatever an ended stream left behind: a final unterminated line
    /// and/or a frame that never got its closing blank line.
    pub fn flush(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() {
            let bytes = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&bytes);
            if let Some(frame) = self.take_line(line.trim_end_matches('\r')) {
                return Some(frame);
            }
        }
        if self.has_frame() {
            Some(self.build())
        } else {
            None
        }
    }

    fn take_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            if self.has_frame() {
                return Some(self.build());
            }
            return None;
        }
        if line.starts_with(':') {
            return None;
        }
        let Some((field, value)) = line.split_once(':') else {
            return None;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => self.kind = Some(value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn has_frame(&self) -> bool {
        self.kind.is_some() || !self.data_lines.is_empty()
    }

    fn build(&mut self) -> SseFrame {
        SseFrame {
            kind: self.kind.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_without_leading_space() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data:x\n\n");
        assert_eq!(frames[0].data, "x");
    }

    #[test]
    fn test_strips_only_one_leading_space() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data:  spaced\n\n");
        assert_eq!(frames[0].data, " spaced");
    }

    #[test]
    fn test_unknown_field_is_ignored() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"id: 7\nevent: progress\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind.as_deref(), Some("progress"));
        assert_eq!(frames[0].data, "");
    }

    #[test]
    fn test_line_without_colon_is_ignored() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"garbage\nevent: progress\n\n");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_repeated_blank_lines_emit_once() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: progress\n\n\n\n");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_state_resets_between_frames() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: fragment\ndata: a\n\ndata: b\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].kind.as_deref(), Some("fragment"));
        assert_eq!(frames[1].kind, None);
        assert_eq!(frames[1].data, "b");
    }

    #[test]
    fn test_flush_with_nothing_pending_is_none() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"event: progress\n\n");
        assert!(decoder.flush().is_none());
    }

    #[test]
    fn test_split_utf8_code_point_survives() {
        let payload = "data: é\n\n".as_bytes();
        let (head, tail) = payload.split_at(7);

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(head).is_empty());
        let frames = decoder.push(tail);
        assert_eq!(frames[0].data, "é");
    }
}
